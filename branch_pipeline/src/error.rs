use std::fmt;
use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Data format error in {}: {message}", path.display())]
    DataFormat { path: PathBuf, message: String },

    #[error("Invalid top-N value {0}: must be at least 1")]
    InvalidTopN(usize),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] PolarsError),
}

impl PipelineError {
    pub(crate) fn data_format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        PipelineError::DataFormat {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Split csv errors into the IO and format halves of the taxonomy.
    pub(crate) fn from_csv(path: impl Into<PathBuf>, err: csv::Error) -> Self {
        let path = path.into();
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(source) => PipelineError::Io { path, source },
                other => PipelineError::data_format(path, format!("{:?}", other)),
            }
        } else {
            PipelineError::data_format(path, err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// A field that could not be coerced to its typed form. The row is kept with
/// the value treated as missing.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionWarning {
    pub path: PathBuf,
    /// 1-based data row, header excluded.
    pub row: usize,
    pub column: String,
    pub value: String,
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: row {} column '{}' has non-numeric value '{}', treated as missing",
            self.path.display(),
            self.row,
            self.column,
            self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_io_error_maps_to_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = PipelineError::from_csv("missing.csv", csv::Error::from(io));
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn test_coercion_warning_display() {
        let warning = CoercionWarning {
            path: PathBuf::from("branches.csv"),
            row: 3,
            column: "lat".to_string(),
            value: "n/a".to_string(),
        };
        let text = warning.to_string();
        assert!(text.contains("row 3"));
        assert!(text.contains("'lat'"));
        assert!(text.contains("'n/a'"));
    }
}
