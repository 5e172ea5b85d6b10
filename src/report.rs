use anyhow::Result;
use branch_pipeline::{DashboardViews, RenderSink, TableToggles};
use std::io::Write;

/// Prints the aggregate tables behind the charts that have their toggle on
pub struct TableReport<W: Write> {
    toggles: TableToggles,
    out: W,
}

impl<W: Write> TableReport<W> {
    pub fn new(toggles: TableToggles, out: W) -> Self {
        Self { toggles, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    // Always by display name, whatever labels the chart uses
    fn write_top_branches(&mut self, views: &DashboardViews) -> Result<()> {
        writeln!(self.out, "\n🏪 Top {} branches", views.top_n)?;
        writeln!(self.out, "{:<6} {:<30} {:>12}", "Rank", "Branch", "Transactions")?;
        writeln!(self.out, "{}", "-".repeat(50))?;
        for (rank, b) in views.top_branches_by_name.iter().enumerate() {
            writeln!(self.out, "{:<6} {:<30} {:>12}", rank + 1, b.branch, b.count)?;
        }
        Ok(())
    }

    fn write_hours(&mut self, views: &DashboardViews) -> Result<()> {
        writeln!(self.out, "\n🕐 Transactions per hour")?;
        writeln!(self.out, "{:<6} {:>12}", "Hour", "Transactions")?;
        writeln!(self.out, "{}", "-".repeat(19))?;
        for h in &views.hours {
            writeln!(self.out, "{:<6} {:>12}", h.hour, h.transactions)?;
        }
        Ok(())
    }

    fn write_days(&mut self, views: &DashboardViews) -> Result<()> {
        writeln!(self.out, "\n📅 Percentage of transactions by day")?;
        writeln!(self.out, "{:<10} {:>10}", "Day", "Percentage")?;
        writeln!(self.out, "{}", "-".repeat(21))?;
        for d in &views.days {
            writeln!(self.out, "{:<10} {:>9.2}%", d.day, d.percentage)?;
        }
        Ok(())
    }
}

impl<W: Write> RenderSink for TableReport<W> {
    fn render(&mut self, views: &DashboardViews) -> Result<()> {
        if self.toggles.top_branches {
            self.write_top_branches(views)?;
        }
        if self.toggles.hours {
            self.write_hours(views)?;
        }
        if self.toggles.days {
            self.write_days(views)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use branch_pipeline::models::{BranchCount, DayShare, HourBucket, MapView};

    fn views() -> DashboardViews {
        let empty_map = MapView { center: None, zoom: 11, points: vec![] };
        DashboardViews {
            top_n: 10,
            nationwide: empty_map.clone(),
            city: empty_map,
            monthly: vec![],
            top_branches: vec![BranchCount { branch: "0001".to_string(), count: 42 }],
            top_branches_by_name: vec![BranchCount { branch: "Silom".to_string(), count: 42 }],
            hours: (0..24).map(|h| HourBucket { hour: h, transactions: 0 }).collect(),
            days: vec![DayShare { day: "Monday".to_string(), percentage: 100.0 }],
        }
    }

    #[test]
    fn test_only_toggled_tables_are_written() {
        let toggles = TableToggles { top_branches: true, hours: false, days: true };
        let mut report = TableReport::new(toggles, Vec::new());

        report.render(&views()).unwrap();
        let text = String::from_utf8(report.into_inner()).unwrap();

        assert!(text.contains("Top 10 branches"));
        assert!(text.contains("Silom"));
        assert!(!text.contains("0001"));
        assert!(text.contains("100.00%"));
        assert!(!text.contains("per hour"));
    }

    #[test]
    fn test_no_toggles_writes_nothing() {
        let mut report = TableReport::new(TableToggles::default(), Vec::new());
        report.render(&views()).unwrap();
        assert!(report.into_inner().is_empty());
    }
}
