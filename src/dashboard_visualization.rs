use anyhow::Result;
use branch_pipeline::models::{BranchCount, DayShare, HourBucket, MapView, MonthlyRow};
use branch_pipeline::monthly_series;
use branch_pipeline::{DashboardViews, RenderSink};
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};

const MAP_PADDING_DEG: f64 = 0.01;

/// Renders every dashboard view as an SVG chart
pub struct DashboardVisualizer {
    output_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DashboardVisualizer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            output_dir,
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn generate_all_visualizations(&mut self, views: &DashboardViews) -> Result<()> {
        println!("📊 Generating Dashboard Charts");
        println!("{}", "=".repeat(60));

        let path = self.output_dir.join("nationwide_map.svg");
        draw_map(&path, &views.nationwide, "Nationwide", false)?;
        self.saved(path);

        let path = self.output_dir.join("city_map.svg");
        draw_map(&path, &views.city, "Bangkok", true)?;
        self.saved(path);

        let path = self.output_dir.join("monthly_trend.svg");
        draw_monthly_trend(&path, &views.monthly)?;
        self.saved(path);

        let path = self.output_dir.join(format!("top_branches_{}.svg", views.top_n));
        draw_top_branches(&path, &views.top_branches, views.top_n)?;
        self.saved(path);

        let path = self.output_dir.join("hourly_breakdown.svg");
        draw_hourly_breakdown(&path, &views.hours)?;
        self.saved(path);

        let path = self.output_dir.join("day_of_week.svg");
        draw_day_of_week(&path, &views.days)?;
        self.saved(path);

        Ok(())
    }

    fn saved(&mut self, path: PathBuf) {
        println!("  ✅ Saved {}", path.display());
        if !self.written.contains(&path) {
            self.written.push(path);
        }
    }
}

impl RenderSink for DashboardVisualizer {
    fn render(&mut self, views: &DashboardViews) -> Result<()> {
        self.generate_all_visualizations(views)
    }
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    let pad = ((hi - lo) * 0.1).max(MAP_PADDING_DEG);
    (lo - pad, hi + pad)
}

fn draw_map(path: &Path, view: &MapView, caption: &str, with_labels: bool) -> Result<()> {
    let root = SVGBackend::new(path, (900, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let Some(((min_lat, max_lat), (min_lon, max_lon))) = view.bounds() else {
        root.present()?;
        return Ok(());
    };
    let (lat_lo, lat_hi) = padded(min_lat, max_lat);
    let (lon_lo, lon_hi) = padded(min_lon, max_lon);

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} ({} branches)", caption, view.points.len()), ("sans-serif", 30).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(lon_lo..lon_hi, lat_lo..lat_hi)?;

    chart.configure_mesh()
        .x_desc("Longitude")
        .y_desc("Latitude")
        .draw()?;

    chart.draw_series(
        view.points
            .iter()
            .map(|p| Circle::new((p.lon, p.lat), 5, GREEN.filled())),
    )?;

    if with_labels {
        chart.draw_series(view.points.iter().map(|p| {
            EmptyElement::at((p.lon, p.lat))
                + Text::new(p.label.clone(), (8, -8), ("sans-serif", 12).into_font())
        }))?;
    }

    if let Some((lat, lon)) = view.center {
        chart.draw_series(std::iter::once(Cross::new((lon, lat), 8, RED.stroke_width(2))))?;
    }

    root.present()?;
    Ok(())
}

fn draw_monthly_trend(path: &Path, monthly: &[MonthlyRow]) -> Result<()> {
    let root = SVGBackend::new(path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    if monthly.is_empty() {
        root.present()?;
        return Ok(());
    }

    let labels: Vec<String> = monthly.iter().map(|m| m.month.clone()).collect();
    let series = monthly_series(monthly);
    let max = monthly
        .iter()
        .flat_map(|m| m.values.iter().map(|(_, v)| *v))
        .max()
        .unwrap_or(0)
        .max(1);

    let mut chart = ChartBuilder::on(&root)
        .caption("Number of transactions by month", ("sans-serif", 30).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0usize..(monthly.len() - 1).max(1), 0u64..(max + max / 10))?;

    chart.configure_mesh()
        .x_desc("Month")
        .y_desc("Transactions")
        .x_labels(labels.len().max(2))
        .x_label_formatter(&|x| labels.get(*x).cloned().unwrap_or_default())
        .draw()?;

    for (idx, name) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        // Months missing this series leave a gap in the line
        let points: Vec<(usize, u64)> = monthly
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.value(name).map(|v| (i, v)))
            .collect();

        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(points.iter().map(|p| Circle::new(*p, 4, color.filled())))?;
    }

    chart.configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Segmented integer ranges are inclusive, so `len` bars need `0..len - 1`
fn bar_range(len: usize) -> Range<usize> {
    0..len.saturating_sub(1).max(1)
}

fn draw_top_branches(path: &Path, top: &[BranchCount], n: usize) -> Result<()> {
    let root = SVGBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    if top.is_empty() {
        root.present()?;
        return Ok(());
    }

    let labels: Vec<String> = top.iter().map(|b| b.branch.clone()).collect();
    let max = top.iter().map(|b| b.count).max().unwrap_or(0).max(1);

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Top {} branches by transactions", n), ("sans-serif", 30).into_font())
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(bar_range(labels.len()).into_segmented(), 0u64..(max + max / 10 + 1))?;

    chart.configure_mesh()
        .disable_x_mesh()
        .x_desc("Branch")
        .y_desc("Transactions")
        .x_labels(labels.len())
        .x_label_formatter(&|v| segment_label(v, &labels))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.mix(0.7).filled())
            .margin(6)
            .data(top.iter().enumerate().map(|(i, b)| (i, b.count))),
    )?;

    root.present()?;
    Ok(())
}

fn draw_hourly_breakdown(path: &Path, hours: &[HourBucket]) -> Result<()> {
    let root = SVGBackend::new(path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let max = hours.iter().map(|h| h.transactions).max().unwrap_or(0).max(1);

    let mut chart = ChartBuilder::on(&root)
        .caption("Breakdown of transactions per hour", ("sans-serif", 30).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((0u32..23u32).into_segmented(), 0u64..(max + max / 10 + 1))?;

    chart.configure_mesh()
        .disable_x_mesh()
        .x_desc("Hour")
        .y_desc("Transactions")
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(RED.mix(0.5).filled())
            .margin(0)
            .data(hours.iter().map(|h| (h.hour, h.transactions))),
    )?;

    root.present()?;
    Ok(())
}

fn draw_day_of_week(path: &Path, days: &[DayShare]) -> Result<()> {
    let root = SVGBackend::new(path, (900, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    if days.is_empty() {
        root.present()?;
        return Ok(());
    }

    let labels: Vec<String> = days.iter().map(|d| d.day.clone()).collect();
    let max = days.iter().map(|d| d.percentage).fold(0.0, f64::max).max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption("Percentage of transactions by day of week", ("sans-serif", 30).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(bar_range(labels.len()).into_segmented(), 0f64..(max * 1.1))?;

    chart.configure_mesh()
        .disable_x_mesh()
        .y_desc("Percentage (%)")
        .x_labels(labels.len())
        .x_label_formatter(&|v| segment_label(v, &labels))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.mix(0.6).filled())
            .margin(10)
            .data(days.iter().enumerate().map(|(i, d)| (i, d.percentage))),
    )?;

    chart.draw_series(LineSeries::new(
        days.iter()
            .enumerate()
            .map(|(i, d)| (SegmentValue::CenterOf(i), d.percentage)),
        RED.stroke_width(2),
    ))?;

    root.present()?;
    Ok(())
}

fn segment_label(value: &SegmentValue<usize>, labels: &[String]) -> String {
    match value {
        SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
        SegmentValue::Last => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use branch_pipeline::models::MapPoint;

    fn sample_views() -> DashboardViews {
        let map = MapView {
            center: Some((13.75, 100.53)),
            zoom: 11,
            points: vec![
                MapPoint { lat: 13.7245, lon: 100.5296, label: "0001Silom".to_string() },
                MapPoint { lat: 13.7797, lon: 100.5446, label: "0002Ari".to_string() },
            ],
        };

        DashboardViews {
            top_n: 2,
            nationwide: map.clone(),
            city: map,
            monthly: vec![
                MonthlyRow {
                    month: "Jan".to_string(),
                    values: vec![("bangkok".to_string(), 120), ("provincial".to_string(), 80)],
                },
                MonthlyRow {
                    month: "Feb".to_string(),
                    values: vec![("bangkok".to_string(), 98), ("provincial".to_string(), 70)],
                },
            ],
            top_branches: vec![
                BranchCount { branch: "0001".to_string(), count: 3 },
                BranchCount { branch: "0002".to_string(), count: 1 },
            ],
            top_branches_by_name: vec![
                BranchCount { branch: "Silom".to_string(), count: 3 },
                BranchCount { branch: "Ari".to_string(), count: 1 },
            ],
            hours: (0..24).map(|h| HourBucket { hour: h, transactions: (h % 5) as u64 }).collect(),
            days: ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"]
                .iter()
                .map(|d| DayShare { day: d.to_string(), percentage: 100.0 / 7.0 })
                .collect(),
        }
    }

    #[test]
    fn test_renders_every_chart() {
        let dir = tempfile::tempdir().unwrap();
        let mut visualizer = DashboardVisualizer::new(dir.path()).unwrap();

        visualizer.render(&sample_views()).unwrap();

        assert_eq!(visualizer.written().len(), 6);
        for path in visualizer.written() {
            let svg = std::fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"), "{} is not an svg", path.display());
        }
        assert!(dir.path().join("top_branches_2.svg").exists());
    }

    #[test]
    fn test_empty_views_still_render() {
        let dir = tempfile::tempdir().unwrap();
        let mut visualizer = DashboardVisualizer::new(dir.path()).unwrap();
        let mut views = sample_views();
        views.nationwide.points.clear();
        views.monthly.clear();
        views.top_branches.clear();

        visualizer.render(&views).unwrap();
        assert!(dir.path().join("monthly_trend.svg").exists());
    }

    #[test]
    fn test_monthly_trend_draws_each_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monthly_trend.svg");

        draw_monthly_trend(&path, &sample_views().monthly).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("bangkok"));
        assert!(svg.contains("provincial"));
    }

    #[test]
    fn test_bar_range_has_one_slot_per_label() {
        assert_eq!(bar_range(7), 0..6);
        assert_eq!(bar_range(24), 0..23);
        assert_eq!(bar_range(1), 0..1);
        assert_eq!(bar_range(0), 0..1);
    }

    #[test]
    fn test_single_bar_renders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top_branches_1.svg");
        let top = vec![BranchCount { branch: "0001".to_string(), count: 5 }];

        draw_top_branches(&path, &top, 1).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<svg"));
    }

    #[test]
    fn test_padded_range_is_never_empty() {
        let (lo, hi) = padded(13.7, 13.7);
        assert!(lo < 13.7 && hi > 13.7);
        assert!(hi - lo >= 2.0 * MAP_PADDING_DEG - 1e-9);
    }
}
