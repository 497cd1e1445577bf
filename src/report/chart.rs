//! SVG comparison chart.
//!
//! Dates are plotted as day numbers on an `f64` axis and formatted back to
//! `YYYY-MM` labels, which keeps the chart independent of plotters' optional
//! chrono coordinate support.

use chrono::{Datelike, NaiveDate};
use plotters::prelude::*;

use crate::domain::Series;
use crate::error::PipelineError;

/// Wide layout so multi-year monthly labels stay readable.
pub const CHART_SIZE: (u32, u32) = (2000, 500);

const MARKER_RADIUS: u32 = 4;
const X_LABELS: usize = 24;

/// One labelled line on the chart.
pub struct ChartLine<'a> {
    pub label: &'static str,
    pub color: RGBColor,
    pub series: &'a Series,
}

/// Render every non-empty line onto one chart and return the SVG document.
pub fn render_chart(lines: &[ChartLine<'_>]) -> Result<String, PipelineError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        draw(&root, lines).map_err(|e| PipelineError::Assembly(format!("chart rendering failed: {e}")))?;
        root.present()
            .map_err(|e| PipelineError::Assembly(format!("chart rendering failed: {e}")))?;
    }
    Ok(svg)
}

fn draw(
    root: &DrawingArea<SVGBackend<'_>, plotters::coord::Shift>,
    lines: &[ChartLine<'_>],
) -> Result<(), Box<dyn std::error::Error>> {
    root.fill(&WHITE)?;

    let (x_range, y_range) = bounds(lines);

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 90)
        .set_label_area_size(LabelAreaPosition::Bottom, 90)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_labels(X_LABELS)
        .y_labels(10)
        .x_label_formatter(&|x| format_day(*x))
        .y_label_formatter(&|y| format!("{y:.0}"))
        .x_label_style(
            ("sans-serif", 14)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .y_desc("Revenue")
        .draw()?;

    for line in lines.iter().filter(|l| !l.series.is_empty()) {
        let color = line.color;
        let points: Vec<(f64, f64)> = line.series.iter().map(|p| (day_number(p.date), p.value)).collect();

        chart
            .draw_series(LineSeries::new(points.iter().copied(), &color))?
            .label(line.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(
            points
                .iter()
                .map(|&p| Circle::new(p, MARKER_RADIUS, color.filled())),
        )?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

/// Axis ranges covering every point, padded so markers are not clipped.
fn bounds(lines: &[ChartLine<'_>]) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let points = lines.iter().flat_map(|l| l.series.iter());
    let (mut x0, mut x1, mut y0, mut y1) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for p in points {
        let x = day_number(p.date);
        x0 = x0.min(x);
        x1 = x1.max(x);
        y0 = y0.min(p.value);
        y1 = y1.max(p.value);
    }
    if x0 > x1 {
        return (0.0..1.0, 0.0..1.0);
    }

    let x_pad = ((x1 - x0) * 0.02).max(15.0);
    let y_pad = ((y1 - y0) * 0.05).max(y1.abs().max(1.0) * 0.05);
    ((x0 - x_pad)..(x1 + x_pad), (y0 - y_pad)..(y1 + y_pad))
}

fn day_number(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn format_day(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monthly(values: &[(i32, u32, f64)]) -> Series {
        Series::from_pairs(
            values
                .iter()
                .map(|&(y, m, v)| (NaiveDate::from_ymd_opt(y, m, 1).unwrap(), v)),
        )
        .unwrap()
    }

    #[test]
    fn renders_legend_for_non_empty_lines_only() {
        let actual = monthly(&[(2024, 1, 10.0), (2024, 2, 12.0)]);
        let empty = Series::empty();
        let svg = render_chart(&[
            ChartLine {
                label: "Actual",
                color: GREEN,
                series: &actual,
            },
            ChartLine {
                label: "Future Prediction",
                color: BLUE,
                series: &empty,
            },
        ])
        .unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains("2000"));
        assert!(svg.contains("Actual"));
        assert!(!svg.contains("Future Prediction"));
        assert!(svg.contains("<circle"));
    }

    #[test]
    fn single_point_chart_has_a_usable_range() {
        let one = monthly(&[(2024, 3, 5.0)]);
        let (x, y) = bounds(&[ChartLine {
            label: "Actual",
            color: GREEN,
            series: &one,
        }]);
        assert!(x.end > x.start);
        assert!(y.end > y.start);
    }

    #[test]
    fn labels_are_year_month() {
        let d = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        assert_eq!(format_day(day_number(d)), "2024-04");
    }
}
