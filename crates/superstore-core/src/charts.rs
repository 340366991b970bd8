use std::fmt::Display;
use std::ops::Range;

use chrono::NaiveDate;
use plotters::prelude::*;
use superstore_parser::model::{date_to_epoch_days, epoch_days_to_date};

use crate::aggregates::Grouped;
use crate::error::RenderError;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 480;
const MAX_LABEL_CHARS: usize = 28;
const SERIES_COLORS: [RGBColor; 4] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
];

fn chart_error(err: impl Display) -> RenderError {
    RenderError::Chart(err.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarOrientation {
    Vertical,
    Horizontal,
}

/// How to print x-axis tick values of a line chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisFormat {
    Number,
    Year,
    /// Values are days since the unix epoch.
    Month,
}

impl AxisFormat {
    fn format(&self, value: f64) -> String {
        match self {
            AxisFormat::Number => compact_number(value),
            AxisFormat::Year => format!("{}", value.round() as i64),
            AxisFormat::Month => epoch_days_to_date(value.round() as i32)
                .map(|date| date.format("%Y-%m").to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeriesData {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

impl LineSeriesData {
    pub fn from_dates(name: impl Into<String>, grouped: &Grouped<NaiveDate>) -> Self {
        Self {
            name: name.into(),
            points: grouped
                .iter()
                .map(|entry| (f64::from(date_to_epoch_days(entry.key)), entry.value))
                .collect(),
        }
    }
}

/// Renders a grouped aggregate as bars, one per key, in its current order.
pub fn grouped_bar_chart<K: Display>(
    title: &str,
    value_label: &str,
    grouped: &Grouped<K>,
    orientation: BarOrientation,
) -> Result<String, RenderError> {
    let labels: Vec<String> = grouped.keys().map(ToString::to_string).collect();
    let values: Vec<f64> = grouped.values().collect();
    bar_chart(title, value_label, &labels, &values, orientation)
}

pub fn bar_chart(
    title: &str,
    value_label: &str,
    labels: &[String],
    values: &[f64],
    orientation: BarOrientation,
) -> Result<String, RenderError> {
    if values.is_empty() {
        return Err(RenderError::NoData(title.to_string()));
    }
    let value_range = padded_range(values.iter().copied(), true)
        .ok_or_else(|| RenderError::NoData(title.to_string()))?;
    let count = values.len() as i32;
    let label_of = |value: &SegmentValue<i32>| match value {
        SegmentValue::CenterOf(idx) | SegmentValue::Exact(idx) => labels
            .get(*idx as usize)
            .map(|label| truncate_label(label))
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        match orientation {
            BarOrientation::Vertical => {
                let mut chart = ChartBuilder::on(&root)
                    .caption(title, ("sans-serif", 22))
                    .margin(15)
                    .x_label_area_size(70)
                    .y_label_area_size(70)
                    .build_cartesian_2d((0..count).into_segmented(), value_range)
                    .map_err(chart_error)?;
                chart
                    .configure_mesh()
                    .disable_x_mesh()
                    .x_labels(values.len())
                    .x_label_formatter(&label_of)
                    .y_label_formatter(&|v: &f64| compact_number(*v))
                    .y_desc(value_label)
                    .draw()
                    .map_err(chart_error)?;
                chart
                    .draw_series(values.iter().enumerate().map(|(idx, value)| {
                        let idx = idx as i32;
                        let mut bar = Rectangle::new(
                            [
                                (SegmentValue::Exact(idx), 0.0),
                                (SegmentValue::Exact(idx + 1), *value),
                            ],
                            SERIES_COLORS[0].filled(),
                        );
                        bar.set_margin(0, 0, 6, 6);
                        bar
                    }))
                    .map_err(chart_error)?;
            }
            BarOrientation::Horizontal => {
                let mut chart = ChartBuilder::on(&root)
                    .caption(title, ("sans-serif", 22))
                    .margin(15)
                    .x_label_area_size(40)
                    .y_label_area_size(180)
                    .build_cartesian_2d(value_range, (0..count).into_segmented())
                    .map_err(chart_error)?;
                chart
                    .configure_mesh()
                    .disable_y_mesh()
                    .y_labels(values.len())
                    .y_label_formatter(&label_of)
                    .x_label_formatter(&|v: &f64| compact_number(*v))
                    .x_desc(value_label)
                    .draw()
                    .map_err(chart_error)?;
                chart
                    .draw_series(values.iter().enumerate().map(|(idx, value)| {
                        let idx = idx as i32;
                        let mut bar = Rectangle::new(
                            [
                                (0.0, SegmentValue::Exact(idx)),
                                (*value, SegmentValue::Exact(idx + 1)),
                            ],
                            SERIES_COLORS[0].filled(),
                        );
                        bar.set_margin(4, 4, 0, 0);
                        bar
                    }))
                    .map_err(chart_error)?;
            }
        }

        root.present().map_err(chart_error)?;
    }
    Ok(svg)
}

/// One or more lines over a shared numeric x axis. A legend is drawn when
/// there is more than one series.
pub fn line_chart(
    title: &str,
    y_label: &str,
    x_format: AxisFormat,
    series: &[LineSeriesData],
    markers: bool,
) -> Result<String, RenderError> {
    let points = || series.iter().flat_map(|line| line.points.iter());
    let x_range = padded_range(points().map(|(x, _)| *x), false)
        .ok_or_else(|| RenderError::NoData(title.to_string()))?;
    let y_range = padded_range(points().map(|(_, y)| *y), false)
        .ok_or_else(|| RenderError::NoData(title.to_string()))?;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)
            .map_err(chart_error)?;
        chart
            .configure_mesh()
            .x_labels(8)
            .x_label_formatter(&|v: &f64| x_format.format(*v))
            .y_label_formatter(&|v: &f64| compact_number(*v))
            .y_desc(y_label)
            .draw()
            .map_err(chart_error)?;

        for (idx, line) in series.iter().enumerate() {
            let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
            chart
                .draw_series(LineSeries::new(line.points.iter().copied(), color.stroke_width(2)))
                .map_err(chart_error)?
                .label(line.name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            if markers {
                chart
                    .draw_series(
                        line.points
                            .iter()
                            .map(|point| Circle::new(*point, 4, color.filled())),
                    )
                    .map_err(chart_error)?;
            }
        }

        if series.len() > 1 {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(chart_error)?;
        }

        root.present().map_err(chart_error)?;
    }
    Ok(svg)
}

pub fn scatter_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    points: &[(f64, f64)],
) -> Result<String, RenderError> {
    let x_range = padded_range(points.iter().map(|(x, _)| *x), false)
        .ok_or_else(|| RenderError::NoData(title.to_string()))?;
    let y_range = padded_range(points.iter().map(|(_, y)| *y), false)
        .ok_or_else(|| RenderError::NoData(title.to_string()))?;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)
            .map_err(chart_error)?;
        chart
            .configure_mesh()
            .x_desc(x_label)
            .y_desc(y_label)
            .y_label_formatter(&|v: &f64| compact_number(*v))
            .draw()
            .map_err(chart_error)?;
        chart
            .draw_series(
                points
                    .iter()
                    .map(|point| Circle::new(*point, 3, SERIES_COLORS[0].mix(0.6).filled())),
            )
            .map_err(chart_error)?;

        root.present().map_err(chart_error)?;
    }
    Ok(svg)
}

/// Finite min..max of `values` widened by 5% on each side. A flat range is
/// widened to a unit span so the axis stays drawable.
fn padded_range(values: impl Iterator<Item = f64>, include_zero: bool) -> Option<Range<f64>> {
    let (mut low, mut high) = values
        .filter(|value| value.is_finite())
        .fold(None, |bounds: Option<(f64, f64)>, value| match bounds {
            None => Some((value, value)),
            Some((low, high)) => Some((low.min(value), high.max(value))),
        })?;
    if include_zero {
        low = low.min(0.0);
        high = high.max(0.0);
    }
    if low == high {
        return Some(low - 1.0..high + 1.0);
    }
    let pad = (high - low) * 0.05;
    Some(low - pad..high + pad)
}

fn compact_number(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if magnitude >= 10_000.0 {
        format!("{:.0}k", value / 1_000.0)
    } else if magnitude >= 100.0 || magnitude == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let head: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
    format!("{head}…")
}
