//! View transforms: stateless projections of one history field into the point
//! shapes different chart consumers expect.
//!
//! All five shapes are built from the same slice, so they agree on count,
//! order and per-index labels by construction. Values are copied verbatim.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{MsimError, Result};
use crate::metrics::sample::{MetricField, MetricSample};

/// Curve tension carried by the label-series dataset.
pub const LABEL_SERIES_TENSION: f64 = 0.4;
/// Alpha of the translucent fill colour.
pub const FILL_ALPHA: f64 = 0.1;

/// Locale-independent display label for a timestamp (`HH:MM:SS`, UTC).
#[must_use]
pub fn time_label(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%H:%M:%S").to_string()
}

// ──────────────────── shapes ────────────────────

/// Selectable output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewShape {
    /// Parallel label array plus one dataset of values.
    LabelSeries,
    /// Category axis plus one named line series.
    AxisSeries,
    /// `{time, value}` records.
    PointList,
    /// `{x, y}` records.
    XyPairs,
    /// `{x, y, time, value}` records.
    XyNamedPairs,
}

impl ViewShape {
    /// Every shape.
    pub const ALL: [Self; 5] = [
        Self::LabelSeries,
        Self::AxisSeries,
        Self::PointList,
        Self::XyPairs,
        Self::XyNamedPairs,
    ];

    /// Kebab-case name accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LabelSeries => "label-series",
            Self::AxisSeries => "axis-series",
            Self::PointList => "point-list",
            Self::XyPairs => "xy-pairs",
            Self::XyNamedPairs => "xy-named-pairs",
        }
    }
}

impl fmt::Display for ViewShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ViewShape {
    type Err = MsimError;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|shape| shape.name() == normalized)
            .ok_or_else(|| MsimError::UnknownView {
                name: raw.to_string(),
            })
    }
}

/// One dataset of a [`LabelSeriesView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDataset {
    /// Field label with units.
    pub label: String,
    /// One value per label.
    pub data: Vec<f64>,
    /// Opaque field colour.
    pub border_color: String,
    /// Translucent field colour.
    pub background_color: String,
    /// Curve tension.
    pub tension: f64,
}

/// Time labels plus a single dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSeriesView {
    /// One `HH:MM:SS` label per sample.
    pub labels: Vec<String>,
    /// Exactly one dataset.
    pub datasets: Vec<LabelDataset>,
}

/// One series of an [`AxisSeriesView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSeries {
    /// Field label with units.
    pub name: String,
    /// One value per axis category.
    pub data: Vec<f64>,
    /// Always `"line"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Always `true`.
    pub smooth: bool,
}

/// Category axis plus a single series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisSeriesView {
    /// One `HH:MM:SS` category per sample.
    pub x_axis: Vec<String>,
    /// Exactly one series.
    pub series: Vec<AxisSeries>,
}

/// `{time, value}` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeValuePoint {
    /// `HH:MM:SS` label.
    pub time: String,
    /// Field value.
    pub value: f64,
}

/// `{x, y}` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XyPoint {
    /// `HH:MM:SS` label.
    pub x: String,
    /// Field value.
    pub y: f64,
}

/// `{x, y, time, value}` record; `time`/`value` duplicate `x`/`y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XyNamedPoint {
    /// `HH:MM:SS` label.
    pub x: String,
    /// Field value.
    pub y: f64,
    /// Same as `x`.
    pub time: String,
    /// Same as `y`.
    pub value: f64,
}

/// Output of [`render`], tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum View {
    /// See [`label_series`].
    LabelSeries(LabelSeriesView),
    /// See [`axis_series`].
    AxisSeries(AxisSeriesView),
    /// See [`point_list`].
    PointList(Vec<TimeValuePoint>),
    /// See [`xy_pairs`].
    XyPairs(Vec<XyPoint>),
    /// See [`xy_named_pairs`].
    XyNamedPairs(Vec<XyNamedPoint>),
}

impl View {
    /// Shape this view was rendered as.
    #[must_use]
    pub const fn shape(&self) -> ViewShape {
        match self {
            Self::LabelSeries(_) => ViewShape::LabelSeries,
            Self::AxisSeries(_) => ViewShape::AxisSeries,
            Self::PointList(_) => ViewShape::PointList,
            Self::XyPairs(_) => ViewShape::XyPairs,
            Self::XyNamedPairs(_) => ViewShape::XyNamedPairs,
        }
    }

    /// `(label, value)` per point, whatever the shape.
    #[must_use]
    pub fn points(&self) -> Vec<(String, f64)> {
        match self {
            Self::LabelSeries(view) => {
                let values = view.datasets.first().map_or(&[][..], |d| &d.data[..]);
                view.labels.iter().cloned().zip(values.iter().copied()).collect()
            }
            Self::AxisSeries(view) => {
                let values = view.series.first().map_or(&[][..], |s| &s.data[..]);
                view.x_axis.iter().cloned().zip(values.iter().copied()).collect()
            }
            Self::PointList(points) => points.iter().map(|p| (p.time.clone(), p.value)).collect(),
            Self::XyPairs(points) => points.iter().map(|p| (p.x.clone(), p.y)).collect(),
            Self::XyNamedPairs(points) => points.iter().map(|p| (p.x.clone(), p.y)).collect(),
        }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::LabelSeries(view) => view.labels.len(),
            Self::AxisSeries(view) => view.x_axis.len(),
            Self::PointList(points) => points.len(),
            Self::XyPairs(points) => points.len(),
            Self::XyNamedPairs(points) => points.len(),
        }
    }

    /// Whether the view has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ──────────────────── transforms ────────────────────

fn labels(samples: &[MetricSample]) -> Vec<String> {
    samples.iter().map(|s| time_label(s.timestamp)).collect()
}

fn values(samples: &[MetricSample], field: MetricField) -> Vec<f64> {
    samples.iter().map(|s| s.value(field)).collect()
}

/// Labels plus one styled dataset.
#[must_use]
pub fn label_series(samples: &[MetricSample], field: MetricField) -> LabelSeriesView {
    LabelSeriesView {
        labels: labels(samples),
        datasets: vec![LabelDataset {
            label: field.label().to_string(),
            data: values(samples, field),
            border_color: field.color(1.0),
            background_color: field.color(FILL_ALPHA),
            tension: LABEL_SERIES_TENSION,
        }],
    }
}

/// Category axis plus one smooth line series.
#[must_use]
pub fn axis_series(samples: &[MetricSample], field: MetricField) -> AxisSeriesView {
    AxisSeriesView {
        x_axis: labels(samples),
        series: vec![AxisSeries {
            name: field.label().to_string(),
            data: values(samples, field),
            kind: "line".to_string(),
            smooth: true,
        }],
    }
}

/// `{time, value}` per sample.
#[must_use]
pub fn point_list(samples: &[MetricSample], field: MetricField) -> Vec<TimeValuePoint> {
    samples
        .iter()
        .map(|s| TimeValuePoint {
            time: time_label(s.timestamp),
            value: s.value(field),
        })
        .collect()
}

/// `{x, y}` per sample.
#[must_use]
pub fn xy_pairs(samples: &[MetricSample], field: MetricField) -> Vec<XyPoint> {
    samples
        .iter()
        .map(|s| XyPoint {
            x: time_label(s.timestamp),
            y: s.value(field),
        })
        .collect()
}

/// `{x, y, time, value}` per sample.
#[must_use]
pub fn xy_named_pairs(samples: &[MetricSample], field: MetricField) -> Vec<XyNamedPoint> {
    samples
        .iter()
        .map(|s| {
            let label = time_label(s.timestamp);
            let value = s.value(field);
            XyNamedPoint {
                x: label.clone(),
                y: value,
                time: label,
                value,
            }
        })
        .collect()
}

/// Dispatch on `shape`.
#[must_use]
pub fn render(shape: ViewShape, samples: &[MetricSample], field: MetricField) -> View {
    match shape {
        ViewShape::LabelSeries => View::LabelSeries(label_series(samples, field)),
        ViewShape::AxisSeries => View::AxisSeries(axis_series(samples, field)),
        ViewShape::PointList => View::PointList(point_list(samples, field)),
        ViewShape::XyPairs => View::XyPairs(xy_pairs(samples, field)),
        ViewShape::XyNamedPairs => View::XyNamedPairs(xy_named_pairs(samples, field)),
    }
}

/// Name-based variant of [`render`] for callers holding strings.
pub fn render_by_name(shape: &str, samples: &[MetricSample], field: &str) -> Result<View> {
    let shape: ViewShape = shape.parse()?;
    let field: MetricField = field.parse()?;
    Ok(render(shape, samples, field))
}
