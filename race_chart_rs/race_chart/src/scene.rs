//! Renderer-independent description of one chart frame.
//!
//! All coordinates are in "bounds" space: the origin is the top-left corner of
//! the plotting area, inside the configured margins.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::config::ChartConfig;
use crate::dataset::Record;
use crate::format::{format_time, format_year};
use crate::scale::LinearScale;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Marker {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AxisOrientation {
    Bottom,
    Left,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AxisTick {
    pub value: f64,
    /// Position along the axis in bounds pixels.
    pub offset: f64,
    pub label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Axis {
    pub orientation: AxisOrientation,
    /// Pixel extent covered by the axis line.
    pub range: (f64, f64),
    /// Perpendicular translation: y for a bottom axis, x for a left axis.
    pub translate: f64,
    pub ticks: Vec<AxisTick>,
}

impl Axis {
    fn build<F>(
        orientation: AxisOrientation,
        scale: &LinearScale,
        count: usize,
        translate: f64,
        label: F,
    ) -> Self
    where
        F: Fn(f64) -> String,
    {
        let ticks = scale
            .ticks(count)
            .into_iter()
            .map(|value| AxisTick {
                value,
                offset: scale.apply(value),
                label: label(value),
            })
            .collect();
        Self {
            orientation,
            range: scale.range,
            translate,
            ticks,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subtitle {
    pub event: String,
    pub race: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Scene {
    /// Polyline vertices ordered by year.
    pub line: Vec<(f64, f64)>,
    /// One marker per record, in record order.
    pub markers: Vec<Marker>,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub subtitle: Subtitle,
}

impl Scene {
    pub fn build(
        records: &[Record],
        x_scale: &LinearScale,
        y_scale: &LinearScale,
        config: &ChartConfig,
    ) -> Self {
        let position = |r: &Record| (x_scale.apply(r.year as f64), y_scale.apply(r.time_seconds));

        let mut by_year: Vec<&Record> = records.iter().collect();
        by_year.sort_by_key(|r| r.year);
        let line = by_year.into_iter().map(position).collect();

        let markers = records
            .iter()
            .map(|r| {
                let (cx, cy) = position(r);
                Marker {
                    cx,
                    cy,
                    r: config.marker_radius,
                }
            })
            .collect();

        let x_axis = Axis::build(
            AxisOrientation::Bottom,
            x_scale,
            config.x_ticks,
            config.bounded_height() + config.axis_padding,
            format_year,
        );
        let y_axis = Axis::build(
            AxisOrientation::Left,
            y_scale,
            config.y_ticks,
            -config.axis_padding,
            format_time,
        );

        let subtitle = records
            .first()
            .map(|r| Subtitle {
                event: r.event_name.clone(),
                race: r.race_name.clone(),
            })
            .unwrap_or_default();

        Self {
            line,
            markers,
            x_axis,
            y_axis,
            subtitle,
        }
    }

    pub fn segment_count(&self) -> usize {
        self.line.len().saturating_sub(1)
    }

    /// SVG path data for the polyline (`M x,y L x,y ...`).
    pub fn path_data(&self) -> String {
        let mut out = String::new();
        for (idx, (x, y)) in self.line.iter().enumerate() {
            let cmd = if idx == 0 { 'M' } else { 'L' };
            let _ = write!(out, "{cmd}{x},{y}");
        }
        out
    }
}
