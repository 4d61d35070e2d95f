use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ChartError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 10.0,
            right: 120.0,
            bottom: 30.0,
            left: 120.0,
        }
    }
}

/// Layout and styling shared by every renderer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
    pub axis_padding: f64,
    pub x_ticks: usize,
    pub y_ticks: usize,
    pub transition_ms: f64,
    pub line_color: String,
    pub line_width: f64,
    pub marker_color: String,
    pub marker_radius: f64,
    pub highlight_color: String,
    pub highlight_radius: f64,
    pub caption: Option<String>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 400.0,
            margin: Margin::default(),
            axis_padding: 10.0,
            x_ticks: 10,
            y_ticks: 6,
            transition_ms: 800.0,
            line_color: "#2a9d8f".to_string(),
            line_width: 2.0,
            marker_color: "#264653".to_string(),
            marker_radius: 5.0,
            highlight_color: "#264653".to_string(),
            highlight_radius: 7.0,
            caption: Some("Data: ITRA".to_string()),
        }
    }
}

impl ChartConfig {
    pub fn bounded_width(&self) -> f64 {
        self.width - self.margin.left - self.margin.right
    }

    pub fn bounded_height(&self) -> f64 {
        self.height - self.margin.top - self.margin.bottom
    }

    /// Reject layouts that leave no drawing area.
    pub fn validate(&self) -> Result<(), ChartError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(ChartError::InvalidConfig(format!(
                "width and height must be positive (got {}x{})",
                self.width, self.height
            )));
        }
        if self.bounded_width() <= 0.0 || self.bounded_height() <= 0.0 {
            return Err(ChartError::InvalidConfig(
                "margins leave no drawing area".into(),
            ));
        }
        if self.transition_ms < 0.0 || !self.transition_ms.is_finite() {
            return Err(ChartError::InvalidConfig(
                "transition_ms must be a finite, non-negative number".into(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(text: &str) -> Result<Self, ChartError> {
        let config: ChartConfig = serde_json::from_str(text)
            .map_err(|e| ChartError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_path(path: &Path) -> Result<Self, ChartError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
