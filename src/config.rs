use serde::{Deserialize, Serialize};

use crate::error::{EditorError, Result};
use crate::geometry::{self, Color, DEFAULT_TOLERANCE, WHITE};
use crate::layer::DrawMode;
use crate::shaders::{DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};

/// Editor-wide settings and the defaults applied to new layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EditorConfig {
    /// Quantization step for vertex deduplication.
    pub tolerance: f64,
    pub default_color: Color,
    /// Animation cycle length in seconds.
    pub period: f64,
    pub line_width: f32,
    pub draw_mode: DrawMode,
    pub vertex_shader: String,
    pub fragment_shader: String,
    /// Recolor brush radius in canvas pixels.
    pub pick_radius: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            default_color: WHITE,
            period: 2.0,
            line_width: 1.0,
            draw_mode: DrawMode::LineStrip,
            vertex_shader: DEFAULT_VERTEX_SHADER.to_string(),
            fragment_shader: DEFAULT_FRAGMENT_SHADER.to_string(),
            pick_radius: 12.0,
        }
    }
}

impl EditorConfig {
    /// Parse a config document. Missing keys take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| EditorError::Config(e.to_string()))?;
        if !(config.period.is_finite() && config.period > 0.0) {
            return Err(EditorError::Config(format!(
                "period must be positive, got {}",
                config.period
            )));
        }
        Ok(config)
    }

    pub fn effective_tolerance(&self) -> f64 {
        geometry::clamp_tolerance(self.tolerance)
    }
}
