//! The persisted JSON scene format.
//!
//! ```json
//! { "layers": [ { "id": 1, "name": "outline",
//!                 "vertices": [[0,0],[1,0]], "colors": [[1,1,1],[1,0,0]],
//!                 "indices": [0,1,0],
//!                 "vertexShader": "...", "fragmentShader": "...",
//!                 "mode": "LINE_STRIP", "lineWidth": 1 } ],
//!   "period": 2.0 }
//! ```
//!
//! A non-empty `indices` array is the only marker of indexed geometry.
//! Layers without one load flat and draw their vertices in order.

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::geometry::{self, Color, FlatGeometry, IndexedGeometry, Position};
use crate::layer::{DrawMode, Geometry, Layer, LayerId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub layers: Vec<LayerDocument>,
    pub period: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDocument {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vertices: Vec<Position>,
    #[serde(default)]
    pub colors: Vec<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_shader: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_shader: Option<String>,
    #[serde(default)]
    pub mode: DrawMode,
    #[serde(default = "default_line_width")]
    pub line_width: f32,
}

fn default_line_width() -> f32 {
    1.0
}

impl LayerDocument {
    pub fn from_layer(layer: &Layer) -> Self {
        let indices = layer
            .indices()
            .filter(|indices| !indices.is_empty())
            .map(<[u32]>::to_vec);
        Self {
            id: layer.id().0,
            name: layer.name().to_string(),
            vertices: layer.vertices().to_vec(),
            colors: layer.colors().to_vec(),
            indices,
            vertex_shader: Some(layer.vertex_shader().to_string()),
            fragment_shader: Some(layer.fragment_shader().to_string()),
            mode: layer.draw_mode(),
            line_width: layer.line_width(),
        }
    }

    /// Same layer expanded to one vertex per draw reference, without indices.
    pub fn flat_from_layer(layer: &Layer) -> Self {
        let flat = match layer.geometry() {
            Geometry::Flat(flat) => flat.clone(),
            Geometry::Indexed(indexed) => geometry::to_flat(indexed),
        };
        Self {
            vertices: flat.vertices,
            colors: flat.colors,
            indices: None,
            ..Self::from_layer(layer)
        }
    }

    /// Rebuild a layer under a fresh `id`. Shaders missing from the
    /// document fall back to the config's.
    pub fn into_layer(self, id: LayerId, config: &EditorConfig) -> Result<Layer> {
        let colors = if self.colors.is_empty() {
            vec![config.default_color; self.vertices.len()]
        } else if self.colors.len() != self.vertices.len() {
            return Err(EditorError::format(format!(
                "layer \"{}\" has {} vertices but {} colors",
                self.name,
                self.vertices.len(),
                self.colors.len()
            )));
        } else {
            self.colors
        };

        let tolerance = config.effective_tolerance();
        let geometry = match self.indices {
            Some(indices) if !indices.is_empty() => Geometry::Indexed(IndexedGeometry::from_parts(
                &self.vertices,
                &colors,
                &indices,
                tolerance,
            )?),
            _ if self.vertices.is_empty() => Geometry::Indexed(IndexedGeometry::new(tolerance)),
            _ => Geometry::Flat(FlatGeometry {
                vertices: self.vertices,
                colors,
            }),
        };

        let name = if self.name.is_empty() {
            format!("Layer {id}")
        } else {
            self.name
        };
        let mut layer = Layer::new(id, name, config);
        layer.replace_geometry(geometry);
        layer.set_draw_mode(self.mode);
        layer.set_line_width(self.line_width);
        layer.set_shaders(
            self.vertex_shader.unwrap_or_else(|| config.vertex_shader.clone()),
            self.fragment_shader.unwrap_or_else(|| config.fragment_shader.clone()),
        );
        Ok(layer)
    }
}

pub fn export_document(layers: &[Layer], period: f64) -> SceneDocument {
    SceneDocument {
        layers: layers.iter().map(LayerDocument::from_layer).collect(),
        period,
    }
}

pub fn export_json(layers: &[Layer], period: f64) -> Result<String> {
    let text = serde_json::to_string_pretty(&export_document(layers, period))?;
    info!("exported {} layers", layers.len());
    Ok(text)
}

/// Layers rebuilt from a document, not yet part of any scene.
#[derive(Debug, Clone)]
pub struct ImportedScene {
    pub layers: Vec<Layer>,
    pub period: f64,
}

/// Parse a scene document.
///
/// Imported layers get sequential ids continuing after the largest id in
/// `existing`. Any malformed part fails the whole import.
pub fn import_json(text: &str, existing: &[Layer], config: &EditorConfig) -> Result<ImportedScene> {
    let root: Value = serde_json::from_str(text).map_err(|e| EditorError::format(e.to_string()))?;
    let entries = root
        .get("layers")
        .ok_or_else(|| EditorError::format("missing `layers`"))?
        .as_array()
        .ok_or_else(|| EditorError::format("`layers` is not an array"))?;

    let period = match root.get("period") {
        None | Some(Value::Null) => config.period,
        Some(value) => match value.as_f64() {
            Some(p) if p.is_finite() && p > 0.0 => p,
            _ => return Err(EditorError::format(format!("invalid period: {value}"))),
        },
    };

    let first_id = existing.iter().map(|l| l.id().0).max().map_or(1, |max| max + 1);
    let mut layers = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let doc = LayerDocument::deserialize(entry)
            .map_err(|e| EditorError::format(format!("layer {i}: {e}")))?;
        layers.push(doc.into_layer(LayerId(first_id + i as u32), config)?);
    }
    info!("imported {} layers (period {period})", layers.len());
    Ok(ImportedScene { layers, period })
}
