use log::info;

use crate::config::EditorConfig;
use crate::document::{self, LayerDocument, SceneDocument};
use crate::error::{EditorError, Result};
use crate::layer::{Layer, LayerId};

/// Ordered layers (first is painted first), the animation period, and the
/// layer that edits go to.
#[derive(Debug, Clone)]
pub struct Scene {
    config: EditorConfig,
    layers: Vec<Layer>,
    period: f64,
    current: Option<LayerId>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Scene {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            period: config.period,
            config,
            layers: Vec::new(),
            current: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn set_period(&mut self, period: f64) -> Result<()> {
        if !(period.is_finite() && period > 0.0) {
            return Err(EditorError::InvalidPeriod(period));
        }
        self.period = period;
        Ok(())
    }

    /// Position within the animation cycle at `time`, in `[0, 1)`.
    pub fn phase(&self, time: f64) -> f64 {
        (time / self.period).rem_euclid(1.0)
    }

    /// Add an empty layer on top and make it current.
    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = LayerId(self.next_id());
        let name = name.into();
        let name = if name.is_empty() {
            format!("Layer {id}")
        } else {
            name
        };
        info!("adding layer {id} \"{name}\"");
        self.layers.push(Layer::new(id, name, &self.config));
        self.current = Some(id);
        id
    }

    /// Remove a layer. If it was current, the topmost remaining layer
    /// becomes current.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let position = self.position(id)?;
        let layer = self.layers.remove(position);
        if self.current == Some(id) {
            self.current = self.layers.last().map(Layer::id);
        }
        info!("removed layer {id}");
        Some(layer)
    }

    /// Move a layer to `position` in paint order, clamped to the end.
    pub fn move_layer(&mut self, id: LayerId, position: usize) -> Result<()> {
        let from = self.position(id).ok_or(EditorError::UnknownLayer(id))?;
        let layer = self.layers.remove(from);
        let to = position.min(self.layers.len());
        self.layers.insert(to, layer);
        Ok(())
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    pub fn current_layer_id(&self) -> Option<LayerId> {
        self.current
    }

    pub fn set_current_layer(&mut self, id: LayerId) -> Result<()> {
        if self.position(id).is_none() {
            return Err(EditorError::UnknownLayer(id));
        }
        self.current = Some(id);
        Ok(())
    }

    pub fn current_layer(&self) -> Option<&Layer> {
        self.current.and_then(|id| self.layer(id))
    }

    pub fn current_layer_mut(&mut self) -> Option<&mut Layer> {
        let id = self.current?;
        self.layer_mut(id)
    }

    pub fn to_document(&self) -> SceneDocument {
        document::export_document(&self.layers, self.period)
    }

    /// Every layer expanded to flat geometry.
    pub fn to_flat_document(&self) -> SceneDocument {
        SceneDocument {
            layers: self.layers.iter().map(LayerDocument::flat_from_layer).collect(),
            period: self.period,
        }
    }

    pub fn export_json(&self) -> Result<String> {
        document::export_json(&self.layers, self.period)
    }

    /// Append the layers of a document and adopt its period. The first
    /// imported layer becomes current. On error the scene is unchanged.
    pub fn import_json(&mut self, text: &str) -> Result<Vec<LayerId>> {
        let imported = document::import_json(text, &self.layers, &self.config)?;
        let ids: Vec<LayerId> = imported.layers.iter().map(Layer::id).collect();
        self.period = imported.period;
        self.layers.extend(imported.layers);
        if let Some(&first) = ids.first() {
            self.current = Some(first);
        }
        Ok(ids)
    }

    /// Compact every indexed layer. Returns how many changed.
    pub fn compact_all(&mut self) -> usize {
        self.layers.iter_mut().map(Layer::compact_geometry).filter(|&c| c).count()
    }

    fn position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    fn next_id(&self) -> u32 {
        self.layers.iter().map(|l| l.id().0).max().map_or(1, |max| max + 1)
    }
}
