//! JavaScript-facing editor session.
//!
//! Pointer coordinates are canvas-relative CSS pixels (`offsetX`/`offsetY`).

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

use super::render;
use crate::config::EditorConfig;
use crate::layer::{DrawMode, Layer, LayerId};
use crate::projection::Viewport;
use crate::scene::Scene;

fn js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

#[wasm_bindgen]
pub struct Editor {
    scene: Rc<RefCell<Scene>>,
    canvas: HtmlCanvasElement,
}

#[wasm_bindgen]
impl Editor {
    /// Create a session with one empty layer and start drawing it into
    /// `canvas`. `config` is an optional editor config JSON document.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, config: Option<String>) -> Result<Editor, JsError> {
        crate::logging::init();
        let config = match config {
            Some(text) => EditorConfig::from_json(&text).map_err(js_error)?,
            None => EditorConfig::default(),
        };
        let mut scene = Scene::new(config);
        scene.add_layer("Layer 1");
        let scene = Rc::new(RefCell::new(scene));
        render::start(canvas.clone(), scene.clone())
            .map_err(|e| JsError::new(&format!("renderer failed to start: {e:?}")))?;
        Ok(Editor { scene, canvas })
    }

    #[wasm_bindgen(js_name = addLayer)]
    pub fn add_layer(&self, name: &str) -> u32 {
        self.scene.borrow_mut().add_layer(name).0
    }

    #[wasm_bindgen(js_name = removeLayer)]
    pub fn remove_layer(&self, id: u32) -> bool {
        self.scene.borrow_mut().remove_layer(LayerId(id)).is_some()
    }

    #[wasm_bindgen(js_name = selectLayer)]
    pub fn select_layer(&self, id: u32) -> Result<(), JsError> {
        self.scene.borrow_mut().set_current_layer(LayerId(id)).map_err(js_error)
    }

    #[wasm_bindgen(js_name = currentLayer)]
    pub fn current_layer(&self) -> Option<u32> {
        self.scene.borrow().current_layer_id().map(|id| id.0)
    }

    #[wasm_bindgen(js_name = layerIds)]
    pub fn layer_ids(&self) -> Vec<u32> {
        self.scene.borrow().layers().iter().map(|l| l.id().0).collect()
    }

    /// Append a point to the current layer, creating a layer if there is
    /// none. Returns the vertex slot used.
    #[wasm_bindgen(js_name = addPoint)]
    pub fn add_point(&self, px: f64, py: f64, r: f64, g: f64, b: f64) -> u32 {
        let position = self.viewport().to_ndc([px, py]);
        let mut scene = self.scene.borrow_mut();
        if scene.current_layer().is_none() {
            scene.add_layer("");
        }
        scene
            .current_layer_mut()
            .map_or(0, |layer| layer.add_vertex(position, [r, g, b]))
    }

    /// Remove the last point of the current layer.
    pub fn undo(&self) -> Option<u32> {
        self.with_current(Layer::remove_last_vertex).flatten()
    }

    pub fn compact(&self) -> bool {
        self.with_current(Layer::compact_geometry).unwrap_or(false)
    }

    /// Paint the current layer's vertices within the configured pick radius
    /// of a pointer position.
    #[wasm_bindgen(js_name = recolorNear)]
    pub fn recolor_near(&self, px: f64, py: f64, r: f64, g: f64, b: f64) -> u32 {
        let viewport = self.viewport();
        let radius = self.scene.borrow().config().pick_radius;
        self.with_current(|layer| {
            layer.recolor_vertices_near([px, py], radius, [r, g, b], |p| viewport.to_pixel(p))
        })
        .unwrap_or(0) as u32
    }

    #[wasm_bindgen(js_name = setDrawMode)]
    pub fn set_draw_mode(&self, mode: &str) -> Result<(), JsError> {
        let mode: DrawMode = mode.parse().map_err(js_error)?;
        self.with_current(|layer| layer.set_draw_mode(mode));
        Ok(())
    }

    #[wasm_bindgen(js_name = setLineWidth)]
    pub fn set_line_width(&self, width: f32) {
        self.with_current(|layer| layer.set_line_width(width));
    }

    #[wasm_bindgen(js_name = setShaders)]
    pub fn set_shaders(&self, vertex: &str, fragment: &str) {
        self.with_current(|layer| layer.set_shaders(vertex, fragment));
    }

    #[wasm_bindgen(js_name = setVisible)]
    pub fn set_visible(&self, visible: bool) {
        self.with_current(|layer| layer.set_visible(visible));
    }

    #[wasm_bindgen(js_name = setLayerName)]
    pub fn set_layer_name(&self, name: &str) {
        self.with_current(|layer| layer.set_name(name));
    }

    #[wasm_bindgen(js_name = setPeriod)]
    pub fn set_period(&self, period: f64) -> Result<(), JsError> {
        self.scene.borrow_mut().set_period(period).map_err(js_error)
    }

    #[wasm_bindgen(js_name = renderVertexCount)]
    pub fn render_vertex_count(&self) -> u32 {
        self.scene
            .borrow()
            .current_layer()
            .map_or(0, |l| l.render_vertex_count() as u32)
    }

    #[wasm_bindgen(js_name = uniqueVertexCount)]
    pub fn unique_vertex_count(&self) -> u32 {
        self.scene
            .borrow()
            .current_layer()
            .map_or(0, |l| l.unique_vertex_count() as u32)
    }

    #[wasm_bindgen(js_name = exportJson)]
    pub fn export_json(&self) -> Result<String, JsError> {
        self.scene.borrow().export_json().map_err(js_error)
    }

    /// Merge a scene document into the session. Returns the new layer ids.
    #[wasm_bindgen(js_name = importJson)]
    pub fn import_json(&self, text: &str) -> Result<Vec<u32>, JsError> {
        let ids = self.scene.borrow_mut().import_json(text).map_err(js_error)?;
        Ok(ids.into_iter().map(|id| id.0).collect())
    }
}

impl Editor {
    fn viewport(&self) -> Viewport {
        Viewport::new(
            f64::from(self.canvas.client_width()),
            f64::from(self.canvas.client_height()),
        )
    }

    fn with_current<T>(&self, f: impl FnOnce(&mut Layer) -> T) -> Option<T> {
        self.scene.borrow_mut().current_layer_mut().map(f)
    }
}
