//! Indexed 2D vertex editor: deduplicated geometry layers, a JSON scene
//! format, and a WebGL2 front end for the browser.

pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod logging;
pub mod projection;
pub mod scene;
pub mod shaders;
#[cfg(not(target_arch = "wasm32"))]
pub mod site;

pub use config::EditorConfig;
pub use error::{EditorError, Result};
pub use layer::{DrawMode, Geometry, Layer, LayerId};
pub use scene::Scene;

// Only compile wasm-specific code when targeting wasm32.

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use wasm_bindgen::prelude::*;

    mod editor;
    mod render;

    pub use editor::Editor;

    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        crate::logging::init();
        log::info!("vertex editor module loaded");
        Ok(())
    }
}
