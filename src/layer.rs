use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::geometry::{self, Color, FlatGeometry, IndexedGeometry, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primitive topology used when drawing a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawMode {
    #[default]
    LineStrip,
    Lines,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl DrawMode {
    pub const ALL: [DrawMode; 6] = [
        DrawMode::LineStrip,
        DrawMode::Lines,
        DrawMode::LineLoop,
        DrawMode::Triangles,
        DrawMode::TriangleStrip,
        DrawMode::TriangleFan,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DrawMode::LineStrip => "LINE_STRIP",
            DrawMode::Lines => "LINES",
            DrawMode::LineLoop => "LINE_LOOP",
            DrawMode::Triangles => "TRIANGLES",
            DrawMode::TriangleStrip => "TRIANGLE_STRIP",
            DrawMode::TriangleFan => "TRIANGLE_FAN",
        }
    }
}

impl fmt::Display for DrawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawMode {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self> {
        DrawMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EditorError::UnknownDrawMode(s.to_string()))
    }
}

/// Storage mode of a layer.
///
/// Flat geometry draws its vertices in store order. Indexed geometry draws
/// through an explicit index buffer over deduplicated storage. Flat turns
/// into Indexed on the first structural edit and never goes back.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Flat(FlatGeometry),
    Indexed(IndexedGeometry),
}

impl Geometry {
    pub fn vertices(&self) -> &[Position] {
        match self {
            Geometry::Flat(flat) => &flat.vertices,
            Geometry::Indexed(indexed) => indexed.vertices(),
        }
    }

    pub fn colors(&self) -> &[Color] {
        match self {
            Geometry::Flat(flat) => &flat.colors,
            Geometry::Indexed(indexed) => indexed.colors(),
        }
    }

    /// `None` for flat geometry.
    pub fn indices(&self) -> Option<&[u32]> {
        match self {
            Geometry::Flat(_) => None,
            Geometry::Indexed(indexed) => Some(indexed.indices()),
        }
    }

    pub fn render_count(&self) -> usize {
        match self {
            Geometry::Flat(flat) => flat.len(),
            Geometry::Indexed(indexed) => indexed.render_count(),
        }
    }
}

/// One drawable layer: geometry plus the metadata the renderer needs.
#[derive(Debug, Clone)]
pub struct Layer {
    id: LayerId,
    name: String,
    geometry: Geometry,
    tolerance: f64,
    visible: bool,
    draw_mode: DrawMode,
    line_width: f32,
    vertex_shader: String,
    fragment_shader: String,
    revision: u64,
}

impl Layer {
    /// An empty, indexed, visible layer using the config's defaults.
    pub fn new(id: LayerId, name: impl Into<String>, config: &EditorConfig) -> Self {
        let tolerance = config.effective_tolerance();
        Self {
            id,
            name: name.into(),
            geometry: Geometry::Indexed(IndexedGeometry::new(tolerance)),
            tolerance,
            visible: true,
            draw_mode: config.draw_mode,
            line_width: clamp_line_width(config.line_width),
            vertex_shader: config.vertex_shader.clone(),
            fragment_shader: config.fragment_shader.clone(),
            revision: next_revision(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub(crate) fn replace_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
        self.touch();
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self.geometry, Geometry::Indexed(_))
    }

    pub fn vertices(&self) -> &[Position] {
        self.geometry.vertices()
    }

    pub fn colors(&self) -> &[Color] {
        self.geometry.colors()
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.geometry.indices()
    }

    /// Vertex references passed to the draw call, not unique vertices.
    pub fn render_vertex_count(&self) -> usize {
        self.geometry.render_count()
    }

    pub fn unique_vertex_count(&self) -> usize {
        self.geometry.vertices().len()
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Changes with every edit that requires re-uploading GPU buffers.
    /// Revisions are never reused, even across layers.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        self.draw_mode = mode;
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = clamp_line_width(width);
    }

    pub fn vertex_shader(&self) -> &str {
        &self.vertex_shader
    }

    pub fn fragment_shader(&self) -> &str {
        &self.fragment_shader
    }

    pub fn set_shaders(&mut self, vertex: impl Into<String>, fragment: impl Into<String>) {
        self.vertex_shader = vertex.into();
        self.fragment_shader = fragment.into();
    }

    /// Append a point, reusing a stored vertex at the same position.
    /// Returns the slot the new draw reference points at.
    pub fn add_vertex(&mut self, position: Position, color: Color) -> u32 {
        let slot = geometry::add_vertex_indexed(self.ensure_indexed(), position, color);
        self.touch();
        slot
    }

    /// Undo the last point and drop any vertex it orphaned.
    pub fn remove_last_vertex(&mut self) -> Option<u32> {
        let removed = geometry::remove_last_vertex_indexed(self.ensure_indexed());
        if removed.is_some() {
            self.compact_geometry();
            self.touch();
        }
        removed
    }

    /// Drop unreferenced vertices. Flat layers have nothing to compact.
    pub fn compact_geometry(&mut self) -> bool {
        let Geometry::Indexed(indexed) = &mut self.geometry else {
            return false;
        };
        let before = indexed.unique_count();
        let changed = geometry::compact_indexed_geometry(indexed);
        if changed {
            debug!(
                "layer {}: compacted {} -> {} vertices",
                self.id,
                before,
                indexed.unique_count()
            );
            self.touch();
        }
        changed
    }

    /// Paint every stored vertex whose projected position lies within
    /// `radius` of `query`. `project` maps a stored position into the space
    /// `query` and `radius` are measured in.
    pub fn recolor_vertices_near(
        &mut self,
        query: [f64; 2],
        radius: f64,
        color: Color,
        project: impl Fn(Position) -> [f64; 2],
    ) -> usize {
        let radius_sq = radius * radius;
        let near = |p: Position| {
            let [x, y] = project(p);
            let (dx, dy) = (x - query[0], y - query[1]);
            dx * dx + dy * dy <= radius_sq
        };
        let hits = match &mut self.geometry {
            Geometry::Indexed(indexed) => indexed.store_mut().recolor_where(near, color),
            Geometry::Flat(flat) => {
                let mut hits = 0;
                for (p, c) in flat.vertices.iter().zip(flat.colors.iter_mut()) {
                    if near(*p) {
                        *c = color;
                        hits += 1;
                    }
                }
                hits
            }
        };
        if hits > 0 {
            self.touch();
        }
        hits
    }

    /// Paint one stored vertex by slot.
    pub fn recolor_slot(&mut self, slot: u32, color: Color) -> Result<()> {
        let count = self.unique_vertex_count();
        let updated = match &mut self.geometry {
            Geometry::Indexed(indexed) => indexed.store_mut().set_color(slot, color),
            Geometry::Flat(flat) => match flat.colors.get_mut(slot as usize) {
                Some(c) => {
                    *c = color;
                    true
                }
                None => false,
            },
        };
        if !updated {
            return Err(EditorError::out_of_range(slot, count));
        }
        self.touch();
        Ok(())
    }

    /// Convert flat geometry to indexed. Returns false when the layer was
    /// already indexed.
    pub fn index_geometry(&mut self) -> bool {
        let Geometry::Flat(flat) = &self.geometry else {
            return false;
        };
        let indexed = geometry::to_indexed(&flat.vertices, Some(flat.colors.as_slice()), self.tolerance);
        debug!(
            "layer {}: flat -> indexed ({} vertices, {} unique)",
            self.id,
            flat.len(),
            indexed.unique_count()
        );
        self.geometry = Geometry::Indexed(indexed);
        self.touch();
        true
    }

    fn ensure_indexed(&mut self) -> &mut IndexedGeometry {
        self.index_geometry();
        match &mut self.geometry {
            Geometry::Indexed(indexed) => indexed,
            Geometry::Flat(_) => unreachable!("flat geometry was just converted"),
        }
    }

    fn touch(&mut self) {
        self.revision = next_revision();
    }
}

fn next_revision() -> u64 {
    static REVISION: AtomicU64 = AtomicU64::new(1);
    REVISION.fetch_add(1, Ordering::Relaxed)
}

fn clamp_line_width(width: f32) -> f32 {
    if width.is_finite() {
        width.max(1.0)
    } else {
        1.0
    }
}
