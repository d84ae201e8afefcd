use crate::geometry::Position;

/// Canvas size in pixels. Maps normalized device coordinates (y up,
/// `[-1, 1]` on both axes) to canvas pixels (y down, origin top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    pub fn to_pixel(&self, ndc: Position) -> [f64; 2] {
        let [x, y] = ndc;
        [(x + 1.0) * 0.5 * self.width, (1.0 - y) * 0.5 * self.height]
    }

    pub fn to_ndc(&self, pixel: [f64; 2]) -> Position {
        let [px, py] = pixel;
        [px / self.width * 2.0 - 1.0, 1.0 - py / self.height * 2.0]
    }
}
