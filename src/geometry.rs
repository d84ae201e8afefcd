//! Indexed 2D geometry: a deduplicated vertex/color store plus an index
//! buffer describing draw order.
//!
//! Vertex identity is positional. Two positions are the same vertex when
//! they quantize to the same key at the store's tolerance, so inserting a
//! point twice reuses the existing slot instead of growing storage.

use std::collections::HashMap;

use crate::error::{EditorError, Result};

/// A point in normalized device coordinates. Stored at full precision and
/// narrowed to `f32` only when uploaded to the GPU.
pub type Position = [f64; 2];

/// Linear RGB, conventionally in `[0, 1]`.
pub type Color = [f64; 3];

pub const WHITE: Color = [1.0, 1.0, 1.0];

pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Smallest tolerance the store accepts. Anything non-positive, non-finite
/// or smaller is raised to this value.
pub const MIN_TOLERANCE: f64 = 1e-9;

// Past 2^53 steps the quotient no longer resolves single tolerance steps,
// and neighbouring doubles are already further apart than the tolerance.
const MAX_ROUNDED_STEPS: f64 = 9_007_199_254_740_992.0;

pub fn clamp_tolerance(tolerance: f64) -> f64 {
    if tolerance.is_finite() && tolerance > 0.0 {
        tolerance.max(MIN_TOLERANCE)
    } else {
        MIN_TOLERANCE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Step {
    /// Whole number of tolerance steps.
    Rounded(i64),
    /// Bit pattern of a coordinate too large (or not finite) to round.
    Exact(u64),
}

impl Step {
    fn of(value: f64, tolerance: f64) -> Self {
        let steps = (value / tolerance).round();
        if steps.abs() < MAX_ROUNDED_STEPS {
            Step::Rounded(steps as i64)
        } else if value.is_nan() {
            Step::Exact(f64::NAN.to_bits())
        } else {
            Step::Exact(value.to_bits())
        }
    }
}

/// Key two positions share when they are the same vertex.
///
/// Keys never alias: coordinates that cannot be rounded to a whole number of
/// tolerance steps are keyed on their exact value, every NaN shares one key,
/// and the infinities are keyed apart from finite values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuantizedKey(Step, Step);

/// Round each coordinate to the nearest multiple of `tolerance`.
pub fn quantize(position: Position, tolerance: f64) -> QuantizedKey {
    let tolerance = clamp_tolerance(tolerance);
    let [x, y] = position;
    QuantizedKey(Step::of(x, tolerance), Step::of(y, tolerance))
}

/// Unique vertex positions with one color per position.
///
/// `positions` and `colors` always have the same length, and no two
/// positions share a quantized key.
#[derive(Debug, Clone)]
pub struct VertexStore {
    positions: Vec<Position>,
    colors: Vec<Color>,
    slots: HashMap<QuantizedKey, u32>,
    tolerance: f64,
}

impl PartialEq for VertexStore {
    fn eq(&self, other: &Self) -> bool {
        // `slots` is derived from `positions`.
        self.positions == other.positions
            && self.colors == other.colors
            && self.tolerance == other.tolerance
    }
}

impl VertexStore {
    pub fn new(tolerance: f64) -> Self {
        Self {
            positions: Vec::new(),
            colors: Vec::new(),
            slots: HashMap::new(),
            tolerance: clamp_tolerance(tolerance),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn key(&self, position: Position) -> QuantizedKey {
        quantize(position, self.tolerance)
    }

    /// Slot already holding `position`, if any.
    pub fn find(&self, position: Position) -> Option<u32> {
        self.slots.get(&self.key(position)).copied()
    }

    /// Return the slot for `position`, appending it with `color` when it is
    /// new. The flag reports whether a slot was created.
    pub fn insert(&mut self, position: Position, color: Color) -> (u32, bool) {
        let key = self.key(position);
        if let Some(&slot) = self.slots.get(&key) {
            return (slot, false);
        }
        let slot = self.positions.len() as u32;
        self.positions.push(position);
        self.colors.push(color);
        self.slots.insert(key, slot);
        (slot, true)
    }

    /// Overwrite the color of one slot. Returns false when the slot does
    /// not exist.
    pub fn set_color(&mut self, slot: u32, color: Color) -> bool {
        match self.colors.get_mut(slot as usize) {
            Some(c) => {
                *c = color;
                true
            }
            None => false,
        }
    }

    /// Overwrite the color of every slot whose position satisfies `pred`.
    pub fn recolor_where(&mut self, mut pred: impl FnMut(Position) -> bool, color: Color) -> usize {
        let mut hits = 0;
        for (position, c) in self.positions.iter().zip(self.colors.iter_mut()) {
            if pred(*position) {
                *c = color;
                hits += 1;
            }
        }
        hits
    }

    /// Keep only slots flagged in `keep`, in their current order. Returns
    /// the old-slot → new-slot table; dropped slots map to `u32::MAX`.
    fn retain(&mut self, keep: &[bool]) -> Vec<u32> {
        let mut remap = vec![u32::MAX; self.positions.len()];
        let positions = std::mem::take(&mut self.positions);
        let colors = std::mem::take(&mut self.colors);
        self.slots.clear();
        for (old, (position, color)) in positions.into_iter().zip(colors).enumerate() {
            if keep.get(old).copied().unwrap_or(false) {
                let (new, _) = self.insert(position, color);
                remap[old] = new;
            }
        }
        remap
    }
}

/// A unique vertex store and the index buffer that draws it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedGeometry {
    store: VertexStore,
    indices: Vec<u32>,
}

impl IndexedGeometry {
    pub fn new(tolerance: f64) -> Self {
        Self {
            store: VertexStore::new(tolerance),
            indices: Vec::new(),
        }
    }

    /// Rebuild geometry from parallel arrays, as read from a document.
    ///
    /// Every index must address `positions`. Positions that collide at
    /// `tolerance` are merged (the first keeps its color) and the indices
    /// are rewritten, so the result draws the same primitives.
    pub fn from_parts(
        positions: &[Position],
        colors: &[Color],
        indices: &[u32],
        tolerance: f64,
    ) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(EditorError::out_of_range(bad, positions.len()));
        }
        let mut store = VertexStore::new(tolerance);
        let remap: Vec<u32> = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| store.insert(p, colors.get(i).copied().unwrap_or(WHITE)).0)
            .collect();
        let indices = indices.iter().map(|&i| remap[i as usize]).collect();
        Ok(Self { store, indices })
    }

    pub fn store(&self) -> &VertexStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut VertexStore {
        &mut self.store
    }

    pub fn vertices(&self) -> &[Position] {
        self.store.positions()
    }

    pub fn colors(&self) -> &[Color] {
        self.store.colors()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn unique_count(&self) -> usize {
        self.store.len()
    }

    /// Number of draw-time vertex references.
    pub fn render_count(&self) -> usize {
        self.indices.len()
    }

    /// Check both storage invariants: every index addresses the store, and
    /// no two stored positions share a quantized key.
    pub fn check_invariants(&self) -> Result<()> {
        let count = self.store.len();
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= count) {
            return Err(EditorError::out_of_range(bad, count));
        }
        let mut seen = HashMap::with_capacity(count);
        for (slot, &p) in self.store.positions().iter().enumerate() {
            if let Some(first) = seen.insert(self.store.key(p), slot) {
                return Err(EditorError::format(format!(
                    "vertex slots {first} and {slot} share a quantized position"
                )));
            }
        }
        Ok(())
    }
}

/// Expanded geometry: one position and one color per drawn vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatGeometry {
    pub vertices: Vec<Position>,
    pub colors: Vec<Color>,
}

impl FlatGeometry {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Deduplicate a flat vertex sequence.
///
/// Entries without a matching color get [`WHITE`]. First-seen order of
/// unique vertices is preserved, and `indices` has one entry per input.
pub fn to_indexed(vertices: &[Position], colors: Option<&[Color]>, tolerance: f64) -> IndexedGeometry {
    let mut geometry = IndexedGeometry::new(tolerance);
    geometry.indices.reserve(vertices.len());
    for (i, &position) in vertices.iter().enumerate() {
        let color = colors.and_then(|c| c.get(i)).copied().unwrap_or(WHITE);
        add_vertex_indexed(&mut geometry, position, color);
    }
    geometry
}

/// Expand indexed geometry back to one entry per index.
pub fn to_flat(geometry: &IndexedGeometry) -> FlatGeometry {
    let positions = geometry.vertices();
    let colors = geometry.colors();
    let mut flat = FlatGeometry {
        vertices: Vec::with_capacity(geometry.indices.len()),
        colors: Vec::with_capacity(geometry.indices.len()),
    };
    for &i in &geometry.indices {
        flat.vertices.push(positions[i as usize]);
        flat.colors.push(colors[i as usize]);
    }
    flat
}

/// Append a draw reference to `position`, storing it first if it is new.
/// Returns the referenced slot.
pub fn add_vertex_indexed(geometry: &mut IndexedGeometry, position: Position, color: Color) -> u32 {
    let (slot, _) = geometry.store.insert(position, color);
    geometry.indices.push(slot);
    slot
}

/// Pop the last draw reference. Storage is left alone; see
/// [`compact_indexed_geometry`].
pub fn remove_last_vertex_indexed(geometry: &mut IndexedGeometry) -> Option<u32> {
    geometry.indices.pop()
}

/// Drop stored vertices no index refers to and renumber the indices.
///
/// Retained vertices keep their relative order. Returns false, without
/// touching anything, when every vertex is referenced.
pub fn compact_indexed_geometry(geometry: &mut IndexedGeometry) -> bool {
    let mut referenced = vec![false; geometry.store.len()];
    for &i in &geometry.indices {
        if let Some(r) = referenced.get_mut(i as usize) {
            *r = true;
        }
    }
    if referenced.iter().all(|&r| r) {
        return false;
    }
    let remap = geometry.store.retain(&referenced);
    for i in &mut geometry.indices {
        *i = remap[*i as usize];
    }
    true
}

/// Indices that occur more than once, each reported once in the order it
/// first repeats.
pub fn find_duplicates(indices: &[u32]) -> Vec<u32> {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    let mut repeated = Vec::new();
    for &i in indices {
        let n = counts.entry(i).or_insert(0);
        *n += 1;
        if *n == 2 {
            repeated.push(i);
        }
    }
    repeated
}
