/// Largest coordinate of the normalized 0..=65535 space `SendInput` expects
pub const NORMALIZED_MAX: i64 = 65535;

/// Size of the display absolute coordinates are normalized against, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
    pub width: i32,
    pub height: i32,
}

impl ScreenGeometry {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Map a pixel position onto the normalized space. Positions off the display are clamped
    /// to its edges.
    pub fn normalize(&self, x: i32, y: i32) -> (i32, i32) {
        (normalize_axis(x, self.width), normalize_axis(y, self.height))
    }
}

fn normalize_axis(v: i32, extent: i32) -> i32 {
    let span = (i64::from(extent) - 1).max(1);
    // round half away from zero, in integers
    let scaled = i64::from(v) * NORMALIZED_MAX;
    let rounded = if scaled >= 0 {
        (scaled + span / 2) / span
    } else {
        (scaled - span / 2) / span
    };
    rounded.clamp(0, NORMALIZED_MAX) as i32
}
