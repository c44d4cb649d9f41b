use super::Vec2;

/// Axis-aligned rectangle (top-left origin).
///
/// Sprites use it in texels to select a sub-area of their texture.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        Vec2::new(self.origin.x + self.size.x, self.origin.y + self.size.y)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.origin.is_finite() && self.size.is_finite()
    }

    /// Returns `true` if `inner` lies entirely within `self`, edges included.
    ///
    /// Empty or non-finite rectangles are never contained.
    #[inline]
    pub fn contains_rect(self, inner: Rect) -> bool {
        if !inner.is_finite() || inner.is_empty() {
            return false;
        }
        let (a0, a1) = (self.min(), self.max());
        let (b0, b1) = (inner.min(), inner.max());
        b0.x >= a0.x && b0.y >= a0.y && b1.x <= a1.x && b1.y <= a1.y
    }

    /// Maps this rectangle into `[0, 1]` coordinates relative to `extent`.
    #[inline]
    pub fn normalized_in(self, extent: Vec2) -> Rect {
        let sx = if extent.x > 0.0 { 1.0 / extent.x } else { 0.0 };
        let sy = if extent.y > 0.0 { 1.0 / extent.y } else { 0.0 };
        Rect::new(
            self.origin.x * sx,
            self.origin.y * sy,
            self.size.x * sx,
            self.size.y * sy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::new(x, y, w, h)
    }

    // ── contains_rect ─────────────────────────────────────────────────────

    #[test]
    fn contains_rect_interior() {
        assert!(r(0.0, 0.0, 64.0, 64.0).contains_rect(r(8.0, 8.0, 16.0, 16.0)));
    }

    #[test]
    fn contains_rect_full_extent_is_inclusive() {
        let outer = r(0.0, 0.0, 64.0, 32.0);
        assert!(outer.contains_rect(outer));
    }

    #[test]
    fn contains_rect_overhanging_edge() {
        assert!(!r(0.0, 0.0, 64.0, 64.0).contains_rect(r(60.0, 0.0, 8.0, 8.0)));
        assert!(!r(0.0, 0.0, 64.0, 64.0).contains_rect(r(-1.0, 0.0, 8.0, 8.0)));
    }

    #[test]
    fn contains_rect_rejects_empty_and_nan() {
        let outer = r(0.0, 0.0, 64.0, 64.0);
        assert!(!outer.contains_rect(r(4.0, 4.0, 0.0, 8.0)));
        assert!(!outer.contains_rect(r(f32::NAN, 4.0, 8.0, 8.0)));
    }

    // ── normalized_in ─────────────────────────────────────────────────────

    #[test]
    fn normalized_in_scales_to_unit_space() {
        let n = r(16.0, 8.0, 32.0, 16.0).normalized_in(Vec2::new(64.0, 32.0));
        assert_eq!(n, r(0.25, 0.25, 0.5, 0.5));
    }

    #[test]
    fn normalized_in_zero_extent_collapses() {
        let n = r(16.0, 8.0, 32.0, 16.0).normalized_in(Vec2::ZERO);
        assert_eq!(n, r(0.0, 0.0, 0.0, 0.0));
    }
}
