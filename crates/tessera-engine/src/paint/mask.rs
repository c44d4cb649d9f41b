use super::Color;

/// Four corner tints interpolated across a sprite quad.
///
/// Corners are listed clockwise from the top-left, matching the vertex order
/// of sprite geometry.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorMask {
    pub top_left: Color,
    pub top_right: Color,
    pub bottom_right: Color,
    pub bottom_left: Color,
}

impl ColorMask {
    /// A mask that leaves texels unchanged.
    pub const IDENTITY: Self = Self::uniform(Color::WHITE);

    #[inline]
    pub const fn uniform(color: Color) -> Self {
        Self {
            top_left: color,
            top_right: color,
            bottom_right: color,
            bottom_left: color,
        }
    }

    /// Top corners take `top`, bottom corners take `bottom`.
    #[inline]
    pub const fn vertical(top: Color, bottom: Color) -> Self {
        Self {
            top_left: top,
            top_right: top,
            bottom_right: bottom,
            bottom_left: bottom,
        }
    }

    /// Corner colors in geometry order (TL, TR, BR, BL).
    #[inline]
    pub const fn corners(&self) -> [Color; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    #[inline]
    pub const fn from_corners(c: [Color; 4]) -> Self {
        Self {
            top_left: c[0],
            top_right: c[1],
            bottom_right: c[2],
            bottom_left: c[3],
        }
    }
}

impl Default for ColorMask {
    fn default() -> Self {
        Self::IDENTITY
    }
}
