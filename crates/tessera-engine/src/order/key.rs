use core::cmp::Ordering;

/// How two keys are compared.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompareMode {
    /// Total order over the keys' bounds.
    Exact,
    /// A point equals any band that contains it. Other pairs compare exactly.
    Containing,
}

/// Three-way comparison used by [`ZOrdered`](super::ZOrdered).
pub trait OrderKey {
    fn compare(&self, other: &Self, mode: CompareMode) -> Ordering;
}

/// A depth key: a single value or a half-open band `[min, max)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ZKey {
    Point(f32),
    Band { min: f32, max: f32 },
}

impl ZKey {
    #[inline]
    pub const fn band(min: f32, max: f32) -> Self {
        ZKey::Band { min, max }
    }

    #[inline]
    pub fn bounds(self) -> (f32, f32) {
        match self {
            ZKey::Point(z) => (z, z),
            ZKey::Band { min, max } => (min, max),
        }
    }

    /// Returns `true` if `z` lies in this key (`[min, max)` for bands).
    #[inline]
    pub fn contains(self, z: f32) -> bool {
        match self {
            ZKey::Point(p) => p == z,
            ZKey::Band { min, max } => z >= min && z < max,
        }
    }

    fn exact(self, other: Self) -> Ordering {
        let (a0, a1) = self.bounds();
        let (b0, b1) = other.bounds();
        match a0.total_cmp(&b0) {
            Ordering::Equal => a1.total_cmp(&b1),
            o => o,
        }
    }
}

/// Where band `[min, max)` sits relative to point `z`.
fn band_vs_point(min: f32, max: f32, z: f32) -> Ordering {
    if z < min {
        Ordering::Greater
    } else if z >= max {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

impl OrderKey for ZKey {
    fn compare(&self, other: &Self, mode: CompareMode) -> Ordering {
        match (mode, *self, *other) {
            (CompareMode::Containing, ZKey::Band { min, max }, ZKey::Point(z))
                if !z.is_nan() =>
            {
                band_vs_point(min, max, z)
            }
            (CompareMode::Containing, ZKey::Point(z), ZKey::Band { min, max })
                if !z.is_nan() =>
            {
                band_vs_point(min, max, z).reverse()
            }
            (_, a, b) => a.exact(b),
        }
    }
}
