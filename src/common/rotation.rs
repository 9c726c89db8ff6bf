//! Bit-packed rotation quaternions for persisted game objects.
//!
//! x/y/z are stored as signed fixed point inside one i64 (21 bits for y/z,
//! 22 for x); w is dropped and reconstructed from the unit-norm constraint.

use serde::{Deserialize, Serialize};

const PACK_YZ: i64 = 1 << 20;
const PACK_X: i64 = PACK_YZ << 1;
const PACK_YZ_MASK: i64 = (PACK_YZ << 1) - 1;
const PACK_X_MASK: i64 = (PACK_X << 1) - 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedRotation(pub i64);

impl PackedRotation {
    pub fn pack(x: f32, y: f32, z: f32, w: f32) -> Self {
        // The sign of w is folded into the other three components so that
        // unpacking can always reconstruct a non-negative w.
        let w_sign = if w >= 0.0 { 1.0 } else { -1.0 };
        let px = ((x * w_sign * PACK_X as f32) as i64) & PACK_X_MASK;
        let py = ((y * w_sign * PACK_YZ as f32) as i64) & PACK_YZ_MASK;
        let pz = ((z * w_sign * PACK_YZ as f32) as i64) & PACK_YZ_MASK;
        Self(pz | (py << 21) | (px << 42))
    }

    pub fn unpack(&self) -> (f32, f32, f32, f32) {
        let x = (self.0 >> 42) as f32 / PACK_X as f32;
        let y = ((self.0 << 22) >> 43) as f32 / PACK_YZ as f32;
        let z = ((self.0 << 43) >> 43) as f32 / PACK_YZ as f32;
        // Slightly over-unit inputs would make the radicand negative and the
        // square root NaN; clamp to zero instead.
        let w = (1.0 - (x * x + y * y + z * z)).max(0.0).sqrt();
        (x, y, z, w)
    }

    /// Packs a plain Z-axis facing, the common case for door/chest spawns.
    pub fn from_orientation(orientation: f32) -> Self {
        let half = orientation * 0.5;
        Self::pack(0.0, 0.0, half.sin(), half.cos())
    }
}
