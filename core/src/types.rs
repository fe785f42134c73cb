//! Shared primitive types used across the entire framework.

use serde::{Deserialize, Serialize};

/// A host tick. One tick = one invocation of the script by the host scheduler.
pub type Tick = u64;

/// Host game time in milliseconds, as reported by the host clock.
pub type Millis = u64;

/// The canonical run identifier used to tag journal entries.
pub type RunId = String;

/// Opaque handle to an entity owned by the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(pub u32);

/// A world-space position or offset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// True when `other` lies inside the axis-aligned box of half-extents `radii`.
    pub fn within(&self, other: &Vec3, radii: &Vec3) -> bool {
        (self.x - other.x).abs() <= radii.x
            && (self.y - other.y).abs() <= radii.y
            && (self.z - other.z).abs() <= radii.z
    }

    pub fn offset(&self, dx: f32, dy: f32, dz: f32) -> Vec3 {
        Vec3::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Heading in degrees from `self` towards `target`, 0 = +Y, counter-clockwise.
    pub fn heading_to(&self, target: &Vec3) -> f32 {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        let deg = (-dx).atan2(dy).to_degrees();
        if deg < 0.0 { deg + 360.0 } else { deg }
    }
}
