use serde::{Deserialize, Serialize};

use crate::PITCH_CLAMP_DEG;

/// A unit quaternion. Entities only ever carry this, never bare
/// pitch/yaw floats — those are accumulators on the incoming [`Input`]
/// (see `command` crate), applied to the quaternion once per tick.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat { w: 1.0, x: 0.0, y: 0.0, z: 0.0 };

    /// Builds an orientation from yaw (around the world up axis) applied
    /// before pitch (around the resulting local right axis) — the usual
    /// FPS-camera rotation order.
    pub fn from_yaw_pitch(yaw_rad: f64, pitch_rad: f64) -> Self {
        let (sy, cy) = (yaw_rad * 0.5).sin_cos();
        let (sp, cp) = (pitch_rad * 0.5).sin_cos();
        // yaw around Z, then pitch around local X.
        let yaw = Quat { w: cy, x: 0.0, y: 0.0, z: sy };
        let pitch = Quat { w: cp, x: sp, y: 0.0, z: 0.0 };
        yaw.mul(&pitch).normalize()
    }

    /// Recovers the (yaw, pitch) this quaternion was built from, assuming
    /// it has no roll component (the only orientations the tick ever
    /// produces).
    pub fn to_yaw_pitch(&self) -> (f64, f64) {
        let yaw = 2.0 * (self.w * self.z + self.x * self.y).atan2(1.0 - 2.0 * (self.y * self.y + self.z * self.z));
        let sin_pitch = 2.0 * (self.w * self.x - self.y * self.z);
        let pitch = sin_pitch.clamp(-1.0, 1.0).asin();
        (yaw, pitch)
    }

    fn mul(&self, rhs: &Quat) -> Quat {
        Quat {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }

    fn normalize(&self) -> Quat {
        let len = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if len < f64::EPSILON {
            Quat::IDENTITY
        } else {
            Quat { w: self.w / len, x: self.x / len, y: self.y / len, z: self.z / len }
        }
    }

    /// Applies accumulated pitch/yaw deltas (radians) and clamps pitch to
    /// ±89.999°, per §4.C step 4.
    pub fn apply_look_delta(&self, yaw_delta: f64, pitch_delta: f64) -> Quat {
        let (yaw, pitch) = self.to_yaw_pitch();
        let new_pitch = (pitch + pitch_delta).clamp(
            -crate::deg_to_rad(PITCH_CLAMP_DEG),
            crate::deg_to_rad(PITCH_CLAMP_DEG),
        );
        let new_yaw = yaw + yaw_delta;
        Quat::from_yaw_pitch(new_yaw, new_pitch)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{deg_to_rad, rad_to_deg};

    #[test]
    fn pitch_clamps_at_limit() {
        let q = Quat::IDENTITY.apply_look_delta(0.0, deg_to_rad(1000.0));
        let (_, pitch) = q.to_yaw_pitch();
        assert!((rad_to_deg(pitch) - 89.999).abs() < 1e-6);
    }

    #[test]
    fn pitch_clamps_at_negative_limit() {
        let q = Quat::IDENTITY.apply_look_delta(0.0, deg_to_rad(-1000.0));
        let (_, pitch) = q.to_yaw_pitch();
        assert!((rad_to_deg(pitch) + 89.999).abs() < 1e-6);
    }

    #[test]
    fn yaw_accumulates_modulo_full_turn() {
        let mut q = Quat::IDENTITY;
        for _ in 0..5 {
            q = q.apply_look_delta(deg_to_rad(360.0), 0.0);
        }
        let (yaw, _) = q.to_yaw_pitch();
        // five full turns collapse back to (near) zero.
        assert!(yaw.abs() < 1e-6 || (yaw.abs() - 2.0 * std::f64::consts::PI).abs() < 1e-6);
    }
}
