use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sim_math::{Quat, Vec3};

use command::Buttons;

/// The indirect configuration reference every entity carries (§3): its
/// physical dimensions, camera-eye offset, whether it's constrained to
/// walk on the ground, and the sprite prefix the renderer picks its
/// model from. Shared by `Arc` so adding entities never clones it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    pub radius: f64,
    pub height: f64,
    pub eye_offset: Vec3,
    pub ground_constrained: bool,
    pub sprite_prefix: String,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            radius: 0.4,
            height: 1.8,
            eye_offset: Vec3::new(0.0, 0.0, 1.6),
            ground_constrained: true,
            sprite_prefix: "player".to_string(),
        }
    }
}

/// A participant in the world (§3). Created only by a tick processing a
/// `Player(add)`, destroyed only by one processing `Player(remove)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u64,
    pub config: Arc<EntityConfig>,
    pub position: Vec3,
    pub orientation: Quat,
    pub polygon_index: usize,
    pub velocity: Vec3,
    pub buttons_held: Buttons,
    pub on_ground: bool,
}

impl Entity {
    pub fn spawn(id: u64, config: Arc<EntityConfig>, position: Vec3, polygon_index: usize) -> Self {
        Self {
            id,
            config,
            position,
            orientation: Quat::IDENTITY,
            polygon_index,
            velocity: Vec3::ZERO,
            buttons_held: Buttons::empty(),
            on_ground: false,
        }
    }
}
