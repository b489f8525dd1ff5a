//! Input & Command model (§3, §4.C step 4). Packed button bitfield, axis
//! accumulators, and the tagged `Command` variants the tick function
//! consumes.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The fixed enumeration from §3. Stored as a `u32` on the wire so
    /// the codec and the entity's held-button state share one
    /// representation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Buttons: u32 {
        const WALK_FORWARD  = 1 << 0;
        const WALK_BACKWARD = 1 << 1;
        const STRAFE_LEFT   = 1 << 2;
        const STRAFE_RIGHT  = 1 << 3;
        const ATTACK        = 1 << 4;
        const JUMP          = 1 << 5;
        const USE           = 1 << 6;
    }
}

impl Serialize for Buttons {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Buttons {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u32::deserialize(deserializer)?;
        Ok(Buttons::from_bits_truncate(bits))
    }
}

/// A per-tick input record: edge-triggered button presses/releases plus
/// accumulated look deltas. Inputs are values — the client clones the
/// live accumulator before every tick and clears it after (§9 Design
/// Notes, "mutable input objects with write-through aliasing").
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub pressed: Buttons,
    pub released: Buttons,
    pub pitch_delta: f64,
    pub yaw_delta: f64,
}

impl Input {
    pub fn set_pressed(&mut self, button: Buttons) {
        self.pressed.insert(button);
        self.released.remove(button);
    }

    pub fn set_released(&mut self, button: Buttons) {
        self.released.insert(button);
        self.pressed.remove(button);
    }

    pub fn set_axis(&mut self, pitch_delta: f64, yaw_delta: f64) {
        self.pitch_delta += pitch_delta;
        self.yaw_delta += yaw_delta;
    }

    /// Applies this input's press/release edges to a persistent
    /// button-held bitfield. Releases received in the same tick override
    /// presses, per §4.C step 4.
    pub fn update_buttons(&self, held: Buttons) -> Buttons {
        (held | self.pressed) & !self.released
    }

    pub fn clear(&mut self) {
        *self = Input::default();
    }
}

pub type ClientId = u64;
pub type EntityId = u64;
pub type Clock = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    Add,
    Remove,
}

/// `Command` as defined in §3: a tagged variant the tick consumes in the
/// order `Player` then `Input` within one tick (§4.C, §4.G step 4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Command {
    Input { client_id: ClientId, clock: Clock, input: Input },
    Player { client_id: ClientId, action: PlayerAction },
}

impl Command {
    pub fn client_id(&self) -> ClientId {
        match self {
            Command::Input { client_id, .. } => *client_id,
            Command::Player { client_id, .. } => *client_id,
        }
    }
}
