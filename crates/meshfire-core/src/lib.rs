//! Meshfire Core - Deterministic lockstep simulation
//!
//! This crate holds everything every peer must compute identically:
//! - Replicated state (`StateData`, `Actor`) and its per-tick quantization
//! - The bit layout shared with the wire codec (`layout`)
//! - A deterministic xorshift RNG and integer trigonometry
//! - The static tile map and the uniform spatial grid
//! - The simulation step (`SimulationContext::step`)
//! - State digests and fingerprints for divergence checks
//!
//! Nothing here reads a clock, uses floating point in gameplay, or touches
//! thread-local randomness.

pub mod actor;
pub mod config;
pub mod effect;
mod error;
pub mod grid;
pub mod hash;
pub mod input;
pub mod layout;
pub mod map;
pub mod math;
mod rng;
pub mod sim;
pub mod state;

/// Simulation tick index
pub type Tick = u32;

pub use actor::{Actor, ActorKind, ActorType, ClientId};
pub use config::{Difficulty, GameTuning, RoomConfig, WeaponDef};
pub use effect::{HitSound, HotUsable, SimEffect};
pub use error::{Error, Result};
pub use input::Input;
pub use map::GameMap;
pub use rng::GameRng;
pub use sim::SimulationContext;
pub use state::{ClientEvent, Fingerprint, PlayerStat, StateData};
