//! Meshfire Netcode - Peer-to-peer lockstep
//!
//! Every peer runs the full simulation. Peers exchange only input changes,
//! each scheduled a few ticks into the future, and a peer simulates a tick
//! only once every ready peer has promised it will send no more inputs for
//! it.
//!
//! - **Protocol**: input scheduling, acknowledgements, the horizon and the
//!   join barrier
//! - **Scheduler**: wall-clock pacing with drift correction
//! - **Prediction**: save/run/restore ticks past the horizon for rendering
//! - **Desync detection**: fingerprint comparison against peers
//! - **Session**: the per-peer facade that drives all of the above
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Session                             │
//! │  ┌────────────┐   ┌────────────┐   ┌─────────────────────┐   │
//! │  │  Protocol  │──▶│  EventLog  │──▶│ SimulationContext   │   │
//! │  └────────────┘   └────────────┘   └─────────────────────┘   │
//! │     ▲      │            ▲                │         │         │
//! │     │      ▼            │                ▼         ▼         │
//! │  ┌────────────┐   ┌────────────┐   ┌──────────┐ ┌────────┐   │
//! │  │ Transport  │   │ Scheduler  │   │  Desync  │ │Predict │   │
//! │  └────────────┘   └────────────┘   └──────────┘ └────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use meshfire_core::{GameTuning, RoomConfig};
//! use meshfire_netcode::{LoopbackNetwork, Session, SessionConfig};
//!
//! let net = LoopbackNetwork::new(7);
//! let room = RoomConfig::default();
//! let config = SessionConfig::from_room(&room);
//! let mut host = Session::host(1, room, GameTuning::default(), config, net.endpoint(1), ())?;
//!
//! loop {
//!     let now = clock_ms();
//!     host.poll(now)?;
//!     host.set_input(read_input());
//!     host.update(now)?;
//!     host.predict(now, |ctx, _| draw(&ctx.state));
//! }
//! ```

mod client;
mod config;
mod desync;
mod error;
mod event_log;
mod loopback;
mod prediction;
mod protocol;
mod scheduler;
mod session;
mod transport;

pub use client::Client;
pub use config::SessionConfig;
pub use desync::{compare, DesyncDetector};
pub use error::{Error, Result};
pub use event_log::EventLog;
pub use loopback::{LoopbackEndpoint, LoopbackError, LoopbackNetwork, LoopbackStats};
pub use prediction::{predict, Cosmetics};
pub use protocol::Protocol;
pub use scheduler::TickScheduler;
pub use session::{Session, SessionEvent};
pub use transport::{PeerId, Transport};
