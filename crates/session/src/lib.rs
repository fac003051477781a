//! Host session for the deterministic rule engine.
//!
//! `frontline-session` wires the engine in `frontline-core` into a running
//! game: it owns the authoritative state behind the read lock, supplies the
//! synchronized dice stream, routes remote-player queries over cancellable
//! channels, broadcasts presentation side effects on a topic bus, and
//! persists save snapshots and catch-up packets. Consumers drive it either
//! directly through [`GameSession`] or from async code through
//! [`SessionHandle`], which runs the single-writer worker on its own
//! thread.

pub mod error;
pub mod events;
pub mod handle;
pub mod players;
pub mod relay;
pub mod session;
pub mod snapshot;
pub mod walker;

pub use error::{Result, SessionError};
pub use events::{EventBus, SessionEvent, Topic};
pub use handle::SessionHandle;
pub use players::{ChannelPlayer, PassiveAgent, PlayerAgent, PlayerQuery, serve_agent};
pub use relay::{BusBroadcaster, RelayedDice};
pub use session::{GameSession, SessionConfig};
pub use snapshot::{CatchUpPacket, SessionSnapshot};
pub use walker::{StepTarget, StepWalker, WalkHandle, WalkStatus, walk_to};
