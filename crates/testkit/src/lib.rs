#![warn(missing_docs)]
//! Deterministic testing surfaces: a scripted game server, fixture worlds, a
//! frozen-clock device and a pass-through signature sealer.

mod call_log;
mod device;
mod fixtures;
mod scripted;

pub use call_log::{CallLog, CallRecord};
pub use device::{FixtureDevice, IdentitySealer};
pub use fixtures::*;
pub use scripted::{ScriptedTransport, TICKET_LIFETIME_MS};
