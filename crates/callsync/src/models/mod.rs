//! Domain models for the call-log sync

mod call;
mod device;
mod sim;
mod sync_state;

pub use call::{CallId, CallLogEntry, CallType};
pub use device::DeviceConfig;
pub use sim::{SimPolicy, SimSlot};
pub use sync_state::{BootOutcome, BootReason, BootRecord, SyncState};
