//! Device sessions: credentials in, classified command batches run, results
//! out.
//!
//! [`SessionManager`] owns every live session, keyed by owner and device
//! slot, and is the only entry point front ends use.

mod batch;
mod connector;
mod credentials;
mod manager;
mod result;

pub use batch::{CommandBatch, MODE_KEYWORDS};
pub use connector::{Connector, SessionConfig, SshConnector};
pub use credentials::{DEFAULT_SSH_PORT, DeviceCredentials, DeviceInfo};
pub use manager::{
    DeviceSlot, EnableStatus, ExecuteOptions, Session, SessionKey, SessionManager, SessionSummary,
};
pub use result::{CONFIG_BLOCK, CommandError, CommandOutput, ExecutionResult};
