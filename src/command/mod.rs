//! Host command execution for device actions and state queries.

mod executor;

pub use executor::{CommandExecutor, ExecOutcome};
