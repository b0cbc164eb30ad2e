/// Keyed channel broker: scope, rendezvous channel, task group, ChanCaster.
pub mod caster;
/// Settings loading (defaults, file, `CHANCASTER_*` environment).
pub mod config;
/// Logging setup (filters, formatters).
pub mod logging;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Broker API.
pub use caster::{rendezvous, CasterStats, ChanCaster, Receiver, Scope, Sender, TaskGroup};
/// Error types and helpers.
pub use chancaster_error::{
    CasterError, CasterResult, ErrorExt, ResultExt, StackError, StatusCode,
};
/// Configuration.
pub use config::{CasterConfig, DuplicateKeyPolicy, Settings};
/// Logging.
pub use logging::{init_logging, LogFormat, LoggingConfig};
