pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod identifier;
pub mod journal;
pub mod logging;
pub mod output;
pub mod progress;
pub mod reconcile;
pub mod retry;
pub mod shutdown;
pub mod storage;

pub use config::{ConfigError, RunConfig};
pub use error::{AppError, ExitCode};
pub use identifier::{IdentifierStore, LookupError};
pub use journal::{OutcomeLog, OutcomeLogs};
pub use reconcile::{
    CounterSnapshot, ReconcileError, ReconcileOptions, ReconcileReport, ReconciliationCounters,
    Reconciler,
};
pub use retry::{RetryError, RetryExecutor, RetryPolicy};
pub use storage::{FileStorage, ListQuery, PagedLister, StorageError};
