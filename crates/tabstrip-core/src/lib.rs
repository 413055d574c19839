//! Tabstrip Core
//!
//! Window-level coordination on top of the tab strip model: configuration,
//! logging, and per-window closed-tab history.

mod config;
mod error;
mod window;

pub use config::Config;
pub use error::CoreError;
pub use window::{ClosedTab, RecentlyClosed, Window};

// Re-export the model
pub use tabstrip_model::{
    AddTabFlags, CloseOutcome, CloseTabFlags, PageSession, PageTransition, Tab, TabGroupId,
    TabHandle, TabStripConfig, TabStripError, TabStripModel, TabStripObserver,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging. `RUST_LOG` wins over `filter`; an unparsable filter
/// falls back to `info`.
pub fn init_logging(filter: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
