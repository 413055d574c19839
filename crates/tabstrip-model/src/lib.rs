//! Tab strip model
//!
//! An ordered strip of tabs in one browser window:
//! - pinned tabs form a prefix, groups are contiguous runs of unpinned tabs
//! - one active tab and any number of selected tabs
//! - opener links drive where new tabs land and which tab activates next
//! - every mutation is reported to observers in a single notification

mod collection;
mod config;
mod delegate;
mod error;
mod flags;
mod group;
mod guard;
mod model;
mod observer;
mod opener;
mod policy;
mod selection;
mod tab;

pub use collection::TabCollection;
pub use config::TabStripConfig;
pub use delegate::{
    DefaultDelegate, DetachedTab, HistoricalEntryId, PageSession, RemoveReason, ResourceKey,
    TabStripDelegate,
};
pub use error::TabStripError;
pub use flags::{AddTabFlags, CloseCommand, CloseOutcome, CloseTabFlags, PageTransition};
pub use group::{GroupRegistry, TabGroup, TabGroupColor, TabGroupId, TabGroupVisualData};
pub use model::TabStripModel;
pub use observer::{
    ChangeReason, CloseAllStoppedReason, InsertedTab, ObserverId, RemovedTab, SelectionChange,
    TabGroupChange, TabGroupChangeKind, TabStripChange, TabStripObserver,
};
pub use opener::OpenerGraph;
pub use policy::{ActivationRule, NextActivePolicy};
pub use selection::SelectionModel;
pub use tab::{Tab, TabHandle};

pub type Result<T> = std::result::Result<T, TabStripError>;
