//! Live reload: file watching, debouncing, and client fan-out.

mod broadcaster;
mod debouncer;
mod exclude;
mod watcher;
pub(crate) mod websocket;

pub use broadcaster::{Broadcaster, ClientId, ClientMessage};
pub use debouncer::{ChangeKind, WatchedChange};
pub use exclude::ExcludeSet;
pub use watcher::{ChangeWatcher, WatchEvent};
