/// Revision and draft history for portal content items.
///
/// Provides a `RevisionStore` that keeps an ordered, capped list of
/// revisions per item (conversations, documents, strategy frameworks),
/// a single auto-saved draft per item, line diffs between versions, and
/// a JSON mirror on a pluggable key-value storage surface.
pub mod autosave;
pub mod config;
pub mod diff;
pub mod revision;
pub mod storage;
pub mod store;
pub mod timestamp;
pub mod transfer;

pub use config::RevisionConfig;
pub use diff::RevisionDiff;
pub use revision::{Metadata, Revision, RevisionKind, RevisionSummary};
pub use storage::{MemoryStorage, RedbStorage, RevisionStorage};
pub use store::RevisionStore;
pub use transfer::RevisionExport;
