//! Local client-side state.
//!
//! Everything here is plain JSON files under the fieldstudy home directory:
//! per-project analysis caches, per-project notes with history, and the
//! persisted identity session. Writes are last-write-wins with no locking:
//! concurrent fieldstudy processes can clobber each other, the same way two
//! browser tabs sharing local storage would.

pub mod cache;
pub mod notes;
pub mod session;

// Re-export commonly used types
pub use cache::{AnalysisCache, CacheKind, Snapshot};
pub use notes::{Note, NoteEntry, Notebook, UndoOutcome};
pub use session::{SessionStore, SessionToken};
