//! Pipeline components: task context, completion tracking, the tree walk and classify.

pub mod classify;
pub mod completion;
pub mod context;
pub mod error_handler;
pub mod walk;

pub use classify::classify;
pub use completion::{Completion, CompletionTracker, NodeState};
pub use context::TaskContext;
pub use error_handler::{check_for_first_error, record_first_error};
pub use walk::{Walk, enumerate, list_paths};
