//! Command implementations.

pub mod completions;
pub mod pat;

pub use completions::handle_completions;
pub use pat::{handle_issue, handle_list};
