//! Terminal presentation for the `toolpin` binary.
//!
//! Status lines and failure blocks are rendered here so the installer only
//! deals in structured results.

mod output;
mod progress;

pub use output::{format_error_count, format_failure, Output, Verbosity};
pub use progress::{format_slot, ProgressManager, Slot};
