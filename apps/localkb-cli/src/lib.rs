//! Terminal helpers for the `localkb` binary.

pub mod output;
pub mod progress;

pub use output::{parse_namespaces, render_results_table};
pub use progress::ProgressReporter;
