//! Report rendering.

pub mod generator;

pub use generator::{generate_json_report, render_comparison, render_failure, render_outcome};
