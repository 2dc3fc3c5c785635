//! Report generation for uploaded Python files and zip archives.
//!
//! Combines the style checker with a suggestion model: single files get a
//! style summary followed by model output, archives get one section per
//! entry.

pub mod archive;
pub mod model;
pub mod pipeline;

pub use model::{ConfiguredModel, SuggestionModel};
pub use pipeline::ReviewPipeline;
