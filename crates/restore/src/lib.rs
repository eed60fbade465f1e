//! Library entrypoint for the restore tool: snapshot loading, per-item
//! submission and the orchestrator that ties them together.

pub mod cli;
pub mod pipeline;
pub mod source;
pub mod submit;

#[cfg(test)]
mod tests;

pub use pipeline::{run_restore, RestoreError, RestoreOrchestrator};
pub use source::{load_document, load_from_file, load_from_store, LoadError};
pub use submit::{HttpItemSubmitter, ItemSubmitter, SubmitError, SubmitResponse};
