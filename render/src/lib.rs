//! Renderer

#[macro_use]
extern crate log;

// Re-export.
pub mod context;
pub mod engine;
pub mod path;
pub mod processor;
pub mod scheduler;
