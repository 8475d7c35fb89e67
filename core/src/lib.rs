//! Core

#[macro_use]
extern crate log;

// Re-export.
pub mod animation;
pub mod base;
pub mod buffer;
pub mod config;
pub mod crossover;
pub mod error;
pub mod geometry;
pub mod listener;
pub mod material;
pub mod mesh;
pub mod rng;
pub mod sampling;
pub mod scene;
pub mod source;
pub mod triangle;
pub mod wav;
