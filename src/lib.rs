//! recopy library
//!
//! Resumable single-file copy with crash-consistent checkpoints

pub mod control;
pub mod engine;
pub mod logger;
pub mod progress;
