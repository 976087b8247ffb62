//! Core domain models for cbf-stack.
//!
//! Frame geometry and the multi-frame pixel buffer. These are pure data
//! structures with no I/O dependencies.

pub mod shape;
pub mod stack;

pub use shape::FrameShape;
pub use stack::{FrameStack, FrameStats};
