//! Mock implementations for testing and development.
//!
//! This module provides a scripted device channel and a scheduler that does
//! not wait, so a sampling loop can be driven without hardware or real time.

pub mod channel;
pub mod scheduler;

// Re-export commonly used types
pub use channel::{ChannelEvent, MockChannel, MockChannelHandle, MockRecord};
pub use scheduler::InstantScheduler;
