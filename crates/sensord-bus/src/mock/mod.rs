//! Mock collaborator implementations for testing.
//!
//! The property bus itself needs no mock: [`MemoryBus`](crate::MemoryBus)
//! already records every change.

pub mod persister;

pub use persister::MockPersister;
