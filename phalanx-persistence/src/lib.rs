//! # Phalanx Persistence
//!
//! [`Persistence`](phalanx_core::persistence::Persistence) backends:
//!
//! - [`InMemoryPersistence`]: keeps the saved state in process memory;
//!   sufficient for tests and for deployments that rely purely on peer
//!   resynchronization.
//! - [`FileSystemPersistence`]: stores the saved state in a single file,
//!   written atomically, so it survives process restarts.

pub mod file_system;
pub mod in_memory;

pub use file_system::FileSystemPersistence;
pub use in_memory::InMemoryPersistence;
