//! Storage boundary: the local embedded store and the remote authoritative
//! store, consumed through narrow per-kind traits.

pub mod memory;
pub mod remote_memory;
pub mod traits;

pub use memory::InMemoryLocalStore;
pub use remote_memory::InMemoryRemoteStore;
pub use traits::{LocalStore, RemoteError, RemoteStore, StorageError};
