pub mod error;
pub mod file;
pub mod memory;
pub mod probe;
pub mod tiered;
pub mod traits;

// Re-export commonly used types
pub use error::StorageError;
pub use file::FileCache;
pub use memory::{DEFAULT_MAX_MEMORY_BYTES, DEFAULT_TTL, MemoryCache};
pub use probe::{FixedMemory, ProcessMemory};
pub use tiered::{PersistHandle, TieredCache};
pub use traits::{CacheBackend, MemoryProbe};
