#[cfg(unix)]
pub mod local;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub use local::LocalFs;
pub use memory::MemoryFs;
pub use traits::{FileReader, RemoteFs};
