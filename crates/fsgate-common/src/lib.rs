pub mod error;
pub mod time;
pub mod types;

pub use error::{GatewayError, Result};
pub use types::{FileInfo, Identity, PermissionBits, PermissionTriple};
