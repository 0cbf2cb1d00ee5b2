pub mod content_type;
pub mod deliver;
pub mod error;
pub mod listing;
pub mod path;
pub mod permissions;
pub mod range;
pub mod render;
pub mod router;
pub mod stream;

pub use deliver::{AppState, SiteConfig};
pub use router::gateway_router;
