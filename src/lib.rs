#![allow(clippy::module_inception)]

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub(crate) mod protocol;

pub use crate::error::CacheError;
pub type Result<T, E = crate::error::CacheError> = std::result::Result<T, E>;

pub use adapter::{Capabilities, SsdbCache};
pub use config::Options;

pub(crate) mod common {
    pub use crate::error::CacheError;
    pub(crate) type Result<T, E = CacheError> = std::result::Result<T, E>;

    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}
