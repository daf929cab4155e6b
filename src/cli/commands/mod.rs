//! CLI command implementations

pub mod config;
pub mod debug_info;
pub mod flush;
pub mod format;

pub use config::execute as config;
pub use debug_info::execute as debug_info;
pub use flush::execute as flush_cache;
pub use format::execute as format;
