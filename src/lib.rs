//! fmtd - warm source formatting service
//!
//! Resolves which formatting configuration applies to a project directory,
//! caches that resolution for the life of the process and formats source
//! text with it.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod resolve;
pub mod service;
pub mod ui;

pub use error::{FmtdError, FmtdResult};
pub use service::{FormatRequest, FormatResult, FormatService};
