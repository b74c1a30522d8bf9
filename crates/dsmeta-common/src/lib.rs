//! dsmeta Common - Shared types and utilities
//!
//! This crate provides the error taxonomy, configuration, dataset record
//! types and content digests used by the store and its front ends.

pub mod checksum;
pub mod config;
pub mod error;
pub mod types;

pub use checksum::ContentDigest;
pub use self::config::Config;
pub use error::{Error, Result};
pub use types::*;
