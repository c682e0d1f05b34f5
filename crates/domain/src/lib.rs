//! Shared types for the hive workspace: the error taxonomy, the
//! provider-agnostic message/tool model, streaming events, and the
//! configuration surface.

pub mod capability;
pub mod config;
pub mod error;
pub mod stream;
pub mod tool;

pub use error::{Error, Result};
