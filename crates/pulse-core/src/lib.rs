//! Core building blocks shared by every Pulse crate.
//!
//! This crate carries no business logic: it defines the unified error
//! type, typed identifiers, and the configuration schemas that the
//! engine, store, and sync crates consume.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
