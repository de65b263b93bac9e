//! Common types and utilities for dirchain.
//!
//! This crate provides the shared foundation used across all dirchain
//! modules. It is dependency-light and contains pure data types and helpers
//! with no I/O or side effects, making it suitable as a base for every
//! other crate in the workspace.
//!
//! # Overview
//!
//! - [`error`] - Common error types and the [`Result`] type alias
//! - [`time`] - Wall-clock timestamp helpers
//! - [`types`] - Core types like [`Hash256`] and [`Height`] used throughout
//!   the codebase
//!
//! # Example
//!
//! ```rust
//! use dirchain_common::Hash256;
//!
//! let hash = Hash256::hash(b"hello world");
//! println!("hash: {}", hash.to_hex());
//! ```

pub mod error;
pub mod time;
pub mod types;

pub use error::{Error, Result};
pub use types::{Hash256, Height};
