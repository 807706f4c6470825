//! Common test infrastructure for stencil-package tests
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: package names and version strings
//! - `tarballs`: in-memory npm-style tarballs and integrity strings
//! - `mock_registry`: wiremock setup for registry documents and tarballs

// Not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod constants;
pub mod mock_registry;
pub mod tarballs;

pub use constants::*;
pub use mock_registry::*;
pub use tarballs::*;
