//! # pathseg testkit
//!
//! Test utilities for the pathseg codec.
//!
//! This crate provides:
//! - Property-based generators for segments and sender/receiver caches
//! - A session harness that drives both ends of the codec across rounds
//! - Fuzz harnesses for the decoder
//! - Wire test vectors shared with other implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pathseg_testkit::prelude::*;
//!
//! let mut session = SessionHarness::new();
//! let received = session.send(&[segment]);
//! session.verify_caches_agree();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fuzz;
pub mod generators;
pub mod integration;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::vectors::*;
}

pub use fuzz::*;
pub use generators::*;
pub use integration::*;
pub use vectors::*;
