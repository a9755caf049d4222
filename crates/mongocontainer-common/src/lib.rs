//! Common utilities for mongocontainer
//!
//! This crate holds the error type shared by the adapter and its test fakes.

pub mod error;

pub use error::{ContainerError, Result};
