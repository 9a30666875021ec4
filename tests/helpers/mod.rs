//! Test helpers module
//!
//! This module provides utilities and helpers for testing the EventHub crate:
//! database setup, generated test data and a wired test context.

#![allow(dead_code)]

pub mod database_helper;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use test_context::*;
pub use test_data::*;
