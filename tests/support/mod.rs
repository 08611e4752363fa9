//! Shared helpers for the integration tests.

#![allow(dead_code)]

pub mod loop_reduce;
pub mod tolerance;
