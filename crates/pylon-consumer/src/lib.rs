//! Pylon consumer — library surface for the binary and the e2e tests.

pub mod config;
pub mod sink;
