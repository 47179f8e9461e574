//! Shared wire definitions for the `TaskSync` REST API and push channel.

pub mod codec;
pub mod event;
pub mod task;
pub mod user;
