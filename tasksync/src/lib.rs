//! `TaskSync`: terminal-native collaborative to-do list client library.

pub mod api;
pub mod app;
pub mod config;
pub mod net;
pub mod push;
pub mod session;
pub mod tasks;
pub mod ui;
