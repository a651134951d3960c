//! Shapes Auth - a terminal client for the Shapes Inc. login flow.
//!
//! This library exposes the core modules for testing and reuse.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod storage;
pub mod ui;
