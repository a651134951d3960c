//! Shapes Inc. login flow.
//!
//! This module provides the login state machine, the HTTP client for the
//! code exchange and chat endpoints, handling of the authorization callback,
//! and the coordinator that ties them to token storage.

pub mod callback;
mod client;
mod flow;
mod session;

pub use client::{
    Endpoints, ShapesClient, DEFAULT_API_BASE, DEFAULT_AUTH_BASE, DEFAULT_MODEL, DEFAULT_SITE_BASE,
};
pub use flow::AuthFlow;
pub use session::{AuthStep, Notice, NoticeLevel, Session};
