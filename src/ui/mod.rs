//! UI module for shapes-auth.
//!
//! This module renders the login form for the current step and the
//! notice stack.

mod notices;
mod render;

pub use render::ui;
