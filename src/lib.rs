//! Interactive terminal control for Andor cameras.
//!
//! The crate is split into a reusable text-menu state machine ([`menu`]) and
//! the camera tool built on top of it:
//!
//! - [`console`]: line input with Ctrl-C and end-of-input detection, plus a
//!   scripted console for tests.
//! - [`camera`]: the driver abstraction, status codes and a simulated camera.
//! - [`session`]: the main menu and the acquisition workflow.
//! - [`export`]: text and BMP writers for acquired frames.
//! - [`config`], [`cli`] and [`logging`]: the ambient application plumbing.

pub mod camera;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod export;
pub mod logging;
pub mod menu;
pub mod session;
