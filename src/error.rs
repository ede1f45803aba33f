//! Errors.

use crate::view::ViewId;
use crate::window::WindowId;
use thiserror::Error;

/// Errors surfaced by the fallible parts of the view engine.
///
/// Detached or absent state is not an error; operations on it are no-ops.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown window: {0:?}")]
    UnknownWindow(WindowId),

    #[error("unknown view: {0:?}")]
    UnknownView(ViewId),

    #[error("window {0:?} has no content view")]
    NoContentView(WindowId),

    #[error("failed to create a {width}x{height} framebuffer: {reason}")]
    Framebuffer {
        width: u32,
        height: u32,
        reason: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
