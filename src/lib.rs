//! A retained view tree for windowed applications.
//!
//! Views live in a [`ViewTree`] arena and are addressed by [`ViewId`]. The tree owns the
//! hierarchy, visibility and window attachment, routes input down to the deepest interested view
//! and back up the responder chain, tracks keyboard focus, and renders through an abstract
//! [`Backend`], optionally caching subtrees in framebuffers.
//!
//! A [`Host`] drives the tree from a platform layer: it queues [`InputEvent`]s and tasks from any
//! thread and applies them on its own.

pub mod app;
pub mod backend;
pub mod color;
mod config;
mod dispatch;
pub mod error;
pub mod events;
mod focus;
mod hooks;
mod host;
pub mod rect;
mod render;
pub mod render_cache;
pub mod texture;
mod tree;
pub mod view;
pub mod window;

#[cfg(test)]
mod testing;

pub use app::{Application, Relation};
pub use backend::{Backend, Framebuffer, FramebufferId, RenderTarget, Shader};
pub use color::Color;
pub use config::Config;
pub use error::{Error, Result};
pub use events::{Direction, InputEvent, KeyCode, KeyModifiers, MouseButton, Touch};
pub use host::{EventSender, Host, Task, TaskScheduler};
pub use rect::{IntRect, Rect, Transform};
pub use render::RenderCx;
pub use texture::{Texture, TextureHandle, TextureId, TextureSource};
pub use tree::{UpdateHook, ViewTree};
pub use view::{AsAny, View, ViewCx, ViewId};
pub use window::{Window, WindowId};
