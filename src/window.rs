//! The window collaborator.

use crate::texture::{TextureHandle, TextureSource};
use crate::view::{AsAny, ViewId};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a window registered with a [`ViewTree`](crate::ViewTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(u64);

impl WindowId {
    pub(crate) fn new() -> WindowId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        WindowId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A platform window hosting a view tree.
///
/// The window owns the platform resources (the OS window, its GL context, the texture loader) and
/// the bookkeeping the view tree delegates to it: which view has focus, which views want per-frame
/// updates, and which views are being dragged.
pub trait Window: AsAny {
    /// Whether the window is currently open on screen.
    fn is_open(&self) -> bool;

    /// The focused view, which is also the first responder for keyboard events.
    fn focus(&self) -> Option<ViewId>;

    /// Sets the focused view. Focus hooks are dispatched by the tree, not the window.
    fn set_focus(&mut self, view: Option<ViewId>);

    fn subscribe_to_updates(&mut self, view: ViewId);

    fn unsubscribe_from_updates(&mut self, view: ViewId);

    /// Views that should receive `dispatch_update` this frame.
    fn update_subscribers(&self) -> Vec<ViewId>;

    /// Starts a drag session anchored at `view`; subsequent pointer motion goes to it until the
    /// button is released.
    fn begin_dragging(&mut self, view: ViewId);

    fn end_dragging(&mut self, view: ViewId);

    /// Views with an active drag session.
    fn dragged_views(&self) -> Vec<ViewId>;

    /// Starts loading a texture. Load failures are the loader’s business; the handle simply never
    /// becomes loaded.
    fn load_texture(&mut self, source: TextureSource) -> TextureHandle;
}
