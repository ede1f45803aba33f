//! Texture handles.
//!
//! Textures are decoded and uploaded by the window’s resource collaborator. Views only hold a
//! [`TextureHandle`] and react to it going from pending to loaded.

use core::fmt;
use parking_lot::Mutex;
use std::sync::Arc;

/// Identifies a GPU texture owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// A loaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
}

/// Where a texture should be loaded from.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    /// A named resource bundled with the application.
    Resource(String),
    /// Encoded image data.
    Memory(Arc<Vec<u8>>),
    /// A remote image.
    Url(String),
}

type LoadCallback = Box<dyn FnOnce(Texture) + Send>;

#[derive(Default)]
struct TextureSlot {
    texture: Option<Texture>,
    on_load: Vec<LoadCallback>,
}

/// A shared, possibly not-yet-loaded texture.
///
/// The empty handle stands for “no texture at all” and never loads.
#[derive(Clone, Default)]
pub struct TextureHandle(Option<Arc<Mutex<TextureSlot>>>);

impl TextureHandle {
    /// A handle that will never load.
    pub fn empty() -> TextureHandle {
        TextureHandle(None)
    }

    /// A handle waiting for [`set_loaded`](Self::set_loaded).
    pub fn pending() -> TextureHandle {
        TextureHandle(Some(Arc::new(Mutex::new(TextureSlot::default()))))
    }

    /// A handle for a texture that is already available.
    pub fn loaded(texture: Texture) -> TextureHandle {
        TextureHandle(Some(Arc::new(Mutex::new(TextureSlot {
            texture: Some(texture),
            on_load: Vec::new(),
        }))))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn is_loaded(&self) -> bool {
        self.texture().is_some()
    }

    /// Returns the texture if it has loaded.
    pub fn texture(&self) -> Option<Texture> {
        self.0.as_ref().and_then(|slot| slot.lock().texture)
    }

    /// Registers a callback for when the texture loads.
    ///
    /// Runs immediately if the texture is already loaded. Never runs for the empty handle.
    pub fn on_load<F: 'static + FnOnce(Texture) + Send>(&self, callback: F) {
        let slot = match &self.0 {
            Some(slot) => slot,
            None => return,
        };
        let mut slot = slot.lock();
        match slot.texture {
            Some(texture) => {
                drop(slot);
                callback(texture);
            }
            None => slot.on_load.push(Box::new(callback)),
        }
    }

    /// Marks the texture as loaded and runs the pending callbacks.
    ///
    /// Called by the resource collaborator, possibly from another thread.
    pub fn set_loaded(&self, texture: Texture) {
        let slot = match &self.0 {
            Some(slot) => slot,
            None => return,
        };
        let callbacks = {
            let mut slot = slot.lock();
            slot.texture = Some(texture);
            std::mem::replace(&mut slot.on_load, Vec::new())
        };
        for callback in callbacks {
            callback(texture);
        }
    }
}

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0 {
            None => write!(f, "TextureHandle(empty)"),
            Some(slot) => match slot.lock().texture {
                Some(texture) => write!(f, "TextureHandle({:?})", texture),
                None => write!(f, "TextureHandle(pending)"),
            },
        }
    }
}
