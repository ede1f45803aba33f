//! Per-view render caching.
//!
//! A view renders straight into its target unless it has to go through a texture (it renders to
//! texture explicitly, or is tinted) or it caches its render. In those cases the view and its
//! subtree are rendered into an offscreen framebuffer sized to the view’s render area, and the
//! framebuffer’s color attachment is then composited into the target.

use crate::backend::Framebuffer;
use crate::texture::Texture;

/// What a view does with its cache this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePlan {
    /// Draw straight into the target; the cache is not involved.
    Direct,
    /// The cached texture is current; composite it without rendering the subtree.
    Reuse,
    /// Render the subtree into the framebuffer (allocating or resizing it first), then
    /// composite.
    Rebuild,
}

/// Offscreen render state of one view.
#[derive(Debug, Default)]
pub struct RenderCache {
    framebuffer: Option<Framebuffer>,
    valid: bool,
    /// The texture most recently composited for this view, if it went through a texture.
    texture: Option<Texture>,
}

impl RenderCache {
    pub fn new() -> RenderCache {
        RenderCache::default()
    }

    /// Decides how to render an area of `width`×`height` pixels.
    pub fn plan(
        &self,
        requires_texture: bool,
        caches_render: bool,
        width: u32,
        height: u32,
    ) -> CachePlan {
        if !requires_texture && !caches_render {
            CachePlan::Direct
        } else if caches_render && self.valid && self.matches(width, height) {
            CachePlan::Reuse
        } else {
            CachePlan::Rebuild
        }
    }

    /// Whether the framebuffer exists and has the given size.
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.framebuffer
            .as_ref()
            .map_or(false, |fb| fb.width() == width && fb.height() == height)
    }

    /// Whether the cached pixels are current.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn mark_valid(&mut self) {
        self.valid = true;
    }

    pub fn framebuffer(&self) -> Option<&Framebuffer> {
        self.framebuffer.as_ref()
    }

    /// Installs a new framebuffer, returning the old one for release. The cache becomes invalid.
    pub fn replace_framebuffer(&mut self, framebuffer: Framebuffer) -> Option<Framebuffer> {
        self.valid = false;
        self.texture = None;
        self.framebuffer.replace(framebuffer)
    }

    /// Removes the framebuffer, e.g. when the view is destroyed.
    pub fn take_framebuffer(&mut self) -> Option<Framebuffer> {
        self.valid = false;
        self.texture = None;
        self.framebuffer.take()
    }

    /// Points the render texture at the framebuffer’s color attachment.
    pub fn link_texture(&mut self) {
        self.texture = self.framebuffer.as_ref().map(|fb| fb.texture);
    }

    /// Forgets the render texture; used when the view renders directly.
    pub fn unlink_texture(&mut self) {
        self.texture = None;
    }

    /// The texture holding the view’s last texture-based render.
    pub fn texture(&self) -> Option<Texture> {
        self.texture
    }
}
