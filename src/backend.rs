//! Traits for rendering backends.

use crate::color::Color;
use crate::error::Result;
use crate::rect::{IntRect, Rect, Transform};
use crate::texture::Texture;
use cgmath::Point2;

/// Identifies a framebuffer in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u64);

/// An offscreen framebuffer with a single color attachment.
///
/// Owned by exactly one view’s render cache.
#[derive(Debug, PartialEq, Eq)]
pub struct Framebuffer {
    pub id: FramebufferId,
    /// The color attachment.
    pub texture: Texture,
}

impl Framebuffer {
    pub fn width(&self) -> u32 {
        self.texture.width
    }

    pub fn height(&self) -> u32 {
        self.texture.height
    }
}

/// The surface a render pass draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn new(width: u32, height: u32) -> RenderTarget {
        RenderTarget { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The full target area.
    pub fn area(&self) -> IntRect {
        IntRect::new(0, 0, self.width as i32, self.height as i32)
    }
}

/// A drawing program.
///
/// Draw calls may be batched until `flush`.
pub trait Shader {
    fn set_color(&mut self, color: Color);

    /// Sets the transform from view coordinates to clip space.
    fn set_transformation(&mut self, transformation: &Transform);

    /// Draws `texture` stretched over `rect`.
    fn draw_scaled_fill(&mut self, texture: &Texture, rect: Rect);

    fn draw_triangle(&mut self, a: Point2<f64>, b: Point2<f64>, c: Point2<f64>);

    fn flush(&mut self);
}

/// A backend implementation.
///
/// Viewport and scissor rectangles are given with a bottom-left origin.
pub trait Backend {
    /// The currently bound framebuffer, or `None` for the default one.
    fn framebuffer_binding(&self) -> Option<FramebufferId>;

    fn create_framebuffer(&mut self, width: u32, height: u32) -> Result<Framebuffer>;

    fn delete_framebuffer(&mut self, framebuffer: Framebuffer);

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    fn set_viewport(&mut self, viewport: IntRect);

    /// Enables scissoring to the given rectangle, or disables it.
    fn set_scissor(&mut self, scissor: Option<IntRect>);

    /// Clears the bound framebuffer to transparent.
    fn clear(&mut self);

    /// The shader used to draw textures.
    fn texture_shader(&mut self) -> &mut dyn Shader;

    /// The shader used to draw solid colors.
    fn color_shader(&mut self) -> &mut dyn Shader;
}
