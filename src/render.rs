//! The render pass.
//!
//! A view is drawn into an integer area of the render target. Subview areas are derived from
//! their bounds scaled by the ratio of the parent’s area to its bounds, times the subview’s own
//! scale. Views that must go through a texture render their subtree into a framebuffer first and
//! then composite it (see [`render_cache`](crate::render_cache)).

use crate::backend::{Backend, RenderTarget, Shader};
use crate::color::Color;
use crate::error::{Error, Result};
use crate::rect::{IntRect, Rect, Transform};
use crate::render_cache::CachePlan;
use crate::texture::Texture;
use crate::tree::ViewTree;
use crate::view::ViewId;
use crate::window::WindowId;
use cgmath::{Point2, Vector2};
use log::debug;

/// What a view’s `render` hook draws with.
///
/// Shaders handed out by the context are set up to take view-local coordinates.
pub struct RenderCx<'a> {
    tree: &'a ViewTree,
    id: ViewId,
    backend: &'a mut dyn Backend,
    target: RenderTarget,
    area: IntRect,
    transformation: Transform,
}

impl<'a> RenderCx<'a> {
    /// The view being rendered.
    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn tree(&self) -> &ViewTree {
        self.tree
    }

    pub fn bounds(&self) -> Rect {
        self.tree.bounds(self.id)
    }

    pub fn target(&self) -> RenderTarget {
        self.target
    }

    /// The pixel area the view covers in the target.
    pub fn area(&self) -> IntRect {
        self.area
    }

    /// Maps view-local coordinates to clip space.
    pub fn transformation(&self) -> Transform {
        self.transformation
    }

    pub fn backend(&mut self) -> &mut dyn Backend {
        &mut *self.backend
    }

    pub fn color_shader(&mut self) -> &mut dyn Shader {
        let shader = self.backend.color_shader();
        shader.set_transformation(&self.transformation);
        shader
    }

    pub fn texture_shader(&mut self) -> &mut dyn Shader {
        let shader = self.backend.texture_shader();
        shader.set_transformation(&self.transformation);
        shader
    }

    /// Fills a rectangle in view coordinates with a solid color.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let shader = self.color_shader();
        shader.set_color(color);
        fill(shader, rect);
        shader.flush();
    }

    /// Draws a texture stretched over a rectangle in view coordinates.
    pub fn draw_texture(&mut self, texture: &Texture, rect: Rect, tint: Color) {
        let shader = self.texture_shader();
        shader.set_color(tint);
        shader.draw_scaled_fill(texture, rect);
        shader.flush();
    }
}

/// Draws a rectangle as two triangles.
/// Largest pixel coordinate or extent a subarea may have; sums of two stay within `i32`.
const PIXEL_LIMIT: f64 = (1 << 30) as f64;

fn pixels(value: f64) -> i32 {
    value.round().max(-PIXEL_LIMIT).min(PIXEL_LIMIT) as i32
}

fn fill(shader: &mut dyn Shader, rect: Rect) {
    let (min_x, min_y, max_x, max_y) = (rect.min_x(), rect.min_y(), rect.max_x(), rect.max_y());
    shader.draw_triangle(
        Point2::new(min_x, min_y),
        Point2::new(max_x, min_y),
        Point2::new(min_x, max_y),
    );
    shader.draw_triangle(
        Point2::new(max_x, min_y),
        Point2::new(max_x, max_y),
        Point2::new(min_x, max_y),
    );
}

impl ViewTree {
    /// Renders a window’s content view over the whole target.
    pub fn render_window(
        &mut self,
        window: WindowId,
        backend: &mut dyn Backend,
        target: RenderTarget,
    ) -> Result<()> {
        if !self.windows.contains_key(&window) {
            return Err(Error::UnknownWindow(window));
        }
        let content = self
            .content_view(window)
            .ok_or(Error::NoContentView(window))?;
        self.render(content, backend, target, target.area())
    }

    /// Renders a view and its subtree into `area` of the target.
    ///
    /// Pending invalidations are applied and released framebuffers deleted first.
    pub fn render(
        &mut self,
        id: ViewId,
        backend: &mut dyn Backend,
        target: RenderTarget,
        area: IntRect,
    ) -> Result<()> {
        if !self.contains(id) {
            return Err(Error::UnknownView(id));
        }
        self.process_invalidations();
        self.release_framebuffers(backend);
        self.render_and_render_subviews(id, backend, target, area, None)
    }

    /// Deletes framebuffers of destroyed or resized caches.
    pub fn release_framebuffers(&mut self, backend: &mut dyn Backend) {
        for framebuffer in self.released_framebuffers.drain(..) {
            debug!("releasing framebuffer {:?}", framebuffer.id);
            backend.delete_framebuffer(framebuffer);
        }
    }

    fn render_and_render_subviews(
        &mut self,
        id: ViewId,
        backend: &mut dyn Backend,
        target: RenderTarget,
        area: IntRect,
        clip: Option<IntRect>,
    ) -> Result<()> {
        let (plan, renders_to_texture, bounds, tint) = match self.node(id) {
            Some(node) if node.is_visible && !area.is_empty() => {
                let requires_texture =
                    node.renders_to_texture || node.tint_color != Color::WHITE;
                let plan = node.render_cache.plan(
                    requires_texture,
                    node.caches_render,
                    area.width as u32,
                    area.height as u32,
                );
                (plan, node.renders_to_texture, node.bounds, node.tint_color)
            }
            _ => return Ok(()),
        };

        if plan == CachePlan::Direct {
            self.render_node(id, backend, target, area, false, clip)?;
            if let Some(node) = self.node_mut(id) {
                node.render_cache.unlink_texture();
            }
            return Ok(());
        }

        let clip = clip.map_or(area, |clip| clip.intersection(area));
        if !renders_to_texture && clip.is_empty() {
            return Ok(());
        }

        let previous_framebuffer = backend.framebuffer_binding();
        let (width, height) = (area.width as u32, area.height as u32);

        let needs_framebuffer = self
            .node(id)
            .map_or(false, |node| !node.render_cache.matches(width, height));
        if needs_framebuffer {
            debug!("allocating a {}x{} render cache for {:?}", width, height, id);
            let framebuffer = backend.create_framebuffer(width, height)?;
            let old = self
                .node_mut(id)
                .and_then(|node| node.render_cache.replace_framebuffer(framebuffer));
            self.released_framebuffers.extend(old);
        }

        let framebuffer = match self.node_mut(id) {
            Some(node) => {
                node.render_cache.link_texture();
                node.render_cache.framebuffer().map(|fb| fb.id)
            }
            None => return Ok(()),
        };

        if plan == CachePlan::Rebuild {
            debug!("rebuilding render cache of {:?}", id);
            backend.bind_framebuffer(framebuffer);
            let cache_target = RenderTarget::new(width, height);
            let result = self.render_node(id, backend, cache_target, cache_target.area(), true, None);
            backend.bind_framebuffer(previous_framebuffer);
            result?;
            if let Some(node) = self.node_mut(id) {
                node.render_cache.mark_valid();
            }
        }

        backend.set_viewport(area.flipped(target.height));
        backend.set_scissor(Some(clip.flipped(target.height)));

        let texture = self.node(id).and_then(|node| node.render_cache.texture());
        if let (Some(texture), false) = (texture, bounds.is_empty()) {
            let shader = backend.texture_shader();
            shader.set_transformation(&Transform::new(
                Vector2::new(-1., -1.),
                Vector2::new(0., 0.),
                Vector2::new(2. / bounds.size.x, 2. / bounds.size.y),
            ));
            shader.set_color(tint);
            shader.draw_scaled_fill(&texture, Rect::from_xywh(0., 0., bounds.size.x, bounds.size.y));
            shader.flush();
        }

        backend.set_scissor(None);
        Ok(())
    }

    /// Draws the view’s background and content, then its subviews back to front.
    fn render_node(
        &mut self,
        id: ViewId,
        backend: &mut dyn Backend,
        target: RenderTarget,
        area: IntRect,
        should_clear: bool,
        clip: Option<IntRect>,
    ) -> Result<()> {
        let (bounds, clips_to_bounds, background, subviews) = match self.node(id) {
            Some(node) => (
                node.bounds,
                node.clips_to_bounds,
                node.background_color,
                node.subviews.clone(),
            ),
            None => return Ok(()),
        };

        let x_scale = if bounds.size.x != 0. {
            f64::from(area.width) / bounds.size.x
        } else {
            1.
        };
        let y_scale = if bounds.size.y != 0. {
            f64::from(area.height) / bounds.size.y
        } else {
            1.
        };

        let visible = target.area().intersection(area);

        let mut clip = clip;
        if clips_to_bounds {
            let clipped = clip.map_or(visible, |clip| clip.intersection(visible));
            if clipped.is_empty() {
                return Ok(());
            }
            clip = Some(clipped);
        }

        if !visible.is_empty() && !bounds.is_empty() {
            let transformation = Transform::new(
                Vector2::new(-1., 1.),
                Vector2::new(
                    f64::from(area.x - visible.x) / x_scale,
                    f64::from(area.y - visible.y) / y_scale,
                ),
                Vector2::new(
                    2. / bounds.size.x * f64::from(area.width) / f64::from(visible.width),
                    -2. / bounds.size.y * f64::from(area.height) / f64::from(visible.height),
                ),
            );
            if let Some(node) = self.node_mut(id) {
                node.render_transformation = transformation;
            }

            backend.set_viewport(visible.flipped(target.height));
            if should_clear {
                backend.set_scissor(None);
                backend.clear();
            }
            backend.set_scissor(clip.map(|clip| clip.flipped(target.height)));

            if background.a > 0. {
                let shader = backend.color_shader();
                shader.set_transformation(&transformation);
                shader.set_color(background);
                fill(shader, Rect::from_xywh(0., 0., bounds.size.x, bounds.size.y));
                shader.flush();
            }

            let view = self.node_mut(id).and_then(|node| node.view.take());
            if let Some(mut view) = view {
                view.render(&mut RenderCx {
                    tree: &*self,
                    id,
                    backend: &mut *backend,
                    target,
                    area,
                    transformation,
                });
                if let Some(node) = self.node_mut(id) {
                    node.view = Some(view);
                }
            }
        }

        for subview in subviews {
            let (sub_bounds, sub_scale) = (self.bounds(subview), self.scale(subview));
            let subarea = IntRect::new(
                pixels(f64::from(area.x) + x_scale * sub_bounds.origin.x),
                pixels(f64::from(area.y) + y_scale * sub_bounds.origin.y),
                pixels(x_scale * sub_scale.x * sub_bounds.size.x),
                pixels(y_scale * sub_scale.y * sub_bounds.size.y),
            );
            self.render_and_render_subviews(subview, backend, target, subarea, clip)?;
        }

        if clip.is_some() {
            backend.set_scissor(None);
        }
        Ok(())
    }
}
