//! Recording doubles for the window, backend and views.

use crate::backend::{Backend, Framebuffer, FramebufferId, Shader};
use crate::color::Color;
use crate::error::{Error, Result};
use crate::events::{KeyCode, KeyModifiers, MouseButton, Touch};
use crate::rect::{IntRect, Rect, Transform};
use crate::render::RenderCx;
use crate::texture::{Texture, TextureHandle, TextureId, TextureSource};
use crate::view::{View, ViewCx, ViewId};
use crate::window::Window;
use cgmath::{Point2, Vector2};
use parking_lot::Mutex;
use std::sync::Arc;

pub type Recorder = Arc<Mutex<Vec<String>>>;

pub fn recorder() -> Recorder {
    Arc::new(Mutex::new(Vec::new()))
}

fn point(p: Point2<f64>) -> String {
    format!("({}, {})", p.x, p.y)
}

/// A view that logs every hook as `"<name> <hook> ..."`.
pub struct RecordingView {
    name: &'static str,
    log: Recorder,
    bubbles: bool,
}

impl RecordingView {
    pub fn new(name: &'static str, log: &Recorder) -> RecordingView {
        RecordingView {
            name,
            log: Arc::clone(log),
            bubbles: false,
        }
    }

    /// Also passes input on the way the default hooks would.
    pub fn bubbling(mut self) -> RecordingView {
        self.bubbles = true;
        self
    }

    fn record(&self, event: impl AsRef<str>) {
        self.log.lock().push(format!("{} {}", self.name, event.as_ref()));
    }
}

impl View for RecordingView {
    fn render(&mut self, cx: &mut RenderCx<'_>) {
        let area = cx.area();
        self.record(format!(
            "render {},{} {}x{}",
            area.x, area.y, area.width, area.height
        ));
    }

    fn layout(&mut self, _: &mut ViewCx<'_>) {
        self.record("layout");
    }

    fn window_changed(&mut self, _: &mut ViewCx<'_>) {
        self.record("window_changed");
    }

    fn will_appear(&mut self, _: &mut ViewCx<'_>) {
        self.record("will_appear");
    }

    fn appeared(&mut self, _: &mut ViewCx<'_>) {
        self.record("appeared");
    }

    fn will_disappear(&mut self, _: &mut ViewCx<'_>) {
        self.record("will_disappear");
    }

    fn disappeared(&mut self, _: &mut ViewCx<'_>) {
        self.record("disappeared");
    }

    fn focus_gained(&mut self, _: &mut ViewCx<'_>) {
        self.record("focus_gained");
    }

    fn focus_lost(&mut self, _: &mut ViewCx<'_>) {
        self.record("focus_lost");
    }

    fn mouse_down(&mut self, cx: &mut ViewCx<'_>, button: MouseButton, p: Point2<f64>) {
        self.record(format!("mouse_down {}", point(p)));
        if self.bubbles {
            cx.bubble_mouse_down(button, p);
        }
    }

    fn mouse_up(&mut self, cx: &mut ViewCx<'_>, button: MouseButton, start: Point2<f64>, p: Point2<f64>) {
        self.record(format!("mouse_up {} from {}", point(p), point(start)));
        if self.bubbles {
            cx.bubble_mouse_up(button, start, p);
        }
    }

    fn mouse_drag(&mut self, cx: &mut ViewCx<'_>, start: Point2<f64>, p: Point2<f64>) {
        self.record(format!("mouse_drag {} from {}", point(p), point(start)));
        if self.bubbles {
            cx.bubble_mouse_drag(start, p);
        }
    }

    fn mouse_movement(&mut self, cx: &mut ViewCx<'_>, p: Point2<f64>) {
        self.record(format!("mouse_movement {}", point(p)));
        if self.bubbles {
            cx.bubble_mouse_movement(p);
        }
    }

    fn mouse_wheel(&mut self, cx: &mut ViewCx<'_>, p: Point2<f64>, delta: Vector2<i32>) {
        self.record(format!("mouse_wheel {} by ({}, {})", point(p), delta.x, delta.y));
        if self.bubbles {
            cx.bubble_mouse_wheel(p, delta);
        }
    }

    fn mouse_enter(&mut self, _: &mut ViewCx<'_>) {
        self.record("mouse_enter");
    }

    fn mouse_exit(&mut self, _: &mut ViewCx<'_>) {
        self.record("mouse_exit");
    }

    fn key_down(&mut self, cx: &mut ViewCx<'_>, key: KeyCode, modifiers: KeyModifiers, repeat: bool) {
        self.record(format!("key_down {:?}", key));
        if self.bubbles {
            cx.default_key_down(key, modifiers, repeat);
        }
    }

    fn key_up(&mut self, cx: &mut ViewCx<'_>, key: KeyCode, modifiers: KeyModifiers, repeat: bool) {
        self.record(format!("key_up {:?}", key));
        if self.bubbles {
            cx.bubble_key_up(key, modifiers, repeat);
        }
    }

    fn text_input(&mut self, cx: &mut ViewCx<'_>, text: &str) {
        self.record(format!("text_input {}", text));
        if self.bubbles {
            cx.bubble_text_input(text);
        }
    }

    fn touch_down(&mut self, cx: &mut ViewCx<'_>, touch: &Touch) {
        self.record(format!("touch_down {}", touch.finger));
        if self.bubbles {
            cx.bubble_touch_down(touch);
        }
    }

    fn touch_up(&mut self, cx: &mut ViewCx<'_>, touch: &Touch) {
        self.record(format!("touch_up {}", touch.finger));
        if self.bubbles {
            cx.bubble_touch_up(touch);
        }
    }

    fn touch_movement(&mut self, cx: &mut ViewCx<'_>, touch: &Touch) {
        self.record(format!("touch_movement {}", touch.finger));
        if self.bubbles {
            cx.bubble_touch_movement(touch);
        }
    }
}

/// A window that keeps its bookkeeping in public fields.
#[derive(Debug, Default)]
pub struct TestWindow {
    pub open: bool,
    pub focus: Option<ViewId>,
    pub subscribers: Vec<ViewId>,
    pub dragging: Vec<ViewId>,
    pub loads: Vec<(TextureSource, TextureHandle)>,
}

impl TestWindow {
    pub fn open() -> TestWindow {
        TestWindow {
            open: true,
            ..TestWindow::default()
        }
    }
}

impl Window for TestWindow {
    fn is_open(&self) -> bool {
        self.open
    }

    fn focus(&self) -> Option<ViewId> {
        self.focus
    }

    fn set_focus(&mut self, view: Option<ViewId>) {
        self.focus = view;
    }

    fn subscribe_to_updates(&mut self, view: ViewId) {
        if !self.subscribers.contains(&view) {
            self.subscribers.push(view);
        }
    }

    fn unsubscribe_from_updates(&mut self, view: ViewId) {
        self.subscribers.retain(|&v| v != view);
    }

    fn update_subscribers(&self) -> Vec<ViewId> {
        self.subscribers.clone()
    }

    fn begin_dragging(&mut self, view: ViewId) {
        if !self.dragging.contains(&view) {
            self.dragging.push(view);
        }
    }

    fn end_dragging(&mut self, view: ViewId) {
        self.dragging.retain(|&v| v != view);
    }

    fn dragged_views(&self) -> Vec<ViewId> {
        self.dragging.clone()
    }

    fn load_texture(&mut self, source: TextureSource) -> TextureHandle {
        let handle = TextureHandle::pending();
        self.loads.push((source, handle.clone()));
        handle
    }
}

pub struct RecordingShader {
    name: &'static str,
    log: Recorder,
}

impl Shader for RecordingShader {
    fn set_color(&mut self, color: Color) {
        self.log.lock().push(format!("{} set_color {:?}", self.name, color));
    }

    fn set_transformation(&mut self, _: &Transform) {
        self.log.lock().push(format!("{} set_transformation", self.name));
    }

    fn draw_scaled_fill(&mut self, texture: &Texture, rect: Rect) {
        self.log.lock().push(format!(
            "{} draw_scaled_fill {} {}x{}",
            self.name, texture.id.0, rect.size.x, rect.size.y
        ));
    }

    fn draw_triangle(&mut self, a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) {
        self.log.lock().push(format!(
            "{} draw_triangle {} {} {}",
            self.name,
            point(a),
            point(b),
            point(c)
        ));
    }

    fn flush(&mut self) {
        self.log.lock().push(format!("{} flush", self.name));
    }
}

/// A backend that logs every call and hands out numbered framebuffers.
pub struct RecordingBackend {
    pub log: Recorder,
    pub created: Vec<(u32, u32)>,
    pub deleted: Vec<FramebufferId>,
    pub fail_framebuffers: bool,
    binding: Option<FramebufferId>,
    texture_shader: RecordingShader,
    color_shader: RecordingShader,
}

impl RecordingBackend {
    pub fn new() -> RecordingBackend {
        let log = recorder();
        RecordingBackend {
            created: Vec::new(),
            deleted: Vec::new(),
            fail_framebuffers: false,
            binding: None,
            texture_shader: RecordingShader {
                name: "texture",
                log: Arc::clone(&log),
            },
            color_shader: RecordingShader {
                name: "color",
                log: Arc::clone(&log),
            },
            log,
        }
    }
}

fn area(rect: IntRect) -> String {
    format!("{},{} {}x{}", rect.x, rect.y, rect.width, rect.height)
}

impl Backend for RecordingBackend {
    fn framebuffer_binding(&self) -> Option<FramebufferId> {
        self.binding
    }

    fn create_framebuffer(&mut self, width: u32, height: u32) -> Result<Framebuffer> {
        if self.fail_framebuffers {
            return Err(Error::Framebuffer {
                width,
                height,
                reason: "out of memory".to_string(),
            });
        }
        self.created.push((width, height));
        let id = self.created.len() as u64;
        self.log.lock().push(format!("create {}x{}", width, height));
        Ok(Framebuffer {
            id: FramebufferId(id),
            texture: Texture {
                id: TextureId(id),
                width,
                height,
            },
        })
    }

    fn delete_framebuffer(&mut self, framebuffer: Framebuffer) {
        self.log.lock().push(format!("delete {}", framebuffer.id.0));
        self.deleted.push(framebuffer.id);
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.log
            .lock()
            .push(format!("bind {:?}", framebuffer.map(|fb| fb.0)));
        self.binding = framebuffer;
    }

    fn set_viewport(&mut self, viewport: IntRect) {
        self.log.lock().push(format!("viewport {}", area(viewport)));
    }

    fn set_scissor(&mut self, scissor: Option<IntRect>) {
        let entry = match scissor {
            Some(scissor) => format!("scissor {}", area(scissor)),
            None => "scissor off".to_string(),
        };
        self.log.lock().push(entry);
    }

    fn clear(&mut self) {
        self.log.lock().push("clear".to_string());
    }

    fn texture_shader(&mut self) -> &mut dyn Shader {
        &mut self.texture_shader
    }

    fn color_shader(&mut self) -> &mut dyn Shader {
        &mut self.color_shader
    }
}
