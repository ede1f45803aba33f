use crate::events::{KeyCode, KeyModifiers, MouseButton, Touch};
use crate::render::RenderCx;
use crate::tree::ViewTree;
use cgmath::{Point2, Vector2};
use core::any::Any;
use core::ops::{Deref, DerefMut};
use uuid::Uuid;

/// A unique identifier for a view.
///
/// (this is just a UUID)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(u32, u16, u16, [u8; 8]);

impl ViewId {
    pub(crate) fn new() -> ViewId {
        let uuid = Uuid::new_v4();
        let (a, b, c, d) = uuid.as_fields();
        ViewId(a, b, c, *d)
    }
}

/// For downcasting; implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// The behavior of a view.
///
/// Every hook has a default: lifecycle hooks do nothing, and input hooks pass the event on the way
/// the responder chain would (pointer events to an intercepting superview, keyboard and touch
/// events to the superview). Widgets override only what they need.
///
/// Hooks run with the view’s box checked out of the tree, so a hook cannot re-enter itself; such
/// nested calls are skipped.
#[allow(unused_variables)]
pub trait View: AsAny {
    /// Draws the view’s own content. Subviews are drawn afterwards, on top.
    fn render(&mut self, cx: &mut RenderCx<'_>) {}

    /// Positions subviews. Called whenever the view is resized.
    fn layout(&mut self, cx: &mut ViewCx<'_>) {}

    /// The view was attached to a window or detached from one.
    fn window_changed(&mut self, cx: &mut ViewCx<'_>) {}

    /// The view is about to become visible in an open window.
    fn will_appear(&mut self, cx: &mut ViewCx<'_>) {}

    /// The view became visible in an open window.
    fn appeared(&mut self, cx: &mut ViewCx<'_>) {}

    /// The view is about to stop being visible in an open window.
    fn will_disappear(&mut self, cx: &mut ViewCx<'_>) {}

    /// The view stopped being visible in an open window.
    fn disappeared(&mut self, cx: &mut ViewCx<'_>) {}

    fn focus_gained(&mut self, cx: &mut ViewCx<'_>) {}

    fn focus_lost(&mut self, cx: &mut ViewCx<'_>) {}

    fn mouse_down(&mut self, cx: &mut ViewCx<'_>, button: MouseButton, point: Point2<f64>) {
        cx.bubble_mouse_down(button, point);
    }

    /// `start` is where the matching mouse-down happened.
    fn mouse_up(
        &mut self,
        cx: &mut ViewCx<'_>,
        button: MouseButton,
        start: Point2<f64>,
        point: Point2<f64>,
    ) {
        cx.bubble_mouse_up(button, start, point);
    }

    fn mouse_drag(&mut self, cx: &mut ViewCx<'_>, start: Point2<f64>, point: Point2<f64>) {
        cx.bubble_mouse_drag(start, point);
    }

    fn mouse_movement(&mut self, cx: &mut ViewCx<'_>, point: Point2<f64>) {
        cx.bubble_mouse_movement(point);
    }

    fn mouse_wheel(&mut self, cx: &mut ViewCx<'_>, point: Point2<f64>, delta: Vector2<i32>) {
        cx.bubble_mouse_wheel(point, delta);
    }

    fn mouse_enter(&mut self, cx: &mut ViewCx<'_>) {}

    fn mouse_exit(&mut self, cx: &mut ViewCx<'_>) {}

    fn key_down(&mut self, cx: &mut ViewCx<'_>, key: KeyCode, modifiers: KeyModifiers, repeat: bool) {
        cx.default_key_down(key, modifiers, repeat);
    }

    fn key_up(&mut self, cx: &mut ViewCx<'_>, key: KeyCode, modifiers: KeyModifiers, repeat: bool) {
        cx.bubble_key_up(key, modifiers, repeat);
    }

    fn text_input(&mut self, cx: &mut ViewCx<'_>, text: &str) {
        cx.bubble_text_input(text);
    }

    fn touch_down(&mut self, cx: &mut ViewCx<'_>, touch: &Touch) {
        cx.bubble_touch_down(touch);
    }

    fn touch_up(&mut self, cx: &mut ViewCx<'_>, touch: &Touch) {
        cx.bubble_touch_up(touch);
    }

    fn touch_movement(&mut self, cx: &mut ViewCx<'_>, touch: &Touch) {
        cx.bubble_touch_movement(touch);
    }
}

/// A plain container view with no behavior of its own.
impl View for () {}

/// The context hooks run in: the tree, plus the id of the view the hook belongs to.
pub struct ViewCx<'a> {
    tree: &'a mut ViewTree,
    id: ViewId,
}

impl<'a> ViewCx<'a> {
    pub(crate) fn new(tree: &'a mut ViewTree, id: ViewId) -> ViewCx<'a> {
        ViewCx { tree, id }
    }

    /// The view this context belongs to.
    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn bubble_mouse_down(&mut self, button: MouseButton, point: Point2<f64>) {
        self.tree.bubble_mouse_down(self.id, button, point);
    }

    pub fn bubble_mouse_up(&mut self, button: MouseButton, start: Point2<f64>, point: Point2<f64>) {
        self.tree.bubble_mouse_up(self.id, button, start, point);
    }

    pub fn bubble_mouse_drag(&mut self, start: Point2<f64>, point: Point2<f64>) {
        self.tree.bubble_mouse_drag(self.id, start, point);
    }

    pub fn bubble_mouse_movement(&mut self, point: Point2<f64>) {
        self.tree.bubble_mouse_movement(self.id, point);
    }

    pub fn bubble_mouse_wheel(&mut self, point: Point2<f64>, delta: Vector2<i32>) {
        self.tree.bubble_mouse_wheel(self.id, point, delta);
    }

    /// Tab-key focus traversal and arrow-key focus movement; anything else goes up the responder
    /// chain.
    pub fn default_key_down(&mut self, key: KeyCode, modifiers: KeyModifiers, repeat: bool) {
        self.tree.default_key_down(self.id, key, modifiers, repeat);
    }

    pub fn bubble_key_up(&mut self, key: KeyCode, modifiers: KeyModifiers, repeat: bool) {
        self.tree.bubble_key_up(self.id, key, modifiers, repeat);
    }

    pub fn bubble_text_input(&mut self, text: &str) {
        self.tree.bubble_text_input(self.id, text);
    }

    pub fn bubble_touch_down(&mut self, touch: &Touch) {
        self.tree.bubble_touch_down(self.id, touch);
    }

    pub fn bubble_touch_up(&mut self, touch: &Touch) {
        self.tree.bubble_touch_up(self.id, touch);
    }

    pub fn bubble_touch_movement(&mut self, touch: &Touch) {
        self.tree.bubble_touch_movement(self.id, touch);
    }
}

impl<'a> Deref for ViewCx<'a> {
    type Target = ViewTree;

    fn deref(&self) -> &ViewTree {
        self.tree
    }
}

impl<'a> DerefMut for ViewCx<'a> {
    fn deref_mut(&mut self) -> &mut ViewTree {
        self.tree
    }
}
