//! Hit-testing and input routing.
//!
//! Pointer events travel down from a window’s content view, topmost subview first, until a view
//! that intercepts interactions and contains the point takes them. Keyboard, text and touch
//! events go to the window’s focused view. Hooks that don’t handle an event pass it up the tree.

use crate::events::{KeyCode, KeyModifiers, MouseButton, Touch};
use crate::tree::ViewTree;
use crate::view::{View, ViewCx, ViewId};
use crate::window::WindowId;
use cgmath::{Point2, Vector2};
use log::trace;

impl ViewTree {
    /// Whether a point in local coordinates lies within the view’s bounds.
    pub fn hit_test(&self, id: ViewId, point: Point2<f64>) -> bool {
        self.bounds(id)
            .with_origin(Point2::new(0., 0.))
            .contains(point)
    }

    /// The topmost visible view under a point in this view’s local coordinates.
    ///
    /// Subviews are searched only if the point hits this view or this view doesn’t clip.
    pub fn hit_test_view(&self, id: ViewId, point: Point2<f64>) -> Option<ViewId> {
        let node = self.node(id)?;
        let hit = self.hit_test(id, point);

        if hit || !node.clips_to_bounds {
            for &subview in node.subviews.iter().rev() {
                if self.is_visible(subview) {
                    let point = self.superview_to_local(subview, point);
                    if let Some(view) = self.hit_test_view(subview, point) {
                        return Some(view);
                    }
                }
            }
        }

        if hit {
            Some(id)
        } else {
            None
        }
    }

    /// Whether the pointer is over this view, as tracked by its superview.
    pub fn has_mouse(&self, id: ViewId) -> bool {
        self.superview(id)
            .and_then(|superview| self.subview_with_mouse(superview))
            == Some(id)
    }

    /// The direct subview the pointer is currently over.
    pub fn subview_with_mouse(&self, id: ViewId) -> Option<ViewId> {
        self.node(id)?.subview_with_mouse
    }

    /// Subviews in dispatch order, topmost first.
    fn dispatch_order(&self, id: ViewId) -> Vec<ViewId> {
        self.subviews(id).iter().rev().copied().collect()
    }

    /// Whether an event at a point in the subview’s coordinates may be offered to it.
    fn subview_may_receive(&self, parent: ViewId, subview: ViewId, point: Point2<f64>) -> bool {
        // hooks earlier in the pass may have moved it
        self.superview(subview) == Some(parent)
            && (!self.clips_to_bounds(subview) || self.hit_test(subview, point))
    }

    fn takes_event_at(&self, id: ViewId, point: Point2<f64>) -> bool {
        self.intercepts_interactions(id) && self.hit_test(id, point)
    }

    fn begin_dragging(&mut self, id: ViewId) {
        if let Some(window) = self.window(id).and_then(|w| self.window_mut(w)) {
            window.begin_dragging(id);
        }
    }

    /// Offers a mouse-down at a local point to the view and its subtree.
    ///
    /// The view that takes it starts a drag session. Returns whether any view took it.
    pub fn dispatch_mouse_down(&mut self, id: ViewId, button: MouseButton, point: Point2<f64>) -> bool {
        if !self.is_visible(id) {
            return false;
        }

        if self.children_intercept_interactions(id) {
            for subview in self.dispatch_order(id) {
                let local = self.superview_to_local(subview, point);
                if self.subview_may_receive(id, subview, local)
                    && self.dispatch_mouse_down(subview, button, local)
                {
                    return true;
                }
            }
        }

        if self.takes_event_at(id, point) {
            trace!("{:?} mouse down at {:?}", id, point);
            self.with_view(id, |view, cx| view.mouse_down(cx, button, point));
            self.begin_dragging(id);
            return true;
        }

        false
    }

    /// Offers a mouse-up to the view and its subtree. `start` is where the button went down.
    pub fn dispatch_mouse_up(
        &mut self,
        id: ViewId,
        button: MouseButton,
        start: Point2<f64>,
        point: Point2<f64>,
    ) -> bool {
        if !self.is_visible(id) {
            return false;
        }

        if self.children_intercept_interactions(id) {
            for subview in self.dispatch_order(id) {
                let local_start = self.superview_to_local(subview, start);
                let local = self.superview_to_local(subview, point);
                if self.subview_may_receive(id, subview, local)
                    && self.dispatch_mouse_up(subview, button, local_start, local)
                {
                    return true;
                }
            }
        }

        if self.takes_event_at(id, point) {
            trace!("{:?} mouse up at {:?}", id, point);
            self.with_view(id, |view, cx| view.mouse_up(cx, button, start, point));
            return true;
        }

        false
    }

    /// Offers pointer motion to the view and its subtree, updating hover tracking on the way.
    ///
    /// When the subview under the pointer changes, the old one (and, if it clips, whatever it
    /// was tracking) gets `mouse_exit` and the new one gets `mouse_enter`.
    pub fn dispatch_mouse_movement(&mut self, id: ViewId, point: Point2<f64>) -> bool {
        if !self.is_visible(id) {
            return false;
        }

        let mut with_mouse = None;
        if self.children_intercept_interactions(id) {
            for subview in self.dispatch_order(id) {
                let local = self.superview_to_local(subview, point);
                if self.subview_may_receive(id, subview, local)
                    && self.dispatch_mouse_movement(subview, local)
                {
                    with_mouse = Some(subview);
                    break;
                }
            }
        }

        let previous = self.subview_with_mouse(id);
        if with_mouse != previous {
            if let Some(previous) = previous {
                self.dispatch_mouse_exit(previous);
            }
            if let Some(node) = self.node_mut(id) {
                node.subview_with_mouse = with_mouse;
            }
            if let Some(entered) = with_mouse {
                self.with_view(entered, |view, cx| view.mouse_enter(cx));
            }
        }

        if with_mouse.is_some() {
            return true;
        }

        if self.takes_event_at(id, point) {
            self.with_view(id, |view, cx| view.mouse_movement(cx, point));
            return true;
        }

        false
    }

    fn dispatch_mouse_exit(&mut self, id: ViewId) {
        if self.clips_to_bounds(id) {
            if let Some(tracked) = self.subview_with_mouse(id) {
                self.dispatch_mouse_exit(tracked);
                if let Some(node) = self.node_mut(id) {
                    node.subview_with_mouse = None;
                }
            }
        }
        self.with_view(id, |view, cx| view.mouse_exit(cx));
    }

    /// Offers a wheel event to the view and its subtree.
    pub fn dispatch_mouse_wheel(&mut self, id: ViewId, point: Point2<f64>, delta: Vector2<i32>) -> bool {
        if !self.is_visible(id) {
            return false;
        }

        if self.children_intercept_interactions(id) {
            for subview in self.dispatch_order(id) {
                let local = self.superview_to_local(subview, point);
                if self.subview_may_receive(id, subview, local)
                    && self.dispatch_mouse_wheel(subview, local, delta)
                {
                    return true;
                }
            }
        }

        if self.takes_event_at(id, point) {
            self.with_view(id, |view, cx| view.mouse_wheel(cx, point, delta));
            return true;
        }

        false
    }

    // ---------------------------------------------------------------------------------------------
    // responder chain

    /// The superview, if it intercepts interactions.
    fn intercepting_superview(&self, id: ViewId) -> Option<ViewId> {
        self.superview(id)
            .filter(|&superview| self.intercepts_interactions(superview))
    }

    pub(crate) fn bubble_mouse_down(&mut self, id: ViewId, button: MouseButton, point: Point2<f64>) {
        if let Some(superview) = self.intercepting_superview(id) {
            let point = self.local_to_superview(id, point);
            self.with_view(superview, |view, cx| view.mouse_down(cx, button, point));
            self.begin_dragging(superview);
        }
    }

    pub(crate) fn bubble_mouse_up(
        &mut self,
        id: ViewId,
        button: MouseButton,
        start: Point2<f64>,
        point: Point2<f64>,
    ) {
        if let Some(superview) = self.intercepting_superview(id) {
            let start = self.local_to_superview(id, start);
            let point = self.local_to_superview(id, point);
            self.with_view(superview, |view, cx| view.mouse_up(cx, button, start, point));
        }
    }

    pub(crate) fn bubble_mouse_drag(&mut self, id: ViewId, start: Point2<f64>, point: Point2<f64>) {
        if let Some(superview) = self.intercepting_superview(id) {
            let start = self.local_to_superview(id, start);
            let point = self.local_to_superview(id, point);
            self.with_view(superview, |view, cx| view.mouse_drag(cx, start, point));
        }
    }

    pub(crate) fn bubble_mouse_movement(&mut self, id: ViewId, point: Point2<f64>) {
        if let Some(superview) = self.intercepting_superview(id) {
            let point = self.local_to_superview(id, point);
            self.with_view(superview, |view, cx| view.mouse_movement(cx, point));
        }
    }

    pub(crate) fn bubble_mouse_wheel(&mut self, id: ViewId, point: Point2<f64>, delta: Vector2<i32>) {
        if let Some(superview) = self.intercepting_superview(id) {
            let point = self.local_to_superview(id, point);
            self.with_view(superview, |view, cx| view.mouse_wheel(cx, point, delta));
        }
    }

    pub(crate) fn bubble_key_up(
        &mut self,
        id: ViewId,
        key: KeyCode,
        modifiers: KeyModifiers,
        repeat: bool,
    ) {
        if let Some(superview) = self.superview(id) {
            self.with_view(superview, |view, cx| view.key_up(cx, key, modifiers, repeat));
        }
    }

    pub(crate) fn bubble_text_input(&mut self, id: ViewId, text: &str) {
        if let Some(superview) = self.superview(id) {
            self.with_view(superview, |view, cx| view.text_input(cx, text));
        }
    }

    pub(crate) fn bubble_touch_down(&mut self, id: ViewId, touch: &Touch) {
        if let Some(superview) = self.superview(id) {
            self.with_view(superview, |view, cx| view.touch_down(cx, touch));
        }
    }

    pub(crate) fn bubble_touch_up(&mut self, id: ViewId, touch: &Touch) {
        if let Some(superview) = self.superview(id) {
            self.with_view(superview, |view, cx| view.touch_up(cx, touch));
        }
    }

    pub(crate) fn bubble_touch_movement(&mut self, id: ViewId, touch: &Touch) {
        if let Some(superview) = self.superview(id) {
            self.with_view(superview, |view, cx| view.touch_movement(cx, touch));
        }
    }

    // ---------------------------------------------------------------------------------------------
    // window entry points

    /// The content view, if it is attached.
    fn content_target(&self, window: WindowId) -> Option<ViewId> {
        self.content_view(window)
            .filter(|&content| self.window(content) == Some(window))
    }

    /// Dispatches a mouse-down at a point in window coordinates.
    pub fn window_mouse_down(&mut self, window: WindowId, button: MouseButton, point: Point2<f64>) -> bool {
        match self.content_target(window) {
            Some(content) => {
                let point = self.superview_to_local(content, point);
                self.dispatch_mouse_down(content, button, point)
            }
            None => false,
        }
    }

    /// Dispatches a mouse-up in window coordinates, then ends every drag session in the window.
    pub fn window_mouse_up(
        &mut self,
        window: WindowId,
        button: MouseButton,
        start: Point2<f64>,
        point: Point2<f64>,
    ) -> bool {
        let handled = match self.content_target(window) {
            Some(content) => {
                let start = self.superview_to_local(content, start);
                let point = self.superview_to_local(content, point);
                self.dispatch_mouse_up(content, button, start, point)
            }
            None => false,
        };

        if let Some(w) = self.window_mut(window) {
            for view in w.dragged_views() {
                w.end_dragging(view);
            }
        }
        handled
    }

    pub fn window_mouse_movement(&mut self, window: WindowId, point: Point2<f64>) -> bool {
        match self.content_target(window) {
            Some(content) => {
                let point = self.superview_to_local(content, point);
                self.dispatch_mouse_movement(content, point)
            }
            None => false,
        }
    }

    pub fn window_mouse_wheel(
        &mut self,
        window: WindowId,
        point: Point2<f64>,
        delta: Vector2<i32>,
    ) -> bool {
        match self.content_target(window) {
            Some(content) => {
                let point = self.superview_to_local(content, point);
                self.dispatch_mouse_wheel(content, point, delta)
            }
            None => false,
        }
    }

    /// Sends pointer motion with a button held to every view with an active drag session.
    pub fn window_mouse_drag(&mut self, window: WindowId, start: Point2<f64>, point: Point2<f64>) {
        let dragged = match self.window_ref(window) {
            Some(w) => w.dragged_views(),
            None => return,
        };
        for view in dragged {
            if self.window(view) != Some(window) {
                continue;
            }
            let start = self.window_to_local(view, start);
            let point = self.window_to_local(view, point);
            self.with_view(view, |v, cx| v.mouse_drag(cx, start, point));
        }
    }

    /// Sends a key-down to the focused view. Returns whether there was one.
    pub fn window_key_down(
        &mut self,
        window: WindowId,
        key: KeyCode,
        modifiers: KeyModifiers,
        repeat: bool,
    ) -> bool {
        self.to_focus(window, |view, cx| view.key_down(cx, key, modifiers, repeat))
    }

    pub fn window_key_up(
        &mut self,
        window: WindowId,
        key: KeyCode,
        modifiers: KeyModifiers,
        repeat: bool,
    ) -> bool {
        self.to_focus(window, |view, cx| view.key_up(cx, key, modifiers, repeat))
    }

    pub fn window_text_input(&mut self, window: WindowId, text: &str) -> bool {
        self.to_focus(window, |view, cx| view.text_input(cx, text))
    }

    pub fn window_touch_down(&mut self, window: WindowId, touch: &Touch) -> bool {
        self.to_focus(window, |view, cx| view.touch_down(cx, touch))
    }

    pub fn window_touch_up(&mut self, window: WindowId, touch: &Touch) -> bool {
        self.to_focus(window, |view, cx| view.touch_up(cx, touch))
    }

    pub fn window_touch_movement(&mut self, window: WindowId, touch: &Touch) -> bool {
        self.to_focus(window, |view, cx| view.touch_movement(cx, touch))
    }

    fn to_focus<F>(&mut self, window: WindowId, f: F) -> bool
    where
        F: FnOnce(&mut dyn View, &mut ViewCx<'_>),
    {
        match self.focused_view(window) {
            Some(focus) => self.with_view(focus, f).is_some(),
            None => false,
        }
    }
}
