use crate::app::{Application, ListenerSpec};
use crate::backend::Framebuffer;
use crate::color::Color;
use crate::error::{Error, Result};
use crate::rect::{Rect, Transform};
use crate::render_cache::RenderCache;
use crate::texture::Texture;
use crate::view::{View, ViewCx, ViewId};
use crate::window::{Window, WindowId};
use cgmath::{Point2, Vector2};
use core::fmt;
use crossbeam::channel::{self, Receiver, Sender};
use log::{trace, warn};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A per-frame callback registered on a view.
pub struct UpdateHook(pub(crate) Arc<Mutex<dyn FnMut(&mut ViewCx<'_>) + Send>>);

impl Clone for UpdateHook {
    fn clone(&self) -> Self {
        UpdateHook(Arc::clone(&self.0))
    }
}

impl UpdateHook {
    pub fn new<F: 'static + FnMut(&mut ViewCx<'_>) + Send>(hook: F) -> Self {
        UpdateHook(Arc::new(Mutex::new(hook)))
    }
}

impl fmt::Debug for UpdateHook {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UpdateHook")
    }
}

/// A node in the view tree.
pub(crate) struct ViewNode {
    /// The view behavior. Checked out while one of its hooks runs.
    pub view: Option<Box<dyn View>>,
    pub name: String,
    /// The immediate superview.
    pub superview: Option<ViewId>,
    /// Subviews, back to front.
    pub subviews: Vec<ViewId>,
    /// The window this view’s root is attached to.
    pub window: Option<WindowId>,
    /// Bounds in superview coordinates.
    pub bounds: Rect,
    pub scale: Vector2<f64>,
    pub is_visible: bool,
    pub background_color: Color,
    pub tint_color: Color,
    pub intercepts_interactions: bool,
    pub children_intercept_interactions: bool,
    pub clips_to_bounds: bool,
    pub can_become_direct_focus: bool,
    pub preferred_focus: Option<ViewId>,
    pub next_focus: Option<ViewId>,
    pub previous_focus: Option<ViewId>,
    /// The direct subview currently under the pointer.
    pub subview_with_mouse: Option<ViewId>,
    pub renders_to_texture: bool,
    pub caches_render: bool,
    pub render_cache: RenderCache,
    /// View-to-clip-space transform of the last render.
    pub render_transformation: Transform,
    pub update_hooks: BTreeMap<String, UpdateHook>,
    /// Listeners declared on this view; live only while attached to a window.
    pub listeners: Vec<ListenerSpec>,
}

impl ViewNode {
    fn new(view: Box<dyn View>) -> ViewNode {
        ViewNode {
            name: (*view).type_name().to_string(),
            view: Some(view),
            superview: None,
            subviews: Vec::new(),
            window: None,
            bounds: Rect::zero(),
            scale: Vector2::new(1., 1.),
            is_visible: true,
            background_color: Color::TRANSPARENT,
            tint_color: Color::WHITE,
            intercepts_interactions: true,
            children_intercept_interactions: true,
            clips_to_bounds: true,
            can_become_direct_focus: false,
            preferred_focus: None,
            next_focus: None,
            previous_focus: None,
            subview_with_mouse: None,
            renders_to_texture: false,
            caches_render: false,
            render_cache: RenderCache::new(),
            render_transformation: Transform::identity(),
            update_hooks: BTreeMap::new(),
            listeners: Vec::new(),
        }
    }
}

impl fmt::Debug for ViewNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ViewNode")
            .field("name", &self.name)
            .field("superview", &self.superview)
            .field("subviews", &self.subviews)
            .field("window", &self.window)
            .field("bounds", &self.bounds)
            .field("is_visible", &self.is_visible)
            .field("next_focus", &self.next_focus)
            .field("previous_focus", &self.previous_focus)
            .field("render_cache", &self.render_cache)
            .field("update_hooks", &self.update_hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub(crate) struct WindowSlot {
    pub window: Box<dyn Window>,
    pub content: Option<ViewId>,
}

/// A tree of views; owns every view and routes lifecycle, input, focus and rendering through
/// them.
///
/// Views are addressed by [`ViewId`]. Operations on unknown or detached views are no-ops that
/// return neutral values.
pub struct ViewTree {
    pub(crate) nodes: HashMap<ViewId, ViewNode>,
    pub(crate) windows: HashMap<WindowId, WindowSlot>,
    pub(crate) application: Application,
    invalidation_send: Sender<ViewId>,
    invalidation_recv: Receiver<ViewId>,
    pub(crate) released_framebuffers: Vec<Framebuffer>,
}

impl fmt::Debug for ViewTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ViewTree")
            .field("nodes", &self.nodes)
            .field("windows", &self.windows.keys().collect::<Vec<_>>())
            .field("application", &self.application)
            .finish()
    }
}

impl Default for ViewTree {
    fn default() -> Self {
        ViewTree::new()
    }
}

impl ViewTree {
    pub fn new() -> ViewTree {
        let (invalidation_send, invalidation_recv) = channel::unbounded();
        ViewTree {
            nodes: HashMap::new(),
            windows: HashMap::new(),
            application: Application::new(),
            invalidation_send,
            invalidation_recv,
            released_framebuffers: Vec::new(),
        }
    }

    /// Adds a detached view to the tree.
    pub fn create_view<V: View>(&mut self, view: V) -> ViewId {
        self.insert_view(Box::new(view))
    }

    /// Adds a detached, boxed view to the tree.
    pub fn insert_view(&mut self, view: Box<dyn View>) -> ViewId {
        let id = ViewId::new();
        self.nodes.insert(id, ViewNode::new(view));
        trace!("created view {:?}", id);
        id
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrows the view behavior, if it has type `T` and isn’t running a hook.
    pub fn view<T: View>(&self, id: ViewId) -> Option<&T> {
        self.nodes
            .get(&id)?
            .view
            .as_deref()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn view_mut<T: View>(&mut self, id: ViewId) -> Option<&mut T> {
        self.nodes
            .get_mut(&id)?
            .view
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    pub(crate) fn node(&self, id: ViewId) -> Option<&ViewNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: ViewId) -> Option<&mut ViewNode> {
        self.nodes.get_mut(&id)
    }

    /// Runs `f` with the view checked out of its node.
    ///
    /// Returns `None` if the view doesn’t exist or is already running a hook.
    pub(crate) fn with_view<R, F>(&mut self, id: ViewId, f: F) -> Option<R>
    where
        F: FnOnce(&mut dyn View, &mut ViewCx<'_>) -> R,
    {
        let mut view = match self.nodes.get_mut(&id) {
            Some(node) => match node.view.take() {
                Some(view) => view,
                None => {
                    trace!("{:?} is running a hook; nested hook skipped", id);
                    return None;
                }
            },
            None => return None,
        };

        let ret = f(&mut *view, &mut ViewCx::new(self, id));

        // the view may have been destroyed by its own hook
        if let Some(node) = self.nodes.get_mut(&id) {
            node.view = Some(view);
        }
        Some(ret)
    }

    /// Runs the view’s `layout` hook.
    pub fn layout(&mut self, id: ViewId) {
        self.with_view(id, |view, cx| view.layout(cx));
    }

    // ---------------------------------------------------------------------------------------------
    // properties

    pub fn name(&self, id: ViewId) -> &str {
        self.node(id).map_or("", |node| &node.name)
    }

    pub fn set_name(&mut self, id: ViewId, name: impl Into<String>) {
        if let Some(node) = self.node_mut(id) {
            node.name = name.into();
        }
    }

    pub fn superview(&self, id: ViewId) -> Option<ViewId> {
        self.node(id)?.superview
    }

    /// Subviews, back to front.
    pub fn subviews(&self, id: ViewId) -> &[ViewId] {
        self.node(id).map_or(&[], |node| &node.subviews)
    }

    /// The window the view is attached to.
    pub fn window(&self, id: ViewId) -> Option<WindowId> {
        self.node(id)?.window
    }

    pub fn bounds(&self, id: ViewId) -> Rect {
        self.node(id).map_or(Rect::zero(), |node| node.bounds)
    }

    pub fn scale(&self, id: ViewId) -> Vector2<f64> {
        self.node(id).map_or(Vector2::new(1., 1.), |node| node.scale)
    }

    pub fn is_visible(&self, id: ViewId) -> bool {
        self.node(id).map_or(false, |node| node.is_visible)
    }

    pub fn tint_color(&self, id: ViewId) -> Color {
        self.node(id).map_or(Color::WHITE, |node| node.tint_color)
    }

    pub fn background_color(&self, id: ViewId) -> Color {
        self.node(id).map_or(Color::TRANSPARENT, |node| node.background_color)
    }

    pub fn intercepts_interactions(&self, id: ViewId) -> bool {
        self.node(id).map_or(false, |node| node.intercepts_interactions)
    }

    pub fn children_intercept_interactions(&self, id: ViewId) -> bool {
        self.node(id)
            .map_or(false, |node| node.children_intercept_interactions)
    }

    pub fn clips_to_bounds(&self, id: ViewId) -> bool {
        self.node(id).map_or(true, |node| node.clips_to_bounds)
    }

    pub fn renders_to_texture(&self, id: ViewId) -> bool {
        self.node(id).map_or(false, |node| node.renders_to_texture)
    }

    pub fn caches_render(&self, id: ViewId) -> bool {
        self.node(id).map_or(false, |node| node.caches_render)
    }

    /// Whether the view may handle events itself.
    pub fn set_intercepts_interactions(&mut self, id: ViewId, intercepts: bool) {
        if let Some(node) = self.node_mut(id) {
            node.intercepts_interactions = intercepts;
        }
    }

    /// Whether subviews get the first chance at events.
    pub fn set_children_intercept_interactions(&mut self, id: ViewId, intercept: bool) {
        if let Some(node) = self.node_mut(id) {
            node.children_intercept_interactions = intercept;
        }
    }

    pub fn set_clips_to_bounds(&mut self, id: ViewId, clips: bool) {
        if let Some(node) = self.node_mut(id) {
            if node.clips_to_bounds == clips {
                return;
            }
            node.clips_to_bounds = clips;
        }
        self.invalidate_render_cache(id);
    }

    /// Scales the area the view renders into. Does not affect its coordinate space.
    pub fn set_scale(&mut self, id: ViewId, x: f64, y: f64) {
        match self.node_mut(id) {
            Some(node) if node.scale != Vector2::new(x, y) => node.scale = Vector2::new(x, y),
            _ => return,
        }
        self.invalidate_render_cache(id);
    }

    /// Multiplies the view’s composited texture. Anything but white forces texture rendering.
    pub fn set_tint_color(&mut self, id: ViewId, color: Color) {
        match self.node_mut(id) {
            Some(node) if node.tint_color != color => node.tint_color = color,
            _ => return,
        }
        self.invalidate_superview_render_cache(id);
    }

    pub fn set_background_color(&mut self, id: ViewId, color: Color) {
        match self.node_mut(id) {
            Some(node) if node.background_color != color => node.background_color = color,
            _ => return,
        }
        self.invalidate_render_cache(id);
    }

    /// Forces the view to render through an offscreen texture.
    pub fn set_renders_to_texture(&mut self, id: ViewId, renders_to_texture: bool) {
        match self.node_mut(id) {
            Some(node) if node.renders_to_texture != renders_to_texture => {
                node.renders_to_texture = renders_to_texture
            }
            _ => return,
        }
        self.invalidate_render_cache(id);
    }

    /// Keeps the view’s rendered pixels across frames until invalidated.
    pub fn set_caches_render(&mut self, id: ViewId, caches_render: bool) {
        match self.node_mut(id) {
            Some(node) if node.caches_render != caches_render => {
                node.caches_render = caches_render
            }
            _ => return,
        }
        self.invalidate_render_cache(id);
    }

    /// Sets the bounds in superview coordinates.
    ///
    /// Resizing runs `layout` and invalidates the view’s own cache.
    pub fn set_bounds(&mut self, id: ViewId, bounds: Rect) {
        let (will_move, will_resize) = match self.node_mut(id) {
            Some(node) => {
                let will_move = node.bounds.origin != bounds.origin;
                let will_resize = node.bounds.size != bounds.size;
                node.bounds = bounds;
                (will_move, will_resize)
            }
            None => return,
        };

        if !will_move && !will_resize {
            return;
        }

        if will_resize {
            self.layout(id);
            self.invalidate_render_cache(id);
        }

        self.invalidate_superview_render_cache(id);
    }

    /// Sets the bounds as fractions of the superview’s size. No-op without a superview.
    pub fn set_bounds_relative(&mut self, id: ViewId, x: f64, y: f64, width: f64, height: f64) {
        if let Some(superview) = self.superview(id) {
            let size = self.bounds(superview).size;
            self.set_bounds(
                id,
                Rect::from_xywh(x * size.x, y * size.y, width * size.x, height * size.y),
            );
        }
    }

    // ---------------------------------------------------------------------------------------------
    // relations

    /// Iterates over the view’s ancestors, closest first.
    pub fn ancestors(&self, id: ViewId) -> impl Iterator<Item = ViewId> + '_ {
        let mut current = self.superview(id);
        std::iter::from_fn(move || {
            let ret = current?;
            current = self.superview(ret);
            Some(ret)
        })
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor_of(&self, ancestor: ViewId, id: ViewId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Whether `id` is a strict descendant of `ancestor`.
    pub fn is_descendant_of(&self, id: ViewId, ancestor: ViewId) -> bool {
        self.is_ancestor_of(ancestor, id)
    }

    pub fn is_sibling_of(&self, a: ViewId, b: ViewId) -> bool {
        a != b && self.superview(a).is_some() && self.superview(a) == self.superview(b)
    }

    /// The topmost ancestor, or the view itself.
    pub fn root(&self, id: ViewId) -> ViewId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// The closest view that is `a` or an ancestor of it, and `b` or an ancestor of it.
    pub fn common_ancestor(&self, a: ViewId, b: ViewId) -> Option<ViewId> {
        std::iter::once(a)
            .chain(self.ancestors(a))
            .find(|&candidate| candidate == b || self.is_ancestor_of(candidate, b))
    }

    /// Moves the view to the top of its siblings.
    pub fn bring_to_front(&mut self, id: ViewId) {
        self.reorder(id, true);
    }

    /// Moves the view to the bottom of its siblings.
    pub fn send_to_back(&mut self, id: ViewId) {
        self.reorder(id, false);
    }

    fn reorder(&mut self, id: ViewId, to_front: bool) {
        let superview = match self.superview(id) {
            Some(superview) => superview,
            None => return,
        };
        if let Some(node) = self.node_mut(superview) {
            node.subviews.retain(|&s| s != id);
            if to_front {
                node.subviews.push(id);
            } else {
                node.subviews.insert(0, id);
            }
        }
        if self.is_visible(id) {
            self.invalidate_render_cache(superview);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // tree mutation

    /// Adds `view` as the frontmost subview of `parent`, moving it from its current superview if
    /// it has one.
    ///
    /// If the view becomes visible in an open window, `will_appear` is dispatched before it is
    /// attached and `appeared` after, both top-down through its visible subtree.
    pub fn add_subview(&mut self, parent: ViewId, view: ViewId) {
        debug_assert!(parent != view, "cannot add a view to itself");
        debug_assert!(
            !self.is_ancestor_of(view, parent),
            "cannot add an ancestor as a subview"
        );
        if parent == view || self.is_ancestor_of(view, parent) {
            warn!("refusing to add {:?} under {:?}: would form a cycle", view, parent);
            return;
        }
        if !self.contains(parent) || !self.contains(view) {
            return;
        }
        debug_assert!(
            self.content_window(view).is_none(),
            "cannot add a window’s content view as a subview"
        );
        if let Some(window) = self.content_window(view) {
            warn!("refusing to add {:?}: it is the content view of {:?}", view, window);
            return;
        }

        if let Some(superview) = self.superview(view) {
            self.remove_subview(superview, view);
        }

        let is_appearing = !self.is_visible_in_open_window(view)
            && self.is_visible(view)
            && self.is_visible_in_open_window(parent);

        if is_appearing {
            self.dispatch_future_visibility_change(view, true);
        }

        if let Some(node) = self.node_mut(parent) {
            node.subviews.push(view);
        }
        if let Some(node) = self.node_mut(view) {
            node.superview = Some(parent);
        }

        debug_assert!(self.window(view).is_none());
        if let Some(window) = self.window(parent) {
            if self.window_is_open(window) {
                self.dispatch_window_change(view, Some(window));
            }
        }

        if is_appearing {
            self.dispatch_visibility_change(view, true);
        }

        self.invalidate_render_cache(parent);
    }

    /// Hides the view, then adds it.
    pub fn add_hidden_subview(&mut self, parent: ViewId, view: ViewId) {
        self.hide(view);
        self.add_subview(parent, view);
    }

    /// Detaches `view` from `parent`. The view stays in the tree and can be added again.
    ///
    /// Focus inside the view moves to the closest ancestor that can take it, and the view’s
    /// subtree gets `will_disappear`/`disappeared` around the detach if it was visible.
    pub fn remove_subview(&mut self, parent: ViewId, view: ViewId) {
        debug_assert!(parent != view, "a view is never its own subview");
        if self.superview(view) != Some(parent) {
            warn!("{:?} is not a subview of {:?}", view, parent);
            return;
        }

        if self.is_focus(view) {
            self.focus_ancestor(view);
        }

        let is_disappearing = self.is_visible_in_open_window(view);

        if is_disappearing {
            self.dispatch_future_visibility_change(view, false);
        }

        if let Some(node) = self.node_mut(parent) {
            if node.subview_with_mouse == Some(view) {
                node.subview_with_mouse = None;
            }
            node.subviews.retain(|&s| s != view);
        }
        if let Some(node) = self.node_mut(view) {
            node.superview = None;
        }

        if self.window(view).is_some() {
            self.dispatch_window_change(view, None);
        }

        if is_disappearing {
            self.dispatch_visibility_change(view, false);
        }

        self.invalidate_render_cache(parent);
    }

    /// Removes all subviews, front first.
    pub fn remove_subviews(&mut self, parent: ViewId) {
        while let Some(&first) = self.subviews(parent).first() {
            self.remove_subview(parent, first);
        }
    }

    /// Destroys a view and its whole subtree.
    ///
    /// Every relation pointing at a destroyed view is cleared: its focus-ring neighbours are
    /// linked to each other, it leaves its superview and window, and preferred-focus links to it
    /// are dropped.
    pub fn destroy(&mut self, id: ViewId) {
        if !self.contains(id) {
            return;
        }
        trace!("destroying {:?}", id);

        self.application.remove_listeners(id);
        self.remove_from_focus_chain(id);

        for subview in self.subviews(id).to_vec() {
            self.destroy(subview);
        }

        if let Some(superview) = self.superview(id) {
            self.remove_subview(superview, id);
        }

        if let Some(window) = self.content_window(id) {
            self.detach_content_view(window);
        }

        for node in self.nodes.values_mut() {
            if node.preferred_focus == Some(id) {
                node.preferred_focus = None;
            }
            if node.subview_with_mouse == Some(id) {
                node.subview_with_mouse = None;
            }
        }

        if let Some(mut node) = self.nodes.remove(&id) {
            if let Some(framebuffer) = node.render_cache.take_framebuffer() {
                self.released_framebuffers.push(framebuffer);
            }
        }
    }

    // ---------------------------------------------------------------------------------------------
    // visibility

    pub fn show(&mut self, id: ViewId) {
        self.set_visible(id, true);
    }

    pub fn hide(&mut self, id: ViewId) {
        self.set_visible(id, false);
    }

    /// Shows or hides the view, notifying its subtree if that changes what’s on screen.
    pub fn set_visible(&mut self, id: ViewId, visible: bool) {
        if !self.contains(id) || self.is_visible(id) == visible {
            return;
        }

        let superview = self.superview(id);
        let is_shown_in_window = match superview {
            Some(superview) => self.is_visible_in_open_window(superview),
            None => self.window(id).map_or(false, |w| self.window_is_open(w)),
        };

        if is_shown_in_window {
            self.dispatch_future_visibility_change(id, visible);
        }

        if let Some(node) = self.node_mut(id) {
            node.is_visible = visible;
        }

        if is_shown_in_window {
            self.dispatch_visibility_change(id, visible);
        }

        if let Some(superview) = superview {
            self.invalidate_render_cache(superview);
        }
    }

    pub fn ancestors_are_visible(&self, id: ViewId) -> bool {
        self.ancestors(id).all(|a| self.is_visible(a))
    }

    /// Visible, with all ancestors visible, and attached to an open window.
    pub fn is_visible_in_open_window(&self, id: ViewId) -> bool {
        self.is_visible(id)
            && self.ancestors_are_visible(id)
            && self.window(id).map_or(false, |w| self.window_is_open(w))
    }

    pub(crate) fn dispatch_future_visibility_change(&mut self, id: ViewId, visible: bool) {
        trace!("{:?} will {}", id, if visible { "appear" } else { "disappear" });
        self.with_view(id, |view, cx| {
            if visible {
                view.will_appear(cx)
            } else {
                view.will_disappear(cx)
            }
        });

        for subview in self.subviews(id).to_vec() {
            if self.is_visible(subview) {
                self.dispatch_future_visibility_change(subview, visible);
            }
        }
    }

    pub(crate) fn dispatch_visibility_change(&mut self, id: ViewId, visible: bool) {
        if !visible && self.is_focus(id) {
            self.focus_ancestor(id);
        }

        trace!("{:?} {}", id, if visible { "appeared" } else { "disappeared" });
        self.with_view(id, |view, cx| {
            if visible {
                view.appeared(cx)
            } else {
                view.disappeared(cx)
            }
        });

        for subview in self.subviews(id).to_vec() {
            if self.is_visible(subview) {
                self.dispatch_visibility_change(subview, visible);
            }
        }

        self.check_update_subscription(id);
    }

    pub(crate) fn dispatch_window_change(&mut self, id: ViewId, window: Option<WindowId>) {
        self.application.remove_listeners(id);

        let previous = match self.node(id) {
            Some(node) => node.window,
            None => return,
        };
        if let Some(previous) = previous {
            if let Some(previous) = self.window_mut(previous) {
                previous.end_dragging(id);
                previous.unsubscribe_from_updates(id);
            }
        }

        debug_assert!(previous != window, "window change to the same window");
        let listeners = match self.node_mut(id) {
            Some(node) => {
                node.window = window;
                node.listeners.clone()
            }
            None => return,
        };

        if window.is_some() {
            for spec in listeners {
                self.application.add_listener(id, spec);
            }
        }

        trace!("{:?} moved to window {:?}", id, window);
        self.with_view(id, |view, cx| view.window_changed(cx));

        for subview in self.subviews(id).to_vec() {
            // subviews added by window_changed already know their window
            if self.window(subview) == window {
                continue;
            }
            self.dispatch_window_change(subview, window);
        }

        self.check_update_subscription(id);
    }

    // ---------------------------------------------------------------------------------------------
    // windows

    /// Registers a window. Its content view is set separately.
    pub fn add_window(&mut self, window: Box<dyn Window>) -> WindowId {
        let id = WindowId::new();
        self.windows.insert(
            id,
            WindowSlot {
                window,
                content: None,
            },
        );
        id
    }

    /// Unregisters a window, detaching its content view first.
    pub fn remove_window(&mut self, id: WindowId) -> Option<Box<dyn Window>> {
        self.detach_content_view(id);
        self.windows.remove(&id).map(|slot| slot.window)
    }

    pub fn window_ref(&self, id: WindowId) -> Option<&(dyn Window + 'static)> {
        self.windows.get(&id).map(|slot| &*slot.window)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut (dyn Window + 'static)> {
        self.windows.get_mut(&id).map(|slot| &mut *slot.window)
    }

    /// Borrows a window as its concrete type.
    pub fn window_as<W: Window>(&self, id: WindowId) -> Option<&W> {
        let window: &dyn Window = self.window_ref(id)?;
        window.as_any().downcast_ref::<W>()
    }

    pub fn window_as_mut<W: Window>(&mut self, id: WindowId) -> Option<&mut W> {
        let window: &mut dyn Window = self.window_mut(id)?;
        window.as_any_mut().downcast_mut::<W>()
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    pub(crate) fn window_is_open(&self, id: WindowId) -> bool {
        self.window_ref(id).map_or(false, |w| w.is_open())
    }

    /// The root view filling the window.
    pub fn content_view(&self, window: WindowId) -> Option<ViewId> {
        self.windows.get(&window)?.content
    }

    /// The window whose content view is `id`, if any.
    pub fn content_window(&self, id: ViewId) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|(_, slot)| slot.content == Some(id))
            .map(|(&window, _)| window)
    }

    /// Makes a root view the window’s content, replacing the previous one.
    ///
    /// If the window is open, the view is attached right away.
    pub fn set_content_view(&mut self, window: WindowId, view: ViewId) -> Result<()> {
        if !self.windows.contains_key(&window) {
            return Err(Error::UnknownWindow(window));
        }
        if !self.contains(view) {
            return Err(Error::UnknownView(view));
        }
        if self.content_view(window) == Some(view) {
            return Ok(());
        }
        if let Some(superview) = self.superview(view) {
            self.remove_subview(superview, view);
        }
        if let Some(other) = self.content_window(view) {
            self.detach_content_view(other);
        }
        self.detach_content_view(window);

        if let Some(slot) = self.windows.get_mut(&window) {
            slot.content = Some(view);
        }
        if self.window_is_open(window) {
            self.attach_content_view(window);
        }
        Ok(())
    }

    /// Tells the tree that the window has opened; attaches its content view.
    pub fn window_opened(&mut self, window: WindowId) {
        self.attach_content_view(window);
    }

    /// Tells the tree that the window is about to close; detaches its content view.
    pub fn window_closing(&mut self, window: WindowId) {
        if let Some(content) = self.content_view(window) {
            if self.window(content) == Some(window) {
                self.detach_view_from_window(content);
            }
        }
    }

    fn attach_content_view(&mut self, window: WindowId) {
        let content = match self.content_view(window) {
            Some(content) => content,
            None => return,
        };
        if self.window(content) == Some(window) || !self.window_is_open(window) {
            return;
        }

        let is_appearing = self.is_visible(content);
        if is_appearing {
            self.dispatch_future_visibility_change(content, true);
        }
        self.dispatch_window_change(content, Some(window));
        if is_appearing {
            self.dispatch_visibility_change(content, true);
        }
    }

    fn detach_content_view(&mut self, window: WindowId) {
        let content = match self.windows.get(&window).and_then(|slot| slot.content) {
            Some(content) => content,
            None => return,
        };
        if self.window(content) == Some(window) {
            self.detach_view_from_window(content);
        }
        if let Some(slot) = self.windows.get_mut(&window) {
            slot.content = None;
        }
    }

    fn detach_view_from_window(&mut self, content: ViewId) {
        if self.is_focus(content) {
            self.unfocus(content);
        }

        let is_disappearing = self.is_visible_in_open_window(content);
        if is_disappearing {
            self.dispatch_future_visibility_change(content, false);
        }
        self.dispatch_window_change(content, None);
        if is_disappearing {
            self.dispatch_visibility_change(content, false);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // coordinates

    pub fn local_to_superview(&self, id: ViewId, point: Point2<f64>) -> Point2<f64> {
        let origin = self.bounds(id).origin;
        Point2::new(point.x + origin.x, point.y + origin.y)
    }

    pub fn superview_to_local(&self, id: ViewId, point: Point2<f64>) -> Point2<f64> {
        let origin = self.bounds(id).origin;
        Point2::new(point.x - origin.x, point.y - origin.y)
    }

    /// Converts a local point into the coordinate space of `ancestor`, or of the root if `None`.
    ///
    /// `ancestor` must be a strict ancestor of the view.
    pub fn local_to_ancestor(
        &self,
        id: ViewId,
        point: Point2<f64>,
        ancestor: Option<ViewId>,
    ) -> Point2<f64> {
        if let Some(ancestor) = ancestor {
            debug_assert!(
                self.is_ancestor_of(ancestor, id),
                "local_to_ancestor: {:?} is not an ancestor of {:?}",
                ancestor,
                id
            );
            if !self.is_ancestor_of(ancestor, id) {
                warn!("{:?} is not an ancestor of {:?}", ancestor, id);
                return point;
            }
        }

        let mut point = point;
        let mut view = id;
        loop {
            point = self.local_to_superview(view, point);
            match self.superview(view) {
                Some(superview) if Some(superview) != ancestor => view = superview,
                _ => return point,
            }
        }
    }

    /// Converts a local point into window coordinates, which are those of the root view.
    pub fn local_to_window(&self, id: ViewId, point: Point2<f64>) -> Point2<f64> {
        self.local_to_ancestor(id, point, None)
    }

    pub fn window_to_local(&self, id: ViewId, point: Point2<f64>) -> Point2<f64> {
        let origin = self.local_to_window(id, Point2::new(0., 0.));
        Point2::new(point.x - origin.x, point.y - origin.y)
    }

    /// The view’s bounds in window coordinates.
    pub fn window_bounds(&self, id: ViewId) -> Rect {
        let size = self.bounds(id).size;
        let min = self.local_to_window(id, Point2::new(0., 0.));
        let max = self.local_to_window(id, Point2::new(size.x, size.y));
        Rect::from_corners(min, max)
    }

    // ---------------------------------------------------------------------------------------------
    // render cache

    /// Marks the view’s render cache stale, and that of every ancestor compositing it.
    ///
    /// The cached pixels stay until the view itself is rendered again.
    pub fn invalidate_render_cache(&mut self, id: ViewId) {
        let mut current = Some(id);
        while let Some(view) = current {
            current = match self.node_mut(view) {
                Some(node) => {
                    node.render_cache.invalidate();
                    node.superview
                }
                None => None,
            };
        }
    }

    fn invalidate_superview_render_cache(&mut self, id: ViewId) {
        if self.is_visible(id) {
            if let Some(superview) = self.superview(id) {
                self.invalidate_render_cache(superview);
            }
        }
    }

    /// Whether the view’s cached render is current.
    pub fn has_cached_render(&self, id: ViewId) -> bool {
        self.node(id).map_or(false, |node| node.render_cache.is_valid())
    }

    /// The texture holding the view’s last texture-based render.
    pub fn render_texture(&self, id: ViewId) -> Option<Texture> {
        self.node(id)?.render_cache.texture()
    }

    /// A sender that invalidates views’ render caches from any thread.
    ///
    /// Invalidations are applied by [`process_invalidations`](Self::process_invalidations).
    pub fn invalidation_sender(&self) -> Sender<ViewId> {
        self.invalidation_send.clone()
    }

    /// Applies invalidations queued through the invalidation sender.
    pub fn process_invalidations(&mut self) -> usize {
        let queued: Vec<_> = self.invalidation_recv.try_iter().collect();
        for &id in &queued {
            self.invalidate_render_cache(id);
        }
        queued.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{recorder, Recorder, RecordingView, TestWindow};

    fn open_tree() -> (ViewTree, WindowId, ViewId, Recorder) {
        let log = recorder();
        let mut tree = ViewTree::new();
        let window = tree.add_window(Box::new(TestWindow::open()));
        let root = tree.create_view(RecordingView::new("root", &log));
        tree.set_bounds(root, Rect::from_xywh(0., 0., 800., 600.));
        tree.set_content_view(window, root).unwrap();
        log.lock().clear();
        (tree, window, root, log)
    }

    fn assert_integrity(tree: &ViewTree) {
        for (&id, node) in &tree.nodes {
            if let Some(superview) = node.superview {
                let count = tree.subviews(superview).iter().filter(|&&s| s == id).count();
                assert_eq!(count, 1, "{:?} should appear exactly once in its superview", id);
            }
            assert!(!tree.is_ancestor_of(id, id), "{:?} is its own ancestor", id);
            for &subview in &node.subviews {
                assert_eq!(tree.superview(subview), Some(id));
            }
        }
    }

    #[test]
    fn add_and_remove_keep_the_tree_consistent() {
        let mut tree = ViewTree::new();
        let a = tree.create_view(());
        let b = tree.create_view(());
        let c = tree.create_view(());

        tree.add_subview(a, b);
        tree.add_subview(b, c);
        assert_integrity(&tree);
        assert!(tree.is_ancestor_of(a, c));
        assert!(tree.is_descendant_of(c, a));
        assert_eq!(tree.root(c), a);

        // moving c directly under a detaches it from b
        tree.add_subview(a, c);
        assert_eq!(tree.subviews(b), &[] as &[ViewId]);
        assert_eq!(tree.subviews(a), &[b, c]);
        assert!(tree.is_sibling_of(b, c));
        assert_integrity(&tree);

        tree.remove_subview(a, b);
        assert_eq!(tree.superview(b), None);
        assert_eq!(tree.subviews(a), &[c]);
        assert_integrity(&tree);
    }

    #[test]
    fn cycles_are_refused() {
        let mut tree = ViewTree::new();
        let a = tree.create_view(());
        let b = tree.create_view(());
        tree.add_subview(a, b);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tree.add_subview(b, a);
        }));
        if cfg!(debug_assertions) {
            assert!(result.is_err(), "adding an ancestor should assert in debug builds");
        }
        assert_eq!(tree.superview(a), None);
        assert_eq!(tree.subviews(b), &[] as &[ViewId]);
    }

    #[test]
    fn converting_to_a_non_ancestor_is_refused() {
        let mut tree = ViewTree::new();
        let root = tree.create_view(());
        let a = tree.create_view(());
        let stranger = tree.create_view(());
        tree.set_bounds(a, Rect::from_xywh(10., 20., 30., 30.));
        tree.add_subview(root, a);

        let p = Point2::new(1., 2.);
        assert_eq!(tree.local_to_ancestor(a, p, Some(root)), Point2::new(11., 22.));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tree.local_to_ancestor(a, p, Some(stranger))
        }));
        if cfg!(debug_assertions) {
            assert!(result.is_err(), "a non-ancestor should assert in debug builds");
        } else {
            assert_eq!(result.ok(), Some(p), "the point comes back unchanged");
        }
    }

    #[test]
    fn content_views_cannot_become_subviews() {
        let mut tree = ViewTree::new();
        let window = tree.add_window(Box::new(TestWindow::open()));
        let content = tree.create_view(());
        let other = tree.create_view(());
        tree.set_content_view(window, content).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tree.add_subview(other, content);
        }));
        if cfg!(debug_assertions) {
            assert!(result.is_err(), "adding a content view should assert in debug builds");
        }
        assert_eq!(tree.superview(content), None);
        assert_eq!(tree.subviews(other), &[] as &[ViewId]);
        assert_eq!(tree.content_view(window), Some(content));
    }

    #[test]
    fn reordering_siblings() {
        let mut tree = ViewTree::new();
        let parent = tree.create_view(());
        let a = tree.create_view(());
        let b = tree.create_view(());
        let c = tree.create_view(());
        for &v in &[a, b, c] {
            tree.add_subview(parent, v);
        }
        tree.bring_to_front(a);
        assert_eq!(tree.subviews(parent), &[b, c, a]);
        tree.send_to_back(c);
        assert_eq!(tree.subviews(parent), &[c, b, a]);
    }

    #[test]
    fn appearing_subtree_is_notified_in_two_phases_pre_order() {
        let (mut tree, _, root, log) = open_tree();
        let parent = tree.create_view(RecordingView::new("parent", &log));
        let child = tree.create_view(RecordingView::new("child", &log));
        let grandchild = tree.create_view(RecordingView::new("grandchild", &log));
        let hidden = tree.create_view(RecordingView::new("hidden", &log));
        tree.add_subview(parent, child);
        tree.add_subview(child, grandchild);
        tree.add_hidden_subview(parent, hidden);
        assert!(log.lock().is_empty(), "detached views get no notifications");

        tree.add_subview(root, parent);

        let events = log.lock().clone();
        let visibility: Vec<_> = events
            .iter()
            .filter(|e| e.contains("appear"))
            .cloned()
            .collect();
        assert_eq!(
            visibility,
            vec![
                "parent will_appear",
                "child will_appear",
                "grandchild will_appear",
                "parent appeared",
                "child appeared",
                "grandchild appeared",
            ]
        );
        let window_changes = events.iter().filter(|e| e.contains("window_changed")).count();
        assert_eq!(window_changes, 4, "every attached view learns its window, hidden or not");
        let last_will = events.iter().rposition(|e| e.ends_with("will_appear")).unwrap();
        let first_window = events.iter().position(|e| e.ends_with("window_changed")).unwrap();
        assert!(last_will < first_window, "future visibility precedes the attach");
        assert!(tree.is_visible_in_open_window(grandchild));
        assert!(!tree.is_visible_in_open_window(hidden));
    }

    #[test]
    fn removal_mirrors_attach() {
        let (mut tree, window, root, log) = open_tree();
        let parent = tree.create_view(RecordingView::new("parent", &log));
        let child = tree.create_view(RecordingView::new("child", &log));
        tree.add_subview(parent, child);
        tree.add_subview(root, parent);
        log.lock().clear();

        tree.remove_subview(root, parent);

        assert_eq!(
            *log.lock(),
            vec![
                "parent will_disappear",
                "child will_disappear",
                "parent window_changed",
                "child window_changed",
                "parent disappeared",
                "child disappeared",
            ]
        );
        assert_eq!(tree.window(child), None);
        assert!(tree.window_as::<TestWindow>(window).unwrap().subscribers.is_empty());
    }

    #[test]
    fn removing_an_invisible_view_skips_notifications() {
        let (mut tree, _, root, log) = open_tree();
        let view = tree.create_view(RecordingView::new("view", &log));
        tree.add_hidden_subview(root, view);
        log.lock().clear();

        tree.remove_subview(root, view);
        assert_eq!(*log.lock(), vec!["view window_changed"]);
    }

    #[test]
    fn hiding_and_showing_notifies_only_when_on_screen() {
        let (mut tree, _, root, log) = open_tree();
        let view = tree.create_view(RecordingView::new("view", &log));
        tree.add_subview(root, view);
        log.lock().clear();

        tree.hide(view);
        tree.show(view);
        assert_eq!(
            *log.lock(),
            vec![
                "view will_disappear",
                "view disappeared",
                "view will_appear",
                "view appeared",
            ]
        );

        let detached = tree.create_view(RecordingView::new("detached", &log));
        log.lock().clear();
        tree.hide(detached);
        tree.show(detached);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn closing_and_reopening_a_window() {
        let (mut tree, window, root, log) = open_tree();
        let view = tree.create_view(RecordingView::new("view", &log));
        tree.add_subview(root, view);
        log.lock().clear();

        tree.window_closing(window);
        tree.window_as_mut::<TestWindow>(window).unwrap().open = false;
        assert_eq!(tree.window(view), None);
        assert!(log.lock().contains(&"view disappeared".to_string()));

        log.lock().clear();
        tree.window_as_mut::<TestWindow>(window).unwrap().open = true;
        tree.window_opened(window);
        assert_eq!(tree.window(view), Some(window));
        assert!(log.lock().contains(&"view appeared".to_string()));
    }

    #[test]
    fn destroy_clears_every_relation() {
        let (mut tree, window, root, _) = open_tree();
        let a = tree.create_view(());
        let b = tree.create_view(());
        let c = tree.create_view(());
        let d = tree.create_view(());
        tree.add_subview(root, a);
        tree.add_subview(a, b);
        tree.add_subview(root, c);
        tree.link_focus_ring(&[a, c, d]);
        tree.set_preferred_focus(root, Some(a));

        tree.destroy(a);

        assert!(!tree.contains(a));
        assert!(!tree.contains(b), "subviews are destroyed with their superview");
        assert_eq!(tree.subviews(root), &[c]);
        assert_eq!(tree.next_focus(c), Some(d));
        assert_eq!(tree.previous_focus(c), Some(d));
        assert_eq!(tree.preferred_focus(root), None);
        assert_integrity(&tree);

        tree.destroy(root);
        assert_eq!(tree.content_view(window), None);
        assert!(!tree.contains(c));
    }

    #[test]
    fn coordinate_round_trip() {
        let mut tree = ViewTree::new();
        let root = tree.create_view(());
        let a = tree.create_view(());
        let b = tree.create_view(());
        tree.set_bounds(root, Rect::from_xywh(0., 0., 800., 600.));
        tree.set_bounds(a, Rect::from_xywh(100., 100., 200., 200.));
        tree.set_bounds(b, Rect::from_xywh(10.5, 10.25, 50., 50.));
        tree.add_subview(root, a);
        tree.add_subview(a, b);

        for &(x, y) in &[(0., 0.), (3.5, -7.25), (1e6, 42.)] {
            let p = Point2::new(x, y);
            let back = tree.superview_to_local(b, tree.local_to_superview(b, p));
            assert!((back.x - p.x).abs() < 1e-9 && (back.y - p.y).abs() < 1e-9);
        }

        let p = Point2::new(1., 2.);
        assert_eq!(tree.local_to_ancestor(b, p, Some(a)), Point2::new(11.5, 12.25));
        assert_eq!(tree.local_to_window(b, p), Point2::new(111.5, 112.25));
        assert_eq!(tree.window_to_local(b, Point2::new(111.5, 112.25)), p);
        assert_eq!(
            tree.window_bounds(b),
            Rect::from_xywh(110.5, 110.25, 50., 50.)
        );
    }

    #[test]
    fn relative_bounds_follow_the_superview() {
        let mut tree = ViewTree::new();
        let parent = tree.create_view(());
        let child = tree.create_view(());
        tree.set_bounds(parent, Rect::from_xywh(0., 0., 200., 100.));
        tree.set_bounds_relative(child, 0.5, 0.5, 0.5, 0.5);
        assert_eq!(tree.bounds(child), Rect::zero(), "no superview, no change");
        tree.add_subview(parent, child);
        tree.set_bounds_relative(child, 0.5, 0.5, 0.5, 0.5);
        assert_eq!(tree.bounds(child), Rect::from_xywh(100., 50., 100., 50.));
    }

    #[test]
    fn resizing_runs_layout() {
        let log = recorder();
        let mut tree = ViewTree::new();
        let view = tree.create_view(RecordingView::new("view", &log));
        tree.set_bounds(view, Rect::from_xywh(0., 0., 10., 10.));
        tree.set_bounds(view, Rect::from_xywh(5., 5., 10., 10.));
        tree.set_bounds(view, Rect::from_xywh(5., 5., 20., 10.));
        assert_eq!(*log.lock(), vec!["view layout", "view layout"]);
    }

    #[test]
    fn invalidation_walks_up_but_never_down() {
        let mut tree = ViewTree::new();
        let chain: Vec<_> = (0..4).map(|_| tree.create_view(())).collect();
        for pair in chain.windows(2) {
            tree.add_subview(pair[0], pair[1]);
        }
        for &v in &chain {
            tree.node_mut(v).unwrap().render_cache.mark_valid();
        }

        tree.invalidate_render_cache(chain[2]);

        assert!(!tree.has_cached_render(chain[0]));
        assert!(!tree.has_cached_render(chain[1]));
        assert!(!tree.has_cached_render(chain[2]));
        assert!(tree.has_cached_render(chain[3]), "descendants keep their cache");
    }

    #[test]
    fn relations() {
        let mut tree = ViewTree::new();
        let root = tree.create_view(());
        let a = tree.create_view(());
        let b = tree.create_view(());
        let c = tree.create_view(());
        let stray = tree.create_view(());
        tree.add_subview(root, a);
        tree.add_subview(root, b);
        tree.add_subview(a, c);

        use crate::app::Relation;
        assert!(tree.has_relation(root, Relation::Descendant, c));
        assert!(tree.has_relation(c, Relation::Ancestor, root));
        assert!(tree.has_relation(a, Relation::Sibling, b));
        assert!(!tree.has_relation(a, Relation::Sibling, a));
        assert!(tree.has_relation(c, Relation::Hierarchy, b));
        assert!(!tree.has_relation(c, Relation::Hierarchy, stray));
        assert!(tree.has_relation(c, Relation::Itself, c));
        assert_eq!(tree.common_ancestor(c, b), Some(root));
        assert_eq!(tree.common_ancestor(c, stray), None);
    }
}
