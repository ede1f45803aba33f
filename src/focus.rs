//! Focus: the focus ring, preferred focus, and directional focus movement.

use crate::events::{Direction, KeyCode, KeyModifiers};
use crate::rect::Rect;
use crate::tree::ViewTree;
use crate::view::ViewId;
use crate::window::WindowId;
use log::trace;

/// Which way a focus-ring walk goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Forward,
    Backward,
}

impl ViewTree {
    pub fn can_become_direct_focus(&self, id: ViewId) -> bool {
        self.node(id).map_or(false, |node| node.can_become_direct_focus)
    }

    /// Whether the view itself may hold focus, as opposed to only containing it.
    pub fn set_can_become_direct_focus(&mut self, id: ViewId, can_focus: bool) {
        if let Some(node) = self.node_mut(id) {
            node.can_become_direct_focus = can_focus;
        }
    }

    pub fn preferred_focus(&self, id: ViewId) -> Option<ViewId> {
        self.node(id)?.preferred_focus
    }

    /// Nominates a view to take focus on this view’s behalf.
    pub fn set_preferred_focus(&mut self, id: ViewId, preferred: Option<ViewId>) {
        if let Some(node) = self.node_mut(id) {
            node.preferred_focus = preferred;
        }
    }

    pub fn next_focus(&self, id: ViewId) -> Option<ViewId> {
        self.node(id)?.next_focus
    }

    pub fn previous_focus(&self, id: ViewId) -> Option<ViewId> {
        self.node(id)?.previous_focus
    }

    /// Links `next` after `id` in the focus ring.
    ///
    /// Links are kept symmetric: `next`’s previous link becomes `id`, and any view that pointed
    /// at either side is unlinked from it.
    pub fn set_next_focus(&mut self, id: ViewId, next: Option<ViewId>) {
        self.link_focus(id, next, Walk::Forward);
    }

    /// Links `previous` before `id` in the focus ring.
    pub fn set_previous_focus(&mut self, id: ViewId, previous: Option<ViewId>) {
        self.link_focus(id, previous, Walk::Backward);
    }

    /// Links the views into a closed ring, in order.
    pub fn link_focus_ring(&mut self, views: &[ViewId]) {
        for (i, &view) in views.iter().enumerate() {
            let next = views[(i + 1) % views.len()];
            self.set_next_focus(view, Some(next));
        }
    }

    fn link(&self, id: ViewId, walk: Walk) -> Option<ViewId> {
        match walk {
            Walk::Forward => self.next_focus(id),
            Walk::Backward => self.previous_focus(id),
        }
    }

    fn set_link(&mut self, id: ViewId, walk: Walk, to: Option<ViewId>) {
        if let Some(node) = self.node_mut(id) {
            match walk {
                Walk::Forward => node.next_focus = to,
                Walk::Backward => node.previous_focus = to,
            }
        }
    }

    fn link_focus(&mut self, id: ViewId, to: Option<ViewId>, walk: Walk) {
        let back = match walk {
            Walk::Forward => Walk::Backward,
            Walk::Backward => Walk::Forward,
        };
        if !self.contains(id) || to.map_or(false, |to| !self.contains(to)) {
            return;
        }
        let old = self.link(id, walk);
        if old == to {
            return;
        }
        if let Some(old) = old {
            if self.link(old, back) == Some(id) {
                self.set_link(old, back, None);
            }
        }
        self.set_link(id, walk, to);
        if let Some(to) = to {
            if let Some(stale) = self.link(to, back) {
                if self.link(stale, walk) == Some(to) {
                    self.set_link(stale, walk, None);
                }
            }
            self.set_link(to, back, Some(id));
        }
    }

    /// Takes the view out of the focus ring, linking its neighbours to each other.
    pub fn remove_from_focus_chain(&mut self, id: ViewId) {
        let (previous, next) = match self.node_mut(id) {
            Some(node) => (node.previous_focus.take(), node.next_focus.take()),
            None => return,
        };
        if let Some(previous) = previous.filter(|&p| p != id) {
            let next = next.filter(|&n| n != id && n != previous);
            self.set_link(previous, Walk::Forward, next);
        }
        if let Some(next) = next.filter(|&n| n != id) {
            let previous = previous.filter(|&p| p != id && p != next);
            self.set_link(next, Walk::Backward, previous);
        }
    }

    /// The next view in the ring that is visible and can take focus.
    ///
    /// Returns `None` if the walk comes back around to this view.
    pub fn next_available_focus(&self, id: ViewId) -> Option<ViewId> {
        self.available_focus(id, Walk::Forward)
    }

    pub fn previous_available_focus(&self, id: ViewId) -> Option<ViewId> {
        self.available_focus(id, Walk::Backward)
    }

    fn available_focus(&self, id: ViewId, walk: Walk) -> Option<ViewId> {
        let mut current = self.link(id, walk);
        // a ring that doesn’t pass through `id` would otherwise loop forever
        for _ in 0..self.len() {
            let view = current?;
            if view == id {
                return None;
            }
            if self.is_visible_in_open_window(view) && self.can_become_direct_focus(view) {
                return Some(view);
            }
            current = self.link(view, walk);
        }
        None
    }

    /// Whether the window’s focus is this view or one of its descendants.
    pub fn is_focus(&self, id: ViewId) -> bool {
        match self.focused_view_in(id) {
            Some(focus) => focus == id || self.is_descendant_of(focus, id),
            None => false,
        }
    }

    /// Whether this exact view has focus.
    pub fn is_direct_focus(&self, id: ViewId) -> bool {
        self.focused_view_in(id) == Some(id)
    }

    fn focused_view_in(&self, id: ViewId) -> Option<ViewId> {
        self.window_ref(self.window(id)?)?.focus()
    }

    /// The focused view of a window.
    pub fn focused_view(&self, window: WindowId) -> Option<ViewId> {
        self.window_ref(window)?.focus()
    }

    /// Makes the view its window’s focus. No-op if detached.
    pub fn focus(&mut self, id: ViewId) {
        let window = match self.window(id) {
            Some(window) => window,
            None => return,
        };
        let previous = match self.window_mut(window) {
            Some(w) => {
                let previous = w.focus();
                if previous == Some(id) {
                    return;
                }
                w.set_focus(Some(id));
                previous
            }
            None => return,
        };
        trace!("focus {:?} -> {:?}", previous, id);

        if let Some(previous) = previous {
            self.with_view(previous, |view, cx| view.focus_lost(cx));
        }
        self.with_view(id, |view, cx| view.focus_gained(cx));
    }

    /// Clears the window’s focus if it is in this view’s subtree.
    pub fn unfocus(&mut self, id: ViewId) {
        if !self.is_focus(id) {
            return;
        }
        let window = match self.window(id) {
            Some(window) => window,
            None => return,
        };
        let previous = match self.window_mut(window) {
            Some(w) => {
                let previous = w.focus();
                w.set_focus(None);
                previous
            }
            None => return,
        };
        trace!("unfocus {:?}", previous);
        if let Some(previous) = previous {
            self.with_view(previous, |view, cx| view.focus_lost(cx));
        }
    }

    /// The view that should receive focus when this view is asked to take it.
    ///
    /// Follows preferred-focus links and keeps the deepest view that is visible in an open window
    /// and can become direct focus.
    pub fn expected_focus(&self, id: ViewId) -> Option<ViewId> {
        let mut focus = None;
        let mut current = Some(id);
        for _ in 0..=self.len() {
            let view = match current {
                Some(view) => view,
                None => break,
            };
            if self.can_become_direct_focus(view) && self.is_visible_in_open_window(view) {
                focus = Some(view);
            }
            current = self.preferred_focus(view);
        }
        focus
    }

    /// Hands focus to the closest ancestor whose expected focus lies outside this view’s
    /// subtree, or clears focus if there is none.
    pub fn focus_ancestor(&mut self, id: ViewId) {
        let target = self.ancestors(id).find_map(|ancestor| {
            self.expected_focus(ancestor)
                .filter(|&focus| focus != id && !self.is_descendant_of(focus, id))
        });
        match target {
            Some(target) => self.focus(target),
            None => self.unfocus(id),
        }
    }

    pub(crate) fn default_key_down(
        &mut self,
        id: ViewId,
        key: KeyCode,
        modifiers: KeyModifiers,
        repeat: bool,
    ) {
        if key == KeyCode::Tab {
            if modifiers.shift && self.previous_focus(id).is_some() {
                if let Some(view) = self.previous_available_focus(id) {
                    self.focus(view);
                }
                return;
            } else if self.next_focus(id).is_some() {
                if let Some(view) = self.next_available_focus(id) {
                    self.focus(view);
                }
                return;
            }
        }

        if let (Some(direction), Some(window)) = (key.direction(), self.window(id)) {
            if self.move_focus(window, direction) {
                return;
            }
        }

        if let Some(superview) = self.superview(id) {
            self.with_view(superview, |view, cx| view.key_down(cx, key, modifiers, repeat));
        }
    }

    /// Regions of the window that focus could move to, excluding the current focus and its
    /// relatives.
    ///
    /// Each region is the visible part of a focusable view in window coordinates; views stacked
    /// above cut their bounds out of the ones below.
    pub fn focusable_regions(&self, window: WindowId) -> Vec<(ViewId, Rect)> {
        let mut regions = Vec::new();
        if let Some(content) = self.content_view(window) {
            let focus = self.focused_view(window);
            self.collect_focusable_regions(content, focus, &mut regions);
        }
        regions
    }

    fn collect_focusable_regions(
        &self,
        id: ViewId,
        focus: Option<ViewId>,
        regions: &mut Vec<(ViewId, Rect)>,
    ) {
        let node = match self.node(id) {
            Some(node) if node.is_visible && node.window.is_some() => node,
            _ => return,
        };

        if node.intercepts_interactions {
            let window_bounds = self.window_bounds(id);
            let previous = std::mem::replace(regions, Vec::new());
            for (view, region) in previous {
                for piece in region.subtract(window_bounds) {
                    regions.push((view, piece));
                }
            }

            let is_related = |focus: ViewId| {
                focus == id || self.is_descendant_of(id, focus) || self.is_ancestor_of(id, focus)
            };
            if node.can_become_direct_focus && !focus.map_or(false, is_related) {
                regions.push((id, window_bounds));
                if node.clips_to_bounds {
                    return;
                }
            }
        }

        if node.children_intercept_interactions {
            for &subview in &node.subviews {
                self.collect_focusable_regions(subview, focus, regions);
            }
        }
    }

    /// Moves the window’s focus to the nearest focusable region in `direction`.
    ///
    /// Distance is measured from the current focus; offsets along the other axis count double.
    /// Returns whether focus moved.
    pub fn move_focus(&mut self, window: WindowId, direction: Direction) -> bool {
        let focus = match self.focused_view(window) {
            Some(focus) => focus,
            None => return false,
        };
        let from = self.window_bounds(focus);

        let best = self
            .focusable_regions(window)
            .into_iter()
            .filter_map(|(view, region)| {
                directional_distance(from, region, direction).map(|d| (view, d))
            })
            .fold(None, |best: Option<(ViewId, f64)>, (view, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((view, d)),
            });

        match best {
            Some((view, _)) => {
                self.focus(view);
                true
            }
            None => false,
        }
    }
}

/// How far `to` lies from `from` in `direction`, or `None` if it isn’t in that direction at all.
fn directional_distance(from: Rect, to: Rect, direction: Direction) -> Option<f64> {
    let (primary, secondary) = match direction {
        Direction::Up => (from.min_y() - to.max_y(), from.center().x - to.center().x),
        Direction::Down => (to.min_y() - from.max_y(), from.center().x - to.center().x),
        Direction::Left => (from.min_x() - to.max_x(), from.center().y - to.center().y),
        Direction::Right => (to.min_x() - from.max_x(), from.center().y - to.center().y),
    };
    if primary < 0. {
        return None;
    }
    Some(primary + 2. * secondary.abs())
}
