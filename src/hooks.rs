//! Per-frame update hooks, typed listeners and texture loading.

use crate::app::{Listener, ListenerSpec, Relation};
use crate::texture::{TextureHandle, TextureSource};
use crate::tree::{UpdateHook, ViewTree};
use crate::view::{ViewCx, ViewId};
use core::any::{Any, TypeId};
use log::trace;

impl ViewTree {
    /// Registers a hook to run every frame while the view is visible in an open window.
    ///
    /// Tokens are unique per view; reusing one replaces the previous hook.
    pub fn add_update_hook<F>(&mut self, id: ViewId, token: impl Into<String>, hook: F)
    where
        F: 'static + FnMut(&mut ViewCx<'_>) + Send,
    {
        match self.node_mut(id) {
            Some(node) => {
                node.update_hooks.insert(token.into(), UpdateHook::new(hook));
            }
            None => return,
        }
        self.check_update_subscription(id);
    }

    pub fn remove_update_hook(&mut self, id: ViewId, token: &str) {
        match self.node_mut(id) {
            Some(node) => {
                node.update_hooks.remove(token);
            }
            None => return,
        }
        self.check_update_subscription(id);
    }

    pub fn has_update_hook(&self, id: ViewId, token: &str) -> bool {
        self.node(id)
            .map_or(false, |node| node.update_hooks.contains_key(token))
    }

    /// Whether the view should be on its window’s update list.
    pub fn should_subscribe_to_updates(&self, id: ViewId) -> bool {
        self.node(id)
            .map_or(false, |node| !node.update_hooks.is_empty())
            && self.is_visible_in_open_window(id)
    }

    pub(crate) fn check_update_subscription(&mut self, id: ViewId) {
        let should_subscribe = self.should_subscribe_to_updates(id);
        if let Some(window) = self.window(id).and_then(|w| self.window_mut(w)) {
            if should_subscribe {
                window.subscribe_to_updates(id);
            } else {
                window.unsubscribe_from_updates(id);
            }
        }
    }

    /// Runs the view’s update hooks once.
    ///
    /// Hooks removed by an earlier hook in the same pass don’t run.
    pub fn dispatch_update(&mut self, id: ViewId) {
        if !self.should_subscribe_to_updates(id) {
            if let Some(window) = self.window(id).and_then(|w| self.window_mut(w)) {
                window.unsubscribe_from_updates(id);
            }
            return;
        }

        let hooks: Vec<(String, UpdateHook)> = match self.node(id) {
            Some(node) => node
                .update_hooks
                .iter()
                .map(|(token, hook)| (token.clone(), hook.clone()))
                .collect(),
            None => return,
        };

        for (token, hook) in hooks {
            if !self.has_update_hook(id, &token) {
                continue;
            }
            let mut hook = match hook.0.try_lock() {
                Some(hook) => hook,
                None => {
                    trace!("update hook {:?} on {:?} is already running", token, id);
                    continue;
                }
            };
            hook(&mut ViewCx::new(self, id));
        }
    }

    /// Declares a listener for payloads of type `T`.
    ///
    /// `relation` is what the sender must be to this view for the payload to be delivered. The
    /// listener is live while the view is attached to a window.
    pub fn listen<T, F>(&mut self, id: ViewId, relation: Relation, action: F)
    where
        T: Any,
        F: 'static + FnMut(&T, ViewId) + Send,
    {
        let spec = ListenerSpec {
            type_id: TypeId::of::<T>(),
            relation,
            action: Listener::new(action),
        };
        let is_attached = match self.node_mut(id) {
            Some(node) => {
                node.listeners.push(spec.clone());
                node.window.is_some()
            }
            None => return,
        };
        if is_attached {
            self.application.add_listener(id, spec);
        }
    }

    /// Delivers `payload` to every live listener for `T` that `sender` may reach.
    ///
    /// A listener receives the payload when it is `relation` to the sender and the sender is what
    /// the listener asked for. Detached senders post nothing.
    pub fn post<T: Any>(&mut self, sender: ViewId, payload: &T, relation: Relation) {
        if self.window(sender).is_none() {
            trace!("{:?} is detached; post dropped", sender);
            return;
        }

        for registration in self.application.listeners_for(TypeId::of::<T>()) {
            let listener = registration.view;
            if !self.contains(listener) {
                continue;
            }
            if self.has_relation(sender, relation, listener)
                && self.has_relation(listener, registration.spec.relation, sender)
            {
                registration.spec.action.call(payload, sender);
            }
        }
    }

    /// Whether `other` is `relation` to `id`.
    pub fn has_relation(&self, id: ViewId, relation: Relation, other: ViewId) -> bool {
        match relation {
            Relation::Any => match self.window(id) {
                Some(_) => self.window(other).is_some(),
                None => self.common_ancestor(id, other).is_some(),
            },
            Relation::Hierarchy => self.root(id) == self.root(other),
            Relation::Descendant => self.is_descendant_of(other, id),
            Relation::Ancestor => self.is_ancestor_of(other, id),
            Relation::Sibling => self.is_sibling_of(id, other),
            Relation::Itself => id == other,
        }
    }

    /// Starts loading a texture through the view’s window.
    ///
    /// The view’s render cache is invalidated once the texture loads. Detached views get the empty
    /// handle.
    pub fn load_texture(&mut self, id: ViewId, source: TextureSource) -> TextureHandle {
        let sender = self.invalidation_sender();
        let window = match self.window(id).and_then(|w| self.window_mut(w)) {
            Some(window) => window,
            None => return TextureHandle::empty(),
        };
        let handle = window.load_texture(source);
        handle.on_load(move |_| {
            // the tree may be gone by now
            let _ = sender.send(id);
        });
        handle
    }

    pub fn load_texture_resource(&mut self, id: ViewId, name: &str) -> TextureHandle {
        self.load_texture(id, TextureSource::Resource(name.to_string()))
    }

    pub fn load_texture_from_memory(&mut self, id: ViewId, bytes: Vec<u8>) -> TextureHandle {
        self.load_texture(id, TextureSource::Memory(bytes.into()))
    }

    pub fn load_texture_from_url(&mut self, id: ViewId, url: &str) -> TextureHandle {
        self.load_texture(id, TextureSource::Url(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::app::Relation;
    use crate::rect::Rect;
    use crate::testing::{recorder, RecordingView, TestWindow};
    use crate::texture::Texture;
    use crate::tree::ViewTree;
    use crate::window::WindowId;
    use crate::view::ViewId;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn attached(tree: &mut ViewTree) -> (WindowId, ViewId) {
        let window = tree.add_window(Box::new(TestWindow::open()));
        let root = tree.create_view(());
        tree.set_bounds(root, Rect::from_xywh(0., 0., 100., 100.));
        tree.set_content_view(window, root).unwrap();
        (window, root)
    }

    #[test]
    fn subscription_follows_hooks_and_visibility() {
        let mut tree = ViewTree::new();
        let (window, root) = attached(&mut tree);
        let view = tree.create_view(());
        tree.add_subview(root, view);
        let subscribed = |tree: &ViewTree| {
            tree.window_as::<TestWindow>(window)
                .unwrap()
                .subscribers
                .contains(&view)
        };

        tree.add_update_hook(view, "spin", |_| ());
        assert!(subscribed(&tree));

        tree.hide(view);
        assert!(!subscribed(&tree), "hidden views don't get updates");
        tree.show(view);
        assert!(subscribed(&tree));

        tree.remove_update_hook(view, "spin");
        assert!(!subscribed(&tree));
    }

    #[test]
    fn tokens_replace_and_removal_mid_pass_is_honored() {
        let mut tree = ViewTree::new();
        let (_, root) = attached(&mut tree);
        let runs = Arc::new(Mutex::new(Vec::new()));

        let r = runs.clone();
        tree.add_update_hook(root, "a", move |_| r.lock().push("old a"));
        let r = runs.clone();
        tree.add_update_hook(root, "a", move |cx| {
            r.lock().push("a");
            let id = cx.id();
            cx.remove_update_hook(id, "b");
        });
        let r = runs.clone();
        tree.add_update_hook(root, "b", move |_| r.lock().push("b"));

        tree.dispatch_update(root);
        assert_eq!(*runs.lock(), vec!["a"]);

        tree.dispatch_update(root);
        assert_eq!(*runs.lock(), vec!["a", "a"]);
    }

    #[test]
    fn listeners_respect_both_relations() {
        let mut tree = ViewTree::new();
        let (_, root) = attached(&mut tree);
        let parent = tree.create_view(());
        let child = tree.create_view(());
        let sibling = tree.create_view(());
        tree.add_subview(root, parent);
        tree.add_subview(parent, child);
        tree.add_subview(root, sibling);

        let heard = Arc::new(Mutex::new(Vec::new()));
        for &(view, name) in &[(parent, "parent"), (sibling, "sibling")] {
            let heard = heard.clone();
            tree.listen(view, Relation::Descendant, move |n: &u32, _| {
                heard.lock().push((name, *n))
            });
        }

        tree.post(child, &7u32, Relation::Ancestor);
        assert_eq!(*heard.lock(), vec![("parent", 7)]);

        heard.lock().clear();
        tree.post(child, &"not a number", Relation::Any);
        assert!(heard.lock().is_empty(), "listeners are keyed by payload type");

        tree.post(child, &8u32, Relation::Sibling);
        assert!(heard.lock().is_empty());
    }

    #[test]
    fn listeners_live_only_while_attached() {
        let mut tree = ViewTree::new();
        let (_, root) = attached(&mut tree);
        let view = tree.create_view(());

        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        tree.listen(view, Relation::Any, move |_: &(), _| *c.lock() += 1);
        assert_eq!(tree.application.listener_count(view), 0);

        tree.add_subview(root, view);
        assert_eq!(tree.application.listener_count(view), 1);
        tree.post(root, &(), Relation::Any);
        assert_eq!(*count.lock(), 1);

        tree.remove_subview(root, view);
        assert_eq!(tree.application.listener_count(view), 0);
        tree.post(view, &(), Relation::Itself);
        assert_eq!(*count.lock(), 1, "detached senders post nothing");
    }

    #[test]
    fn loaded_textures_invalidate_the_loading_view() {
        let log = recorder();
        let mut tree = ViewTree::new();
        let (window, root) = attached(&mut tree);
        let view = tree.create_view(RecordingView::new("view", &log));
        tree.add_subview(root, view);

        let detached = tree.create_view(());
        assert!(tree.load_texture_resource(detached, "icon").is_empty());

        let handle = tree.load_texture_resource(view, "icon");
        assert_eq!(
            tree.window_as::<TestWindow>(window).unwrap().loads.len(),
            1
        );
        tree.node_mut(view).unwrap().render_cache.mark_valid();
        tree.node_mut(root).unwrap().render_cache.mark_valid();

        let loader = std::thread::spawn(move || {
            handle.set_loaded(Texture {
                id: crate::texture::TextureId(9),
                width: 16,
                height: 16,
            })
        });
        loader.join().unwrap();

        assert!(tree.has_cached_render(view), "nothing happens until invalidations are processed");
        assert_eq!(tree.process_invalidations(), 1);
        assert!(!tree.has_cached_render(view));
        assert!(!tree.has_cached_render(root));
    }
}
