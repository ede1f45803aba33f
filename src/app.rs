//! The application-wide listener registry.
//!
//! Views declare typed listeners with [`ViewTree::listen`](crate::ViewTree::listen). A listener is
//! live only while its view is attached to a window; the tree registers and unregisters it here as
//! views move between windows.

use crate::view::ViewId;
use core::any::{Any, TypeId};
use core::fmt;
use parking_lot::Mutex;
use std::sync::Arc;

/// How two views must be related for an event to pass between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Any two views in the application.
    Any,
    /// Views sharing the same root.
    Hierarchy,
    /// The other view is a descendant.
    Descendant,
    /// The other view is an ancestor.
    Ancestor,
    /// The other view shares the same superview.
    Sibling,
    /// The other view is the same view.
    Itself,
}

/// A type-erased listener callback, receiving the payload and the sender.
pub struct Listener(Arc<Mutex<dyn FnMut(&dyn Any, ViewId) + Send>>);

impl Clone for Listener {
    fn clone(&self) -> Self {
        Listener(Arc::clone(&self.0))
    }
}

impl Listener {
    /// Wraps a callback for payloads of type `T`. Other payload types are ignored.
    pub fn new<T, F>(mut action: F) -> Listener
    where
        T: Any,
        F: 'static + FnMut(&T, ViewId) + Send,
    {
        Listener(Arc::new(Mutex::new(move |payload: &dyn Any, sender: ViewId| {
            if let Some(payload) = payload.downcast_ref::<T>() {
                action(payload, sender);
            }
        })))
    }

    pub(crate) fn call(&self, payload: &dyn Any, sender: ViewId) {
        // a listener posting to itself would deadlock; drop the nested delivery
        match self.0.try_lock() {
            Some(mut action) => action(payload, sender),
            None => log::warn!("listener re-entered while running; event from {:?} dropped", sender),
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// A listener as declared by a view.
#[derive(Debug, Clone)]
pub(crate) struct ListenerSpec {
    pub type_id: TypeId,
    pub relation: Relation,
    pub action: Listener,
}

#[derive(Debug, Clone)]
pub(crate) struct Registration {
    pub view: ViewId,
    pub spec: ListenerSpec,
}

/// Live listeners, keyed by view and payload type.
#[derive(Debug, Default)]
pub struct Application {
    registrations: Vec<Registration>,
}

impl Application {
    pub fn new() -> Application {
        Application::default()
    }

    pub(crate) fn add_listener(&mut self, view: ViewId, spec: ListenerSpec) {
        self.registrations.push(Registration { view, spec });
    }

    /// Unregisters every listener belonging to `view`.
    pub fn remove_listeners(&mut self, view: ViewId) {
        self.registrations.retain(|r| r.view != view);
    }

    /// Number of live listeners for a view.
    pub fn listener_count(&self, view: ViewId) -> usize {
        self.registrations.iter().filter(|r| r.view == view).count()
    }

    /// Live listeners for a payload type, in registration order.
    pub(crate) fn listeners_for(&self, type_id: TypeId) -> Vec<Registration> {
        self.registrations
            .iter()
            .filter(|r| r.spec.type_id == type_id)
            .cloned()
            .collect()
    }
}
