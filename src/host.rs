use crate::backend::{Backend, RenderTarget};
use crate::config::Config;
use crate::error::Result;
use crate::events::InputEvent;
use crate::tree::ViewTree;
use crate::window::WindowId;
use cgmath::Point2;
use crossbeam::channel::{self, Receiver, Sender};
use log::trace;
use std::collections::HashMap;
use std::time::Instant;

/// A unit of work to run against the tree on the host’s thread.
pub type Task = Box<dyn FnOnce(&mut ViewTree) + Send>;

/// Queues input events for a [`Host`]; may be used from any thread.
#[derive(Debug, Clone)]
pub struct EventSender(Sender<InputEvent>);

impl EventSender {
    /// Queues an event. Returns false if the host is gone.
    pub fn send(&self, event: InputEvent) -> bool {
        self.0.send(event).is_ok()
    }
}

/// Queues tasks for a [`Host`]; may be used from any thread.
#[derive(Clone)]
pub struct TaskScheduler(Sender<Task>);

impl TaskScheduler {
    /// Queues a task for the next `poll`. Returns false if the host is gone.
    pub fn schedule<F: 'static + FnOnce(&mut ViewTree) + Send>(&self, task: F) -> bool {
        self.0.send(Box::new(task)).is_ok()
    }
}

/// Connects a view tree to a platform layer.
///
/// The platform pushes input through an [`EventSender`]; the host applies it to the tree in
/// `poll`, along with tasks queued through a [`TaskScheduler`].
pub struct Host {
    pub tree: ViewTree,
    config: Config,
    event_send: Sender<InputEvent>,
    event_recv: Receiver<InputEvent>,
    task_send: Sender<Task>,
    task_recv: Receiver<Task>,
    /// Where the button went down, per window, while one is held.
    mouse_down: HashMap<WindowId, Point2<f64>>,
    last_frame: Option<Instant>,
}

impl Host {
    /// Creates a new Host with an empty tree.
    pub fn new(config: Config) -> Host {
        Host::with_tree(ViewTree::new(), config)
    }

    pub fn with_tree(tree: ViewTree, config: Config) -> Host {
        let (event_send, event_recv) = channel::unbounded();
        let (task_send, task_recv) = channel::unbounded();

        Host {
            tree,
            config,
            event_send,
            event_recv,
            task_send,
            task_recv,
            mouse_down: HashMap::new(),
            last_frame: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn event_sender(&self) -> EventSender {
        EventSender(self.event_send.clone())
    }

    pub fn task_scheduler(&self) -> TaskScheduler {
        TaskScheduler(self.task_send.clone())
    }

    /// Dispatches queued input, runs queued tasks and applies texture invalidations.
    ///
    /// At most `max_events_per_poll` events are dispatched; the rest wait for the next poll.
    /// Tasks queued while tasks run also wait. Returns the number of events dispatched.
    pub fn poll(&mut self) -> usize {
        let mut dispatched = 0;
        while dispatched < self.config.max_events_per_poll {
            match self.event_recv.try_recv() {
                Ok(event) => {
                    self.dispatch(event);
                    dispatched += 1;
                }
                // the host holds a sender, so the queue never disconnects
                Err(_) => break,
            }
        }

        let queued = self.task_recv.len();
        for task in self.task_recv.try_iter().take(queued).collect::<Vec<_>>() {
            task(&mut self.tree);
        }

        self.tree.process_invalidations();
        dispatched
    }

    fn dispatch(&mut self, event: InputEvent) {
        trace!("dispatching {:?}", event);
        let tree = &mut self.tree;
        match event {
            InputEvent::MouseDown {
                window,
                button,
                position,
            } => {
                self.mouse_down.entry(window).or_insert(position);
                tree.window_mouse_down(window, button, position);
            }
            InputEvent::MouseUp {
                window,
                button,
                position,
            } => {
                let start = self.mouse_down.remove(&window).unwrap_or(position);
                tree.window_mouse_up(window, button, start, position);
            }
            InputEvent::MouseMovement { window, position } => {
                let is_dragging = tree
                    .window_ref(window)
                    .map_or(false, |w| !w.dragged_views().is_empty());
                match self.mouse_down.get(&window) {
                    Some(&start) if is_dragging => tree.window_mouse_drag(window, start, position),
                    _ => {
                        tree.window_mouse_movement(window, position);
                    }
                }
            }
            InputEvent::MouseWheel {
                window,
                position,
                mut delta,
            } => {
                if self.config.invert_wheel_x {
                    delta.x = -delta.x;
                }
                tree.window_mouse_wheel(window, position, delta);
            }
            InputEvent::KeyDown {
                window,
                key,
                modifiers,
                repeat,
            } => {
                tree.window_key_down(window, key, modifiers, repeat);
            }
            InputEvent::KeyUp {
                window,
                key,
                modifiers,
                repeat,
            } => {
                tree.window_key_up(window, key, modifiers, repeat);
            }
            InputEvent::TextInput { window, text } => {
                tree.window_text_input(window, &text);
            }
            InputEvent::TouchDown { window, touch } => {
                tree.window_touch_down(window, &touch);
            }
            InputEvent::TouchUp { window, touch } => {
                tree.window_touch_up(window, &touch);
            }
            InputEvent::TouchMovement { window, touch } => {
                tree.window_touch_movement(window, &touch);
            }
        }
    }

    /// Runs the update hooks of every window’s subscribers.
    pub fn update(&mut self) {
        for window in self.tree.window_ids() {
            let subscribers = match self.tree.window_ref(window) {
                Some(w) => w.update_subscribers(),
                None => continue,
            };
            for view in subscribers {
                self.tree.dispatch_update(view);
            }
        }
    }

    /// Whether enough time has passed since the last render for another frame.
    pub fn frame_due(&self, now: Instant) -> bool {
        self.last_frame.map_or(true, |last| {
            now.saturating_duration_since(last) >= self.config.min_frame_interval
        })
    }

    /// Renders a window’s content over the whole target.
    pub fn render(
        &mut self,
        window: WindowId,
        backend: &mut dyn Backend,
        target: RenderTarget,
    ) -> Result<()> {
        self.last_frame = Some(Instant::now());
        self.tree.render_window(window, backend, target)
    }
}
