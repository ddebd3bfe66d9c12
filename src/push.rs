//! Push-based stages. A [`Source`] walks its items and hands each one to its
//! listeners; every [`Listener`] transforms what it receives and forwards the
//! result to its own listeners before returning.

use crate::error::{PipelineError, Result};
use crate::sink::Sink;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, trace, warn};

type Target<T> = Rc<dyn Receiver<T>>;
type Payload<T, R> = Box<dyn Fn(&T) -> anyhow::Result<R>>;

/// Anything a push node can notify.
pub trait Receiver<T> {
    fn label(&self) -> &str;

    fn on_receive(&self, value: &T) -> Result<()>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeState {
    #[default]
    Idle,
    Notifying,
    Done,
}

/// What a node does when the same listener is registered on it twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistrationPolicy {
    #[default]
    Reject,
    Ignore,
}

fn same_node<T>(a: &Target<T>, b: &Target<T>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

struct Downstream<T> {
    policy: Cell<RegistrationPolicy>,
    targets: RefCell<Vec<Target<T>>>,
}

impl<T> Downstream<T> {
    fn new() -> Self {
        Self {
            policy: Cell::new(RegistrationPolicy::default()),
            targets: RefCell::new(Vec::new()),
        }
    }

    fn register(&self, node: &str, target: Target<T>) -> Result<()> {
        let duplicate = self
            .targets
            .borrow()
            .iter()
            .any(|existing| same_node(existing, &target));

        if duplicate {
            match self.policy.get() {
                RegistrationPolicy::Reject => {
                    return Err(PipelineError::DuplicateListener {
                        node: node.to_string(),
                        listener: target.label().to_string(),
                    });
                }
                RegistrationPolicy::Ignore => {
                    warn!(node, listener = target.label(), "listener already registered");
                    return Ok(());
                }
            }
        }

        debug!(node, listener = target.label(), "listener registered");
        self.targets.borrow_mut().push(target);
        Ok(())
    }

    fn len(&self) -> usize {
        self.targets.borrow().len()
    }

    fn notify(&self, value: &T) -> Result<()> {
        // Snapshot so a payload can register listeners mid-notification.
        let targets = self.targets.borrow().clone();
        for target in &targets {
            target.on_receive(value)?;
        }
        Ok(())
    }
}

/// A fixed sequence that is pushed to listeners exactly once.
///
/// Driving a source a second time fails with
/// [`PipelineError::SourceExhausted`].
pub struct Source<T> {
    label: String,
    items: RefCell<Option<Vec<T>>>,
    downstream: Downstream<T>,
    state: Cell<NodeState>,
}

impl<T: 'static> Source<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            label: "source".to_string(),
            items: RefCell::new(Some(items.into_iter().collect())),
            downstream: Downstream::new(),
            state: Cell::new(NodeState::Idle),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_registration_policy(self, policy: RegistrationPolicy) -> Self {
        self.downstream.policy.set(policy);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> NodeState {
        self.state.get()
    }

    pub fn listener_count(&self) -> usize {
        self.downstream.len()
    }

    pub fn register_listener<R: 'static>(&self, listener: &Listener<T, R>) -> Result<()> {
        self.register_receiver(listener.as_receiver())
    }

    pub fn register_receiver(&self, receiver: Rc<dyn Receiver<T>>) -> Result<()> {
        self.downstream.register(&self.label, receiver)
    }

    /// Pushes every item through the listener tree, one item at a time.
    pub fn drive(&self) -> Result<()> {
        let items = self
            .items
            .borrow_mut()
            .take()
            .ok_or_else(|| PipelineError::SourceExhausted {
                source_label: self.label.clone(),
            })?;

        debug!(
            source = %self.label,
            items = items.len(),
            listeners = self.downstream.len(),
            "driving source"
        );

        for (index, item) in items.iter().enumerate() {
            self.state.set(NodeState::Notifying);
            trace!(source = %self.label, index, "push");
            if let Err(err) = self.downstream.notify(item) {
                self.state.set(NodeState::Done);
                return Err(err);
            }
            self.state.set(NodeState::Idle);
        }

        self.state.set(NodeState::Done);
        debug!(source = %self.label, "source done");
        Ok(())
    }
}

struct ListenerNode<T, R> {
    label: String,
    payload: Payload<T, R>,
    downstream: Downstream<R>,
    received: Cell<usize>,
    state: Cell<NodeState>,
}

impl<T, R> Receiver<T> for ListenerNode<T, R> {
    fn label(&self) -> &str {
        &self.label
    }

    fn on_receive(&self, value: &T) -> Result<()> {
        let index = self.received.get();
        self.received.set(index + 1);
        self.state.set(NodeState::Notifying);
        trace!(listener = %self.label, index, "receive");

        let result = (self.payload)(value)
            .map_err(|err| PipelineError::transform(&self.label, index, err))
            .and_then(|output| self.downstream.notify(&output));

        self.state.set(NodeState::Idle);
        result
    }
}

/// Handle to a push stage. Clones refer to the same node, so a listener can
/// be wired into a tree and still be inspected by its owner.
pub struct Listener<T, R> {
    inner: Rc<ListenerNode<T, R>>,
}

impl<T: 'static, R: 'static> Listener<T, R> {
    pub fn new<F>(label: impl Into<String>, payload: F) -> Self
    where
        F: Fn(&T) -> R + 'static,
    {
        Self::try_new(label, move |value: &T| Ok(payload(value)))
    }

    pub fn try_new<F>(label: impl Into<String>, payload: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<R> + 'static,
    {
        Self {
            inner: Rc::new(ListenerNode {
                label: label.into(),
                payload: Box::new(payload),
                downstream: Downstream::new(),
                received: Cell::new(0),
                state: Cell::new(NodeState::Idle),
            }),
        }
    }

    pub fn with_registration_policy(self, policy: RegistrationPolicy) -> Self {
        self.inner.downstream.policy.set(policy);
        self
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn state(&self) -> NodeState {
        self.inner.state.get()
    }

    /// Number of values this listener has been handed so far.
    pub fn received(&self) -> usize {
        self.inner.received.get()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.downstream.len()
    }

    pub fn register_listener<S: 'static>(&self, listener: &Listener<R, S>) -> Result<()> {
        self.register_receiver(listener.as_receiver())
    }

    pub fn register_receiver(&self, receiver: Rc<dyn Receiver<R>>) -> Result<()> {
        self.inner.downstream.register(&self.inner.label, receiver)
    }

    pub fn as_receiver(&self) -> Rc<dyn Receiver<T>> {
        self.inner.clone()
    }
}

impl<T: Clone + 'static> Listener<T, T> {
    /// Identity listener that hands every value to `sink` before forwarding.
    pub fn tap<S>(label: impl Into<String>, sink: S) -> Self
    where
        S: Sink<T> + 'static,
    {
        Self::new(label, move |value: &T| {
            sink.send(value);
            value.clone()
        })
    }
}

impl<T, R> Clone for Listener<T, R> {
    fn clone(&self) -> Self {
        Listener {
            inner: self.inner.clone(),
        }
    }
}
