use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::custom_element::{CustomElementRegistry, Reaction};
use crate::events::ListenerRegistry;
use crate::mutation_observer::ObserverRegistry;
use crate::tree::Tree;

thread_local! {
    static RUNTIME: Runtime = Runtime::new();
}

/// Every thread owns one document, one window and one microtask queue.
pub(crate) struct Runtime {
    pub(crate) tree: RefCell<Tree>,
    pub(crate) observers: RefCell<ObserverRegistry>,
    pub(crate) listeners: RefCell<ListenerRegistry>,
    pub(crate) custom_elements: RefCell<CustomElementRegistry>,

    microtasks: RefCell<VecDeque<Microtask>>,
    checkpoint_running: Cell<bool>,

    reactions: RefCell<VecDeque<Reaction>>,
    reactions_running: Cell<bool>,
}

pub(crate) enum Microtask {
    NotifyMutationObservers,
    Callback(Box<dyn FnOnce()>),
}

impl Runtime {
    fn new() -> Self {
        Self {
            tree: RefCell::new(Tree::new()),
            observers: Default::default(),
            listeners: Default::default(),
            custom_elements: Default::default(),
            microtasks: Default::default(),
            checkpoint_running: Cell::new(false),
            reactions: Default::default(),
            reactions_running: Cell::new(false),
        }
    }

    pub(crate) fn queue_microtask(&self, task: Microtask) {
        self.microtasks.borrow_mut().push_back(task);
    }

    pub(crate) fn enqueue_reaction(&self, reaction: Reaction) {
        self.reactions.borrow_mut().push_back(reaction);
    }
}

/// Runs a function with the runtime of the current thread.
pub(crate) fn with_runtime<F, R>(f: F) -> R
where
    F: FnOnce(&Runtime) -> R,
{
    RUNTIME.with(f)
}

/// Like [`with_runtime`], but returns `None` once the thread local has been torn down.
///
/// Used from `Drop` impls, which may run while the thread is exiting.
pub(crate) fn try_with_runtime<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&Runtime) -> R,
{
    RUNTIME.try_with(f).ok()
}

pub(crate) fn with_tree<F, R>(f: F) -> R
where
    F: FnOnce(&Tree) -> R,
{
    with_runtime(|rt| f(&rt.tree.borrow()))
}

pub(crate) fn with_tree_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut Tree) -> R,
{
    with_runtime(|rt| f(&mut rt.tree.borrow_mut()))
}

/// Queue a callback to run at the next microtask checkpoint.
pub fn queue_microtask(callback: impl FnOnce() + 'static) {
    with_runtime(|rt| rt.queue_microtask(Microtask::Callback(Box::new(callback))));
}

/// Perform a microtask checkpoint: run queued microtasks in FIFO order until the queue is empty.
///
/// Mutation observer callbacks are delivered from here. Microtasks queued while the checkpoint
/// runs are drained by the same checkpoint, and calling this from inside a microtask does nothing.
pub fn run_microtasks() {
    if with_runtime(|rt| rt.checkpoint_running.replace(true)) {
        return;
    }
    let _guard = ResetOnDrop(|rt: &Runtime| rt.checkpoint_running.set(false));

    while let Some(task) = with_runtime(|rt| rt.microtasks.borrow_mut().pop_front()) {
        match task {
            Microtask::NotifyMutationObservers => crate::mutation_observer::notify_observers(),
            Microtask::Callback(callback) => callback(),
        }
    }
}

/// Drain the custom element reaction queue.
///
/// Every public operation that can queue reactions calls this once it has finished touching the
/// tree. Reactions queued by a reaction are picked up by the loop that is already running.
pub(crate) fn run_reactions() {
    if with_runtime(|rt| rt.reactions_running.replace(true)) {
        return;
    }
    let _guard = ResetOnDrop(|rt: &Runtime| rt.reactions_running.set(false));

    while let Some(reaction) = with_runtime(|rt| rt.reactions.borrow_mut().pop_front()) {
        crate::custom_element::invoke_reaction(reaction);
    }
}

/// Resets a runtime flag even when a callback unwinds.
struct ResetOnDrop<F: Fn(&Runtime)>(F);

impl<F: Fn(&Runtime)> Drop for ResetOnDrop<F> {
    fn drop(&mut self) {
        try_with_runtime(|rt| (self.0)(rt));
    }
}
