//! Multicast subscription shared by every push-based node
//!
//! A [`Target`] is the membership set behind streams and futures. Listeners
//! are kept in insertion order, adding the same listener twice is a no-op and
//! a broadcast walks a snapshot of the set, so listeners may subscribe or
//! unsubscribe while a value is being delivered.

use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

/// Anything that can receive values of type `A`
pub trait Listener<A> {
    /// Receive one pushed value
    fn notify(&self, value: A);
}

impl<A, F> Listener<A> for F
where
    F: Fn(A),
{
    fn notify(&self, value: A) {
        self(value)
    }
}

type Listeners<A> = SmallVec<[Rc<dyn Listener<A>>; 4]>;

/// Identity of a listener is the address of its allocation
fn same_listener<A>(a: &Rc<dyn Listener<A>>, b: &Rc<dyn Listener<A>>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// Ordered, duplicate-free set of listeners
pub struct Target<A> {
    listeners: RefCell<Listeners<A>>,
}

impl<A> Target<A> {
    /// Create an empty target
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(SmallVec::new()),
        }
    }

    /// Add a listener unless it is already a member
    pub fn subscribe(&self, listener: Rc<dyn Listener<A>>) {
        let mut listeners = self.listeners.borrow_mut();
        if !listeners.iter().any(|l| same_listener(l, &listener)) {
            listeners.push(listener);
        }
    }

    /// Remove a listener, ignoring ones that are not members
    pub fn unsubscribe(&self, listener: &Rc<dyn Listener<A>>) {
        self.listeners
            .borrow_mut()
            .retain(|l| !same_listener(l, listener));
    }

    /// Whether `listener` is currently a member
    pub fn contains(&self, listener: &Rc<dyn Listener<A>>) -> bool {
        self.listeners
            .borrow()
            .iter()
            .any(|l| same_listener(l, listener))
    }

    /// Number of current members
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Remove and return every member, in subscription order
    pub(crate) fn take(&self) -> Listeners<A> {
        std::mem::take(&mut *self.listeners.borrow_mut())
    }
}

impl<A: Clone> Target<A> {
    /// Deliver `value` to every member in subscription order
    pub fn broadcast(&self, value: A) {
        // Snapshot first so listeners can change membership mid-delivery
        let listeners: Listeners<A> = self.listeners.borrow().clone();
        for listener in listeners {
            listener.notify(value.clone());
        }
    }
}

impl<A> Default for Target<A> {
    fn default() -> Self {
        Self::new()
    }
}
