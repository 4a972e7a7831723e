//! Single-occurrence values
//!
//! A [`Future`] starts unresolved and resolves at most once. Subscribers
//! present at resolution are notified synchronously in subscription order;
//! anyone subscribing afterwards is answered immediately with the stored
//! value. This is unrelated to `std::future::Future`: nothing is polled, the
//! host pushes the value in through [`Future::resolve`], a [`Resolver`] or an
//! [`AsyncSource`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{ReactiveError, Result};
use crate::listener::{Listener, Target};
use crate::stream::Stream;

struct FutureNode<A> {
    value: RefCell<Option<A>>,
    target: Target<A>,
}

/// A value available at most once
pub struct Future<A> {
    node: Rc<FutureNode<A>>,
}

impl<A> Clone for Future<A> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for Future<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("value", &self.node.value.borrow())
            .field("subscribers", &self.node.target.len())
            .finish()
    }
}

impl<A> From<&Future<A>> for Future<A> {
    fn from(future: &Future<A>) -> Self {
        future.clone()
    }
}

impl<A: Clone + 'static> Future<A> {
    /// Create an unresolved future
    pub fn new() -> Self {
        Self {
            node: Rc::new(FutureNode {
                value: RefCell::new(None),
                target: Target::new(),
            }),
        }
    }

    /// A future that is already resolved with `value`
    pub fn of(value: A) -> Self {
        let future = Self::new();
        future.settle(value);
        future
    }

    /// Hand a one-shot [`Resolver`] to `register` and return the future it
    /// resolves
    pub fn from_callback<F>(register: F) -> Self
    where
        F: FnOnce(Resolver<A>),
    {
        let future = Self::new();
        register(Resolver {
            future: future.clone(),
        });
        future
    }

    /// Adapt a host source that invokes one completion callback
    pub fn from_async_source<S>(source: S) -> Self
    where
        A: fmt::Debug,
        S: AsyncSource<A>,
    {
        let future = Self::new();
        let target = future.clone();
        source.on_complete(Box::new(move |value| {
            if let Err(err) = target.resolve(value) {
                tracing::error!("async source completed a resolved future: {}", err);
            }
        }));
        future
    }

    /// Resolve with the first value `stream` pushes from now on
    ///
    /// The future unsubscribes from `stream` once it has resolved.
    pub fn next_from_stream(stream: &Stream<A>) -> Self {
        let out = Self::new();
        let source = Rc::downgrade(&stream.target);
        let listener = Rc::new_cyclic(|this: &Weak<NextListener<A>>| NextListener {
            out: out.clone(),
            source,
            this: this.clone(),
        });
        stream.subscribe(listener);
        out
    }

    /// The resolved value, if any
    pub fn value(&self) -> Option<A> {
        self.node.value.borrow().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.node.value.borrow().is_some()
    }

    /// Subscribe to the resolution
    ///
    /// If the future is already resolved the listener is notified right away
    /// and is not retained.
    pub fn subscribe(&self, listener: Rc<dyn Listener<A>>) {
        let resolved = self.node.value.borrow().clone();
        match resolved {
            Some(value) => listener.notify(value),
            None => self.node.target.subscribe(listener),
        }
    }

    pub fn unsubscribe(&self, listener: &Rc<dyn Listener<A>>) {
        self.node.target.unsubscribe(listener);
    }

    /// Resolve the future
    ///
    /// Fails with [`ReactiveError::DoubleResolution`] if it already holds a
    /// value; the stored value is left untouched.
    pub fn resolve(&self, value: A) -> Result<()>
    where
        A: fmt::Debug,
    {
        if let Some(existing) = self.node.value.borrow().as_ref() {
            return Err(ReactiveError::DoubleResolution {
                existing: format!("{:?}", existing),
                attempted: format!("{:?}", value),
            });
        }
        self.settle(value);
        Ok(())
    }

    /// Store `value` and notify, returning false if already resolved
    pub(crate) fn settle(&self, value: A) -> bool {
        {
            let mut slot = self.node.value.borrow_mut();
            if slot.is_some() {
                return false;
            }
            *slot = Some(value.clone());
        }
        for listener in self.node.target.take() {
            listener.notify(value.clone());
        }
        true
    }

    pub fn map<B, F>(&self, f: F) -> Future<B>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + 'static,
    {
        let out = Future::new();
        let sink = out.clone();
        // Parents resolve once, so each derived future settles once
        self.subscribe(Rc::new(move |value: A| {
            sink.settle(f(value));
        }));
        out
    }

    /// Resolve with the future `f` returns, once both have resolved
    pub fn flat_map<B, F>(&self, f: F) -> Future<B>
    where
        B: Clone + 'static,
        F: Fn(A) -> Future<B> + 'static,
    {
        let out = Future::new();
        let sink = out.clone();
        self.subscribe(Rc::new(move |value: A| {
            let sink = sink.clone();
            f(value).subscribe(Rc::new(move |inner: B| {
                sink.settle(inner);
            }));
        }));
        out
    }

    /// Apply the function `fns` resolves with to this future's value
    pub fn ap<B, F>(&self, fns: &Future<F>) -> Future<B>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + Clone + 'static,
    {
        Future::lift2(|value, f: F| f(value), self, fns)
    }

    /// Resolve with whichever side resolves first
    ///
    /// Once a winner settles the result, the combined future unsubscribes
    /// from both parents. The losing side is not told to stop.
    pub fn combine(&self, other: impl Into<Future<A>>) -> Future<A> {
        let other = other.into();
        let out = Future::new();
        let parents = [Rc::downgrade(&self.node), Rc::downgrade(&other.node)];
        let listener = Rc::new_cyclic(|this: &Weak<CombineListener<A>>| CombineListener {
            out: out.clone(),
            parents,
            this: this.clone(),
        });
        self.subscribe(listener.clone());
        // An already resolved receiver picks the winner inside `subscribe`
        if !out.is_resolved() {
            other.subscribe(listener);
        }
        out
    }

    pub fn lift2<B, C, F>(f: F, a: &Future<B>, b: &Future<C>) -> Future<A>
    where
        B: Clone + 'static,
        C: Clone + 'static,
        F: Fn(B, C) -> A + 'static,
    {
        let f = Rc::new(f);
        let b = b.clone();
        a.flat_map(move |x: B| {
            let f = Rc::clone(&f);
            b.map(move |y: C| f(x.clone(), y))
        })
    }

    pub fn lift3<B, C, D, F>(f: F, a: &Future<B>, b: &Future<C>, c: &Future<D>) -> Future<A>
    where
        B: Clone + 'static,
        C: Clone + 'static,
        D: Clone + 'static,
        F: Fn(B, C, D) -> A + 'static,
    {
        let f = Rc::new(f);
        let c = c.clone();
        let pairs = Future::lift2(|x: B, y: C| (x, y), a, b);
        pairs.flat_map(move |(x, y): (B, C)| {
            let f = Rc::clone(&f);
            c.map(move |z: D| f(x.clone(), y.clone(), z))
        })
    }
}

impl<A: Clone + 'static> Future<Future<A>> {
    /// Resolve with the inner future's value
    pub fn flatten(&self) -> Future<A> {
        self.flat_map(|inner: Future<A>| inner)
    }
}

impl<A: Clone + 'static> Default for Future<A> {
    fn default() -> Self {
        Self::new()
    }
}

struct CombineListener<A> {
    out: Future<A>,
    parents: [Weak<FutureNode<A>>; 2],
    this: Weak<CombineListener<A>>,
}

impl<A: Clone + 'static> Listener<A> for CombineListener<A> {
    fn notify(&self, value: A) {
        // A loser resolving later finds `out` settled and is ignored
        if !self.out.settle(value) {
            return;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let this: Rc<dyn Listener<A>> = this;
        for parent in &self.parents {
            if let Some(node) = parent.upgrade() {
                node.target.unsubscribe(&this);
            }
        }
    }
}

struct NextListener<A> {
    out: Future<A>,
    source: Weak<Target<A>>,
    this: Weak<NextListener<A>>,
}

impl<A: Clone + 'static> Listener<A> for NextListener<A> {
    fn notify(&self, value: A) {
        self.out.settle(value);
        if let (Some(source), Some(this)) = (self.source.upgrade(), self.this.upgrade()) {
            let this: Rc<dyn Listener<A>> = this;
            source.unsubscribe(&this);
        }
    }
}

/// One-shot capability to resolve a [`Future`]
///
/// Handed out by [`Future::from_callback`]. Resolving consumes the resolver.
pub struct Resolver<A> {
    future: Future<A>,
}

impl<A: Clone + fmt::Debug + 'static> Resolver<A> {
    /// Resolve the future this resolver was created for
    ///
    /// Only fails if the future was resolved through another route first.
    pub fn resolve(self, value: A) -> Result<()> {
        self.future.resolve(value)
    }
}

/// A host producer that eventually reports a single value
///
/// Implemented for any closure that accepts the completion callback, so a
/// callback-style API can be adapted inline.
pub trait AsyncSource<A> {
    /// Register the callback; it must be invoked at most once
    fn on_complete(self, callback: Box<dyn FnOnce(A)>);
}

impl<A, F> AsyncSource<A> for F
where
    F: FnOnce(Box<dyn FnOnce(A)>),
{
    fn on_complete(self, callback: Box<dyn FnOnce(A)>) {
        self(callback)
    }
}
