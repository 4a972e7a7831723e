//! Deferred-binding placeholders
//!
//! A [`Placeholder`] stands in for a stream, behavior or future that does not
//! exist yet. While unbound, every operation called on it is recorded as a
//! [`DeferredCall`] and answered with a fresh unbound placeholder for the
//! eventual result. [`Placeholder::replace_with`] binds the real target once
//! and replays the recorded calls in order against it, binding each result
//! placeholder to the real return value. Results that were themselves
//! operated on replay their own queues in turn.
//!
//! After binding, operations forward straight to the target and come back as
//! already-bound placeholders.
//!
//! This is what makes feedback wiring possible without a reference cycle at
//! construction time:
//!
//! ```rust
//! use tidal_core::{Behavior, Placeholder};
//!
//! let looped: Placeholder<Behavior<i32>> = Placeholder::new();
//! let answer = looped.map(|n| n + 40);
//!
//! looped.replace_with(Behavior::of(2)).unwrap();
//! assert_eq!(answer.pull().unwrap(), 42);
//! ```

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::behavior::Behavior;
use crate::error::{ReactiveError, Result};
use crate::future::Future;
use crate::listener::Listener;
use crate::stream::{Sink, Stream};

/// The reactive kind a placeholder resolves to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Stream,
    Behavior,
    Future,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Stream => write!(f, "stream"),
            Kind::Behavior => write!(f, "behavior"),
            Kind::Future => write!(f, "future"),
        }
    }
}

/// Operations an unbound placeholder can record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Subscribe,
    Unsubscribe,
    Map,
    MapTo,
    Filter,
    Combine,
    Scan,
    Accum,
    Latest,
    Next,
    FlatMap,
    Ap,
    Flatten,
    /// Pull of a behavior whose values are themselves reactive
    Sample,
}

mod sealed {
    pub trait Sealed {}
}

/// The reactive kinds a placeholder can stand in for
///
/// Sealed: implemented for [`Stream`], [`Behavior`] and [`Future`] only.
pub trait Reactive: sealed::Sealed + Clone + 'static {
    const KIND: Kind;

    /// A real node of this kind that follows `placeholder`
    ///
    /// Returns the bound target itself once there is one. Streams and futures
    /// hand out one forwarding node per placeholder however often this is
    /// called.
    fn forward(placeholder: &Placeholder<Self>) -> Self;
}

impl<A> sealed::Sealed for Stream<A> {}
impl<A> sealed::Sealed for Behavior<A> {}
impl<A> sealed::Sealed for Future<A> {}

impl<A: Clone + 'static> Reactive for Stream<A> {
    const KIND: Kind = Kind::Stream;

    fn forward(placeholder: &Placeholder<Self>) -> Self {
        if let Some(parent) = placeholder.parent() {
            return parent;
        }
        placeholder
            .inner
            .forwarded
            .get_or_init(|| {
                let sink = Sink::new();
                let out = sink.stream();
                placeholder.subscribe(Rc::new(move |value: A| sink.push(value)));
                out
            })
            .clone()
    }
}

impl<A: Clone + 'static> Reactive for Behavior<A> {
    const KIND: Kind = Kind::Behavior;

    /// # Panics
    ///
    /// Pulling the returned behavior before `placeholder` is bound panics with
    /// [`ReactiveError::Unbound`].
    fn forward(placeholder: &Placeholder<Self>) -> Self {
        if let Some(parent) = placeholder.parent() {
            return parent;
        }
        let placeholder = placeholder.clone();
        Behavior::from_fn(move || match placeholder.pull() {
            Ok(value) => value,
            Err(err) => panic!("{}", err),
        })
    }
}

impl<A: Clone + 'static> Reactive for Future<A> {
    const KIND: Kind = Kind::Future;

    fn forward(placeholder: &Placeholder<Self>) -> Self {
        if let Some(parent) = placeholder.parent() {
            return parent;
        }
        placeholder
            .inner
            .forwarded
            .get_or_init(|| {
                let out = Future::new();
                let sink = out.clone();
                placeholder.subscribe(Rc::new(move |value: A| {
                    sink.settle(value);
                }));
                out
            })
            .clone()
    }
}

/// One recorded operation, replayed against the target at bind time
pub struct DeferredCall<R> {
    operation: Operation,
    replay: Box<dyn FnOnce(&R) -> Result<()>>,
}

impl<R> DeferredCall<R> {
    pub fn operation(&self) -> Operation {
        self.operation
    }
}

struct PlaceholderInner<R> {
    parent: OnceCell<R>,
    calls: RefCell<Vec<DeferredCall<R>>>,
    /// Node handed out by `to_reactive` while unbound
    forwarded: OnceCell<R>,
}

/// A stand-in for a reactive value that is bound later, exactly once
pub struct Placeholder<R> {
    inner: Rc<PlaceholderInner<R>>,
}

impl<R> Clone for Placeholder<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R: Reactive> fmt::Debug for Placeholder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Placeholder")
            .field("kind", &R::KIND)
            .field("bound", &self.is_bound())
            .field("pending", &self.pending())
            .finish()
    }
}

impl<R: Reactive> Default for Placeholder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Reactive> Placeholder<R> {
    /// Create an unbound placeholder
    pub fn new() -> Self {
        Self {
            inner: Rc::new(PlaceholderInner {
                parent: OnceCell::new(),
                calls: RefCell::new(Vec::new()),
                forwarded: OnceCell::new(),
            }),
        }
    }

    /// A placeholder that is already bound to `target`
    pub fn bound(target: R) -> Self {
        let placeholder = Self::new();
        // A fresh cell always accepts its first value
        let _ = placeholder.inner.parent.set(target);
        placeholder
    }

    /// The bound target, absent while unbound
    pub fn parent(&self) -> Option<R> {
        self.inner.parent.get().cloned()
    }

    pub fn is_bound(&self) -> bool {
        self.inner.parent.get().is_some()
    }

    /// Operations recorded so far and not yet replayed
    pub fn pending(&self) -> Vec<Operation> {
        self.inner
            .calls
            .borrow()
            .iter()
            .map(DeferredCall::operation)
            .collect()
    }

    /// A real node of this kind following the placeholder
    ///
    /// See [`Reactive::forward`].
    pub fn to_reactive(&self) -> R {
        R::forward(self)
    }

    /// Bind the placeholder to `target` and replay every recorded call
    ///
    /// Fails with [`ReactiveError::DoubleBinding`] if already bound. Replay
    /// continues past a failing call so every other result still gets bound;
    /// the first failure is returned.
    pub fn replace_with(&self, target: R) -> Result<()> {
        if self.inner.parent.set(target.clone()).is_err() {
            return Err(ReactiveError::DoubleBinding { kind: R::KIND });
        }

        let calls = std::mem::take(&mut *self.inner.calls.borrow_mut());
        tracing::trace!(
            "binding {} placeholder, replaying {} deferred calls",
            R::KIND,
            calls.len()
        );

        let mut first_error = None;
        for call in calls {
            if let Err(err) = (call.replay)(&target) {
                tracing::debug!("replay of {:?} failed: {}", call.operation, err);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Record `call`, or run it now if already bound
    fn defer<S, F>(&self, operation: Operation, call: F) -> Placeholder<S>
    where
        S: Reactive,
        F: FnOnce(&R) -> S + 'static,
    {
        if let Some(parent) = self.parent() {
            return Placeholder::bound(call(&parent));
        }
        let result = Placeholder::new();
        let dummy = result.clone();
        self.inner.calls.borrow_mut().push(DeferredCall {
            operation,
            replay: Box::new(move |target: &R| dummy.replace_with(call(target))),
        });
        result
    }

    /// Like [`Placeholder::defer`] for calls that produce nothing
    fn defer_effect<F>(&self, operation: Operation, call: F)
    where
        F: FnOnce(&R) + 'static,
    {
        if let Some(parent) = self.parent() {
            call(&parent);
            return;
        }
        self.inner.calls.borrow_mut().push(DeferredCall {
            operation,
            replay: Box::new(move |target: &R| {
                call(target);
                Ok(())
            }),
        });
    }
}

impl<A: Clone + 'static> Placeholder<Stream<A>> {
    pub fn subscribe(&self, listener: Rc<dyn Listener<A>>) {
        self.defer_effect(Operation::Subscribe, move |stream| {
            stream.subscribe(listener)
        });
    }

    pub fn unsubscribe(&self, listener: &Rc<dyn Listener<A>>) {
        let listener = Rc::clone(listener);
        self.defer_effect(Operation::Unsubscribe, move |stream| {
            stream.unsubscribe(&listener)
        });
    }

    pub fn map<B, F>(&self, f: F) -> Placeholder<Stream<B>>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + 'static,
    {
        self.defer(Operation::Map, move |stream| stream.map(f))
    }

    pub fn map_to<B: Clone + 'static>(&self, value: B) -> Placeholder<Stream<B>> {
        self.defer(Operation::MapTo, move |stream| stream.map_to(value))
    }

    pub fn filter<F>(&self, predicate: F) -> Placeholder<Stream<A>>
    where
        F: Fn(&A) -> bool + 'static,
    {
        self.defer(Operation::Filter, move |stream| stream.filter(predicate))
    }

    /// `other` may be a real stream or another placeholder
    pub fn combine(&self, other: impl Into<Stream<A>>) -> Placeholder<Stream<A>> {
        let other = other.into();
        self.defer(Operation::Combine, move |stream| stream.combine(other))
    }

    pub fn scan<B, F>(&self, f: F, initial: B) -> Placeholder<Stream<B>>
    where
        B: Clone + 'static,
        F: Fn(B, A) -> B + 'static,
    {
        self.defer(Operation::Scan, move |stream| stream.scan(f, initial))
    }

    pub fn accum<B, F>(&self, f: F, initial: B) -> Placeholder<Behavior<Behavior<B>>>
    where
        B: Clone + 'static,
        F: Fn(B, A) -> B + 'static,
    {
        self.defer(Operation::Accum, move |stream| stream.accum(f, initial))
    }

    pub fn latest(&self, initial: A) -> Placeholder<Behavior<Behavior<A>>> {
        self.defer(Operation::Latest, move |stream| stream.latest(initial))
    }

    pub fn next(&self) -> Placeholder<Behavior<Future<A>>> {
        self.defer(Operation::Next, |stream| stream.next())
    }
}

impl<A: Clone + 'static> Placeholder<Behavior<A>> {
    /// Pull the bound behavior
    ///
    /// Fails with [`ReactiveError::Unbound`] before binding.
    pub fn pull(&self) -> Result<A> {
        self.parent()
            .map(|behavior| behavior.pull())
            .ok_or(ReactiveError::Unbound {
                kind: Kind::Behavior,
            })
    }

    pub fn map<B, F>(&self, f: F) -> Placeholder<Behavior<B>>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + 'static,
    {
        self.defer(Operation::Map, move |behavior| behavior.map(f))
    }

    pub fn flat_map<B, F>(&self, f: F) -> Placeholder<Behavior<B>>
    where
        B: Clone + 'static,
        F: Fn(A) -> Behavior<B> + 'static,
    {
        self.defer(Operation::FlatMap, move |behavior| behavior.flat_map(f))
    }

    pub fn ap<B, F>(&self, fns: impl Into<Behavior<F>>) -> Placeholder<Behavior<B>>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + Clone + 'static,
    {
        let fns = fns.into();
        self.defer(Operation::Ap, move |behavior| behavior.ap(&fns))
    }
}

impl<R: Reactive> Placeholder<Behavior<R>> {
    /// Pull the bound behavior as soon as it is bound
    ///
    /// This is how the stream-backed behaviors returned by `accum`, `latest`
    /// and `next` on a placeholder get activated at binding time rather than
    /// at some later pull.
    pub fn sample(&self) -> Placeholder<R> {
        self.defer(Operation::Sample, |behavior| behavior.pull())
    }
}

impl<A: Clone + 'static> Placeholder<Behavior<Behavior<A>>> {
    pub fn flatten(&self) -> Placeholder<Behavior<A>> {
        self.defer(Operation::Flatten, |behavior| behavior.flatten())
    }
}

impl<A: Clone + 'static> Placeholder<Future<A>> {
    pub fn subscribe(&self, listener: Rc<dyn Listener<A>>) {
        self.defer_effect(Operation::Subscribe, move |future| {
            future.subscribe(listener)
        });
    }

    pub fn unsubscribe(&self, listener: &Rc<dyn Listener<A>>) {
        let listener = Rc::clone(listener);
        self.defer_effect(Operation::Unsubscribe, move |future| {
            future.unsubscribe(&listener)
        });
    }

    pub fn map<B, F>(&self, f: F) -> Placeholder<Future<B>>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + 'static,
    {
        self.defer(Operation::Map, move |future| future.map(f))
    }

    pub fn flat_map<B, F>(&self, f: F) -> Placeholder<Future<B>>
    where
        B: Clone + 'static,
        F: Fn(A) -> Future<B> + 'static,
    {
        self.defer(Operation::FlatMap, move |future| future.flat_map(f))
    }

    pub fn ap<B, F>(&self, fns: impl Into<Future<F>>) -> Placeholder<Future<B>>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + Clone + 'static,
    {
        let fns = fns.into();
        self.defer(Operation::Ap, move |future| future.ap(&fns))
    }

    /// `other` may be a real future or another placeholder
    pub fn combine(&self, other: impl Into<Future<A>>) -> Placeholder<Future<A>> {
        let other = other.into();
        self.defer(Operation::Combine, move |future| future.combine(other))
    }
}

impl<A: Clone + 'static> Placeholder<Future<Future<A>>> {
    pub fn flatten(&self) -> Placeholder<Future<A>> {
        self.defer(Operation::Flatten, |future| future.flatten())
    }
}

impl<A: Clone + 'static> From<&Placeholder<Stream<A>>> for Stream<A> {
    fn from(placeholder: &Placeholder<Stream<A>>) -> Self {
        placeholder.to_reactive()
    }
}

impl<A: Clone + 'static> From<Placeholder<Stream<A>>> for Stream<A> {
    fn from(placeholder: Placeholder<Stream<A>>) -> Self {
        placeholder.to_reactive()
    }
}

impl<A: Clone + 'static> From<&Placeholder<Behavior<A>>> for Behavior<A> {
    fn from(placeholder: &Placeholder<Behavior<A>>) -> Self {
        placeholder.to_reactive()
    }
}

impl<A: Clone + 'static> From<Placeholder<Behavior<A>>> for Behavior<A> {
    fn from(placeholder: Placeholder<Behavior<A>>) -> Self {
        placeholder.to_reactive()
    }
}

impl<A: Clone + 'static> From<&Placeholder<Future<A>>> for Future<A> {
    fn from(placeholder: &Placeholder<Future<A>>) -> Self {
        placeholder.to_reactive()
    }
}

impl<A: Clone + 'static> From<Placeholder<Future<A>>> for Future<A> {
    fn from(placeholder: Placeholder<Future<A>>) -> Self {
        placeholder.to_reactive()
    }
}

/// Either a real reactive node or a placeholder standing in for one
pub enum Slot<R> {
    Ready(R),
    Pending(Placeholder<R>),
}

impl<R: Clone> Clone for Slot<R> {
    fn clone(&self) -> Self {
        match self {
            Slot::Ready(target) => Slot::Ready(target.clone()),
            Slot::Pending(placeholder) => Slot::Pending(placeholder.clone()),
        }
    }
}

impl<R: Reactive> fmt::Debug for Slot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Ready(_) => write!(f, "Slot::Ready({})", R::KIND),
            Slot::Pending(placeholder) => f.debug_tuple("Slot::Pending").field(placeholder).finish(),
        }
    }
}

impl<R: Reactive> Slot<R> {
    /// Whether this slot still holds a placeholder, bound or not
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Slot::Pending(_))
    }

    /// Replace a bound placeholder with its target
    ///
    /// Unbound placeholders are kept as they are.
    pub fn settle(self) -> Self {
        match self {
            Slot::Pending(placeholder) => match placeholder.parent() {
                Some(target) => Slot::Ready(target),
                None => Slot::Pending(placeholder),
            },
            ready => ready,
        }
    }

    /// The real node behind this slot
    ///
    /// An unbound placeholder yields a forwarding node, see
    /// [`Reactive::forward`].
    pub fn to_reactive(&self) -> R {
        match self {
            Slot::Ready(target) => target.clone(),
            Slot::Pending(placeholder) => placeholder.to_reactive(),
        }
    }
}

impl<R: Reactive> From<R> for Slot<R> {
    fn from(target: R) -> Self {
        Slot::Ready(target)
    }
}

impl<R: Reactive> From<Placeholder<R>> for Slot<R> {
    fn from(placeholder: Placeholder<R>) -> Self {
        Slot::Pending(placeholder)
    }
}
