//! Discrete event streams
//!
//! A [`Stream`] pushes values to its subscribers and remembers nothing, so a
//! late subscriber only sees values pushed after it joined. Values enter the
//! graph through a [`Sink`]; every combinator builds a derived stream that
//! subscribes to its parent immediately and re-pushes transformed values
//! synchronously, within the parent's own push.
//!
//! ```rust
//! use tidal_core::Sink;
//!
//! let sink = Sink::new();
//! let total = sink.stream().accum(|acc, n: i32| acc + n, 0).pull();
//!
//! sink.push(1);
//! sink.push(2);
//! assert_eq!(total.pull(), 3);
//! ```
//!
//! Derived nodes are owned by their parent's subscriber set: dropping the
//! handle of a derived stream keeps it alive for as long as its parent is.

use std::cell::RefCell;
use std::rc::Rc;

use crate::behavior::Behavior;
use crate::future::Future;
use crate::listener::{Listener, Target};
use crate::now::Now;

/// A value from one of two tagged sources
///
/// Produced by [`Stream::combine_tagged`] so subscribers can tell which parent
/// pushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Either<A, B> {
    Left(A),
    Right(B),
}

/// A push-based, multi-value event source
pub struct Stream<A> {
    pub(crate) target: Rc<Target<A>>,
}

impl<A> Clone for Stream<A> {
    fn clone(&self) -> Self {
        Self {
            target: Rc::clone(&self.target),
        }
    }
}

impl<A> std::fmt::Debug for Stream<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("subscribers", &self.target.len())
            .finish()
    }
}

impl<A> From<&Stream<A>> for Stream<A> {
    fn from(stream: &Stream<A>) -> Self {
        stream.clone()
    }
}

impl<A: Clone + 'static> Stream<A> {
    /// A stream that never pushes unless something is wired into it
    pub fn never() -> Self {
        Self {
            target: Rc::new(Target::new()),
        }
    }

    pub(crate) fn push(&self, value: A) {
        self.target.broadcast(value);
    }

    /// Add a subscriber; subscribing the same listener twice is a no-op
    pub fn subscribe(&self, listener: Rc<dyn Listener<A>>) {
        self.target.subscribe(listener);
    }

    /// Remove a subscriber; unknown listeners are ignored
    pub fn unsubscribe(&self, listener: &Rc<dyn Listener<A>>) {
        self.target.unsubscribe(listener);
    }

    /// Number of direct subscribers, derived streams included
    pub fn subscriber_count(&self) -> usize {
        self.target.len()
    }

    /// Push `f(v)` for every value `v` of this stream
    ///
    /// A panic inside `f` unwinds out of the push that triggered it.
    pub fn map<B, F>(&self, f: F) -> Stream<B>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + 'static,
    {
        let out = Stream::never();
        let sink = out.clone();
        self.subscribe(Rc::new(move |value: A| sink.push(f(value))));
        out
    }

    /// Push `value` whenever this stream pushes anything
    pub fn map_to<B: Clone + 'static>(&self, value: B) -> Stream<B> {
        self.map(move |_| value.clone())
    }

    /// Forward only the values matching `predicate`
    pub fn filter<F>(&self, predicate: F) -> Stream<A>
    where
        F: Fn(&A) -> bool + 'static,
    {
        let out = Stream::never();
        let sink = out.clone();
        self.subscribe(Rc::new(move |value: A| {
            if predicate(&value) {
                sink.push(value);
            }
        }));
        out
    }

    /// Push every value pushed by either stream
    ///
    /// Each side keeps its own push order; there is no ordering between the
    /// two sides beyond the order in which the host pushes them.
    pub fn combine(&self, other: impl Into<Stream<A>>) -> Stream<A> {
        let other = other.into();
        let out = Stream::never();
        let sink = out.clone();
        let forward: Rc<dyn Listener<A>> = Rc::new(move |value: A| sink.push(value));
        self.subscribe(forward.clone());
        other.subscribe(forward);
        out
    }

    /// Like [`Stream::combine`] for streams of different types, tagging each
    /// value with the side that pushed it
    pub fn combine_tagged<B: Clone + 'static>(&self, other: &Stream<B>) -> Stream<Either<A, B>> {
        let out = Stream::never();
        let left = out.clone();
        self.subscribe(Rc::new(move |value: A| left.push(Either::Left(value))));
        let right = out.clone();
        other.subscribe(Rc::new(move |value: B| right.push(Either::Right(value))));
        out
    }

    /// Fold every value into an accumulator and push each new accumulator
    ///
    /// The accumulator starts at `initial` when `scan` is called and is owned
    /// by the returned stream alone.
    pub fn scan<B, F>(&self, f: F, initial: B) -> Stream<B>
    where
        B: Clone + 'static,
        F: Fn(B, A) -> B + 'static,
    {
        let out = Stream::never();
        let sink = out.clone();
        let accumulator = RefCell::new(initial);
        self.subscribe(Rc::new(move |value: A| {
            let current = accumulator.borrow().clone();
            let next = f(current, value);
            *accumulator.borrow_mut() = next.clone();
            sink.push(next);
        }));
        out
    }

    /// The effect that starts folding this stream into a live cell
    ///
    /// Every run of the returned [`Now`] subscribes once more and yields a new
    /// behavior whose pull reads that cell.
    pub fn accum_now<B, F>(&self, f: F, initial: B) -> Now<Behavior<B>>
    where
        B: Clone + 'static,
        F: Fn(B, A) -> B + 'static,
    {
        let parent = self.clone();
        let f = Rc::new(f);
        Now::effect(move || {
            let cell = Rc::new(RefCell::new(initial.clone()));
            let state = Rc::clone(&cell);
            let f = Rc::clone(&f);
            parent.subscribe(Rc::new(move |value: A| {
                let current = state.borrow().clone();
                let next = f(current, value);
                *state.borrow_mut() = next;
            }));
            Behavior::cell(cell)
        })
    }

    /// Fold this stream into a behavior
    ///
    /// The outer behavior is inert until first pulled; that pull subscribes
    /// once and every later pull answers the same accumulating behavior.
    pub fn accum<B, F>(&self, f: F, initial: B) -> Behavior<Behavior<B>>
    where
        B: Clone + 'static,
        F: Fn(B, A) -> B + 'static,
    {
        Behavior::activate(self.accum_now(f, initial))
    }

    /// A behavior holding the most recent value, `initial` until the first push
    pub fn latest(&self, initial: A) -> Behavior<Behavior<A>> {
        self.accum(|_, value| value, initial)
    }

    /// A future of the first value pushed after activation
    ///
    /// Activation happens on the first pull of the outer behavior. The future
    /// unsubscribes from this stream as soon as it resolves.
    pub fn next(&self) -> Behavior<Future<A>> {
        let parent = self.clone();
        Behavior::activate(Now::effect(move || Future::next_from_stream(&parent)))
    }
}

/// The entry point for values pushed into a stream from outside
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use tidal_core::Sink;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Sink::new();
/// let log = seen.clone();
/// sink.stream()
///     .filter(|n: &i32| n % 2 == 0)
///     .subscribe(Rc::new(move |n: i32| log.borrow_mut().push(n)));
///
/// for n in 1..=4 {
///     sink.push(n);
/// }
/// assert_eq!(*seen.borrow(), vec![2, 4]);
/// ```
pub struct Sink<A> {
    stream: Stream<A>,
}

impl<A: Clone + 'static> Sink<A> {
    pub fn new() -> Self {
        Self {
            stream: Stream::never(),
        }
    }

    /// Broadcast `value` to every subscriber of [`Sink::stream`]
    pub fn push(&self, value: A) {
        self.stream.push(value);
    }

    /// The stream this sink pushes into
    pub fn stream(&self) -> Stream<A> {
        self.stream.clone()
    }
}

impl<A: Clone + 'static> Default for Sink<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Sink<A> {
    fn clone(&self) -> Self {
        Self {
            stream: self.stream.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Recorder;

    #[test]
    fn test_notifies_children_in_order() {
        let sink = Sink::new();
        let first = Recorder::new();
        let second = Recorder::new();
        sink.stream().subscribe(first.listener());
        sink.stream().subscribe(second.listener());

        sink.push("a");
        sink.push("b");

        assert_eq!(first.values(), vec!["a", "b"]);
        assert_eq!(second.values(), vec!["a", "b"]);
    }

    #[test]
    fn test_late_subscriber_misses_past_values() {
        let sink = Sink::new();
        sink.push(1);

        let recorder = Recorder::new();
        sink.stream().subscribe(recorder.listener());
        sink.push(2);

        assert_eq!(recorder.values(), vec![2]);
    }

    #[test]
    fn test_map() {
        let sink = Sink::new();
        let recorder = Recorder::new();
        sink.stream().map(|n: i32| n * 2).subscribe(recorder.listener());

        sink.push(42);
        sink.push(43);

        assert_eq!(recorder.values(), vec![84, 86]);
    }

    #[test]
    fn test_map_composition() {
        let sink = Sink::new();
        let chained = Recorder::new();
        let fused = Recorder::new();
        let stream = sink.stream();
        stream
            .map(|n: i32| n + 1)
            .map(|n| n * 10)
            .subscribe(chained.listener());
        stream.map(|n: i32| (n + 1) * 10).subscribe(fused.listener());

        for n in [3, -1, 7] {
            sink.push(n);
        }

        assert_eq!(chained.values(), fused.values());
    }

    #[test]
    fn test_map_to() {
        let sink = Sink::new();
        let recorder = Recorder::new();
        sink.stream().map_to(2).subscribe(recorder.listener());

        sink.push(42);
        sink.push(43);

        assert_eq!(recorder.values(), vec![2, 2]);
    }

    #[test]
    fn test_filter() {
        let sink = Sink::new();
        let recorder = Recorder::new();
        sink.stream()
            .filter(|n: &i32| *n <= 42)
            .subscribe(recorder.listener());

        sink.push(42);
        sink.push(43);

        assert_eq!(recorder.values(), vec![42]);
    }

    #[test]
    fn test_combine() {
        let left = Sink::new();
        let right = Sink::new();
        let recorder = Recorder::new();
        left.stream()
            .combine(&right.stream())
            .subscribe(recorder.listener());

        left.push(42);
        right.push(43);
        left.push(44);

        assert_eq!(recorder.values(), vec![42, 43, 44]);
    }

    #[test]
    fn test_combine_tagged() {
        let numbers = Sink::new();
        let names = Sink::new();
        let recorder = Recorder::new();
        numbers
            .stream()
            .combine_tagged(&names.stream())
            .subscribe(recorder.listener());

        numbers.push(1);
        names.push("one");

        assert_eq!(
            recorder.values(),
            vec![Either::Left(1), Either::Right("one")]
        );
    }

    #[test]
    fn test_scan() {
        let sink = Sink::new();
        let recorder = Recorder::new();
        sink.stream()
            .scan(|acc, n: i32| acc + n, 0)
            .subscribe(recorder.listener());

        sink.push(1);
        sink.push(1);
        sink.push(1);

        assert_eq!(recorder.values(), vec![1, 2, 3]);
    }

    #[test]
    fn test_accum() {
        let sink = Sink::new();
        let behavior = sink.stream().accum(|acc, n: i32| acc + n, 0).pull();

        assert_eq!(behavior.pull(), 0);
        sink.push(1);
        assert_eq!(behavior.pull(), 1);
        sink.push(1);
        assert_eq!(behavior.pull(), 2);
        sink.push(1);
        assert_eq!(behavior.pull(), 3);
    }

    #[test]
    fn test_accum_is_inert_until_pulled() {
        let sink = Sink::new();
        let outer = sink.stream().accum(|acc, n: i32| acc + n, 0);
        assert_eq!(sink.stream().subscriber_count(), 0);

        sink.push(5);
        let inner = outer.pull();
        assert_eq!(sink.stream().subscriber_count(), 1);
        assert_eq!(inner.pull(), 0);

        // Repeated pulls answer the same cell without subscribing again
        let again = outer.pull();
        sink.push(2);
        assert_eq!(sink.stream().subscriber_count(), 1);
        assert_eq!(again.pull(), 2);
        assert_eq!(inner.pull(), 2);
    }

    #[test]
    fn test_accum_now_subscribes_per_run() {
        let sink = Sink::new();
        let start = sink.stream().accum_now(|acc, n: i32| acc + n, 10);

        let first = start.run();
        sink.push(1);
        let second = start.run();
        sink.push(1);

        assert_eq!(sink.stream().subscriber_count(), 2);
        assert_eq!(first.pull(), 12);
        assert_eq!(second.pull(), 11);
    }

    #[test]
    fn test_latest() {
        let sink = Sink::new();
        let behavior = sink.stream().latest(0).pull();

        assert_eq!(behavior.pull(), 0);
        sink.push(1);
        assert_eq!(behavior.pull(), 1);
        sink.push(2);
        assert_eq!(behavior.pull(), 2);
        sink.push(3);
        assert_eq!(behavior.pull(), 3);
    }

    #[test]
    fn test_next_resolves_with_next_value() {
        let sink = Sink::new();
        let future = sink.stream().next().pull();
        let recorder = Recorder::new();
        future.subscribe(recorder.listener());

        sink.push(42);
        assert_eq!(recorder.values(), vec![42]);
        sink.push(43);
        assert_eq!(recorder.values(), vec![42]);
    }

    #[test]
    fn test_next_unsubscribes_once_resolved() {
        let sink = Sink::new();
        let future = sink.stream().next().pull();
        assert_eq!(sink.stream().subscriber_count(), 1);

        sink.push(42);
        assert_eq!(sink.stream().subscriber_count(), 0);
        assert_eq!(future.value(), Some(42));

        sink.push(43);
        assert_eq!(future.value(), Some(42));
    }

    #[test]
    #[should_panic(expected = "odd value")]
    fn test_transform_panic_propagates_out_of_push() {
        let sink = Sink::new();
        let _mapped = sink.stream().map(|n: i32| {
            if n % 2 == 1 {
                panic!("odd value");
            }
            n
        });
        sink.push(1);
    }
}
