//! Continuous, pull-based values
//!
//! A [`Behavior`] can be read at any moment with [`Behavior::pull`]. Derived
//! behaviors are plain composition chains: pulling one pulls its parents
//! fresh every time, so nothing is cached and the cost of a pull grows with
//! the depth of the chain.
//!
//! Behaviors built from a stream (`accum`, `latest`, `next`) are the one
//! exception. They hand out a `Behavior<Behavior<_>>` whose first pull runs
//! the [`Now`] that subscribes to the stream; the resulting inner value is
//! kept and answered to every later pull.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::now::Now;

enum BehaviorNode<A> {
    /// Always the same value
    Constant(A),
    /// Re-invoked on every pull
    Pull(Box<dyn Fn() -> A>),
    /// A live cell written by a stream subscription
    Cell(Rc<RefCell<A>>),
    /// Runs `activation` on first pull and keeps the result
    Activation {
        activation: Now<A>,
        activated: OnceCell<A>,
    },
}

/// A value that varies over time and can be pulled at any moment
pub struct Behavior<A> {
    node: Rc<BehaviorNode<A>>,
}

impl<A> Clone for Behavior<A> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<A> fmt::Debug for Behavior<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &*self.node {
            BehaviorNode::Constant(_) => "constant",
            BehaviorNode::Pull(_) => "pull",
            BehaviorNode::Cell(_) => "cell",
            BehaviorNode::Activation { .. } => "activation",
        };
        f.debug_struct("Behavior").field("kind", &kind).finish()
    }
}

impl<A> From<&Behavior<A>> for Behavior<A> {
    fn from(behavior: &Behavior<A>) -> Self {
        behavior.clone()
    }
}

impl<A: Clone + 'static> Behavior<A> {
    /// A behavior that always answers `value`
    pub fn of(value: A) -> Self {
        Self {
            node: Rc::new(BehaviorNode::Constant(value)),
        }
    }

    /// A behavior that calls `f` on every pull, uncached
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> A + 'static,
    {
        Self {
            node: Rc::new(BehaviorNode::Pull(Box::new(f))),
        }
    }

    pub(crate) fn cell(cell: Rc<RefCell<A>>) -> Self {
        Self {
            node: Rc::new(BehaviorNode::Cell(cell)),
        }
    }

    /// Run `activation` on the first pull and answer its result from then on
    pub(crate) fn activate(activation: Now<A>) -> Self {
        Self {
            node: Rc::new(BehaviorNode::Activation {
                activation,
                activated: OnceCell::new(),
            }),
        }
    }

    /// Read the current value
    pub fn pull(&self) -> A {
        match &*self.node {
            BehaviorNode::Constant(value) => value.clone(),
            BehaviorNode::Pull(f) => f(),
            BehaviorNode::Cell(cell) => cell.borrow().clone(),
            BehaviorNode::Activation {
                activation,
                activated,
            } => activated
                .get_or_init(|| {
                    tracing::trace!("activating stream-backed behavior");
                    activation.run()
                })
                .clone(),
        }
    }

    /// Whether this behavior is known never to change
    pub fn is_constant(&self) -> bool {
        matches!(&*self.node, BehaviorNode::Constant(_))
    }

    pub fn map<B, F>(&self, f: F) -> Behavior<B>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + 'static,
    {
        let parent = self.clone();
        Behavior::from_fn(move || f(parent.pull()))
    }

    /// Pull this behavior, then pull the behavior `f` builds from its value
    pub fn flat_map<B, F>(&self, f: F) -> Behavior<B>
    where
        B: Clone + 'static,
        F: Fn(A) -> Behavior<B> + 'static,
    {
        let parent = self.clone();
        Behavior::from_fn(move || f(parent.pull()).pull())
    }

    /// Apply the current function of `fns` to the current value
    pub fn ap<B, F>(&self, fns: &Behavior<F>) -> Behavior<B>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + Clone + 'static,
    {
        Behavior::lift2(|value, f: F| f(value), self, fns)
    }

    /// Combine two behaviors, pulling them left to right
    pub fn lift2<B, C, F>(f: F, a: &Behavior<B>, b: &Behavior<C>) -> Behavior<A>
    where
        B: Clone + 'static,
        C: Clone + 'static,
        F: Fn(B, C) -> A + 'static,
    {
        let (a, b) = (a.clone(), b.clone());
        Behavior::from_fn(move || f(a.pull(), b.pull()))
    }

    pub fn lift3<B, C, D, F>(f: F, a: &Behavior<B>, b: &Behavior<C>, c: &Behavior<D>) -> Behavior<A>
    where
        B: Clone + 'static,
        C: Clone + 'static,
        D: Clone + 'static,
        F: Fn(B, C, D) -> A + 'static,
    {
        let (a, b, c) = (a.clone(), b.clone(), c.clone());
        Behavior::from_fn(move || f(a.pull(), b.pull(), c.pull()))
    }
}

impl<A: Clone + 'static> Behavior<Behavior<A>> {
    /// Pull the outer behavior, then immediately the inner one
    pub fn flatten(&self) -> Behavior<A> {
        self.flat_map(|inner: Behavior<A>| inner)
    }
}
