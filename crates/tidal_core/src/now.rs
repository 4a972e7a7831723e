//! Ordered effects
//!
//! A [`Now`] describes side effects that produce a value. Nothing happens
//! until [`Now::run`]; each run performs every composed effect exactly once,
//! left to right in composition order. Running the same `Now` twice repeats
//! all of its effects, so one-time setup belongs in a top-level `Now` that is
//! run once.

use std::fmt;
use std::rc::Rc;

enum NowNode<A> {
    Pure(A),
    Effect(Box<dyn Fn() -> A>),
}

/// A description of ordered effects producing an `A`
pub struct Now<A> {
    node: Rc<NowNode<A>>,
}

impl<A> Clone for Now<A> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<A> fmt::Debug for Now<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pure = matches!(&*self.node, NowNode::Pure(_));
        f.debug_struct("Now").field("pure", &pure).finish()
    }
}

impl<A: Clone + 'static> Now<A> {
    /// No effect, answers `value`
    pub fn of(value: A) -> Self {
        Self {
            node: Rc::new(NowNode::Pure(value)),
        }
    }

    /// An effect performed on every run
    pub fn effect<F>(f: F) -> Self
    where
        F: Fn() -> A + 'static,
    {
        Self {
            node: Rc::new(NowNode::Effect(Box::new(f))),
        }
    }

    /// Perform the effects and return the result
    pub fn run(&self) -> A {
        match &*self.node {
            NowNode::Pure(value) => value.clone(),
            NowNode::Effect(f) => f(),
        }
    }

    pub fn map<B, F>(&self, f: F) -> Now<B>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + 'static,
    {
        let parent = self.clone();
        Now::effect(move || f(parent.run()))
    }

    /// Run this, feed the result to `f`, then run the `Now` it returns
    pub fn flat_map<B, F>(&self, f: F) -> Now<B>
    where
        B: Clone + 'static,
        F: Fn(A) -> Now<B> + 'static,
    {
        let parent = self.clone();
        Now::effect(move || f(parent.run()).run())
    }

    /// Run this, then `fns`, and apply the function to the value
    pub fn ap<B, F>(&self, fns: &Now<F>) -> Now<B>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + Clone + 'static,
    {
        Now::lift2(|value, f: F| f(value), self, fns)
    }

    /// Run `a` then `b` and combine their results
    pub fn lift2<B, C, F>(f: F, a: &Now<B>, b: &Now<C>) -> Now<A>
    where
        B: Clone + 'static,
        C: Clone + 'static,
        F: Fn(B, C) -> A + 'static,
    {
        let (a, b) = (a.clone(), b.clone());
        Now::effect(move || {
            let x = a.run();
            let y = b.run();
            f(x, y)
        })
    }

    pub fn lift3<B, C, D, F>(f: F, a: &Now<B>, b: &Now<C>, c: &Now<D>) -> Now<A>
    where
        B: Clone + 'static,
        C: Clone + 'static,
        D: Clone + 'static,
        F: Fn(B, C, D) -> A + 'static,
    {
        let (a, b, c) = (a.clone(), b.clone(), c.clone());
        Now::effect(move || {
            let x = a.run();
            let y = b.run();
            let z = c.run();
            f(x, y, z)
        })
    }
}

impl<A: Clone + 'static> Now<Now<A>> {
    pub fn flatten(&self) -> Now<A> {
        self.flat_map(|inner: Now<A>| inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn logging(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str, value: i32) -> Now<i32> {
        let log = log.clone();
        Now::effect(move || {
            log.borrow_mut().push(name);
            value
        })
    }

    #[test]
    fn test_constant() {
        assert_eq!(Now::of(1).run(), 1);
    }

    #[test]
    fn test_map() {
        assert_eq!(Now::of(2).map(|n| n * 2).run(), 4);
    }

    #[test]
    fn test_flatten() {
        let inner = Now::of(Now::of(1)).run();
        assert_eq!(inner.run(), 1);
        assert_eq!(Now::of(Now::of(1)).flatten().run(), 1);
    }

    #[test]
    fn test_ap() {
        let fns = Now::of(|n: i32| n * 2);
        assert_eq!(Now::of(21).ap(&fns).run(), 42);
    }

    #[test]
    fn test_lift() {
        let sum = Now::lift2(|n: i32, m: i32| n + m, &Now::of(20), &Now::of(10));
        assert_eq!(sum.run(), 30);
    }

    #[test]
    fn test_effects_run_in_composition_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = logging(&log, "first", 1);
        let second = logging(&log, "second", 2);
        let third = logging(&log, "third", 3);

        let combined = Now::lift3(|a, b, c| a + b + c, &first, &second, &third);
        assert!(log.borrow().is_empty());

        assert_eq!(combined.run(), 6);
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_flat_map_runs_each_effect_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let inner_log = log.clone();
        let chained = logging(&log, "outer", 2).flat_map(move |n| logging(&inner_log, "inner", n * 21));

        assert_eq!(chained.run(), 42);
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_rerun_repeats_effects() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let now = logging(&log, "setup", 0).map(|n| n + 1);

        now.run();
        now.run();
        assert_eq!(*log.borrow(), vec!["setup", "setup"]);
    }
}
