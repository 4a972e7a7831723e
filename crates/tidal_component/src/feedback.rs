//! Feedback wiring
//!
//! [`feedback`] lets a component consume its own outputs. The builder asks
//! [`LoopInputs`] for a placeholder per key, derives whatever it needs from
//! them, and returns the component whose outputs will eventually satisfy
//! those keys. After rendering, each placeholder is bound to the output of
//! the same name and its recorded operations are replayed:
//!
//! ```rust
//! use tidal_component::{feedback, Child, Component, Outputs};
//! use tidal_core::{Behavior, Now};
//!
//! let component = feedback(|inputs| {
//!     let looped = inputs.behavior::<i32>("looped");
//!     Now::of(Component::of(
//!         Outputs::new()
//!             .with("looped", Behavior::of(2))
//!             .with("a", looped.map(|v| v + 40)),
//!     ))
//! });
//!
//! let mut children: Vec<Child> = Vec::new();
//! let outputs = component.render(&mut children).unwrap();
//! assert_eq!(outputs.get::<Behavior<i32>>("a").unwrap().pull(), 42);
//! ```

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use tidal_core::{Behavior, Future, Now, Placeholder, Reactive, Stream};

use crate::component::{Component, Rendered};
use crate::error::{ComponentError, Result};
use crate::output::Outputs;

/// A placeholder registered under a key, with its type erased
trait LoopedPlaceholder {
    fn as_any(&self) -> &dyn Any;

    /// Bind to the output stored under `key`
    fn tie_off(&self, key: &str, outputs: &Outputs) -> Result<()>;
}

impl<R: Reactive> LoopedPlaceholder for Placeholder<R> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn tie_off(&self, key: &str, outputs: &Outputs) -> Result<()> {
        let target = outputs.get::<R>(key)?;
        self.replace_with(target)?;
        Ok(())
    }
}

/// Lazily populated key to placeholder registry handed to a feedback builder
///
/// The first access to a key creates its placeholder; later accesses at the
/// same type answer that same placeholder.
#[derive(Default)]
pub struct LoopInputs {
    placeholders: RefCell<IndexMap<String, Rc<dyn LoopedPlaceholder>, FxBuildHasher>>,
    conflicts: RefCell<Vec<ComponentError>>,
}

impl LoopInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// The placeholder for `key`
    ///
    /// Asking for a key already handed out at another type answers a
    /// detached placeholder and makes the render fail with
    /// [`ComponentError::TypeMismatch`].
    pub fn placeholder<R: Reactive>(&self, key: &str) -> Placeholder<R> {
        let mut placeholders = self.placeholders.borrow_mut();
        if let Some(existing) = placeholders.get(key) {
            if let Some(placeholder) = existing.as_any().downcast_ref::<Placeholder<R>>() {
                return placeholder.clone();
            }
            tracing::debug!("looped input `{}` requested at a second type", key);
            self.conflicts
                .borrow_mut()
                .push(ComponentError::TypeMismatch {
                    key: key.to_string(),
                    expected: type_name::<R>(),
                });
            return Placeholder::new();
        }

        let placeholder = Placeholder::new();
        placeholders.insert(key.to_string(), Rc::new(placeholder.clone()));
        placeholder
    }

    pub fn stream<A: Clone + 'static>(&self, key: &str) -> Placeholder<Stream<A>> {
        self.placeholder(key)
    }

    pub fn behavior<A: Clone + 'static>(&self, key: &str) -> Placeholder<Behavior<A>> {
        self.placeholder(key)
    }

    pub fn future<A: Clone + 'static>(&self, key: &str) -> Placeholder<Future<A>> {
        self.placeholder(key)
    }

    /// Keys accessed so far, in access order
    pub fn keys(&self) -> Vec<String> {
        self.placeholders.borrow().keys().cloned().collect()
    }

    /// Bind every accessed placeholder to its output and settle the outputs
    ///
    /// Fails before binding anything if a key was accessed at two types or if
    /// an accessed key has no output.
    pub fn tie_off(&self, outputs: Outputs) -> Result<Outputs> {
        if let Some(conflict) = self.conflicts.borrow_mut().drain(..).next() {
            return Err(conflict);
        }

        let looped: Vec<_> = self
            .placeholders
            .borrow()
            .iter()
            .map(|(key, placeholder)| (key.clone(), Rc::clone(placeholder)))
            .collect();

        if let Some((key, _)) = looped.iter().find(|(key, _)| !outputs.contains_key(key)) {
            return Err(ComponentError::MissingOutput { key: key.clone() });
        }

        for (key, placeholder) in &looped {
            placeholder.tie_off(key, &outputs)?;
        }
        tracing::debug!("tied off {} looped inputs", looped.len());

        Ok(outputs.settled())
    }
}

/// A component whose outputs feed back into its own construction
///
/// Every render builds a fresh [`LoopInputs`], runs the builder's [`Now`],
/// renders the resulting component and ties the looped inputs off against its
/// outputs. The outputs returned never hold a bound placeholder; the available
/// values pass through untouched.
pub fn feedback<A, F>(builder: F) -> Component<Outputs, A>
where
    A: 'static,
    F: Fn(&LoopInputs) -> Now<Component<Outputs, A>> + 'static,
{
    Component::try_from_mount(move |target| {
        let inputs = LoopInputs::new();
        let component = builder(&inputs).run();
        let Rendered { available, output } = component.mount(target)?;
        Ok(Rendered {
            available,
            output: inputs.tie_off(output)?,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Child;
    use std::cell::Cell;
    use tidal_core::{ReactiveError, Sink};

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn render(component: &Component<Outputs>) -> Result<Outputs> {
        let mut children: Vec<Child> = Vec::new();
        component.render(&mut children)
    }

    #[test]
    fn test_looped_behavior() {
        init_logging();
        let component = feedback(|inputs| {
            let looped = inputs.behavior::<i32>("looped");
            Now::of(Component::of(
                Outputs::new()
                    .with("looped", Behavior::of(2))
                    .with("a", looped.map(|v| v + 40)),
            ))
        });

        let outputs = render(&component).unwrap();
        assert_eq!(outputs.get::<Behavior<i32>>("a").unwrap().pull(), 42);
    }

    #[test]
    fn test_missing_looped_output() {
        let component = feedback(|inputs| {
            let looped = inputs.behavior::<i32>("looped");
            Now::of(Component::of(
                Outputs::new().with("a", looped.map(|v| v + 40)),
            ))
        });

        let err = render(&component).unwrap_err();
        assert_eq!(
            err,
            ComponentError::MissingOutput {
                key: "looped".to_string()
            }
        );
    }

    #[test]
    fn test_outputs_hold_no_placeholders() {
        let sink: Sink<i32> = Sink::new();
        let source = sink.stream();
        let component = feedback(move |inputs| {
            let doubled = inputs.stream::<i32>("doubled");
            let seen = doubled.latest(0).sample();
            Now::of(Component::of(
                Outputs::new()
                    .with("doubled", source.map(|n| n * 2))
                    .with("seen", seen),
            ))
        });

        let outputs = render(&component).unwrap();
        assert!(outputs.placeholder_keys().is_empty());

        let seen: Behavior<i32> = outputs.get("seen").unwrap();
        assert_eq!(seen.pull(), 0);
        sink.push(21);
        assert_eq!(seen.pull(), 42);
    }

    #[test]
    fn test_looped_future() {
        let component = feedback(|inputs| {
            let answer = inputs.future::<i32>("answer");
            Now::of(Component::of(
                Outputs::new()
                    .with("answer", Future::of(2))
                    .with("shifted", answer.map(|n| n + 40)),
            ))
        });

        let outputs = render(&component).unwrap();
        let shifted: Future<i32> = outputs.get("shifted").unwrap();
        assert_eq!(shifted.value(), Some(42));
    }

    #[test]
    fn test_inputs_are_memoized_per_key() {
        let inputs = LoopInputs::new();
        let first = inputs.behavior::<i32>("looped");
        let second = inputs.behavior::<i32>("looped");
        let _other = inputs.stream::<u8>("other");
        assert_eq!(inputs.keys(), vec!["looped".to_string(), "other".to_string()]);

        let outputs = Outputs::new()
            .with("looped", Behavior::of(1))
            .with("other", Sink::<u8>::new().stream());
        inputs.tie_off(outputs).unwrap();
        assert_eq!(first.pull().unwrap(), 1);
        assert_eq!(second.pull().unwrap(), 1);
    }

    #[test]
    fn test_input_type_conflict() {
        let component = feedback(|inputs| {
            let _events = inputs.stream::<i32>("looped");
            let _state = inputs.behavior::<i32>("looped");
            Now::of(Component::of(
                Outputs::new().with("looped", Behavior::of(2)),
            ))
        });

        let err = render(&component).unwrap_err();
        assert!(matches!(err, ComponentError::TypeMismatch { ref key, .. } if key == "looped"));
    }

    #[test]
    fn test_output_type_mismatch() {
        let component = feedback(|inputs| {
            let _looped = inputs.behavior::<i32>("looped");
            Now::of(Component::of(
                Outputs::new().with("looped", Sink::<i32>::new().stream()),
            ))
        });

        let err = render(&component).unwrap_err();
        assert!(matches!(err, ComponentError::TypeMismatch { .. }));
    }

    #[test]
    fn test_second_tie_off_fails() {
        let inputs = LoopInputs::new();
        let _looped = inputs.behavior::<i32>("looped");
        let outputs = Outputs::new().with("looped", Behavior::of(1));

        inputs.tie_off(outputs.clone()).unwrap();
        let err = inputs.tie_off(outputs).unwrap_err();
        assert!(matches!(
            err,
            ComponentError::Reactive(ReactiveError::DoubleBinding { .. })
        ));
    }

    #[test]
    fn test_without_looped_inputs() {
        let component = feedback(|_| Now::of(Component::of(Outputs::new().with("a", Behavior::of(1)))));
        let outputs = render(&component).unwrap();
        assert_eq!(outputs.get::<Behavior<i32>>("a").unwrap().pull(), 1);
    }

    #[test]
    fn test_builder_effects_run_per_render() {
        let builds = Rc::new(Cell::new(0));
        let counter = builds.clone();
        let component = feedback(move |_| {
            let counter = counter.clone();
            Now::effect(move || {
                counter.set(counter.get() + 1);
                Component::of(Outputs::new())
            })
        });

        render(&component).unwrap();
        render(&component).unwrap();
        assert_eq!(builds.get(), 2);
    }

    #[test]
    fn test_children_reach_the_host() {
        let component = feedback(|inputs| {
            let looped = inputs.behavior::<i32>("looped");
            Now::of(Component::child(|| "label").map(move |_| {
                Outputs::new()
                    .with("looped", Behavior::of(2))
                    .with("a", looped.clone())
            }))
        });

        let mut children: Vec<Child> = Vec::new();
        let outputs = component.render(&mut children).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(outputs.get::<Behavior<i32>>("a").unwrap().pull(), 2);
        assert!(outputs.placeholder_keys().is_empty());
    }

    #[test]
    fn test_selected_output_feeds_back() {
        let component = feedback(|inputs| {
            let looped = inputs.behavior::<i32>("looped");
            Now::of(
                Component::with_available(
                    Outputs::new().with("total", Behavior::of(2)),
                    Outputs::new().with("a", looped.map(|v| v + 40)),
                )
                .output([("looped", "total")]),
            )
        });

        let mut children: Vec<Child> = Vec::new();
        let rendered = component.mount(&mut children).unwrap();
        assert_eq!(rendered.output.get::<Behavior<i32>>("a").unwrap().pull(), 42);
        assert!(rendered.available.contains_key("total"));
    }
}
