//! Components
//!
//! A [`Component`] is a render procedure: given a [`RenderTarget`] it appends
//! its children and answers a [`Rendered`] pair. The `output` half is what
//! the component exposes; the `available` half holds values a caller may pick
//! from with [`Component::output`] or [`Component::lift_output`]. Nothing is
//! rendered until [`Component::render`] or [`Component::mount`] is called, and
//! every call renders again.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::error::{ComponentError, Result};
use crate::output::Outputs;

/// A rendered child as seen by the host
pub type Child = Box<dyn Any>;

/// Where components place their children
///
/// The only capability a component needs from its host.
pub trait RenderTarget {
    fn append_child(&mut self, child: Child);
}

/// Collects children in the order they were appended
impl RenderTarget for Vec<Child> {
    fn append_child(&mut self, child: Child) {
        self.push(child);
    }
}

/// The result of one render
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendered<O, A = ()> {
    /// Values a caller can select into the output
    pub available: A,
    /// Values the component exposes
    pub output: O,
}

type MountFn<O, A> = dyn Fn(&mut dyn RenderTarget) -> Result<Rendered<O, A>>;

/// A renderable unit producing an `O`, with `A` available for selection
pub struct Component<O, A = ()> {
    mount: Rc<MountFn<O, A>>,
}

impl<O, A> Clone for Component<O, A> {
    fn clone(&self) -> Self {
        Self {
            mount: Rc::clone(&self.mount),
        }
    }
}

impl<O, A> fmt::Debug for Component<O, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component").finish_non_exhaustive()
    }
}

impl<O: 'static> Component<O> {
    /// Renders nothing and answers `value`
    pub fn of(value: O) -> Self
    where
        O: Clone,
    {
        Self::from_render(move |_| value.clone())
    }

    pub fn from_render<F>(render: F) -> Self
    where
        F: Fn(&mut dyn RenderTarget) -> O + 'static,
    {
        Self::try_from_render(move |target| Ok(render(target)))
    }

    /// A render procedure that can fail
    pub fn try_from_render<F>(render: F) -> Self
    where
        F: Fn(&mut dyn RenderTarget) -> Result<O> + 'static,
    {
        Self::try_from_mount(move |target| {
            render(target).map(|output| Rendered {
                available: (),
                output,
            })
        })
    }

    /// Render `a` then `b` and combine their outputs
    pub fn lift2<B, C, X, Y, F>(f: F, a: &Component<B, X>, b: &Component<C, Y>) -> Component<O>
    where
        B: 'static,
        C: 'static,
        X: 'static,
        Y: 'static,
        F: Fn(B, C) -> O + 'static,
    {
        let (a, b) = (a.clone(), b.clone());
        Component::try_from_render(move |target| {
            let x = a.render(target)?;
            let y = b.render(target)?;
            Ok(f(x, y))
        })
    }
}

impl<O: 'static, A: 'static> Component<O, A> {
    /// A render procedure answering both halves
    pub fn try_from_mount<F>(mount: F) -> Self
    where
        F: Fn(&mut dyn RenderTarget) -> Result<Rendered<O, A>> + 'static,
    {
        Self {
            mount: Rc::new(mount),
        }
    }

    /// Renders nothing and answers fixed `available` and `output` values
    pub fn with_available(available: A, output: O) -> Self
    where
        A: Clone,
        O: Clone,
    {
        Self::try_from_mount(move |_| {
            Ok(Rendered {
                available: available.clone(),
                output: output.clone(),
            })
        })
    }

    /// Render into `target` and return both halves
    pub fn mount(&self, target: &mut dyn RenderTarget) -> Result<Rendered<O, A>> {
        (self.mount)(target)
    }

    /// Render into `target` and return the output
    pub fn render(&self, target: &mut dyn RenderTarget) -> Result<O> {
        self.mount(target).map(|rendered| rendered.output)
    }

    pub fn map<B, F>(&self, f: F) -> Component<B, A>
    where
        B: 'static,
        F: Fn(O) -> B + 'static,
    {
        let parent = self.clone();
        Component::try_from_mount(move |target| {
            let Rendered { available, output } = parent.mount(target)?;
            Ok(Rendered {
                available,
                output: f(output),
            })
        })
    }

    /// Render this, then the component `f` builds from its output, into the
    /// same target
    ///
    /// The available values are this component's.
    pub fn flat_map<B, X, F>(&self, f: F) -> Component<B, A>
    where
        B: 'static,
        X: 'static,
        F: Fn(O) -> Component<B, X> + 'static,
    {
        let parent = self.clone();
        Component::try_from_mount(move |target| {
            let Rendered { available, output } = parent.mount(target)?;
            let output = f(output).render(target)?;
            Ok(Rendered { available, output })
        })
    }

    /// Render this, then `fns`, and apply its function to this output
    pub fn ap<B, X, F>(&self, fns: &Component<F, X>) -> Component<B, A>
    where
        B: 'static,
        X: 'static,
        F: Fn(O) -> B + 'static,
    {
        let (parent, fns) = (self.clone(), fns.clone());
        Component::try_from_mount(move |target| {
            let Rendered { available, output } = parent.mount(target)?;
            let f = fns.render(target)?;
            Ok(Rendered {
                available,
                output: f(output),
            })
        })
    }

    /// Replace the output with one built from the available values
    pub fn lift_output<P, F>(&self, f: F) -> Component<P, A>
    where
        A: Clone,
        P: 'static,
        F: Fn(A) -> P + 'static,
    {
        let parent = self.clone();
        Component::try_from_mount(move |target| {
            let Rendered { available, .. } = parent.mount(target)?;
            Ok(Rendered {
                output: f(available.clone()),
                available,
            })
        })
    }
}

impl<O: 'static, X: 'static, A: 'static> Component<Component<O, X>, A> {
    pub fn flatten(&self) -> Component<O, A> {
        self.flat_map(|inner: Component<O, X>| inner)
    }
}

impl Component<()> {
    /// Appends a fresh child built by `make` on every render
    pub fn child<C, F>(make: F) -> Self
    where
        C: Any,
        F: Fn() -> C + 'static,
    {
        Self::from_render(move |target| target.append_child(Box::new(make())))
    }
}

impl Component<Outputs> {
    /// Render `components` in order against one target and merge their outputs
    ///
    /// When two components produce the same key the later one wins.
    pub fn merge<I>(components: I) -> Self
    where
        I: IntoIterator<Item = Component<Outputs>>,
    {
        let components: Vec<_> = components.into_iter().collect();
        Self::try_from_render(move |target| {
            components
                .iter()
                .try_fold(Outputs::new(), |merged, component| {
                    Ok(merged.merge(component.render(target)?))
                })
        })
    }
}

impl Component<Outputs, Outputs> {
    /// Copy available values into the output
    ///
    /// Each `(name, key)` pair exposes the available value `key` as output
    /// `name`. Existing output keys are kept unless a selection overrides
    /// them. Selecting a key that is not available fails the render with
    /// [`ComponentError::Unavailable`].
    pub fn output<I, N, K>(&self, selection: I) -> Self
    where
        I: IntoIterator<Item = (N, K)>,
        N: Into<String>,
        K: Into<String>,
    {
        let selection: Vec<(String, String)> = selection
            .into_iter()
            .map(|(name, key)| (name.into(), key.into()))
            .collect();
        let parent = self.clone();
        Self::try_from_mount(move |target| {
            let Rendered { available, output } = parent.mount(target)?;
            let mut selected = Outputs::new();
            for (name, key) in &selection {
                let slot = available
                    .raw(key)
                    .ok_or_else(|| ComponentError::Unavailable { key: key.clone() })?;
                selected.insert_raw(name.clone(), slot);
            }
            Ok(Rendered {
                available,
                output: output.merge(selected),
            })
        })
    }
}
