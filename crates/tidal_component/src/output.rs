//! Keyed component outputs
//!
//! A rendered component answers an [`Outputs`] record: named reactive values
//! kept in insertion order. Each entry is a [`Slot`], so an output can be a
//! real stream, behavior or future, or a placeholder that is bound later by
//! feedback wiring.

use std::any::{type_name, Any};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use tidal_core::{Behavior, Future, Kind, Placeholder, Reactive, Slot, Stream};

use crate::error::{ComponentError, Result};

/// Type-erased view of a [`Slot`] stored in [`Outputs`]
pub trait OutputSlot {
    fn as_any(&self) -> &dyn Any;

    fn kind(&self) -> Kind;

    /// Whether the slot still wraps a placeholder
    fn is_placeholder(&self) -> bool;

    /// The slot with a bound placeholder swapped for its target
    fn settled(&self) -> Rc<dyn OutputSlot>;

    fn type_name(&self) -> &'static str;
}

impl<R: Reactive> OutputSlot for Slot<R> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn kind(&self) -> Kind {
        R::KIND
    }

    fn is_placeholder(&self) -> bool {
        Slot::is_placeholder(self)
    }

    fn settled(&self) -> Rc<dyn OutputSlot> {
        Rc::new(self.clone().settle())
    }

    fn type_name(&self) -> &'static str {
        type_name::<R>()
    }
}

/// Values that can be stored as an output
pub trait IntoOutput {
    type Reactive: Reactive;

    fn into_slot(self) -> Slot<Self::Reactive>;
}

impl<A: Clone + 'static> IntoOutput for Stream<A> {
    type Reactive = Stream<A>;

    fn into_slot(self) -> Slot<Self::Reactive> {
        Slot::Ready(self)
    }
}

impl<A: Clone + 'static> IntoOutput for Behavior<A> {
    type Reactive = Behavior<A>;

    fn into_slot(self) -> Slot<Self::Reactive> {
        Slot::Ready(self)
    }
}

impl<A: Clone + 'static> IntoOutput for Future<A> {
    type Reactive = Future<A>;

    fn into_slot(self) -> Slot<Self::Reactive> {
        Slot::Ready(self)
    }
}

impl<R: Reactive> IntoOutput for Placeholder<R> {
    type Reactive = R;

    fn into_slot(self) -> Slot<R> {
        Slot::Pending(self)
    }
}

impl<R: Reactive> IntoOutput for Slot<R> {
    type Reactive = R;

    fn into_slot(self) -> Slot<R> {
        self
    }
}

type SlotMap = IndexMap<String, Rc<dyn OutputSlot>, FxBuildHasher>;

/// Named outputs of a rendered component, in insertion order
#[derive(Clone, Default)]
pub struct Outputs {
    slots: SlotMap,
}

impl fmt::Debug for Outputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|(key, slot)| (key, slot.kind())))
            .finish()
    }
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Outputs::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl IntoOutput) -> Self {
        self.insert(key, value);
        self
    }

    /// Store `value` under `key`, returning the slot it replaced
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl IntoOutput,
    ) -> Option<Rc<dyn OutputSlot>> {
        self.slots.insert(key.into(), Rc::new(value.into_slot()))
    }

    pub(crate) fn raw(&self, key: &str) -> Option<Rc<dyn OutputSlot>> {
        self.slots.get(key).cloned()
    }

    pub(crate) fn insert_raw(&mut self, key: String, slot: Rc<dyn OutputSlot>) {
        self.slots.insert(key, slot);
    }

    /// The slot stored under `key`, typed
    pub fn slot<R: Reactive>(&self, key: &str) -> Result<Slot<R>> {
        let slot = self
            .slots
            .get(key)
            .ok_or_else(|| ComponentError::MissingOutput {
                key: key.to_string(),
            })?;
        slot.as_any()
            .downcast_ref::<Slot<R>>()
            .cloned()
            .ok_or_else(|| ComponentError::TypeMismatch {
                key: key.to_string(),
                expected: type_name::<R>(),
            })
    }

    /// The reactive value stored under `key`
    ///
    /// An unbound placeholder comes back as a node that forwards to it.
    pub fn get<R: Reactive>(&self, key: &str) -> Result<R> {
        self.slot::<R>(key).map(|slot| slot.to_reactive())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Keys whose slot still wraps a placeholder
    pub fn placeholder_keys(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.is_placeholder())
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Union of both records; keys from `other` win on collision
    pub fn merge(mut self, other: Outputs) -> Outputs {
        for (key, slot) in other.slots {
            if self.slots.contains_key(&key) {
                tracing::debug!("output `{}` overridden by a later component", key);
            }
            self.slots.insert(key, slot);
        }
        self
    }

    /// Every bound placeholder swapped for its target
    pub fn settled(&self) -> Outputs {
        Outputs {
            slots: self
                .slots
                .iter()
                .map(|(key, slot)| (key.clone(), slot.settled()))
                .collect(),
        }
    }
}
