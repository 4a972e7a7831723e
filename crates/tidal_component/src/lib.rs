//! Tidal Components
//!
//! Rendering on top of `tidal_core`:
//!
//! - **Component**: a render procedure that appends children to a
//!   [`RenderTarget`] and answers an output
//! - **Outputs**: named reactive values a component exposes
//! - **Feedback**: components that consume their own outputs through
//!   placeholders bound after rendering
//!
//! # Example
//!
//! ```rust
//! use tidal_component::{Child, Component, Outputs};
//! use tidal_core::Behavior;
//!
//! let header = Component::child(|| "header").map(|_| Outputs::new().with("title", Behavior::of("Tidal")));
//! let body = Component::child(|| "body").map(|_| Outputs::new().with("items", Behavior::of(3)));
//!
//! let mut children: Vec<Child> = Vec::new();
//! let outputs = Component::merge([header, body]).render(&mut children).unwrap();
//!
//! assert_eq!(children.len(), 2);
//! assert_eq!(outputs.get::<Behavior<i32>>("items").unwrap().pull(), 3);
//! ```

pub mod component;
pub mod error;
pub mod feedback;
pub mod output;

pub use component::{Child, Component, RenderTarget, Rendered};
pub use error::{ComponentError, Result};
pub use feedback::{feedback, LoopInputs};
pub use output::{IntoOutput, OutputSlot, Outputs};
