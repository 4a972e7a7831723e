//! Tidal Core
//!
//! The reactive primitives every other Tidal crate builds on:
//!
//! - **Streams**: discrete events pushed to subscribers in order
//! - **Behaviors**: continuous values read by pulling
//! - **Futures**: values that arrive once
//! - **Now**: ordered effects that produce a value when run
//! - **Placeholders**: stand-ins that record operations and replay them once
//!   bound, used to wire feedback loops
//!
//! Everything here is single-threaded and synchronous. A push delivers to
//! every listener before it returns, and a listener may push again from inside
//! its callback.
//!
//! # Example
//!
//! ```rust
//! use tidal_core::Sink;
//!
//! let clicks = Sink::new();
//! let count = clicks.stream().accum(|n: u32, _: ()| n + 1, 0).pull();
//!
//! clicks.push(());
//! clicks.push(());
//! assert_eq!(count.pull(), 2);
//! ```

pub mod behavior;
pub mod error;
pub mod future;
pub mod listener;
pub mod now;
pub mod placeholder;
pub mod stream;

pub use behavior::Behavior;
pub use error::{ReactiveError, Result};
pub use future::{AsyncSource, Future, Resolver};
pub use listener::{Listener, Target};
pub use now::Now;
pub use placeholder::{DeferredCall, Kind, Operation, Placeholder, Reactive, Slot};
pub use stream::{Either, Sink, Stream};
