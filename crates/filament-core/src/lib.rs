//! # Observables, bindings and the update queue
//!
//! - [`SubscriberSet`] / [`PropertyChangeNotifier`]: per-object publish/subscribe.
//! - [`Observable`], [`Observed`], [`Accessor`]: fields whose reads are tracked
//!   and whose writes notify.
//! - [`BindingObserver`]: evaluates a binding and subscribes to exactly what it read.
//! - [`queue_update`] / [`process_updates`]: one batched flush per frame.
//! - [`ObservableVec`] and [`calc_splices`]: collection changes as minimal splices.

pub mod array;
pub mod binding;
pub mod context;
pub mod error;
pub mod identity;
pub mod notify;
pub mod observable;
pub mod prelude;
pub mod scheduler;
pub mod splice;
pub mod tests;

pub use array::*;
pub use binding::*;
pub use context::*;
pub use error::*;
pub use identity::*;
pub use notify::*;
pub use observable::*;
pub use scheduler::*;
pub use splice::*;
