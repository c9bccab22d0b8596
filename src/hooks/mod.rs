//! Entity mutation hooks and the events they emit.

mod dispatcher;
mod events;

pub use dispatcher::HookDispatcher;
pub use events::{InvalidationEvent, MutationEvent};
