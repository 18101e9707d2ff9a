//! Reference resolution and tracking propagation.
//!
//! A tag reference names where a tag's image comes from: a pull spec, another
//! tag, or an image already recorded in some stream. The [`Resolver`] turns a
//! reference into at most one candidate [`TagEvent`](ist_types::TagEvent).
//! The [`Propagator`] applies those candidates to a stream after its tag
//! references change, and forwards new head events to the tags that track
//! them.
//!
//! Streams other than the one being mutated are read through
//! [`StreamLookup`] and are never written here.

pub mod error;
pub mod propagate;
pub mod resolver;

pub use error::{ResolveError, Result};
pub use propagate::Propagator;
pub use resolver::{Resolver, StreamLookup};
