//! Statement result caching.
//!
//! A [`CacheModel`] memoizes whole statement results under a [`CacheKey`]
//! built from the statement id, the connection identity, the bound values
//! and the SQL text. Eviction is delegated to a [`CacheController`].

mod controller;
mod key;
mod model;

pub use controller::{
    CacheController, CacheEntry, FifoController, LruController, UnboundedController,
};
pub use key::CacheKey;
pub use model::CacheModel;
