//! Domain models for storefront.
//!
//! Cart and discount types live in `timberline-core`; this module holds the
//! persisted order types.

pub mod order;

pub use order::{NewOrder, Order, OrderCreation, OrderItem, OrderWithItems};
