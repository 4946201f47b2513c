//! Timberline Core - Shared domain types for the storefront.
//!
//! This crate provides the types used across all Timberline components:
//! - `storefront` - Public HTTP API (cart, checkout, discount settings)
//! - `cli` - Command-line tools for migrations and discount management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Persistence is abstracted behind small traits
//! (see [`cart::CartStorage`]) that the storefront implements.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, customer contact, statuses
//! - [`cart`] - Cart state holder and its persistence seam
//! - [`discount`] - Discount codes and card-payment discount settings
//! - [`draft`] - Versioned order draft carried through checkout session metadata

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod discount;
pub mod draft;
pub mod types;

pub use cart::{Cart, CartItem, CartStorage, PersistentCart};
pub use discount::{AppliedDiscount, DiscountCode, DiscountKind, DiscountSettings};
pub use draft::{DraftError, OrderDraft, OrderDraftItem};
pub use types::*;
