//! Core types for Timberline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod id;
pub mod money;
pub mod status;

pub use contact::{ContactError, CustomerContact, Email};
pub use id::*;
pub use money::{CurrencyCode, Money, MoneyError};
pub use status::*;
