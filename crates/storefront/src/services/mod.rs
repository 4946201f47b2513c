//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Session-backed cart storage
//! - `checkout` - Hosted checkout session creation and order confirmation
//! - `discounts` - Card-payment discount settings and discount code redemption
//! - `orders` - Orders confirmed in the visitor's session

pub mod cart;
pub mod checkout;
pub mod discounts;
pub mod orders;
