//! Timberline storefront library.
//!
//! The cart, checkout and discount API as a library, so the binary, the CLI
//! and the tests share one router and one set of repositories.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;

#[cfg(test)]
mod test_support;
