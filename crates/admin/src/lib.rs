//! Knotwork back office library.
//!
//! Catalog, course and order management for operators. Shares the document
//! store, repositories and account checks with the storefront crate.
//!
//! Only accounts whose profile carries the admin role can sign in, and the
//! role is checked again on every request.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
