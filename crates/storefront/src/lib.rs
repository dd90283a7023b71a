//! Knotwork storefront library.
//!
//! The public shop and course site: document store client, repositories,
//! services, middleware and routes. The admin binary links this crate for
//! the data layer.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
