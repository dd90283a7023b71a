//! Knotwork Core - Shared domain types and rules.
//!
//! This crate provides the types and pure business rules used across all
//! Knotwork components:
//! - `storefront` - Public shop and course player
//! - `admin` - Back office for products, orders, courses and enrollments
//! - `cli` - Migrations, seeding and account management
//!
//! # Architecture
//!
//! The core crate contains only types and decision functions - no I/O, no
//! database access, no HTTP clients. Everything here can be tested without a
//! document store.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, prices, emails and statuses
//! - [`cart`] - Cart line arithmetic and order totals
//! - [`video`] - Video id extraction from sharing URLs
//! - [`rating`] - Rating scores and the running aggregate
//! - [`enrollment`] - Course access gating
//! - [`session`] - Single-active-session decision rule

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod enrollment;
pub mod rating;
pub mod session;
pub mod types;
pub mod video;

pub use types::*;
