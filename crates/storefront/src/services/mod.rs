//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Sign-up, sign-in, password reset and session token minting
//! - `session_guard` - Single-active-session check for course playback
//! - `cart` - Cart rows with quantity floor and stock checks
//! - `checkout` - Order placement and course enrollment after payment
//! - `ratings` - Write-once product ratings and reviews
//! - `payment` - Checkout widget options and payment confirmations
//! - `messaging` - Prefilled chat links for order follow-up
//! - `image_host` - Product image uploads
//! - `email` - Transactional email

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod image_host;
pub mod messaging;
pub mod payment;
pub mod ratings;
pub mod session_guard;
