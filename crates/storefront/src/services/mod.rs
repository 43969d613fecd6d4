//! Business logic services for storefront.
//!
//! Services borrow their collaborators for the length of one request and
//! are cheap to build in a handler:
//!
//! ```rust,ignore
//! let order = CheckoutService::new(repo, payments, locks, timeout)
//!     .complete_checkout(user.id, reference)
//!     .await?;
//! ```
//!
//! # Services
//!
//! - `auth` - Registration, admin creation, password login
//! - `cart` - Per-user cart lines
//! - `checkout` - Payment intents, cart-to-order conversion, free reports
//! - `orders` - Order history and status updates
//! - `catalog` - Reports, educational content, testimonials
//! - `payments` - Payment provider client

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod payments;
