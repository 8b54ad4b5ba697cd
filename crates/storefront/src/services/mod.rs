//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login, password hashing and reset tokens
//! - `cart` - Cart mutations with stock checks
//! - `checkout` - Atomic cart-to-order conversion
//! - `payment` - Simulated card validation
//! - `receipt` - PDF receipts and their storage
//! - `email` - Transactional email (password reset)

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod payment;
pub mod receipt;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService, CartView};
pub use checkout::{CheckoutError, CheckoutService};
pub use email::{EmailError, EmailService};
pub use payment::{CardDetails, PaymentError};
pub use receipt::{Receipt, ReceiptError, ReceiptService, ReceiptStore};
