//! Domain models for storefront.
//!
//! These are validated domain objects, separate from the row types used by
//! the repositories in [`crate::db`].

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{CartLine, LineItem, compute_total, item_count};
pub use order::{Order, OrderLine, OrderSummary, PlacedOrder};
pub use product::{NewProduct, Product, ProductValidationError};
pub use session::{CurrentUser, Flash, FlashLevel, keys as session_keys};
pub use user::User;
