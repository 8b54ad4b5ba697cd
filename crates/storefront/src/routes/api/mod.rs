//! JSON API routes.
//!
//! Used by scripts on the catalog and cart pages; the HTML forms remain the
//! primary interface.

pub mod cart;
