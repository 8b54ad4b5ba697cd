//! Product domain types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use tienda_core::{Price, ProductId};

/// Maximum length accepted for a product name.
pub const MAX_NAME_LENGTH: usize = 200;

/// Validation failures for product input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductValidationError {
    #[error("el nombre es obligatorio")]
    EmptyName,
    #[error("el nombre admite como máximo {MAX_NAME_LENGTH} caracteres")]
    NameTooLong,
    #[error("el stock no puede ser negativo")]
    NegativeStock,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub image_ref: String,
    pub price: Price,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The editable fields of this product.
    #[must_use]
    pub fn to_new(&self) -> NewProduct {
        NewProduct {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            image_ref: self.image_ref.clone(),
            price: self.price,
            stock: self.stock,
        }
    }

    /// Whether any unit is left.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Validated input for creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub category: String,
    pub image_ref: String,
    pub price: Price,
    pub stock: i32,
}

impl NewProduct {
    /// Build product input, trimming text fields.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductValidationError`] if the name is blank or too long,
    /// or if the stock is negative. Price positivity is guaranteed by [`Price`].
    pub fn new(
        name: &str,
        description: &str,
        category: &str,
        image_ref: &str,
        price: Price,
        stock: i32,
    ) -> Result<Self, ProductValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProductValidationError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(ProductValidationError::NameTooLong);
        }
        if stock < 0 {
            return Err(ProductValidationError::NegativeStock);
        }

        Ok(Self {
            name: name.to_owned(),
            description: description.trim().to_owned(),
            category: category.trim().to_owned(),
            image_ref: image_ref.trim().to_owned(),
            price,
            stock,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        Price::parse(s).unwrap()
    }

    #[test]
    fn test_new_product_trims_fields() {
        let p = NewProduct::new("  Café  ", " Tostado ", " Bebidas", "cafe.jpg ", price("4.50"), 3)
            .unwrap();
        assert_eq!(p.name, "Café");
        assert_eq!(p.description, "Tostado");
        assert_eq!(p.category, "Bebidas");
        assert_eq!(p.image_ref, "cafe.jpg");
    }

    #[test]
    fn test_new_product_rejects_blank_name() {
        assert_eq!(
            NewProduct::new("   ", "", "", "", price("1"), 0),
            Err(ProductValidationError::EmptyName)
        );
    }

    #[test]
    fn test_new_product_rejects_negative_stock() {
        assert_eq!(
            NewProduct::new("Té", "", "", "", price("1"), -1),
            Err(ProductValidationError::NegativeStock)
        );
    }

    #[test]
    fn test_new_product_allows_zero_stock() {
        assert!(NewProduct::new("Té", "", "", "", price("1"), 0).is_ok());
    }

    #[test]
    fn test_new_product_rejects_long_name() {
        let name = "x".repeat(MAX_NAME_LENGTH + 1);
        assert_eq!(
            NewProduct::new(&name, "", "", "", price("1"), 1),
            Err(ProductValidationError::NameTooLong)
        );
    }
}
