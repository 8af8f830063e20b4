use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, FieldError};
use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    /// Price in minor units of the configured currency.
    pub price: i64,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
        }
        if self.price <= 0 {
            errors.push(FieldError::new("price", "must be greater than 0"));
        }
        if self.stock < 0 {
            errors.push(FieldError::new("stock", "must not be negative"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateProductRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                errors.push(FieldError::new("name", "must not be empty"));
            }
        }
        if let Some(price) = self.price {
            if price <= 0 {
                errors.push(FieldError::new("price", "must be greater than 0"));
            }
        }
        if let Some(stock) = self.stock {
            if stock < 0 {
                errors.push(FieldError::new("stock", "must not be negative"));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_empty_name_and_bad_price() {
        let req = CreateProductRequest {
            name: "  ".into(),
            description: None,
            price: 0,
            stock: -1,
            category_id: None,
            image_url: None,
        };
        match req.validate() {
            Err(AppError::Validation(fields)) => assert_eq!(fields.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn update_allows_partial_payloads() {
        let req = UpdateProductRequest {
            name: None,
            description: Some("restocked".into()),
            price: None,
            stock: Some(12),
            category_id: None,
            image_url: None,
            is_active: Some(true),
        };
        assert!(req.validate().is_ok());
    }
}
