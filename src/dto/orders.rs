use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, FieldError};
use crate::models::{Order, OrderItem, PaymentMethod};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub shipping_address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayOrderRequest {
    pub method: PaymentMethod,
    /// Wallet number, required for mobile-money methods.
    pub phone: Option<String>,
}

impl PayOrderRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.method.requires_phone() {
            let valid = self
                .phone
                .as_deref()
                .map(|p| p.chars().filter(|c| c.is_ascii_digit()).count() >= 8)
                .unwrap_or(false);
            if !valid {
                return Err(AppError::Validation(vec![FieldError::new(
                    "phone",
                    "a wallet phone number is required for this payment method",
                )]));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_methods_need_a_phone() {
        let req = PayOrderRequest {
            method: PaymentMethod::Wave,
            phone: None,
        };
        assert!(req.validate().is_err());

        let req = PayOrderRequest {
            method: PaymentMethod::Wave,
            phone: Some("+221 77 123 45 67".into()),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn card_and_cod_do_not_need_a_phone() {
        for method in [PaymentMethod::Card, PaymentMethod::CashOnDelivery] {
            let req = PayOrderRequest {
                method,
                phone: None,
            };
            assert!(req.validate().is_ok());
        }
    }
}
