use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Payment;

/// Provider notification body. `reference` is the charge reference this
/// service handed out at initiation.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PaymentCallbackRequest {
    pub reference: String,
    /// `completed` or `failed`.
    pub status: String,
    pub amount: Option<i64>,
}

/// Result of initiating a payment. `instructions` carries the wallet approval
/// prompt when the rail has one.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentInitiated {
    pub payment: Payment,
    pub instructions: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PaymentList {
    #[schema(value_type = Vec<Payment>)]
    pub items: Vec<Payment>,
}
