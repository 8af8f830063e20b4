use serde::Serialize;
use thiserror::Error;

use crate::config::PaymentConfig;
use crate::error::AppError;
use crate::models::{PaymentMethod, PaymentState};

pub mod aggregator;

pub use aggregator::AggregatorClient;

/// What the provider is asked to collect.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub phone: Option<String>,
}

/// Provider answer for an initiated charge.
#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    pub provider_ref: String,
    pub state: PaymentState,
    /// Wallet approval hint (USSD code or app prompt), when the rail has one.
    pub instructions: Option<String>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Provider(err.to_string())
    }
}

/// Charge gateway. Talks to the configured aggregator; falls back to the
/// sandbox when no provider credentials are set, which is also what the test
/// suite runs against.
#[derive(Clone)]
pub enum PaymentGateway {
    Aggregator(AggregatorClient),
    Sandbox(SandboxGateway),
}

impl PaymentGateway {
    pub fn from_config(config: &PaymentConfig) -> Result<Self, GatewayError> {
        match (&config.api_url, &config.api_key) {
            (Some(url), Some(key)) => {
                Ok(PaymentGateway::Aggregator(AggregatorClient::new(url, key)?))
            }
            _ => Ok(PaymentGateway::Sandbox(SandboxGateway)),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            PaymentGateway::Aggregator(_) => "aggregator",
            PaymentGateway::Sandbox(_) => "sandbox",
        }
    }

    pub async fn initiate(&self, charge: &ChargeRequest) -> Result<ChargeOutcome, GatewayError> {
        match self {
            PaymentGateway::Aggregator(client) => client.initiate(charge).await,
            PaymentGateway::Sandbox(sandbox) => Ok(sandbox.initiate(charge)),
        }
    }

    pub async fn verify(&self, provider_ref: &str) -> Result<PaymentState, GatewayError> {
        match self {
            PaymentGateway::Aggregator(client) => client.verify(provider_ref).await,
            PaymentGateway::Sandbox(sandbox) => Ok(sandbox.verify(provider_ref)),
        }
    }
}

/// Stand-in provider that accepts every charge. Initiation leaves the charge
/// pending so callback and verification paths behave like the real rails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxGateway;

impl SandboxGateway {
    pub fn initiate(&self, charge: &ChargeRequest) -> ChargeOutcome {
        let provider_ref = format!("SBX-{}", charge.reference);
        let instructions = match charge.method {
            PaymentMethod::OrangeMoney => {
                Some(format!("Dial #144# and approve charge {}", charge.reference))
            }
            PaymentMethod::MtnMoney => {
                Some(format!("Dial *133# and approve charge {}", charge.reference))
            }
            PaymentMethod::Wave => Some(format!(
                "Open the Wave app and approve charge {}",
                charge.reference
            )),
            PaymentMethod::Card | PaymentMethod::CashOnDelivery => None,
        };
        ChargeOutcome {
            provider_ref,
            state: PaymentState::Pending,
            instructions,
        }
    }

    pub fn verify(&self, _provider_ref: &str) -> PaymentState {
        PaymentState::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charge(method: PaymentMethod) -> ChargeRequest {
        ChargeRequest {
            reference: "11111111-2222-3333-4444-555555555555".into(),
            amount: 15000,
            currency: "XOF".into(),
            method,
            phone: Some("+221771234567".into()),
        }
    }

    #[test]
    fn sandbox_initiation_stays_pending_with_a_reference() {
        let outcome = SandboxGateway.initiate(&charge(PaymentMethod::OrangeMoney));
        assert_eq!(outcome.state, PaymentState::Pending);
        assert!(outcome.provider_ref.starts_with("SBX-"));
        assert!(outcome.instructions.is_some());
    }

    #[test]
    fn sandbox_card_charges_carry_no_wallet_instructions() {
        let outcome = SandboxGateway.initiate(&charge(PaymentMethod::Card));
        assert!(outcome.instructions.is_none());
    }

    #[test]
    fn sandbox_verification_approves() {
        assert_eq!(
            SandboxGateway.verify("SBX-whatever"),
            PaymentState::Completed
        );
    }

    #[test]
    fn missing_credentials_select_the_sandbox() {
        let config = PaymentConfig {
            api_url: None,
            api_key: None,
            callback_token: "sandbox-callback-token".into(),
        };
        let gateway = PaymentGateway::from_config(&config).unwrap();
        assert_eq!(gateway.mode(), "sandbox");
    }
}
