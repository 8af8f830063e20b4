use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;

use super::{ChargeOutcome, ChargeRequest, GatewayError};
use crate::models::PaymentState;

/// HTTP client for the payment aggregator. One REST surface covers all the
/// rails; the provider routes each charge to the right one.
#[derive(Clone)]
pub struct AggregatorClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    reference: String,
    status: String,
    #[serde(default)]
    instructions: Option<String>,
}

impl AggregatorClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {api_key}");
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| GatewayError::Parse(format!("invalid API key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn initiate(&self, charge: &ChargeRequest) -> Result<ChargeOutcome, GatewayError> {
        let url = format!("{}/charges", self.base_url);

        let response = self.client.post(&url).json(charge).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChargeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        let state = parse_state(&body.status)?;
        Ok(ChargeOutcome {
            provider_ref: body.reference,
            state,
            instructions: body.instructions,
        })
    }

    pub async fn verify(&self, provider_ref: &str) -> Result<PaymentState, GatewayError> {
        let url = format!("{}/charges/{}", self.base_url, provider_ref);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChargeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        parse_state(&body.status)
    }
}

fn parse_state(status: &str) -> Result<PaymentState, GatewayError> {
    status
        .parse::<PaymentState>()
        .map_err(|_| GatewayError::Parse(format!("unknown charge status: {status}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = AggregatorClient::new("https://pay.example.com/v1/", "key").unwrap();
        assert_eq!(client.base_url, "https://pay.example.com/v1");
    }

    #[test]
    fn provider_states_parse() {
        assert_eq!(parse_state("completed").unwrap(), PaymentState::Completed);
        assert_eq!(parse_state("failed").unwrap(), PaymentState::Failed);
        assert!(parse_state("charged_back").is_err());
    }
}
