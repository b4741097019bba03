//! Payment gateway client.
//!
//! Token scheme: every call carries `sha256_hex` of the request's parameter
//! values concatenated in ASCII key order, with `TeamSlug` and `Password`
//! mixed into the parameter map. Amounts are integer minor currency units.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::ExternalError;
use crate::core::config::PaymentConfig;
use crate::utils::crypto::sha256_hex;

pub struct PaymentClient {
    client: reqwest::Client,
    base_url: String,
    team_slug: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentInitRequest<'a> {
    team_slug: &'a str,
    token: String,
    amount: i64,
    order_id: &'a str,
    currency: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    language: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitResponse {
    pub success: bool,
    pub payment_id: String,
    pub order_id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    #[serde(rename = "paymentURL")]
    pub payment_url: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentCheckRequest<'a> {
    team_slug: &'a str,
    token: String,
    payment_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCheckResponse {
    pub success: bool,
    #[serde(default)]
    pub payments: Vec<PaymentDetails>,
    #[serde(default)]
    pub total_count: i64,
    #[serde(default)]
    pub order_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub payment_id: String,
    pub order_id: String,
    pub status: String,
    #[serde(default)]
    pub status_description: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub expires_at: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentConfirmRequest<'a> {
    team_slug: &'a str,
    token: String,
    payment_id: &'a str,
    amount: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentCancelRequest<'a> {
    team_slug: &'a str,
    token: String,
    payment_id: &'a str,
    reason: &'a str,
}

impl PaymentClient {
    pub fn new(config: &PaymentConfig) -> Result<Self, ExternalError> {
        let timeout = if config.timeout.is_zero() {
            Duration::from_secs(30)
        } else {
            config.timeout
        };

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            team_slug: config.team_slug.clone(),
            password: config.password.clone(),
        })
    }

    /// Request token: values of the parameter map (plus TeamSlug and
    /// Password) concatenated in ascending ASCII key order, SHA-256,
    /// lowercase hex.
    fn token(&self, params: &[(&str, String)]) -> String {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        for (k, v) in params {
            map.insert(k, v.as_str());
        }
        map.insert("TeamSlug", &self.team_slug);
        map.insert("Password", &self.password);

        let concatenated: String = map.values().copied().collect();
        sha256_hex(&concatenated)
    }

    /// Open a payment intent; returns the redirect URL for the payer
    pub async fn init_payment(
        &self,
        amount_minor: i64,
        order_id: &str,
        currency: &str,
        description: &str,
    ) -> Result<PaymentInitResponse, ExternalError> {
        let token = self.token(&[
            ("Amount", amount_minor.to_string()),
            ("Currency", currency.to_string()),
            ("OrderId", order_id.to_string()),
        ]);

        let request = PaymentInitRequest {
            team_slug: &self.team_slug,
            token,
            amount: amount_minor,
            order_id,
            currency,
            description,
            language: "ru",
        };

        let url = format!("{}/api/v1/PaymentInit/init", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;
        let result: PaymentInitResponse = response
            .json()
            .await
            .map_err(|e| ExternalError::Decode(e.to_string()))?;

        if !result.success {
            return Err(ExternalError::Rejected {
                operation: "payment init",
            });
        }

        Ok(result)
    }

    /// Look up payment details by gateway payment id
    pub async fn check_payment(
        &self,
        payment_id: &str,
    ) -> Result<PaymentCheckResponse, ExternalError> {
        let token = self.token(&[("PaymentId", payment_id.to_string())]);

        let request = PaymentCheckRequest {
            team_slug: &self.team_slug,
            token,
            payment_id,
        };

        let url = format!("{}/api/v1/PaymentCheck/check", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;
        response
            .json()
            .await
            .map_err(|e| ExternalError::Decode(e.to_string()))
    }

    /// Capture a previously authorized payment
    pub async fn confirm_payment(
        &self,
        payment_id: &str,
        amount_minor: i64,
    ) -> Result<(), ExternalError> {
        let token = self.token(&[
            ("Amount", amount_minor.to_string()),
            ("PaymentId", payment_id.to_string()),
        ]);

        let request = PaymentConfirmRequest {
            team_slug: &self.team_slug,
            token,
            payment_id,
            amount: amount_minor,
        };

        let url = format!("{}/api/v1/PaymentConfirm/confirm", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;

        if response.status() != StatusCode::OK {
            return Err(ExternalError::UnexpectedStatus {
                operation: "payment confirm",
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Void a payment (user cancellation, expiry)
    pub async fn cancel_payment(&self, payment_id: &str, reason: &str) -> Result<(), ExternalError> {
        let token = self.token(&[("PaymentId", payment_id.to_string())]);

        let request = PaymentCancelRequest {
            team_slug: &self.team_slug,
            token,
            payment_id,
            reason,
        };

        let url = format!("{}/api/v1/PaymentCancel/cancel", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;

        if response.status() != StatusCode::OK {
            return Err(ExternalError::UnexpectedStatus {
                operation: "payment cancel",
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PaymentConfig;

    fn client() -> PaymentClient {
        PaymentClient::new(&PaymentConfig {
            base_url: "https://gateway.test".into(),
            team_slug: "team".into(),
            password: "secret".into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn token_concatenates_values_in_ascii_key_order() {
        let c = client();
        // Keys sort as: Amount, Currency, OrderId, Password, TeamSlug
        let token = c.token(&[
            ("Amount", "5000".to_string()),
            ("Currency", "RUB".to_string()),
            ("OrderId", "ord-1".to_string()),
        ]);
        assert_eq!(token, sha256_hex("5000RUBord-1secretteam"));
    }

    #[test]
    fn token_is_deterministic_regardless_of_param_order() {
        let c = client();
        let a = c.token(&[
            ("OrderId", "ord-1".to_string()),
            ("Amount", "5000".to_string()),
            ("Currency", "RUB".to_string()),
        ]);
        let b = c.token(&[
            ("Amount", "5000".to_string()),
            ("Currency", "RUB".to_string()),
            ("OrderId", "ord-1".to_string()),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn token_is_lowercase_hex() {
        let c = client();
        let token = c.token(&[("PaymentId", "p-1".to_string())]);
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_eq!(token, token.to_lowercase());
    }

    #[test]
    fn different_credentials_change_the_token() {
        let a = client();
        let b = PaymentClient::new(&PaymentConfig {
            base_url: "https://gateway.test".into(),
            team_slug: "team".into(),
            password: "other".into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        let params = [("PaymentId", "p-1".to_string())];
        assert_ne!(a.token(&params), b.token(&params));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // The token is a pure function of the sorted parameter map plus
            // the configured credentials
            #[test]
            fn prop_token_matches_sorted_concat(
                amount in 0i64..10_000_000,
                order in "[a-z0-9-]{1,32}",
                currency in "[A-Z]{3}",
            ) {
                let c = client();
                let token = c.token(&[
                    ("Amount", amount.to_string()),
                    ("Currency", currency.clone()),
                    ("OrderId", order.clone()),
                ]);
                // ASCII order: Amount, Currency, OrderId, Password, TeamSlug
                let expected = sha256_hex(&format!("{amount}{currency}{order}secretteam"));
                prop_assert_eq!(token, expected);
            }

            #[test]
            fn prop_token_ignores_param_order(
                amount in 0i64..10_000_000,
                order in "[a-z0-9-]{1,32}",
            ) {
                let c = client();
                let forward = c.token(&[
                    ("Amount", amount.to_string()),
                    ("OrderId", order.clone()),
                ]);
                let backward = c.token(&[
                    ("OrderId", order.clone()),
                    ("Amount", amount.to_string()),
                ]);
                prop_assert_eq!(forward, backward);
            }
        }
    }
}
