//! Ticketing provider client.
//!
//! The provider models inventory as "places" grouped into "orders". The
//! order lifecycle is started → places selected → submitted → confirmed,
//! with cancel as the compensation at every step. Callers own compensation:
//! on any selection/submit/confirm failure they must attempt `cancel_order`
//! to free remotely-reserved places.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::ExternalError;
use crate::core::config::TicketingConfig;

pub struct TicketingClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct StartOrderResponse {
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderInfo {
    pub id: String,
    pub status: String,
    pub started_at: i64,
    pub updated_at: i64,
    pub places_count: i64,
}

/// A provider "place" is our seat
#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    pub id: String,
    pub row: i32,
    pub seat: i32,
    pub is_free: bool,
}

#[derive(Serialize)]
struct SelectPlaceRequest<'a> {
    order_id: &'a str,
}

impl TicketingClient {
    pub fn new(config: &TicketingConfig) -> Result<Self, ExternalError> {
        let timeout = if config.timeout.is_zero() {
            Duration::from_secs(30)
        } else {
            config.timeout
        };

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Open a new provider order
    pub async fn start_order(&self) -> Result<StartOrderResponse, ExternalError> {
        let url = format!("{}/api/partners/v1/orders", self.base_url);
        let response = self.client.post(&url).send().await?;

        if response.status() != StatusCode::CREATED {
            return Err(ExternalError::UnexpectedStatus {
                operation: "start order",
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ExternalError::Decode(e.to_string()))
    }

    pub async fn get_order(&self, order_id: &str) -> Result<OrderInfo, ExternalError> {
        let url = format!("{}/api/partners/v1/orders/{}", self.base_url, order_id);
        let response = self.client.get(&url).send().await?;

        if response.status() != StatusCode::OK {
            return Err(ExternalError::UnexpectedStatus {
                operation: "get order",
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ExternalError::Decode(e.to_string()))
    }

    /// Page through the provider's inventory
    pub async fn get_places(&self, page: u32, page_size: u32) -> Result<Vec<Place>, ExternalError> {
        let url = format!(
            "{}/api/partners/v1/places?page={}&pageSize={}",
            self.base_url, page, page_size
        );
        let response = self.client.get(&url).send().await?;

        if response.status() != StatusCode::OK {
            return Err(ExternalError::UnexpectedStatus {
                operation: "get places",
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ExternalError::Decode(e.to_string()))
    }

    /// Reserve a place into an order
    pub async fn select_place(&self, place_id: &str, order_id: &str) -> Result<(), ExternalError> {
        let url = format!(
            "{}/api/partners/v1/places/{}/select",
            self.base_url, place_id
        );
        let response = self
            .client
            .patch(&url)
            .json(&SelectPlaceRequest { order_id })
            .send()
            .await?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(ExternalError::UnexpectedStatus {
                operation: "select place",
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Free a previously selected place
    pub async fn release_place(&self, place_id: &str) -> Result<(), ExternalError> {
        let url = format!(
            "{}/api/partners/v1/places/{}/release",
            self.base_url, place_id
        );
        let response = self.client.patch(&url).send().await?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(ExternalError::UnexpectedStatus {
                operation: "release place",
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    pub async fn submit_order(&self, order_id: &str) -> Result<(), ExternalError> {
        self.patch_order(order_id, "submit").await
    }

    pub async fn confirm_order(&self, order_id: &str) -> Result<(), ExternalError> {
        self.patch_order(order_id, "confirm").await
    }

    pub async fn cancel_order(&self, order_id: &str) -> Result<(), ExternalError> {
        self.patch_order(order_id, "cancel").await
    }

    async fn patch_order(&self, order_id: &str, action: &'static str) -> Result<(), ExternalError> {
        let url = format!(
            "{}/api/partners/v1/orders/{}/{}",
            self.base_url, order_id, action
        );
        let response = self.client.patch(&url).send().await?;

        if response.status() != StatusCode::OK {
            return Err(ExternalError::UnexpectedStatus {
                operation: "order transition",
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
