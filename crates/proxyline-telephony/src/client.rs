// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Twilio-compatible telephony REST API.
//!
//! Provides [`TwilioClient`] which handles request construction, basic-auth,
//! inventory pagination, and transient error retry. Every request is bounded
//! by the configured timeout, so a hung provider call cannot stall an
//! allocation indefinitely.

use std::time::Duration;

use async_trait::async_trait;
use proxyline_config::model::TelephonyConfig;
use proxyline_core::{OwnedNumber, ProxylineError, PurchasedNumber, TelephonyProvider};
use tracing::{debug, warn};

use crate::types::{
    ApiErrorResponse, AvailablePhoneNumbersPage, IncomingPhoneNumbersPage,
};

/// Base URL for the public provider API.
const API_BASE_URL: &str = "https://api.twilio.com";

/// HTTP client for telephony provider communication.
///
/// Manages authentication, connection pooling, and retry logic for transient
/// errors (429, 500, 503) on idempotent calls. Purchases are never retried.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    base_url: String,
    country: String,
    request_timeout: Duration,
    max_retries: u32,
}

impl TwilioClient {
    /// Creates a new provider client from the telephony config section.
    ///
    /// Fails with a config error when the account SID or auth token is missing.
    pub fn new(config: &TelephonyConfig) -> Result<Self, ProxylineError> {
        let account_sid = config
            .account_sid
            .clone()
            .ok_or_else(|| {
                ProxylineError::Config("telephony.account_sid is required".to_string())
            })?;
        let auth_token = config.auth_token.clone().ok_or_else(|| {
            ProxylineError::Config("telephony.auth_token is required".to_string())
        })?;

        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProxylineError::Telephony {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            account_sid,
            auth_token,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| API_BASE_URL.to_string()),
            country: config.country.clone(),
            request_timeout,
            max_retries: 1,
        })
    }

    fn account_url(&self, resource: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/{resource}",
            self.base_url, self.account_sid
        )
    }

    /// GET with one retry on transient status codes.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, ProxylineError> {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                warn!(attempt, url, "retrying provider request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .get(url)
                .basic_auth(&self.account_sid, Some(&self.auth_token))
                .send()
                .await
                .map_err(|e| self.map_transport_error(e))?;

            let status = response.status();
            debug!(status = %status, url, attempt, "provider response received");

            if status.is_success() {
                return response.json::<T>().await.map_err(|e| {
                    ProxylineError::Telephony {
                        message: format!("malformed provider response: {e}"),
                        source: Some(Box::new(e)),
                    }
                });
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_status(status) && attempt < self.max_retries {
                attempt += 1;
                continue;
            }

            return Err(ProxylineError::Telephony {
                message: api_error_message(status, &body),
                source: None,
            });
        }
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ProxylineError {
        if e.is_timeout() {
            ProxylineError::Timeout {
                duration: self.request_timeout,
            }
        } else {
            ProxylineError::Telephony {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

/// Status codes worth one retry: rate limiting and transient server errors.
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

/// Render the provider's error body, falling back to the raw text.
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(body) {
        match api_err.code {
            Some(code) => format!("provider error {code}: {}", api_err.message),
            None => format!("provider error: {}", api_err.message),
        }
    } else {
        format!("provider returned {status}: {body}")
    }
}

#[async_trait]
impl TelephonyProvider for TwilioClient {
    async fn list_owned_numbers(&self) -> Result<Vec<OwnedNumber>, ProxylineError> {
        let mut url = self.account_url("IncomingPhoneNumbers.json?PageSize=100");
        let mut numbers = Vec::new();

        loop {
            let page: IncomingPhoneNumbersPage = self.get_json(&url).await?;
            numbers.extend(page.incoming_phone_numbers.into_iter().map(|n| OwnedNumber {
                phone_number: n.phone_number,
                provider_sid: n.sid,
            }));
            match page.next_page_uri {
                Some(next) => url = format!("{}{next}", self.base_url),
                None => break,
            }
        }

        debug!(count = numbers.len(), "provider inventory listed");
        Ok(numbers)
    }

    async fn find_purchasable_number(&self) -> Result<Option<String>, ProxylineError> {
        let url = self.account_url(&format!(
            "AvailablePhoneNumbers/{}/Local.json?SmsEnabled=true&PageSize=1",
            self.country
        ));
        let page: AvailablePhoneNumbersPage = self.get_json(&url).await?;
        Ok(page
            .available_phone_numbers
            .into_iter()
            .next()
            .map(|n| n.phone_number))
    }

    async fn purchase_number(
        &self,
        phone_number: &str,
    ) -> Result<PurchasedNumber, ProxylineError> {
        // Purchases have a billing consequence and are never retried; a
        // failed or timed-out call surfaces as PurchaseFailed and the caller
        // persists nothing.
        let url = self.account_url("IncomingPhoneNumbers.json");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("PhoneNumber", phone_number), ("SmsEnabled", "true")])
            .send()
            .await
            .map_err(|e| match self.map_transport_error(e) {
                ProxylineError::Timeout { duration } => ProxylineError::PurchaseFailed {
                    message: format!("purchase timed out after {duration:?}"),
                    source: None,
                },
                other => ProxylineError::PurchaseFailed {
                    message: other.to_string(),
                    source: None,
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProxylineError::PurchaseFailed {
                message: api_error_message(status, &body),
                source: None,
            });
        }

        let number: crate::types::IncomingPhoneNumber =
            response.json().await.map_err(|e| ProxylineError::PurchaseFailed {
                message: format!("malformed purchase response: {e}"),
                source: Some(Box::new(e)),
            })?;

        debug!(phone_number = %number.phone_number, sid = %number.sid, "number purchased");
        Ok(PurchasedNumber {
            phone_number: number.phone_number,
            provider_sid: number.sid,
        })
    }

    async fn send_sms(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<(), ProxylineError> {
        let url = self.account_url("Messages.json");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("From", from), ("To", to), ("Body", body)])
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProxylineError::Telephony {
                message: api_error_message(status, &text),
                source: None,
            });
        }

        debug!(to, "SMS accepted by provider");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_client(base_url: &str) -> TwilioClient {
        let config = TelephonyConfig {
            account_sid: Some("AC1".to_string()),
            auth_token: Some("token".to_string()),
            base_url: Some(base_url.to_string()),
            request_timeout_secs: 5,
            country: "US".to_string(),
        };
        TwilioClient::new(&config).unwrap()
    }

    #[test]
    fn missing_credentials_are_a_config_error() {
        let config = TelephonyConfig::default();
        let err = TwilioClient::new(&config).unwrap_err();
        assert!(matches!(err, ProxylineError::Config(_)));
    }

    #[tokio::test]
    async fn list_owned_numbers_follows_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2010-04-01/Accounts/AC1/IncomingPhoneNumbers.json"))
            .and(query_param("PageSize", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{
                    "incoming_phone_numbers": [{"phone_number": "+15550100", "sid": "PN1"}],
                    "next_page_uri": "/2010-04-01/Accounts/AC1/IncomingPhoneNumbers.json?Page=1"
                }"#,
                "application/json",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/2010-04-01/Accounts/AC1/IncomingPhoneNumbers.json"))
            .and(query_param("Page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"incoming_phone_numbers": [{"phone_number": "+15550200", "sid": "PN2"}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = make_client(&server.uri());
        let numbers = client.list_owned_numbers().await.unwrap();
        assert_eq!(numbers.len(), 2);
        assert_eq!(numbers[0].phone_number, "+15550100");
        assert_eq!(numbers[1].provider_sid, "PN2");
    }

    #[tokio::test]
    async fn transient_error_is_retried_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2010-04-01/Accounts/AC1/IncomingPhoneNumbers.json"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/2010-04-01/Accounts/AC1/IncomingPhoneNumbers.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"incoming_phone_numbers": []}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = make_client(&server.uri());
        let numbers = client.list_owned_numbers().await.unwrap();
        assert!(numbers.is_empty());
    }

    #[tokio::test]
    async fn find_purchasable_number_returns_none_on_empty_search() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(
                "/2010-04-01/Accounts/AC1/AvailablePhoneNumbers/US/Local.json",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"available_phone_numbers": []}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = make_client(&server.uri());
        assert!(client.find_purchasable_number().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purchase_posts_form_and_parses_confirmation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC1/IncomingPhoneNumbers.json"))
            .and(body_string_contains("PhoneNumber=%2B15550300"))
            .respond_with(ResponseTemplate::new(201).set_body_raw(
                r#"{"phone_number": "+15550300", "sid": "PN3"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = make_client(&server.uri());
        let purchased = client.purchase_number("+15550300").await.unwrap();
        assert_eq!(purchased.phone_number, "+15550300");
        assert_eq!(purchased.provider_sid, "PN3");
    }

    #[tokio::test]
    async fn failed_purchase_is_purchase_failed_and_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC1/IncomingPhoneNumbers.json"))
            .respond_with(ResponseTemplate::new(400).set_body_raw(
                r#"{"code": 21422, "message": "Number not available", "status": 400}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server.uri());
        let err = client.purchase_number("+15550300").await.unwrap_err();
        match err {
            ProxylineError::PurchaseFailed { message, .. } => {
                assert!(message.contains("21422"), "got: {message}");
            }
            other => panic!("expected PurchaseFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_sms_posts_from_to_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC1/Messages.json"))
            .and(body_string_contains("From=%2B15559000"))
            .and(body_string_contains("To=555-0100"))
            .respond_with(ResponseTemplate::new(201).set_body_raw(
                r#"{"sid": "SM1", "status": "queued"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = make_client(&server.uri());
        client.send_sms("+15559000", "555-0100", "hello").await.unwrap();
    }
}
