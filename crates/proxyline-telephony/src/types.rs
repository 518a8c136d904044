// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Twilio-compatible REST API.
//!
//! Only the fields this client reads are modeled; unknown response fields
//! are ignored by serde.

use serde::Deserialize;

/// One page of the owned-number inventory.
#[derive(Debug, Deserialize)]
pub struct IncomingPhoneNumbersPage {
    pub incoming_phone_numbers: Vec<IncomingPhoneNumber>,
    /// Relative URI of the next page, absent on the last page.
    pub next_page_uri: Option<String>,
}

/// One owned number as reported by the provider.
#[derive(Debug, Deserialize)]
pub struct IncomingPhoneNumber {
    pub phone_number: String,
    pub sid: String,
}

/// Search results for purchasable numbers.
#[derive(Debug, Deserialize)]
pub struct AvailablePhoneNumbersPage {
    pub available_phone_numbers: Vec<AvailablePhoneNumber>,
}

/// One purchasable number candidate.
#[derive(Debug, Deserialize)]
pub struct AvailablePhoneNumber {
    pub phone_number: String,
}

/// Error body returned by the provider on failed requests.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub code: Option<i64>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_page_parses_with_extra_fields() {
        let json = r#"{
            "incoming_phone_numbers": [
                {"phone_number": "+15550100", "sid": "PN1", "friendly_name": "x"}
            ],
            "next_page_uri": "/2010-04-01/Accounts/AC1/IncomingPhoneNumbers.json?Page=1",
            "page_size": 50
        }"#;
        let page: IncomingPhoneNumbersPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.incoming_phone_numbers.len(), 1);
        assert_eq!(page.incoming_phone_numbers[0].sid, "PN1");
        assert!(page.next_page_uri.is_some());
    }

    #[test]
    fn last_page_has_no_next_uri() {
        let json = r#"{"incoming_phone_numbers": []}"#;
        let page: IncomingPhoneNumbersPage = serde_json::from_str(json).unwrap();
        assert!(page.incoming_phone_numbers.is_empty());
        assert!(page.next_page_uri.is_none());
    }

    #[test]
    fn error_body_parses() {
        let json = r#"{"code": 21422, "message": "Number not available", "status": 400}"#;
        let err: ApiErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(err.code, Some(21422));
        assert_eq!(err.message, "Number not available");
    }
}
