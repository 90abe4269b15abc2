//! Execution venue client
//!
//! Order submission against the CLOB is not wired up; the client reports
//! failure without raising so the decision loop's accounting stays intact.

use crate::types::{OrderResult, Side};
use rust_decimal::Decimal;
use tracing::warn;

pub struct ClobClient {
    #[allow(dead_code)]
    base_url: String,
    has_credentials: bool,
}

impl ClobClient {
    pub fn new(base_url: &str, private_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            has_credentials: !private_key.is_empty(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.has_credentials
    }

    /// Submit an order. Reference behavior: report failure, never panic.
    pub async fn place_order(
        &self,
        token_id: &str,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> OrderResult {
        warn!(
            token_id,
            %side,
            %price,
            %size,
            "order submission not implemented; no order placed"
        );
        OrderResult {
            success: false,
            message: "order submission not implemented".to_string(),
        }
    }
}
