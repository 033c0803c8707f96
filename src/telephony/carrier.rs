//! Carrier REST API client.
//!
//! The carrier is opaque beyond two operations: placing a call that is told
//! to open a media stream to this bridge, and marking an active call
//! completed to hang it up.

use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Mutex;

/// The two carrier operations the bridge depends on.
#[async_trait]
pub trait CarrierApi: Send + Sync {
    /// Places a call from `from` to `to`, directing the carrier to fetch
    /// call instructions from `webhook_url`. Returns the call identifier.
    async fn create_call(&self, from: &str, to: &str, webhook_url: &str) -> Result<String>;

    /// Marks the call completed, hanging it up.
    async fn complete_call(&self, call_sid: &str) -> Result<()>;
}

/// Twilio REST implementation.
pub struct TwilioClient {
    account_sid: String,
    auth_token: String,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
}

impl TwilioClient {
    /// Creates a client for the given account.
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            api_base: api_base.into(),
            client: reqwest::Client::new(),
        }
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }

    fn call_url(&self, call_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls/{}.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid,
            call_sid
        )
    }
}

#[async_trait]
impl CarrierApi for TwilioClient {
    async fn create_call(&self, from: &str, to: &str, webhook_url: &str) -> Result<String> {
        let response = self
            .client
            .post(self.calls_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("From", from),
                ("To", to),
                ("Url", webhook_url),
                ("Method", "POST"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::CallInitiation {
                message: format!("carrier returned {}: {}", status, body),
            });
        }

        let call: CallResource = response.json().await?;
        Ok(call.sid)
    }

    async fn complete_call(&self, call_sid: &str) -> Result<()> {
        let response = self
            .client
            .post(self.call_url(call_sid))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Status", "completed")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Carrier {
                message: format!("carrier returned {}: {}", status, body),
            });
        }
        Ok(())
    }
}

/// Mock carrier for testing; records every operation.
#[derive(Debug, Default)]
pub struct MockCarrier {
    pub created: Mutex<Vec<(String, String, String)>>,
    pub completed: Mutex<Vec<String>>,
    pub fail_create: bool,
}

impl MockCarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the mock to fail call creation.
    pub fn with_create_failure(mut self) -> Self {
        self.fail_create = true;
        self
    }
}

#[async_trait]
impl CarrierApi for MockCarrier {
    async fn create_call(&self, from: &str, to: &str, webhook_url: &str) -> Result<String> {
        if self.fail_create {
            return Err(BridgeError::CallInitiation {
                message: "mock carrier refused the call".to_string(),
            });
        }
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((from.to_string(), to.to_string(), webhook_url.to_string()));
        Ok("CA_mock_1".to_string())
    }

    async fn complete_call(&self, call_sid: &str) -> Result<()> {
        self.completed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call_sid.to_string());
        Ok(())
    }
}
