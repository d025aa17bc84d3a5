use std::time::Duration;

use async_trait::async_trait;
use brailler_core::{GatewayError, PersistenceGateway, UserId};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;

/// Wire layout of one user's durable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    /// Full accumulated text.
    pub text: String,
}

/// Remote key-value store over HTTP/JSON.
///
/// Records live at `{base}/translations/{user_id}.json`. `PUT` overwrites the
/// record; `GET` returns it, or JSON `null` when absent. This is the REST
/// surface of Firebase-style realtime databases, and any store exposing the
/// same surface works.
#[derive(Debug, Clone)]
pub struct RestGateway {
    client: Client,
    base: Url,
    auth: Option<String>,
    timeout: Duration,
}

impl RestGateway {
    /// Gateway for the store at `base_url`. Every request is bounded by
    /// `timeout`.
    pub fn new(base_url: &str, auth: Option<String>, timeout: Duration) -> Result<Self, ServerError> {
        let base = Url::parse(base_url)
            .map_err(|e| ServerError::Config(format!("invalid store url {base_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ServerError::Config(format!("store url {base_url:?} cannot be a base")));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::Config(format!("http client: {e}")))?;

        Ok(Self { client, base, auth, timeout })
    }

    /// URL of `user`'s record. The user id is percent-encoded as one path
    /// segment.
    pub fn record_url(&self, user: &UserId) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("translations").push(&format!("{user}.json"));
        }
        if let Some(auth) = &self.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }
        url
    }

    fn transport_error(&self, err: &reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Unavailable(err.to_string())
        }
    }

    async fn rejection(response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let reason = response.text().await.unwrap_or_default();
        GatewayError::Rejected { status, reason }
    }
}

#[async_trait]
impl PersistenceGateway for RestGateway {
    async fn put(&self, user: &UserId, text: &str) -> Result<(), GatewayError> {
        let record = TranslationRecord { text: text.to_string() };
        let response = self
            .client
            .put(self.record_url(user))
            .json(&record)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(())
    }

    async fn get(&self, user: &UserId) -> Result<Option<String>, GatewayError> {
        let response = self
            .client
            .get(self.record_url(user))
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => return Err(Self::rejection(response).await),
            _ => {},
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(&e))?;
        let record: Option<TranslationRecord> =
            serde_json::from_slice(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(record.map(|r| r.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str, auth: Option<&str>) -> RestGateway {
        RestGateway::new(base, auth.map(str::to_string), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn record_url_appends_translations_path() {
        let gw = gateway("https://db.example.com", None);
        assert_eq!(
            gw.record_url(&UserId::from("alice")).as_str(),
            "https://db.example.com/translations/alice.json"
        );
    }

    #[test]
    fn record_url_keeps_base_path_and_encodes_user() {
        let gw = gateway("https://db.example.com/root/", Some("s3cret"));
        assert_eq!(
            gw.record_url(&UserId::from("a b/c")).as_str(),
            "https://db.example.com/root/translations/a%20b%2Fc.json?auth=s3cret"
        );
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = RestGateway::new("not a url", None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));

        let err = RestGateway::new("mailto:ops@example.com", None, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn null_body_decodes_to_no_record() {
        let record: Option<TranslationRecord> = serde_json::from_str("null").unwrap();
        assert_eq!(record, None);

        let record: Option<TranslationRecord> = serde_json::from_str(r#"{"text":"ab"}"#).unwrap();
        assert_eq!(record.map(|r| r.text), Some("ab".to_string()));
    }
}
