use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::LineConfig;

const API_BASE_URL: &str = "https://api.line.me";
const HTTP_TIMEOUT_SECS: u64 = 10;

type HmacSha256 = Hmac<Sha256>;

/// Outbound text-push capability, one message per call.
#[async_trait]
pub trait PushSink: Send + Sync {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<()>;
}

// --- Push client ---

pub struct LineClient {
    client: Client,
    channel_access_token: String,
}

#[derive(Serialize)]
struct PushMessageRequest<'a> {
    to: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

impl LineClient {
    pub fn new(config: &LineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            channel_access_token: config.channel_access_token.clone(),
        })
    }
}

#[async_trait]
impl PushSink for LineClient {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<()> {
        let request = PushMessageRequest {
            to: user_id,
            messages: vec![TextMessage { kind: "text", text }],
        };

        let response = self
            .client
            .post(format!("{API_BASE_URL}/v2/bot/message/push"))
            .header(
                "Authorization",
                format!("Bearer {}", self.channel_access_token),
            )
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LINE push failed ({status}): {body}");
        }
        Ok(())
    }
}

// --- Webhook signature ---

/// Check `X-Line-Signature` against the raw request body.
///
/// The signature is the base64-encoded HMAC-SHA256 of the body, keyed
/// by the channel secret. Comparison happens inside `verify_slice`,
/// which is constant-time.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = BASE64.decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

// --- Webhook envelope ---

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: Option<MessageContent>,
    #[serde(default)]
    pub source: Option<MessageSource>,
}

#[derive(Debug, Deserialize)]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageSource {
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
}

impl WebhookEvent {
    /// Extract `(user_id, text)` when this is a text message from a
    /// known user; anything else (stickers, follows, group sources
    /// without a user id) yields None.
    pub fn text_message(&self) -> Option<(&str, &str)> {
        if self.kind != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        if message.kind != "text" {
            return None;
        }
        let text = message.text.as_deref()?;
        let user_id = self.source.as_ref()?.user_id.as_deref()?;
        Some((user_id, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"events":[]}"#;
        let signature = sign("channel-secret", body);
        assert!(verify_signature("channel-secret", body, &signature));
    }

    #[test]
    fn test_signature_rejects_wrong_secret() {
        let body = br#"{"events":[]}"#;
        let signature = sign("channel-secret", body);
        assert!(!verify_signature("other-secret", body, &signature));
    }

    #[test]
    fn test_signature_rejects_tampered_body() {
        let signature = sign("channel-secret", br#"{"events":[]}"#);
        assert!(!verify_signature(
            "channel-secret",
            br#"{"events":[{}]}"#,
            &signature
        ));
    }

    #[test]
    fn test_signature_rejects_malformed_base64() {
        assert!(!verify_signature("channel-secret", b"body", "not base64!!!"));
        assert!(!verify_signature("channel-secret", b"body", ""));
    }

    #[test]
    fn test_envelope_text_message_extraction() {
        let body = r#"{
            "destination": "U0000000000000000000000000000000",
            "events": [
                {
                    "type": "message",
                    "replyToken": "abcdef",
                    "timestamp": 1705370000000,
                    "source": {"type": "user", "userId": "U1234"},
                    "message": {"id": "444", "type": "text", "text": "コミット確認"}
                },
                {
                    "type": "message",
                    "source": {"type": "user", "userId": "U1234"},
                    "message": {"id": "445", "type": "sticker"}
                },
                {
                    "type": "follow",
                    "source": {"type": "user", "userId": "U5678"}
                }
            ]
        }"#;

        let envelope: WebhookEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.events.len(), 3);

        assert_eq!(
            envelope.events[0].text_message(),
            Some(("U1234", "コミット確認"))
        );
        assert_eq!(envelope.events[1].text_message(), None);
        assert_eq!(envelope.events[2].text_message(), None);
    }

    #[test]
    fn test_envelope_without_events() {
        let envelope: WebhookEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.events.is_empty());
    }
}
