/// Notification broker wire types
///
/// SNS delivers an HTTP POST whose `x-amz-sns-message-type` header names the
/// message kind. Content notifications wrap an S3 event document as a JSON
/// string in their `Message` field.
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header carrying the message-type discriminator
pub const MESSAGE_TYPE_HEADER: &str = "x-amz-sns-message-type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    SubscriptionConfirmation,
    Notification,
    UnsubscribeConfirmation,
    Other(String),
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        match s.trim() {
            "SubscriptionConfirmation" => MessageType::SubscriptionConfirmation,
            "Notification" => MessageType::Notification,
            "UnsubscribeConfirmation" => MessageType::UnsubscribeConfirmation,
            other => MessageType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::SubscriptionConfirmation => write!(f, "SubscriptionConfirmation"),
            MessageType::Notification => write!(f, "Notification"),
            MessageType::UnsubscribeConfirmation => write!(f, "UnsubscribeConfirmation"),
            MessageType::Other(other) => write!(f, "{}", other),
        }
    }
}

/// One webhook delivery: the discriminator plus the raw body
#[derive(Debug, Clone)]
pub struct NotificationEnvelope {
    pub message_type: MessageType,
    pub body: bytes::Bytes,
}

#[derive(Deserialize)]
struct TypeProbe {
    #[serde(rename = "Type")]
    kind: Option<String>,
}

impl NotificationEnvelope {
    /// Build an envelope from the header value, falling back to the body's
    /// `Type` field when the header is absent.
    pub fn new(header: Option<&str>, body: bytes::Bytes) -> Self {
        let message_type = match header.filter(|h| !h.trim().is_empty()) {
            Some(value) => MessageType::from(value),
            None => serde_json::from_slice::<TypeProbe>(&body)
                .ok()
                .and_then(|probe| probe.kind)
                .map(|kind| MessageType::from(kind.as_str()))
                .unwrap_or_else(|| MessageType::Other(String::new())),
        };

        Self { message_type, body }
    }

    pub fn subscription_confirmation(&self) -> Result<SubscriptionConfirmation> {
        let confirmation: SubscriptionConfirmation = serde_json::from_slice(&self.body)?;
        if confirmation.token.is_empty() || confirmation.topic_arn.is_empty() {
            return Err(AppError::Parse(
                "subscription confirmation missing Token or TopicArn".into(),
            ));
        }
        Ok(confirmation)
    }

    pub fn content_notification(&self) -> Result<ContentNotification> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Handshake request sent by the broker when a subscription is created
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfirmation {
    #[serde(rename = "Token", default)]
    pub token: String,
    #[serde(rename = "TopicArn", default)]
    pub topic_arn: String,
}

/// Content delivery; `message` holds the nested S3 event document
#[derive(Debug, Clone, Deserialize)]
pub struct ContentNotification {
    #[serde(rename = "Message", default)]
    pub message: String,
}

impl ContentNotification {
    /// Object keys of every stored-object record, in record order.
    ///
    /// Records without a key, or with an empty one, are skipped.
    pub fn object_keys(&self) -> Result<Vec<String>> {
        if self.message.trim().is_empty() {
            return Ok(Vec::new());
        }

        let event: S3EventMessage = serde_json::from_str(&self.message)?;
        Ok(event
            .records
            .into_iter()
            .filter_map(|record| record.s3.and_then(|s3| s3.object).and_then(|o| o.key))
            .filter(|key| !key.is_empty())
            .map(|key| decode_object_key(&key))
            .filter(|key| !key.is_empty())
            .collect())
    }
}

/// S3 event document (`{"Records":[{"s3":{"object":{"key":"..."}}}]}`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3EventMessage {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    #[serde(default)]
    pub s3: Option<S3Entity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    #[serde(default)]
    pub object: Option<S3Object>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    #[serde(default)]
    pub key: Option<String>,
}

/// S3 form-encodes keys in event notifications: `+` is a space, `%XX` an escape.
fn decode_object_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Pushed to every live listener once a thumbnail is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub url: String,
}

impl CompletionEvent {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification_body(message: &str) -> bytes::Bytes {
        bytes::Bytes::from(
            serde_json::json!({
                "Type": "Notification",
                "MessageId": "22b80b92-fdea-4c2c-8f9d-bdfb0c7bf324",
                "TopicArn": "arn:aws:sns:eu-west-1:123456789012:uploads",
                "Message": message,
            })
            .to_string(),
        )
    }

    #[test]
    fn test_message_type_from_header() {
        let env = NotificationEnvelope::new(Some("SubscriptionConfirmation"), bytes::Bytes::new());
        assert_eq!(env.message_type, MessageType::SubscriptionConfirmation);

        let env = NotificationEnvelope::new(Some("Notification"), bytes::Bytes::new());
        assert_eq!(env.message_type, MessageType::Notification);

        let env = NotificationEnvelope::new(Some("Weird"), bytes::Bytes::new());
        assert_eq!(env.message_type, MessageType::Other("Weird".into()));
    }

    #[test]
    fn test_message_type_falls_back_to_body() {
        let env = NotificationEnvelope::new(None, notification_body("{}"));
        assert_eq!(env.message_type, MessageType::Notification);

        let env = NotificationEnvelope::new(None, bytes::Bytes::from_static(b"not json"));
        assert_eq!(env.message_type, MessageType::Other(String::new()));
    }

    #[test]
    fn test_subscription_confirmation() {
        let body = serde_json::json!({
            "Type": "SubscriptionConfirmation",
            "Token": "2336412f37fb687f5d51e6e241d09c805a5a57b30d712f794cc5f6a988666d92768dd60a",
            "TopicArn": "arn:aws:sns:eu-west-1:123456789012:uploads",
            "SubscribeURL": "https://sns.eu-west-1.amazonaws.com/?Action=ConfirmSubscription",
        });
        let env = NotificationEnvelope::new(
            Some("SubscriptionConfirmation"),
            bytes::Bytes::from(body.to_string()),
        );
        let confirmation = env.subscription_confirmation().unwrap();
        assert!(confirmation.token.starts_with("2336412f"));
        assert_eq!(
            confirmation.topic_arn,
            "arn:aws:sns:eu-west-1:123456789012:uploads"
        );
    }

    #[test]
    fn test_subscription_confirmation_missing_token() {
        let env = NotificationEnvelope::new(
            Some("SubscriptionConfirmation"),
            bytes::Bytes::from_static(br#"{"TopicArn":"arn"}"#),
        );
        assert!(matches!(
            env.subscription_confirmation(),
            Err(AppError::Parse(_))
        ));
    }

    #[test]
    fn test_object_keys_single_record() {
        let inner = r#"{"Records":[{"s3":{"object":{"key":"beach.jpg","size":1024}}}]}"#;
        let env = NotificationEnvelope::new(Some("Notification"), notification_body(inner));
        let keys = env.content_notification().unwrap().object_keys().unwrap();
        assert_eq!(keys, vec!["beach.jpg".to_string()]);
    }

    #[test]
    fn test_object_keys_skips_empty_and_missing() {
        let inner = r#"{"Records":[
            {"s3":{"object":{"key":""}}},
            {"s3":{"object":{}}},
            {"s3":{}},
            {},
            {"s3":{"object":{"key":"b.png"}}}
        ]}"#;
        let notification = ContentNotification {
            message: inner.to_string(),
        };
        assert_eq!(notification.object_keys().unwrap(), vec!["b.png".to_string()]);
    }

    #[test]
    fn test_object_keys_decodes_s3_encoding() {
        let inner = r#"{"Records":[{"s3":{"object":{"key":"summer+trip/beach%281%29.jpg"}}}]}"#;
        let notification = ContentNotification {
            message: inner.to_string(),
        };
        assert_eq!(
            notification.object_keys().unwrap(),
            vec!["summer trip/beach(1).jpg".to_string()]
        );
    }

    #[test]
    fn test_object_keys_empty_message() {
        let notification = ContentNotification {
            message: String::new(),
        };
        assert!(notification.object_keys().unwrap().is_empty());

        let notification = ContentNotification {
            message: "{}".to_string(),
        };
        assert!(notification.object_keys().unwrap().is_empty());
    }

    #[test]
    fn test_object_keys_malformed_message() {
        let notification = ContentNotification {
            message: "not json".to_string(),
        };
        assert!(matches!(
            notification.object_keys(),
            Err(AppError::Parse(_))
        ));
    }
}
