use serde::Deserialize;
use serde_json::Value;

/// The outer wrapper around a published event as delivered through the
/// queue.
///
/// Carries the topic identifier and the serialized payload. The publish
/// side serializes the payload into the `Message` field as a JSON string,
/// so decoding a delivered event takes two passes: one for the envelope,
/// one for the payload inside it.
#[derive(Clone, Debug, Deserialize)]
pub struct PublishEnvelope {
    #[serde(rename = "Message")]
    message: String,

    #[serde(rename = "TopicArn")]
    topic_arn: String,
}

impl PublishEnvelope {
    /// Decodes an envelope from a raw message body.
    ///
    /// # Errors
    ///
    /// Returns the decode error if the body is not a valid envelope.
    pub fn decode(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Decodes the inner payload.
    ///
    /// # Errors
    ///
    /// Returns the decode error if the `Message` field does not hold valid
    /// JSON.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.message)
    }

    /// The full topic identifier the event was published to.
    #[must_use]
    pub fn topic_arn(&self) -> &str {
        &self.topic_arn
    }

    /// The topic's human-readable short name: the segment of the topic
    /// identifier after its final colon, or the whole identifier when it
    /// has none.
    #[must_use]
    pub fn topic_short_name(&self) -> &str {
        match self.topic_arn.rfind(':') {
            Some(index) => &self.topic_arn[index + 1..],
            None => &self.topic_arn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_string_payload() {
        let body = r#"{"Message":"\"Foo\"","TopicArn":"arn:aws:sns:us-east-1:123456789012:test-event-task-changed"}"#;

        let envelope = PublishEnvelope::decode(body).unwrap();

        assert_eq!(envelope.payload().unwrap(), Value::String("Foo".into()));
        assert_eq!(envelope.topic_short_name(), "test-event-task-changed");
    }

    #[test]
    fn test_decode_object_payload() {
        let payload = serde_json::json!({"id": 42, "title": "hello"});
        let body = serde_json::json!({
            "Message": payload.to_string(),
            "TopicArn": "arn:aws:sns:us-east-1:123456789012:test-event-comment",
        })
        .to_string();

        let envelope = PublishEnvelope::decode(&body).unwrap();

        assert_eq!(envelope.payload().unwrap(), payload);
        assert_eq!(envelope.topic_short_name(), "test-event-comment");
    }

    #[test]
    fn test_topic_without_colons_is_its_own_short_name() {
        let body = r#"{"Message":"1","TopicArn":"events"}"#;

        let envelope = PublishEnvelope::decode(body).unwrap();

        assert_eq!(envelope.topic_short_name(), "events");
    }

    #[test]
    fn test_decode_rejects_non_envelope_body() {
        assert!(PublishEnvelope::decode("not json").is_err());
        assert!(PublishEnvelope::decode(r#"{"Message":"1"}"#).is_err());
    }

    #[test]
    fn test_payload_must_be_json_encoded() {
        // A bare (unserialized) payload string is not valid inner JSON.
        let body = r#"{"Message":"Foo","TopicArn":"arn:events"}"#;

        let envelope = PublishEnvelope::decode(body).unwrap();

        assert!(envelope.payload().is_err());
    }
}
