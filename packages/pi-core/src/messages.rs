//! Inbound message schema: routing keys and the header set every `start`/
//! `stop` message must carry.

use std::collections::HashMap;

/// The two routing keys the engine understands. Any other key is a
/// [`MessageError::UnknownRoutingKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingKey {
    Start,
    Stop,
}

impl RoutingKey {
    /// Parses a raw AMQP routing key string.
    pub fn parse(raw: &str) -> Result<Self, MessageError> {
        match raw {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            other => Err(MessageError::UnknownRoutingKey {
                key: other.to_string(),
            }),
        }
    }
}

/// The literal string substituted for a missing or empty `description`
/// header (`spec.md` §3, §9 — this asymmetry with the other headers is
/// intentional and preserved).
pub const UNKNOWN_DESCRIPTION: &str = "UNKNOWN";

const REQUIRED_HEADERS: [&str; 4] = ["phone", "ip_addr", "region", "guid"];

/// The validated header set carried by every `start`/`stop` message.
#[derive(Debug, Clone)]
pub struct InboundHeaders {
    pub phone: String,
    pub ip_addr: String,
    pub region: String,
    pub description: String,
    pub guid: String,
}

impl InboundHeaders {
    /// Extracts and validates headers from a raw string-keyed header map.
    ///
    /// `description` is the one header allowed to be missing or empty; it
    /// is replaced with [`UNKNOWN_DESCRIPTION`]. Every other header is
    /// required (`spec.md` §6) — a missing one is a [`MessageError`].
    pub fn from_raw(headers: &HashMap<String, String>) -> Result<Self, MessageError> {
        for name in REQUIRED_HEADERS {
            if !headers.contains_key(name) {
                return Err(MessageError::MissingHeader { name });
            }
        }

        let description = headers
            .get("description")
            .map(String::as_str)
            .filter(|d| !d.is_empty())
            .unwrap_or(UNKNOWN_DESCRIPTION)
            .to_string();

        Ok(Self {
            phone: headers["phone"].clone(),
            ip_addr: headers["ip_addr"].clone(),
            region: headers["region"].clone(),
            guid: headers["guid"].clone(),
            description,
        })
    }
}

/// Errors raised while validating an inbound message, before it ever
/// reaches the session store. Always recoverable: the caller dead-letters
/// the message and keeps consuming (`spec.md` §7).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("unexpected routing key {key:?}")]
    UnknownRoutingKey { key: String },
    #[error("missing required header {name:?}")]
    MissingHeader { name: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn routing_key_parses_known_keys() {
        assert_eq!(RoutingKey::parse("start"), Ok(RoutingKey::Start));
        assert_eq!(RoutingKey::parse("stop"), Ok(RoutingKey::Stop));
    }

    #[test]
    fn routing_key_rejects_unknown() {
        assert!(matches!(
            RoutingKey::parse("ping"),
            Err(MessageError::UnknownRoutingKey { key }) if key == "ping"
        ));
    }

    #[test]
    fn empty_description_becomes_unknown() {
        let h = headers(&[
            ("phone", "+1"),
            ("ip_addr", "1.2.3.4"),
            ("region", "us"),
            ("guid", "g-1"),
            ("description", ""),
        ]);
        let parsed = InboundHeaders::from_raw(&h).unwrap();
        assert_eq!(parsed.description, UNKNOWN_DESCRIPTION);
    }

    #[test]
    fn missing_description_becomes_unknown() {
        let h = headers(&[
            ("phone", "+1"),
            ("ip_addr", "1.2.3.4"),
            ("region", "us"),
            ("guid", "g-1"),
        ]);
        let parsed = InboundHeaders::from_raw(&h).unwrap();
        assert_eq!(parsed.description, UNKNOWN_DESCRIPTION);
    }

    #[test]
    fn missing_phone_is_rejected() {
        let h = headers(&[("ip_addr", "1.2.3.4"), ("region", "us"), ("guid", "g-1")]);
        assert!(matches!(
            InboundHeaders::from_raw(&h),
            Err(MessageError::MissingHeader { name: "phone" })
        ));
    }
}
