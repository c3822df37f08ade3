//! In-memory [`Transport`] double used by the test suite in lieu of a
//! running broker -- analogous to how `pi_core::VirtualClock` substitutes
//! for `SystemClock`.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use pi_core::ManifestHeaders;

use super::{InboundDelivery, Transport};
use crate::config::ConsumerBindings;
use crate::error::EngineError;

/// A published manifest, captured for test assertions.
#[derive(Debug, Clone)]
pub struct PublishedManifest {
    pub exchange: String,
    pub routing_key: String,
    pub headers: ManifestHeaders,
    pub body: Vec<u8>,
}

/// Scriptable fake transport: tests push inbound deliveries onto `pending`
/// and assert against `published`/`acked`/`rejected` afterwards.
#[derive(Default)]
pub struct ChannelTransport {
    pending: VecDeque<InboundDelivery>,
    pub published: Vec<PublishedManifest>,
    pub acked: Vec<u64>,
    pub rejected: Vec<(u64, String)>,
    pub consumer_initialized: bool,
    pub publisher_initialized: bool,
    pub stopped: bool,
    next_tag: u64,
}

impl ChannelTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a `start`/`stop` message with the given routing key and
    /// headers, to be returned by the next [`Transport::recv`] call.
    pub fn push_message(&mut self, routing_key: &str, headers: &[(&str, &str)]) -> u64 {
        self.next_tag += 1;
        let tag = self.next_tag;
        self.pending.push_back(InboundDelivery {
            delivery_tag: tag,
            routing_key: routing_key.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        tag
    }

    /// Convenience wrapper for a well-formed `start`/`stop` message.
    pub fn push_session_message(
        &mut self,
        routing_key: &str,
        phone: &str,
        ip_addr: &str,
        region: &str,
        guid: &str,
        description: &str,
    ) -> u64 {
        self.push_message(
            routing_key,
            &[
                ("phone", phone),
                ("ip_addr", ip_addr),
                ("region", region),
                ("guid", guid),
                ("description", description),
            ],
        )
    }

    #[must_use]
    pub fn headers_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn init_consumer(&mut self, _bindings: &ConsumerBindings) -> Result<(), EngineError> {
        self.consumer_initialized = true;
        Ok(())
    }

    async fn init_publisher(&mut self, _exchange: &str) -> Result<(), EngineError> {
        self.publisher_initialized = true;
        Ok(())
    }

    async fn recv(&mut self, _timeout: Duration) -> Result<Option<InboundDelivery>, EngineError> {
        Ok(self.pending.pop_front())
    }

    async fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        headers: ManifestHeaders,
        body: Vec<u8>,
    ) -> Result<(), EngineError> {
        self.published.push(PublishedManifest {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            headers,
            body,
        });
        Ok(())
    }

    async fn reject(&mut self, delivery_tag: u64, reason: &str) -> Result<(), EngineError> {
        self.rejected.push((delivery_tag, reason.to_string()));
        Ok(())
    }

    async fn ack(&mut self, delivery_tag: u64) -> Result<(), EngineError> {
        self.acked.push(delivery_tag);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        self.stopped = true;
        Ok(())
    }
}
