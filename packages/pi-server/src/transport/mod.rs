//! Transport adapter seam (`spec.md` §4.4).
//!
//! The engine talks to the bus only through this trait -- declare/consume/
//! publish/ack/reject/stop -- never touching a broker handle directly.
//! [`amqp::AmqpTransport`] is the production implementation (`lapin`);
//! [`testkit::ChannelTransport`] is an in-memory double used by the test
//! suite in lieu of a running broker.

pub mod amqp;
pub mod testkit;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use pi_core::ManifestHeaders;

use crate::config::ConsumerBindings;
use crate::error::EngineError;

/// One inbound delivery, already decoded into routing key + string
/// headers -- the engine never sees a broker-specific type.
#[derive(Debug, Clone)]
pub struct InboundDelivery {
    pub delivery_tag: u64,
    pub routing_key: String,
    pub headers: HashMap<String, String>,
}

/// Fixed dead-letter exchange name (`spec.md` §6).
pub const DEAD_LETTER_EXCHANGE: &str = "dead-letter";

/// Capability-set the engine needs from the message bus.
#[async_trait]
pub trait Transport: Send {
    /// Declares the inbound exchange/queue and binds the configured
    /// routing keys (`spec.md` §4.4).
    async fn init_consumer(&mut self, bindings: &ConsumerBindings) -> Result<(), EngineError>;

    /// Declares the outbound exchange with the same durability/
    /// alternate-exchange properties as the inbound one.
    async fn init_publisher(&mut self, exchange: &str) -> Result<(), EngineError>;

    /// Waits up to `timeout` for one delivery. `None` on expiry -- the
    /// caller should then advance its timers. This bounded wait is the
    /// only suspension point that lets timers fire (`spec.md` §5).
    async fn recv(&mut self, timeout: Duration) -> Result<Option<InboundDelivery>, EngineError>;

    /// Publishes a manifest body with the given headers.
    async fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        headers: ManifestHeaders,
        body: Vec<u8>,
    ) -> Result<(), EngineError>;

    /// Dead-letters a delivery (`requeue=false`) and logs the reason.
    async fn reject(&mut self, delivery_tag: u64, reason: &str) -> Result<(), EngineError>;

    /// Acknowledges a delivery.
    async fn ack(&mut self, delivery_tag: u64) -> Result<(), EngineError>;

    /// Closes the channel then the connection. Idempotent.
    async fn stop(&mut self) -> Result<(), EngineError>;
}
