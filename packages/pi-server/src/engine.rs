//! The orchestrator (`spec.md` §4.2): owns the [`RecordStore`] and
//! [`TimerSet`], handles inbound messages, runs the periodic manifest
//! cycle, and emits manifests through a [`Transport`].

use std::sync::Arc;
use std::time::Duration;

use pi_core::{Clock, InboundHeaders, ManifestEntry, ManifestHeaders, RoutingKey};
use tracing::{debug, info, warn};

use crate::config::{Config, ConsumerBindings};
use crate::error::EngineError;
use crate::store::RecordStore;
use crate::timer::TimerSet;
use crate::transport::{InboundDelivery, Transport};

/// Name of the engine's one registered timer (matches the source's
/// `TIMER = 'pi_manifest'` constant).
const MANIFEST_TIMER: &str = "pi_manifest";

/// Default bounded-wait duration for [`Transport::recv`] (`spec.md` §4.4).
/// 1 second keeps logs easy to follow in development while staying well
/// under any reasonable publish cadence.
const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Stateful session aggregator: ingests `start`/`stop` messages, maintains
/// the bounded in-memory session index, and publishes a capped manifest on
/// a fixed cadence.
pub struct SessionEngine<T: Transport> {
    store: RecordStore,
    timers: TimerSet,
    transport: T,
    clock: Arc<dyn Clock>,
    bindings: ConsumerBindings,
    refresh_time: i64,
    manifest_size: usize,
    cooldown_time: i64,
    active_time: i64,
    publish_exchange: String,
    publish_key: String,
    recv_timeout: Duration,
}

impl<T: Transport> SessionEngine<T> {
    #[must_use]
    pub fn new(transport: T, clock: Arc<dyn Clock>, config: Config) -> Self {
        let store = RecordStore::new(Arc::clone(&clock));
        let timers = TimerSet::new(Arc::clone(&clock));
        Self {
            store,
            timers,
            transport,
            clock,
            bindings: config.consumer_bindings,
            refresh_time: config.refresh_time,
            manifest_size: config.manifest_size,
            cooldown_time: config.cooldown_time,
            active_time: config.active_time,
            publish_exchange: config.publish_exchange,
            publish_key: config.publish_key,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
        }
    }

    /// Overrides the bounded-wait duration. Primarily useful in tests,
    /// where a full 1-second wait per empty poll would make the suite slow.
    #[must_use]
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Read access to the session index, primarily for test assertions.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Read access to the transport, primarily for test assertions against
    /// [`crate::transport::testkit::ChannelTransport`]'s recorded calls.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport, so tests can enqueue deliveries on
    /// a [`crate::transport::testkit::ChannelTransport`] already owned by
    /// the engine.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Declares the consumer/publisher, registers the manifest timer, and
    /// enters the consume loop. Returns only on transport termination or
    /// an unrecoverable error (`spec.md` §4.2) -- the caller is expected to
    /// be under a supervisor that restarts the process.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        info!("starting up PI");
        self.transport.init_consumer(&self.bindings).await?;
        self.transport.init_publisher(&self.publish_exchange).await?;
        self.timers.add(MANIFEST_TIMER, self.refresh_time);

        let result = self.consume_loop().await;

        info!("stopping PI");
        self.timers.delete(MANIFEST_TIMER);
        if let Err(e) = self.transport.stop().await {
            warn!(error = %e, "error while closing transport during shutdown");
        }
        result
    }

    async fn consume_loop(&mut self) -> Result<(), EngineError> {
        loop {
            match self.transport.recv(self.recv_timeout).await? {
                Some(delivery) => self.handle(delivery).await?,
                None => self.run_due_timers().await?,
            }
        }
    }

    async fn run_due_timers(&mut self) -> Result<(), EngineError> {
        for name in self.timers.due_names() {
            if name == MANIFEST_TIMER {
                self.publish_manifest().await?;
            }
            self.timers.mark_ran(&name);
        }
        Ok(())
    }

    /// Per-message callback (`spec.md` §4.2): routing-key dispatch,
    /// header validation, then the `start`/`stop` handler.
    pub async fn handle(&mut self, delivery: InboundDelivery) -> Result<(), EngineError> {
        let routing_key = match RoutingKey::parse(&delivery.routing_key) {
            Ok(key) => key,
            Err(e) => {
                self.transport.reject(delivery.delivery_tag, &e.to_string()).await?;
                return Ok(());
            }
        };

        let headers = match InboundHeaders::from_raw(&delivery.headers) {
            Ok(headers) => headers,
            Err(e) => {
                self.transport.reject(delivery.delivery_tag, &e.to_string()).await?;
                return Ok(());
            }
        };

        match routing_key {
            RoutingKey::Start => self.on_start(headers)?,
            RoutingKey::Stop => self.on_stop(&headers.phone),
        }

        self.transport.ack(delivery.delivery_tag).await?;
        Ok(())
    }

    fn on_start(&mut self, headers: InboundHeaders) -> Result<(), EngineError> {
        if self.store.get(&headers.phone).is_none() {
            self.store
                .insert(
                    headers.phone.clone(),
                    headers.ip_addr,
                    headers.region,
                    headers.guid,
                    headers.description,
                )
                .map_err(|_| EngineError::DuplicateInsert)?;
            info!(phone = %headers.phone, "inserted new session");
        } else {
            self.store.touch(&headers.phone);
            info!(phone = %headers.phone, "refreshed existing session");
        }
        Ok(())
    }

    fn on_stop(&mut self, phone: &str) {
        let removed = self.store.delete_if_not_in_cooldown(phone);
        if removed == 0 {
            warn!(phone, "stop received for a phone not in the cache (or still in cooldown)");
        } else {
            info!(phone, "removed session");
        }
    }

    /// The periodic manifest cycle (`spec.md` §4.2): prune, balance
    /// cooldown, select, mark & emit. Runs as one atomic-per-invocation
    /// sequence of store operations -- nothing suspends partway through,
    /// so the cycle is indivisible with respect to `handle`.
    pub async fn publish_manifest(&mut self) -> Result<(), EngineError> {
        let expired = self.store.delete_expired(self.active_time);
        debug!(count = expired, "pruned expired records");
        let cooled_down = self.store.delete_finished_cooldown();
        debug!(count = cooled_down, "pruned records that finished cooldown");

        let mut eligible = self.store.select_eligible(self.active_time);
        if eligible.len() > self.manifest_size {
            info!(
                eligible = eligible.len(),
                manifest_size = self.manifest_size,
                "cache oversized, sending tasked records to cooldown"
            );
            self.store.send_all_tasked_to_cooldown(self.cooldown_time);
            eligible = self.store.select_eligible(self.active_time);
        }
        if eligible.len() < self.manifest_size {
            self.store.release_recent_from_cooldown(self.active_time);
        }

        let mut chosen = self.store.select_eligible(self.active_time);
        if chosen.len() > self.manifest_size {
            let over_count = chosen.len() - self.manifest_size;
            warn!(over_count, "cache still oversized after balancing; ignoring oldest records");
            chosen.truncate(self.manifest_size);
        }

        let phones: Vec<String> = chosen.iter().map(|s| s.phone.clone()).collect();
        self.store.mark_tasked(&phones);

        let now = self.clock.now();
        let entries: Vec<ManifestEntry> = chosen.iter().map(ManifestEntry::from).collect();
        let body = pi_core::serialize_manifest(&entries)?;
        let headers = ManifestHeaders::new(now, entries.len());

        info!(records = entries.len(), "publishing manifest");
        self.transport
            .publish(&self.publish_exchange, &self.publish_key, headers, body)
            .await?;
        Ok(())
    }
}
