//! PI core -- the `Session` record model, the injectable clock, and the
//! inbound/outbound wire schemas shared between the transport adapter and
//! the session engine.
//!
//! - **Clock** ([`clock`]): `Clock` trait + `SystemClock`/`VirtualClock`
//! - **Record** ([`record`]): the `Session` type and its eligibility
//!   predicates
//! - **Messages** ([`messages`]): inbound routing key + header validation
//! - **Manifest** ([`manifest`]): outbound manifest wire schema

pub mod clock;
pub mod manifest;
pub mod messages;
pub mod record;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use manifest::{published_at, serialize_manifest, ManifestEntry, ManifestHeaders};
pub use messages::{InboundHeaders, MessageError, RoutingKey, UNKNOWN_DESCRIPTION};
pub use record::Session;
