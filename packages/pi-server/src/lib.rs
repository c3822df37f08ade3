//! The PI server binary's library half: configuration, the transport
//! seam and its implementations, the session store, the timer registry,
//! and the [`SessionEngine`] that ties them together.
//!
//! - **Config** ([`config`]): YAML configuration document
//! - **Transport** ([`transport`]): the [`transport::Transport`] trait,
//!   plus [`transport::amqp`] (production) and [`transport::testkit`]
//!   (in-memory double)
//! - **Store** ([`store`]): [`store::RecordStore`], the session index
//! - **Timer** ([`timer`]): [`timer::TimerSet`], the periodic-task registry
//! - **Error** ([`error`]): [`error::EngineError`]
//! - **Engine** ([`engine`]): [`engine::SessionEngine`], the orchestrator

pub mod config;
pub mod engine;
pub mod error;
pub mod store;
pub mod timer;
pub mod transport;

pub use config::Config;
pub use engine::SessionEngine;
pub use error::EngineError;
pub use store::RecordStore;
pub use timer::TimerSet;
pub use transport::{amqp::AmqpTransport, testkit::ChannelTransport, InboundDelivery, Transport};
