//! Output sinks. The telegram dispatcher only sees the [`Sink`] trait;
//! the transports behind it (gauge registry served over HTTP, MQTT
//! client) are constructed once at startup and handed in.

pub mod mqtt;
pub mod prometheus;

use async_trait::async_trait;
use thiserror::Error;

use crate::telegram::dispatch::{Reading, TelegramTotals};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("mqtt publish failed: {0}")]
    Mqtt(#[from] rumqttc::ClientError),
}

/// Capability of a pull-style sink: idempotent last-write-wins updates
/// of named, optionally labeled gauges. No history is retained.
pub trait MetricSink {
    fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64);
}

/// Capability of a push-style sink: fire-and-forget delivery of a
/// formatted payload to a named topic.
#[async_trait]
pub trait MessageSink {
    async fn publish(&mut self, topic: &str, payload: String) -> Result<(), SinkError>;
}

/// Adapter contract used by the field dispatcher: one `update` per
/// reading, then one `complete` with the per-telegram totals. Only
/// sinks that support aggregates override `complete`.
#[async_trait]
pub trait Sink: Send {
    async fn update(&mut self, reading: &Reading) -> Result<(), SinkError>;

    async fn complete(&mut self, totals: &TelegramTotals) -> Result<(), SinkError> {
        let _ = totals;
        Ok(())
    }
}
