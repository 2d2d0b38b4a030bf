//! DSMR P1 telemetry bridge
//!
//! Reads telegrams from the P1 serial port of a Dutch smart meter and
//! republishes the readings either as pollable Prometheus gauges or as
//! push-style MQTT messages.

pub mod api;
pub mod config;
pub mod serial;
pub mod sink;
pub mod telegram;

// Re-export common types for easier access
pub use api::ApiManager;
pub use config::{Cli, FramingPolicy, Mode, PowerUnit};
pub use sink::mqtt::MqttSink;
pub use sink::prometheus::{GaugeRegistry, PrometheusSink};
pub use sink::{MessageSink, MetricSink, Sink, SinkError};
pub use telegram::frame::{FrameReader, Telegram};
pub use telegram::TelegramError;
