use clap::{Args, Parser, Subcommand, ValueEnum};

/// Identification line of the meter this tool was written against.
pub const DEFAULT_METER_ID: &str = "/KFM5KAIFA-METER";

#[derive(Parser, Debug)]
#[command(name = "p1bridge", version)]
#[command(about = "Bridge DSMR P1 smart meter telemetry to Prometheus or MQTT")]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Expose the meter readings as Prometheus gauges
    Prometheus {
        #[command(flatten)]
        meter: MeterArgs,

        /// The port number to bind the exporter to
        #[arg(long, default_value_t = 9005)]
        port: u16,

        #[arg(long, value_enum, default_value_t = FramingPolicy::HeaderGated)]
        framing: FramingPolicy,

        /// Unit used for the actual power gauges
        #[arg(long, value_enum, default_value_t = PowerUnit::Kw)]
        power_unit: PowerUnit,
    },
    /// Publish the meter readings to an MQTT broker
    Mqtt {
        #[command(flatten)]
        meter: MeterArgs,

        /// The hostname of the MQTT broker
        #[arg(long, default_value = "mqtt.local")]
        host: String,

        /// The port of the MQTT broker
        #[arg(long, default_value_t = 1883)]
        port: u16,

        #[arg(long, value_enum, default_value_t = FramingPolicy::HeaderAgnostic)]
        framing: FramingPolicy,

        /// Unit used for the actual power payloads
        #[arg(long, value_enum, default_value_t = PowerUnit::W)]
        power_unit: PowerUnit,
    },
}

#[derive(Args, Debug)]
pub struct MeterArgs {
    /// P1 port TTY device
    pub dev: String,

    /// Identification line that opens a telegram (header-gated framing)
    #[arg(long, default_value = DEFAULT_METER_ID)]
    pub meter_id: String,
}

/// How the frame reader recognizes the start of a telegram.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingPolicy {
    /// Discard lines until the meter identification line is seen
    HeaderGated,
    /// Collect lines from the current stream position
    HeaderAgnostic,
}

/// Scale used when reporting the momentary power readings.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUnit {
    Kw,
    W,
}

impl PowerUnit {
    pub fn gauge_suffix(self) -> &'static str {
        match self {
            PowerUnit::Kw => "kw",
            PowerUnit::W => "w",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            PowerUnit::Kw => "kW",
            PowerUnit::W => "W",
        }
    }

    /// The telegram always carries kW; the W variant is scaled here.
    pub fn from_kilowatt(self, kw: f64) -> f64 {
        match self {
            PowerUnit::Kw => kw,
            PowerUnit::W => kw * 1000.0,
        }
    }
}
