use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{MetricSink, Sink, SinkError};
use crate::config::PowerUnit;
use crate::telegram::dispatch::Reading;

type LabelSet = Vec<(String, String)>;

struct GaugeFamily {
    help: &'static str,
    samples: BTreeMap<LabelSet, f64>,
}

/// An explicit registry of gauges with last-write-wins semantics,
/// shared between the meter loop (writer) and the HTTP scrape
/// handlers (readers).
pub struct GaugeRegistry {
    families: RwLock<BTreeMap<String, GaugeFamily>>,
}

impl GaugeRegistry {
    pub fn new() -> Self {
        Self {
            families: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers a gauge family so it shows up in the exposition with
    /// its help text even before the first sample arrives.
    pub fn describe(&self, name: &str, help: &'static str) {
        let mut families = self.families.write().unwrap();
        families
            .entry(name.to_string())
            .or_insert_with(|| GaugeFamily {
                help,
                samples: BTreeMap::new(),
            })
            .help = help;
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let families = self.families.read().unwrap();
        let mut out = String::new();
        for (name, family) in families.iter() {
            if !family.help.is_empty() {
                out.push_str(&format!("# HELP {} {}\n", name, family.help));
            }
            out.push_str(&format!("# TYPE {} gauge\n", name));
            for (labels, value) in &family.samples {
                if labels.is_empty() {
                    out.push_str(&format!("{} {}\n", name, value));
                } else {
                    let rendered: Vec<String> = labels
                        .iter()
                        .map(|(k, v)| format!("{}=\"{}\"", k, v))
                        .collect();
                    out.push_str(&format!("{}{{{}}} {}\n", name, rendered.join(","), value));
                }
            }
        }
        out
    }
}

impl Default for GaugeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSink for GaugeRegistry {
    fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let key: LabelSet = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut families = self.families.write().unwrap();
        families
            .entry(name.to_string())
            .or_insert_with(|| GaugeFamily {
                help: "",
                samples: BTreeMap::new(),
            })
            .samples
            .insert(key, value);
    }
}

/// Maps readings onto the exporter gauge set. Gas usage has no gauge
/// counterpart and is dropped here.
pub struct PrometheusSink {
    registry: Arc<GaugeRegistry>,
    power_unit: PowerUnit,
    usage_gauge: String,
    production_gauge: String,
}

impl PrometheusSink {
    pub fn new(registry: Arc<GaugeRegistry>, power_unit: PowerUnit) -> Self {
        let usage_gauge = format!("p1_actual_power_usage_{}", power_unit.gauge_suffix());
        let production_gauge = format!("p1_actual_power_production_{}", power_unit.gauge_suffix());

        registry.describe(
            "p1_power_used_kwh",
            "The total amount of power consumed from the net",
        );
        registry.describe(
            "p1_power_produced_kwh",
            "The total amount of power delivered back to the net",
        );
        registry.describe("p1_tarif", "The currently active tarif");
        registry.describe(&usage_gauge, "The current rate of power being consumed");
        registry.describe(&production_gauge, "The current rate of power being produced");
        registry.describe("p1_actual_voltage", "The momentary voltage per phase");

        Self {
            registry,
            power_unit,
            usage_gauge,
            production_gauge,
        }
    }
}

#[async_trait]
impl Sink for PrometheusSink {
    async fn update(&mut self, reading: &Reading) -> Result<(), SinkError> {
        match reading {
            Reading::PowerUsed { tariff, kwh } => {
                self.registry
                    .set_gauge("p1_power_used_kwh", &[("tarif", tariff.label())], *kwh);
            }
            Reading::PowerProduced { tariff, kwh } => {
                self.registry
                    .set_gauge("p1_power_produced_kwh", &[("tarif", tariff.label())], *kwh);
            }
            Reading::TariffIndicator(tarif) => {
                self.registry.set_gauge("p1_tarif", &[], *tarif as f64);
            }
            Reading::ActualPowerUsage { kw } => {
                self.registry
                    .set_gauge(&self.usage_gauge, &[], self.power_unit.from_kilowatt(*kw));
            }
            Reading::ActualPowerProduction { kw } => {
                self.registry.set_gauge(
                    &self.production_gauge,
                    &[],
                    self.power_unit.from_kilowatt(*kw),
                );
            }
            Reading::Voltage { phase, volts } => {
                self.registry
                    .set_gauge("p1_actual_voltage", &[("phase", phase.label())], *volts);
            }
            Reading::GasUsed { .. } => {}
        }
        Ok(())
    }
}
