use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};

use super::{MessageSink, Sink, SinkError};
use crate::config::PowerUnit;
use crate::telegram::dispatch::{Reading, TelegramTotals};

pub struct MqttSink {
    client: AsyncClient,
    power_unit: PowerUnit,
}

impl MqttSink {
    /// Connects to the broker and spawns the event loop driver task.
    /// The connection is owned here; the dispatcher only sees the
    /// `Sink` contract.
    pub fn new(client_name: &str, host: &str, port: u16, power_unit: PowerUnit) -> Self {
        info!("MQTT connection starting up");
        let mut options = MqttOptions::new(client_name, host, port);
        options.set_keep_alive(Duration::from_secs(5));

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        tokio::spawn(async move {
            info!("MQTT Eventloop started");
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Connected to MQTT broker");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Error in MQTT {:?}, reconnecting ", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Self { client, power_unit }
    }
}

fn kilowatt_hours(v: f64) -> String {
    format!("{} kWh", v)
}

fn volts(v: f64) -> String {
    format!("{} V", v)
}

fn cubic_meters(v: f64) -> String {
    format!("{} m³", v)
}

fn tarif(t: i64) -> String {
    format!("T{}", t)
}

fn power(unit: PowerUnit, kw: f64) -> String {
    format!("{} {}", unit.from_kilowatt(kw), unit.symbol())
}

#[async_trait]
impl MessageSink for MqttSink {
    async fn publish(&mut self, topic: &str, payload: String) -> Result<(), SinkError> {
        debug!("Publishing {} -> {}", topic, payload);
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Sink for MqttSink {
    async fn update(&mut self, reading: &Reading) -> Result<(), SinkError> {
        let (topic, payload) = match reading {
            Reading::PowerUsed { tariff, kwh } => (
                format!("p1/power_used/T{}", tariff.label()),
                kilowatt_hours(*kwh),
            ),
            Reading::PowerProduced { tariff, kwh } => (
                format!("p1/power_produced/T{}", tariff.label()),
                kilowatt_hours(*kwh),
            ),
            Reading::TariffIndicator(t) => ("p1/tarif".to_string(), tarif(*t)),
            Reading::ActualPowerUsage { kw } => (
                "p1/actual_power_usage".to_string(),
                power(self.power_unit, *kw),
            ),
            Reading::ActualPowerProduction { kw } => (
                "p1/actual_power_production".to_string(),
                power(self.power_unit, *kw),
            ),
            Reading::Voltage { phase, volts: v } => {
                (format!("p1/voltage/{}", phase.label()), volts(*v))
            }
            Reading::GasUsed { cubic_meters: v } => {
                ("p1/gas_used".to_string(), cubic_meters(*v))
            }
        };
        self.publish(&topic, payload).await
    }

    async fn complete(&mut self, totals: &TelegramTotals) -> Result<(), SinkError> {
        self.publish("p1/power_used", kilowatt_hours(totals.power_used_kwh))
            .await?;
        self.publish("p1/power_produced", kilowatt_hours(totals.power_produced_kwh))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_formats() {
        assert_eq!(kilowatt_hours(123.456), "123.456 kWh");
        assert_eq!(volts(230.1), "230.1 V");
        assert_eq!(cubic_meters(12.345), "12.345 m³");
        assert_eq!(tarif(2), "T2");
    }

    #[test]
    fn test_power_payload_follows_the_unit_config() {
        assert_eq!(power(PowerUnit::Kw, 0.5), "0.5 kW");
        assert_eq!(power(PowerUnit::W, 0.5), "500 W");
    }
}
