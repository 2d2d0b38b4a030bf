use log::debug;

use super::frame::Telegram;
use super::tokenize::{tokenize, TokenizedLine};
use super::{units, TelegramError};
use crate::sink::Sink;

// DSMR P1 companion standard, page 20:
// https://www.netbeheernederland.nl/_upload/Files/Slimme_meter_15_a727fce1f1.pdf
pub const POWER_USED_TARIF1: &str = "1-0:1.8.1"; // kWh
pub const POWER_USED_TARIF2: &str = "1-0:1.8.2"; // kWh
pub const POWER_PRODUCED_TARIF1: &str = "1-0:2.8.1"; // kWh
pub const POWER_PRODUCED_TARIF2: &str = "1-0:2.8.2"; // kWh
pub const TARIF_INDICATOR: &str = "0-0:96.14.0"; // unitless
pub const ACTUAL_POWER_USAGE: &str = "1-0:1.7.0"; // kW
pub const ACTUAL_POWER_PRODUCTION: &str = "1-0:2.7.0"; // kW
pub const VOLTAGE_L1: &str = "1-0:32.7.0"; // V
pub const VOLTAGE_L2: &str = "1-0:52.7.0"; // V
pub const VOLTAGE_L3: &str = "1-0:72.7.0"; // V
pub const GAS_USED: &str = "0-1:24.2.1"; // m3

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tariff {
    T1,
    T2,
}

impl Tariff {
    pub fn label(self) -> &'static str {
        match self {
            Tariff::T1 => "1",
            Tariff::T2 => "2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    L1,
    L2,
    L3,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::L1 => "L1",
            Phase::L2 => "L2",
            Phase::L3 => "L3",
        }
    }
}

/// A semantic fact derived from one OBIS data line, already converted
/// to its canonical unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    PowerUsed { tariff: Tariff, kwh: f64 },
    PowerProduced { tariff: Tariff, kwh: f64 },
    TariffIndicator(i64),
    ActualPowerUsage { kw: f64 },
    ActualPowerProduction { kw: f64 },
    Voltage { phase: Phase, volts: f64 },
    GasUsed { cubic_meters: f64 },
}

/// Per-telegram power totals, summed over the tariffs seen in that
/// telegram only. Recomputed from scratch every cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelegramTotals {
    pub power_used_kwh: f64,
    pub power_produced_kwh: f64,
}

impl TelegramTotals {
    fn observe(&mut self, reading: &Reading) {
        match reading {
            Reading::PowerUsed { kwh, .. } => self.power_used_kwh += kwh,
            Reading::PowerProduced { kwh, .. } => self.power_produced_kwh += kwh,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Group0,
    /// Second value group; group0 then carries the metering timestamp.
    Group1,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    PowerUsed(Tariff),
    PowerProduced(Tariff),
    TariffIndicator,
    ActualPowerUsage,
    ActualPowerProduction,
    Voltage(Phase),
    GasUsed,
}

struct FieldSpec {
    code: &'static str,
    slot: Slot,
    field: Field,
}

const FIELD_TABLE: &[FieldSpec] = &[
    FieldSpec { code: POWER_USED_TARIF1, slot: Slot::Group0, field: Field::PowerUsed(Tariff::T1) },
    FieldSpec { code: POWER_USED_TARIF2, slot: Slot::Group0, field: Field::PowerUsed(Tariff::T2) },
    FieldSpec { code: POWER_PRODUCED_TARIF1, slot: Slot::Group0, field: Field::PowerProduced(Tariff::T1) },
    FieldSpec { code: POWER_PRODUCED_TARIF2, slot: Slot::Group0, field: Field::PowerProduced(Tariff::T2) },
    FieldSpec { code: TARIF_INDICATOR, slot: Slot::Group0, field: Field::TariffIndicator },
    FieldSpec { code: ACTUAL_POWER_USAGE, slot: Slot::Group0, field: Field::ActualPowerUsage },
    FieldSpec { code: ACTUAL_POWER_PRODUCTION, slot: Slot::Group0, field: Field::ActualPowerProduction },
    FieldSpec { code: VOLTAGE_L1, slot: Slot::Group0, field: Field::Voltage(Phase::L1) },
    FieldSpec { code: VOLTAGE_L2, slot: Slot::Group0, field: Field::Voltage(Phase::L2) },
    FieldSpec { code: VOLTAGE_L3, slot: Slot::Group0, field: Field::Voltage(Phase::L3) },
    FieldSpec { code: GAS_USED, slot: Slot::Group1, field: Field::GasUsed },
];

impl FieldSpec {
    fn reading(&self, line: &TokenizedLine) -> Result<Reading, TelegramError> {
        let token = match self.slot {
            Slot::Group0 => line.group0.as_str(),
            Slot::Group1 => line.group1.as_deref().ok_or_else(|| {
                TelegramError::Parse(format!("{} line is missing its second value group", self.code))
            })?,
        };

        Ok(match self.field {
            Field::PowerUsed(tariff) => Reading::PowerUsed {
                tariff,
                kwh: units::kilowatt(units::to_f64(token)?),
            },
            Field::PowerProduced(tariff) => Reading::PowerProduced {
                tariff,
                kwh: units::kilowatt(units::to_f64(token)?),
            },
            Field::TariffIndicator => Reading::TariffIndicator(units::to_i64(token)?),
            Field::ActualPowerUsage => Reading::ActualPowerUsage {
                kw: units::kilowatt(units::to_f64(token)?),
            },
            Field::ActualPowerProduction => Reading::ActualPowerProduction {
                kw: units::kilowatt(units::to_f64(token)?),
            },
            Field::Voltage(phase) => Reading::Voltage {
                phase,
                volts: units::volt(units::to_f64(token)?),
            },
            Field::GasUsed => Reading::GasUsed {
                cubic_meters: units::cubic_meters(units::to_f64(token)?),
            },
        })
    }
}

/// Resolves every data line of a telegram against the OBIS table and
/// feeds the resulting readings to the sink, finishing with the
/// per-telegram totals.
pub async fn dispatch(telegram: &Telegram, sink: &mut dyn Sink) -> Result<(), TelegramError> {
    let mut totals = TelegramTotals::default();

    for raw in &telegram.lines {
        let Some(line) = tokenize(raw)? else {
            continue;
        };
        let Some(spec) = FIELD_TABLE.iter().find(|s| s.code == line.code) else {
            debug!("Ignoring unmapped OBIS code {}", line.code);
            continue;
        };
        let reading = spec.reading(&line)?;
        totals.observe(&reading);
        sink.update(&reading).await?;
    }

    sink.complete(&totals).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkError;
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingSink {
        readings: Vec<Reading>,
        totals: Option<TelegramTotals>,
    }

    #[async_trait]
    impl Sink for RecordingSink {
        async fn update(&mut self, reading: &Reading) -> Result<(), SinkError> {
            self.readings.push(reading.clone());
            Ok(())
        }

        async fn complete(&mut self, totals: &TelegramTotals) -> Result<(), SinkError> {
            self.totals = Some(totals.clone());
            Ok(())
        }
    }

    fn telegram(lines: &[&[u8]]) -> Telegram {
        Telegram {
            lines: lines.iter().map(|l| l.to_vec()).collect(),
        }
    }

    #[tokio::test]
    async fn test_full_telegram_round_trip() {
        let telegram = telegram(&[
            b"/KFM5KAIFA-METER",
            b"1-0:1.8.1(000123.456*kWh)",
            b"1-0:2.8.1(000012.000*kWh)",
            b"0-0:96.14.0(0002)",
            b"1-0:1.7.0(00.345*kW)",
            b"0-1:24.2.1(210101120000W)(00012.345*m3)",
            b"!1234",
        ]);

        let mut sink = RecordingSink::default();
        dispatch(&telegram, &mut sink).await.unwrap();

        assert_eq!(
            sink.readings,
            vec![
                Reading::PowerUsed { tariff: Tariff::T1, kwh: 123.456 },
                Reading::PowerProduced { tariff: Tariff::T1, kwh: 12.0 },
                Reading::TariffIndicator(2),
                Reading::ActualPowerUsage { kw: 0.345 },
                Reading::GasUsed { cubic_meters: 12.345 },
            ]
        );
        let totals = sink.totals.unwrap();
        assert_eq!(totals.power_used_kwh, 123.456);
        assert_eq!(totals.power_produced_kwh, 12.0);
    }

    #[tokio::test]
    async fn test_gas_line_reads_the_second_group() {
        let telegram = telegram(&[b"0-1:24.2.1(210101120000W)(00012.345*m3)", b"!1234"]);
        let mut sink = RecordingSink::default();
        dispatch(&telegram, &mut sink).await.unwrap();
        assert_eq!(sink.readings, vec![Reading::GasUsed { cubic_meters: 12.345 }]);
    }

    #[tokio::test]
    async fn test_gas_line_without_second_group_fails_fast() {
        let telegram = telegram(&[b"0-1:24.2.1(00012.345*m3)", b"!1234"]);
        let mut sink = RecordingSink::default();
        let err = dispatch(&telegram, &mut sink).await.unwrap_err();
        assert!(matches!(err, TelegramError::Parse(_)));
    }

    #[tokio::test]
    async fn test_unknown_codes_are_ignored() {
        let telegram = telegram(&[
            b"0-0:96.7.21(00004)",
            b"1-0:99.97.0(0)(0-0:96.7.19)",
            b"!1234",
        ]);
        let mut sink = RecordingSink::default();
        dispatch(&telegram, &mut sink).await.unwrap();
        assert!(sink.readings.is_empty());
        assert_eq!(sink.totals, Some(TelegramTotals::default()));
    }

    #[tokio::test]
    async fn test_totals_cover_both_tariffs() {
        let telegram = telegram(&[
            b"1-0:1.8.1(000100.000*kWh)",
            b"1-0:1.8.2(000023.456*kWh)",
            b"1-0:2.8.1(000010.000*kWh)",
            b"1-0:2.8.2(000002.000*kWh)",
            b"!1234",
        ]);
        let mut sink = RecordingSink::default();
        dispatch(&telegram, &mut sink).await.unwrap();
        let totals = sink.totals.unwrap();
        assert_eq!(totals.power_used_kwh, 123.456);
        assert_eq!(totals.power_produced_kwh, 12.0);
    }

    #[tokio::test]
    async fn test_totals_are_reset_between_telegrams() {
        let telegram = telegram(&[b"1-0:1.8.1(000100.000*kWh)", b"!1234"]);
        let mut sink = RecordingSink::default();
        dispatch(&telegram, &mut sink).await.unwrap();
        dispatch(&telegram, &mut sink).await.unwrap();
        // Summed within one telegram only, never accumulated across cycles.
        assert_eq!(sink.totals.unwrap().power_used_kwh, 100.0);
    }

    #[tokio::test]
    async fn test_voltage_lines_map_to_phases() {
        let telegram = telegram(&[
            b"1-0:32.7.0(230.1*V)",
            b"1-0:52.7.0(229.8*V)",
            b"1-0:72.7.0(231.0*V)",
            b"!1234",
        ]);
        let mut sink = RecordingSink::default();
        dispatch(&telegram, &mut sink).await.unwrap();
        assert_eq!(
            sink.readings,
            vec![
                Reading::Voltage { phase: Phase::L1, volts: 230.1 },
                Reading::Voltage { phase: Phase::L2, volts: 229.8 },
                Reading::Voltage { phase: Phase::L3, volts: 231.0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_actual_power_production_matches_its_code() {
        let telegram = telegram(&[b"1-0:2.7.0(00.100*kW)", b"!1234"]);
        let mut sink = RecordingSink::default();
        dispatch(&telegram, &mut sink).await.unwrap();
        assert_eq!(sink.readings, vec![Reading::ActualPowerProduction { kw: 0.1 }]);
    }
}
