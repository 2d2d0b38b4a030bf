use std::env;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio::io::BufReader;

use p1bridge::telegram::dispatch;
use p1bridge::{
    serial, ApiManager, Cli, FrameReader, FramingPolicy, GaugeRegistry, Mode, MqttSink,
    PrometheusSink, Sink, TelegramError,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    let default_filter = env::var("P1_LOG_LEVEL").unwrap_or("info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    let cli = Cli::parse();

    let result = match cli.mode {
        Mode::Prometheus { meter, port, framing, power_unit } => {
            let registry = Arc::new(GaugeRegistry::new());

            let api = ApiManager::new(registry.clone(), port);
            tokio::spawn(async move {
                api.start_thread().await;
            });

            let mut sink = PrometheusSink::new(registry, power_unit);
            run_meter_loop(&meter.dev, framing, &meter.meter_id, &mut sink).await
        }
        Mode::Mqtt { meter, host, port, framing, power_unit } => {
            let mut sink = MqttSink::new("p1bridge", &host, port, power_unit);
            run_meter_loop(&meter.dev, framing, &meter.meter_id, &mut sink).await
        }
    };

    // Any error that reaches this point is fatal; there is no retry
    // layer here, supervision is the operator's concern.
    if let Err(e) = result {
        error!("Meter loop failed: {}", e);
        return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    }
    Ok(())
}

async fn run_meter_loop(
    dev: &str,
    framing: FramingPolicy,
    meter_id: &str,
    sink: &mut dyn Sink,
) -> Result<(), TelegramError> {
    info!("Opening P1 port {}", dev);
    let port = serial::open(dev)?;
    let mut reader = FrameReader::new(BufReader::new(port), framing, meter_id);

    info!("Waiting for telegrams");
    loop {
        let telegram = reader.read_telegram().await?;
        dispatch::dispatch(&telegram, sink).await?;
    }
}
