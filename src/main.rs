use tempserve::clock::SystemClock;
use tempserve::config::{Config, SensorBackend};
use tempserve::sensor::{DeviceAddress, OneWireBus, SimulatedBus, SysfsBus, TemperatureSensor};
use tempserve::sensor::onewire::FAMILY_DS18B20;
use tempserve::server::{self, ServerContext};
use tokio::net::TcpListener;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let listener = server::bind(&cfg.server).await?;
    tracing::info!("Server started on {}", cfg.server.listen_addr);

    tokio::select! {
        res = serve(listener, &cfg) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

async fn serve(listener: TcpListener, cfg: &Config) -> anyhow::Result<()> {
    match cfg.sensor.backend {
        SensorBackend::Sysfs => {
            tracing::info!(dir = %cfg.sensor.devices_dir.display(), "Using kernel w1 bus");
            run_with(listener, SysfsBus::new(&cfg.sensor.devices_dir), cfg).await
        }
        SensorBackend::Simulated => {
            tracing::warn!(celsius = cfg.sensor.simulated_celsius, "Using simulated sensor");
            let bus = SimulatedBus::new(
                vec![DeviceAddress::new(FAMILY_DS18B20, 1)],
                cfg.sensor.simulated_celsius,
            );
            run_with(listener, bus, cfg).await
        }
    }
}

async fn run_with<B: OneWireBus>(listener: TcpListener, bus: B, cfg: &Config) -> anyhow::Result<()> {
    let sensor = TemperatureSensor::with_settle(bus, cfg.sensor.settle());
    let ctx = ServerContext::new(listener, sensor, SystemClock, cfg.server.limits());
    server::run(&ctx).await
}
