use std::sync::Arc;

use infrastructure::Mqtt;
use settings::Settings;

use crate::runner::ClimateRunner;

mod adapter;
mod climate;
mod core;
pub mod port;
mod runner;
mod settings;

struct Infrastructure {
    mqtt_client: Mqtt,
}

#[tokio::main(flavor = "multi_thread")]
pub async fn main() {
    let settings = Settings::new().expect("Error reading configuration");

    let mut infrastructure = Infrastructure::init(&settings)
        .await
        .expect("Error initializing infrastructure");

    let climate_config = Arc::new(settings.climate.clone());
    tracing::info!(
        "Controlling climate of rooms {:?}",
        climate_config.room_ids().map(|r| r.as_str()).collect::<Vec<_>>()
    );

    let sensors = settings
        .homeassistant
        .new_sensor_source()
        .expect("Error creating Home Assistant sensor source");
    let actuators = settings
        .homeassistant
        .new_actuator_sink()
        .expect("Error creating Home Assistant actuator sink");

    let climate_runner = ClimateRunner::new(climate_config.clone(), sensors, actuators);

    let ha_event_listener = settings
        .homeassistant
        .new_event_listener(
            &mut infrastructure.mqtt_client,
            &climate_config,
            climate_runner.event_sender(),
        )
        .await
        .expect("Error subscribing to Home Assistant events");

    let http_server_exec = {
        let status_rx = climate_runner.subscribe_status();
        let event_tx = climate_runner.event_sender();

        async move {
            settings
                .http_server
                .run_server(move || vec![adapter::status::new_routes(status_rx.clone(), event_tx.clone())])
                .await
                .expect("HTTP server execution failed");
        }
    };

    tracing::info!("Starting infrastructure processing");
    let process_infrastucture = infrastructure.process();

    tracing::info!("Starting main loop");

    tokio::select!(
        _ = process_infrastucture => {},
        _ = climate_runner.run() => {},
        _ = ha_event_listener.run() => {},
        _ = http_server_exec => {},
    );
}

impl Infrastructure {
    pub async fn init(settings: &Settings) -> anyhow::Result<Self> {
        settings.monitoring.init().expect("Error initializing monitoring");

        let mqtt_client = settings.mqtt.new_client();

        Ok(Self { mqtt_client })
    }

    async fn process(self) {
        tokio::select!(
            _ = self.mqtt_client.process() => {},
        )
    }
}
