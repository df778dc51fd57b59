mod http;
mod monitoring;
mod mqtt;

pub use monitoring::MonitoringConfig;

pub use http::client::HttpClientConfig;
pub use http::server::HttpServerConfig;
pub use mqtt::{Mqtt, MqttConfig, MqttInMessage, MqttSubscription};

pub mod meter {
    pub use super::monitoring::meter::{increment, set};
}
