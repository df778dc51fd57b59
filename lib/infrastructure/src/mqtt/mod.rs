mod client;
mod receiver;

pub use client::Mqtt;
pub use receiver::{MqttInMessage, MqttSubscription};

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    host: String,
    port: u16,
    client_id: String,
    #[serde(default = "default_keep_alive_secs")]
    keep_alive_secs: u64,
}

fn default_keep_alive_secs() -> u64 {
    5
}

impl MqttConfig {
    pub fn new_client(&self) -> Mqtt {
        Mqtt::connect(&self.host, self.port, &self.client_id, self.keep_alive_secs)
    }
}
