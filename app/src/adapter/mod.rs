pub mod homeassistant;
pub mod status;
