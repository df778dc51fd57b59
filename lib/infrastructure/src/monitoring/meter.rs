use cached::proc_macro::cached;
use opentelemetry::KeyValue;

const METER_NAME: &str = "smart_climate";

pub fn increment(name: &'static str, tags: &[(&str, &str)]) {
    counter(name).add(1, &to_key_values(tags))
}

pub fn set(name: &'static str, value: f64, tags: &[(&str, &str)]) {
    gauge(name).record(value, &to_key_values(tags))
}

fn to_key_values(tags: &[(&str, &str)]) -> Vec<KeyValue> {
    tags.iter()
        .map(|(k, v)| KeyValue::new(k.to_string(), v.to_string()))
        .collect()
}

#[cached]
fn counter(name: &'static str) -> opentelemetry::metrics::Counter<u64> {
    opentelemetry::global::meter(METER_NAME).u64_counter(name).build()
}

#[cached]
fn gauge(name: &'static str) -> opentelemetry::metrics::Gauge<f64> {
    opentelemetry::global::meter(METER_NAME).f64_gauge(name).build()
}
