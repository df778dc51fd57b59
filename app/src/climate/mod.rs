pub mod config;
pub mod decision;
pub mod evaluator;
pub mod event;
pub mod heater;
pub mod power;
pub mod presence;
pub mod schedule;
pub mod weather;
