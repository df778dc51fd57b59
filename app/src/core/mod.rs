pub mod time;
pub mod timer;
pub mod unit;
