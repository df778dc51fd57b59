mod time;

pub use time::Time;

pub type LocalDateTime = chrono::NaiveDateTime;

pub fn now() -> LocalDateTime {
    chrono::Local::now().naive_local()
}
