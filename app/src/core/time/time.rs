use std::fmt::Display;
use std::str::FromStr;

use anyhow::Context;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::LocalDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Time {
    delegate: NaiveTime,
}

impl Time {
    pub fn at(hour: u32, minute: u32, second: u32) -> anyhow::Result<Self> {
        Ok(Self {
            delegate: NaiveTime::from_hms_opt(hour, minute, second)
                .with_context(|| format!("Invalid time {:02}:{:02}:{:02}", hour, minute, second))?,
        })
    }

    pub fn hour(&self) -> u32 {
        self.delegate.hour()
    }

    pub fn minute(&self) -> u32 {
        self.delegate.minute()
    }

    pub fn on(&self, day: LocalDateTime) -> LocalDateTime {
        day.date().and_time(self.delegate)
    }

    /// First occurrence of this wall-clock time strictly after `now`.
    pub fn next_after(&self, now: LocalDateTime) -> LocalDateTime {
        let today = self.on(now);
        if today > now {
            today
        } else {
            today + chrono::Duration::days(1)
        }
    }
}

impl FromStr for Time {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let delegate = NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .with_context(|| format!("Error parsing time {}", s))?;

        Ok(Self { delegate })
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.delegate.format("%H:%M:%S"))
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Time {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(hour: u32, minute: u32) -> LocalDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_parse() {
        let t: Time = "07:30:00".parse().unwrap();
        assert_eq!(t.hour(), 7);
        assert_eq!(t.minute(), 30);

        let t: Time = "22:00".parse().unwrap();
        assert_eq!(t.hour(), 22);

        assert!("25:00:00".parse::<Time>().is_err());
    }

    #[test]
    fn test_next_after_later_today() {
        let t = Time::at(22, 0, 0).unwrap();
        assert_eq!(t.next_after(at(10, 0)), at(22, 0));
    }

    #[test]
    fn test_next_after_passed_today() {
        let t = Time::at(7, 0, 0).unwrap();
        assert_eq!(t.next_after(at(7, 0)), at(7, 0) + chrono::Duration::days(1));
        assert_eq!(t.next_after(at(10, 0)), at(7, 0) + chrono::Duration::days(1));
    }

    #[test]
    fn test_display_roundtrip_format() {
        let t = Time::at(7, 5, 0).unwrap();
        assert_eq!(t.to_string(), "07:05:00");
    }
}
