use std::fmt::Display;

use derive_more::derive::AsRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, AsRef, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DegreeCelsius(pub f64);

impl DegreeCelsius {
    pub fn clamp(self, min: DegreeCelsius, max: DegreeCelsius) -> Self {
        Self(self.0.max(min.0).min(max.0))
    }

    pub fn min(self, other: DegreeCelsius) -> Self {
        Self(self.0.min(other.0))
    }

    pub fn max(self, other: DegreeCelsius) -> Self {
        Self(self.0.max(other.0))
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn round_to_tenth(self) -> Self {
        Self((self.0 * 10.0).round() / 10.0)
    }

    //sensor values are reported with one decimal
    pub fn approx_eq(&self, other: &DegreeCelsius) -> bool {
        (self.0 - other.0).abs() < 0.05
    }
}

impl From<&DegreeCelsius> for f64 {
    fn from(value: &DegreeCelsius) -> Self {
        value.0
    }
}

impl From<f64> for DegreeCelsius {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<DegreeCelsius> for f64 {
    fn from(value: DegreeCelsius) -> Self {
        value.0
    }
}

impl Display for DegreeCelsius {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} °C", self.0)
    }
}

impl std::ops::Add for DegreeCelsius {
    type Output = DegreeCelsius;

    fn add(self, rhs: Self) -> Self::Output {
        DegreeCelsius(self.0 + rhs.0)
    }
}

impl std::ops::Sub for DegreeCelsius {
    type Output = DegreeCelsius;

    fn sub(self, rhs: Self) -> Self::Output {
        DegreeCelsius(self.0 - rhs.0)
    }
}

impl std::ops::Mul<f64> for DegreeCelsius {
    type Output = DegreeCelsius;

    fn mul(self, rhs: f64) -> Self::Output {
        DegreeCelsius(self.0 * rhs)
    }
}

impl std::ops::Mul<DegreeCelsius> for f64 {
    type Output = DegreeCelsius;

    fn mul(self, rhs: DegreeCelsius) -> Self::Output {
        DegreeCelsius(self * rhs.0)
    }
}

impl std::ops::Div for DegreeCelsius {
    type Output = f64;

    fn div(self, rhs: Self) -> Self::Output {
        self.0 / rhs.0
    }
}

impl std::ops::Neg for DegreeCelsius {
    type Output = DegreeCelsius;

    fn neg(self) -> Self::Output {
        DegreeCelsius(-self.0)
    }
}
