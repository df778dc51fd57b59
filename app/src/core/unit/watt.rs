use std::fmt::Display;

use derive_more::derive::AsRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, AsRef, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watt(pub f64);

impl Watt {
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn max(self, other: Watt) -> Self {
        Self(self.0.max(other.0))
    }
}

impl Display for Watt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0} W", self.0)
    }
}

impl From<&Watt> for f64 {
    fn from(value: &Watt) -> Self {
        value.0
    }
}

impl From<f64> for Watt {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl std::ops::Sub for Watt {
    type Output = Watt;

    fn sub(self, rhs: Self) -> Self::Output {
        Watt(self.0 - rhs.0)
    }
}

impl std::ops::Mul<f64> for Watt {
    type Output = Watt;

    fn mul(self, rhs: f64) -> Self::Output {
        Watt(self.0 * rhs)
    }
}

impl std::ops::Neg for Watt {
    type Output = Watt;

    fn neg(self) -> Self::Output {
        Watt(-self.0)
    }
}
