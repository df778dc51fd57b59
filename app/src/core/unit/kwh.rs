use std::fmt::Display;

use derive_more::derive::AsRef;
use serde::{Deserialize, Serialize};

use super::Percent;

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, AsRef, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KiloWattHours(pub f64);

impl KiloWattHours {
    pub fn share_of(&self, capacity: KiloWattHours) -> Percent {
        if capacity.0 > 0.0 {
            Percent(self.0 / capacity.0 * 100.0)
        } else {
            Percent(0.0)
        }
    }
}

impl Display for KiloWattHours {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} kWh", self.0)
    }
}

impl From<&KiloWattHours> for f64 {
    fn from(value: &KiloWattHours) -> Self {
        value.0
    }
}

impl From<f64> for KiloWattHours {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl std::ops::Mul<Percent> for KiloWattHours {
    type Output = KiloWattHours;

    fn mul(self, rhs: Percent) -> Self::Output {
        KiloWattHours(self.0 * rhs.factor())
    }
}
