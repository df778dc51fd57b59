mod degree_celsius;
mod kwh;
mod percent;
mod watt;

pub use degree_celsius::DegreeCelsius;
pub use kwh::KiloWattHours;
pub use percent::Percent;
pub use watt::Watt;

#[cfg(test)]
macro_rules! v {
    ($x:literal C) => {
        $crate::core::unit::DegreeCelsius($x as f64)
    };
    ($x:literal %) => {
        $crate::core::unit::Percent($x as f64)
    };
    ($x:literal W) => {
        $crate::core::unit::Watt($x as f64)
    };
}

#[cfg(test)]
pub(crate) use v;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_literals() {
        assert_eq!(v!(25 C), DegreeCelsius(25.0));
        assert_eq!(v!(50 %), Percent(50.0));
        assert_eq!(v!(-400 W), Watt(-400.0));
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(DegreeCelsius(45.349).round_to_tenth(), DegreeCelsius(45.3));
        assert_eq!(DegreeCelsius(45.35).round_to_tenth(), DegreeCelsius(45.4));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(DegreeCelsius(31.0).clamp(v!(16 C), v!(30 C)), DegreeCelsius(30.0));
        assert_eq!(DegreeCelsius(12.0).clamp(v!(16 C), v!(30 C)), DegreeCelsius(16.0));
        assert_eq!(DegreeCelsius(21.5).clamp(v!(16 C), v!(30 C)), DegreeCelsius(21.5));
    }

    #[test]
    fn test_stored_energy_share() {
        assert_eq!(KiloWattHours(5.0).share_of(KiloWattHours(10.0)), Percent(50.0));
        assert_eq!(KiloWattHours(5.0).share_of(KiloWattHours(0.0)), Percent(0.0));
    }
}
