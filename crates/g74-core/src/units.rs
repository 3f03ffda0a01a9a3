//! Compile-time unit safety for fault study quantities.
//!
//! Fault studies mix apparent power (MVA), voltages (kV and per-unit), impedances
//! on different MVA bases, currents reported in amps or kiloamps and elapsed times
//! in seconds. Newtype wrappers keep these apart at compile time.
//!
//! # Usage
//!
//! ```
//! use g74_core::units::{MegavoltAmperes, Seconds, CurrentUnit};
//!
//! let load = MegavoltAmperes(5.0) + MegavoltAmperes(0.25);
//! assert_eq!(load.value(), 5.25);
//!
//! let t = Seconds(0.06);
//! assert_eq!(t.to_millis_rounded(), 60);
//!
//! // Raw engine currents are amps; kiloamp output divides by 1000
//! assert!((CurrentUnit::Kiloamps.convert_from_amps(2402.6) - 2.4026).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Macro to implement common arithmetic operations for unit types
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Create a new value
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Check if value is finite
            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// Maximum of two values
            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

// =============================================================================
// Power and voltage
// =============================================================================

/// Apparent power in megavolt-amperes (MVA)
///
/// Connected load is summarised as apparent power; equivalent machine ratings
/// are expressed on the same scale.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MegavoltAmperes(pub f64);

impl_unit_ops!(MegavoltAmperes, "MVA");

/// Voltage in kilovolts (kV)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Kilovolts(pub f64);

impl_unit_ops!(Kilovolts, "kV");

/// Per-unit magnitude (voltage or impedance on a stated base)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct PerUnit(pub f64);

impl_unit_ops!(PerUnit, "pu");

impl PerUnit {
    /// One per-unit (nominal voltage)
    pub const ONE: Self = Self(1.0);
}

// =============================================================================
// Time
// =============================================================================

/// Elapsed time after fault inception in seconds
///
/// Fault clearance times are compared at millisecond resolution, which is the
/// resolution breaker duty studies are specified at.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Seconds(pub f64);

impl_unit_ops!(Seconds, "s");

impl Seconds {
    /// Zero seconds (fault inception)
    pub const ZERO: Self = Self(0.0);

    /// Tolerance used when deciding two requested times are the same time
    pub const EPSILON: f64 = 1e-9;

    /// Time rounded to the nearest whole millisecond
    #[inline]
    pub fn to_millis_rounded(self) -> i64 {
        (self.0 * 1000.0).round() as i64
    }

    /// Report steps per second. Report files name their fault time with five
    /// decimals, so two times in the same 10 us step share a report.
    pub const STEPS_PER_SECOND: f64 = 1e5;

    /// Time as a whole number of report steps
    #[inline]
    pub fn to_steps(self) -> i64 {
        (self.0 * Self::STEPS_PER_SECOND).round() as i64
    }

    #[inline]
    pub fn from_steps(steps: i64) -> Self {
        Self(steps as f64 / Self::STEPS_PER_SECOND)
    }

    /// Time rounded to the nearest report step
    #[inline]
    pub fn snapped(self) -> Self {
        Self::from_steps(self.to_steps())
    }

    /// True when both times are equal within [`Seconds::EPSILON`]
    #[inline]
    pub fn approx_eq(self, other: Self) -> bool {
        (self.0 - other.0).abs() < Self::EPSILON
    }
}

// =============================================================================
// Current
// =============================================================================

/// Unit that physical currents are reported in.
///
/// The external engine reports currents in amps; studies normally present them
/// in kiloamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrentUnit {
    #[default]
    Kiloamps,
    Amps,
}

impl CurrentUnit {
    /// Divisor applied to a raw engine value in amps
    #[inline]
    pub const fn divisor(self) -> f64 {
        match self {
            CurrentUnit::Kiloamps => 1000.0,
            CurrentUnit::Amps => 1.0,
        }
    }

    /// Convert a raw engine value (amps) into this unit
    #[inline]
    pub fn convert_from_amps(self, amps: f64) -> f64 {
        amps / self.divisor()
    }

    /// Short label used in column headings
    pub const fn label(self) -> &'static str {
        match self {
            CurrentUnit::Kiloamps => "kA",
            CurrentUnit::Amps => "A",
        }
    }
}

impl std::fmt::Display for CurrentUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mva_arithmetic() {
        let s1 = MegavoltAmperes(5.0);
        let s2 = MegavoltAmperes(2.5);

        assert_eq!((s1 + s2).value(), 7.5);
        assert_eq!((s1 - s2).value(), 2.5);
        assert!(((s1 * 1.16).value() - 5.8).abs() < 1e-12);
        assert_eq!(s1 / s2, 2.0);
    }

    #[test]
    fn test_sum_iterator() {
        let loads = vec![MegavoltAmperes(1.0), MegavoltAmperes(2.0), MegavoltAmperes(0.5)];
        let total: MegavoltAmperes = loads.into_iter().sum();

        assert_eq!(total.value(), 3.5);
    }

    #[test]
    fn test_seconds_rounding() {
        assert_eq!(Seconds(0.0001).to_millis_rounded(), 0);
        assert_eq!(Seconds(0.0099).to_millis_rounded(), 10);
        assert_eq!(Seconds(0.06).to_millis_rounded(), 60);
        assert!(Seconds(0.06).approx_eq(Seconds(0.06 + 1e-12)));
        assert!(!Seconds(0.06).approx_eq(Seconds(0.0601)));
    }

    #[test]
    fn test_seconds_report_steps() {
        assert_eq!(Seconds(0.06).to_steps(), 6000);
        assert_eq!(Seconds(0.060001).to_steps(), 6000);
        assert_eq!(Seconds(0.060006).to_steps(), 6001);
        assert_eq!(Seconds(0.0600001).snapped(), Seconds(0.06));
        assert_eq!(Seconds(0.0102).snapped(), Seconds(0.0102));
        assert_eq!(format!("{:.5}", Seconds::from_steps(10).value()), "0.00010");
    }

    #[test]
    fn test_current_unit_conversion() {
        assert!((CurrentUnit::Kiloamps.convert_from_amps(6180.1) - 6.1801).abs() < 1e-12);
        assert_eq!(CurrentUnit::Amps.convert_from_amps(6180.1), 6180.1);
        assert_eq!(CurrentUnit::default(), CurrentUnit::Kiloamps);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", MegavoltAmperes(1.16)), "1.1600 MVA");
        assert_eq!(format!("{}", Seconds(0.06)), "0.0600 s");
        assert_eq!(format!("{}", CurrentUnit::Kiloamps), "kA");
    }
}
