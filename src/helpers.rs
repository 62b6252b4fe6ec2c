//! Shared helpers for temperature conversions.
//!
//! The weather provider reports temperatures in Kelvin (its default unit system).
//! The watch face shows whole degrees only, so both conversions round to the
//! nearest integer:
//!
//! - `kelvin_to_celsius`: `round(K - 273.15)`
//! - `celsius_to_fahrenheit`: `round(C * 1.8 + 32)`, applied to the already
//!   rounded Celsius value so both readings stay consistent on the display.
//!
//! Non-finite inputs are rejected by the caller before reaching these helpers.

/// Offset between the Kelvin and Celsius scales.
const KELVIN_OFFSET: f64 = 273.15;

/// Convert a Kelvin reading to whole degrees Celsius.
pub(crate) fn kelvin_to_celsius(kelvin: f64) -> i32 {
    (kelvin - KELVIN_OFFSET).round() as i32
}

/// Convert whole degrees Celsius to whole degrees Fahrenheit.
pub(crate) fn celsius_to_fahrenheit(celsius: i32) -> i32 {
    (f64::from(celsius) * 1.8 + 32.0).round() as i32
}
