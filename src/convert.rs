//! Gas concentration unit conversion
//!
//! Stateless conversion from the sensor's native parts-per-billion
//! reading to mass concentration, using the reported air temperature.

use crate::constants::sensors::{ABSOLUTE_ZERO_CELSIUS, PPB_TO_UGM3_FACTOR};

/// Convert a ppb reading to µg/m³ at the given air temperature.
///
/// Pure function: `ppb * 12.187 * molar_mass / (273.15 + t)`. The result
/// is undefined for `temperature_celsius <= -273.15`; callers must treat
/// such a temperature as malformed input and discard the sample instead
/// of converting it (see [`temperature_plausible`]).
pub fn mass_concentration(ppb: f32, temperature_celsius: f32, molar_mass: f32) -> f32 {
    ppb * PPB_TO_UGM3_FACTOR * molar_mass / (273.15 + temperature_celsius)
}

/// Whether a reported temperature can be fed into [`mass_concentration`]
/// without the denominator degenerating.
pub fn temperature_plausible(temperature_celsius: f32) -> bool {
    temperature_celsius > ABSOLUTE_ZERO_CELSIUS
}
