//! Color temperature control.

use serde::{Deserialize, Serialize};

/// Color temperature in hundreds of Kelvin, with valid values from 29 to 70.
///
/// The light reports and accepts temperature on this coarse scale, so `29`
/// is 2900K (warm) and `70` is 7000K (daylight).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Temperature {
    pub(crate) value: u8,
}

impl Default for Temperature {
    fn default() -> Self {
        Temperature { value: Self::MIN }
    }
}

impl Temperature {
    pub const MIN: u8 = 29;
    pub const MAX: u8 = 70;

    /// Get the raw wire value.
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Get the temperature in Kelvin.
    ///
    /// # Examples
    ///
    /// ```
    /// use neewer_rs::Temperature;
    ///
    /// assert_eq!(Temperature::create(56).unwrap().kelvin(), 5600);
    /// ```
    pub fn kelvin(&self) -> u16 {
        u16::from(self.value) * 100
    }

    /// Create a new Temperature with the given wire value.
    ///
    /// Returns `None` if value is outside the valid range (29-70).
    ///
    /// # Examples
    ///
    /// ```
    /// use neewer_rs::Temperature;
    ///
    /// assert!(Temperature::create(28).is_none());
    /// assert!(Temperature::create(29).is_some());
    /// assert!(Temperature::create(70).is_some());
    /// assert!(Temperature::create(71).is_none());
    /// ```
    pub fn create(value: u8) -> Option<Self> {
        if Self::is_valid(value) {
            Some(Temperature { value })
        } else {
            None
        }
    }

    /// Create from a Kelvin value, rounding to the nearest hundred.
    ///
    /// Returns `None` if the rounded value is outside 2900K-7000K.
    pub fn from_kelvin(kelvin: u16) -> Option<Self> {
        let value = u8::try_from((u32::from(kelvin) + 50) / 100).ok()?;
        Self::create(value)
    }

    pub fn is_valid(value: u8) -> bool {
        (Self::MIN..=Self::MAX).contains(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_kelvin_rounds() {
        assert_eq!(Temperature::from_kelvin(5649).unwrap().value(), 56);
        assert_eq!(Temperature::from_kelvin(5650).unwrap().value(), 57);
        assert!(Temperature::from_kelvin(2849).is_none());
        assert!(Temperature::from_kelvin(7100).is_none());
    }
}
