//! Built-in scene effects
//!
//! The light knows 13 effects by index. The code is sent as the second
//! payload byte of a COLOR command with the EFFECT sub-type.

use std::fmt;
use std::str::FromStr;

/// Built-in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Effect {
    Sunrise = 0,
    Sunset = 1,
    Movie = 2,
    Dating = 3,
    Romantic = 4,
    Blinking = 5,
    Candlelight = 6,
    Snowflake = 7,
    Energetic = 8,
    Spectrum = 9,
    Rainbow = 10,
    Breathing = 11,
    Crossing = 12,
}

impl Effect {
    /// Every effect, in code order
    pub const ALL: [Effect; 13] = [
        Self::Sunrise,
        Self::Sunset,
        Self::Movie,
        Self::Dating,
        Self::Romantic,
        Self::Blinking,
        Self::Candlelight,
        Self::Snowflake,
        Self::Energetic,
        Self::Spectrum,
        Self::Rainbow,
        Self::Breathing,
        Self::Crossing,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sunrise => "Sunrise",
            Self::Sunset => "Sunset",
            Self::Movie => "Movie",
            Self::Dating => "Dating",
            Self::Romantic => "Romantic",
            Self::Blinking => "Blinking",
            Self::Candlelight => "Candlelight",
            Self::Snowflake => "Snowflake",
            Self::Energetic => "Energetic",
            Self::Spectrum => "Spectrum",
            Self::Rainbow => "Rainbow",
            Self::Breathing => "Breathing",
            Self::Crossing => "Crossing",
        }
    }

    /// Exact (case-sensitive) name lookup
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Case-insensitive name parse
impl FromStr for Effect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown effect '{}'", s))
    }
}

pub fn effect_name_to_code(name: &str) -> Option<u8> {
    Effect::from_name(name).map(Effect::code)
}

pub fn effect_code_to_name(code: u8) -> Option<&'static str> {
    Effect::from_code(code).map(Effect::name)
}

/// Effect names in code order, as exposed to a host's effect picker
pub fn effect_names() -> Vec<&'static str> {
    Effect::ALL.iter().map(|e| e.name()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rainbow_is_ten() {
        assert_eq!(effect_name_to_code("Rainbow"), Some(10));
        assert_eq!(effect_code_to_name(10), Some("Rainbow"));
    }

    #[test]
    fn table_bounds() {
        assert_eq!(effect_code_to_name(0), Some("Sunrise"));
        assert_eq!(effect_code_to_name(12), Some("Crossing"));
        assert_eq!(effect_code_to_name(13), None);
        assert_eq!(effect_name_to_code("Strobe"), None);
        assert_eq!(effect_names().len(), 13);
    }

    #[test]
    fn codes_match_positions() {
        for (i, effect) in Effect::ALL.iter().enumerate() {
            assert_eq!(effect.code() as usize, i);
            assert_eq!(effect_name_to_code(effect.name()), Some(effect.code()));
        }
    }

    #[test]
    fn name_lookup_exact_but_parse_is_not() {
        assert_eq!(effect_name_to_code("rainbow"), None);
        assert_eq!("rainbow".parse::<Effect>(), Ok(Effect::Rainbow));
        assert_eq!(" CandleLight ".parse::<Effect>(), Ok(Effect::Candlelight));
        assert!("disco".parse::<Effect>().is_err());
    }
}
