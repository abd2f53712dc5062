//! RGB colors stored as `#RRGGBB` in the config file

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(u32);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// 0x00RRGGBB, the pixel format of TrueColor visuals
    pub fn pixel(self) -> u32 {
        self.0
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| format!("color '{s}' must start with '#'"))?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("color '{s}' must have the form #RRGGBB"));
        }
        u32::from_str_radix(hex, 16)
            .map(Color)
            .map_err(|e| format!("invalid color '{s}': {e}"))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let color: Color = "#1a2B3c".parse().unwrap();
        assert_eq!(color, Color::rgb(0x1A, 0x2B, 0x3C));
        assert_eq!(color.pixel(), 0x1A2B3C);
        assert_eq!(color.to_string(), "#1A2B3C");
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        assert!("1a2b3c".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert!("#12345G".parse::<Color>().is_err());
        assert!("#+12345".parse::<Color>().is_err());
    }

    #[test]
    fn test_serde_uses_hex_strings() {
        let json = serde_json::to_string(&Color::rgb(255, 0, 16)).unwrap();
        assert_eq!(json, "\"#FF0010\"");
        let parsed: Color = serde_json::from_str("\"#00ff00\"").unwrap();
        assert_eq!(parsed, Color::rgb(0, 255, 0));
        assert!(serde_json::from_str::<Color>("\"green\"").is_err());
    }
}
