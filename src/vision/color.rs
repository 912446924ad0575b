// Color ranges and detector settings
//
// Hue follows the OpenCV 8-bit convention (0-180), saturation and value 0-255.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point in HSV space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

/// Inclusive [lower, upper] HSV bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl ColorRange {
    pub const fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        ColorPreset::Green.range()
    }
}

/// Named color ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorPreset {
    Red,
    Blue,
    Yellow,
    Black,
    Lime,
    #[default]
    Green,
}

impl ColorPreset {
    pub const ALL: [ColorPreset; 6] = [
        ColorPreset::Red,
        ColorPreset::Blue,
        ColorPreset::Yellow,
        ColorPreset::Black,
        ColorPreset::Lime,
        ColorPreset::Green,
    ];

    pub fn range(self) -> ColorRange {
        match self {
            // Red wraps around hue 180; only the low end is covered
            ColorPreset::Red => ColorRange::new(Hsv::new(0, 100, 100), Hsv::new(10, 255, 255)),
            ColorPreset::Blue => ColorRange::new(Hsv::new(100, 100, 100), Hsv::new(130, 255, 255)),
            ColorPreset::Yellow => ColorRange::new(Hsv::new(20, 100, 100), Hsv::new(30, 255, 255)),
            ColorPreset::Black => ColorRange::new(Hsv::new(0, 0, 0), Hsv::new(180, 255, 50)),
            ColorPreset::Lime => ColorRange::new(Hsv::new(45, 100, 100), Hsv::new(65, 255, 255)),
            ColorPreset::Green => ColorRange::new(Hsv::new(35, 100, 100), Hsv::new(50, 255, 255)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ColorPreset::Red => "red",
            ColorPreset::Blue => "blue",
            ColorPreset::Yellow => "yellow",
            ColorPreset::Black => "black",
            ColorPreset::Lime => "lime",
            ColorPreset::Green => "green",
        }
    }

    /// Look up a preset by name, falling back to green for anything unknown
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl fmt::Display for ColorPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown color preset: {0}")]
pub struct UnknownPreset(pub String);

impl FromStr for ColorPreset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ColorPreset::ALL
            .into_iter()
            .find(|preset| preset.name() == wanted)
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}

/// Detector settings. Fixed for the detector's lifetime except `range`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub range: ColorRange,
    /// Center zone width is frame_width / center_divisor
    pub center_divisor: i32,
    /// Largest blob must be strictly bigger than this (pixels^2)
    pub min_contour_area: f64,
    /// Erode/dilate kernel edge length
    pub kernel_size: i32,
    pub camera_id: i32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            range: ColorRange::default(),
            center_divisor: 12,
            min_contour_area: 300.0,
            kernel_size: 5,
            camera_id: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_lookup() {
        assert_eq!("lime".parse::<ColorPreset>().unwrap(), ColorPreset::Lime);
        assert_eq!(" Blue ".parse::<ColorPreset>().unwrap(), ColorPreset::Blue);
        assert!("purple".parse::<ColorPreset>().is_err());
        assert_eq!(ColorPreset::from_name_or_default("purple"), ColorPreset::Green);
        assert_eq!(ColorPreset::from_name_or_default(""), ColorPreset::Green);
    }

    #[test]
    fn test_preset_ranges_are_ordered() {
        for preset in ColorPreset::ALL {
            let range = preset.range();
            assert!(range.lower.h <= range.upper.h, "{preset}");
            assert!(range.lower.s <= range.upper.s, "{preset}");
            assert!(range.lower.v <= range.upper.v, "{preset}");
        }
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: DetectionConfig =
            serde_json::from_str(r#"{"center_divisor": 8, "camera_id": 2}"#).unwrap();
        assert_eq!(config.center_divisor, 8);
        assert_eq!(config.camera_id, 2);
        assert_eq!(config.kernel_size, 5);
        assert_eq!(config.range, ColorPreset::Green.range());
    }
}
