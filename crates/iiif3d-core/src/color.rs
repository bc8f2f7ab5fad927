use glam::DVec3;

use crate::error::IiifError;

/// Parse `#RRGGBB` into 0..1 channels.
pub fn hex_to_rgb(hex: &str) -> Result<DVec3, IiifError> {
    let digits = hex
        .strip_prefix('#')
        .ok_or_else(|| IiifError::shape(format!("color {hex:?} does not start with '#'")))?;
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(IiifError::shape(format!("color {hex:?} is not #RRGGBB")));
    }
    let channel = |range: std::ops::Range<usize>| -> Result<f64, IiifError> {
        u8::from_str_radix(&digits[range], 16)
            .map(|v| f64::from(v) / 255.0)
            .map_err(|_| IiifError::shape(format!("color {hex:?} is not #RRGGBB")))
    };
    Ok(DVec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Format 0..1 channels as upper-case `#RRGGBB`. Channels are clamped.
pub fn rgb_to_hex(rgb: DVec3) -> String {
    let byte = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("#{:02X}{:02X}{:02X}", byte(rgb.x), byte(rgb.y), byte(rgb.z))
}

pub fn is_hex_color(s: &str) -> bool {
    hex_to_rgb(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_upper_case() {
        let rgb = hex_to_rgb("#ff8000").unwrap();
        assert_eq!(rgb.x, 1.0);
        assert!((rgb.y - 128.0 / 255.0).abs() < 1e-12);
        assert_eq!(rgb.z, 0.0);
        assert_eq!(rgb_to_hex(rgb), "#FF8000");
    }

    #[test]
    fn every_byte_survives_a_round_trip() {
        for v in 0..=255u8 {
            let hex = format!("#{v:02X}{v:02X}{v:02X}");
            assert_eq!(rgb_to_hex(hex_to_rgb(&hex).unwrap()), hex);
        }
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(hex_to_rgb("ff8000").is_err());
        assert!(hex_to_rgb("#ff80").is_err());
        assert!(hex_to_rgb("#gg8000").is_err());
        assert!(!is_hex_color("#ff8000ff"));
    }

    #[test]
    fn clamps_out_of_range_channels() {
        assert_eq!(rgb_to_hex(DVec3::new(2.0, -1.0, 0.5)), "#FF0080");
    }
}
