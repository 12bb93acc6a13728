//! # Clock Content Formatting
//!
//! Strings for live time zones. The colon blinks by alternating `HH:MM` and
//! `HH MM` on every refresh tick.

use chrono::Timelike;

/// Format `time` as `HH:MM`, or `HH MM` while the colon is off.
pub fn format_time<T: Timelike>(time: &T, colon_on: bool) -> String {
    let separator = if colon_on { ':' } else { ' ' };
    format!("{:02}{}{:02}", time.hour(), separator, time.minute())
}

/// Map text to the upper-half glyphs of the numeric double-height font.
///
/// The font stores the upper half of each digit 0x80 above the lower half.
pub fn double_height_upper(text: &str) -> String {
    text.chars()
        .map(|c| match u8::try_from(c) {
            Ok(byte) => char::from(byte | 0x80),
            Err(_) => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_colon_blinks() {
        let t = NaiveTime::from_hms_opt(7, 5, 59).unwrap();
        assert_eq!(format_time(&t, true), "07:05");
        assert_eq!(format_time(&t, false), "07 05");
    }

    #[test]
    fn test_double_height_shift() {
        assert_eq!(double_height_upper("12:30"), "\u{b1}\u{b2}\u{ba}\u{b3}\u{b0}");
        assert_eq!(double_height_upper(" "), "\u{a0}");
    }
}
