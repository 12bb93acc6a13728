//! # Settings Form Fields
//!
//! The settings page is rendered by the host web server. It submits plain
//! key-indexed fields: zone `i` (0-based) field `f` lives under
//! `pc_arg<i * FIELD_COUNT + f + 1>`, with `f` in wire order (see
//! [`Field`]). The zone count comes in as `zone_count`.
//!
//! Numeric fields follow the form helpers' convention: a missing or
//! non-numeric value reads as 0.

use crate::codec::{Field, FIELD_COUNT};
use crate::{
    normalize_brightness, Alignment, Animation, ContentKind, Font, Layout, SpecialEffect,
    ZoneRecord, MAX_BRIGHTNESS, MAX_REPEAT_DELAY, MAX_ZONES, MAX_ZONE_OFFSET, MAX_ZONE_SIZE,
    REPEAT_DISABLED,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Key carrying the number of zones.
pub const ZONE_COUNT_KEY: &str = "zone_count";

/// Input bounds the settings page enforces per field.
pub const SIZE_BOUNDS: RangeInclusive<i64> = 1..=MAX_ZONE_SIZE as i64;
pub const SPEED_BOUNDS: RangeInclusive<i64> = 0..=u16::MAX as i64;
pub const OFFSET_BOUNDS: RangeInclusive<i64> = 0..=MAX_ZONE_OFFSET as i64;
pub const BRIGHTNESS_BOUNDS: RangeInclusive<i64> = 1..=MAX_BRIGHTNESS as i64;
pub const REPEAT_BOUNDS: RangeInclusive<i64> = REPEAT_DISABLED as i64..=MAX_REPEAT_DELAY as i64;

/// Submitted (or to-be-rendered) form values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Form key for `field` of the 0-based zone `index`.
    pub fn key(index: usize, field: Field) -> String {
        format!("pc_arg{}", index * FIELD_COUNT + field.offset() + 1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn set_field(&mut self, index: usize, field: Field, value: impl ToString) {
        self.insert(Self::key(index, field), value.to_string());
    }

    /// Integer value of `key`, 0 if missing or malformed.
    pub fn int(&self, key: &str) -> i64 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    fn zone_int(&self, index: usize, field: Field) -> i64 {
        self.int(&Self::key(index, field))
    }

    /// Submitted zone count, at least 1 and at most [`MAX_ZONES`].
    pub fn zone_count(&self) -> u8 {
        self.int(ZONE_COUNT_KEY).clamp(1, i64::from(MAX_ZONES)) as u8
    }
}

/// Build the zone list from submitted fields.
///
/// A value outside its field's range, or an unknown enum id, leaves that
/// attribute at its zero default.
pub fn zones_from_form(fields: &FormFields, zone_count: u8) -> Vec<ZoneRecord> {
    (0..usize::from(zone_count))
        .zip(1u8..)
        .map(|(index, number)| {
            let int = |field| fields.zone_int(index, field);
            let in_range = |field, max: i64| Some(int(field)).filter(|v| (0..=max).contains(v));

            let mut zone = ZoneRecord::new(number);
            if let Some(v) = in_range(Field::Size, i64::from(MAX_ZONE_SIZE)) {
                zone.size = v as u8;
            }
            zone.text = fields
                .get(&FormFields::key(index, Field::Text))
                .unwrap_or_default()
                .to_string();
            zone.content = ContentKind::from_id(int(Field::Content)).unwrap_or_default();
            zone.alignment = Alignment::from_id(int(Field::Alignment)).unwrap_or_default();
            zone.animation_in = Animation::from_id(int(Field::AnimationIn)).unwrap_or_default();
            if let Some(v) = in_range(Field::Speed, i64::from(u16::MAX)) {
                zone.speed = v as u16;
            }
            zone.animation_out = Animation::from_id(int(Field::AnimationOut)).unwrap_or_default();
            if let Some(v) = in_range(Field::Pause, i64::from(u16::MAX)) {
                zone.pause = v as u16;
            }
            zone.font = Font::from_id(int(Field::Font)).unwrap_or_default();
            zone.layout = Layout::from_id(int(Field::Layout)).unwrap_or_default();
            zone.special_effect =
                SpecialEffect::from_bits(int(Field::SpecialEffect)).unwrap_or_default();
            if let Some(v) = in_range(Field::Offset, i64::from(MAX_ZONE_OFFSET)) {
                zone.offset = v as u8;
            }
            if let Some(v) = in_range(Field::Brightness, i64::from(MAX_BRIGHTNESS)) {
                zone.brightness = v as u8;
            }
            let repeat = int(Field::RepeatDelay);
            if REPEAT_BOUNDS.contains(&repeat) {
                zone.repeat_delay = repeat as i32;
            }
            zone
        })
        .collect()
}

/// Field values a settings page shows for `zones`.
///
/// Brightness 0 is presented as the default level.
pub fn form_from_zones(zones: &[ZoneRecord]) -> FormFields {
    let mut fields = FormFields::new();
    fields.insert(ZONE_COUNT_KEY, zones.len().to_string());

    for (index, zone) in zones.iter().enumerate() {
        fields.set_field(index, Field::Size, zone.size);
        fields.set_field(index, Field::Text, &zone.text);
        fields.set_field(index, Field::Content, zone.content.id());
        fields.set_field(index, Field::Alignment, zone.alignment.id());
        fields.set_field(index, Field::AnimationIn, zone.animation_in.id());
        fields.set_field(index, Field::Speed, zone.speed);
        fields.set_field(index, Field::AnimationOut, zone.animation_out.id());
        fields.set_field(index, Field::Pause, zone.pause);
        fields.set_field(index, Field::Font, zone.font.id());
        fields.set_field(index, Field::Layout, zone.layout.id());
        fields.set_field(index, Field::SpecialEffect, zone.special_effect.bits());
        fields.set_field(index, Field::Offset, zone.offset);
        fields.set_field(index, Field::Brightness, normalize_brightness(zone.brightness));
        fields.set_field(index, Field::RepeatDelay, zone.repeat_delay);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_follow_wire_order() {
        assert_eq!(FormFields::key(0, Field::Size), "pc_arg1");
        assert_eq!(FormFields::key(0, Field::RepeatDelay), "pc_arg14");
        assert_eq!(FormFields::key(1, Field::Text), "pc_arg16");
    }

    #[test]
    fn test_form_roundtrip() {
        let zone = ZoneRecord {
            size: 8,
            text: "Hello".to_string(),
            alignment: Alignment::Right,
            speed: 40,
            offset: 2,
            brightness: 3,
            repeat_delay: 60,
            ..ZoneRecord::unconfigured(1)
        };
        let fields = form_from_zones(std::slice::from_ref(&zone));

        assert_eq!(fields.zone_count(), 1);
        assert_eq!(zones_from_form(&fields, 1), vec![zone]);
    }

    #[test]
    fn test_missing_fields_read_as_zero() {
        let mut fields = FormFields::new();
        fields.set_field(0, Field::Size, 4);
        fields.set_field(0, Field::Speed, "fast");

        let zones = zones_from_form(&fields, 2);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].size, 4);
        assert_eq!(zones[0].speed, 0);
        assert_eq!(zones[0].repeat_delay, 0);
        assert_eq!(zones[1], ZoneRecord::new(2));
    }

    #[test]
    fn test_out_of_range_values_are_dropped() {
        let mut fields = FormFields::new();
        fields.set_field(0, Field::Size, 65);
        fields.set_field(0, Field::Brightness, 16);
        fields.set_field(0, Field::RepeatDelay, -2);
        fields.set_field(0, Field::AnimationIn, 99);

        let zone = &zones_from_form(&fields, 1)[0];
        assert_eq!(zone.size, 0);
        assert_eq!(zone.brightness, 0);
        assert_eq!(zone.repeat_delay, 0);
        assert_eq!(zone.animation_in, Animation::None);
    }

    #[test]
    fn test_brightness_zero_shown_as_default() {
        let zone = ZoneRecord::new(1);
        let fields = form_from_zones(&[zone]);
        assert_eq!(fields.get("pc_arg13"), Some("7"));
    }

    #[test]
    fn test_zone_count_is_clamped() {
        let mut fields = FormFields::new();
        assert_eq!(fields.zone_count(), 1);
        fields.insert(ZONE_COUNT_KEY, "40");
        assert_eq!(fields.zone_count(), MAX_ZONES);
    }

    #[test]
    fn test_deserializes_from_json() {
        let fields: FormFields =
            serde_json::from_str(r#"{"zone_count": "1", "pc_arg1": "6", "pc_arg2": "Hi"}"#)
                .unwrap();
        let zones = zones_from_form(&fields, fields.zone_count());
        assert_eq!(zones[0].size, 6);
        assert_eq!(zones[0].text, "Hi");
    }
}
