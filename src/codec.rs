//! # Zone Settings Codec
//!
//! Serializes the zone list into the single delimited byte string that lives in
//! the device settings slot, and parses it back.
//!
//! ## Wire Format
//!
//! Each zone is its fourteen fields joined by the field separator and terminated
//! by the zone separator:
//!
//! ```text
//! size F text F content F alignment F animIn F speed F animOut F pause F
//!   font F layout F specialEffect F offset F brightness F repeatDelay Z
//! ```
//!
//! Both separators sit in the non-printable range (`0x01`, `0x02`) and are never
//! escaped. The field order is a storage contract: buffers written by earlier
//! firmware must keep decoding, so [`Field`] may only ever be appended to.
//!
//! ## Resilience
//!
//! Decoding never fails. A field that is missing, not an integer, or out of
//! range keeps its default and the remaining fields of that zone are still
//! read. Zones the buffer doesn't cover are synthesized with
//! [`ZoneRecord::unconfigured`].

use crate::{
    normalize_brightness, Alignment, Animation, ContentKind, Font, Layout, SpecialEffect,
    ZoneRecord, DEFAULT_BRIGHTNESS, MAX_BRIGHTNESS, MAX_REPEAT_DELAY, MAX_ZONES, MAX_ZONE_OFFSET,
    MAX_ZONE_SIZE, REPEAT_DISABLED,
};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Payload capacity of the settings slot in bytes.
///
/// A 1 KiB custom task settings block minus the two-byte length prefix and
/// the string terminator. An encoded buffer must be strictly shorter.
pub const SETTINGS_CAPACITY: usize = 1020;

/// Fields per zone on the wire.
pub const FIELD_COUNT: usize = 14;

/// Quote characters tried, in order, when protecting zone text.
pub const QUOTE_CHARS: [char; 3] = ['"', '\'', '`'];

/// Position of each zone attribute on the wire (and in the web form).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Size,
    Text,
    Content,
    Alignment,
    AnimationIn,
    Speed,
    AnimationOut,
    Pause,
    Font,
    Layout,
    SpecialEffect,
    Offset,
    Brightness,
    RepeatDelay,
}

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Size,
        Field::Text,
        Field::Content,
        Field::Alignment,
        Field::AnimationIn,
        Field::Speed,
        Field::AnimationOut,
        Field::Pause,
        Field::Font,
        Field::Layout,
        Field::SpecialEffect,
        Field::Offset,
        Field::Brightness,
        Field::RepeatDelay,
    ];

    /// 0-based position within a zone.
    pub fn offset(self) -> usize {
        self as usize
    }
}

/// The reserved bytes that delimit fields and zones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Separators {
    pub field: u8,
    pub zone: u8,
}

impl Separators {
    pub const DEFAULT: Separators = Separators {
        field: 0x01,
        zone: 0x02,
    };

    /// Characters substituted for the separators in log output.
    const DISPLAY_FIELD: char = ',';
    const DISPLAY_ZONE: char = ';';
}

impl Default for Separators {
    fn default() -> Self {
        Separators::DEFAULT
    }
}

/// Number of zones the decoder should produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpectedZones {
    /// First run: take whatever the buffer holds
    Unknown,
    Known(u8),
}

impl ExpectedZones {
    /// Interpret a raw configured count, where -1 is the "unknown" sentinel.
    pub fn from_raw(raw: i32) -> Self {
        match u8::try_from(raw) {
            Ok(count) => ExpectedZones::Known(count),
            Err(_) => ExpectedZones::Unknown,
        }
    }

    /// The concrete count once `decoded` zones were found.
    pub fn resolve(self, decoded: usize) -> u8 {
        match self {
            ExpectedZones::Known(count) => count,
            ExpectedZones::Unknown => u8::try_from(decoded).unwrap_or(u8::MAX),
        }
    }
}

/// Errors that make a zone list unstorable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The serialized zones don't fit the settings slot
    #[error("total combination of zones and text too long to store ({len} bytes, capacity {capacity})")]
    CapacityExceeded { len: usize, capacity: usize },

    /// Zone text contains a separator byte and would corrupt the buffer
    #[error("zone {zone} text contains a reserved separator byte")]
    ReservedByteInText { zone: u8 },
}

/// A serialized zone list ready for the settings slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedBuffer {
    payload: Vec<u8>,
    /// Σ(size + offset) over the encoded zones
    pub num_devices: u16,
}

impl EncodedBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.payload
    }
}

impl fmt::Display for EncodedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_payload(&self.payload, Separators::DEFAULT))
    }
}

/// Encode with the default separators and slot capacity.
pub fn encode(zones: &[ZoneRecord], expected_zones: u8) -> Result<EncodedBuffer, EncodeError> {
    encode_with(zones, expected_zones, Separators::DEFAULT, SETTINGS_CAPACITY)
}

/// Serialize every zone numbered `<= expected_zones`.
///
/// Fails with [`EncodeError::CapacityExceeded`] unless the trimmed result is
/// strictly shorter than `capacity`. Nothing is written anywhere on failure,
/// so whatever is already persisted stays authoritative.
pub fn encode_with(
    zones: &[ZoneRecord],
    expected_zones: u8,
    separators: Separators,
    capacity: usize,
) -> Result<EncodedBuffer, EncodeError> {
    let active: Vec<&ZoneRecord> = zones.iter().filter(|z| z.zone <= expected_zones).collect();
    let field_sep = char::from(separators.field);
    let zone_sep = char::from(separators.zone);

    let mut buffer = String::with_capacity(active.len() * 58 + 50);
    let mut num_devices: u16 = 0;

    for zone in active {
        if zone.text.contains(&[field_sep, zone_sep][..]) {
            return Err(EncodeError::ReservedByteInText { zone: zone.zone });
        }

        let fields: [String; FIELD_COUNT] = [
            zone.size.to_string(),
            enquote(&zone.text),
            zone.content.id().to_string(),
            zone.alignment.id().to_string(),
            zone.animation_in.id().to_string(),
            zone.speed.to_string(),
            zone.animation_out.id().to_string(),
            zone.pause.to_string(),
            zone.font.id().to_string(),
            zone.layout.id().to_string(),
            zone.special_effect.bits().to_string(),
            zone.offset.to_string(),
            zone.brightness.to_string(),
            zone.repeat_delay.to_string(),
        ];

        for (index, field) in fields.iter().enumerate() {
            if index > 0 {
                buffer.push(field_sep);
            }
            buffer.push_str(field);
        }
        buffer.push(zone_sep);

        num_devices = num_devices.saturating_add(zone.footprint());
        debug!(
            zone = zone.zone,
            buffer_len = buffer.len(),
            size = zone.size,
            "appended zone"
        );
    }

    let mut payload = buffer.into_bytes();
    while payload.last().is_some_and(u8::is_ascii_whitespace) {
        payload.pop();
    }

    if payload.len() >= capacity {
        return Err(EncodeError::CapacityExceeded {
            len: payload.len(),
            capacity,
        });
    }

    debug!(
        zones = expected_zones,
        len = payload.len(),
        num_devices,
        "encoded zone settings"
    );
    Ok(EncodedBuffer {
        payload,
        num_devices,
    })
}

/// Decode with the default separators.
pub fn decode(buffer: &[u8], expected: ExpectedZones) -> Vec<ZoneRecord> {
    decode_with(buffer, expected, Separators::DEFAULT)
}

/// Parse a settings buffer into zone records.
///
/// The result always holds at least `expected` zones; with
/// [`ExpectedZones::Unknown`] it holds exactly what the buffer contained.
pub fn decode_with(
    buffer: &[u8],
    expected: ExpectedZones,
    separators: Separators,
) -> Vec<ZoneRecord> {
    let text = String::from_utf8_lossy(buffer);
    let text = text.trim();
    let zone_sep = char::from(separators.zone);
    let field_sep = char::from(separators.field);

    let mut chunks: Vec<&str> = text.split(zone_sep).collect();
    // The piece after the last separator only counts if it holds something.
    if chunks.last().is_some_and(|last| last.trim().is_empty()) {
        chunks.pop();
    }

    if chunks.len() > usize::from(MAX_ZONES) {
        warn!(
            found = chunks.len(),
            max = MAX_ZONES,
            "settings buffer holds more zones than supported, ignoring the rest"
        );
        chunks.truncate(usize::from(MAX_ZONES));
    }

    let mut zones: Vec<ZoneRecord> = chunks
        .iter()
        .zip(1u8..)
        .map(|(chunk, number)| decode_zone(chunk, number, field_sep))
        .collect();
    debug!(zones = zones.len(), "read zones from settings");

    let wanted = expected.resolve(zones.len());
    let mut next = zones.len();
    while next < usize::from(wanted) {
        next += 1;
        // next <= wanted <= u8::MAX
        zones.push(ZoneRecord::unconfigured(next as u8));
    }

    zones
}

fn decode_zone(chunk: &str, number: u8, field_sep: char) -> ZoneRecord {
    let fields: Vec<&str> = chunk.split(field_sep).map(str::trim).collect();
    let get = |field: Field| fields.get(field.offset()).copied().unwrap_or("");

    let mut zone = ZoneRecord::new(number);

    if let Some(v) = int_in(get(Field::Size), 0, i64::from(MAX_ZONE_SIZE)) {
        zone.size = v as u8;
    }
    zone.text = strip_quotes(get(Field::Text)).to_string();
    if let Some(v) = int(get(Field::Content)).and_then(ContentKind::from_id) {
        zone.content = v;
    }
    if let Some(v) = int(get(Field::Alignment)).and_then(Alignment::from_id) {
        zone.alignment = v;
    }
    if let Some(v) = int(get(Field::AnimationIn)).and_then(Animation::from_id) {
        zone.animation_in = v;
    }
    if let Some(v) = int_in(get(Field::Speed), 0, i64::from(u16::MAX)) {
        zone.speed = v as u16;
    }
    if let Some(v) = int(get(Field::AnimationOut)).and_then(Animation::from_id) {
        zone.animation_out = v;
    }
    if let Some(v) = int_in(get(Field::Pause), 0, i64::from(u16::MAX)) {
        zone.pause = v as u16;
    }
    if let Some(v) = int(get(Field::Font)).and_then(Font::from_id) {
        zone.font = v;
    }
    if let Some(v) = int(get(Field::Layout)).and_then(Layout::from_id) {
        zone.layout = v;
    }
    if let Some(v) = int(get(Field::SpecialEffect)).and_then(SpecialEffect::from_bits) {
        zone.special_effect = v;
    }
    if let Some(v) = int_in(get(Field::Offset), 0, i64::from(MAX_ZONE_OFFSET)) {
        zone.offset = v as u8;
    }

    let brightness = get(Field::Brightness);
    if brightness.is_empty() {
        zone.brightness = DEFAULT_BRIGHTNESS;
    } else if let Some(v) = int_in(brightness, 0, i64::from(MAX_BRIGHTNESS)) {
        zone.brightness = v as u8;
    }
    zone.brightness = normalize_brightness(zone.brightness);

    let repeat = get(Field::RepeatDelay);
    if repeat.is_empty() {
        zone.repeat_delay = REPEAT_DISABLED;
    } else if let Some(v) = int_in(
        repeat,
        i64::from(REPEAT_DISABLED),
        i64::from(MAX_REPEAT_DELAY),
    ) {
        zone.repeat_delay = v as i32;
    }

    zone
}

/// A well-formed signed decimal, or `None`.
fn int(field: &str) -> Option<i64> {
    field.parse::<i64>().ok()
}

/// A well-formed integer within `min..=max`, or `None`.
fn int_in(field: &str, min: i64, max: i64) -> Option<i64> {
    int(field).filter(|v| (min..=max).contains(v))
}

/// Wrap `text` in the first quote character it doesn't contain.
///
/// Returned unchanged when it already uses all three.
pub fn enquote(text: &str) -> String {
    match QUOTE_CHARS.iter().find(|q| !text.contains(**q)) {
        Some(quote) => format!("{quote}{text}{quote}"),
        None => text.to_string(),
    }
}

/// Remove one matching pair of surrounding quotes, if present.
pub fn strip_quotes(text: &str) -> &str {
    for quote in QUOTE_CHARS {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Human-readable rendering of a payload with the separators replaced.
pub fn display_payload(payload: &[u8], separators: Separators) -> String {
    String::from_utf8_lossy(payload)
        .chars()
        .map(|c| {
            if c == char::from(separators.field) {
                Separators::DISPLAY_FIELD
            } else if c == char::from(separators.zone) {
                Separators::DISPLAY_ZONE
            } else {
                c
            }
        })
        .collect()
}
