//! # Display Driver Interface
//!
//! The physical display library is an external collaborator. The controller
//! only ever talks to it through [`DisplayDriver`]; zone indices passed here
//! are 0-based (zone number minus one).
//!
//! [`RecordingDriver`] keeps every call in order, which is what tests and dry
//! runs inspect.

use crate::{Alignment, Animation, Font, SpecialEffect};

/// Per-render text attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderAttributes {
    pub alignment: Alignment,
    pub speed: u16,
    pub pause: u16,
    pub animation_in: Animation,
    pub animation_out: Animation,
}

/// Calls the controller makes into the display library.
pub trait DisplayDriver {
    /// Blank every zone.
    fn clear_display(&mut self);

    /// Bind `zone` to the module range `start..=end`.
    fn set_zone_bounds(&mut self, zone: u8, start: u8, end: u8);

    /// `None` restores the built-in font.
    fn set_font(&mut self, zone: u8, font: Option<Font>);

    fn set_char_spacing(&mut self, zone: u8, spacing: u8);

    fn set_zone_effects(&mut self, zone: u8, effects: SpecialEffect);

    /// Intensity 1..=15.
    fn set_intensity(&mut self, zone: u8, level: u8);

    fn render_zone_text(&mut self, zone: u8, text: &str, attributes: RenderAttributes);

    /// Restart the current animation of `zone`.
    fn reset_zone(&mut self, zone: u8);

    /// Align all zones' animation start times.
    fn resync_animation_starts(&mut self);
}

/// One recorded driver call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverCall {
    ClearDisplay,
    ZoneBounds { zone: u8, start: u8, end: u8 },
    Font { zone: u8, font: Option<Font> },
    CharSpacing { zone: u8, spacing: u8 },
    ZoneEffects { zone: u8, effects: SpecialEffect },
    Intensity { zone: u8, level: u8 },
    RenderText {
        zone: u8,
        text: String,
        attributes: RenderAttributes,
    },
    ResetZone { zone: u8 },
    ResyncAnimationStarts,
}

/// Driver that records calls instead of touching hardware.
#[derive(Debug, Default, Clone)]
pub struct RecordingDriver {
    pub calls: Vec<DriverCall>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the recorded history.
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Text of every render request, in order.
    pub fn rendered(&self) -> Vec<(u8, &str)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::RenderText { zone, text, .. } => Some((*zone, text.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Module bounds sent per zone, in order.
    pub fn bounds(&self) -> Vec<(u8, u8, u8)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::ZoneBounds { zone, start, end } => Some((*zone, *start, *end)),
                _ => None,
            })
            .collect()
    }
}

impl DisplayDriver for RecordingDriver {
    fn clear_display(&mut self) {
        self.calls.push(DriverCall::ClearDisplay);
    }

    fn set_zone_bounds(&mut self, zone: u8, start: u8, end: u8) {
        self.calls.push(DriverCall::ZoneBounds { zone, start, end });
    }

    fn set_font(&mut self, zone: u8, font: Option<Font>) {
        self.calls.push(DriverCall::Font { zone, font });
    }

    fn set_char_spacing(&mut self, zone: u8, spacing: u8) {
        self.calls.push(DriverCall::CharSpacing { zone, spacing });
    }

    fn set_zone_effects(&mut self, zone: u8, effects: SpecialEffect) {
        self.calls.push(DriverCall::ZoneEffects { zone, effects });
    }

    fn set_intensity(&mut self, zone: u8, level: u8) {
        self.calls.push(DriverCall::Intensity { zone, level });
    }

    fn render_zone_text(&mut self, zone: u8, text: &str, attributes: RenderAttributes) {
        self.calls.push(DriverCall::RenderText {
            zone,
            text: text.to_string(),
            attributes,
        });
    }

    fn reset_zone(&mut self, zone: u8) {
        self.calls.push(DriverCall::ResetZone { zone });
    }

    fn resync_animation_starts(&mut self) {
        self.calls.push(DriverCall::ResyncAnimationStarts);
    }
}
