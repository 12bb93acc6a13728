//! # Dot Matrix Zones Core Library
//!
//! This library configures an N-zone scrolling-text display built from chained
//! LED-matrix modules. Each zone is an independent span of modules with its own
//! text, alignment, animations, font, brightness and so on.
//!
//! ## Design Philosophy
//!
//! ### One Buffer, No Filesystem
//! The target device has a single fixed-size settings slot per task. All zone
//! records are serialized into one delimited byte string that must fit that
//! slot (see [`codec`]). Reading it back never fails outright: a corrupt field
//! degrades to its default and the rest of the zone survives.
//!
//! ### Live Edits Without Reloads
//! Short text commands (`dotmatrix bright 2 9`) mutate the live zone list.
//! Cheap edits go straight to the display driver; edits that move module
//! boundaries re-run the layout planner before the command returns.
//!
//! ### Data Flow
//! 1. **Load**: settings slot → [`codec::decode`] → [`store::ZoneStore`]
//! 2. **Configure**: zone list → [`layout::plan`] → [`driver::DisplayDriver`] calls
//! 3. **Edit**: command text → [`controller::DotMatrixController::handle_command`]
//! 4. **Save**: form fields → [`form::zones_from_form`] → [`codec::encode`] → settings slot
//!
//! ## Core Types
//!
//! - [`ZoneRecord`]: every attribute of one zone
//! - [`attributes`]: the typed enums behind the small-integer fields

use serde::{Deserialize, Serialize};

// Module declarations
pub mod attributes;
pub mod clock;
pub mod codec;
pub mod command;
pub mod config;
pub mod controller;
pub mod driver;
pub mod form;
pub mod layout;
pub mod renderer;
pub mod storage;
pub mod store;
pub mod template;

pub use attributes::{Alignment, Animation, ContentKind, Font, Layout, SpecialEffect};

/// Highest zone count the controller supports.
pub const MAX_ZONES: u8 = 16;

/// Largest number of modules the display chain can address.
pub const MAX_MODULES: u16 = 255;

/// Module count bounds for a configured zone.
pub const MAX_ZONE_SIZE: u8 = 64;

/// Gap bound inserted before a zone.
pub const MAX_ZONE_OFFSET: u8 = 254;

/// Intensity bound accepted by the driver.
pub const MAX_BRIGHTNESS: u8 = 15;

/// Brightness used whenever a stored or entered value is 0.
pub const DEFAULT_BRIGHTNESS: u8 = 7;

/// Repeat delay meaning "never redisplay".
pub const REPEAT_DISABLED: i32 = -1;

/// Longest repeat delay (24 hours).
pub const MAX_REPEAT_DELAY: i32 = 86_400;

/// Every attribute of a single display zone.
///
/// Zone numbers are 1-based and contiguous within a configuration. All fields
/// except `text` are small integers with enumerated or numeric bounds; the
/// codec and form layers enforce those bounds so a `ZoneRecord` in the store
/// is always in range.
///
/// # Example
/// ```
/// use dotmatrix_zones::{ContentKind, ZoneRecord};
///
/// let mut zone = ZoneRecord::new(1);
/// zone.size = 4;
/// zone.text = "Hello".to_string();
///
/// assert_eq!(zone.content, ContentKind::Text);
/// // 0 is never used as a live intensity
/// assert_eq!(zone.effective_brightness(), 7);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    /// 1-based zone number, immutable once created
    pub zone: u8,
    /// Module count (1..=64 when configured, 0 for an unconfigured zone)
    pub size: u8,
    /// User text, may contain template placeholders
    pub text: String,
    pub content: ContentKind,
    pub alignment: Alignment,
    pub animation_in: Animation,
    /// Animation speed in milliseconds
    pub speed: u16,
    pub animation_out: Animation,
    /// Pause between in and out animation in milliseconds
    pub pause: u16,
    pub font: Font,
    pub layout: Layout,
    pub special_effect: SpecialEffect,
    /// Modules left empty before this zone
    pub offset: u8,
    /// Intensity 0..=15, 0 is shown as [`DEFAULT_BRIGHTNESS`]
    pub brightness: u8,
    /// Seconds until the content is shown again, -1 = disabled
    pub repeat_delay: i32,
}

impl ZoneRecord {
    /// An all-zero record for `zone`, the base that decode fills in.
    pub fn new(zone: u8) -> Self {
        ZoneRecord {
            zone,
            ..Default::default()
        }
    }

    /// The record synthesized for a configured zone the settings buffer
    /// doesn't cover yet.
    pub fn unconfigured(zone: u8) -> Self {
        ZoneRecord {
            zone,
            animation_in: Animation::Print, // 'None' isn't allowed on the way in
            brightness: DEFAULT_BRIGHTNESS,
            repeat_delay: REPEAT_DISABLED,
            ..Default::default()
        }
    }

    /// Brightness as it should reach the driver.
    pub fn effective_brightness(&self) -> u8 {
        normalize_brightness(self.brightness)
    }

    /// Modules this zone occupies including its leading gap.
    pub fn footprint(&self) -> u16 {
        u16::from(self.size) + u16::from(self.offset)
    }
}

/// Map the "unset" intensity 0 to the mid-level default.
pub fn normalize_brightness(brightness: u8) -> u8 {
    if brightness == 0 {
        DEFAULT_BRIGHTNESS
    } else {
        brightness
    }
}
