//! # Zone Attribute Types
//!
//! Typed views of the small-integer attributes stored per zone. Every enum
//! carries a stable numeric id: that id is what gets persisted and what the
//! web form submits, so the numbering below is part of the storage format.
//!
//! Ids that the current build doesn't know (an extended animation on a build
//! without `extended-animations`, the double-height font on a build without
//! `double-height-font`) resolve to `None` and are treated as invalid input.

use serde::{Deserialize, Serialize};

/// What a zone displays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    /// Static user text (template placeholders allowed)
    #[default]
    Text,
    /// Live clock, 4 modules wide
    Clock4,
    /// Date, 4 modules wide (declared, not rendered)
    Date4,
    /// Date, 6 modules wide (declared, not rendered)
    Date6,
    /// Date and time, 8 modules wide (declared, not rendered)
    DateTime8,
}

impl ContentKind {
    pub fn id(self) -> u8 {
        match self {
            ContentKind::Text => 0,
            ContentKind::Clock4 => 1,
            ContentKind::Date4 => 2,
            ContentKind::Date6 => 3,
            ContentKind::DateTime8 => 4,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(ContentKind::Text),
            1 => Some(ContentKind::Clock4),
            2 => Some(ContentKind::Date4),
            3 => Some(ContentKind::Date6),
            4 => Some(ContentKind::DateTime8),
            _ => None,
        }
    }
}

/// Horizontal text position inside a zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn id(self) -> u8 {
        match self {
            Alignment::Left => 0,
            Alignment::Center => 1,
            Alignment::Right => 2,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Alignment::Left),
            1 => Some(Alignment::Center),
            2 => Some(Alignment::Right),
            _ => None,
        }
    }
}

/// Text entry/exit animation.
///
/// The order follows the display library's effect table. The first six
/// members are always available; the rest need `extended-animations`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Animation {
    #[default]
    None,
    Print,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    Sprite,
    Slice,
    Mesh,
    Fade,
    Dissolve,
    Blinds,
    Random,
    Wipe,
    WipeCursor,
    ScanHoriz,
    ScanHorizCursor,
    ScanVert,
    ScanVertCursor,
    Opening,
    OpeningCursor,
    Closing,
    ClosingCursor,
    ScrollUpLeft,
    ScrollUpRight,
    ScrollDownLeft,
    ScrollDownRight,
    GrowUp,
    GrowDown,
}

impl Animation {
    /// Every animation in id order.
    pub const ALL: [Animation; 29] = [
        Animation::None,
        Animation::Print,
        Animation::ScrollUp,
        Animation::ScrollDown,
        Animation::ScrollLeft,
        Animation::ScrollRight,
        Animation::Sprite,
        Animation::Slice,
        Animation::Mesh,
        Animation::Fade,
        Animation::Dissolve,
        Animation::Blinds,
        Animation::Random,
        Animation::Wipe,
        Animation::WipeCursor,
        Animation::ScanHoriz,
        Animation::ScanHorizCursor,
        Animation::ScanVert,
        Animation::ScanVertCursor,
        Animation::Opening,
        Animation::OpeningCursor,
        Animation::Closing,
        Animation::ClosingCursor,
        Animation::ScrollUpLeft,
        Animation::ScrollUpRight,
        Animation::ScrollDownLeft,
        Animation::ScrollDownRight,
        Animation::GrowUp,
        Animation::GrowDown,
    ];

    /// Number of members in the always-available base set.
    pub const BASE_COUNT: usize = 6;

    pub fn id(self) -> u8 {
        // Discriminants follow declaration order, which matches ALL.
        self as u8
    }

    pub fn from_id(id: i64) -> Option<Self> {
        let index = usize::try_from(id).ok()?;
        if index >= Self::available_count() {
            return None;
        }
        Self::ALL.get(index).copied()
    }

    /// How many animations this build supports.
    pub fn available_count() -> usize {
        if cfg!(feature = "extended-animations") {
            Self::ALL.len()
        } else {
            Self::BASE_COUNT
        }
    }

    /// Effects that scroll sideways or diagonally; these shouldn't be
    /// combined with a flip special effect in the same zone.
    pub fn conflicts_with_flip(self) -> bool {
        matches!(
            self,
            Animation::ScrollLeft
                | Animation::ScrollRight
                | Animation::Slice
                | Animation::ScrollUpLeft
                | Animation::ScrollUpRight
                | Animation::ScrollDownLeft
                | Animation::ScrollDownRight
        )
    }
}

/// Font selection. `Default` means "no override" for the driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Font {
    #[default]
    Default,
    /// Numeric 7-segment style font spanning two module rows
    NumericDoubleHeight,
}

impl Font {
    pub const DOUBLE_HEIGHT_ID: u8 = 1;

    pub fn id(self) -> u8 {
        match self {
            Font::Default => 0,
            Font::NumericDoubleHeight => Self::DOUBLE_HEIGHT_ID,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Font::Default),
            1 if cfg!(feature = "double-height-font") => Some(Font::NumericDoubleHeight),
            _ => None,
        }
    }
}

/// How a zone participates in a double-height arrangement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    #[default]
    Standard,
    DoubleUpper,
    DoubleLower,
}

impl Layout {
    pub fn id(self) -> u8 {
        match self {
            Layout::Standard => 0,
            Layout::DoubleUpper => 1,
            Layout::DoubleLower => 2,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Layout::Standard),
            1 if cfg!(feature = "double-height-font") => Some(Layout::DoubleUpper),
            2 if cfg!(feature = "double-height-font") => Some(Layout::DoubleLower),
            _ => None,
        }
    }
}

/// Special effect bitmask (bit0 = flip up/down, bit1 = flip left/right).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialEffect(u8);

impl SpecialEffect {
    pub const NONE: SpecialEffect = SpecialEffect(0);
    pub const FLIP_UP_DOWN: SpecialEffect = SpecialEffect(0x01);
    pub const FLIP_LEFT_RIGHT: SpecialEffect = SpecialEffect(0x02);
    const MASK: u8 = 0x03;

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Only the two defined bits are accepted.
    pub fn from_bits(bits: i64) -> Option<Self> {
        u8::try_from(bits)
            .ok()
            .filter(|b| b & !Self::MASK == 0)
            .map(SpecialEffect)
    }

    pub fn flip_up_down(self) -> bool {
        self.0 & Self::FLIP_UP_DOWN.0 != 0
    }

    pub fn flip_left_right(self) -> bool {
        self.0 & Self::FLIP_LEFT_RIGHT.0 != 0
    }
}

impl std::ops::BitOr for SpecialEffect {
    type Output = SpecialEffect;

    fn bitor(self, rhs: Self) -> Self::Output {
        SpecialEffect(self.0 | rhs.0)
    }
}
