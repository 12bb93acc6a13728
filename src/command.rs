//! # Runtime Commands
//!
//! Parses the short text commands that edit live zones:
//!
//! ```text
//! dotmatrix txt    <zone> <text>
//! dotmatrix size   <zone> <1..64>
//! dotmatrix bright <zone> <0..15>
//! ```
//!
//! Tokens may be separated by whitespace or commas (`dotmatrix,size,1,8`).
//! The namespace and subcommand are matched case-insensitively. The text of
//! `txt` is the fourth token with its case kept; quote it to include spaces or
//! commas (`dotmatrix txt 1 "Hello, World"`). Parsing has no side effects: a
//! rejected command changes nothing.

use crate::codec::QUOTE_CHARS;
use crate::layout::LayoutError;
use crate::{MAX_BRIGHTNESS, MAX_ZONE_SIZE};
use thiserror::Error;

/// Leading token of every command this controller handles.
pub const NAMESPACE: &str = "dotmatrix";

/// A validated command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show `text` in `zone` now
    Text { zone: u8, text: String },
    /// Resize `zone`, which moves every zone after it
    Size { zone: u8, size: u8 },
    /// Change the intensity of `zone`
    Brightness { zone: u8, level: u8 },
}

impl Command {
    pub fn zone(&self) -> u8 {
        match self {
            Command::Text { zone, .. }
            | Command::Size { zone, .. }
            | Command::Brightness { zone, .. } => *zone,
        }
    }
}

/// What a handled command did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandEffect {
    /// Text rendered directly, no reconfiguration
    Rendered { zone: u8 },
    /// Layout recomputed and pushed to the driver
    Reconfigured { zone: u8 },
    /// Intensity applied directly to the live zone
    BrightnessApplied { zone: u8, level: u8 },
}

/// Why a command was not handled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandRejected {
    #[error("not a dotmatrix command")]
    NotOurs,

    #[error("missing zone number")]
    MissingZone,

    #[error("zone must be between 1 and {zone_count}, got '{given}'")]
    UnknownZone { given: String, zone_count: u8 },

    #[error("unknown subcommand '{0}'")]
    UnknownSubcommand(String),

    #[error("missing value")]
    MissingValue,

    #[error("'{0}' is not a number")]
    InvalidValue(String),

    #[error("{what} must be between {min} and {max}, got {value}")]
    ValueOutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("reconfiguration failed: {0}")]
    Reconfigure(#[from] LayoutError),
}

/// Split off the next positional token.
///
/// Returns the token and the unconsumed remainder, which starts at the
/// separator that ended the token.
fn next_token(input: &str) -> Option<(&str, &str)> {
    let input = skip_separator(input);
    if input.is_empty() {
        return None;
    }
    let end = input
        .find(|c: char| c == ',' || c.is_whitespace())
        .unwrap_or(input.len());
    Some((&input[..end], &input[end..]))
}

/// Skip whitespace and at most one comma.
fn skip_separator(input: &str) -> &str {
    let input = input.trim_start();
    input.strip_prefix(',').unwrap_or(input).trim_start()
}

/// The text argument: one token, or everything between a pair of quotes.
fn text_argument(rest: &str) -> &str {
    let input = skip_separator(rest);
    if let Some(quote) = input.chars().next().filter(|c| QUOTE_CHARS.contains(c)) {
        let inner = &input[quote.len_utf8()..];
        return match inner.find(quote) {
            Some(end) => &inner[..end],
            // Unterminated quote runs to the end of the line
            None => inner.trim_end(),
        };
    }
    next_token(input).map_or("", |(token, _)| token)
}

fn parse_value(rest: &str) -> Result<i64, CommandRejected> {
    let (token, _) = next_token(rest).ok_or(CommandRejected::MissingValue)?;
    token
        .parse()
        .map_err(|_| CommandRejected::InvalidValue(token.to_string()))
}

fn in_range(what: &'static str, value: i64, min: i64, max: i64) -> Result<i64, CommandRejected> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(CommandRejected::ValueOutOfRange {
            what,
            value,
            min,
            max,
        })
    }
}

/// Parse and validate `line` against the current zone count.
pub fn parse(line: &str, zone_count: u8) -> Result<Command, CommandRejected> {
    let (namespace, rest) = next_token(line).ok_or(CommandRejected::NotOurs)?;
    if !namespace.eq_ignore_ascii_case(NAMESPACE) {
        return Err(CommandRejected::NotOurs);
    }

    let (sub, rest) = next_token(rest).ok_or(CommandRejected::MissingZone)?;
    let (zone_token, rest) = next_token(rest).ok_or(CommandRejected::MissingZone)?;

    let zone = zone_token
        .parse::<u8>()
        .ok()
        .filter(|z| (1..=zone_count).contains(z))
        .ok_or_else(|| CommandRejected::UnknownZone {
            given: zone_token.to_string(),
            zone_count,
        })?;

    match sub.to_ascii_lowercase().as_str() {
        "txt" => {
            Ok(Command::Text {
                zone,
                text: text_argument(rest).to_string(),
            })
        }
        "size" => {
            let size = in_range("size", parse_value(rest)?, 1, i64::from(MAX_ZONE_SIZE))?;
            Ok(Command::Size {
                zone,
                size: size as u8,
            })
        }
        "bright" => {
            let level = in_range("brightness", parse_value(rest)?, 0, i64::from(MAX_BRIGHTNESS))?;
            Ok(Command::Brightness {
                zone,
                level: level as u8,
            })
        }
        other => Err(CommandRejected::UnknownSubcommand(other.to_string())),
    }
}
