//! # Console Display Rendering
//!
//! A [`DisplayDriver`] for development without the LED chain attached. It keeps
//! what the real driver would show per zone and draws the module strip as
//! ASCII, in the same spirit as the development-mode chart output.
//!
//! Animations are not simulated; a zone simply shows its latest text.

use crate::driver::{DisplayDriver, RenderAttributes};
use crate::{Alignment, Font, SpecialEffect, DEFAULT_BRIGHTNESS, MAX_ZONES};
use tracing::{debug, trace};

/// Characters drawn per 8x8 module.
const CHARS_PER_MODULE: usize = 2;

/// What one zone currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneView {
    pub start: u8,
    pub end: u8,
    pub font: Option<Font>,
    pub char_spacing: u8,
    pub effects: SpecialEffect,
    pub intensity: u8,
    pub text: String,
    pub alignment: Alignment,
    /// Set by every render, cleared by a zone reset
    pub animating: bool,
}

impl Default for ZoneView {
    fn default() -> Self {
        ZoneView {
            start: 0,
            end: 0,
            font: None,
            char_spacing: 1,
            effects: SpecialEffect::NONE,
            intensity: DEFAULT_BRIGHTNESS,
            text: String::new(),
            alignment: Alignment::default(),
            animating: false,
        }
    }
}

impl ZoneView {
    fn width(&self) -> usize {
        (usize::from(self.end) + 1).saturating_sub(usize::from(self.start)) * CHARS_PER_MODULE
    }

    /// Text placed into the zone's columns, truncated to fit.
    fn cells(&self) -> Vec<char> {
        let width = self.width();
        let mut text: Vec<char> = self
            .text
            .chars()
            .map(|c| if c.is_control() { '?' } else { c })
            .collect();
        if self.effects.flip_left_right() {
            text.reverse();
        }
        text.truncate(width);

        let free = width - text.len();
        let lead = match self.alignment {
            Alignment::Left => 0,
            Alignment::Center => free / 2,
            Alignment::Right => free,
        };
        let mut cells = vec![' '; lead];
        cells.extend(text);
        cells.resize(width, ' ');
        cells
    }
}

/// Terminal stand-in for the LED matrix chain.
#[derive(Debug, Default)]
pub struct ConsoleDriver {
    zones: Vec<Option<ZoneView>>,
    /// Incremented by every animation resync
    frame: u64,
}

impl ConsoleDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn view_mut(&mut self, zone: u8) -> &mut ZoneView {
        let index = usize::from(zone);
        if self.zones.len() <= index {
            self.zones.resize(index + 1, None);
        }
        self.zones[index].get_or_insert_with(ZoneView::default)
    }

    /// State of the 0-based `zone`, if it was ever touched.
    pub fn zone(&self, zone: u8) -> Option<&ZoneView> {
        self.zones.get(usize::from(zone)).and_then(Option::as_ref)
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Draw the module strip.
    ///
    /// The first line shows zone numbers over their modules, the second the
    /// text each zone holds. Modules no zone covers stay blank.
    pub fn draw_ascii(&self) -> String {
        let bound = self
            .zones
            .iter()
            .flatten()
            .map(|v| usize::from(v.end) + 1)
            .max()
            .unwrap_or(0);
        let columns = bound * CHARS_PER_MODULE;
        let mut labels = vec!['.'; columns];
        let mut text = vec![' '; columns];

        for (index, view) in self.zones.iter().enumerate() {
            let Some(view) = view else { continue };
            let first = usize::from(view.start) * CHARS_PER_MODULE;
            let label = format!("{}", index + 1);

            for (column, ch) in view.cells().into_iter().enumerate() {
                if let Some(cell) = text.get_mut(first + column) {
                    *cell = ch;
                }
            }
            for column in first..first + view.width() {
                if let Some(cell) = labels.get_mut(column) {
                    *cell = '-';
                }
            }
            for (i, ch) in label.chars().enumerate() {
                if let Some(cell) = labels.get_mut(first + i) {
                    *cell = ch;
                }
            }
        }

        let labels: String = labels.into_iter().collect();
        let text: String = text.into_iter().collect();
        format!("|{labels}|\n|{text}|")
    }

    /// Print the strip to stdout.
    pub fn print(&self) {
        println!("{}", self.draw_ascii());
    }
}

impl DisplayDriver for ConsoleDriver {
    fn clear_display(&mut self) {
        trace!("clear display");
        for view in self.zones.iter_mut().flatten() {
            view.text.clear();
        }
    }

    fn set_zone_bounds(&mut self, zone: u8, start: u8, end: u8) {
        if usize::from(zone) >= usize::from(MAX_ZONES) {
            debug!(zone, "ignoring bounds for zone past the driver's limit");
            return;
        }
        let view = self.view_mut(zone);
        view.start = start;
        view.end = end;
    }

    fn set_font(&mut self, zone: u8, font: Option<Font>) {
        self.view_mut(zone).font = font;
    }

    fn set_char_spacing(&mut self, zone: u8, spacing: u8) {
        self.view_mut(zone).char_spacing = spacing;
    }

    fn set_zone_effects(&mut self, zone: u8, effects: SpecialEffect) {
        self.view_mut(zone).effects = effects;
    }

    fn set_intensity(&mut self, zone: u8, level: u8) {
        self.view_mut(zone).intensity = level;
    }

    fn render_zone_text(&mut self, zone: u8, text: &str, attributes: RenderAttributes) {
        debug!(zone, text, animation = ?attributes.animation_in, "render");
        let view = self.view_mut(zone);
        view.text = text.to_string();
        view.alignment = attributes.alignment;
        view.animating = true;
    }

    fn reset_zone(&mut self, zone: u8) {
        self.view_mut(zone).animating = false;
    }

    fn resync_animation_starts(&mut self) {
        self.frame += 1;
    }
}
