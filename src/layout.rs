//! # Zone Layout Planner
//!
//! Turns the ordered zone list into physical module ranges. Zones are laid out
//! left to right along the module chain; each zone's `offset` leaves that many
//! modules dark before it starts:
//!
//! ```text
//! start = cursor + offset
//! end   = start + size - 1
//! cursor = end + 1
//! ```
//!
//! Planning is a pure function of the zone list. It keeps no state and must be
//! re-run whenever a size, an offset or the zone count changes. [`apply`] then
//! pushes the plan to the display driver.

use crate::driver::{DisplayDriver, RenderAttributes};
use crate::template::TemplateExpander;
use crate::{ContentKind, Font, Layout, SpecialEffect, ZoneRecord, MAX_MODULES};
use thiserror::Error;
use tracing::{debug, warn};

/// Character spacing for the built-in font, in columns.
pub const DEFAULT_CHAR_SPACING: u8 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Σ(offset + size) is more than the chain can address
    #[error("zones need {required} modules, the display chain addresses at most {max}")]
    ModuleBudgetExceeded { required: u16, max: u16 },
}

/// An inclusive range of module indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleSpan {
    pub start: u8,
    pub end: u8,
}

impl ModuleSpan {
    pub fn modules(self) -> u16 {
        u16::from(self.end) - u16::from(self.start) + 1
    }
}

/// Text the planner wants shown as soon as the zone is configured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderRequest {
    /// Unexpanded zone text
    pub text: String,
    pub attributes: RenderAttributes,
}

/// Everything the driver needs to set up one zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZonePlan {
    /// 1-based zone number
    pub zone: u8,
    /// `None` for a zone without modules
    pub span: Option<ModuleSpan>,
    /// `None` keeps the built-in font
    pub font: Option<Font>,
    pub char_spacing: u8,
    pub layout: Layout,
    pub effects: SpecialEffect,
    /// Already normalized, never 0
    pub brightness: u8,
    pub render: Option<RenderRequest>,
}

impl ZonePlan {
    /// 0-based zone index used by the driver.
    pub fn index(&self) -> u8 {
        self.zone.saturating_sub(1)
    }
}

impl From<&ZoneRecord> for RenderAttributes {
    fn from(zone: &ZoneRecord) -> Self {
        RenderAttributes {
            alignment: zone.alignment,
            speed: zone.speed,
            pause: zone.pause,
            animation_in: zone.animation_in,
            animation_out: zone.animation_out,
        }
    }
}

/// Font override and character spacing for a font choice.
///
/// Any alternate font also doubles the spacing; the double-height digits
/// run together otherwise.
pub fn resolve_font(font: Font) -> (Option<Font>, u8) {
    match font {
        Font::Default => (None, DEFAULT_CHAR_SPACING),
        other => (Some(other), DEFAULT_CHAR_SPACING * 2),
    }
}

/// Compute the layout for every zone numbered `<= expected_zones`.
pub fn plan(zones: &[ZoneRecord], expected_zones: u8) -> Result<Vec<ZonePlan>, LayoutError> {
    let active: Vec<&ZoneRecord> = zones.iter().filter(|z| z.zone <= expected_zones).collect();

    let required: u16 = active.iter().map(|z| z.footprint()).sum();
    if required > MAX_MODULES {
        return Err(LayoutError::ModuleBudgetExceeded {
            required,
            max: MAX_MODULES,
        });
    }

    let mut cursor: u16 = 0;
    let mut plans = Vec::with_capacity(active.len());

    for zone in active {
        let start = cursor + u16::from(zone.offset);
        // required <= MAX_MODULES keeps every index below 255
        let span = if zone.size == 0 {
            cursor = start;
            None
        } else {
            let end = start + u16::from(zone.size) - 1;
            cursor = end + 1;
            Some(ModuleSpan {
                start: start as u8,
                end: end as u8,
            })
        };

        if zone.special_effect != SpecialEffect::NONE
            && (zone.animation_in.conflicts_with_flip() || zone.animation_out.conflicts_with_flip())
        {
            warn!(
                zone = zone.zone,
                "sideways animation combined with a flip effect may render incorrectly"
            );
        }

        let (font, char_spacing) = resolve_font(zone.font);
        let render = (zone.content == ContentKind::Text && !zone.text.is_empty()).then(|| {
            RenderRequest {
                text: zone.text.clone(),
                attributes: RenderAttributes::from(zone),
            }
        });

        debug!(zone = zone.zone, ?span, cursor, "planned zone");
        plans.push(ZonePlan {
            zone: zone.zone,
            span,
            font,
            char_spacing,
            layout: zone.layout,
            effects: zone.special_effect,
            brightness: zone.effective_brightness(),
            render,
        });
    }

    Ok(plans)
}

/// Push a plan to the driver, starting from a cleared display.
pub fn apply<D, T>(plans: &[ZonePlan], driver: &mut D, templates: &T)
where
    D: DisplayDriver + ?Sized,
    T: TemplateExpander + ?Sized,
{
    driver.clear_display();

    for plan in plans {
        let index = plan.index();
        if let Some(span) = plan.span {
            driver.set_zone_bounds(index, span.start, span.end);
        }
        driver.set_font(index, plan.font);
        driver.set_char_spacing(index, plan.char_spacing);
        driver.set_zone_effects(index, plan.effects);
        driver.set_intensity(index, plan.brightness);

        if let Some(request) = &plan.render {
            let text = templates.expand(&request.text);
            debug!(zone = plan.zone, raw = %request.text, expanded = %text, "zone text");
            driver.render_zone_text(index, &text, request.attributes);
        }
    }
}
