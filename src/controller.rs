//! # Dot Matrix Controller
//!
//! The entry points the host framework calls: startup, settings save, runtime
//! commands and the once-per-second tick. Entry points are invoked one at a
//! time from a single context and every one runs to completion before it
//! returns, so the zone list needs no locking.
//!
//! ## Command Effects
//!
//! | Command  | Mutates        | Driver effect                      |
//! |----------|----------------|------------------------------------|
//! | `txt`    | zone text      | render the zone right away         |
//! | `size`   | zone size      | full reconfiguration before return |
//! | `bright` | zone intensity | intensity applied to the live zone |

use crate::clock::{double_height_upper, format_time};
use crate::command::{self, Command, CommandEffect, CommandRejected};
use crate::driver::{DisplayDriver, RenderAttributes};
use crate::form::{zones_from_form, FormFields};
use crate::layout::{self, LayoutError, ZonePlan};
use crate::storage::SettingsStore;
use crate::store::{StoreError, ZoneStore};
use crate::template::TemplateExpander;
use crate::{normalize_brightness, ContentKind, Layout, ZoneRecord};
use chrono::Timelike;
use tracing::{debug, info, warn};

pub struct DotMatrixController<S, D, T> {
    store: ZoneStore<S>,
    driver: D,
    templates: T,
    /// Blink state of the clock colon
    colon_on: bool,
}

impl<S, D, T> DotMatrixController<S, D, T>
where
    S: SettingsStore,
    D: DisplayDriver,
    T: TemplateExpander,
{
    pub fn new(store: ZoneStore<S>, driver: D, templates: T) -> Self {
        DotMatrixController {
            store,
            driver,
            templates,
            colon_on: true,
        }
    }

    /// Load the saved zones and configure the display.
    ///
    /// An unreadable slot is read once and then replaced by defaults.
    pub fn begin(&mut self) -> Result<Vec<ZonePlan>, LayoutError> {
        self.store.zones();
        self.configure_zones()
    }

    /// Recompute the layout and push it to the driver.
    ///
    /// Nothing reaches the driver when the layout is rejected.
    pub fn configure_zones(&mut self) -> Result<Vec<ZonePlan>, LayoutError> {
        let zone_count = self.store.zone_count();
        let plans = layout::plan(self.store.zones(), zone_count)?;
        info!(zones = plans.len(), "configuring zones");
        layout::apply(&plans, &mut self.driver, &self.templates);
        Ok(plans)
    }

    /// Rebuild the zones from submitted form fields, persist them and
    /// reconfigure. Returns the module count Σ(size + offset).
    pub fn save_from_form(&mut self, fields: &FormFields) -> Result<u16, StoreError> {
        let zone_count = fields.zone_count();
        let zones = zones_from_form(fields, zone_count);
        let num_devices = self.store.save(zones, zone_count)?;

        if let Err(e) = self.configure_zones() {
            // Saved, but the display keeps its previous layout
            warn!("saved zones can't be laid out: {e}");
        }
        Ok(num_devices)
    }

    /// Apply one runtime command.
    ///
    /// A rejected command leaves zones and display untouched.
    pub fn handle_command(&mut self, line: &str) -> Result<CommandEffect, CommandRejected> {
        let zone_count = self.store.zone_count();
        let result = command::parse(line, zone_count).and_then(|cmd| self.apply(cmd));

        match &result {
            Ok(effect) => info!(command = line, ?effect, "command handled"),
            Err(CommandRejected::NotOurs) => {}
            Err(e) => debug!(command = line, "command rejected: {e}"),
        }
        result
    }

    fn apply(&mut self, cmd: Command) -> Result<CommandEffect, CommandRejected> {
        let number = cmd.zone();
        let zone_count = self.store.zone_count();
        let zone = self
            .store
            .find_mut(number)
            .ok_or_else(|| CommandRejected::UnknownZone {
                given: number.to_string(),
                zone_count,
            })?;

        match cmd {
            Command::Text { text, .. } => {
                zone.text = text;
                let (text, attributes) = (zone.text.clone(), RenderAttributes::from(&*zone));
                self.render(number, &text, attributes);
                Ok(CommandEffect::Rendered { zone: number })
            }
            Command::Size { size, .. } => {
                let previous = std::mem::replace(&mut zone.size, size);
                if let Err(e) = self.configure_zones() {
                    if let Some(zone) = self.store.find_mut(number) {
                        zone.size = previous;
                    }
                    return Err(e.into());
                }
                Ok(CommandEffect::Reconfigured { zone: number })
            }
            Command::Brightness { level, .. } => {
                zone.brightness = level;
                self.driver
                    .set_intensity(number - 1, normalize_brightness(level));
                Ok(CommandEffect::BrightnessApplied {
                    zone: number,
                    level,
                })
            }
        }
    }

    fn render(&mut self, number: u8, text: &str, attributes: RenderAttributes) {
        let expanded = self.templates.expand(text);
        debug!(zone = number, raw = text, expanded = %expanded, "zone text");
        self.driver
            .render_zone_text(number.saturating_sub(1), &expanded, attributes);
    }

    /// Refresh live time content.
    ///
    /// Only the first clock zone is updated per tick; date kinds are
    /// placeholders and are skipped. Returns whether a zone was updated.
    pub fn once_per_second<Tm: Timelike>(&mut self, now: &Tm) -> bool {
        let zone_count = self.store.zone_count();
        let target = self
            .store
            .zones()
            .iter()
            .filter(|z| z.zone <= zone_count)
            .find(|z| z.content == ContentKind::Clock4)
            .map(|z| (z.zone, z.layout, RenderAttributes::from(z)));

        let Some((number, layout, attributes)) = target else {
            return false;
        };

        let time = format_time(now, self.colon_on);
        let text = if cfg!(feature = "double-height-font") && layout == Layout::DoubleLower {
            double_height_upper(&time)
        } else {
            time
        };
        self.render(number, &text, attributes);
        self.colon_on = !self.colon_on;

        self.driver.reset_zone(number - 1);
        self.driver.resync_animation_starts();
        true
    }

    /// All zones, loading on first access.
    pub fn zones(&mut self) -> &[ZoneRecord] {
        self.store.zones()
    }

    pub fn store(&self) -> &ZoneStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ZoneStore<S> {
        &mut self.store
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{self, ExpectedZones};
    use crate::driver::{DriverCall, RecordingDriver};
    use crate::storage::{write_frame, MemorySettingsStore};
    use crate::template::VariableTemplates;
    use chrono::NaiveTime;

    type TestController = DotMatrixController<MemorySettingsStore, RecordingDriver, VariableTemplates>;

    fn zone(number: u8, offset: u8, size: u8, text: &str) -> ZoneRecord {
        ZoneRecord {
            offset,
            size,
            text: text.to_string(),
            ..ZoneRecord::unconfigured(number)
        }
    }

    fn controller(zones: &[ZoneRecord]) -> TestController {
        let count = zones.len() as u8;
        let encoded = codec::encode(zones, count).unwrap();
        let mut backend = MemorySettingsStore::new();
        backend.insert(0, write_frame(encoded.as_bytes()));

        let mut templates = VariableTemplates::default();
        templates.set("name", "desk");
        let store = ZoneStore::new(backend, 0, ExpectedZones::Known(count));
        let mut controller = DotMatrixController::new(store, RecordingDriver::new(), templates);
        controller.begin().unwrap();
        controller.driver_mut().clear();
        controller
    }

    #[test]
    fn test_begin_configures_all_zones() {
        let zones = [zone(1, 0, 4, "a"), zone(2, 2, 6, "b")];
        let mut c = controller(&zones);
        c.configure_zones().unwrap();
        assert_eq!(c.driver().bounds(), vec![(0, 0, 3), (1, 6, 11)]);
    }

    #[test]
    fn test_txt_renders_without_reconfiguring() {
        let mut c = controller(&[zone(1, 0, 4, "a"), zone(2, 0, 4, "b")]);

        let effect = c.handle_command("dotmatrix txt 2 \"Hi %name%\"").unwrap();
        assert_eq!(effect, CommandEffect::Rendered { zone: 2 });
        assert_eq!(c.driver().rendered(), vec![(1, "Hi desk")]);
        assert!(c.driver().bounds().is_empty());
        assert_eq!(c.zones()[1].text, "Hi %name%");
    }

    #[test]
    fn test_size_reconfigures_before_returning() {
        let mut c = controller(&[zone(1, 0, 4, "a"), zone(2, 2, 6, "b")]);

        let effect = c.handle_command("dotmatrix size 1 10").unwrap();
        assert_eq!(effect, CommandEffect::Reconfigured { zone: 1 });
        assert_eq!(c.driver().bounds(), vec![(0, 0, 9), (1, 12, 17)]);
        assert_eq!(c.zones()[0].size, 10);
    }

    #[test]
    fn test_size_over_module_budget_is_rolled_back() {
        let mut c = controller(&[zone(1, 190, 60, "a"), zone(2, 0, 4, "b")]);

        let err = c.handle_command("dotmatrix size 2 10").unwrap_err();
        assert!(matches!(err, CommandRejected::Reconfigure(_)));
        assert_eq!(c.zones()[1].size, 4);
        assert!(c.driver().calls.is_empty());
    }

    #[test]
    fn test_bright_applies_directly() {
        let mut c = controller(&[zone(1, 0, 4, "a"), zone(2, 0, 4, "b")]);

        c.handle_command("dotmatrix bright 2 12").unwrap();
        assert_eq!(c.driver().calls, vec![DriverCall::Intensity { zone: 1, level: 12 }]);

        c.driver_mut().clear();
        c.handle_command("dotmatrix bright 2 0").unwrap();
        assert_eq!(c.driver().calls, vec![DriverCall::Intensity { zone: 1, level: 7 }]);
    }

    #[test]
    fn test_out_of_range_bright_changes_nothing() {
        let mut c = controller(&[zone(1, 0, 4, "a"), zone(2, 0, 4, "b")]);
        let before = c.zones().to_vec();

        assert!(c.handle_command("dotmatrix bright 2 20").is_err());
        assert_eq!(c.zones(), before.as_slice());
        assert!(c.driver().calls.is_empty());
    }

    #[test]
    fn test_clock_updates_first_time_zone_only() {
        let mut clock_a = zone(1, 0, 4, "");
        clock_a.content = ContentKind::Clock4;
        let mut clock_b = zone(2, 0, 4, "");
        clock_b.content = ContentKind::Clock4;
        let mut c = controller(&[clock_a, clock_b]);
        let now = NaiveTime::from_hms_opt(9, 41, 0).unwrap();

        assert!(c.once_per_second(&now));
        assert!(c.once_per_second(&now));
        assert_eq!(c.driver().rendered(), vec![(0, "09:41"), (0, "09 41")]);
        assert!(c.driver().calls.contains(&DriverCall::ResetZone { zone: 0 }));
        assert_eq!(
            c.driver().calls.last(),
            Some(&DriverCall::ResyncAnimationStarts)
        );
    }

    #[test]
    fn test_date_content_is_not_refreshed() {
        let mut date = zone(1, 0, 4, "");
        date.content = ContentKind::Date4;
        let mut c = controller(&[date, zone(2, 0, 4, "text")]);

        assert!(!c.once_per_second(&NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
        assert!(c.driver().calls.is_empty());
    }

    #[test]
    fn test_begin_reads_unreadable_slot_once() {
        let mut backend = MemorySettingsStore::new();
        backend.fail_reads("flash read error");
        let store = ZoneStore::new(backend, 0, ExpectedZones::Known(2));
        let mut c = DotMatrixController::new(store, RecordingDriver::new(), VariableTemplates::default());

        c.begin().unwrap();
        assert_eq!(c.store().backend().reads(), 1);
        assert_eq!(c.zones(), &[ZoneRecord::unconfigured(1), ZoneRecord::unconfigured(2)][..]);

        c.configure_zones().unwrap();
        assert_eq!(c.store().backend().reads(), 1);
    }

    #[cfg(feature = "double-height-font")]
    #[test]
    fn test_double_lower_clock_uses_upper_glyphs() {
        let mut clock = zone(1, 0, 4, "");
        clock.content = ContentKind::Clock4;
        clock.font = crate::Font::NumericDoubleHeight;
        clock.layout = Layout::DoubleLower;
        let mut c = controller(&[clock]);
        let now = NaiveTime::from_hms_opt(9, 41, 0).unwrap();

        assert!(c.once_per_second(&now));
        assert!(c.once_per_second(&now));
        assert_eq!(
            c.driver().rendered(),
            vec![
                (0, "\u{b0}\u{b9}\u{ba}\u{b4}\u{b1}"),
                (0, "\u{b0}\u{b9}\u{a0}\u{b4}\u{b1}")
            ]
        );
    }

    #[test]
    fn test_save_from_form_persists_and_reconfigures() {
        let mut c = controller(&[zone(1, 0, 4, "a")]);
        let mut fields = crate::form::form_from_zones(&[zone(1, 0, 4, "a"), zone(2, 1, 3, "b")]);
        fields.insert(crate::form::ZONE_COUNT_KEY, "2");

        assert_eq!(c.save_from_form(&fields).unwrap(), 8);
        assert_eq!(c.driver().bounds(), vec![(0, 0, 3), (1, 5, 7)]);
        assert_eq!(c.store().backend().writes(), 1);
    }
}
