//! # End-to-End Tests for the Zone Controller
//!
//! These tests drive the same controller the binary builds: file-backed
//! settings slots in a temporary directory, the console display and the
//! configured template variables.

use std::fs;
use tempfile::TempDir;

use dotmatrix_zones::codec::{Field, SETTINGS_CAPACITY};
use dotmatrix_zones::command::{CommandEffect, CommandRejected};
use dotmatrix_zones::config::{Config, CONFIG_FILE};
use dotmatrix_zones::form::{FormFields, ZONE_COUNT_KEY};
use dotmatrix_zones::storage::{write_frame, FileSettingsStore};
use dotmatrix_zones::{Alignment, Animation, ContentKind};

use crate::{build_controller, save_form};

fn config_in(dir: &TempDir, zone_count: i32) -> Config {
    let mut config = Config::default();
    config.display.zone_count = zone_count;
    config.storage.dir = dir.path().to_path_buf();
    config
        .templates
        .variables
        .insert("room".to_string(), "hall".to_string());
    config
}

/// Form fields for zones given as (size, offset, text).
fn form(zones: &[(u8, u8, &str)]) -> FormFields {
    let mut fields = FormFields::new();
    fields.insert(ZONE_COUNT_KEY, zones.len().to_string());
    for (index, (size, offset, text)) in zones.iter().enumerate() {
        fields.set_field(index, Field::Size, size);
        fields.set_field(index, Field::Offset, offset);
        fields.set_field(index, Field::Text, text);
        fields.set_field(index, Field::AnimationIn, Animation::ScrollLeft.id());
        fields.set_field(index, Field::Alignment, Alignment::Center.id());
        fields.set_field(index, Field::Brightness, 5);
        fields.set_field(index, Field::RepeatDelay, -1);
    }
    fields
}

/// Zones saved from the form come back unchanged after a restart.
#[test]
fn saved_zones_survive_restart() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, 3);

    let mut first = build_controller(&config);
    let num_devices = first
        .save_from_form(&form(&[(4, 0, "one"), (6, 2, "two, three"), (2, 0, "")]))
        .unwrap();
    assert_eq!(num_devices, 14, "module count is the sum of sizes and offsets");
    let saved = first.zones().to_vec();

    let mut second = build_controller(&config);
    second.begin().unwrap();
    assert_eq!(second.zones(), saved.as_slice());
    assert_eq!(second.zones()[1].text, "two, three");
}

/// With nothing saved yet every expected zone starts unconfigured.
#[test]
fn first_run_pads_unconfigured_zones() {
    let dir = TempDir::new().unwrap();
    let mut controller = build_controller(&config_in(&dir, 2));
    controller.begin().unwrap();

    let zones = controller.zones();
    assert_eq!(zones.len(), 2);
    for (zone, number) in zones.iter().zip(1u8..) {
        assert_eq!(zone.zone, number);
        assert_eq!(zone.animation_in, Animation::Print);
        assert_eq!(zone.brightness, 7);
        assert_eq!(zone.repeat_delay, -1);
    }
}

/// A slot with malformed fields still yields usable zones.
#[test]
fn malformed_slot_degrades_per_field() {
    let dir = TempDir::new().unwrap();
    let payload = b"8\x01'Hi'\x01x\x01\x01\x0199\x01\x01\x01\x01\x01\x01\x01\x01\x02";
    let store = FileSettingsStore::new(dir.path());
    fs::write(store.slot_path(0), write_frame(payload)).unwrap();

    let mut controller = build_controller(&config_in(&dir, -1));
    controller.begin().unwrap();

    let zones = controller.zones();
    assert_eq!(zones.len(), 1, "unknown count takes the decoded count");
    assert_eq!(zones[0].size, 8);
    assert_eq!(zones[0].text, "Hi");
    assert_eq!(zones[0].content, ContentKind::Text);
    assert_eq!(zones[0].animation_in, Animation::None);
    assert_eq!(zones[0].brightness, 7);
    assert_eq!(zones[0].repeat_delay, -1);
}

/// A save that doesn't fit the slot leaves the file as it was.
#[test]
fn oversized_save_keeps_previous_slot() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, 1);
    let mut controller = build_controller(&config);
    controller.save_from_form(&form(&[(4, 0, "kept")])).unwrap();

    let path = FileSettingsStore::new(dir.path()).slot_path(0);
    let before = fs::read(&path).unwrap();

    let long = "x".repeat(SETTINGS_CAPACITY);
    assert!(controller.save_from_form(&form(&[(4, 0, long.as_str())])).is_err());
    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(controller.store().last_error().is_some());

    let mut restarted = build_controller(&config);
    assert_eq!(restarted.zones()[0].text, "kept");
}

/// Runtime commands edit the live zones and the console display follows.
#[test]
fn commands_update_console_display() {
    let dir = TempDir::new().unwrap();
    let mut controller = build_controller(&config_in(&dir, 2));
    controller
        .save_from_form(&form(&[(4, 0, "a"), (6, 2, "b")]))
        .unwrap();

    assert_eq!(
        controller.handle_command("dotmatrix txt 1 %room%"),
        Ok(CommandEffect::Rendered { zone: 1 })
    );
    assert_eq!(controller.driver().zone(0).unwrap().text, "hall");

    assert_eq!(
        controller.handle_command("dotmatrix,size,1,10"),
        Ok(CommandEffect::Reconfigured { zone: 1 })
    );
    let second = controller.driver().zone(1).unwrap();
    assert_eq!((second.start, second.end), (12, 17));

    assert!(matches!(
        controller.handle_command("dotmatrix bright 2 20"),
        Err(CommandRejected::ValueOutOfRange { .. })
    ));
    assert_eq!(controller.driver().zone(1).unwrap().intensity, 5);

    controller.handle_command("dotmatrix bright 2 9").unwrap();
    assert_eq!(controller.driver().zone(1).unwrap().intensity, 9);
}

/// Commands only change live state, never the saved slot.
#[test]
fn commands_are_not_persisted() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, 1);
    let mut controller = build_controller(&config);
    controller.save_from_form(&form(&[(4, 0, "saved")])).unwrap();
    controller.handle_command("dotmatrix txt 1 live").unwrap();

    let mut restarted = build_controller(&config);
    assert_eq!(restarted.zones()[0].text, "saved");
}

/// Loading the same slot twice gives identical zones.
#[test]
fn reload_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, 2);
    build_controller(&config)
        .save_from_form(&form(&[(3, 1, "a"), (5, 0, "b")]))
        .unwrap();

    let mut controller = build_controller(&config);
    controller.store_mut().load().unwrap();
    let first = controller.zones().to_vec();
    controller.store_mut().load().unwrap();
    assert_eq!(controller.zones(), first.as_slice());
}

/// A zone count raised in the form keeps every saved zone active after a
/// restart that reads the config file again.
#[test]
fn submitted_zone_count_survives_restart() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join(CONFIG_FILE);
    let mut config = config_in(&dir, 1);
    config.save(&config_path).unwrap();

    let mut controller = build_controller(&config);
    let fields = form(&[(4, 0, "a"), (4, 0, "b"), (4, 0, "c")]);
    save_form(&mut controller, &mut config, &config_path, &fields).unwrap();
    assert!(controller.handle_command("dotmatrix size 3 5").is_ok());

    let reloaded = Config::load_from_path(&config_path);
    assert_eq!(reloaded.display.zone_count, 3);

    let mut restarted = build_controller(&reloaded);
    restarted.begin().unwrap();
    assert_eq!(restarted.store_mut().zone_count(), 3);
    let third = restarted.driver().zone(2).expect("zone 3 should be laid out");
    assert_eq!((third.start, third.end), (8, 11));
    assert_eq!(
        restarted.handle_command("dotmatrix size 3 5"),
        Ok(CommandEffect::Reconfigured { zone: 3 })
    );
}
