//! User settings and their persistence in the fixed-address byte store.
//!
//! The store is a flat region validated by a magic marker. Values are packed
//! little-endian at fixed offsets; anything out of range coming back from
//! the store is clamped on load, so a corrupt byte can never propagate into
//! the running system. A bad magic means "never initialised" and triggers a
//! silent default write; first boot and a wiped store look identical.

use serde::{Deserialize, Serialize};

use crate::config::{
    ADDR_AUDIO_MODE, ADDR_AUDIO_THRESHOLD, ADDR_EYE_BRIGHTNESS, ADDR_MAGIC,
    ADDR_MOUTH_BRIGHTNESS, ADDR_POWER_ON, ADDR_TIME_OFFSET, ADDR_VISUAL_EFFECT, ADDR_VOLUME,
    AUDIO_MODE_COUNT, DEFAULT_AUDIO_THRESHOLD, DEFAULT_EYE_BRIGHTNESS, DEFAULT_MOUTH_BRIGHTNESS,
    DEFAULT_VOLUME, MAX_BRIGHTNESS, MAX_VOLUME, STORE_MAGIC, VISUAL_EFFECT_COUNT,
};
use crate::error::Result;

/// Byte-level access to the persisted settings region.
///
/// Implemented by the host over EEPROM, flash emulation, or a plain file.
/// `commit` flushes staged writes to the medium.
pub trait SettingsStore {
    fn read_at(&mut self, addr: usize) -> Result<u8>;
    fn write_at(&mut self, addr: usize, value: u8) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
}

/// All user-adjustable settings. Every bounded field is clamped in its
/// setter, so an instance can never hold an out-of-range value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    power_on: bool,
    volume: u8,
    mouth_brightness: u8,
    eye_brightness: u8,
    audio_threshold: u16,
    audio_mode: u8,
    visual_effect: u8,
    time_calibration_offset: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            power_on: false,
            volume: DEFAULT_VOLUME,
            mouth_brightness: DEFAULT_MOUTH_BRIGHTNESS,
            eye_brightness: DEFAULT_EYE_BRIGHTNESS,
            audio_threshold: DEFAULT_AUDIO_THRESHOLD,
            audio_mode: 0,
            visual_effect: 0,
            time_calibration_offset: 0,
        }
    }
}

impl Settings {
    pub fn power_on(&self) -> bool {
        self.power_on
    }

    pub fn set_power_on(&mut self, on: bool) {
        self.power_on = on;
    }

    pub fn toggle_power(&mut self) {
        self.power_on = !self.power_on;
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(MAX_VOLUME);
    }

    pub fn mouth_brightness(&self) -> u8 {
        self.mouth_brightness
    }

    pub fn set_mouth_brightness(&mut self, brightness: u8) {
        self.mouth_brightness = brightness.min(MAX_BRIGHTNESS);
    }

    pub fn eye_brightness(&self) -> u8 {
        self.eye_brightness
    }

    pub fn set_eye_brightness(&mut self, brightness: u8) {
        self.eye_brightness = brightness.min(MAX_BRIGHTNESS);
    }

    pub fn audio_threshold(&self) -> u16 {
        self.audio_threshold
    }

    /// Zero is not a usable threshold and falls back to the default.
    pub fn set_audio_threshold(&mut self, threshold: u16) {
        self.audio_threshold = if threshold == 0 {
            DEFAULT_AUDIO_THRESHOLD
        } else {
            threshold
        };
    }

    pub fn audio_mode(&self) -> u8 {
        self.audio_mode
    }

    pub fn set_audio_mode(&mut self, mode: u8) {
        self.audio_mode = mode.min(AUDIO_MODE_COUNT - 1);
    }

    pub fn visual_effect(&self) -> u8 {
        self.visual_effect
    }

    pub fn set_visual_effect(&mut self, effect: u8) {
        self.visual_effect = effect.min(VISUAL_EFFECT_COUNT - 1);
    }

    pub fn time_calibration_offset(&self) -> i32 {
        self.time_calibration_offset
    }

    pub fn set_time_calibration_offset(&mut self, offset: i32) {
        self.time_calibration_offset = offset;
    }
}

/// Settings plus exclusive ownership of their backing store.
///
/// Saving is explicit: the host calls [`save`](Self::save) after a
/// settings-changing gesture, nothing writes behind its back.
#[derive(Debug)]
pub struct PersistentState<S: SettingsStore> {
    store: S,
    settings: Settings,
}

impl<S: SettingsStore> PersistentState<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            settings: Settings::default(),
        }
    }

    /// Validates the store and either loads the persisted settings or, on a
    /// missing/invalid magic marker, writes and persists the defaults.
    pub fn init(&mut self) -> Result<()> {
        if self.magic_is_valid()? {
            self.load()
        } else {
            self.settings = Settings::default();
            self.save()
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Reads every field from the store, clamping as it goes.
    pub fn load(&mut self) -> Result<()> {
        let mut loaded = Settings::default();
        loaded.set_power_on(self.store.read_at(ADDR_POWER_ON)? != 0);
        loaded.set_volume(self.store.read_at(ADDR_VOLUME)?);
        loaded.set_mouth_brightness(self.store.read_at(ADDR_MOUTH_BRIGHTNESS)?);
        loaded.set_eye_brightness(self.store.read_at(ADDR_EYE_BRIGHTNESS)?);
        loaded.set_audio_threshold(self.read_u16(ADDR_AUDIO_THRESHOLD)?);
        loaded.set_audio_mode(self.store.read_at(ADDR_AUDIO_MODE)?);
        loaded.set_visual_effect(self.store.read_at(ADDR_VISUAL_EFFECT)?);
        loaded.set_time_calibration_offset(self.read_i32(ADDR_TIME_OFFSET)?);
        self.settings = loaded;
        Ok(())
    }

    /// Writes magic and every field at their fixed offsets, then commits.
    pub fn save(&mut self) -> Result<()> {
        self.write_u16(ADDR_MAGIC, STORE_MAGIC)?;
        self.store
            .write_at(ADDR_POWER_ON, u8::from(self.settings.power_on))?;
        self.store.write_at(ADDR_VOLUME, self.settings.volume)?;
        self.store
            .write_at(ADDR_MOUTH_BRIGHTNESS, self.settings.mouth_brightness)?;
        self.store
            .write_at(ADDR_EYE_BRIGHTNESS, self.settings.eye_brightness)?;
        self.write_u16(ADDR_AUDIO_THRESHOLD, self.settings.audio_threshold)?;
        self.store.write_at(ADDR_AUDIO_MODE, self.settings.audio_mode)?;
        self.store
            .write_at(ADDR_VISUAL_EFFECT, self.settings.visual_effect)?;
        self.write_i32(ADDR_TIME_OFFSET, self.settings.time_calibration_offset)?;
        self.store.commit()
    }

    fn magic_is_valid(&mut self) -> Result<bool> {
        Ok(self.read_u16(ADDR_MAGIC)? == STORE_MAGIC)
    }

    fn read_u16(&mut self, addr: usize) -> Result<u16> {
        let lo = self.store.read_at(addr)?;
        let hi = self.store.read_at(addr + 1)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn write_u16(&mut self, addr: usize, value: u16) -> Result<()> {
        for (offset, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.store.write_at(addr + offset, byte)?;
        }
        Ok(())
    }

    fn read_i32(&mut self, addr: usize) -> Result<i32> {
        let mut bytes = [0u8; 4];
        for (offset, byte) in bytes.iter_mut().enumerate() {
            *byte = self.store.read_at(addr + offset)?;
        }
        Ok(i32::from_le_bytes(bytes))
    }

    fn write_i32(&mut self, addr: usize, value: i32) -> Result<()> {
        for (offset, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.store.write_at(addr + offset, byte)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MemoryStore;
    use super::*;

    #[test]
    fn first_boot_writes_and_commits_defaults() {
        let mut state = PersistentState::new(MemoryStore::new());
        state.init().unwrap();

        assert_eq!(*state.settings(), Settings::default());
        assert_eq!(state.store.commits, 1);
        assert_eq!(state.store.bytes[ADDR_MAGIC], 0xBE);
        assert_eq!(state.store.bytes[ADDR_MAGIC + 1], 0xBE);
        assert_eq!(state.store.bytes[ADDR_VOLUME], DEFAULT_VOLUME);
    }

    #[test]
    fn second_boot_loads_without_rewriting() {
        let store = MemoryStore::seeded(&[]);
        let mut state = PersistentState::new(store);
        state.init().unwrap();

        assert_eq!(*state.settings(), Settings::default());
        // No default rewrite happened on the validated store.
        assert_eq!(state.store.commits, 0);
    }

    #[test]
    fn save_round_trips_every_field() {
        let mut state = PersistentState::new(MemoryStore::new());
        state.init().unwrap();

        state.settings_mut().set_power_on(true);
        state.settings_mut().set_volume(17);
        state.settings_mut().set_mouth_brightness(3);
        state.settings_mut().set_eye_brightness(1);
        state.settings_mut().set_audio_threshold(777);
        state.settings_mut().set_audio_mode(2);
        state.settings_mut().set_visual_effect(1);
        state.settings_mut().set_time_calibration_offset(-12_345);
        state.save().unwrap();

        let expected = state.settings().clone();
        let mut reloaded = PersistentState::new(std::mem::replace(
            &mut state.store,
            MemoryStore::new(),
        ));
        reloaded.init().unwrap();
        assert_eq!(*reloaded.settings(), expected);
    }

    #[test]
    fn out_of_range_stored_values_are_clamped_on_load() {
        let store = MemoryStore::seeded(&[
            (ADDR_VOLUME, 255),
            (ADDR_MOUTH_BRIGHTNESS, 200),
            (ADDR_AUDIO_MODE, 9),
            (ADDR_VISUAL_EFFECT, 7),
        ]);
        let mut state = PersistentState::new(store);
        state.init().unwrap();

        assert_eq!(state.settings().volume(), MAX_VOLUME);
        assert_eq!(state.settings().mouth_brightness(), MAX_BRIGHTNESS);
        assert_eq!(state.settings().audio_mode(), AUDIO_MODE_COUNT - 1);
        assert_eq!(state.settings().visual_effect(), VISUAL_EFFECT_COUNT - 1);
    }

    #[test]
    fn zero_threshold_in_store_falls_back_to_default() {
        let store = MemoryStore::seeded(&[(ADDR_AUDIO_THRESHOLD, 0), (ADDR_AUDIO_THRESHOLD + 1, 0)]);
        let mut state = PersistentState::new(store);
        state.init().unwrap();
        assert_eq!(state.settings().audio_threshold(), DEFAULT_AUDIO_THRESHOLD);
    }

    #[test]
    fn corrupt_magic_self_heals_to_defaults() {
        let store = MemoryStore::seeded(&[(ADDR_MAGIC, 0x12), (ADDR_VOLUME, 255)]);
        let mut state = PersistentState::new(store);
        state.init().unwrap();

        assert_eq!(*state.settings(), Settings::default());
        // The rewrite restored a valid marker.
        assert_eq!(state.store.bytes[ADDR_MAGIC], 0xBE);
        assert_eq!(state.store.bytes[ADDR_VOLUME], DEFAULT_VOLUME);
    }

    #[test]
    fn setters_clamp_immediately() {
        let mut settings = Settings::default();
        settings.set_volume(200);
        assert_eq!(settings.volume(), MAX_VOLUME);
        settings.set_eye_brightness(16);
        assert_eq!(settings.eye_brightness(), MAX_BRIGHTNESS);
        settings.set_audio_mode(4);
        assert_eq!(settings.audio_mode(), 3);
        settings.set_visual_effect(3);
        assert_eq!(settings.visual_effect(), 2);
        settings.set_audio_threshold(0);
        assert_eq!(settings.audio_threshold(), DEFAULT_AUDIO_THRESHOLD);
    }
}
