//! Persisted truck settings abstraction.

use log::info;

/// Board variant the truck demo is wired to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BoardVariant {
    Red,
    Green,
    Yellow,
}

impl BoardVariant {
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Red),
            1 => Some(Self::Green),
            2 => Some(Self::Yellow),
            _ => None,
        }
    }

    pub const fn index(self) -> i32 {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Yellow => 2,
        }
    }
}

/// Keys understood by the persistent config collaborator.
///
/// The board variant is deliberately absent: the actuator layer owns that
/// value and keeps its own copy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigKey {
    DataGenInterval,
    DataPushInterval,
    OutsideTemp,
    TargetTemp,
}

/// Abstract persistent key-value backend.
///
/// Reads report absence as `Ok(None)` rather than a magic sentinel value, so
/// a legitimate setting can never be mistaken for "never written".
pub trait ConfigStore {
    type Error: core::fmt::Debug;

    fn get_i32(&mut self, key: ConfigKey) -> Result<Option<i32>, Self::Error>;
    fn set_i32(&mut self, key: ConfigKey, value: i32) -> Result<(), Self::Error>;
    fn get_f32(&mut self, key: ConfigKey) -> Result<Option<f32>, Self::Error>;
    fn set_f32(&mut self, key: ConfigKey, value: f32) -> Result<(), Self::Error>;
}

/// Server-tunable settings that should survive reboot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TruckSettings {
    pub data_gen_interval_secs: u32,
    pub data_push_interval_secs: u32,
    pub outside_temp_c: i32,
    pub target_temp_c: f32,
    pub board_variant: BoardVariant,
}

impl Default for TruckSettings {
    fn default() -> Self {
        Self {
            data_gen_interval_secs: 5,
            data_push_interval_secs: 20,
            outside_temp_c: 27,
            target_temp_c: 2.2,
            board_variant: BoardVariant::Red,
        }
    }
}

impl TruckSettings {
    /// Load settings from the store, falling back to defaults per key.
    ///
    /// Any missing (or invalid) key marks the whole snapshot dirty and
    /// triggers a full re-save of the effective values, so the persisted
    /// copy and the in-memory copy converge in one bootstrap pass.
    pub fn load_or_bootstrap<C: ConfigStore>(store: &mut C) -> Result<Self, C::Error> {
        let mut settings = Self::default();
        let mut bootstrap = false;

        match store.get_i32(ConfigKey::DataGenInterval)? {
            Some(secs) if secs > 0 => settings.data_gen_interval_secs = secs as u32,
            _ => bootstrap = true,
        }
        info!(
            "data generation interval is {}s",
            settings.data_gen_interval_secs
        );

        match store.get_i32(ConfigKey::DataPushInterval)? {
            Some(secs) if secs > 0 => settings.data_push_interval_secs = secs as u32,
            _ => bootstrap = true,
        }
        info!("data push interval is {}s", settings.data_push_interval_secs);

        match store.get_i32(ConfigKey::OutsideTemp)? {
            Some(temp) => settings.outside_temp_c = temp,
            None => bootstrap = true,
        }
        info!("outside air temperature is {}C", settings.outside_temp_c);

        match store.get_f32(ConfigKey::TargetTemp)? {
            Some(temp) => settings.target_temp_c = temp,
            None => bootstrap = true,
        }
        info!("target temperature is {}C", settings.target_temp_c);

        if bootstrap {
            info!("config store incomplete; saving defaults");
            settings.persist(store)?;
        }

        Ok(settings)
    }

    /// Persist the full snapshot unconditionally, never a single key.
    pub fn persist<C: ConfigStore>(&self, store: &mut C) -> Result<(), C::Error> {
        store.set_i32(ConfigKey::DataGenInterval, self.data_gen_interval_secs as i32)?;
        store.set_i32(
            ConfigKey::DataPushInterval,
            self.data_push_interval_secs as i32,
        )?;
        store.set_i32(ConfigKey::OutsideTemp, self.outside_temp_c)?;
        store.set_f32(ConfigKey::TargetTemp, self.target_temp_c)?;
        Ok(())
    }
}

/// Volatile in-memory config backend used during bring-up and in tests.
#[derive(Default, Debug, Clone)]
pub struct MemoryConfig {
    data_gen_interval: Option<i32>,
    data_push_interval: Option<i32>,
    outside_temp: Option<i32>,
    target_temp: Option<f32>,
    pub write_count: u32,
}

impl MemoryConfig {
    pub const fn new() -> Self {
        Self {
            data_gen_interval: None,
            data_push_interval: None,
            outside_temp: None,
            target_temp: None,
            write_count: 0,
        }
    }
}

impl ConfigStore for MemoryConfig {
    type Error = core::convert::Infallible;

    fn get_i32(&mut self, key: ConfigKey) -> Result<Option<i32>, Self::Error> {
        Ok(match key {
            ConfigKey::DataGenInterval => self.data_gen_interval,
            ConfigKey::DataPushInterval => self.data_push_interval,
            ConfigKey::OutsideTemp => self.outside_temp,
            ConfigKey::TargetTemp => None,
        })
    }

    fn set_i32(&mut self, key: ConfigKey, value: i32) -> Result<(), Self::Error> {
        self.write_count += 1;
        match key {
            ConfigKey::DataGenInterval => self.data_gen_interval = Some(value),
            ConfigKey::DataPushInterval => self.data_push_interval = Some(value),
            ConfigKey::OutsideTemp => self.outside_temp = Some(value),
            ConfigKey::TargetTemp => {}
        }
        Ok(())
    }

    fn get_f32(&mut self, key: ConfigKey) -> Result<Option<f32>, Self::Error> {
        Ok(match key {
            ConfigKey::TargetTemp => self.target_temp,
            _ => None,
        })
    }

    fn set_f32(&mut self, key: ConfigKey, value: f32) -> Result<(), Self::Error> {
        self.write_count += 1;
        if key == ConfigKey::TargetTemp {
            self.target_temp = Some(value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_bootstrap_full_default_snapshot() {
        let mut store = MemoryConfig::new();
        let settings = TruckSettings::load_or_bootstrap(&mut store).unwrap();

        assert_eq!(settings, TruckSettings::default());
        // One set per key: the bootstrap is a full-snapshot save.
        assert_eq!(store.write_count, 4);
        assert_eq!(
            store.get_i32(ConfigKey::DataGenInterval).unwrap(),
            Some(5)
        );
        assert_eq!(store.get_f32(ConfigKey::TargetTemp).unwrap(), Some(2.2));
    }

    #[test]
    fn present_keys_load_without_rewrite() {
        let mut store = MemoryConfig::new();
        TruckSettings::default().persist(&mut store).unwrap();
        store.write_count = 0;

        let settings = TruckSettings::load_or_bootstrap(&mut store).unwrap();
        assert_eq!(settings, TruckSettings::default());
        assert_eq!(store.write_count, 0);
    }

    #[test]
    fn one_missing_key_resaves_everything() {
        let mut store = MemoryConfig::new();
        let mut custom = TruckSettings::default();
        custom.data_gen_interval_secs = 9;
        custom.outside_temp_c = 31;
        custom.persist(&mut store).unwrap();
        store.target_temp = None;
        store.write_count = 0;

        let settings = TruckSettings::load_or_bootstrap(&mut store).unwrap();
        assert_eq!(settings.data_gen_interval_secs, 9);
        assert_eq!(settings.outside_temp_c, 31);
        assert_eq!(settings.target_temp_c, 2.2);
        assert_eq!(store.write_count, 4);
    }

    #[test]
    fn non_positive_interval_is_replaced_by_default() {
        let mut store = MemoryConfig::new();
        TruckSettings::default().persist(&mut store).unwrap();
        store.data_gen_interval = Some(0);

        let settings = TruckSettings::load_or_bootstrap(&mut store).unwrap();
        assert_eq!(settings.data_gen_interval_secs, 5);
        assert_eq!(
            store.get_i32(ConfigKey::DataGenInterval).unwrap(),
            Some(5)
        );
    }
}
