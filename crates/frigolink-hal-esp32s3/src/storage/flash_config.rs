//! Flash-backed implementation of the persistent config store.
//!
//! The whole config lives in a single fixed-size record at the start of the
//! last sector of a writable data partition. The record is cached in RAM; a
//! write updates the cache and rewrites the sector. When no usable partition
//! exists the store degrades to the RAM cache alone, so a truck without a
//! data partition still boots.

use embedded_storage::{ReadStorage, Storage};
use esp_bootloader_esp_idf::partitions::{
    DataPartitionSubType, PARTITION_TABLE_MAX_LEN, PartitionType, read_partition_table,
};
use esp_rom_sys::rom::spiflash::{
    ESP_ROM_SPIFLASH_RESULT_OK, esp_rom_spiflash_erase_sector, esp_rom_spiflash_read,
    esp_rom_spiflash_unlock, esp_rom_spiflash_write,
};
use frigolink_core::settings::{ConfigKey, ConfigStore};
use log::{info, warn};

const FLASH_SECTOR_SIZE: u32 = 4096;
const DEFAULT_FLASH_CAPACITY_BYTES: usize = 16 * 1024 * 1024;

const CONFIG_MAGIC: u32 = u32::from_le_bytes(*b"FLC1");
const CONFIG_VERSION: u8 = 1;
const CONFIG_RECORD_LEN: usize = 28;

const PRESENT_DATA_GEN: u8 = 1 << 0;
const PRESENT_DATA_PUSH: u8 = 1 << 1;
const PRESENT_OUTSIDE_TEMP: u8 = 1 << 2;
const PRESENT_TARGET_TEMP: u8 = 1 << 3;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FlashConfigError {
    PartitionTable,
    ConfigPartitionMissing,
    PartitionTooSmall,
    FlashOpFailed(i32),
    Unsupported,
}

#[derive(Debug)]
struct RawFlash;

impl RawFlash {
    fn new() -> Result<Self, FlashConfigError> {
        let rc = unsafe { esp_rom_spiflash_unlock() };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashConfigError::FlashOpFailed(rc));
        }
        Ok(Self)
    }

    fn erase_sector(&mut self, sector_addr: u32) -> Result<(), FlashConfigError> {
        if !sector_addr.is_multiple_of(FLASH_SECTOR_SIZE) {
            return Err(FlashConfigError::Unsupported);
        }

        let rc = unsafe { esp_rom_spiflash_erase_sector(sector_addr / FLASH_SECTOR_SIZE) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashConfigError::FlashOpFailed(rc));
        }
        Ok(())
    }

    fn read_word(&mut self, addr: u32) -> Result<u32, FlashConfigError> {
        if !addr.is_multiple_of(4) {
            return Err(FlashConfigError::Unsupported);
        }

        let mut word = 0u32;
        let rc = unsafe { esp_rom_spiflash_read(addr, &mut word as *mut u32 as *const u32, 4) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashConfigError::FlashOpFailed(rc));
        }
        Ok(word)
    }

    fn write_word(&mut self, addr: u32, word: u32) -> Result<(), FlashConfigError> {
        if !addr.is_multiple_of(4) {
            return Err(FlashConfigError::Unsupported);
        }

        let rc = unsafe { esp_rom_spiflash_write(addr, &word as *const u32, 4) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashConfigError::FlashOpFailed(rc));
        }
        Ok(())
    }

    fn read_bytes(&mut self, addr: u32, out: &mut [u8]) -> Result<(), FlashConfigError> {
        let mut filled = 0usize;
        let mut word_addr = addr & !0b11;

        while filled < out.len() {
            let bytes = self.read_word(word_addr)?.to_le_bytes();
            let skip = (addr + filled as u32 - word_addr) as usize;
            for b in &bytes[skip..] {
                if filled == out.len() {
                    break;
                }
                out[filled] = *b;
                filled += 1;
            }
            word_addr += 4;
        }

        Ok(())
    }

    /// Write a word-aligned, word-sized buffer into a freshly erased range.
    fn write_erased_record(
        &mut self,
        addr: u32,
        data: &[u8; CONFIG_RECORD_LEN],
    ) -> Result<(), FlashConfigError> {
        for (i, chunk) in data.chunks_exact(4).enumerate() {
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            self.write_word(addr + (i as u32) * 4, word)?;
        }
        Ok(())
    }
}

impl ReadStorage for RawFlash {
    type Error = FlashConfigError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.read_bytes(offset, bytes)
    }

    fn capacity(&self) -> usize {
        DEFAULT_FLASH_CAPACITY_BYTES
    }
}

impl Storage for RawFlash {
    fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), Self::Error> {
        Err(FlashConfigError::Unsupported)
    }
}

/// Cached config values plus their presence bitmap.
#[derive(Debug, Clone, Copy, Default)]
struct ConfigRecord {
    present: u8,
    data_gen_interval: i32,
    data_push_interval: i32,
    outside_temp: i32,
    target_temp_bits: u32,
}

impl ConfigRecord {
    fn encode(&self) -> [u8; CONFIG_RECORD_LEN] {
        let mut buf = [0xFFu8; CONFIG_RECORD_LEN];
        buf[0..4].copy_from_slice(&CONFIG_MAGIC.to_le_bytes());
        buf[4] = CONFIG_VERSION;
        buf[5] = self.present;
        buf[6..8].copy_from_slice(&[0u8; 2]);
        buf[8..12].copy_from_slice(&self.data_gen_interval.to_le_bytes());
        buf[12..16].copy_from_slice(&self.data_push_interval.to_le_bytes());
        buf[16..20].copy_from_slice(&self.outside_temp.to_le_bytes());
        buf[20..24].copy_from_slice(&self.target_temp_bits.to_le_bytes());
        let checksum = checksum32(&buf[..24]);
        buf[24..28].copy_from_slice(&checksum.to_le_bytes());
        buf
    }

    /// `None` for an erased, foreign, or corrupted record: the caller starts
    /// from an empty cache and the engine bootstraps defaults over it.
    fn decode(buf: &[u8; CONFIG_RECORD_LEN]) -> Option<Self> {
        if buf.iter().all(|b| *b == 0xFF) {
            return None;
        }

        let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if magic != CONFIG_MAGIC || buf[4] != CONFIG_VERSION {
            return None;
        }

        let expected_checksum = u32::from_le_bytes([buf[24], buf[25], buf[26], buf[27]]);
        if checksum32(&buf[..24]) != expected_checksum {
            return None;
        }

        Some(Self {
            present: buf[5],
            data_gen_interval: i32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            data_push_interval: i32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            outside_temp: i32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
            target_temp_bits: u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]),
        })
    }
}

#[derive(Debug)]
struct FlashBackend {
    flash: RawFlash,
    config_sector_addr: u32,
}

impl FlashBackend {
    fn probe() -> Result<Self, FlashConfigError> {
        let mut flash = RawFlash::new()?;

        let mut table_buf = [0u8; PARTITION_TABLE_MAX_LEN];
        let table = read_partition_table(&mut flash, &mut table_buf)
            .map_err(|_| FlashConfigError::PartitionTable)?;

        let mut best_data_undefined: Option<(u32, u32)> = None;
        let mut fallback_nvs: Option<(u32, u32)> = None;

        for entry in table.iter() {
            if entry.is_read_only() || entry.len() < FLASH_SECTOR_SIZE {
                continue;
            }

            match entry.partition_type() {
                PartitionType::Data(DataPartitionSubType::Undefined) => {
                    best_data_undefined = Some((entry.offset(), entry.len()));
                    break;
                }
                PartitionType::Data(DataPartitionSubType::Nvs) => {
                    if fallback_nvs.is_none() {
                        fallback_nvs = Some((entry.offset(), entry.len()));
                    }
                }
                _ => {}
            }
        }

        let (offset, len) = best_data_undefined
            .or(fallback_nvs)
            .ok_or(FlashConfigError::ConfigPartitionMissing)?;

        if len < FLASH_SECTOR_SIZE {
            return Err(FlashConfigError::PartitionTooSmall);
        }

        Ok(Self {
            flash,
            config_sector_addr: offset + len - FLASH_SECTOR_SIZE,
        })
    }

    fn load(&mut self) -> Result<Option<ConfigRecord>, FlashConfigError> {
        let mut buf = [0u8; CONFIG_RECORD_LEN];
        self.flash.read_bytes(self.config_sector_addr, &mut buf)?;
        Ok(ConfigRecord::decode(&buf))
    }

    fn save(&mut self, record: &ConfigRecord) -> Result<(), FlashConfigError> {
        self.flash.erase_sector(self.config_sector_addr)?;
        self.flash
            .write_erased_record(self.config_sector_addr, &record.encode())
    }
}

/// Persistent config store over the last sector of a data partition.
///
/// Construction never fails: without a usable backend every write stays in
/// RAM and every value is lost on reboot, which the engine treats the same
/// as a blank store.
#[derive(Debug)]
pub struct FlashConfigStore {
    backend: Option<FlashBackend>,
    cached: ConfigRecord,
}

impl FlashConfigStore {
    pub fn new() -> Self {
        let mut backend = match FlashBackend::probe() {
            Ok(backend) => Some(backend),
            Err(err) => {
                warn!("config flash unavailable ({:?}); settings are volatile", err);
                None
            }
        };

        let cached = match backend.as_mut().map(|b| b.load()) {
            Some(Ok(Some(record))) => {
                info!("config record restored from flash");
                record
            }
            Some(Ok(None)) => {
                info!("no config record in flash");
                ConfigRecord::default()
            }
            Some(Err(err)) => {
                warn!("config record read failed: {:?}", err);
                ConfigRecord::default()
            }
            None => ConfigRecord::default(),
        };

        Self { backend, cached }
    }

    fn commit(&mut self) -> Result<(), FlashConfigError> {
        match self.backend.as_mut() {
            Some(backend) => backend.save(&self.cached),
            None => Ok(()),
        }
    }
}

impl Default for FlashConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FlashConfigStore {
    type Error = FlashConfigError;

    fn get_i32(&mut self, key: ConfigKey) -> Result<Option<i32>, Self::Error> {
        let (bit, value) = match key {
            ConfigKey::DataGenInterval => (PRESENT_DATA_GEN, self.cached.data_gen_interval),
            ConfigKey::DataPushInterval => (PRESENT_DATA_PUSH, self.cached.data_push_interval),
            ConfigKey::OutsideTemp => (PRESENT_OUTSIDE_TEMP, self.cached.outside_temp),
            ConfigKey::TargetTemp => return Ok(None),
        };
        Ok((self.cached.present & bit != 0).then_some(value))
    }

    fn set_i32(&mut self, key: ConfigKey, value: i32) -> Result<(), Self::Error> {
        match key {
            ConfigKey::DataGenInterval => {
                self.cached.data_gen_interval = value;
                self.cached.present |= PRESENT_DATA_GEN;
            }
            ConfigKey::DataPushInterval => {
                self.cached.data_push_interval = value;
                self.cached.present |= PRESENT_DATA_PUSH;
            }
            ConfigKey::OutsideTemp => {
                self.cached.outside_temp = value;
                self.cached.present |= PRESENT_OUTSIDE_TEMP;
            }
            ConfigKey::TargetTemp => return Ok(()),
        }
        self.commit()
    }

    fn get_f32(&mut self, key: ConfigKey) -> Result<Option<f32>, Self::Error> {
        if key != ConfigKey::TargetTemp {
            return Ok(None);
        }
        Ok((self.cached.present & PRESENT_TARGET_TEMP != 0)
            .then_some(f32::from_bits(self.cached.target_temp_bits)))
    }

    fn set_f32(&mut self, key: ConfigKey, value: f32) -> Result<(), Self::Error> {
        if key != ConfigKey::TargetTemp {
            return Ok(());
        }
        self.cached.target_temp_bits = value.to_bits();
        self.cached.present |= PRESENT_TARGET_TEMP;
        self.commit()
    }
}

fn checksum32(bytes: &[u8]) -> u32 {
    let mut hash = 0x811C_9DC5u32;
    for b in bytes {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}
