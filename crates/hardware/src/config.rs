//! Configuration system for the coherence simulator.
//!
//! This module defines all configuration structures used to parameterize a run. It provides:
//! 1. **Defaults:** Baseline geometry and timing constants (100-cycle memory, 2 cycles per word).
//! 2. **Structures:** Hierarchical config for general run controls, cache geometry, and timing.
//! 3. **Validation:** Rejection of geometries the engine cannot address.
//!
//! Configuration is supplied via JSON (`Config::from_json`) or built from CLI flags on top of
//! `Config::default()`.

use serde::Deserialize;

use crate::common::{AddressLayout, ConfigError};

/// Default configuration constants for the simulator.
mod defaults {
    /// Number of symmetric cores, one trace file each.
    pub const CORES: usize = 4;

    /// Set-index bits (`s`); 64 sets.
    pub const SET_INDEX_BITS: u32 = 6;

    /// Lines per set (`E`).
    pub const ASSOCIATIVITY: usize = 2;

    /// Block-offset bits (`b`); 32-byte blocks.
    pub const BLOCK_OFFSET_BITS: u32 = 5;

    /// Cycles to fetch a block from backing memory.
    pub const MEMORY_LATENCY: u64 = 100;

    /// Cycles to write a dirty block back to memory (snoop flush or eviction).
    pub const WRITEBACK_LATENCY: u64 = 100;

    /// Bus word width in bytes.
    pub const WORD_BYTES: usize = 4;

    /// Cycles to move one word across the bus between caches.
    pub const WORD_TRANSFER_CYCLES: u64 = 2;

    /// Largest line count of one private cache.
    pub const MAX_CACHE_LINES: u64 = 1 << 24;

    /// Largest capacity of one private cache, in bytes.
    pub const MAX_CACHE_BYTES: u64 = 1 << 30;
}

/// Top-level simulator configuration.
///
/// # Examples
///
/// ```
/// use mesisim_core::config::Config;
///
/// let json = r#"{
///     "general": { "cores": 4, "check_coherence": true },
///     "cache": { "set_index_bits": 2, "associativity": 2, "block_offset_bits": 4 },
///     "timing": { "memory_latency": 80 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.cache.num_sets(), 4);
/// assert_eq!(config.cache.block_bytes(), 16);
/// assert_eq!(config.timing.memory_latency, 80);
/// assert_eq!(config.timing.writeback_latency, 100);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Run controls (core count, checks, limits)
    #[serde(default)]
    pub general: GeneralConfig,
    /// Private cache geometry, identical for every core
    #[serde(default)]
    pub cache: CacheConfig,
    /// Bus and memory timing policy
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Config {
    /// Parses a configuration from JSON; omitted fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if the text is not a valid configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// Checks that the geometry and timing can be simulated.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found: zero cores, zero associativity, a word size
    /// that is not a power of two, a block smaller than one bus word, index plus offset
    /// bits wider than a 32-bit address, or a cache above 2^24 lines or 1 GiB.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.cores == 0 {
            return Err(ConfigError::NoCores);
        }
        if self.cache.associativity == 0 {
            return Err(ConfigError::ZeroAssociativity);
        }
        let word = self.timing.word_bytes;
        if word == 0 || !word.is_power_of_two() {
            return Err(ConfigError::InvalidWordSize(word));
        }
        let min = word.trailing_zeros();
        if self.cache.block_offset_bits < min {
            return Err(ConfigError::BlockTooSmall {
                offset_bits: self.cache.block_offset_bits,
                min,
                word_bytes: word,
            });
        }
        if self.cache.set_index_bits + self.cache.block_offset_bits > 32 {
            return Err(ConfigError::AddressTooWide {
                index_bits: self.cache.set_index_bits,
                offset_bits: self.cache.block_offset_bits,
            });
        }
        let lines = (1u64 << self.cache.set_index_bits)
            .saturating_mul(self.cache.associativity as u64);
        let bytes = lines.saturating_mul(1u64 << self.cache.block_offset_bits);
        if lines > defaults::MAX_CACHE_LINES || bytes > defaults::MAX_CACHE_BYTES {
            return Err(ConfigError::CacheTooLarge {
                lines,
                bytes,
                max_lines: defaults::MAX_CACHE_LINES,
                max_bytes: defaults::MAX_CACHE_BYTES,
            });
        }
        Ok(())
    }
}

/// General run controls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneralConfig {
    /// Number of cores; each gets one trace and one private cache
    #[serde(default = "GeneralConfig::default_cores")]
    pub cores: usize,

    /// Verify MESI invariants across all caches after every completed bus transaction
    #[serde(default)]
    pub check_coherence: bool,

    /// Abort the run after this many cycles (`None` runs until every queue drains)
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

impl GeneralConfig {
    /// Returns the default core count.
    const fn default_cores() -> usize {
        defaults::CORES
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cores: defaults::CORES,
            check_coherence: false,
            max_cycles: None,
        }
    }
}

/// Private cache geometry (`s`, `E`, `b`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Set-index bits; the cache has `2^s` sets
    #[serde(default = "CacheConfig::default_set_index_bits")]
    pub set_index_bits: u32,

    /// Lines per set
    #[serde(default = "CacheConfig::default_associativity")]
    pub associativity: usize,

    /// Block-offset bits; blocks are `2^b` bytes
    #[serde(default = "CacheConfig::default_block_offset_bits")]
    pub block_offset_bits: u32,
}

impl CacheConfig {
    /// Returns the default set-index bits.
    const fn default_set_index_bits() -> u32 {
        defaults::SET_INDEX_BITS
    }

    /// Returns the default associativity.
    const fn default_associativity() -> usize {
        defaults::ASSOCIATIVITY
    }

    /// Returns the default block-offset bits.
    const fn default_block_offset_bits() -> u32 {
        defaults::BLOCK_OFFSET_BITS
    }

    /// Address decomposition for this geometry.
    pub const fn layout(&self) -> AddressLayout {
        AddressLayout::new(self.set_index_bits, self.block_offset_bits)
    }

    /// Number of sets (`2^s`).
    pub const fn num_sets(&self) -> usize {
        1usize << self.set_index_bits
    }

    /// Block size in bytes (`2^b`).
    pub const fn block_bytes(&self) -> usize {
        1usize << self.block_offset_bits
    }

    /// Capacity of one private cache in bytes.
    pub const fn size_bytes(&self) -> usize {
        self.num_sets() * self.associativity * self.block_bytes()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            set_index_bits: defaults::SET_INDEX_BITS,
            associativity: defaults::ASSOCIATIVITY,
            block_offset_bits: defaults::BLOCK_OFFSET_BITS,
        }
    }
}

/// Cache geometry as given by one source, every field optional.
///
/// The CLI builds one from its flags and one from the config file's `cache` section;
/// `or` layers them and `resolve` requires all three parameters to be present.
///
/// # Examples
///
/// ```
/// use mesisim_core::config::GeometryArgs;
///
/// let file = GeometryArgs::from_json(r#"{ "cache": { "set_index_bits": 4, "associativity": 2 } }"#).unwrap();
/// let flags = GeometryArgs { block_offset_bits: Some(5), ..GeometryArgs::default() };
///
/// let cache = flags.or(file).resolve().unwrap();
/// assert_eq!(cache.num_sets(), 16);
/// assert_eq!(cache.block_bytes(), 32);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct GeometryArgs {
    /// Set-index bits (`s`)
    #[serde(default)]
    pub set_index_bits: Option<u32>,
    /// Lines per set (`E`)
    #[serde(default)]
    pub associativity: Option<usize>,
    /// Block-offset bits (`b`)
    #[serde(default)]
    pub block_offset_bits: Option<u32>,
}

impl GeometryArgs {
    /// Reads the fields present in the `cache` section of a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if the text is not valid JSON or a field has the
    /// wrong type.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct Document {
            #[serde(default)]
            cache: GeometryArgs,
        }
        serde_json::from_str::<Document>(text)
            .map(|doc| doc.cache)
            .map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// Takes each field from `self`, falling back to `fallback` where it is absent.
    #[must_use]
    pub const fn or(self, fallback: Self) -> Self {
        Self {
            set_index_bits: match self.set_index_bits {
                Some(s) => Some(s),
                None => fallback.set_index_bits,
            },
            associativity: match self.associativity {
                Some(e) => Some(e),
                None => fallback.associativity,
            },
            block_offset_bits: match self.block_offset_bits {
                Some(b) => Some(b),
                None => fallback.block_offset_bits,
            },
        }
    }

    /// Builds the geometry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingGeometry` naming the first absent parameter.
    pub const fn resolve(self) -> Result<CacheConfig, ConfigError> {
        let Some(set_index_bits) = self.set_index_bits else {
            return Err(ConfigError::MissingGeometry("set_index_bits (-s)"));
        };
        let Some(associativity) = self.associativity else {
            return Err(ConfigError::MissingGeometry("associativity (-E)"));
        };
        let Some(block_offset_bits) = self.block_offset_bits else {
            return Err(ConfigError::MissingGeometry("block_offset_bits (-b)"));
        };
        Ok(CacheConfig {
            set_index_bits,
            associativity,
            block_offset_bits,
        })
    }
}

/// Bus and memory timing policy.
///
/// All service times the bus charges are derived from these four values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Cycles to fetch a block from backing memory
    #[serde(default = "TimingConfig::default_memory_latency")]
    pub memory_latency: u64,

    /// Cycles to write a dirty block back (snoop flush or dirty eviction)
    #[serde(default = "TimingConfig::default_writeback_latency")]
    pub writeback_latency: u64,

    /// Bus word width in bytes
    #[serde(default = "TimingConfig::default_word_bytes")]
    pub word_bytes: usize,

    /// Cycles per word for a cache-to-cache transfer
    #[serde(default = "TimingConfig::default_word_transfer_cycles")]
    pub word_transfer_cycles: u64,
}

impl TimingConfig {
    /// Returns the default memory latency.
    const fn default_memory_latency() -> u64 {
        defaults::MEMORY_LATENCY
    }

    /// Returns the default write-back latency.
    const fn default_writeback_latency() -> u64 {
        defaults::WRITEBACK_LATENCY
    }

    /// Returns the default bus word width.
    const fn default_word_bytes() -> usize {
        defaults::WORD_BYTES
    }

    /// Returns the default per-word transfer time.
    const fn default_word_transfer_cycles() -> u64 {
        defaults::WORD_TRANSFER_CYCLES
    }

    /// Cycles to move one block between caches: `word_transfer_cycles * (block / word)`.
    pub fn transfer_cycles(&self, block_bytes: usize) -> u64 {
        let words = block_bytes.checked_div(self.word_bytes).unwrap_or(0);
        self.word_transfer_cycles * words as u64
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            memory_latency: defaults::MEMORY_LATENCY,
            writeback_latency: defaults::WRITEBACK_LATENCY,
            word_bytes: defaults::WORD_BYTES,
            word_transfer_cycles: defaults::WORD_TRANSFER_CYCLES,
        }
    }
}
