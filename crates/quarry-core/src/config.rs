//! Runtime settings.
//!
//! Settings are fixed at factory build time. They arrive either through the
//! consuming builder methods or through [`RuntimeSettings::from_pairs`],
//! which ingests the property-file shape (string key/value pairs) and keeps
//! accepting superseded key spellings with a deprecation warning.

use crate::cache::CacheMode;
use crate::error::{ConfigError, Error};
use crate::Result;

/// When the session lets go of retained connection resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseMode {
    /// After every statement execution cycle outside a transaction
    AfterStatement,
    /// When the surrounding transaction completes
    #[default]
    AfterTransaction,
    /// Only when the session closes
    OnClose,
}

impl ReleaseMode {
    /// External setting name for this mode.
    pub const fn as_name(self) -> &'static str {
        match self {
            ReleaseMode::AfterStatement => "after_statement",
            ReleaseMode::AfterTransaction => "after_transaction",
            ReleaseMode::OnClose => "on_close",
        }
    }

    /// Parse an external setting name, case-insensitively.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "after_statement" => Ok(ReleaseMode::AfterStatement),
            "after_transaction" => Ok(ReleaseMode::AfterTransaction),
            "on_close" => Ok(ReleaseMode::OnClose),
            other => Err(Error::Config(ConfigError {
                key: None,
                message: format!("unknown release mode '{other}'"),
                source: None,
            })),
        }
    }
}

/// Current settings keys.
pub const KEY_BATCH_SIZE: &str = "quarry.load.batch_size";
pub const KEY_CACHE_MODE: &str = "quarry.cache.default_mode";
pub const KEY_RELEASE_MODE: &str = "quarry.connection.release_mode";
pub const KEY_FETCH_SIZE: &str = "quarry.query.fetch_size";

/// Superseded spellings still accepted by `from_pairs`.
const LEGACY_KEYS: &[(&str, &str)] = &[
    ("quarry.batch_fetch_size", KEY_BATCH_SIZE),
    ("quarry.cache_mode", KEY_CACHE_MODE),
    ("quarry.release_mode", KEY_RELEASE_MODE),
];

/// Immutable runtime configuration for a session factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    default_batch_size: usize,
    default_cache_mode: CacheMode,
    release_mode: ReleaseMode,
    default_fetch_size: Option<u32>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            // 0 = one chunk per multi-load unless the call overrides it
            default_batch_size: 0,
            default_cache_mode: CacheMode::Normal,
            release_mode: ReleaseMode::AfterTransaction,
            default_fetch_size: None,
        }
    }
}

impl RuntimeSettings {
    /// Start from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default multi-load batch size (0 disables chunking).
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.default_batch_size = size;
        self
    }

    /// Set the cache mode sessions start with.
    #[must_use]
    pub fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.default_cache_mode = mode;
        self
    }

    /// Set the connection release mode.
    #[must_use]
    pub fn release_mode(mut self, mode: ReleaseMode) -> Self {
        self.release_mode = mode;
        self
    }

    /// Set the default statement fetch size hint.
    #[must_use]
    pub fn fetch_size(mut self, rows: u32) -> Self {
        self.default_fetch_size = Some(rows);
        self
    }

    /// Default multi-load batch size (0 = unchunked).
    pub const fn default_batch_size(&self) -> usize {
        self.default_batch_size
    }

    /// Cache mode sessions start with.
    pub const fn default_cache_mode(&self) -> CacheMode {
        self.default_cache_mode
    }

    /// Connection release mode.
    pub const fn connection_release_mode(&self) -> ReleaseMode {
        self.release_mode
    }

    /// Default statement fetch size hint.
    pub const fn default_fetch_size(&self) -> Option<u32> {
        self.default_fetch_size
    }

    /// Ingest string key/value pairs on top of the defaults.
    ///
    /// Unknown keys are skipped with a warning; legacy spellings configure
    /// the same field as their current replacements and warn once per
    /// occurrence; malformed values are errors naming the offending key.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (key, value) in pairs {
            let raw_key = key.as_ref();
            let value = value.as_ref();

            let current_key = match LEGACY_KEYS.iter().find(|(old, _)| *old == raw_key) {
                Some((old, replacement)) => {
                    tracing::warn!(
                        key = *old,
                        replacement = *replacement,
                        "deprecated settings key; use the replacement spelling"
                    );
                    *replacement
                }
                None => raw_key,
            };

            match current_key {
                KEY_BATCH_SIZE => {
                    settings.default_batch_size = value.parse().map_err(|e| {
                        Error::Config(ConfigError {
                            key: Some(raw_key.to_string()),
                            message: format!("batch size must be a non-negative integer, got '{value}'"),
                            source: Some(Box::new(e)),
                        })
                    })?;
                }
                KEY_CACHE_MODE => {
                    settings.default_cache_mode =
                        CacheMode::from_name(value).map_err(|e| attach_key(e, raw_key))?;
                }
                KEY_RELEASE_MODE => {
                    settings.release_mode =
                        ReleaseMode::from_name(value).map_err(|e| attach_key(e, raw_key))?;
                }
                KEY_FETCH_SIZE => {
                    settings.default_fetch_size = Some(value.parse().map_err(|e| {
                        Error::Config(ConfigError {
                            key: Some(raw_key.to_string()),
                            message: format!("fetch size must be a positive integer, got '{value}'"),
                            source: Some(Box::new(e)),
                        })
                    })?);
                }
                other => {
                    tracing::warn!(key = other, "ignoring unknown settings key");
                }
            }
        }
        Ok(settings)
    }
}

fn attach_key(err: Error, key: &str) -> Error {
    match err {
        Error::Config(mut config) => {
            config.key = Some(key.to_string());
            Error::Config(config)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = RuntimeSettings::default();
        assert_eq!(settings.default_batch_size(), 0);
        assert_eq!(settings.default_cache_mode(), CacheMode::Normal);
        assert_eq!(
            settings.connection_release_mode(),
            ReleaseMode::AfterTransaction
        );
        assert_eq!(settings.default_fetch_size(), None);
    }

    #[test]
    fn builder_chain() {
        let settings = RuntimeSettings::new()
            .batch_size(32)
            .cache_mode(CacheMode::Get)
            .release_mode(ReleaseMode::AfterStatement)
            .fetch_size(100);
        assert_eq!(settings.default_batch_size(), 32);
        assert_eq!(settings.default_cache_mode(), CacheMode::Get);
        assert_eq!(
            settings.connection_release_mode(),
            ReleaseMode::AfterStatement
        );
        assert_eq!(settings.default_fetch_size(), Some(100));
    }

    #[test]
    fn from_pairs_current_keys() {
        let settings = RuntimeSettings::from_pairs([
            (KEY_BATCH_SIZE, "8"),
            (KEY_CACHE_MODE, "ignore"),
            (KEY_RELEASE_MODE, "after_statement"),
            (KEY_FETCH_SIZE, "50"),
        ])
        .unwrap();
        assert_eq!(settings.default_batch_size(), 8);
        assert_eq!(settings.default_cache_mode(), CacheMode::Ignore);
        assert_eq!(
            settings.connection_release_mode(),
            ReleaseMode::AfterStatement
        );
        assert_eq!(settings.default_fetch_size(), Some(50));
    }

    #[test]
    fn from_pairs_legacy_keys_configure_same_fields() {
        let current = RuntimeSettings::from_pairs([
            (KEY_BATCH_SIZE, "8"),
            (KEY_CACHE_MODE, "get"),
            (KEY_RELEASE_MODE, "on_close"),
        ])
        .unwrap();
        let legacy = RuntimeSettings::from_pairs([
            ("quarry.batch_fetch_size", "8"),
            ("quarry.cache_mode", "get"),
            ("quarry.release_mode", "on_close"),
        ])
        .unwrap();
        assert_eq!(current, legacy);
    }

    #[test]
    fn from_pairs_skips_unknown_keys() {
        let settings =
            RuntimeSettings::from_pairs([("quarry.no_such_key", "1"), (KEY_BATCH_SIZE, "4")])
                .unwrap();
        assert_eq!(settings.default_batch_size(), 4);
    }

    #[test]
    fn from_pairs_rejects_malformed_values() {
        let err = RuntimeSettings::from_pairs([(KEY_BATCH_SIZE, "lots")]).unwrap_err();
        assert!(err.to_string().contains(KEY_BATCH_SIZE));

        let err = RuntimeSettings::from_pairs([(KEY_CACHE_MODE, "sometimes")]).unwrap_err();
        match err {
            Error::Config(config) => {
                assert_eq!(config.key.as_deref(), Some(KEY_CACHE_MODE));
            }
            other => panic!("expected config error, got {other}"),
        }
    }
}
