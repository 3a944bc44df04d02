//! Second-level cache interaction modes.

use crate::error::{ConfigError, Error};
use crate::Result;

/// How a load operation interacts with the second-level cache.
///
/// The two axes are independent: `get` controls whether the cache is
/// consulted before hitting the database, `put` controls whether loaded
/// data is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read from and write to the cache
    #[default]
    Normal,
    /// Bypass the cache entirely
    Ignore,
    /// Read from the cache, never write
    Get,
    /// Write to the cache, never read
    Put,
    /// Write to the cache, never read, refreshing existing entries
    Refresh,
}

impl CacheMode {
    /// Is cache reading enabled in this mode?
    pub const fn is_get_enabled(self) -> bool {
        matches!(self, CacheMode::Normal | CacheMode::Get)
    }

    /// Is cache writing enabled in this mode?
    pub const fn is_put_enabled(self) -> bool {
        matches!(self, CacheMode::Normal | CacheMode::Put | CacheMode::Refresh)
    }

    /// External setting name for this mode.
    pub const fn as_name(self) -> &'static str {
        match self {
            CacheMode::Normal => "normal",
            CacheMode::Ignore => "ignore",
            CacheMode::Get => "get",
            CacheMode::Put => "put",
            CacheMode::Refresh => "refresh",
        }
    }

    /// Parse an external setting name, case-insensitively.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "normal" => Ok(CacheMode::Normal),
            "ignore" => Ok(CacheMode::Ignore),
            "get" => Ok(CacheMode::Get),
            "put" => Ok(CacheMode::Put),
            "refresh" => Ok(CacheMode::Refresh),
            other => Err(Error::Config(ConfigError {
                key: None,
                message: format!("unknown cache mode '{other}'"),
                source: None,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_per_mode() {
        assert!(CacheMode::Normal.is_get_enabled());
        assert!(CacheMode::Normal.is_put_enabled());
        assert!(!CacheMode::Ignore.is_get_enabled());
        assert!(!CacheMode::Ignore.is_put_enabled());
        assert!(CacheMode::Get.is_get_enabled());
        assert!(!CacheMode::Get.is_put_enabled());
        assert!(!CacheMode::Put.is_get_enabled());
        assert!(CacheMode::Put.is_put_enabled());
        assert!(!CacheMode::Refresh.is_get_enabled());
        assert!(CacheMode::Refresh.is_put_enabled());
    }

    #[test]
    fn name_round_trip() {
        for mode in [
            CacheMode::Normal,
            CacheMode::Ignore,
            CacheMode::Get,
            CacheMode::Put,
            CacheMode::Refresh,
        ] {
            assert_eq!(CacheMode::from_name(mode.as_name()).unwrap(), mode);
        }
        assert_eq!(CacheMode::from_name("REFRESH").unwrap(), CacheMode::Refresh);
        assert!(CacheMode::from_name("sometimes").is_err());
    }
}
