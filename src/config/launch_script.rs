//! JVM memory flags in the server launch script.
//!
//! The launch script is treated as opaque text. The first `-Xms<N><unit>`
//! and `-Xmx<N><unit>` occurrences are located by pattern and rewritten in
//! place; everything else in the file is preserved byte for byte.

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// Maximum heap assumed when the launch script is missing or unreadable.
pub const DEFAULT_MAX_RAM_MB: u64 = 4096;

/// Unit suffix of a JVM memory flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryUnit {
    /// Megabytes (`M`)
    Megabytes,
    /// Gigabytes (`G`)
    Gigabytes,
}

/// A memory amount as written in a `-Xms`/`-Xmx` flag, e.g. `4G`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySize {
    /// Numeric part
    pub value: u64,
    /// Unit suffix
    pub unit: MemoryUnit,
}

impl MemorySize {
    /// Normalized size in megabytes (`G` × 1024).
    pub fn as_mb(&self) -> u64 {
        match self.unit {
            MemoryUnit::Megabytes => self.value,
            MemoryUnit::Gigabytes => self.value.saturating_mul(1024),
        }
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.unit {
            MemoryUnit::Megabytes => 'M',
            MemoryUnit::Gigabytes => 'G',
        };
        write!(f, "{}{}", self.value, suffix)
    }
}

impl FromStr for MemorySize {
    type Err = Error;

    /// Parses `<N>M` or `<N>G`. The suffix is case-insensitive, `N` must be positive.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || {
            Error::ConfigValidation(format!(
                "Invalid memory size '{}': expected a number followed by M or G (e.g. 2048M, 4G)",
                s
            ))
        };

        let unit = match s.chars().last().map(|c| c.to_ascii_uppercase()) {
            Some('M') => MemoryUnit::Megabytes,
            Some('G') => MemoryUnit::Gigabytes,
            _ => return Err(invalid()),
        };
        let value: u64 = s[..s.len() - 1].parse().map_err(|_| invalid())?;
        if value == 0 {
            return Err(invalid());
        }
        if unit == MemoryUnit::Gigabytes && value.checked_mul(1024).is_none() {
            return Err(Error::ConfigValidation(format!(
                "Memory size '{}' is too large",
                s
            )));
        }

        Ok(Self { value, unit })
    }
}

/// Which of the two heap flags to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryFlag {
    /// Initial heap, `-Xms`
    Min,
    /// Maximum heap, `-Xmx`
    Max,
}

impl MemoryFlag {
    fn prefix(self) -> &'static str {
        match self {
            MemoryFlag::Min => "-Xms",
            MemoryFlag::Max => "-Xmx",
        }
    }

    fn pattern(self) -> &'static Regex {
        static MIN: OnceLock<Regex> = OnceLock::new();
        static MAX: OnceLock<Regex> = OnceLock::new();
        let cell = match self {
            MemoryFlag::Min => &MIN,
            MemoryFlag::Max => &MAX,
        };
        cell.get_or_init(|| {
            Regex::new(&format!(r"{}(\d+)([MG])", self.prefix())).expect("static regex is valid")
        })
    }
}

/// Finds a memory flag in launch script text.
pub fn find_flag(content: &str, flag: MemoryFlag) -> Option<MemorySize> {
    let caps = flag.pattern().captures(content)?;
    let value = caps.get(1)?.as_str().parse().ok()?;
    let unit = match caps.get(2)?.as_str() {
        "G" => MemoryUnit::Gigabytes,
        _ => MemoryUnit::Megabytes,
    };
    Some(MemorySize { value, unit })
}

/// Replaces the first occurrence of a memory flag in launch script text.
///
/// Returns `None` when the flag does not occur.
pub fn replace_flag(content: &str, flag: MemoryFlag, size: MemorySize) -> Option<String> {
    let pattern = flag.pattern();
    if !pattern.is_match(content) {
        return None;
    }
    let replacement = format!("{}{}", flag.prefix(), size);
    Some(pattern.replace(content, regex::NoExpand(&replacement)).into_owned())
}

/// The launch script on disk.
#[derive(Debug, Clone)]
pub struct LaunchScript<'a> {
    path: &'a Path,
}

impl<'a> LaunchScript<'a> {
    /// Wraps the script at `path`.
    pub fn new(path: &'a Path) -> Self {
        Self { path }
    }

    /// Reads a memory flag, `Ok(None)` if the file has no such flag.
    pub fn read_flag(&self, flag: MemoryFlag) -> Result<Option<MemorySize>> {
        let content = std::fs::read_to_string(self.path).map_err(|e| {
            Error::ConfigParse(format!(
                "Failed to read launch script {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(find_flag(&content, flag))
    }

    /// Rewrites a memory flag in place.
    pub fn write_flag(&self, flag: MemoryFlag, size: MemorySize) -> Result<()> {
        let content = std::fs::read_to_string(self.path).map_err(|e| {
            Error::ConfigParse(format!(
                "Failed to read launch script {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let updated = replace_flag(&content, flag, size).ok_or_else(|| {
            Error::ConfigParse(format!(
                "No {} flag found in {}",
                flag.prefix(),
                self.path.display()
            ))
        })?;
        std::fs::write(self.path, updated).map_err(|e| {
            Error::ConfigParse(format!(
                "Failed to write launch script {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::info!(script = %self.path.display(), flag = flag.prefix(), size = %size, "Updated memory flag");
        Ok(())
    }

    /// Maximum heap in MB, falling back to [`DEFAULT_MAX_RAM_MB`].
    pub fn max_ram_mb(&self) -> u64 {
        match self.read_flag(MemoryFlag::Max) {
            Ok(Some(size)) => size.as_mb(),
            Ok(None) => {
                tracing::warn!(script = %self.path.display(), "No -Xmx flag in launch script, using default");
                DEFAULT_MAX_RAM_MB
            }
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to default max RAM");
                DEFAULT_MAX_RAM_MB
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "#!/bin/sh\ncd \"$(dirname \"$0\")\"\njava -Xms1G -Xmx2048M -jar server.jar nogui\n";

    #[test]
    fn test_parse_memory_size() {
        let size: MemorySize = "4G".parse().unwrap();
        assert_eq!(size.as_mb(), 4096);
        assert_eq!(size.to_string(), "4G");

        let size: MemorySize = "512m".parse().unwrap();
        assert_eq!(size.unit, MemoryUnit::Megabytes);
        assert_eq!(size.as_mb(), 512);

        assert!("4".parse::<MemorySize>().is_err());
        assert!("G".parse::<MemorySize>().is_err());
        assert!("0M".parse::<MemorySize>().is_err());
        assert!("4T".parse::<MemorySize>().is_err());
    }

    #[test]
    fn test_oversized_memory_size_is_rejected() {
        let err = "18014398509481984G".parse::<MemorySize>().unwrap_err();
        assert!(err.to_string().contains("too large"), "{}", err);
        assert!("99999999999999999999M".parse::<MemorySize>().is_err());

        let largest: MemorySize = "18014398509481983G".parse().unwrap();
        assert_eq!(largest.as_mb(), 18014398509481983 * 1024);
    }

    #[test]
    fn test_find_flags() {
        assert_eq!(
            find_flag(SCRIPT, MemoryFlag::Min).map(|s| s.as_mb()),
            Some(1024)
        );
        assert_eq!(
            find_flag(SCRIPT, MemoryFlag::Max).map(|s| s.as_mb()),
            Some(2048)
        );
        assert_eq!(find_flag("java -jar server.jar", MemoryFlag::Max), None);
    }

    #[test]
    fn test_replace_flag_preserves_rest_of_script() {
        let size = "4G".parse().unwrap();
        let updated = replace_flag(SCRIPT, MemoryFlag::Max, size).unwrap();

        assert_eq!(
            updated,
            "#!/bin/sh\ncd \"$(dirname \"$0\")\"\njava -Xms1G -Xmx4G -jar server.jar nogui\n"
        );
        assert!(replace_flag("java -jar server.jar", MemoryFlag::Min, size).is_none());
    }
}
