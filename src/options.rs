use crate::cursor::bound::BoundSide;
use crate::{Error, Result};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use slog::{o, Drain, Level, LevelFilter, Logger};
use std::str::FromStr;

/// Entries a page holds before it splits.
pub const DEFAULT_PAGE_CAPACITY: usize = 64;

/// How evicted page images are compressed. The tag is stored in every image
/// trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum CompressionType {
    NoCompression = 0,
    SnappyCompression = 1,
}

impl CompressionType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        FromPrimitive::from_u8(tag)
    }
}

/// Options for opening a `Table`.
#[derive(Clone)]
pub struct TableOptions {
    /// Key format string, e.g. `"S"`, `"q"`, `"r"`, `"8s"`, `"iS"`.
    pub key_format: String,
    pub page_capacity: usize,
    pub compression: CompressionType,
    /// Verify page image checksums when an evicted page is reloaded.
    pub verify_checksums: bool,
    /// Falls back to an async terminal logger at `Info` when unset.
    pub logger: Option<Logger>,
}

impl TableOptions {
    pub fn new(key_format: impl Into<String>) -> Self {
        Self {
            key_format: key_format.into(),
            page_capacity: DEFAULT_PAGE_CAPACITY,
            compression: CompressionType::SnappyCompression,
            verify_checksums: true,
            logger: None,
        }
    }

    pub(crate) fn logger(&self) -> Logger {
        self.logger.clone().unwrap_or_else(default_logger)
    }
}

fn default_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = LevelFilter::new(drain, Level::Info).fuse();
    Logger::root(drain, o!())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxnOptions {
    /// Treat other transactions' prepared updates as absent instead of
    /// failing the read.
    pub ignore_prepare: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorOptions {
    /// `search_near` only lands on keys starting with the searched key.
    /// Applies to single-field `S` and `u` formats.
    pub prefix_search: bool,
    /// Evict the page holding each returned key once the call finishes.
    pub release_evict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundAction {
    Set,
    Clear,
}

/// One `Cursor::bound` call: `bound=lower|upper`, `action=set|clear`,
/// `inclusive=true|false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundConfig {
    /// Required to set. Clearing with no side clears both.
    pub bound: Option<BoundSide>,
    pub action: BoundAction,
    pub inclusive: bool,
}

impl Default for BoundConfig {
    fn default() -> Self {
        Self {
            bound: None,
            action: BoundAction::Set,
            inclusive: true,
        }
    }
}

impl BoundConfig {
    pub fn set(side: BoundSide, inclusive: bool) -> Self {
        Self {
            bound: Some(side),
            action: BoundAction::Set,
            inclusive,
        }
    }

    pub fn clear(side: Option<BoundSide>) -> Self {
        Self {
            bound: side,
            action: BoundAction::Clear,
            inclusive: true,
        }
    }
}

impl FromStr for BoundConfig {
    type Err = Error;

    /// Parses `key=value` pairs separated by commas. A bare `inclusive` means
    /// `inclusive=true`.
    fn from_str(s: &str) -> Result<Self> {
        let mut config = Self::default();
        for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let (key, value) = match item.find('=') {
                Some(i) => (item[..i].trim(), item[i + 1..].trim()),
                None => (item, "true"),
            };
            match key {
                "bound" => {
                    config.bound = Some(match value {
                        "lower" => BoundSide::Lower,
                        "upper" => BoundSide::Upper,
                        other => return Err(bad_value(key, other)),
                    })
                }
                "action" => {
                    config.action = match value {
                        "set" => BoundAction::Set,
                        "clear" => BoundAction::Clear,
                        other => return Err(bad_value(key, other)),
                    }
                }
                "inclusive" => {
                    config.inclusive = match value {
                        "true" | "1" => true,
                        "false" | "0" => false,
                        other => return Err(bad_value(key, other)),
                    }
                }
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "unknown bound configuration key '{}'",
                        other
                    )))
                }
            }
        }
        if config.action == BoundAction::Set && config.bound.is_none() {
            return Err(Error::InvalidArgument(
                "setting a bound requires bound=lower or bound=upper".to_owned(),
            ));
        }
        Ok(config)
    }
}

fn bad_value(key: &str, value: &str) -> Error {
    Error::InvalidArgument(format!("invalid value '{}' for '{}'", value, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bound_config() {
        let tests = vec![
            ("bound=lower", BoundConfig::set(BoundSide::Lower, true)),
            (
                "bound=upper,inclusive=false",
                BoundConfig::set(BoundSide::Upper, false),
            ),
            (
                " action = set , bound = upper , inclusive ",
                BoundConfig::set(BoundSide::Upper, true),
            ),
            ("action=clear", BoundConfig::clear(None)),
            (
                "action=clear,bound=lower",
                BoundConfig::clear(Some(BoundSide::Lower)),
            ),
        ];
        for (s, expected) in tests {
            assert_eq!(expected, s.parse::<BoundConfig>().unwrap(), "{}", s);
        }
    }

    #[test]
    fn test_parse_bound_config_errors() {
        for s in vec![
            "",
            "inclusive=false",
            "bound=middle",
            "action=toggle,bound=lower",
            "bound=lower,inclusive=maybe",
            "bound=lower,colour=blue",
        ] {
            match s.parse::<BoundConfig>() {
                Err(Error::InvalidArgument(_)) => {}
                other => panic!("{:?} should be rejected, got {:?}", s, other),
            }
        }
    }

    #[test]
    fn test_compression_tag() {
        assert_eq!(
            Some(CompressionType::NoCompression),
            CompressionType::from_tag(0)
        );
        assert_eq!(
            Some(CompressionType::SnappyCompression),
            CompressionType::from_tag(1)
        );
        assert_eq!(None, CompressionType::from_tag(2));
    }
}
