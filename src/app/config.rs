//! File configuration and its merge with CLI flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use bibfetch_core::cache::DEFAULT_CACHE_EXPIRY;
use bibfetch_core::resolver::HttpSettings;

use crate::cli::Args;

/// `key = value` file configuration for bibfetch defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Contact email for the Crossref polite pool.
    pub mailto: Option<String>,
    /// Whether to use the on-disk response cache.
    pub cache: Option<bool>,
    /// How long cached responses stay valid, in days.
    pub cache_expiry_days: Option<u64>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP whole-request timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(days) = self.cache_expiry_days
            && !(1..=365).contains(&days)
        {
            bail!("Invalid config value for `cache_expiry_days`: {days}. Expected range: 1..=365");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        if let Some(mailto) = &self.mailto
            && !mailto.contains('@')
        {
            bail!("Invalid config value for `mailto`: '{mailto}'. Expected an email address");
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log level used when neither `RUST_LOG` nor a CLI flag decides.
    #[must_use]
    pub fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Effective settings for one run after merging file config and CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub log_level: &'static str,
    pub quiet: bool,
    pub mailto: Option<String>,
    pub use_cache: bool,
    pub cache_expiry: Duration,
    pub http: HttpSettings,
}

impl RunSettings {
    /// CLI flags win over file values, file values over defaults.
    #[must_use]
    pub fn resolve(args: &Args, file: Option<&FileConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();
        let verbosity = file.verbosity.unwrap_or(VerbositySetting::Default);

        let log_level = if args.quiet {
            "error"
        } else {
            match args.verbose {
                0 => verbosity.log_level(),
                1 => "debug",
                _ => "trace",
            }
        };
        let quiet = args.quiet || (args.verbose == 0 && verbosity == VerbositySetting::Quiet);

        let defaults = HttpSettings::default();
        Self {
            log_level,
            quiet,
            mailto: args.mailto.clone().or(file.mailto),
            use_cache: !args.no_cache && file.cache.unwrap_or(true),
            cache_expiry: file
                .cache_expiry_days
                .map_or(DEFAULT_CACHE_EXPIRY, |days| {
                    Duration::from_secs(days * 24 * 60 * 60)
                }),
            http: HttpSettings {
                connect_timeout_secs: file
                    .connect_timeout_secs
                    .unwrap_or(defaults.connect_timeout_secs),
                read_timeout_secs: file
                    .read_timeout_secs
                    .unwrap_or(defaults.read_timeout_secs),
            },
        }
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/bibfetch/config.toml`
/// 2. `$HOME/.config/bibfetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("bibfetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("bibfetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
pub fn load_default_file_config() -> Result<Option<FileConfig>> {
    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    load_file_config(&path).map(Some)
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_no = line_index + 1;

        match key {
            "mailto" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `mailto` value on line {line_no}"))?;
                cfg.mailto = Some(parsed);
            }
            "cache" => {
                let parsed = parse_boolean(value)
                    .with_context(|| format!("Invalid `cache` value on line {line_no}"))?;
                cfg.cache = Some(parsed);
            }
            "cache_expiry_days" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `cache_expiry_days` value on line {line_no}")
                })?;
                cfg.cache_expiry_days = Some(parsed);
            }
            "connect_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `connect_timeout_secs` value on line {line_no}")
                })?;
                cfg.connect_timeout_secs = Some(parsed);
            }
            "read_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `read_timeout_secs` value on line {line_no}")
                })?;
                cfg.read_timeout_secs = Some(parsed);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `verbosity` value on line {line_no}"))?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
