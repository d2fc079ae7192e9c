//! Run configuration, read from an optional CONL file

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "gross-equivalent.conl";

/// IMDb feature films tagged sci-fi with at least 1000 votes, by US box office
pub const LISTING_URL: &str = "https://www.imdb.com/search/title/?title_type=feature&num_votes=1000,&genres=sci-fi&sort=boxoffice_gross_us,desc";

/// US general CPI, monthly variation. Without `anio` it shows the latest year.
pub const IPC_URL: &str =
    "https://datosmacro.expansion.com/ipc-paises/usa?sector=IPC+General&sc=IPC-IG";

pub const FIRST_YEAR: i32 = 1961;
pub const LAST_YEAR: i32 = 2021;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub listing_url: String,
    pub ipc_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Year tables fetched at the same time
    pub parallel_requests: usize,
    pub delimiter: String,
    pub data_dir: PathBuf,
    /// Response cache; responses are always fetched live when unset
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listing_url: LISTING_URL.to_string(),
            ipc_url: IPC_URL.to_string(),
            user_agent: "Mozilla/5.0 (compatible; GrossEquivalentScraper/1.0)".to_string(),
            timeout_secs: 30,
            parallel_requests: 5,
            delimiter: ";".to_string(),
            data_dir: PathBuf::from("data"),
            cache_dir: None,
        }
    }
}

impl Config {
    /// Load `path`, or `gross-equivalent.conl` from the working directory when
    /// no path is given. Only the implicit default file may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(p, true),
            None => Self::load_from(Path::new(DEFAULT_CONFIG_FILE), false),
        }
    }

    /// Read `path`; when not `required`, a missing file yields the defaults
    fn load_from(path: &Path, required: bool) -> Result<Self> {
        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_conl(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_conl(content: &str) -> Result<Self> {
        let config: Config = serde_conl::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be at least 1");
        }
        if self.parallel_requests == 0 {
            bail!("parallel_requests must be at least 1");
        }
        self.delimiter_byte()?;
        Ok(())
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => bail!(
                "delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            ),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Table URL for one year
    pub fn ipc_year_url(&self, year: i32) -> String {
        let sep = if self.ipc_url.contains('?') { '&' } else { '?' };
        format!("{}{}anio={}", self.ipc_url, sep, year)
    }
}
