//! HTTP access for listing pages and IPC tables

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::FetchError;

/// Source of HTML documents. `Sync` so year tables can be fetched from
/// several threads against one client.
pub trait Fetch: Sync {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking reqwest client with an optional on-disk response cache
pub struct HttpClient {
    client: reqwest::blocking::Client,
    cache_dir: Option<PathBuf>,
}

impl HttpClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            cache_dir: config.cache_dir.clone(),
        })
    }

    fn fetch_live(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }
}

impl Fetch for HttpClient {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let Some(cache_dir) = &self.cache_dir else {
            tracing::debug!(url, "GET");
            return self.fetch_live(url);
        };

        let cache_path = cache_path(cache_dir, url);
        if cache_path.exists() {
            tracing::debug!(url, path = %cache_path.display(), "cache hit");
            return fs::read_to_string(&cache_path).map_err(|source| FetchError::Cache {
                url: url.to_string(),
                source,
            });
        }

        tracing::debug!(url, "GET");
        let text = self.fetch_live(url)?;

        let write = || -> std::io::Result<()> {
            if let Some(parent) = cache_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&cache_path, &text)
        };
        write().map_err(|source| FetchError::Cache {
            url: url.to_string(),
            source,
        })?;

        Ok(text)
    }
}

/// Cache location for a URL: `host/path/query.html`. Listing pages and year
/// tables differ only in their query string, so it is kept in the file name.
fn cache_path(cache_dir: &Path, url: &str) -> PathBuf {
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };

    let mut out = cache_dir.to_path_buf();
    for segment in path.split('/').filter(|s| !s.is_empty() && *s != "..") {
        out.push(segment);
    }

    let file = match query {
        Some(q) if !q.is_empty() => {
            let safe: String = q
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '=') {
                        c
                    } else {
                        '_'
                    }
                })
                .collect();
            format!("{}.html", safe)
        }
        _ => "index.html".to_string(),
    };
    out.push(file);
    out
}

/// In-memory pages keyed by URL; any other URL fails like a dead link
#[cfg(test)]
#[derive(Default)]
pub struct CannedPages(std::collections::HashMap<String, String>);

#[cfg(test)]
impl CannedPages {
    pub fn with(mut self, url: &str, html: impl Into<String>) -> Self {
        self.0.insert(url.to_string(), html.into());
        self
    }
}

#[cfg(test)]
impl Fetch for CannedPages {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.0
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}
