use std::io::{Cursor, Read};
use std::time::Duration;

use chrono::{Days, Local, NaiveDate};
use thiserror::Error;

use crate::position::{read_positions, NetShortPosition, RowLayout};
use crate::source::{Document, DocumentFormat, SourceOptions};

/// Daily register file published by Finansinspektionen. `{date}` is replaced by `YYYY-MM-DD`.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://www.fi.se/contentassets/71a61417bb4c49c0a4a3a2582ea8af6c/korta_positioner_{date}.xlsx";

pub const DEFAULT_MAX_PREVIOUS_DAYS: u32 = 30;

/// Upper bound on a downloaded register document.
pub const MAX_DOCUMENT_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<ureq::Transport>,
    },
    #[error("{url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read response from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("response from {url} exceeds {max} bytes")]
    TooLarge { url: String, max: u64 },
}

/// Retrieves register documents.
pub trait Fetcher {
    /// The document at `url`, or `Ok(None)` if nothing is published there.
    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        (**self).fetch(url)
    }
}

/// [`Fetcher`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        // The response body is inflated by ureq when the server honours the gzip request.
        let response = match self.agent.get(url).set("Accept-Encoding", "gzip").call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => return Ok(None),
            Err(ureq::Error::Status(status, _)) => {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                })
            }
            Err(ureq::Error::Transport(source)) => {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    source: Box::new(source),
                })
            }
        };

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_DOCUMENT_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|source| FetchError::Body {
                url: url.to_string(),
                source,
            })?;
        if bytes.len() as u64 > MAX_DOCUMENT_BYTES {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                max: MAX_DOCUMENT_BYTES,
            });
        }
        Ok(Some(bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterConfig {
    /// Document URL with a `{date}` placeholder.
    pub url_template: String,
    pub timeout: Duration,
    /// Container format; `None` derives it from the template's extension.
    pub format: Option<DocumentFormat>,
    pub max_previous_days: u32,
    pub source: SourceOptions,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            timeout: Duration::from_secs(30),
            format: None,
            max_previous_days: DEFAULT_MAX_PREVIOUS_DAYS,
            source: SourceOptions::default(),
        }
    }
}

impl RegisterConfig {
    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_format(mut self, format: DocumentFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_max_previous_days(mut self, days: u32) -> Self {
        self.max_previous_days = days;
        self
    }

    pub fn with_source(mut self, source: SourceOptions) -> Self {
        self.source = source;
        self
    }

    pub fn url_for(&self, date: NaiveDate) -> String {
        self.url_template
            .replace("{date}", &date.format("%Y-%m-%d").to_string())
    }

    /// Explicit format, else the template's extension, else XLSX.
    pub fn document_format(&self) -> DocumentFormat {
        self.format
            .or_else(|| DocumentFormat::from_path(&self.url_template))
            .unwrap_or(DocumentFormat::Xlsx)
    }
}

/// Searches the published register by date.
#[derive(Debug, Clone)]
pub struct Register<F = HttpFetcher> {
    fetcher: F,
    config: RegisterConfig,
}

impl Register<HttpFetcher> {
    pub fn new(config: RegisterConfig) -> Self {
        let fetcher = HttpFetcher::new(config.timeout);
        Self { fetcher, config }
    }
}

impl Default for Register<HttpFetcher> {
    fn default() -> Self {
        Self::new(RegisterConfig::default())
    }
}

impl<F: Fetcher> Register<F> {
    pub fn with_fetcher(fetcher: F, config: RegisterConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &RegisterConfig {
        &self.config
    }

    /// Positions from the register published on `date`, or on the closest earlier day within
    /// `max_previous_days`. Empty when no document is found in that window.
    pub fn search(&self, date: NaiveDate, max_previous_days: u32) -> Vec<NetShortPosition> {
        for back in 0..=u64::from(max_previous_days) {
            let Some(day) = date.checked_sub_days(Days::new(back)) else {
                break;
            };
            if let Some(positions) = self.try_date(day) {
                return positions;
            }
        }
        log::info!(
            "no register published between {} and {date}",
            date.checked_sub_days(Days::new(max_previous_days.into()))
                .unwrap_or(NaiveDate::MIN)
        );
        Vec::new()
    }

    /// [`Register::search`] from today (local clock) using the configured window.
    pub fn search_latest(&self) -> Vec<NetShortPosition> {
        self.search(Local::now().date_naive(), self.config.max_previous_days)
    }

    fn try_date(&self, day: NaiveDate) -> Option<Vec<NetShortPosition>> {
        let url = self.config.url_for(day);
        let bytes = match self.fetcher.fetch(&url) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::debug!("nothing published at {url}");
                return None;
            }
            Err(err) => {
                log::debug!("{err}");
                return None;
            }
        };

        let format = self.config.document_format();
        let mut document =
            match Document::open(format, Cursor::new(bytes), self.config.source.clone()) {
                Ok(document) => document,
                Err(err) => {
                    log::debug!("failed to open {url}: {err}");
                    return None;
                }
            };
        let rows = match document.try_row_source() {
            Ok(rows) => rows,
            Err(err) => {
                log::debug!("no register sheet in {url}: {err}");
                return None;
            }
        };
        let positions = read_positions(rows, RowLayout::from(format));
        log::info!("read {} positions from {url}", positions.len());
        Some(positions)
    }
}
