//! Paged access to `GET /reports`.

use crate::config::ApiConfig;
use crate::error::{ReportError, Result};
use crate::models::ReportRecord;
use crate::source::parse_records;
use futures::stream::{self, Stream, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

/// Largest page the backend accepts.
pub(crate) const MAX_PAGE_SIZE: usize = 10_000;

/// Client for the kiosk dashboard API.
pub struct ReportsClient {
    config: ApiConfig,
    http_client: reqwest::Client,
}

struct PageCursor {
    offset: usize,
    done: bool,
}

impl ReportsClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ReportError::Transport {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn page_size(&self) -> usize {
        self.config.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Pages of records, fetched one after another.
    ///
    /// Stops after a short page or once `max_records` have been requested.
    pub fn pages(&self) -> impl Stream<Item = Result<Vec<ReportRecord>>> + '_ {
        let page_size = self.page_size();
        let max_records = self.config.max_records;
        let start = PageCursor {
            offset: 0,
            done: false,
        };

        stream::try_unfold(start, move |cursor| async move {
            if cursor.done || cursor.offset >= max_records {
                return Ok(None);
            }

            let limit = page_size.min(max_records - cursor.offset);
            let page = self.fetch_page(limit, cursor.offset).await?;
            let next = PageCursor {
                offset: cursor.offset + page.len(),
                done: page.len() < limit,
            };
            Ok::<_, ReportError>(Some((page, next)))
        })
    }

    /// Fetch every record up to `max_records`.
    pub async fn fetch_all(&self, show_progress: bool) -> Result<Vec<ReportRecord>> {
        let progress = show_progress.then(spinner);
        let mut records = Vec::new();
        let mut pages = std::pin::pin!(self.pages());

        loop {
            match pages.try_next().await {
                Ok(Some(page)) => {
                    records.extend(page);
                    if let Some(pb) = &progress {
                        pb.set_message(format!("Fetched {} records", records.len()));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    if let Some(pb) = &progress {
                        pb.abandon_with_message("Fetch failed");
                    }
                    return Err(e);
                }
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message(format!("Fetched {} records", records.len()));
        }
        info!("Fetched {} records from {}", records.len(), self.base_url());
        Ok(records)
    }

    async fn fetch_page(&self, limit: usize, offset: usize) -> Result<Vec<ReportRecord>> {
        let url = format!("{}/reports", self.base_url());
        debug!("GET {} limit={} offset={}", url, limit, offset);

        let response = self
            .get(&url)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = check_status(response).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        parse_records(serde_json::from_slice(&body)?)
    }

    /// GET with the bearer token attached when one is configured.
    pub(crate) fn get(&self, url: &str) -> RequestBuilder {
        let request = self.http_client.get(url);
        match self.config.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub(crate) fn transport_error(&self, err: reqwest::Error) -> ReportError {
        ReportError::from_transport(err, self.base_url(), self.config.timeout_seconds)
    }
}

/// Turn 401 and other failures into typed errors, keeping the body text.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ReportError::Unauthorized);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ReportError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Fetching records...");
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
