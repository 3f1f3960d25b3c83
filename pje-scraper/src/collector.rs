//! Paginated result collection.
//!
//! Walks a paginated results table, extracting one process number per row,
//! deduplicating across pages and deciding when to stop according to a
//! [`PageEndPolicy`]. Page transitions are detected by waiting for the old
//! table body to go stale after the next-page click, not by sleeping.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::actuator::Actuator;
use crate::driver::UiDriver;
use crate::errors::AutomationError;
use crate::locator::{wait_for_staleness, Locator, ReadyCondition};
use crate::record::ProcessRecord;
use crate::selector::Selector;

/// Pattern matched against the results summary label, e.g.
/// "132 resultados encontrados".
const RESULTS_LABEL_PATTERN: &str = r"(\d+)\s+resultados encontrados";

/// How the collector decides that the current page is the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEndPolicy {
    /// Stop when a page yields fewer rows than `page_size`.
    CountBased { page_size: usize },
    /// Read the total from the results label up front and visit exactly
    /// `ceil(total / page_size)` pages.
    TotalDerived { page_size: usize },
}

/// Result of collecting one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub records: Vec<ProcessRecord>,
    pub has_next: bool,
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Selector matching one row link per result.
    pub row_selector: Selector,
    /// Attribute of the row element carrying the process number; `None`
    /// reads the element text instead.
    pub row_attribute: Option<String>,
    /// The table body that is replaced on every page transition.
    pub table_body: Selector,
    pub next_button: Selector,
    /// Busy overlay to wait out before paging, if the page has one.
    pub busy_overlay: Option<Selector>,
    /// Label announcing the total result count.
    pub results_label: Selector,
    pub policy: PageEndPolicy,
    /// Grace period after a transition for the new rows to render.
    pub settle_delay: Duration,
}

pub struct PaginatedCollector {
    driver: Arc<dyn UiDriver>,
    actuator: Actuator,
    config: CollectorConfig,
    timeout: Duration,
}

impl PaginatedCollector {
    pub fn new(
        driver: Arc<dyn UiDriver>,
        actuator: Actuator,
        config: CollectorConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            driver,
            actuator,
            config,
            timeout,
        }
    }

    fn locator(&self, selector: &Selector) -> Locator {
        Locator::new(self.driver.clone(), selector.clone()).with_timeout(self.timeout)
    }

    /// How many pages the results label promises, for
    /// [`PageEndPolicy::TotalDerived`]. A missing or unparseable label is
    /// treated as zero results, never as a fatal error.
    async fn expected_pages(&self, page_size: usize) -> Result<usize, AutomationError> {
        let re = Regex::new(RESULTS_LABEL_PATTERN)
            .map_err(|e| AutomationError::InvalidArgument(e.to_string()))?;
        let label = match self
            .locator(&self.config.results_label)
            .wait(ReadyCondition::Visible, None)
            .await
        {
            Ok(elem) => elem.text().await?,
            Err(AutomationError::Timeout(_)) => {
                warn!("results label not found, treating as zero results");
                return Ok(0);
            }
            Err(other) => return Err(other),
        };
        let Some(caps) = re.captures(&label) else {
            warn!(label, "results label did not match expected pattern");
            return Ok(0);
        };
        let total: usize = caps[1]
            .parse()
            .map_err(|_| AutomationError::InvalidArgument(format!("bad result count in '{label}'")))?;
        let pages = total.div_ceil(page_size.max(1));
        info!(total, pages, "derived page count from results label");
        Ok(pages)
    }

    /// Collect the visible page and decide, under the configured policy,
    /// whether another page should follow it.
    async fn page_outcome(
        &self,
        page: usize,
        page_limit: Option<usize>,
    ) -> Result<PageOutcome, AutomationError> {
        let records = self.collect_page().await?;
        let has_next = match (&self.config.policy, page_limit) {
            (PageEndPolicy::TotalDerived { .. }, Some(limit)) => page < limit,
            (PageEndPolicy::TotalDerived { .. }, None) => false,
            (PageEndPolicy::CountBased { page_size }, _) => records.len() >= *page_size,
        };
        Ok(PageOutcome { records, has_next })
    }

    /// Extract the process numbers visible on the current page in row order.
    async fn collect_page(&self) -> Result<Vec<ProcessRecord>, AutomationError> {
        let rows = match self.locator(&self.config.row_selector).all_visible(None).await {
            Ok(rows) => rows,
            Err(AutomationError::Timeout(_)) => {
                warn!("no result rows appeared, treating page as empty");
                return Ok(Vec::new());
            }
            Err(other) => return Err(other),
        };
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw = match &self.config.row_attribute {
                Some(name) => match row.attr(name).await {
                    Ok(Some(value)) => value,
                    Ok(None) => {
                        debug!(attribute = %name, "row missing attribute, skipping");
                        continue;
                    }
                    Err(err) => {
                        warn!(%err, "failed to read row, skipping");
                        continue;
                    }
                },
                None => match row.text().await {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(%err, "failed to read row, skipping");
                        continue;
                    }
                },
            };
            if raw.trim().is_empty() {
                continue;
            }
            records.push(ProcessRecord::parse(&raw));
        }
        Ok(records)
    }

    /// Click the next-page control and wait for the table to be replaced.
    /// Returns `Ok(false)` when no next page exists.
    async fn next_page(&self) -> Result<bool, AutomationError> {
        let old_body = match self
            .locator(&self.config.table_body)
            .wait(ReadyCondition::Present, None)
            .await
        {
            Ok(body) => Some(body),
            Err(AutomationError::Timeout(_)) => None,
            Err(other) => return Err(other),
        };
        if let Some(overlay) = &self.config.busy_overlay {
            if let Err(err) = self.locator(overlay).wait_invisible(None).await {
                warn!(%err, "busy overlay still visible, paging anyway");
            }
        }
        // A missing or dead next button is the normal end of pagination.
        if self.actuator.click(&self.config.next_button).await.is_err() {
            debug!("next-page control not clickable, assuming last page");
            return Ok(false);
        }
        if let Some(body) = old_body {
            if let Err(err) =
                wait_for_staleness(&body, self.timeout, Duration::from_millis(250)).await
            {
                warn!(%err, "table body never went stale after paging");
            }
        }
        tokio::time::sleep(self.config.settle_delay).await;
        Ok(true)
    }

    /// Walk all pages and return the deduplicated process numbers in first
    /// encounter order.
    #[instrument(skip(self))]
    pub async fn collect(&self) -> Result<Vec<ProcessRecord>, AutomationError> {
        self.locator(&self.config.table_body)
            .wait(ReadyCondition::Present, None)
            .await?;

        let page_limit = match self.config.policy {
            PageEndPolicy::CountBased { .. } => None,
            PageEndPolicy::TotalDerived { page_size } => {
                let pages = self.expected_pages(page_size).await?;
                if pages == 0 {
                    return Ok(Vec::new());
                }
                Some(pages)
            }
        };

        let mut seen: HashSet<ProcessRecord> = HashSet::new();
        let mut ordered: Vec<ProcessRecord> = Vec::new();
        let mut page = 0usize;
        loop {
            page += 1;
            let outcome = self.page_outcome(page, page_limit).await?;
            let page_len = outcome.records.len();
            let mut fresh = 0usize;
            for record in outcome.records {
                if seen.insert(record.clone()) {
                    ordered.push(record);
                    fresh += 1;
                }
            }
            debug!(page, rows = page_len, fresh, "collected page");

            if page_len > 0 && fresh == 0 {
                // A page of nothing but repeats means pagination is stuck.
                warn!(page, "page yielded no new records, stopping");
                break;
            }
            if !outcome.has_next {
                break;
            }
            if !self.next_page().await? {
                break;
            }
        }
        info!(total = ordered.len(), pages = page, "collection finished");
        Ok(ordered)
    }
}

impl std::fmt::Debug for PaginatedCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedCollector")
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
