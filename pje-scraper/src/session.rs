//! Session orchestration.
//!
//! [`Session`] drives one end-to-end pass through the PJE portal: login,
//! profile selection, search, paginated collection, optional per-case party
//! extraction and export. Whatever happens along the way, [`Session::run`]
//! quits the browser before returning.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::actuator::Actuator;
use crate::collector::{CollectorConfig, PageEndPolicy, PaginatedCollector};
use crate::config::{selectors, Credentials, SearchConfig, DEFAULT_OUTPUT_DIR, LOGIN_URL};
use crate::diagnostics::Diagnostics;
use crate::driver::UiDriver;
use crate::errors::AutomationError;
use crate::export;
use crate::locator::{Locator, ReadyCondition};
use crate::navigation::NavigationContext;
use crate::record::{PartyDetails, ProcessRecord};
use crate::retry::RetryPolicy;
use crate::selector::Selector;

/// Deadline for elements that may legitimately be absent.
const OPTIONAL_ELEMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggingIn,
    ProfileSelection,
    Ready,
    Searching,
    Collecting,
    Exporting,
    Done,
    Failed,
}

/// What to write out after collection.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub json_path: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
    /// Open each case and scrape the party view. Required for CSV output.
    pub with_details: bool,
}

impl Default for ExportPlan {
    fn default() -> Self {
        Self {
            json_path: Some(PathBuf::from(DEFAULT_OUTPUT_DIR).join("processos.json")),
            csv_path: None,
            with_details: false,
        }
    }
}

pub struct Session {
    driver: Arc<dyn UiDriver>,
    nav: NavigationContext,
    actuator: Actuator,
    retry: RetryPolicy,
    diagnostics: Diagnostics,
    credentials: Credentials,
    timeout: Duration,
    state: SessionState,
}

impl Session {
    pub async fn start(
        driver: Arc<dyn UiDriver>,
        credentials: Credentials,
        timeout: Duration,
        diagnostics_dir: impl Into<PathBuf>,
    ) -> Result<Self, AutomationError> {
        let nav = NavigationContext::new(driver.clone()).await?;
        let diagnostics = Diagnostics::new(driver.clone(), diagnostics_dir);
        let actuator = Actuator::new(driver.clone(), timeout).with_diagnostics(diagnostics.clone());
        Ok(Self {
            driver,
            nav,
            actuator,
            retry: RetryPolicy::default(),
            diagnostics,
            credentials,
            timeout,
            state: SessionState::LoggedOut,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn set_state(&mut self, state: SessionState) {
        debug!(from = ?self.state, to = ?state, "session state change");
        self.state = state;
    }

    fn locator(&self, selector: &str) -> Locator {
        Locator::new(self.driver.clone(), Selector::from(selector)).with_timeout(self.timeout)
    }

    /// Open the login page, authenticate inside the SSO frame and wait for
    /// the portal shell to load.
    #[instrument(skip(self))]
    pub async fn login(&mut self) -> Result<(), AutomationError> {
        self.set_state(SessionState::LoggingIn);
        self.driver.goto(LOGIN_URL).await?;
        self.nav
            .enter_frame(&Selector::from(selectors::SSO_FRAME), self.timeout)
            .await?;
        self.actuator
            .type_text(&Selector::from(selectors::USERNAME_FIELD), &self.credentials.user)
            .await?;
        self.actuator
            .type_text(
                &Selector::from(selectors::PASSWORD_FIELD),
                &self.credentials.password,
            )
            .await?;
        self.actuator
            .click(&Selector::from(selectors::LOGIN_BUTTON))
            .await?;
        self.nav.reset_to_root().await?;
        self.skip_token_prompt().await;

        // The shell frame appearing is the portal accepting the login.
        let shell = Selector::from(selectors::NG_FRAME);
        match self.nav.enter_frame(&shell, self.timeout).await {
            Ok(()) => {}
            Err(AutomationError::Timeout(_)) => {
                return Err(AutomationError::Authentication(
                    "portal shell never loaded after login, credentials likely rejected".into(),
                ));
            }
            Err(other) => return Err(other),
        }
        self.nav.reset_to_root().await?;
        self.set_state(SessionState::ProfileSelection);
        info!(user = %self.credentials.user, "logged in");
        Ok(())
    }

    /// Dismiss the optional "proceed without token" interstitial.
    async fn skip_token_prompt(&self) {
        let link = self
            .locator(selectors::SKIP_TOKEN_LINK)
            .wait(ReadyCondition::Clickable, Some(OPTIONAL_ELEMENT_TIMEOUT))
            .await;
        match link {
            Ok(elem) => {
                debug!("token interstitial shown, skipping it");
                if let Err(err) = self
                    .actuator
                    .click_element(&elem, &Selector::from(selectors::SKIP_TOKEN_LINK))
                    .await
                {
                    warn!(%err, "failed to skip token interstitial");
                }
            }
            Err(_) => debug!("no token interstitial"),
        }
    }

    /// Switch to the configured profile, if any.
    #[instrument(skip(self))]
    pub async fn select_profile(&mut self) -> Result<(), AutomationError> {
        let Some(profile) = self.credentials.profile.clone() else {
            self.set_state(SessionState::Ready);
            return Ok(());
        };
        // The profile dropdown lives in the top-level document, not inside
        // the shell frame.
        self.actuator
            .click(&Selector::from(selectors::PROFILE_DROPDOWN))
            .await?;
        let entry = Selector::link_text_contains(&profile);
        match self.actuator.click(&entry).await {
            Ok(()) => {}
            Err(AutomationError::Timeout(_)) => {
                return Err(AutomationError::ProfileNotFound(profile));
            }
            Err(other) => return Err(other),
        }
        self.set_state(SessionState::Ready);
        info!(profile, "profile selected");
        Ok(())
    }

    /// Open the case search screen and submit the configured filters.
    /// Only filters with values are touched on the form.
    #[instrument(skip(self, search))]
    pub async fn search(&mut self, search: &SearchConfig) -> Result<(), AutomationError> {
        self.set_state(SessionState::Searching);
        self.nav
            .enter_frame_path(&[Selector::from(selectors::NG_FRAME)], self.timeout)
            .await?;
        self.actuator
            .click(&Selector::from(selectors::SEARCH_MENU_ICON))
            .await?;
        // The search form frame is nested inside the shell frame; entering it
        // is relative to where we already are.
        self.nav
            .enter_frame(&Selector::from(selectors::SEARCH_FRAME), self.timeout)
            .await?;

        self.actuator
            .type_text(
                &Selector::from(selectors::COURT_UNIT_FIELD),
                search.court_unit(),
            )
            .await?;
        if let Some(case_class) = &search.case_class {
            self.actuator
                .type_text(&Selector::from(selectors::CASE_CLASS_FIELD), case_class)
                .await?;
        }
        if let Some(party_name) = &search.party_name {
            self.actuator
                .type_text(&Selector::from(selectors::PARTY_NAME_FIELD), party_name)
                .await?;
        }
        if let Some(oab) = &search.oab {
            self.actuator
                .type_text(&Selector::from(selectors::OAB_NUMBER_FIELD), &oab.number)
                .await?;
            self.actuator
                .select_value(&Selector::from(selectors::OAB_STATE_SELECT), &oab.state_code)
                .await?;
        }

        let submit = Selector::from(selectors::SEARCH_SUBMIT);
        let actuator = self.actuator.clone();
        self.retry
            .run("submit search", || actuator.click(&submit))
            .await?;
        info!("search submitted");
        Ok(())
    }

    /// Look a tag up on the tag screen and open its case list.
    #[instrument(skip(self))]
    pub async fn search_by_tag(&mut self, tag: &str) -> Result<(), AutomationError> {
        self.set_state(SessionState::Searching);
        self.nav
            .enter_frame_path(&[Selector::from(selectors::NG_FRAME)], self.timeout)
            .await?;
        self.actuator
            .click(&Selector::from(selectors::TAG_MENU))
            .await?;
        self.actuator
            .type_text(&Selector::from(selectors::TAG_SEARCH_INPUT), tag)
            .await?;
        let known = self.nav.snapshot_handles().await?;
        self.actuator
            .click(&Selector::from(selectors::TAG_SEARCH_BUTTON))
            .await?;

        // The search button sometimes pops a stray window. Close it and
        // carry on in the original one.
        let original = self.nav.original_window().clone();
        match self
            .nav
            .switch_to_new_window(&known, OPTIONAL_ELEMENT_TIMEOUT)
            .await
        {
            Ok(stray) => {
                debug!(window = %stray, "closing stray window from the tag search");
                self.nav.close_current_and_return(&original).await?;
                self.nav
                    .enter_frame_path(&[Selector::from(selectors::NG_FRAME)], self.timeout)
                    .await?;
            }
            Err(AutomationError::NoNewWindow(_)) => {}
            Err(other) => return Err(other),
        }

        self.actuator
            .click(&Selector::from(selectors::TAG_RESULT_ENTRY))
            .await?;
        info!(tag, "tag opened");
        Ok(())
    }

    /// Read the process numbers off the tagged card list. The cards are not
    /// paginated, so one visible sweep is the whole result set.
    #[instrument(skip(self))]
    pub async fn collect_tagged_cards(&mut self) -> Result<Vec<ProcessRecord>, AutomationError> {
        self.set_state(SessionState::Collecting);
        self.nav
            .enter_frame_path(&[Selector::from(selectors::NG_FRAME)], self.timeout)
            .await?;
        let cards = self.locator(selectors::TAG_CARD_NUMBER).all_visible(None).await?;
        let mut seen: HashSet<ProcessRecord> = HashSet::new();
        let mut records = Vec::new();
        for card in cards {
            let text = card.text().await?;
            let record = ProcessRecord::parse(&text);
            if seen.insert(record.clone()) {
                records.push(record);
            }
        }
        info!(count = records.len(), "tagged cards collected");
        Ok(records)
    }

    /// Walk the results pages and return the deduplicated process numbers.
    #[instrument(skip(self))]
    pub async fn collect(
        &mut self,
        policy: PageEndPolicy,
    ) -> Result<Vec<ProcessRecord>, AutomationError> {
        self.set_state(SessionState::Collecting);
        let config = CollectorConfig {
            row_selector: Selector::from(selectors::RESULT_ROW_LINK),
            row_attribute: Some("title".to_string()),
            table_body: Selector::from(selectors::RESULTS_TABLE_BODY),
            next_button: Selector::from(selectors::NEXT_PAGE_BUTTON),
            busy_overlay: Some(Selector::from(selectors::BUSY_OVERLAY)),
            results_label: Selector::from(selectors::RESULTS_LABEL),
            policy,
            settle_delay: Duration::from_millis(500),
        };
        let collector = PaginatedCollector::new(
            self.driver.clone(),
            self.actuator.clone(),
            config,
            self.timeout,
        );
        collector.collect().await
    }

    fn card_link(index: usize) -> Selector {
        Selector::xpath(format!(
            "(//processo-datalist-card)[{index}]//a/div/span[2]"
        ))
    }

    async fn read_optional_field(&self, selector: &str) -> Option<String> {
        let elem = self
            .locator(selector)
            .wait(ReadyCondition::Present, Some(OPTIONAL_ELEMENT_TIMEOUT))
            .await
            .ok()?;
        elem.text().await.ok().filter(|t| !t.trim().is_empty())
    }

    /// Open each case in its detail window and scrape the party view.
    /// A case that fails to open is logged, screenshotted and skipped.
    #[instrument(skip(self, records))]
    pub async fn collect_party_details(
        &mut self,
        records: &[ProcessRecord],
    ) -> Result<Vec<PartyDetails>, AutomationError> {
        let mut details = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            match self.party_details_for(i + 1, record).await {
                Ok(d) => details.push(d),
                Err(err) => {
                    warn!(process = %record, %err, "skipping case after detail failure");
                    self.diagnostics.capture("party_details").await;
                    // Make sure the next iteration starts from the original
                    // window even when the failure left us elsewhere.
                    let original = self.nav.original_window().clone();
                    if let Err(err) = self.nav.switch_to(&original).await {
                        error!(%err, "could not return to original window");
                        return Err(err);
                    }
                }
            }
        }
        Ok(details)
    }

    async fn party_details_for(
        &mut self,
        index: usize,
        record: &ProcessRecord,
    ) -> Result<PartyDetails, AutomationError> {
        let original = self.nav.original_window().clone();
        // The card list lives inside the shell frame, and each detour drops
        // the frame context, so it is re-entered for every record.
        self.nav
            .enter_frame_path(&[Selector::from(selectors::NG_FRAME)], self.timeout)
            .await?;
        let known = self.nav.snapshot_handles().await?;
        self.actuator.click(&Self::card_link(index)).await?;
        let process_window = self.nav.switch_to_new_window(&known, self.timeout).await?;

        // The party view opens from the case menu in a second window.
        self.actuator
            .click(&Selector::from(selectors::PROCESS_NAVBAR_MENU))
            .await?;
        let known = self.nav.snapshot_handles().await?;
        self.actuator
            .click(&Selector::from(selectors::PARTY_DATA_LINK))
            .await?;
        self.nav.switch_to_new_window(&known, self.timeout).await?;

        // The person fields sit inside an iframe when the legacy view serves
        // the page. Missing frame just means the fields are at the root.
        if let Err(err) = self
            .nav
            .enter_frame(
                &Selector::from(selectors::PARTY_DATA_FRAME),
                OPTIONAL_ELEMENT_TIMEOUT,
            )
            .await
        {
            debug!(%err, "party view rendered without its iframe");
        }

        let mut d = PartyDetails::empty(record.clone());
        d.cpf = self.read_optional_field(selectors::PARTY_CPF).await;
        d.civil_name = self.read_optional_field(selectors::PARTY_CIVIL_NAME).await;
        d.birth_date = self.read_optional_field(selectors::PARTY_BIRTH_DATE).await;
        d.father = self.read_optional_field(selectors::PARTY_FATHER).await;
        d.mother = self.read_optional_field(selectors::PARTY_MOTHER).await;

        self.nav.close_current_and_return(&process_window).await?;
        self.nav.close_current_and_return(&original).await?;
        debug!(process = %record, "party details collected");
        Ok(d)
    }

    /// Full pipeline: login, profile, search, collect, export. The browser
    /// is quit on every exit path, success or not.
    pub async fn run(
        &mut self,
        search: &SearchConfig,
        policy: PageEndPolicy,
        plan: &ExportPlan,
    ) -> Result<Vec<ProcessRecord>, AutomationError> {
        let outcome = self.run_inner(search, policy, plan).await;
        if let Err(err) = &outcome {
            error!(%err, state = ?self.state, "session failed");
            self.diagnostics.capture("session").await;
            self.set_state(SessionState::Failed);
        }
        if let Err(err) = self.driver.quit().await {
            warn!(%err, "browser quit failed");
        }
        outcome
    }

    async fn run_inner(
        &mut self,
        search: &SearchConfig,
        policy: PageEndPolicy,
        plan: &ExportPlan,
    ) -> Result<Vec<ProcessRecord>, AutomationError> {
        self.login().await?;
        self.select_profile().await?;
        let records = match &search.tag {
            Some(tag) => {
                self.search_by_tag(tag).await?;
                self.collect_tagged_cards().await?
            }
            None => {
                self.search(search).await?;
                self.collect(policy).await?
            }
        };

        let details = if plan.with_details {
            self.collect_party_details(&records).await.map(Some)
        } else {
            Ok(None)
        };

        // Collection is done; the numbers gathered so far are exported even
        // when the detail pass failed part way through.
        self.set_state(SessionState::Exporting);
        if let Some(path) = &plan.json_path {
            export::save_json(&records, path)?;
        }
        let details = details?;
        if let Some(path) = &plan.csv_path {
            match &details {
                Some(details) => export::save_csv(details, path)?,
                None => warn!("CSV export requested without details, skipping"),
            }
        }
        self.set_state(SessionState::Done);
        Ok(records)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
