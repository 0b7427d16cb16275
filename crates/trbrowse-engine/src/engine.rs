//! The browsing engine: one owner for the active mode's state, the filter
//! criteria, the mode cache and the session synchronizer.
//!
//! Every backend round trip is guarded by a per-slot sequence number taken
//! before the await and checked after it; a response whose ticket is no
//! longer current is discarded, so the newest request always wins.

use std::sync::Arc;

use trbrowse_core::error::{BrowseError, Result};
use trbrowse_core::region::Region;
use trbrowse_core::traits::{DatasetBackend, StateStore};
use trbrowse_core::types::{DatasetRef, FilterCriteria, Mode, PageResult, RegionRecord};

use crate::annotations::annotation_index;
use crate::criteria::{resolve_genotypes, to_query_payload, CriteriaModel, CriteriaPatch, FilterPreset};
use crate::facade::{DatasetQueryFacade, FilterOutcome};
use crate::mode_cache::{CohortState, IndividualState, ModeCache, ModeState, Vocabulary};
use crate::session::{RestorePhase, Session, SessionManager, SessionState};

/// Which record on a freshly applied page becomes the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionHint {
    First,
    Last,
    /// Keep this region selected if the page contains it, else fall back
    /// to the first record.
    Preserve(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Query,
    Load,
    Regions,
}

/// Per-slot monotonic counters. A ticket is current while no newer ticket
/// for its slot has been issued.
#[derive(Debug, Default)]
struct Sequencer {
    query: u64,
    load: u64,
    regions: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    slot: Slot,
    seq: u64,
}

impl Sequencer {
    fn counter(&mut self, slot: Slot) -> &mut u64 {
        match slot {
            Slot::Query => &mut self.query,
            Slot::Load => &mut self.load,
            Slot::Regions => &mut self.regions,
        }
    }

    fn begin(&mut self, slot: Slot) -> Ticket {
        let counter = self.counter(slot);
        *counter += 1;
        Ticket {
            slot,
            seq: *counter,
        }
    }

    fn is_current(&mut self, ticket: &Ticket) -> bool {
        *self.counter(ticket.slot) == ticket.seq
    }
}

/// Decided step of a relative navigation, split from its execution so the
/// borrow of the current page ends before any state mutation.
enum NavStep {
    Stay,
    Select(Option<String>),
    Fetch(usize, SelectionHint),
}

fn pick_selection(records: &[RegionRecord], hint: &SelectionHint) -> Option<String> {
    match hint {
        SelectionHint::First => records.first().map(|r| r.region.clone()),
        SelectionHint::Last => records.last().map(|r| r.region.clone()),
        SelectionHint::Preserve(region) => records
            .iter()
            .find(|r| &r.region == region)
            .or_else(|| records.first())
            .map(|r| r.region.clone()),
    }
}

pub struct BrowseEngine<B: DatasetBackend, S: StateStore> {
    facade: DatasetQueryFacade<B>,
    store: Arc<S>,
    criteria: CriteriaModel<S>,
    sessions: SessionManager<S>,
    cache: ModeCache,
    mode: Mode,
    state: ModeState,
    seq: Sequencer,
}

impl<B: DatasetBackend, S: StateStore> BrowseEngine<B, S> {
    /// Starts in individual mode with the persisted criteria (if any)
    /// already loaded.
    pub fn new(backend: Arc<B>, store: Arc<S>) -> Self {
        let criteria = CriteriaModel::new(Arc::clone(&store));
        let sessions = SessionManager::new(Arc::clone(&store));
        Self {
            facade: DatasetQueryFacade::new(backend),
            store,
            criteria,
            sessions,
            cache: ModeCache::default(),
            mode: Mode::Individual,
            state: ModeState::for_mode(Mode::Individual),
            seq: Sequencer::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    pub fn criteria(&self) -> &FilterCriteria {
        self.criteria.current()
    }

    pub fn restore_phase(&self) -> RestorePhase {
        self.sessions.phase()
    }

    fn individual(&self) -> Result<&IndividualState> {
        self.state
            .as_individual()
            .ok_or_else(|| BrowseError::Query("operation applies to individual mode".to_string()))
    }

    fn individual_mut(&mut self) -> Result<&mut IndividualState> {
        match &mut self.state {
            ModeState::Individual(state) => Ok(state),
            ModeState::Cohort(_) => {
                Err(BrowseError::Query("operation applies to individual mode".to_string()))
            }
        }
    }

    fn cohort_mut(&mut self) -> Result<&mut CohortState> {
        match &mut self.state {
            ModeState::Cohort(state) => Ok(state),
            ModeState::Individual(_) => {
                Err(BrowseError::Query("operation applies to cohort modes".to_string()))
            }
        }
    }

    fn query_context(&self) -> Result<(DatasetRef, Vec<String>, Vec<String>)> {
        let state = self.individual()?;
        let dataset = state
            .dataset
            .clone()
            .ok_or_else(|| BrowseError::Query("no dataset loaded".to_string()))?;
        Ok((
            dataset,
            state.selected_genotypes.clone(),
            state.vocabulary.genotypes.clone(),
        ))
    }

    /// Folds a fetched page into the individual state: vocabulary side
    /// channel first, then counts, then the hint-driven selection.
    fn apply_page(&mut self, page: PageResult, hint: &SelectionHint) -> Result<()> {
        let selection = pick_selection(&page.records, hint);
        let state = self.individual_mut()?;
        if let Some(genotypes) = &page.discovered_genotypes {
            state.vocabulary.genotypes = genotypes.clone();
            if state.selected_genotypes.is_empty() {
                state.selected_genotypes = genotypes.clone();
            }
        }
        if let Some(chromosomes) = &page.discovered_chromosomes {
            state.vocabulary.chromosomes = chromosomes.clone();
        }
        state.total_regions = Some(page.total_regions);
        state.page = page.current_page;
        state.selected_region = selection;
        state.page_result = Some(page);
        Ok(())
    }

    /// Loads a dataset and fetches its first page. Replaces the individual
    /// state wholesale; filters and selection do not survive a reload.
    pub async fn load_dataset(&mut self, dataset: DatasetRef) -> Result<()> {
        self.individual()?;
        let ticket = self.seq.begin(Slot::Load);
        let summary = self.facade.load(&dataset).await?;
        if !self.seq.is_current(&ticket) {
            return Ok(());
        }
        let state = self.individual_mut()?;
        *state = IndividualState {
            dataset: Some(dataset),
            total_regions: summary.total_regions,
            vocabulary: Vocabulary {
                genotypes: summary.genotypes.clone(),
                chromosomes: summary.chromosomes,
            },
            selected_genotypes: summary.genotypes,
            page: 0,
            page_result: None,
            selected_region: None,
        };
        self.refresh_page(0, SelectionHint::First).await
    }

    /// Fetches `page` under the current genotype selection.
    pub async fn refresh_page(&mut self, page: usize, hint: SelectionHint) -> Result<()> {
        let (dataset, selected, vocabulary) = self.query_context()?;
        let ticket = self.seq.begin(Slot::Query);
        let result = self
            .facade
            .query(&dataset, &selected, &vocabulary, page)
            .await?;
        if self.seq.is_current(&ticket) {
            self.apply_page(result, &hint)?;
            self.push_session()?;
        }
        Ok(())
    }

    pub async fn change_page(&mut self, page: usize) -> Result<()> {
        self.refresh_page(page, SelectionHint::First).await
    }

    /// Replaces the genotype selection and returns to the first page.
    /// Names outside the discovered vocabulary are rejected.
    pub async fn select_genotypes(&mut self, genotypes: Vec<String>) -> Result<()> {
        let state = self.individual_mut()?;
        if !state.vocabulary.genotypes.is_empty() {
            if let Some(unknown) = genotypes
                .iter()
                .find(|g| !state.vocabulary.genotypes.contains(g))
            {
                return Err(BrowseError::Query(format!("unknown genotype: {unknown}")));
            }
        }
        state.selected_genotypes = genotypes;
        self.refresh_page(0, SelectionHint::First).await
    }

    pub fn edit_criteria(&mut self, patch: &CriteriaPatch) -> Result<FilterCriteria> {
        self.criteria.edit(patch)
    }

    /// Replaces the criteria and runs them against the loaded dataset.
    pub async fn apply_criteria(&mut self, criteria: FilterCriteria) -> Result<FilterOutcome> {
        self.criteria.replace(criteria)?;
        self.apply_current_criteria().await
    }

    /// Runs the stored criteria: resolves the annotation predicate to a
    /// region list, falls back to the sidebar genotype selection when the
    /// criteria leave genotypes unset, and lands on the first page.
    pub async fn apply_current_criteria(&mut self) -> Result<FilterOutcome> {
        let (dataset, selected, vocabulary) = self.query_context()?;
        let criteria = self.criteria.current().clone();
        let annotated = annotation_index(self.store.as_ref(), &criteria);
        let mut payload = to_query_payload(&criteria, annotated);
        let resolved = resolve_genotypes(&criteria, &selected);
        payload.genotypes = if resolved.is_empty() {
            None
        } else {
            Some(resolved)
        };

        let ticket = self.seq.begin(Slot::Query);
        let result = self
            .facade
            .query_advanced(&dataset, payload, &vocabulary, 0)
            .await?;
        if self.seq.is_current(&ticket) {
            self.apply_page(result.page, &SelectionHint::First)?;
            self.push_session()?;
        }
        Ok(result.outcome)
    }

    /// Press toggles the named quick filter on or off and re-queries.
    /// `None` for an unknown name.
    pub async fn toggle_quick_filter(&mut self, name: &str) -> Result<Option<FilterOutcome>> {
        if self.criteria.toggle_quick(name)?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.apply_current_criteria().await?))
    }

    /// Drops all criteria and returns to an unfiltered first page.
    pub async fn clear_filter(&mut self) -> Result<()> {
        self.criteria.clear()?;
        self.refresh_page(0, SelectionHint::First).await
    }

    pub fn filter_presets(&self) -> Vec<FilterPreset> {
        self.criteria.presets()
    }

    pub fn save_filter_preset(&self, name: &str) -> Result<FilterPreset> {
        self.criteria.save_preset(name)
    }

    pub fn delete_filter_preset(&self, id: &str) -> Result<bool> {
        self.criteria.delete_preset(id)
    }

    /// Loads a preset into the live criteria and applies it.
    pub async fn load_filter_preset(&mut self, id: &str) -> Result<Option<FilterOutcome>> {
        if self.criteria.load_preset(id)?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.apply_current_criteria().await?))
    }

    /// Advances the selection by one record, crossing to the next page at
    /// the boundary. A selection that is no longer on the page (stale
    /// after a filter change) restarts from the first record.
    pub async fn next_region(&mut self) -> Result<()> {
        let step = {
            let state = self.individual()?;
            let Some(page) = &state.page_result else {
                return Ok(());
            };
            let position = state
                .selected_region
                .as_ref()
                .and_then(|sel| page.records.iter().position(|r| &r.region == sel));
            match position {
                None => NavStep::Select(page.records.first().map(|r| r.region.clone())),
                Some(i) if i + 1 < page.records.len() => {
                    NavStep::Select(Some(page.records[i + 1].region.clone()))
                }
                Some(_) if page.current_page + 1 < page.total_pages => {
                    NavStep::Fetch(page.current_page + 1, SelectionHint::First)
                }
                Some(_) => NavStep::Stay,
            }
        };
        self.navigate(step).await
    }

    /// Mirror of [`Self::next_region`]; crossing backwards lands on the
    /// last record of the previous page.
    pub async fn previous_region(&mut self) -> Result<()> {
        let step = {
            let state = self.individual()?;
            let Some(page) = &state.page_result else {
                return Ok(());
            };
            let position = state
                .selected_region
                .as_ref()
                .and_then(|sel| page.records.iter().position(|r| &r.region == sel));
            match position {
                None => NavStep::Select(page.records.last().map(|r| r.region.clone())),
                Some(i) if i > 0 => NavStep::Select(Some(page.records[i - 1].region.clone())),
                Some(_) if page.current_page > 0 => {
                    NavStep::Fetch(page.current_page - 1, SelectionHint::Last)
                }
                Some(_) => NavStep::Stay,
            }
        };
        self.navigate(step).await
    }

    async fn navigate(&mut self, step: NavStep) -> Result<()> {
        match step {
            NavStep::Stay => Ok(()),
            NavStep::Select(selection) => {
                self.individual_mut()?.selected_region = selection;
                self.push_session()
            }
            NavStep::Fetch(page, hint) => self.refresh_page(page, hint).await,
        }
    }

    /// Jumps to the 1-based ordinal within the filtered result set,
    /// landing on its page with the record selected.
    pub async fn jump_to_ordinal(&mut self, ordinal: usize) -> Result<()> {
        let state = self.individual()?;
        let total = state
            .page_result
            .as_ref()
            .map_or(0, |p| p.total_matching);
        if ordinal == 0 || ordinal > total {
            return Err(BrowseError::Range {
                index: ordinal,
                total,
            });
        }
        let (dataset, selected, vocabulary) = self.query_context()?;
        let hit = self
            .facade
            .find_page_for_index(&dataset, ordinal - 1, total, &selected, &vocabulary)
            .await?;
        self.refresh_page(hit.page, SelectionHint::Preserve(hit.region))
            .await
    }

    /// Selects a region by its `chromosome:start-end` text. The selection
    /// is applied optimistically; in individual mode the holding page is
    /// resolved only when the region is not already on the current page,
    /// and a region the active filter excludes keeps the optimistic
    /// selection without navigating.
    pub async fn select_region(&mut self, region_text: &str) -> Result<()> {
        let region = Region::parse(region_text)?;
        let canonical = region.to_string();

        if self.mode.is_cohort() {
            let state = self.cohort_mut()?;
            state.selected_region = Some(canonical.clone());
            state.region_input = canonical;
            return self.push_session();
        }

        let on_current_page = {
            let state = self.individual_mut()?;
            state.selected_region = Some(canonical.clone());
            state
                .page_result
                .as_ref()
                .is_some_and(|p| p.records.iter().any(|r| r.region == canonical))
        };
        if on_current_page {
            return self.push_session();
        }
        if self.individual()?.dataset.is_none() {
            return self.push_session();
        }

        let (dataset, selected, vocabulary) = self.query_context()?;
        match self
            .facade
            .find_page_for_region(&dataset, &canonical, &selected, &vocabulary)
            .await
        {
            Ok(page) => {
                self.refresh_page(page, SelectionHint::Preserve(canonical))
                    .await
            }
            Err(BrowseError::Resolution(reason)) => {
                tracing::debug!(region = %canonical, %reason, "region not in filtered set, keeping selection");
                self.push_session()
            }
            Err(err) => Err(err),
        }
    }

    pub fn set_region_input(&mut self, text: &str) -> Result<()> {
        self.cohort_mut()?.region_input = text.to_string();
        Ok(())
    }

    /// Commits the cohort region input as the selection.
    pub async fn submit_region_input(&mut self) -> Result<()> {
        let text = self.cohort_mut()?.region_input.clone();
        self.select_region(&text).await
    }

    /// Stores the outgoing mode's state and restores the incoming one.
    /// Cached state is reused verbatim; the only fetch a switch may issue
    /// is the candidate-region list of a cohort mode seen for the first
    /// time with a folder already set.
    pub async fn switch_mode(&mut self, mode: Mode) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        self.cache.snapshot(self.mode, &self.state);
        self.mode = mode;
        self.state = self.cache.restore(mode);
        let needs_regions = self
            .state
            .as_cohort()
            .is_some_and(|s| s.folder.is_some() && s.candidate_regions.is_empty());
        if needs_regions {
            self.fetch_candidate_regions().await?;
        }
        self.push_session()
    }

    /// Registers a cohort folder and loads its candidate regions.
    pub async fn load_cohort_folder(&mut self, folder: DatasetRef) -> Result<()> {
        let state = self.cohort_mut()?;
        if state
            .folder
            .as_ref()
            .is_some_and(|f| f.normalized() == folder.normalized())
        {
            return Err(BrowseError::Load(format!(
                "folder already loaded: {folder}"
            )));
        }
        let ticket = self.seq.begin(Slot::Load);
        let summary = self.facade.load_folder(&folder).await?;
        if !self.seq.is_current(&ticket) {
            return Ok(());
        }
        tracing::info!(%folder, files = summary.file_count, "cohort folder loaded");
        let state = self.cohort_mut()?;
        state.folder = Some(folder);
        state.selected_region = None;
        state.region_input.clear();
        state.candidate_regions.clear();
        self.fetch_candidate_regions().await?;
        self.push_session()
    }

    /// Refreshes the cohort candidate-region union. Fetch failures clear
    /// the list and are logged rather than surfaced; the selection is
    /// seeded with the first candidate when nothing is selected yet.
    pub async fn fetch_candidate_regions(&mut self) -> Result<()> {
        let Some(folder) = self.cohort_mut()?.folder.clone() else {
            return Ok(());
        };
        let ticket = self.seq.begin(Slot::Regions);
        let fetched = self.facade.list_folder_regions(&folder).await;
        if !self.seq.is_current(&ticket) {
            return Ok(());
        }
        let state = self.cohort_mut()?;
        match fetched {
            Ok(regions) => {
                if state.selected_region.is_none() {
                    state.selected_region = regions.first().cloned();
                }
                state.candidate_regions = regions;
            }
            Err(err) => {
                tracing::warn!(%folder, %err, "candidate region fetch failed");
                state.candidate_regions.clear();
            }
        }
        self.push_session()
    }

    /// The replayable coordinates of the live state, spanning both mode
    /// shapes via the cache.
    pub fn session_state(&self) -> SessionState {
        let individual = self
            .state
            .as_individual()
            .cloned()
            .or_else(|| self.cache.restore(Mode::Individual).as_individual().cloned());
        let cohort = self.state.as_cohort().cloned().or_else(|| {
            [Mode::CohortRead, Mode::CohortAssembly]
                .into_iter()
                .find_map(|m| {
                    self.cache
                        .restore(m)
                        .as_cohort()
                        .filter(|s| s.folder.is_some())
                        .cloned()
                })
        });
        SessionState {
            dataset: individual.as_ref().and_then(|s| s.dataset.clone()),
            cohort_folder: cohort.as_ref().and_then(|s| s.folder.clone()),
            selected_region: self.state.selected_region().map(ToString::to_string),
            selected_genotypes: individual
                .map(|s| s.selected_genotypes)
                .unwrap_or_default(),
            mode: self.mode,
        }
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.sessions()
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.sessions.current_id()
    }

    pub fn save_session(&mut self, name: &str) -> Result<Session> {
        let state = self.session_state();
        self.sessions.save(name, state)
    }

    pub fn delete_session(&mut self, id: &str) -> Result<bool> {
        self.sessions.delete(id)
    }

    pub fn clear_current_session(&mut self) -> Result<()> {
        self.sessions.clear_current()
    }

    /// Replays a saved session against the live backend. Returns
    /// `Ok(false)` when the session does not exist or another restore is
    /// already in flight. Replay step failures (a dataset that no longer
    /// loads, a region the data no longer holds) are logged and skipped
    /// so the rest of the snapshot still lands.
    pub async fn load_session(&mut self, id: &str) -> Result<bool> {
        let Some(session) = self.sessions.select(id)? else {
            return Ok(false);
        };
        if !self.sessions.begin_restore() {
            return Ok(false);
        }
        let result = self.replay(session.state).await;
        self.sessions.end_restore();
        result?;
        self.push_session()?;
        Ok(true)
    }

    async fn replay(&mut self, saved: SessionState) -> Result<()> {
        self.cache.snapshot(self.mode, &self.state);
        self.mode = saved.mode;
        self.state = ModeState::for_mode(saved.mode);

        if saved.mode.is_cohort() {
            if let Some(folder) = saved.cohort_folder {
                if let Err(err) = self.load_cohort_folder(folder.clone()).await {
                    tracing::error!(%folder, %err, "session replay: folder load failed");
                }
            }
            if let Some(region) = saved.selected_region {
                if let Err(err) = self.select_region(&region).await {
                    tracing::error!(%region, %err, "session replay: region selection failed");
                }
            }
            return Ok(());
        }

        let Some(dataset) = saved.dataset else {
            return Ok(());
        };
        if let Err(err) = self.load_dataset(dataset.clone()).await {
            tracing::error!(%dataset, %err, "session replay: dataset load failed");
            return Ok(());
        }
        if !saved.selected_genotypes.is_empty() {
            if let Err(err) = self.select_genotypes(saved.selected_genotypes.clone()).await {
                tracing::error!(%err, "session replay: genotype selection failed");
            }
        }
        if let Some(region) = saved.selected_region {
            if let Err(err) = self.select_region(&region).await {
                tracing::error!(%region, %err, "session replay: region selection failed");
            }
        }
        Ok(())
    }

    fn push_session(&mut self) -> Result<()> {
        let state = self.session_state();
        self.sessions.push_update(&state)
    }
}
