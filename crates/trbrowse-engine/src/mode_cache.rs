//! Per-mode snapshots of browsing state.
//!
//! Each mode owns an isolated slot; switching modes stores the outgoing
//! mode's state and restores the incoming one verbatim, so no queries are
//! re-issued on a round trip. The two cohort modes share one state shape
//! but never one slot.

use serde::{Deserialize, Serialize};

use trbrowse_core::types::{DatasetRef, Mode, PageResult};

/// Genotype and chromosome vocabularies discovered for a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub genotypes: Vec<String>,
    pub chromosomes: Vec<String>,
}

/// Browsing state of the individual mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndividualState {
    pub dataset: Option<DatasetRef>,
    pub total_regions: Option<usize>,
    pub vocabulary: Vocabulary,
    pub selected_genotypes: Vec<String>,
    pub page: usize,
    pub page_result: Option<PageResult>,
    pub selected_region: Option<String>,
}

/// Browsing state shared by the cohort modes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortState {
    pub folder: Option<DatasetRef>,
    pub selected_region: Option<String>,
    /// Free-form text the user is editing, distinct from the committed
    /// selection.
    pub region_input: String,
    pub candidate_regions: Vec<String>,
}

/// The live state of whichever mode is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModeState {
    Individual(IndividualState),
    Cohort(CohortState),
}

impl ModeState {
    pub fn for_mode(mode: Mode) -> Self {
        if mode.is_cohort() {
            ModeState::Cohort(CohortState::default())
        } else {
            ModeState::Individual(IndividualState::default())
        }
    }

    pub fn as_individual(&self) -> Option<&IndividualState> {
        match self {
            ModeState::Individual(state) => Some(state),
            ModeState::Cohort(_) => None,
        }
    }

    pub fn as_cohort(&self) -> Option<&CohortState> {
        match self {
            ModeState::Cohort(state) => Some(state),
            ModeState::Individual(_) => None,
        }
    }

    pub fn selected_region(&self) -> Option<&str> {
        match self {
            ModeState::Individual(state) => state.selected_region.as_deref(),
            ModeState::Cohort(state) => state.selected_region.as_deref(),
        }
    }
}

/// One slot per mode. Snapshots overwrite; restores clone.
#[derive(Debug, Clone, Default)]
pub struct ModeCache {
    individual: Option<IndividualState>,
    cohort_read: Option<CohortState>,
    cohort_assembly: Option<CohortState>,
}

impl ModeCache {
    /// Stores the given state under `mode`. A state shape mismatched to
    /// the mode is dropped with a log line rather than corrupting a slot.
    pub fn snapshot(&mut self, mode: Mode, state: &ModeState) {
        match (mode, state) {
            (Mode::Individual, ModeState::Individual(s)) => {
                self.individual = Some(s.clone());
            }
            (Mode::CohortRead, ModeState::Cohort(s)) => {
                self.cohort_read = Some(s.clone());
            }
            (Mode::CohortAssembly, ModeState::Cohort(s)) => {
                self.cohort_assembly = Some(s.clone());
            }
            _ => {
                tracing::warn!(%mode, "state shape does not match mode, snapshot dropped");
            }
        }
    }

    /// Returns the cached state for `mode`, or a fresh default for a mode
    /// entered for the first time.
    pub fn restore(&self, mode: Mode) -> ModeState {
        match mode {
            Mode::Individual => self
                .individual
                .clone()
                .map_or_else(|| ModeState::for_mode(mode), ModeState::Individual),
            Mode::CohortRead => self
                .cohort_read
                .clone()
                .map_or_else(|| ModeState::for_mode(mode), ModeState::Cohort),
            Mode::CohortAssembly => self
                .cohort_assembly
                .clone()
                .map_or_else(|| ModeState::for_mode(mode), ModeState::Cohort),
        }
    }
}
