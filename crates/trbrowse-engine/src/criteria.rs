//! Filter criteria model: three-state field patching, quick-filter toggles,
//! write-through persistence of the live criteria, and preset CRUD.
//!
//! The live criteria and the presets are stored under distinct keys and are
//! never merged automatically.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trbrowse_core::error::Result;
use trbrowse_core::traits::StateStore;
use trbrowse_core::types::{AdvancedQuery, FilterCriteria};

pub const CRITERIA_KEY: &str = "filter_criteria_current";
pub const PRESETS_KEY: &str = "filter_presets";

/// Three-state field update: leave alone, clear, or set. The explicit
/// `Clear` variant is what distinguishes "no change" from "remove this
/// constraint" in a field-wise merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldPatch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T: Clone> FieldPatch<T> {
    fn apply(&self, field: &mut Option<T>) {
        match self {
            FieldPatch::Keep => {}
            FieldPatch::Clear => *field = None,
            FieldPatch::Set(value) => *field = Some(value.clone()),
        }
    }
}

/// Shallow field-wise update of a [`FilterCriteria`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriteriaPatch {
    pub motif_size_min: FieldPatch<u32>,
    pub motif_size_max: FieldPatch<u32>,
    pub cn_min: FieldPatch<f64>,
    pub cn_max: FieldPatch<f64>,
    pub chromosomes: FieldPatch<Vec<String>>,
    pub genotypes: FieldPatch<Vec<String>>,
    pub pathogenic_only: FieldPatch<bool>,
    pub has_annotations: FieldPatch<bool>,
    pub annotation_tags: FieldPatch<Vec<String>>,
}

/// Later fields override; `Keep` means "no change", `Clear` removes a field.
pub fn compose(base: &FilterCriteria, patch: &CriteriaPatch) -> FilterCriteria {
    let mut next = base.clone();
    patch.motif_size_min.apply(&mut next.motif_size_min);
    patch.motif_size_max.apply(&mut next.motif_size_max);
    patch.cn_min.apply(&mut next.cn_min);
    patch.cn_max.apply(&mut next.cn_max);
    patch.chromosomes.apply(&mut next.chromosomes);
    patch.genotypes.apply(&mut next.genotypes);
    patch.pathogenic_only.apply(&mut next.pathogenic_only);
    patch.has_annotations.apply(&mut next.has_annotations);
    patch.annotation_tags.apply(&mut next.annotation_tags);
    next
}

/// `criteria.genotypes` if present, else the mode's currently selected list.
/// This fallback is what keeps an advanced filter scoped to the sidebar
/// selection when the panel is applied without touching genotypes.
pub fn resolve_genotypes(criteria: &FilterCriteria, fallback: &[String]) -> Vec<String> {
    criteria
        .genotypes
        .clone()
        .unwrap_or_else(|| fallback.to_vec())
}

/// Maps the criteria to the backend wire shape, folding the annotation
/// predicate into the already-resolved region id list.
pub fn to_query_payload(
    criteria: &FilterCriteria,
    annotated_regions: Option<Vec<String>>,
) -> AdvancedQuery {
    AdvancedQuery {
        motif_size_min: criteria.motif_size_min,
        motif_size_max: criteria.motif_size_max,
        cn_min: criteria.cn_min,
        cn_max: criteria.cn_max,
        chromosomes: criteria.chromosomes.clone(),
        genotypes: criteria.genotypes.clone(),
        pathogenic_only: criteria.pathogenic_only.unwrap_or(false),
        annotated_regions,
    }
}

/// A named, togglable shortcut over a fixed subset of criteria fields.
/// "Active" is decided purely by structural equality against the shortcut
/// values; there is no separate activation flag.
pub struct QuickFilter {
    pub name: &'static str,
    apply: CriteriaPatch,
    clear: CriteriaPatch,
    active: fn(&FilterCriteria) -> bool,
}

impl QuickFilter {
    pub fn is_active(&self, criteria: &FilterCriteria) -> bool {
        (self.active)(criteria)
    }
}

pub fn quick_filters() -> Vec<QuickFilter> {
    vec![
        QuickFilter {
            name: "High CN (>=10)",
            apply: CriteriaPatch {
                cn_min: FieldPatch::Set(10.0),
                ..CriteriaPatch::default()
            },
            clear: CriteriaPatch {
                cn_min: FieldPatch::Clear,
                ..CriteriaPatch::default()
            },
            active: |c| c.cn_min == Some(10.0),
        },
        QuickFilter {
            name: "Pathogenic",
            apply: CriteriaPatch {
                pathogenic_only: FieldPatch::Set(true),
                ..CriteriaPatch::default()
            },
            clear: CriteriaPatch {
                pathogenic_only: FieldPatch::Clear,
                ..CriteriaPatch::default()
            },
            active: |c| c.pathogenic_only == Some(true),
        },
    ]
}

/// A persisted named criteria snapshot, never auto-updated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub id: String,
    pub name: String,
    pub criteria: FilterCriteria,
    pub created_at: DateTime<Utc>,
}

/// Owns the live criteria and their persistence.
pub struct CriteriaModel<S: StateStore> {
    store: Arc<S>,
    current: FilterCriteria,
}

impl<S: StateStore> CriteriaModel<S> {
    pub fn new(store: Arc<S>) -> Self {
        let current = store.get_json(CRITERIA_KEY).unwrap_or_default();
        Self { store, current }
    }

    pub fn current(&self) -> &FilterCriteria {
        &self.current
    }

    /// Applies a patch and persists immediately (write-through, no
    /// debounce: edits are explicit calls, so the write rate is already
    /// bounded, and a panel close/reopen must not lose in-progress edits).
    pub fn edit(&mut self, patch: &CriteriaPatch) -> Result<FilterCriteria> {
        self.current = compose(&self.current, patch);
        self.persist()?;
        Ok(self.current.clone())
    }

    pub fn replace(&mut self, criteria: FilterCriteria) -> Result<()> {
        self.current = criteria;
        self.persist()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.current = FilterCriteria::default();
        self.store.remove(CRITERIA_KEY)
    }

    /// Press = apply, press again = clear. Returns the resulting criteria,
    /// or `None` for an unknown quick-filter name.
    pub fn toggle_quick(&mut self, name: &str) -> Result<Option<FilterCriteria>> {
        let quick = match quick_filters().into_iter().find(|q| q.name == name) {
            Some(q) => q,
            None => return Ok(None),
        };
        let patch = if quick.is_active(&self.current) {
            &quick.clear
        } else {
            &quick.apply
        };
        Ok(Some(self.edit(patch)?))
    }

    fn persist(&self) -> Result<()> {
        self.store.set_json(CRITERIA_KEY, &self.current)
    }

    pub fn presets(&self) -> Vec<FilterPreset> {
        self.store.get_json(PRESETS_KEY).unwrap_or_default()
    }

    pub fn save_preset(&self, name: &str) -> Result<FilterPreset> {
        let preset = FilterPreset {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            criteria: self.current.clone(),
            created_at: Utc::now(),
        };
        let mut presets = self.presets();
        presets.push(preset.clone());
        self.store.set_json(PRESETS_KEY, &presets)?;
        Ok(preset)
    }

    pub fn delete_preset(&self, id: &str) -> Result<bool> {
        let mut presets = self.presets();
        let before = presets.len();
        presets.retain(|p| p.id != id);
        if presets.len() == before {
            return Ok(false);
        }
        self.store.set_json(PRESETS_KEY, &presets)?;
        Ok(true)
    }

    /// Loads a preset into the live criteria (and persists them).
    pub fn load_preset(&mut self, id: &str) -> Result<Option<FilterCriteria>> {
        let preset = match self.presets().into_iter().find(|p| p.id == id) {
            Some(p) => p,
            None => return Ok(None),
        };
        self.replace(preset.criteria.clone())?;
        Ok(Some(preset.criteria))
    }
}
