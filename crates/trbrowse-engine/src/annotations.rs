//! Annotation index: which regions satisfy the active annotation predicate.
//!
//! Annotations live only in the persisted store (bulk list plus per-region
//! keys); the backend never sees them. The index is recomputed before every
//! advanced query whose criteria touch annotations.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use trbrowse_core::traits::StateStore;
use trbrowse_core::types::FilterCriteria;

pub const ANNOTATIONS_KEY: &str = "annotations";
pub const ANNOTATION_PREFIX: &str = "annotation_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub region: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn matches(criteria: &FilterCriteria, record: &AnnotationRecord) -> bool {
    if record.region.is_empty() {
        return false;
    }
    if criteria.has_annotations == Some(true) {
        return true;
    }
    match &criteria.annotation_tags {
        Some(tags) if !tags.is_empty() => tags.iter().any(|t| record.tags.contains(t)),
        _ => false,
    }
}

/// Resolves the criteria's annotation predicate to a concrete region list.
/// `None` when the criteria carry no annotation constraint.
pub fn annotation_index<S: StateStore>(
    store: &S,
    criteria: &FilterCriteria,
) -> Option<Vec<String>> {
    if !criteria.wants_annotation_scan() {
        return None;
    }
    let mut matched: BTreeSet<String> = BTreeSet::new();
    if let Some(bulk) = store.get_json::<Vec<AnnotationRecord>>(ANNOTATIONS_KEY) {
        for record in &bulk {
            if matches(criteria, record) {
                matched.insert(record.region.clone());
            }
        }
    }
    for key in store.keys() {
        if !key.starts_with(ANNOTATION_PREFIX) {
            continue;
        }
        if let Some(record) = store.get_json::<AnnotationRecord>(&key) {
            if matches(criteria, &record) {
                matched.insert(record.region.clone());
            }
        }
    }
    Some(matched.into_iter().collect())
}
