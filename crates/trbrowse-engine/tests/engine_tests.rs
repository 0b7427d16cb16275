mod support;

use std::sync::Arc;

use tempfile::TempDir;

use support::{numbered_catalog, numbered_region, write_catalog, CountingBackend};
use trbrowse_catalog::LocalCatalogBackend;
use trbrowse_core::error::BrowseError;
use trbrowse_core::traits::StateStore;
use trbrowse_core::types::{DatasetRef, FilterCriteria, Mode, PAGE_SIZE};
use trbrowse_engine::annotations::{AnnotationRecord, ANNOTATIONS_KEY, ANNOTATION_PREFIX};
use trbrowse_engine::criteria::{CriteriaPatch, FieldPatch};
use trbrowse_engine::mode_cache::{CohortState, IndividualState};
use trbrowse_engine::{BrowseEngine, FilterOutcome};
use trbrowse_store::MemoryStore;

type Engine = BrowseEngine<CountingBackend<LocalCatalogBackend>, MemoryStore>;

fn engine_with(store: Arc<MemoryStore>) -> (Engine, Arc<CountingBackend<LocalCatalogBackend>>) {
    let backend = Arc::new(CountingBackend::new(LocalCatalogBackend::new()));
    (BrowseEngine::new(Arc::clone(&backend), store), backend)
}

fn fresh() -> (TempDir, DatasetRef, Engine, Arc<CountingBackend<LocalCatalogBackend>>) {
    let tmp = TempDir::new().unwrap();
    let dataset = numbered_catalog(tmp.path());
    let (engine, backend) = engine_with(Arc::new(MemoryStore::new()));
    (tmp, dataset, engine, backend)
}

fn individual(engine: &Engine) -> &IndividualState {
    engine.state().as_individual().unwrap()
}

fn cohort(engine: &Engine) -> &CohortState {
    engine.state().as_cohort().unwrap()
}

#[tokio::test]
async fn load_selects_first_record_and_discovers_vocabulary() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    let state = individual(&engine);
    assert_eq!(state.page, 0);
    assert_eq!(state.total_regions, Some(120));
    assert_eq!(state.selected_region.as_deref(), Some(numbered_region(0).as_str()));
    assert_eq!(state.vocabulary.genotypes, vec!["0/0", "0/1", "1/1"]);
    assert_eq!(state.selected_genotypes, state.vocabulary.genotypes);
    assert_eq!(state.page_result.as_ref().unwrap().records.len(), PAGE_SIZE);
}

#[tokio::test]
async fn full_genotype_selection_collapses_to_wildcard() {
    let (_tmp, dataset, mut engine, backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    let all = individual(&engine).vocabulary.genotypes.clone();
    engine.select_genotypes(all).await.unwrap();
    assert_eq!(backend.last_filter(), Some(None));
    assert_eq!(individual(&engine).page_result.as_ref().unwrap().total_matching, 120);

    engine
        .select_genotypes(vec!["0/1".to_string()])
        .await
        .unwrap();
    assert_eq!(backend.last_filter(), Some(Some(vec!["0/1".to_string()])));
    assert_eq!(individual(&engine).page_result.as_ref().unwrap().total_matching, 40);
    assert_eq!(individual(&engine).page, 0);
}

#[tokio::test]
async fn genotype_outside_vocabulary_is_rejected() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();
    let err = engine
        .select_genotypes(vec!["2/2".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, BrowseError::Query(_)));
}

#[tokio::test]
async fn relative_navigation_crosses_page_boundaries() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    // Last record of page 0, then step across the boundary and back.
    engine.select_region(&numbered_region(49)).await.unwrap();
    engine.next_region().await.unwrap();
    assert_eq!(individual(&engine).page, 1);
    assert_eq!(
        individual(&engine).selected_region.as_deref(),
        Some(numbered_region(50).as_str())
    );

    engine.previous_region().await.unwrap();
    assert_eq!(individual(&engine).page, 0);
    assert_eq!(
        individual(&engine).selected_region.as_deref(),
        Some(numbered_region(49).as_str())
    );
}

#[tokio::test]
async fn navigation_stops_at_the_ends() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    engine.previous_region().await.unwrap();
    assert_eq!(individual(&engine).page, 0);
    assert_eq!(
        individual(&engine).selected_region.as_deref(),
        Some(numbered_region(0).as_str())
    );

    engine.jump_to_ordinal(120).await.unwrap();
    engine.next_region().await.unwrap();
    assert_eq!(individual(&engine).page, 2);
    assert_eq!(
        individual(&engine).selected_region.as_deref(),
        Some(numbered_region(119).as_str())
    );
}

#[tokio::test]
async fn ordinal_jump_is_one_based_and_validated() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    engine.jump_to_ordinal(120).await.unwrap();
    assert_eq!(individual(&engine).page, 2);
    assert_eq!(
        individual(&engine).selected_region.as_deref(),
        Some(numbered_region(119).as_str())
    );

    engine.jump_to_ordinal(1).await.unwrap();
    assert_eq!(individual(&engine).page, 0);
    assert_eq!(
        individual(&engine).selected_region.as_deref(),
        Some(numbered_region(0).as_str())
    );

    assert!(matches!(
        engine.jump_to_ordinal(0).await.unwrap_err(),
        BrowseError::Range { .. }
    ));
    assert!(matches!(
        engine.jump_to_ordinal(121).await.unwrap_err(),
        BrowseError::Range { index: 121, total: 120 }
    ));
}

#[tokio::test]
async fn mode_switch_restores_cached_state_without_refetching() {
    let (_tmp, dataset, mut engine, backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();
    engine.jump_to_ordinal(60).await.unwrap();

    let before = individual(&engine).clone();
    let queries_before = backend.query_count();

    engine.switch_mode(Mode::CohortRead).await.unwrap();
    assert!(engine.state().as_cohort().is_some());
    engine.switch_mode(Mode::Individual).await.unwrap();

    assert_eq!(*individual(&engine), before);
    assert_eq!(backend.query_count(), queries_before);
}

#[tokio::test]
async fn filter_outcome_distinguishes_empty_match_from_empty_dataset() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    let outcome = engine
        .apply_criteria(FilterCriteria {
            cn_min: Some(1_000.0),
            ..FilterCriteria::default()
        })
        .await
        .unwrap();
    assert_eq!(outcome, FilterOutcome::FilterEliminatedAll);
    let page = individual(&engine).page_result.as_ref().unwrap();
    assert_eq!(page.total_matching, 0);
    assert_eq!(page.total_regions, 120);
    assert!(individual(&engine).selected_region.is_none());

    let outcome = engine
        .apply_criteria(FilterCriteria {
            cn_min: Some(100.0),
            ..FilterCriteria::default()
        })
        .await
        .unwrap();
    assert_eq!(outcome, FilterOutcome::Matched);
    assert_eq!(
        individual(&engine).page_result.as_ref().unwrap().total_matching,
        20
    );
    assert_eq!(
        individual(&engine).selected_region.as_deref(),
        Some(numbered_region(100).as_str())
    );
}

#[tokio::test]
async fn quick_filter_toggles_on_and_off() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    // An unrelated field set beforehand must survive the toggle cycle.
    engine
        .edit_criteria(&CriteriaPatch {
            chromosomes: FieldPatch::Set(vec!["chr1".to_string()]),
            ..CriteriaPatch::default()
        })
        .unwrap();

    let outcome = engine.toggle_quick_filter("High CN (>=10)").await.unwrap();
    assert_eq!(outcome, Some(FilterOutcome::Matched));
    assert_eq!(engine.criteria().cn_min, Some(10.0));
    // chr1 holds the even ordinals, 55 of them at cn >= 10.
    assert_eq!(
        individual(&engine).page_result.as_ref().unwrap().total_matching,
        55
    );

    engine.toggle_quick_filter("High CN (>=10)").await.unwrap();
    assert_eq!(engine.criteria().cn_min, None);
    assert_eq!(
        engine.criteria().chromosomes.as_deref(),
        Some(["chr1".to_string()].as_slice())
    );
    assert_eq!(
        individual(&engine).page_result.as_ref().unwrap().total_matching,
        60
    );

    assert_eq!(engine.toggle_quick_filter("no such filter").await.unwrap(), None);
}

#[tokio::test]
async fn malformed_region_text_fails_before_any_lookup() {
    let (_tmp, dataset, mut engine, backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    let err = engine.select_region("not-a-region").await.unwrap_err();
    assert!(matches!(err, BrowseError::InvalidRegion(_)));
    assert_eq!(backend.region_lookups.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unresolvable_region_keeps_the_optimistic_selection() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    engine.select_region("chr9:1-2").await.unwrap();
    assert_eq!(individual(&engine).selected_region.as_deref(), Some("chr9:1-2"));
    assert_eq!(individual(&engine).page, 0);
}

#[tokio::test]
async fn selecting_an_off_page_region_navigates_to_its_page() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    engine.select_region(&numbered_region(70)).await.unwrap();
    assert_eq!(individual(&engine).page, 1);
    assert_eq!(
        individual(&engine).selected_region.as_deref(),
        Some(numbered_region(70).as_str())
    );
}

#[tokio::test]
async fn criteria_edits_survive_a_restart() {
    let tmp = TempDir::new().unwrap();
    let _dataset = numbered_catalog(tmp.path());
    let store = Arc::new(MemoryStore::new());

    let (mut engine, _backend) = engine_with(Arc::clone(&store));
    engine
        .edit_criteria(&CriteriaPatch {
            cn_min: FieldPatch::Set(12.0),
            ..CriteriaPatch::default()
        })
        .unwrap();
    drop(engine);

    let (engine, _backend) = engine_with(store);
    assert_eq!(engine.criteria().cn_min, Some(12.0));
}

#[tokio::test]
async fn annotation_criteria_narrow_to_annotated_regions() {
    let tmp = TempDir::new().unwrap();
    let dataset = numbered_catalog(tmp.path());
    let store = Arc::new(MemoryStore::new());
    store
        .set_json(
            ANNOTATIONS_KEY,
            &vec![AnnotationRecord {
                region: numbered_region(0),
                tags: vec!["review".to_string()],
                note: None,
            }],
        )
        .unwrap();
    store
        .set_json(
            &format!("{ANNOTATION_PREFIX}extra"),
            &AnnotationRecord {
                region: numbered_region(2),
                tags: Vec::new(),
                note: Some("seen once".to_string()),
            },
        )
        .unwrap();

    let (mut engine, _backend) = engine_with(store);
    engine.load_dataset(dataset).await.unwrap();

    let outcome = engine
        .apply_criteria(FilterCriteria {
            has_annotations: Some(true),
            ..FilterCriteria::default()
        })
        .await
        .unwrap();
    assert_eq!(outcome, FilterOutcome::Matched);
    let page = individual(&engine).page_result.as_ref().unwrap();
    assert_eq!(page.total_matching, 2);

    let outcome = engine
        .apply_criteria(FilterCriteria {
            annotation_tags: Some(vec!["review".to_string()]),
            ..FilterCriteria::default()
        })
        .await
        .unwrap();
    assert_eq!(outcome, FilterOutcome::Matched);
    let page = individual(&engine).page_result.as_ref().unwrap();
    assert_eq!(page.total_matching, 1);
    assert_eq!(page.records[0].region, numbered_region(0));
}

#[tokio::test]
async fn presets_capture_and_restore_criteria() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    engine
        .edit_criteria(&CriteriaPatch {
            cn_min: FieldPatch::Set(100.0),
            ..CriteriaPatch::default()
        })
        .unwrap();
    let preset = engine.save_filter_preset("high copy").unwrap();

    engine.clear_filter().await.unwrap();
    assert!(engine.criteria().is_empty());

    let outcome = engine.load_filter_preset(&preset.id).await.unwrap();
    assert_eq!(outcome, Some(FilterOutcome::Matched));
    assert_eq!(engine.criteria().cn_min, Some(100.0));
    assert_eq!(
        individual(&engine).page_result.as_ref().unwrap().total_matching,
        20
    );

    assert!(engine.delete_filter_preset(&preset.id).unwrap());
    assert!(engine.filter_presets().is_empty());
    assert_eq!(engine.load_filter_preset(&preset.id).await.unwrap(), None);
}

#[tokio::test]
async fn current_session_tracks_navigation() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    engine.save_session("exploration").unwrap();
    engine.jump_to_ordinal(60).await.unwrap();

    let sessions = engine.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(
        sessions[0].state.selected_region.as_deref(),
        Some(numbered_region(59).as_str())
    );
}

#[tokio::test]
async fn loading_a_session_replays_its_coordinates() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset.clone()).await.unwrap();
    engine.select_region(&numbered_region(70)).await.unwrap();
    let saved = engine.save_session("deep dive").unwrap();

    // Detach so later navigation does not rewrite the snapshot.
    engine.clear_current_session().unwrap();
    engine.jump_to_ordinal(1).await.unwrap();
    assert_eq!(individual(&engine).page, 0);

    assert!(engine.load_session(&saved.id).await.unwrap());
    assert_eq!(engine.mode(), Mode::Individual);
    assert_eq!(individual(&engine).dataset.as_ref(), Some(&dataset));
    assert_eq!(individual(&engine).page, 1);
    assert_eq!(
        individual(&engine).selected_region.as_deref(),
        Some(numbered_region(70).as_str())
    );
    assert_eq!(engine.current_session_id(), Some(saved.id.as_str()));

    assert!(!engine.load_session("no-such-id").await.unwrap());
}

#[tokio::test]
async fn saving_under_an_existing_name_replaces_the_session() {
    let (_tmp, dataset, mut engine, _backend) = fresh();
    engine.load_dataset(dataset).await.unwrap();

    let first = engine.save_session("daily").unwrap();
    engine.jump_to_ordinal(30).await.unwrap();
    let second = engine.save_session("daily").unwrap();

    let sessions = engine.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, second.id);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn cohort_folder_flow() {
    let tmp = TempDir::new().unwrap();
    write_catalog(
        tmp.path(),
        "s1.tsv",
        &[
            ("chr10:100-200".to_string(), "CAG", "0/1", 4.0),
            ("chr2:100-200".to_string(), "CAG", "0/1", 4.0),
        ],
    );
    write_catalog(
        tmp.path(),
        "s2.tsv",
        &[
            ("chr2:100-200".to_string(), "CAG", "1/1", 5.0),
            ("chr1:50-80".to_string(), "CTG", "0/0", 2.0),
        ],
    );
    let folder = DatasetRef::new(tmp.path().display().to_string());

    let (mut engine, _backend) = engine_with(Arc::new(MemoryStore::new()));
    engine.switch_mode(Mode::CohortRead).await.unwrap();
    engine.load_cohort_folder(folder.clone()).await.unwrap();

    assert_eq!(
        cohort(&engine).candidate_regions,
        vec!["chr1:50-80", "chr2:100-200", "chr10:100-200"]
    );
    assert_eq!(cohort(&engine).selected_region.as_deref(), Some("chr1:50-80"));

    engine.set_region_input("chr2:100-200").unwrap();
    engine.submit_region_input().await.unwrap();
    assert_eq!(cohort(&engine).selected_region.as_deref(), Some("chr2:100-200"));

    // Same folder modulo a trailing slash.
    let duplicate = DatasetRef::new(format!("{}/", tmp.path().display()));
    assert!(matches!(
        engine.load_cohort_folder(duplicate).await.unwrap_err(),
        BrowseError::Load(_)
    ));

    // The other cohort mode starts clean.
    engine.switch_mode(Mode::CohortAssembly).await.unwrap();
    assert!(cohort(&engine).folder.is_none());
    assert!(cohort(&engine).candidate_regions.is_empty());

    engine.switch_mode(Mode::CohortRead).await.unwrap();
    assert_eq!(cohort(&engine).folder.as_ref(), Some(&folder));
    assert_eq!(cohort(&engine).selected_region.as_deref(), Some("chr2:100-200"));
}

#[tokio::test]
async fn cohort_session_replays_folder_and_selection() {
    let tmp = TempDir::new().unwrap();
    write_catalog(
        tmp.path(),
        "s1.tsv",
        &[
            ("chr1:50-80".to_string(), "CTG", "0/0", 2.0),
            ("chr2:100-200".to_string(), "CAG", "0/1", 4.0),
        ],
    );
    let folder = DatasetRef::new(tmp.path().display().to_string());

    let (mut engine, _backend) = engine_with(Arc::new(MemoryStore::new()));
    engine.switch_mode(Mode::CohortRead).await.unwrap();
    engine.load_cohort_folder(folder.clone()).await.unwrap();
    engine.select_region("chr2:100-200").await.unwrap();
    let saved = engine.save_session("cohort work").unwrap();

    engine.clear_current_session().unwrap();
    engine.switch_mode(Mode::Individual).await.unwrap();

    assert!(engine.load_session(&saved.id).await.unwrap());
    assert_eq!(engine.mode(), Mode::CohortRead);
    assert_eq!(cohort(&engine).folder.as_ref(), Some(&folder));
    assert!(!cohort(&engine).candidate_regions.is_empty());
    assert_eq!(cohort(&engine).selected_region.as_deref(), Some("chr2:100-200"));
}
