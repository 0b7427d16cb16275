use std::env;
use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;

use trbrowse_catalog::{LocalCatalogBackend, LocalFolderBrowser};
use trbrowse_core::config::{expand_path, Config};
use trbrowse_core::region::Region;
use trbrowse_core::traits::{DatasetBackend, FolderBrowser};
use trbrowse_core::types::{BrowseTarget, DatasetRef, FilterCriteria, Mode, PAGE_SIZE};
use trbrowse_engine::criteria::quick_filters;
use trbrowse_engine::{BrowseEngine, FilterOutcome};
use trbrowse_store::JsonFileStore;

type Engine = BrowseEngine<LocalCatalogBackend, JsonFileStore>;

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {prog} <command> [args...]");
    eprintln!("  show <catalog> [page]");
    eprintln!("  jump <catalog> <ordinal>");
    eprintln!("  filter <catalog> [cn-min=N] [cn-max=N] [motif-min=N] [motif-max=N]");
    eprintln!("         [chrom=a,b] [genotype=a,b] [tags=a,b] [pathogenic] [annotated]");
    eprintln!("  quick <catalog> <name>");
    eprintln!("  cohort <folder>");
    eprintln!("  browse <path> [--cohorts]");
    eprintln!("  check <chrom:start-end>");
    eprintln!("  sessions");
    eprintln!("  session-save <name> <catalog> [region]");
    eprintln!("  session-load <id>");
    eprintln!("  session-delete <id>");
    std::process::exit(1);
}

fn parse_args() -> (String, String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        usage(&prog);
    }
    let cmd = args.remove(0);
    (prog, cmd, args)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let (prog, cmd, args) = parse_args();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(&prog, &cmd, &args))
}

fn build_engine() -> anyhow::Result<(Engine, Arc<LocalCatalogBackend>)> {
    let config = Config::load()?;
    let store_path: String = config
        .get("store.path")
        .unwrap_or_else(|_| "~/.trbrowse/state.json".to_string());
    let backend = Arc::new(LocalCatalogBackend::new());
    let store = Arc::new(JsonFileStore::open(expand_path(store_path)));
    Ok((BrowseEngine::new(Arc::clone(&backend), store), backend))
}

async fn run(prog: &str, cmd: &str, args: &[String]) -> anyhow::Result<()> {
    let (mut engine, backend) = build_engine()?;
    match cmd {
        "show" => {
            let catalog = args.first().unwrap_or_else(|| usage(prog));
            engine.load_dataset(DatasetRef::new(catalog.clone())).await?;
            if let Some(page) = args.get(1) {
                let page: usize = page.parse()?;
                if page > 1 {
                    engine.change_page(page - 1).await?;
                }
            }
            print_page(&engine);
        }
        "jump" => {
            let catalog = args.first().unwrap_or_else(|| usage(prog));
            let ordinal: usize = args.get(1).unwrap_or_else(|| usage(prog)).parse()?;
            engine.load_dataset(DatasetRef::new(catalog.clone())).await?;
            engine.jump_to_ordinal(ordinal).await?;
            print_page(&engine);
        }
        "filter" => {
            let catalog = args.first().unwrap_or_else(|| usage(prog));
            let criteria = parse_criteria(&args[1..])?;
            engine.load_dataset(DatasetRef::new(catalog.clone())).await?;
            let outcome = engine.apply_criteria(criteria).await?;
            println!("{}", outcome_line(outcome));
            print_page(&engine);
        }
        "quick" => {
            let catalog = args.first().unwrap_or_else(|| usage(prog));
            let name = args.get(1).unwrap_or_else(|| usage(prog));
            engine.load_dataset(DatasetRef::new(catalog.clone())).await?;
            match engine.toggle_quick_filter(name).await? {
                Some(outcome) => {
                    println!("{}", outcome_line(outcome));
                    print_page(&engine);
                }
                None => {
                    eprintln!("Unknown quick filter '{name}'. Available:");
                    for quick in quick_filters() {
                        eprintln!("  {}", quick.name);
                    }
                    std::process::exit(1);
                }
            }
        }
        "cohort" => {
            let folder = args.first().unwrap_or_else(|| usage(prog));
            engine.switch_mode(Mode::CohortRead).await?;
            let bar = ProgressBar::new_spinner();
            bar.set_message("scanning cohort folder");
            bar.enable_steady_tick(Duration::from_millis(80));
            let loaded = engine.load_cohort_folder(DatasetRef::new(folder.clone())).await;
            bar.finish_and_clear();
            loaded?;
            let state = engine.state().as_cohort().cloned().unwrap_or_default();
            println!(
                "✅ {} candidate region(s) in {folder}",
                state.candidate_regions.len()
            );
            for region in &state.candidate_regions {
                let marker = if state.selected_region.as_deref() == Some(region.as_str()) {
                    ">"
                } else {
                    " "
                };
                println!("{marker} {region}");
            }
        }
        "browse" => {
            let path = args.first().unwrap_or_else(|| usage(prog));
            let target = if args.iter().any(|a| a == "--cohorts") {
                BrowseTarget::CohortFolders
            } else {
                BrowseTarget::DatasetFiles
            };
            let listing = LocalFolderBrowser::new().browse(&expand_path(path), target)?;
            println!("{}", listing.path);
            for dir in &listing.directories {
                println!("  {dir}/");
            }
            for file in &listing.files {
                println!("  {file}");
            }
        }
        "check" => {
            let text = args.first().unwrap_or_else(|| usage(prog));
            let region = Region::parse(text)?;
            let assessment = backend.check_pathogenic(&region).await?;
            if assessment.pathogenic {
                println!(
                    "{region} overlaps {} ({}), threshold {} copies, inheritance {}",
                    assessment.gene.unwrap_or_default(),
                    assessment.disease.unwrap_or_default(),
                    assessment.threshold.unwrap_or_default(),
                    assessment.inheritance.unwrap_or_default(),
                );
            } else {
                println!("{region} overlaps no known pathogenic locus");
            }
        }
        "sessions" => {
            let sessions = engine.sessions();
            if sessions.is_empty() {
                println!("no saved sessions");
            }
            for session in sessions {
                let current = if engine.current_session_id() == Some(session.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{current} {}  {}  [{}]  {}",
                    session.id,
                    session.created_at.format("%Y-%m-%d %H:%M"),
                    session.state.mode,
                    session.name,
                );
            }
        }
        "session-save" => {
            let name = args.first().unwrap_or_else(|| usage(prog));
            let catalog = args.get(1).unwrap_or_else(|| usage(prog));
            engine.load_dataset(DatasetRef::new(catalog.clone())).await?;
            if let Some(region) = args.get(2) {
                engine.select_region(region).await?;
            }
            let session = engine.save_session(name)?;
            println!("✅ saved session {} ({})", session.name, session.id);
        }
        "session-load" => {
            let id = args.first().unwrap_or_else(|| usage(prog));
            if !engine.load_session(id).await? {
                eprintln!("no session with id {id}");
                std::process::exit(1);
            }
            println!("restored session in {} mode", engine.mode());
            print_page(&engine);
        }
        "session-delete" => {
            let id = args.first().unwrap_or_else(|| usage(prog));
            if engine.delete_session(id)? {
                println!("✅ deleted");
            } else {
                eprintln!("no session with id {id}");
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Unknown command: {cmd}");
            usage(prog);
        }
    }
    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_criteria(tokens: &[String]) -> anyhow::Result<FilterCriteria> {
    let mut criteria = FilterCriteria::default();
    for token in tokens {
        let (key, value) = match token.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (token.as_str(), None),
        };
        match (key, value) {
            ("cn-min", Some(v)) => criteria.cn_min = Some(v.parse()?),
            ("cn-max", Some(v)) => criteria.cn_max = Some(v.parse()?),
            ("motif-min", Some(v)) => criteria.motif_size_min = Some(v.parse()?),
            ("motif-max", Some(v)) => criteria.motif_size_max = Some(v.parse()?),
            ("chrom", Some(v)) => criteria.chromosomes = Some(split_list(v)),
            ("genotype", Some(v)) => criteria.genotypes = Some(split_list(v)),
            ("tags", Some(v)) => criteria.annotation_tags = Some(split_list(v)),
            ("pathogenic", None) => criteria.pathogenic_only = Some(true),
            ("annotated", None) => criteria.has_annotations = Some(true),
            _ => anyhow::bail!("unrecognized filter argument '{token}'"),
        }
    }
    Ok(criteria)
}

fn outcome_line(outcome: FilterOutcome) -> &'static str {
    match outcome {
        FilterOutcome::Matched => "filter applied",
        FilterOutcome::FilterEliminatedAll => "no records match the filter",
        FilterOutcome::DatasetEmpty => "dataset has no records",
    }
}

fn print_page(engine: &Engine) {
    let Some(state) = engine.state().as_individual() else {
        return;
    };
    let Some(page) = &state.page_result else {
        println!("no results");
        return;
    };
    println!(
        "page {}/{}, {} matching of {} records",
        page.current_page + 1,
        page.total_pages.max(1),
        page.total_matching,
        page.total_regions,
    );
    for (i, record) in page.records.iter().enumerate() {
        let ordinal = page.current_page * PAGE_SIZE + i + 1;
        let marker = if state.selected_region.as_deref() == Some(record.region.as_str()) {
            ">"
        } else {
            " "
        };
        println!(
            "{marker} {ordinal:>6}  {:<10} {:<24} {}",
            record.id, record.region, record.genotype
        );
    }
}
