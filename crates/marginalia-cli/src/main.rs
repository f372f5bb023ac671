use anyhow::{Result, anyhow};
use marginalia_config::Config;
use marginalia_engine::tree::markdown;
use marginalia_engine::{
    AnchorDescriptor, AnchorOptions, AnchorStore, Anchorer, BatchResolution, DocTree,
    ExclusionRules, NodeId,
};
use std::fmt::Display;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::{env, fs, process};

fn anchor_options(config: &Config) -> Result<AnchorOptions> {
    let chars_to_keep = NonZeroUsize::new(config.chars_to_keep)
        .ok_or_else(|| anyhow!("chars_to_keep must be at least 1"))?;
    Ok(AnchorOptions {
        chars_to_keep,
        rules: ExclusionRules {
            marker: config.exclusion_marker.clone(),
            tags: config.excluded_tags.clone(),
        },
    })
}

fn load_document(path: &Path) -> Result<DocTree> {
    let source = fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read {}: {e}", path.display()))?;
    Ok(markdown::parse(&source))
}

/// Descriptor for the first occurrence of `quote`, with its surrounding context.
fn anchor_quote(tree: &DocTree, options: AnchorOptions, quote: &str) -> Result<AnchorDescriptor> {
    let anchorer = Anchorer::for_document(tree, options);
    let found = anchorer
        .resolve(&AnchorDescriptor::new("", quote, ""))
        .map_err(|_| anyhow!("Quote {quote:?} does not occur in the document"))?;
    anchorer
        .serialize(&found.span)?
        .ok_or_else(|| anyhow!("Quote {quote:?} covers no visible text"))
}

/// One line per key: position, strategy and covered text, or the failure.
fn render_batch<K: Ord + Display>(
    anchorer: &Anchorer<'_, DocTree>,
    batch: &BatchResolution<NodeId, K>,
) -> Vec<String> {
    let mut lines: Vec<(&K, String)> = batch
        .resolved
        .iter()
        .map(|(key, anchor)| {
            let text = anchorer.span_text(&anchor.span).unwrap_or_default();
            let line = format!(
                "{key}\t{}\t{:?}\t{text}",
                anchor.relative_position, anchor.strategy
            );
            (key, line)
        })
        .chain(
            batch
                .failed
                .iter()
                .map(|(key, err)| (key, format!("{key}\tfailed\t{err}"))),
        )
        .collect();
    lines.sort_by(|a, b| a.0.cmp(b.0));
    lines.into_iter().map(|(_, line)| line).collect()
}

fn load_store(path: &Path) -> Result<AnchorStore> {
    if !path.exists() {
        return Ok(AnchorStore::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn save_store(store: &AnchorStore, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(store)?)?;
    Ok(())
}

fn run_anchor(config: &Config, document: &Path, quote: &str) -> Result<()> {
    let tree = load_document(document)?;
    let descriptor = anchor_quote(&tree, anchor_options(config)?, quote)?;
    println!("{}", serde_json::to_string_pretty(&descriptor)?);

    if let Some(store_path) = &config.store_path {
        let mut store = load_store(store_path)?;
        let id = store.insert(descriptor, Some(document.display().to_string()));
        save_store(&store, store_path)?;
        log::info!("Stored anchor {id} in {}", store_path.display());
    }
    Ok(())
}

fn run_resolve(config: &Config, document: &Path, descriptors: Option<&Path>) -> Result<()> {
    let tree = load_document(document)?;
    let anchorer = Anchorer::for_document(&tree, anchor_options(config)?);

    let lines = match (descriptors, &config.store_path) {
        (Some(path), _) => {
            let content = fs::read_to_string(path)
                .map_err(|e| anyhow!("Failed to read {}: {e}", path.display()))?;
            let descriptors: Vec<AnchorDescriptor> = serde_json::from_str(&content)?;
            render_batch(&anchorer, &anchorer.resolve_all(&descriptors))
        }
        (None, Some(store_path)) => {
            let store = load_store(store_path)?;
            log::info!("Resolving {} stored anchors", store.len());
            render_batch(&anchorer, &store.resolve_all(&anchorer))
        }
        (None, None) => {
            return Err(anyhow!(
                "No descriptors file given and no store_path set in {}",
                Config::config_path().display()
            ));
        }
    };

    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn print_usage(program: &str) {
    eprintln!("Usage: {program} anchor <file.md> <quote>");
    eprintln!("       {program} resolve <file.md> [descriptors.json]");
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("marginalia-cli", String::as_str);

    let config = match Config::load() {
        Ok(Some(config)) => config,
        Ok(None) => {
            log::debug!(
                "No config file at {}, using defaults",
                Config::config_path().display()
            );
            Config::default()
        }
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    match args.get(1).map(String::as_str) {
        Some("anchor") if args.len() == 4 => {
            run_anchor(&config, &PathBuf::from(&args[2]), &args[3])
        }
        Some("resolve") if args.len() == 3 || args.len() == 4 => {
            let descriptors = args.get(3).map(PathBuf::from);
            run_resolve(&config, &PathBuf::from(&args[2]), descriptors.as_deref())
        }
        _ => {
            print_usage(program);
            process::exit(1);
        }
    }
}
