use anyhow::Context;
use clap::Parser;
use javadoc_search::cli::{Cli, Commands};
use javadoc_search::config::{BuildConfig, Configuration};
use javadoc_search::error::Result;
use javadoc_search::search::{EngineBuilder, SearchService};
use javadoc_search::trie::BuildPolicy;
use rayon::ThreadPoolBuilder;
use std::path::Path;
use std::sync::Arc;

fn build_policy(build: &BuildConfig) -> Result<BuildPolicy> {
    if !build.concurrent {
        return Ok(BuildPolicy::Sequential);
    }
    let pool = ThreadPoolBuilder::new()
        .num_threads(build.threads)
        .thread_name(|i| format!("trie-build-{i}"))
        .build()
        .context("Failed to start the trie build pool")?;
    Ok(BuildPolicy::Parallel(Arc::new(pool)))
}

fn load_service(config_path: &Path) -> Result<(Configuration, SearchService)> {
    let config = Configuration::load(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let builder = EngineBuilder::new(build_policy(&config.build)?);
    let service = SearchService::from_config(&config, base_dir, &builder)
        .context("Failed to build the search engines")?;
    Ok((config, service))
}

fn main() -> Result<()> {
    javadoc_search::tracing::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Libraries => {
            let config = Configuration::load(&cli.config)
                .with_context(|| format!("Failed to load {}", cli.config.display()))?;
            for (id, library) in &config.libraries {
                let marker = if library.default { " (default)" } else { "" };
                println!("{id}{marker}: {} - {}", library.name, library.description);
                println!("  {}", library.base_url);
            }
        }
        Commands::Search {
            query,
            library,
            limit,
            grouped,
        } => {
            let (_, service) = load_service(&cli.config)?;
            let library_ref = service.library(library.as_deref())?;
            if grouped {
                let groups = service.search_grouped(library.as_deref(), &query, limit)?;
                for group in groups.iter().filter(|group| !group.entities.is_empty()) {
                    println!("{}:", group.kind);
                    for entity in &group.entities {
                        println!("  {}  {}", entity, library_ref.entity_url(entity)?);
                    }
                }
                if groups.iter().all(|group| group.entities.is_empty()) {
                    println!("No results found for '{}'", query);
                }
            } else {
                let results = service.search(library.as_deref(), &query, limit)?;
                if results.is_empty() {
                    println!("No results found for '{}'", query);
                }
                for entity in &results {
                    println!("{}  {}", entity, library_ref.entity_url(entity)?);
                }
            }
        }
        Commands::Url { query, library } => {
            let (_, service) = load_service(&cli.config)?;
            println!("{}", service.best_url(library.as_deref(), &query)?);
        }
    }
    Ok(())
}
