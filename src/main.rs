use chemtract::cli::{Cli, OutputFormat};
use chemtract::config::{ExtractionConfig, ResolverConfig};
use chemtract::dictionary::ChemDictionary;
use chemtract::error::{ChemError, Result};
use chemtract::extract::{ExtractionResult, Extractor};
use chemtract::registry::PubChemRegistry;
use chemtract::resolve::Resolver;
use chemtract::types::ResolvedEntity;
use clap::Parser;
use csv::WriterBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    extraction: ExtractionConfig,
    #[serde(default)]
    resolver: ResolverConfig,
}

#[derive(Debug, Serialize)]
struct DocumentReport {
    document: String,
    extraction: ExtractionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<Vec<ResolvedEntity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    markush_mapping: Option<std::collections::HashMap<String, Vec<String>>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .format_target(false)
        .format_timestamp_secs()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .expect("Failed to initialize logger");

    let cli = Cli::parse();
    info!("Starting chemical entity extraction...");
    info!("Input: {:?}", cli.input);
    let start_time = Instant::now();

    // 1. Configuration
    let mut config = match &cli.config {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_json::from_str::<FileConfig>(&content)
                .map_err(|e| ChemError::InvalidInput(format!("bad config file: {e}")))?
        }
        None => FileConfig::default(),
    };
    if let Some(min_confidence) = cli.min_confidence {
        config.extraction.min_confidence = min_confidence;
    }

    // 2. Dictionary
    let dictionary = Arc::new(ChemDictionary::with_defaults());
    if let Some(path) = &cli.names_csv {
        let added = dictionary.load_names_csv(path)?;
        info!("Loaded {added} name entries from {:?}", path);
    }
    if let Some(path) = &cli.cas_csv {
        let added = dictionary.load_cas_csv(path)?;
        info!("Loaded {added} CAS entries from {:?}", path);
    }
    if let Some(path) = &cli.brands_csv {
        let added = dictionary.load_brands_csv(path)?;
        info!("Loaded {added} brand entries from {:?}", path);
    }
    info!("Dictionary holds {} entries", dictionary.size());

    // 3. Input documents
    let documents = collect_documents(&cli.input)?;
    if documents.is_empty() {
        info!("No input documents found. Exiting.");
        return Ok(());
    }
    info!("Processing {} document(s)", documents.len());

    // 4. Pipeline components. The CLI runs without a neural backend; the
    // dictionary and regex sources carry extraction on their own.
    let extractor = Extractor::new(config.extraction, dictionary.clone())
        .with_metrics(Arc::new(chemtract::services::LogMetrics));
    let resolver = if cli.resolve {
        let registry = Arc::new(PubChemRegistry::new()?);
        let cache_ttl = config.resolver.cache_ttl_secs;
        Some(
            Resolver::new(config.resolver, dictionary.clone())
                .with_registry(registry)
                .with_cache(Arc::new(chemtract::cache::MemoryCache::new(cache_ttl))),
        )
    } else {
        None
    };
    let cancel = CancellationToken::new();

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("Failed to set progress bar style")
            .progress_chars("##-"),
    );

    let mut reports = Vec::new();
    let mut errors_count = 0;
    let mut error_details: Vec<String> = Vec::new();
    for path in &documents {
        let name = path.display().to_string();
        pb.set_message(format!("Processing: {name}"));
        match process_document(path, &extractor, resolver.as_ref(), cli.claim, &cancel).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                let message = format!("{name}: {e}");
                pb.println(format!("Error: {message}"));
                error!("{message}");
                error_details.push(message);
                errors_count += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Extraction complete.");

    if let Some(resolver) = &resolver {
        resolver.shutdown();
    }

    // 5. Report output
    let rendered = match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&reports)
            .map_err(|e| ChemError::InvalidInput(format!("report serialisation failed: {e}")))?,
        OutputFormat::Tsv => render_tsv(&reports)?,
    };
    match &cli.output {
        Some(path) => {
            let mut file = fs::File::create(path)?;
            file.write_all(rendered.as_bytes())?;
            file.write_all(b"\n")?;
            info!("Report written to {:?}", path);
        }
        None => println!("{rendered}"),
    }

    // Summary
    let total_entities: usize = reports.iter().map(|r| r.extraction.entities.len()).sum();
    let resolved_count: usize = reports
        .iter()
        .filter_map(|r| r.resolved.as_ref())
        .map(|resolved| resolved.iter().filter(|e| e.is_resolved).count())
        .sum();
    println!("\n--- Summary Report ---");
    println!("Documents processed: {}", reports.len());
    println!("Entities extracted: {total_entities}");
    if cli.resolve {
        println!("Entities resolved: {resolved_count}");
    }
    println!("Errors encountered: {errors_count}");
    if !error_details.is_empty() {
        println!("\n--- Detailed Errors ---");
        for detail in error_details {
            println!("- {detail}");
        }
    }
    println!("Total execution time: {:.2?}", start_time.elapsed());

    Ok(())
}

async fn process_document(
    path: &Path,
    extractor: &Extractor,
    resolver: Option<&Resolver>,
    claim: bool,
    cancel: &CancellationToken,
) -> Result<DocumentReport> {
    let text = fs::read_to_string(path)?;
    let (extraction, markush_mapping) = if claim {
        let claim_extraction = extractor.extract_from_claim(&text, &[], cancel).await?;
        (
            claim_extraction.result,
            Some(claim_extraction.markush_mapping),
        )
    } else {
        (extractor.extract(&text, cancel).await?, None)
    };
    let resolved = match resolver {
        Some(resolver) => {
            let results = resolver.resolve_batch(&extraction.entities, cancel).await?;
            let resolved: Vec<ResolvedEntity> = results
                .into_iter()
                .filter_map(|r| match r {
                    Ok(entity) => Some(entity),
                    Err(e) => {
                        warn!("resolution failed for one entity: {e}");
                        None
                    }
                })
                .collect();
            Some(resolved)
        }
        None => None,
    };
    Ok(DocumentReport {
        document: path.display().to_string(),
        extraction,
        resolved,
        markush_mapping,
    })
}

fn collect_documents(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(ChemError::InvalidInput(format!(
            "input path {input:?} is neither a file nor a directory"
        )));
    }
    let mut documents: Vec<PathBuf> = fs::read_dir(input)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    documents.sort();
    Ok(documents)
}

fn render_tsv(reports: &[DocumentReport]) -> Result<String> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(Vec::new());
    writer.write_record([
        "document",
        "text",
        "type",
        "start",
        "end",
        "confidence",
        "source",
        "nested",
        "canonical_name",
        "smiles",
    ])?;
    for report in reports {
        let resolved = report.resolved.as_deref().unwrap_or(&[]);
        for entity in &report.extraction.entities {
            let resolution = resolved
                .iter()
                .find(|r| r.raw.start == entity.start && r.raw.end == entity.end);
            let start = entity.start.to_string();
            let end = entity.end.to_string();
            let confidence = format!("{:.3}", entity.confidence);
            writer.write_record([
                report.document.as_str(),
                entity.text.as_str(),
                entity.entity_type.as_str(),
                start.as_str(),
                end.as_str(),
                confidence.as_str(),
                entity.source.as_str(),
                if entity.is_nested { "yes" } else { "no" },
                resolution.map(|r| r.canonical_name.as_str()).unwrap_or(""),
                resolution
                    .and_then(|r| r.smiles.as_deref())
                    .unwrap_or(""),
            ])?;
        }
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ChemError::InvalidInput(format!("TSV buffer error: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ChemError::InvalidInput(format!("TSV not UTF-8: {e}")))
}
