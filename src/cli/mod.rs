//! Command handlers behind the CLI surface.

use std::path::{Path, PathBuf};

use crate::audit::TracingAuditSink;
use crate::augment::{AugmentInput, Augmenter};
use crate::config::AppConfig;
use crate::document::CycloneDxDocument;
use crate::enrich::Enricher;
use crate::error::Result;
use crate::generate::{self, GenerationInput, SbomFormat};
use crate::license;
use crate::provider::CancelToken;
use crate::upload::{self, UploadInput};

/// Enrich every component of a CycloneDX document in place (or into
/// `output`), filling only fields the document does not already carry.
pub fn run_enrich(config: &AppConfig, sbom_path: &Path, output: Option<&Path>) -> Result<i32> {
    let mut document = CycloneDxDocument::from_path(sbom_path)?;
    let purls = document.component_purls();
    tracing::info!(
        components = purls.len(),
        sbom = %sbom_path.display(),
        "starting enrichment"
    );

    let enricher = Enricher::new(&config.enrichment)?;
    let sink = TracingAuditSink;
    let cancel = CancelToken::new();
    let (results, stats) = enricher.resolve_all(&purls, &sink, &cancel);
    stats.log_summary();

    let mut fields_written = 0;
    for (purl, metadata) in &results {
        if let Some(metadata) = metadata {
            fields_written += document.apply_component_metadata(purl, metadata);
        }
    }
    tracing::info!(fields_written, "applied merged metadata to document");

    document.write_to(output.unwrap_or(sbom_path))?;
    // Partial success is expected; only a fully empty batch with failures is
    // worth a non-zero exit.
    Ok(if stats.enriched == 0 && stats.failed > 0 { 1 } else { 0 })
}

/// Fill the document's top-level component from organizational sources.
pub fn run_augment(
    config: &AppConfig,
    sbom_path: &Path,
    root: &Path,
    output: Option<&Path>,
) -> Result<i32> {
    crate::augment::validate_root(root)?;
    let mut document = CycloneDxDocument::from_path(sbom_path)?;
    let (subject, _version) = document.subject();

    let input = AugmentInput::detect(root, subject)
        .with_component_id(config.augmentation.component_id.clone());
    let augmenter = Augmenter::new(&config.augmentation);
    let sink = TracingAuditSink;
    let cancel = CancelToken::new();

    match augmenter.resolve(&input, &sink, &cancel) {
        Ok(resolved) => {
            let written = document.apply_root_metadata(&resolved.value);
            tracing::info!(
                written,
                contributors = resolved.contributors.len(),
                "applied organizational metadata"
            );
        }
        Err(failure) => {
            // Nothing to add is a warning, not a failure: the document is
            // still valid without organizational extras.
            tracing::warn!("{failure}");
        }
    }

    document.write_to(output.unwrap_or(sbom_path))?;
    Ok(0)
}

/// Generate an SBOM from a lock file or container image.
pub fn run_generate(
    config: &AppConfig,
    lock_file: Option<PathBuf>,
    docker_image: Option<String>,
    output: PathBuf,
    format: SbomFormat,
    spec_version: Option<String>,
) -> Result<i32> {
    let input = match (lock_file, docker_image) {
        (Some(lock_file), None) => GenerationInput::for_lock_file(lock_file),
        (None, Some(image)) => GenerationInput::for_docker_image(image),
        (Some(_), Some(_)) => {
            return Err(crate::error::SbomResolverError::validation(
                "cannot specify both a lock file and a docker image",
            ))
        }
        (None, None) => {
            return Err(crate::error::SbomResolverError::validation(
                "must specify either a lock file or a docker image",
            ))
        }
    }
    .with_output_file(output)
    .with_format(format)
    .with_spec_version(spec_version);

    let sink = TracingAuditSink;
    let cancel = CancelToken::new();
    let report = generate::generate(&input, &config.generation, &sink, &cancel)?;
    println!(
        "Generated {} {} SBOM at {} (generator: {})",
        report.value.format, report.value.spec_version,
        report.value.output_file.display(),
        report.source.name
    );
    Ok(0)
}

/// Upload an SBOM to the first configured destination that accepts it.
pub fn run_upload(
    config: &AppConfig,
    sbom_path: PathBuf,
    format: SbomFormat,
    component_name: Option<String>,
    component_version: Option<String>,
) -> Result<i32> {
    let input = UploadInput::new(sbom_path, format).with_component(component_name, component_version);
    let sink = TracingAuditSink;
    let cancel = CancelToken::new();
    let receipt = upload::upload(&input, &config.upload, &sink, &cancel)?;
    match &receipt.value.location {
        Some(location) => println!("Uploaded via {} ({location})", receipt.source.name),
        None => println!("Uploaded via {}", receipt.source.name),
    }
    Ok(0)
}

/// List every registered provider per capability, in priority order.
pub fn run_sources(config: &AppConfig) -> Result<i32> {
    println!("Enrichment sources:");
    let enricher = Enricher::new(&config.enrichment)?;
    for info in enricher.sources() {
        println!("  {:>3}  {}", info.priority, info.name);
    }

    println!("\nAugmentation sources:");
    let augmenter = Augmenter::new(&config.augmentation);
    for info in augmenter.sources() {
        println!("  {:>3}  {}", info.priority, info.name);
    }

    println!("\nGenerators:");
    for info in generate::list_generators() {
        println!("  {:>3}  {}", info.priority, info.name);
    }

    println!("\nUpload destinations:");
    let destinations = upload::list_destinations(&config.upload);
    if destinations.is_empty() {
        println!("  (none configured)");
    }
    for info in destinations {
        println!("  {:>3}  {}", info.priority, info.name);
    }
    Ok(0)
}

/// Sanitize a license expression and report what changed.
pub fn run_license(expression: &str, json: bool) -> Result<i32> {
    let outcome = license::sanitize(expression);
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.expression);
        if outcome.was_modified {
            println!(
                "(modified; {} leaf{} repaired)",
                outcome.repaired_leaves,
                if outcome.repaired_leaves == 1 { "" } else { "s" }
            );
        }
    }
    Ok(0)
}
