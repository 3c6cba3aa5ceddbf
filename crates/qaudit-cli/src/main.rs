//! QAudit CLI: run evidence processing against local files.
//!
//! Configuration comes from the environment (and `.env`); see `EvidenceProcessingConfig`.
//! Results are printed as JSON on stdout, logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use qaudit_cli::{print_json, LocalEvidenceRepository};
use qaudit_core::models::{ProcessingStats, ScanEngineKind};
use qaudit_core::{EvidenceProcessingConfig, OcrBackendKind};
use qaudit_infra::{init_telemetry, shutdown_telemetry};
use qaudit_processing::{EvidenceProcessor, Requester};
use qaudit_services::{
    search_text, DownloadUrlService, FileInput, TextExtractionService, VirusScanService,
};

#[derive(Parser)]
#[command(name = "qaudit", about = "QAudit evidence processing CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a file for malware
    Scan {
        file: PathBuf,
        /// Engine override: clamav, virustotal or hybrid
        #[arg(long)]
        engine: Option<ScanEngineKind>,
    },
    /// Extract text from an image or PDF
    Extract {
        file: PathBuf,
        /// OCR backend override: simulated or tesseract
        #[arg(long)]
        backend: Option<OcrBackendKind>,
    },
    /// Extract text and search it for a term
    Search {
        file: PathBuf,
        term: String,
    },
    /// Issue a signed download URL
    Presign {
        evidence_id: String,
        file_name: String,
        #[arg(long, default_value = "cli")]
        user: String,
        #[arg(long)]
        ip: Option<String>,
        /// Lifetime in seconds (defaults to SIGNED_URL_TTL_SECS)
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Process local files as a paced evidence batch
    Process {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Directory the files live under (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long, default_value = "cli")]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config =
        EvidenceProcessingConfig::from_env().context("Failed to load configuration")?;
    init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Scan { file, engine } => {
            if let Some(engine) = engine {
                config.scan.preferred_engine = engine;
            }
            let scanner = VirusScanService::from_config(config.scan);
            print_json(&scanner.scan(&FileInput::from_path(file)).await)?;
        }
        Commands::Extract { file, backend } => {
            if let Some(backend) = backend {
                config.extraction.backend = backend;
            }
            let extractor = TextExtractionService::from_config(config.extraction);
            let result = extractor.extract(&FileInput::from_path(file)).await;
            extractor.shutdown().await;
            print_json(&result)?;
        }
        Commands::Search { file, term } => {
            let extractor = TextExtractionService::from_config(config.extraction);
            let result = extractor.extract(&FileInput::from_path(file)).await;
            extractor.shutdown().await;
            if let Some(error) = &result.error {
                tracing::warn!(error = %error, "Extraction failed, nothing to search");
            }
            print_json(&search_text(&result, &term))?;
        }
        Commands::Presign {
            evidence_id,
            file_name,
            user,
            ip,
            ttl,
        } => {
            let downloads = DownloadUrlService::from_config(config.object_store).await?;
            let result = downloads
                .issue_download_url(
                    &evidence_id,
                    &file_name,
                    &user,
                    ip.as_deref(),
                    ttl.map(Duration::from_secs),
                )
                .await;
            print_json(&result)?;
        }
        Commands::Process { files, root, user } => {
            let root = match root {
                Some(root) => root,
                None => std::env::current_dir().context("Failed to read current directory")?,
            };
            let repository = LocalEvidenceRepository::new();
            let ids = repository.register_files(&root, &files)?;
            config.batch.storage_root = root;

            let extractor = Arc::new(TextExtractionService::from_config(config.extraction));
            let processor = EvidenceProcessor::new(
                Arc::new(repository),
                Arc::new(VirusScanService::from_config(config.scan)),
                Arc::clone(&extractor),
                Arc::new(DownloadUrlService::from_config(config.object_store).await?),
                config.batch,
            )
            .with_requester(Requester::new(user, None));

            let outcomes = processor.process_batch_evidence(&ids).await;
            processor.shutdown().await;

            let stats = ProcessingStats::from_outcomes(&outcomes);
            print_json(&json!({ "outcomes": outcomes, "stats": stats }))?;
        }
    }

    shutdown_telemetry().await;
    Ok(())
}
