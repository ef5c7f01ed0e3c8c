//! Convertflow CLI: batch file conversion against the conversion API.
//!
//! Set CONVERTFLOW_API_URL (and CONVERTFLOW_API_KEY when the API requires
//! one). Results land in CONVERTFLOW_OUTPUT_DIR or the `--out` directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use convertflow_api_client::ApiClient;
use convertflow_cli::{init_tracing, parse_param, truncate_string};
use convertflow_core::models::{
    CandidateFile, ConversionParameters, ToolCategory, ToolSpec, UpscaleFactor,
};
use convertflow_core::{format_file_size, ClientConfig, ErrorMetadata, ToolCatalog};
use convertflow_services::{
    release_previews, FileIntake, IntakePolicy, NotificationLevel, SelectionMode, Workbench,
};
use convertflow_storage::{create_blob_store, BlobStore};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "convertflow", about = "Batch file conversion CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available tools
    Tools {
        /// Filter by category: image, ai, pdf, video, audio
        #[arg(long)]
        category: Option<ToolCategory>,
    },
    /// Convert one or more files with a tool
    Convert {
        /// Tool slug, e.g. avif-to-jpg
        tool: String,
        /// Input files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Allow several files in one run
        #[arg(long)]
        batch: bool,
        /// Output quality, 1-100
        #[arg(long)]
        quality: Option<u8>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Resize percentage, 1-500
        #[arg(long)]
        percentage: Option<u32>,
        /// Resize or crop mode
        #[arg(long)]
        mode: Option<String>,
        /// Keep the aspect ratio when resizing or cropping
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        keep_aspect: Option<bool>,
        /// Upscale factor: 2x, 4x or 8x
        #[arg(long)]
        factor: Option<UpscaleFactor>,
        /// Background type for background removal
        #[arg(long)]
        background: Option<String>,
        /// Background color as #rrggbb
        #[arg(long)]
        color: Option<String>,
        /// Extra tool parameter as key=value
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also package all results into the tool's ZIP archive
        #[arg(long)]
        zip: bool,
    },
    /// Run a report tool on one file and print its JSON
    Inspect {
        /// Report tool slug, e.g. transparent-background-preview
        tool: String,
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct ToolRow<'a> {
    slug: &'a str,
    category: ToolCategory,
    endpoint: &'a str,
    max_files: usize,
    max_file_size: String,
    accepts: String,
}

impl<'a> From<&'a ToolSpec> for ToolRow<'a> {
    fn from(tool: &'a ToolSpec) -> Self {
        Self {
            slug: &tool.slug,
            category: tool.category,
            endpoint: &tool.endpoint,
            max_files: tool.max_files,
            max_file_size: format_file_size(tool.max_file_size),
            accepts: truncate_string(&tool.accepted_types.join(", "), 60),
        }
    }
}

#[derive(Serialize)]
struct FailedRow<'a> {
    file: &'a str,
    error: &'a str,
}

#[derive(Serialize)]
struct ConvertReport<'a> {
    tool: &'a str,
    status: NotificationLevel,
    message: String,
    written: Vec<PathBuf>,
    archive: Option<PathBuf>,
    failed: Vec<FailedRow<'a>>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn read_candidate(path: &Path) -> anyhow::Result<CandidateFile> {
    let resolved = std::fs::canonicalize(path)
        .with_context(|| format!("Cannot open {}", path.display()))?;
    CandidateFile::from_path(&resolved).with_context(|| format!("Cannot read {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let config = ClientConfig::from_env().context("Invalid CONVERTFLOW_* configuration")?;
    config.validate()?;
    let catalog = config.load_catalog()?;

    match cli.command {
        Commands::Tools { category } => {
            let rows: Vec<ToolRow> = catalog.list(category).into_iter().map(ToolRow::from).collect();
            print_json(&rows)?;
        }
        Commands::Convert {
            tool,
            files,
            batch,
            quality,
            width,
            height,
            percentage,
            mode,
            keep_aspect,
            factor,
            background,
            color,
            params,
            out,
            zip,
        } => {
            let params = ConversionParameters {
                quality,
                width,
                height,
                percentage,
                mode,
                maintain_aspect_ratio: keep_aspect,
                upscale_factor: factor,
                background_type: background,
                background_color: color,
                extra: params.into_iter().collect(),
            };
            let out = out.unwrap_or_else(|| config.output_dir.clone());
            let selection = if batch {
                SelectionMode::Batch
            } else {
                SelectionMode::Single
            };
            convert(&config, &catalog, &tool, &files, selection, &params, out, zip).await?;
        }
        Commands::Inspect { tool, file } => {
            let tool = catalog.require(&tool)?;
            let store = create_blob_store(&config).await?;
            let client = ApiClient::from_config(&config)?;

            let intake = FileIntake::new(IntakePolicy::for_tool(tool, SelectionMode::Single));
            let admission = intake
                .admit(vec![read_candidate(&file)?], 0, store.as_ref())
                .await?;
            let result = match admission.files.first() {
                Some(selected) => client
                    .inspect(tool, selected, &ConversionParameters::default())
                    .await
                    .map_err(anyhow::Error::from),
                None => Err(anyhow::anyhow!("No file admitted")),
            };
            release_previews(&admission.files, store.as_ref()).await;
            print_json(&result?)?;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn convert(
    config: &ClientConfig,
    catalog: &ToolCatalog,
    slug: &str,
    files: &[PathBuf],
    selection: SelectionMode,
    params: &ConversionParameters,
    out: PathBuf,
    zip: bool,
) -> anyhow::Result<()> {
    let tool = catalog.require(slug)?.clone();
    let store: Arc<dyn BlobStore> = create_blob_store(config).await?;
    let client = Arc::new(ApiClient::from_config(config)?);

    let candidates = files
        .iter()
        .map(|p| read_candidate(p))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let bench = Workbench::new(tool, client, store, out);
    bench.set_mode(selection).await?;

    if let Some(warning) = bench.select(candidates).await? {
        tracing::warn!("{}", warning.message);
    }

    let note = match bench.convert(params).await {
        Ok(note) => note,
        Err(e) => {
            tracing::debug!(error = %e, "Conversion refused");
            bench.close().await;
            anyhow::bail!("{}", e.client_message());
        }
    };

    let written = bench.download_each().await?;
    let archive = if zip && bench.offers_archive().await {
        match bench.download_all().await {
            Ok((path, archived)) => {
                tracing::info!("{}", archived.message);
                Some(path)
            }
            Err(e) => {
                tracing::error!(error_code = e.error_code(), "{}", e.client_message());
                None
            }
        }
    } else {
        None
    };

    let outcome = bench.outcome().await;
    print_json(&ConvertReport {
        tool: &bench.tool().slug,
        status: note.level,
        message: note.message.clone(),
        written,
        archive,
        failed: outcome
            .failed()
            .iter()
            .map(|f| FailedRow {
                file: &f.source_name,
                error: &f.message,
            })
            .collect(),
    })?;

    bench.close().await;
    if note.level == NotificationLevel::Error {
        anyhow::bail!("{}", note.message);
    }
    Ok(())
}
