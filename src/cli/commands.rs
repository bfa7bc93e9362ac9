//! CLI command definitions for runtime-forge.
//!
//! `build` renders the Dockerfile chains and the build summary, `list` shows
//! the runtime catalog, `matrix` derives the CI build matrix from a summary,
//! `catalog fetch` refreshes the cached catalog and `templates` shows or
//! exports the Dockerfile templates.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{Catalog, CatalogFetcher, CACHED_CATALOG_FILE, DEFAULT_FETCH_TIMEOUT_SECS};
use crate::config::ForgeConfig;
use crate::pipeline::BuildPipeline;
use crate::resolver::ResolveRequest;
use crate::summary::{BuildMatrix, BuildSummary, MatrixFilter};
use crate::template::{TemplateSet, TEMPLATE_FILE_SUFFIX};

/// Environment variable holding the registry repository for image tags.
const REGISTRY_ENV: &str = "DBX_RUNTIME_REGISTRY";

/// Dockerfile generator for Databricks-style runtime images.
#[derive(Parser)]
#[command(name = "runtime-forge")]
#[command(about = "Generate Databricks-style runtime Dockerfile chains and build manifests")]
#[command(version)]
#[command(
    long_about = "runtime-forge renders the minimal -> standard -> python image chain (and its GPU counterpart) for every supported runtime release, plus a build_summary.json manifest for CI.\n\nExample usage:\n  runtime-forge build -r \"15.4 LTS\" -t python\n  runtime-forge matrix --lts-only --latest-lts 2"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// YAML configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Render Dockerfiles, metadata and the build summary.
    #[command(alias = "gen")]
    Build(BuildArgs),

    /// List runtime releases in the catalog.
    #[command(alias = "ls")]
    List(ListArgs),

    /// Print the CI build matrix derived from a build summary.
    Matrix(MatrixArgs),

    /// Manage the runtime catalog.
    Catalog(CatalogArgs),

    /// Show or export the Dockerfile templates.
    Templates(TemplatesArgs),
}

/// Arguments for `runtime-forge build`.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Output directory (defaults to the configured output_dir).
    #[arg(short = 'o', long)]
    pub output: Option<String>,

    /// Only build this runtime version (exact label, e.g. "15.4 LTS").
    #[arg(short = 'r', long)]
    pub runtime: Option<String>,

    /// Only build this image type (e.g. python, standard-gpu).
    #[arg(short = 't', long)]
    pub image_type: Option<String>,

    /// Build every image on this Ubuntu version instead of the default.
    #[arg(long)]
    pub force_os_version: Option<String>,

    /// Catalog file (.json, .yaml or .yml).
    #[arg(long)]
    pub catalog: Option<String>,

    /// Directory of <image-type>.Dockerfile.tera template overrides.
    #[arg(long)]
    pub templates_dir: Option<String>,

    /// Registry repository used in image tags.
    #[arg(long, env = REGISTRY_ENV)]
    pub registry: Option<String>,

    /// Only build the N most recent LTS releases.
    #[arg(long)]
    pub latest_lts: Option<usize>,

    /// Skip ML variants.
    #[arg(long)]
    pub skip_ml: bool,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `runtime-forge list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Catalog file (.json, .yaml or .yml).
    #[arg(long)]
    pub catalog: Option<String>,

    /// Output directory holding a cached catalog.
    #[arg(short = 'o', long)]
    pub output: Option<String>,

    /// Only list LTS releases.
    #[arg(long)]
    pub lts_only: bool,

    /// Output JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `runtime-forge matrix`.
#[derive(Parser, Debug)]
pub struct MatrixArgs {
    /// Build summary to read (defaults to <output_dir>/build_summary.json).
    #[arg(short = 's', long)]
    pub summary: Option<String>,

    /// Only include LTS runtimes.
    #[arg(long)]
    pub lts_only: bool,

    /// Only include this image type.
    #[arg(short = 't', long)]
    pub image_type: Option<String>,

    /// Only include the N newest runtimes.
    #[arg(long)]
    pub latest_lts: Option<usize>,

    /// Write the matrix to this file instead of stdout.
    #[arg(short = 'w', long)]
    pub write: Option<String>,
}

/// Arguments for `runtime-forge catalog`.
#[derive(Parser, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogSubcommand,
}

/// Catalog subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum CatalogSubcommand {
    /// Download a catalog and cache it in the output directory.
    Fetch(CatalogFetchArgs),
}

/// Arguments for `runtime-forge catalog fetch`.
#[derive(Parser, Debug)]
pub struct CatalogFetchArgs {
    /// URL of a catalog JSON document.
    pub url: String,

    /// Where to write the catalog (defaults to <output_dir>/catalog.json).
    #[arg(short = 'o', long)]
    pub output: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `runtime-forge templates`.
#[derive(Parser, Debug)]
pub struct TemplatesArgs {
    /// Directory of template overrides to apply before listing.
    #[arg(long)]
    pub templates_dir: Option<String>,

    /// Write every template to this directory as <image-type>.Dockerfile.tera.
    #[arg(long)]
    pub export: Option<String>,

    /// Output JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// For more control over logging initialization, use `parse_cli()` and `run_with_cli()`.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Build(args) => run_build_command(config, args).await,
        Commands::List(args) => run_list_command(config, args).await,
        Commands::Matrix(args) => run_matrix_command(config, args).await,
        Commands::Catalog(args) => match args.command {
            CatalogSubcommand::Fetch(args) => run_catalog_fetch_command(config, args).await,
        },
        Commands::Templates(args) => run_templates_command(config, args).await,
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<ForgeConfig> {
    match path {
        Some(path) => Ok(ForgeConfig::load(Path::new(path))?),
        None => Ok(ForgeConfig::default()),
    }
}

/// Picks the catalog: an explicit file, then the cached download, then the built-in table.
fn load_catalog(explicit: Option<&str>, data_dir: &Path) -> anyhow::Result<Catalog> {
    if let Some(path) = explicit {
        return Catalog::load(Path::new(path))
            .with_context(|| format!("Failed to load catalog from {path}"));
    }

    let cached = data_dir.join(CACHED_CATALOG_FILE);
    if cached.is_file() {
        info!(path = %cached.display(), "Using cached runtime catalog");
        return Catalog::load(&cached)
            .with_context(|| format!("Failed to load cached catalog {}", cached.display()));
    }

    Ok(Catalog::builtin())
}

// ============================================================================
// Build
// ============================================================================

#[derive(Debug, Serialize)]
struct BuildOutput {
    status: String,
    output_dir: String,
    summary_path: String,
    targets: usize,
    os_upgrades: usize,
    image_types: Vec<String>,
}

async fn run_build_command(config: ForgeConfig, args: BuildArgs) -> anyhow::Result<()> {
    let mut config = config;
    if let Some(output) = args.output {
        config = config.with_output_dir(output);
    }
    if let Some(dir) = args.templates_dir {
        config = config.with_templates_dir(Some(PathBuf::from(dir)));
    }
    if args.registry.is_some() {
        config = config.with_registry(args.registry);
    }
    if args.latest_lts.is_some() {
        config = config.with_latest_lts_count(args.latest_lts);
    }
    if args.skip_ml {
        config = config.with_include_ml(false);
    }
    config.validate()?;

    let catalog = load_catalog(args.catalog.as_deref(), &config.output_dir)?;
    let pipeline = BuildPipeline::new(config, catalog)?;

    let mut request = ResolveRequest::new();
    request.runtime = args.runtime;
    request.image_type = args.image_type;
    request.forced_os_version = args.force_os_version;

    let report = pipeline.run(&request)?;

    let output = BuildOutput {
        status: "success".to_string(),
        output_dir: pipeline.config().output_dir.display().to_string(),
        summary_path: report.summary_path.display().to_string(),
        targets: report.written,
        os_upgrades: report.os_upgrades,
        image_types: report.summary.image_types.clone(),
    };

    if args.json {
        let json_output = serde_json::to_string_pretty(&output)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
        return Ok(());
    }

    println!(
        "Generated {} Dockerfiles in {}",
        output.targets, output.output_dir
    );
    for entry in &report.summary.include {
        println!(
            "  {:<14} {:<12} {:<4} {}",
            entry.image_type,
            entry.runtime,
            if entry.variant.is_empty() { "-" } else { "ml" },
            entry.tag
        );
    }
    if output.os_upgrades > 0 {
        println!(
            "{} runtime(s) upgraded to Ubuntu {}",
            output.os_upgrades,
            pipeline.config().default_os_version
        );
    }
    println!("Build summary: {}", output.summary_path);
    Ok(())
}

// ============================================================================
// List
// ============================================================================

async fn run_list_command(config: ForgeConfig, args: ListArgs) -> anyhow::Result<()> {
    let data_dir = args
        .output
        .map(PathBuf::from)
        .unwrap_or_else(|| config.output_dir.clone());
    let mut catalog = load_catalog(args.catalog.as_deref(), &data_dir)?;
    if args.lts_only {
        catalog = catalog.lts_only();
    }

    if args.json {
        println!("{}", catalog.to_json()?);
        return Ok(());
    }

    println!(
        "{:<12} {:<8} {:<8} {:<5} {:<5} {}",
        "VERSION", "OS", "PYTHON", "LTS", "ML", "SPARK"
    );
    for release in catalog.iter() {
        println!(
            "{:<12} {:<8} {:<8} {:<5} {:<5} {}",
            release.version,
            release.os_version,
            release.python_version,
            if release.is_lts { "yes" } else { "no" },
            if release.has_ml_variant { "yes" } else { "no" },
            release.spark_version.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

// ============================================================================
// Matrix
// ============================================================================

async fn run_matrix_command(config: ForgeConfig, args: MatrixArgs) -> anyhow::Result<()> {
    let summary_path = args
        .summary
        .map(PathBuf::from)
        .unwrap_or_else(|| BuildSummary::path_in(&config.output_dir));
    let summary = BuildSummary::load(&summary_path)?;

    let filter = MatrixFilter::default()
        .with_lts_only(args.lts_only)
        .with_image_type(args.image_type)
        .with_latest_lts_count(args.latest_lts);
    let matrix = BuildMatrix::from_summary(&summary, &filter);
    if matrix.is_empty() {
        warn!(summary = %summary_path.display(), "Build matrix is empty");
    }

    let json_output = serde_json::to_string(&matrix)
        .map_err(|e| anyhow::anyhow!("Failed to serialize build matrix: {}", e))?;

    match args.write {
        Some(path) => {
            fs::write(&path, format!("{json_output}\n"))
                .with_context(|| format!("Failed to write build matrix to {path}"))?;
            info!(path = %path, entries = matrix.len(), "Wrote build matrix");
        }
        None => println!("{}", json_output),
    }
    Ok(())
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Serialize)]
struct CatalogFetchOutput {
    status: String,
    url: String,
    path: String,
    releases: usize,
    lts_releases: usize,
}

async fn run_catalog_fetch_command(
    config: ForgeConfig,
    args: CatalogFetchArgs,
) -> anyhow::Result<()> {
    let path = args
        .output
        .map(PathBuf::from)
        .unwrap_or_else(|| config.output_dir.join(CACHED_CATALOG_FILE));

    let fetcher = CatalogFetcher::with_timeout(Duration::from_secs(args.timeout));
    let catalog = fetcher.fetch_to(&args.url, &path).await?;

    let output = CatalogFetchOutput {
        status: "success".to_string(),
        url: args.url,
        path: path.display().to_string(),
        releases: catalog.len(),
        lts_releases: catalog.lts_only().len(),
    };

    if args.json {
        let json_output = serde_json::to_string_pretty(&output)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
    } else {
        println!(
            "Cached {} releases ({} LTS) to {}",
            output.releases, output.lts_releases, output.path
        );
    }
    Ok(())
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Debug, Serialize)]
struct TemplateListEntry {
    image_type: String,
    origin: String,
    parent: Option<String>,
}

async fn run_templates_command(config: ForgeConfig, args: TemplatesArgs) -> anyhow::Result<()> {
    let config = match args.templates_dir {
        Some(dir) => config.with_templates_dir(Some(PathBuf::from(dir))),
        None => config,
    };
    let pipeline = BuildPipeline::new(config, Catalog::builtin())?;
    let templates: &TemplateSet = pipeline.templates();

    if let Some(dir) = args.export {
        let dir = PathBuf::from(dir);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        for template in templates.iter() {
            let path = dir.join(format!("{}{}", template.image_type, TEMPLATE_FILE_SUFFIX));
            fs::write(&path, &template.source)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        info!(dir = %dir.display(), count = templates.len(), "Exported Dockerfile templates");
    }

    let entries: Vec<TemplateListEntry> = templates
        .iter()
        .map(|t| TemplateListEntry {
            image_type: t.image_type.clone(),
            origin: t.origin.to_string(),
            parent: pipeline
                .image_types()
                .get(&t.image_type)
                .and_then(|spec| spec.parent.clone()),
        })
        .collect();

    if args.json {
        let json_output = serde_json::to_string_pretty(&entries)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{:<14} {:<14} {}",
            entry.image_type,
            entry.parent.as_deref().unwrap_or("-"),
            entry.origin
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_command_defaults() {
        let cli = Cli::try_parse_from(["runtime-forge", "build"]).expect("should parse");
        assert_eq!(cli.log_level, "info");
        assert!(cli.config.is_none());

        match cli.command {
            Commands::Build(args) => {
                assert!(args.output.is_none());
                assert!(args.runtime.is_none());
                assert!(args.image_type.is_none());
                assert!(args.force_os_version.is_none());
                assert!(args.latest_lts.is_none());
                assert!(!args.skip_ml);
                assert!(!args.json);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_build_command_with_all_options() {
        let cli = Cli::try_parse_from([
            "runtime-forge",
            "build",
            "-o",
            "./out",
            "-r",
            "15.4 LTS",
            "-t",
            "python",
            "--force-os-version",
            "22.04",
            "--catalog",
            "catalog.yaml",
            "--templates-dir",
            "templates",
            "--registry",
            "ghcr.io/acme/runtime",
            "--latest-lts",
            "2",
            "--skip-ml",
            "-j",
            "--log-level",
            "debug",
        ])
        .expect("should parse");
        assert_eq!(cli.log_level, "debug");

        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.output.as_deref(), Some("./out"));
                assert_eq!(args.runtime.as_deref(), Some("15.4 LTS"));
                assert_eq!(args.image_type.as_deref(), Some("python"));
                assert_eq!(args.force_os_version.as_deref(), Some("22.04"));
                assert_eq!(args.catalog.as_deref(), Some("catalog.yaml"));
                assert_eq!(args.templates_dir.as_deref(), Some("templates"));
                assert_eq!(args.registry.as_deref(), Some("ghcr.io/acme/runtime"));
                assert_eq!(args.latest_lts, Some(2));
                assert!(args.skip_ml);
                assert!(args.json);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_aliases_and_subcommands() {
        let cli = Cli::try_parse_from(["runtime-forge", "gen", "-t", "minimal"]).expect("alias");
        assert!(matches!(cli.command, Commands::Build(_)));

        let cli = Cli::try_parse_from(["runtime-forge", "ls", "--lts-only"]).expect("alias");
        assert!(matches!(cli.command, Commands::List(ListArgs { lts_only: true, .. })));

        let cli = Cli::try_parse_from([
            "runtime-forge",
            "catalog",
            "fetch",
            "https://example.com/catalog.json",
        ])
        .expect("catalog fetch");
        match cli.command {
            Commands::Catalog(CatalogArgs {
                command: CatalogSubcommand::Fetch(args),
            }) => {
                assert_eq!(args.url, "https://example.com/catalog.json");
                assert_eq!(args.timeout, DEFAULT_FETCH_TIMEOUT_SECS);
            }
            _ => panic!("Expected catalog fetch"),
        }
    }

    #[test]
    fn test_catalog_fetch_requires_url() {
        assert!(Cli::try_parse_from(["runtime-forge", "catalog", "fetch"]).is_err());
    }

    #[test]
    fn test_load_catalog_prefers_cache_over_builtin() {
        let dir = TempDir::new().expect("temp dir");
        let builtin = load_catalog(None, dir.path()).expect("builtin");
        assert_eq!(builtin, Catalog::builtin());

        let cached = Catalog::builtin().lts_only();
        cached
            .save(&dir.path().join(CACHED_CATALOG_FILE))
            .expect("save cache");
        let loaded = load_catalog(None, dir.path()).expect("cached");
        assert_eq!(loaded, cached);

        assert!(load_catalog(Some("/nonexistent/catalog.json"), dir.path()).is_err());
    }

    #[tokio::test]
    async fn test_build_then_matrix() {
        let dir = TempDir::new().expect("temp dir");
        let out = dir.path().to_string_lossy().to_string();

        let cli = Cli::try_parse_from([
            "runtime-forge",
            "build",
            "-o",
            out.as_str(),
            "-r",
            "15.4 LTS",
            "-j",
        ])
        .expect("should parse");
        run_with_cli(cli).await.expect("build succeeds");

        assert!(dir.path().join("standard/latest/Dockerfile").is_file());
        assert!(dir
            .path()
            .join("python-gpu/15.4-LTS-ubuntu2404-py311/Dockerfile.ml")
            .is_file());

        let matrix_path = dir.path().join("matrix.json");
        let summary_path = dir.path().join("build_summary.json");
        let cli = Cli::try_parse_from([
            "runtime-forge",
            "matrix",
            "-s",
            summary_path.to_str().expect("utf-8 path"),
            "-t",
            "python",
            "-w",
            matrix_path.to_str().expect("utf-8 path"),
        ])
        .expect("should parse");
        run_with_cli(cli).await.expect("matrix succeeds");

        let matrix: BuildMatrix =
            serde_json::from_str(&fs::read_to_string(&matrix_path).expect("read matrix"))
                .expect("matrix parses");
        assert_eq!(matrix.len(), 2);
        assert!(matrix.include.iter().all(|e| e.runtime == "15.4 LTS"));
    }

    #[tokio::test]
    async fn test_templates_export() {
        let dir = TempDir::new().expect("temp dir");
        let export = dir.path().join("templates");

        let cli = Cli::try_parse_from([
            "runtime-forge",
            "templates",
            "--export",
            export.to_str().expect("utf-8 path"),
            "-j",
        ])
        .expect("should parse");
        run_with_cli(cli).await.expect("export succeeds");

        assert!(export.join("python.Dockerfile.tera").is_file());
        assert!(export.join("gpu.Dockerfile.tera").is_file());

        let mut reloaded = TemplateSet::new();
        assert_eq!(reloaded.load_directory(&export).expect("reload"), 7);
    }

    #[tokio::test]
    async fn test_matrix_without_summary_fails() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("build_summary.json");
        let cli = Cli::try_parse_from([
            "runtime-forge",
            "matrix",
            "-s",
            missing.to_str().expect("utf-8 path"),
        ])
        .expect("should parse");

        let err = run_with_cli(cli).await.unwrap_err();
        assert!(err.to_string().contains("Run build first"));
    }
}
