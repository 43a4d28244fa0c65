//! ReqForge CLI - Thin Control Surface
//!
//! Commands: libraries, generate, validate
//! Outputs JSON to stdout
//! Exit codes: 0 gate passed, 1 operational error, 2 strict gate failure,
//! 3 fail-on-warnings, 4 warning budget exceeded

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use reqforge_core::{
    library::BaselineRegistry,
    pipeline::{GenerateRequest, GenerationPipeline, RequirementsInstance},
    profile::Profile,
    report,
    validation::GatePolicy,
};

#[derive(Parser)]
#[command(name = "reqforge-cli")]
#[command(about = "ReqForge CLI - Deterministic Requirements Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to baseline libraries directory
    #[arg(short, long, default_value = "data", global = true)]
    libraries_dir: PathBuf,

    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List available baseline libraries
    Libraries,

    /// Generate a requirements instance for one component profile
    Generate(GenerateArgs),

    /// Re-run the quality gate on an existing instance document
    Validate(ValidateArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Baseline library id
    #[arg(short = 'L', long)]
    library: String,

    /// Path to the component profile JSON
    #[arg(short, long)]
    profile: PathBuf,

    /// Output path for the instance JSON
    #[arg(short, long)]
    out: PathBuf,

    /// Component kind (labeling defaults)
    #[arg(long, default_value = "valve")]
    component: String,

    /// Tag field inside the profile naming this instance
    #[arg(long)]
    tag_field: Option<String>,

    /// Exit non-zero if the quality gate reports errors
    #[arg(long)]
    strict: bool,

    /// Exit non-zero if any warnings are present
    #[arg(long)]
    fail_on_warnings: bool,

    /// Exit non-zero if warnings exceed this count
    #[arg(long)]
    max_warnings: Option<usize>,

    /// Optional path for a validation summary report (JSON)
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Optional path for a validation summary report (CSV)
    #[arg(long)]
    report_csv: Option<PathBuf>,

    /// Optional path for a row-per-finding CSV export
    #[arg(long)]
    findings_csv: Option<PathBuf>,

    /// Optional path for a row-per-requirement CSV export
    #[arg(long)]
    requirements_csv: Option<PathBuf>,
}

#[derive(Args)]
struct ValidateArgs {
    /// Path to a previously generated instance JSON
    #[arg(short, long)]
    instance: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let registry = match BaselineRegistry::load_from_dir(&cli.libraries_dir) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("failed to load baseline libraries: {e}");
            return ExitCode::FAILURE;
        }
    };
    let pipeline = GenerationPipeline::new(registry);

    let result = match cli.command {
        Commands::Libraries => run_libraries(&pipeline),
        Commands::Generate(args) => run_generate(&pipeline, &args),
        Commands::Validate(args) => run_validate(&pipeline, &args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_libraries(pipeline: &GenerationPipeline) -> anyhow::Result<u8> {
    let libraries: Vec<_> = pipeline
        .list_libraries()
        .iter()
        .map(|l| {
            serde_json::json!({
                "library_id": l.library_id,
                "name": l.name,
                "version": l.version,
                "engine_min_version": l.engine_min_version,
                "requirement_count": l.requirements.len(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&libraries)?);
    Ok(0)
}

fn run_generate(pipeline: &GenerationPipeline, args: &GenerateArgs) -> anyhow::Result<u8> {
    let content = fs::read_to_string(&args.profile)
        .with_context(|| format!("failed to read profile {}", args.profile.display()))?;
    let profile: Profile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse profile {}", args.profile.display()))?;

    let request = GenerateRequest {
        library_id: args.library.clone(),
        profile,
        component: Some(args.component.clone()),
        tag_field: args.tag_field.clone(),
    };

    let instance = pipeline.generate(&request)?;

    fs::write(&args.out, serde_json::to_string_pretty(&instance)?)
        .with_context(|| format!("failed to write instance {}", args.out.display()))?;
    println!(
        "Wrote: {} (applicable={})",
        args.out.display(),
        instance.summary.applicable_count
    );

    if args.report_json.is_some() || args.report_csv.is_some() {
        let summary = report::build_report(&instance);
        if let Some(path) = &args.report_json {
            report::write_report_json(&summary, path)?;
            println!("Wrote report (JSON): {}", path.display());
        }
        if let Some(path) = &args.report_csv {
            report::write_report_csv(&summary, path)?;
            println!("Wrote report (CSV): {}", path.display());
        }
    }
    if let Some(path) = &args.findings_csv {
        report::write_findings_csv(&instance, path)?;
        println!("Wrote findings (CSV): {}", path.display());
    }
    if let Some(path) = &args.requirements_csv {
        report::write_requirements_csv(&instance, path)?;
        println!("Wrote requirements (CSV): {}", path.display());
    }

    let policy = GatePolicy {
        strict: args.strict,
        fail_on_warnings: args.fail_on_warnings,
        max_warnings: args.max_warnings,
    };
    Ok(policy.verdict(&instance.validation).exit_code())
}

fn run_validate(pipeline: &GenerationPipeline, args: &ValidateArgs) -> anyhow::Result<u8> {
    let content = fs::read_to_string(&args.instance)
        .with_context(|| format!("failed to read instance {}", args.instance.display()))?;
    let instance: RequirementsInstance = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse instance {}", args.instance.display()))?;

    // Use the originating library's gate config when it is still
    // registered; otherwise fall back to defaults.
    let config = pipeline
        .get_library(&instance.library_id)
        .map(|l| l.validation.clone())
        .unwrap_or_default();

    let validation = pipeline.validate_instantiated(&instance.applicable_requirements, &config);
    println!("{}", serde_json::to_string_pretty(&validation)?);

    if validation.has_errors() {
        Ok(2)
    } else {
        Ok(0)
    }
}
