//! press-digest: command-line entrypoint.
//! One subcommand per pipeline phase. On success the output path goes to
//! stdout (for chaining); logs and errors go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use press_digest::config::ai::GeneratorConfig;
use press_digest::config::PipelineConfig;
use press_digest::generation::{build_generator, RunOptions};
use press_digest::ingest::config::load_feeds_default;
use press_digest::pipeline::prompt::{EditoStyle, PromptVersion};
use press_digest::pipeline::{
    self, collect::build_providers, BilletOverrides, PhaseContext, ValidatePhase,
};
use press_digest::telemetry;

#[derive(Parser)]
#[command(name = "press-digest")]
#[command(about = "Daily press-review pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Web-search enrichment (best effort, writes [] on failure)
    Websearch,

    /// Feeds + enrichment → dedup, relevance, history, ranking → candidates
    Collect,

    /// Generate and validate the editorial batch from the candidates
    Editorial,

    /// Generate the social post from the editorial batch
    Social,

    /// Write a fresh opinion column from the editorial batch
    Billet {
        /// focused | angle | deep (default: EDITO_STYLE, then config)
        #[arg(long)]
        style: Option<String>,
        /// v1 | v2 (default: PROMPT_VERSION, then config)
        #[arg(long)]
        prompt_version: Option<String>,
        /// Output file (default: <pipeline_dir>/billet.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-validate a phase file and list every violation
    Validate {
        file: PathBuf,
        #[arg(long)]
        phase: ValidatePhase,
    },

    /// Add the current editorial batch to the edition manifest
    RecordEdition,
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional; a missing file is not an error.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();
    telemetry::ensure_described();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(Some(path)) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<Option<PathBuf>> {
    let config = PipelineConfig::load_default()?;

    if let Commands::Validate { file, phase } = &command {
        let errors = pipeline::validate_file(file, *phase, &config)?;
        if errors.is_empty() {
            return Ok(Some(file.clone()));
        }
        for e in &errors {
            eprintln!("  - {e}");
        }
        anyhow::bail!("{} validation error(s) in {}", errors.len(), file.display());
    }

    let ctx = PhaseContext::from_env(config);
    match command {
        Commands::Collect => {
            let feeds = load_feeds_default()?;
            let providers = build_providers(&ctx, &feeds)?;
            pipeline::run_collect(&ctx, &providers).await.map(Some)
        }
        Commands::Websearch => {
            let ai = GeneratorConfig::load_default()?;
            let generator = build_generator(&ai)?;
            let timeout = ai.timeout_for(pipeline::websearch::PHASE);
            pipeline::run_websearch(&ctx, generator.as_ref(), timeout)
                .await
                .map(Some)
        }
        Commands::Editorial => {
            let ai = GeneratorConfig::load_default()?;
            let generator = build_generator(&ai)?;
            let opts = RunOptions::new(
                ctx.config.retry,
                ai.timeout_for(pipeline::editorial::PHASE),
            );
            pipeline::run_editorial(&ctx, generator.as_ref(), opts)
                .await
                .map(Some)
        }
        Commands::Social => {
            let ai = GeneratorConfig::load_default()?;
            let generator = build_generator(&ai)?;
            let opts = RunOptions::new(ctx.config.retry, ai.timeout_for(pipeline::social::PHASE));
            pipeline::run_social(&ctx, generator.as_ref(), opts).await
        }
        Commands::Billet {
            style,
            prompt_version,
            output,
        } => {
            let ai = GeneratorConfig::load_default()?;
            let generator = build_generator(&ai)?;
            let opts = RunOptions::new(ctx.config.retry, ai.timeout_for(pipeline::billet::PHASE));
            let overrides = BilletOverrides {
                style: style.as_deref().map(EditoStyle::parse),
                version: prompt_version.as_deref().map(PromptVersion::parse),
                output,
            };
            pipeline::run_billet(&ctx, generator.as_ref(), opts, &overrides)
                .await
                .map(Some)
        }
        Commands::RecordEdition => pipeline::record_edition(&ctx).map(Some),
        Commands::Validate { .. } => Ok(None),
    }
}
