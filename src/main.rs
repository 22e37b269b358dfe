use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use agent_story::api::{serve, AppState};
use agent_story::assist::StoryGenerator;
use agent_story::document::load_document;
use agent_story::export::{export_story, ExportFormat};
use agent_story::storage::{InMemoryStore, Storage};
use agent_story::validation::{parse_story, validate_partial_story, validate_skill, validate_story};
use agent_story::Config;

#[derive(Parser)]
#[command(name = "agent-story")]
#[command(about = "Author, validate and export Agent Story specifications", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file; environment variables override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a story (or a single skill) file
    Validate {
        #[arg(help = "JSON or YAML document")]
        file: PathBuf,
        /// Treat the document as a draft: only `name` is required
        #[arg(long, conflicts_with = "skill")]
        partial: bool,
        /// The document is a single skill rather than a story
        #[arg(long)]
        skill: bool,
    },
    /// Export a story to an agent harness format
    Export {
        file: PathBuf,
        #[arg(long, short)]
        format: String,
        #[arg(long, short, default_value = ".")]
        out: PathBuf,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long, short)]
        port: Option<u16>,
    },
    /// Draft a story from a description using the configured LLM
    Ideate {
        description: String,
        /// Write the draft here instead of printing it
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env(),
    };

    match cli.command {
        Commands::Validate {
            file,
            partial,
            skill,
        } => run_validate(&file, partial, skill)?,
        Commands::Export { file, format, out } => run_export(&file, &format, &out)?,
        Commands::Serve { port } => {
            let storage: Arc<dyn Storage> = Arc::new(InMemoryStore::new());
            serve(AppState { storage }, port.unwrap_or(config.port)).await?
        }
        Commands::Ideate { description, out } => {
            run_ideate(&config, &description, out.as_deref()).await?
        }
    }

    Ok(())
}

fn run_validate(file: &Path, partial: bool, skill: bool) -> Result<()> {
    let document = load_document(file)?;
    let result = if skill {
        validate_skill(&document)
    } else if partial {
        validate_partial_story(&document)
    } else {
        validate_story(&document)
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.valid {
        std::process::exit(1);
    }
    Ok(())
}

fn run_export(file: &Path, format: &str, out: &Path) -> Result<()> {
    let Some(format) = ExportFormat::from_str(format) else {
        let known: Vec<_> = ExportFormat::ALL.iter().map(|f| f.as_str()).collect();
        bail!("unknown format \"{}\"; expected one of {}", format, known.join(", "));
    };

    let document = load_document(file)?;
    let story = match parse_story(&document) {
        Ok(story) => story,
        Err(errors) => {
            for error in &errors {
                eprintln!("{}: {}", display_path(&error.path), error.message);
            }
            bail!("{} has {} structural error(s)", file.display(), errors.len());
        }
    };

    let bundle = export_story(&story, format)?;
    for warning in &bundle.warnings {
        eprintln!("warning: {}", warning);
    }
    let written = bundle
        .write_to(out)
        .with_context(|| format!("writing export to {}", out.display()))?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

async fn run_ideate(config: &Config, description: &str, out: Option<&Path>) -> Result<()> {
    let generator = StoryGenerator::new(config.llm_provider()?);
    let generated = generator.generate(description).await?;

    for error in &generated.validation.errors {
        eprintln!("error: {}: {}", display_path(&error.path), error.message);
    }
    for warning in &generated.validation.warnings {
        eprintln!("warning: {}: {}", display_path(&warning.path), warning.message);
    }

    let text = serde_json::to_string_pretty(&generated.draft)?;
    match out {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("Draft written to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}
