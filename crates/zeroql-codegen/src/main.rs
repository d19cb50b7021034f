use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use zeroql_codegen::GenerateOptions;
use zeroql_resolver::{Program, Unit};
use zeroql_schema::Surface;

/// zeroql-codegen: typed GraphQL selectors for Rust
#[derive(Debug, Parser)]
#[command(name = "zeroql-codegen", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate the typed selector surface for a schema.
    Generate {
        /// GraphQL SDL file.
        #[arg(long)]
        schema: PathBuf,
        /// Rust file to write.
        #[arg(long)]
        output: PathBuf,
        /// Name of the generated client alias.
        #[arg(long, default_value = "GraphQLClient")]
        client_name: String,
    },
    /// Compile every `query!` and `mutation!` in the given sources and print
    /// the operations as JSON.
    Queries {
        /// GraphQL SDL file.
        #[arg(long)]
        schema: PathBuf,
        /// Rust source files.
        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Generate {
            schema,
            output,
            client_name,
        } => generate(&schema, &output, client_name),
        Command::Queries { schema, sources } => queries(&schema, &sources).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_schema(path: &Path) -> anyhow::Result<zeroql_schema::Schema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema {}", path.display()))?;
    zeroql_schema::parse(&text).with_context(|| format!("in {}", path.display()))
}

fn generate(schema_path: &Path, output: &Path, client_name: String) -> anyhow::Result<ExitCode> {
    let schema = load_schema(schema_path)?;
    let options = GenerateOptions {
        client_name,
        source: schema_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
    };
    let source = zeroql_codegen::generate(&schema, &options).context("rendering surface")?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(output, source).with_context(|| format!("writing {}", output.display()))?;
    tracing::info!(output = %output.display(), "generated surface");
    Ok(ExitCode::SUCCESS)
}

async fn queries(schema_path: &Path, sources: &[PathBuf]) -> anyhow::Result<ExitCode> {
    let schema = load_schema(schema_path)?;
    let mut program = Program::new(Surface::from_schema(&schema));
    for path in sources {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let unit = Unit::parse(path.display().to_string(), &text)
            .with_context(|| format!("parsing {}", path.display()))?;
        program.add_unit(unit);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let output = program.compile(&cancel).await;
    if cancel.is_cancelled() {
        bail!("interrupted");
    }

    println!("{}", serde_json::to_string_pretty(&output)?);

    let mut failed = false;
    for reported in output.diagnostics.iter().filter(|d| !d.diagnostic.is_cancelled()) {
        eprintln!("{}:{}", reported.unit, reported.diagnostic);
        failed = true;
    }
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
