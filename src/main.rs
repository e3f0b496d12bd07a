mod archive;
mod document;
mod error;
mod extract;
mod naming;
mod pipeline;
mod server;
mod settings;
mod staging;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use extract::TitleRule;
use pipeline::{inspect_document, split_document, SplitOptions};
use settings::ServerSettings;

#[derive(Parser)]
#[command(
    name = "pdf_splitter",
    about = "Split a PDF into one file per page, named from each page's Name and Mobile#"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a PDF and write the ZIP archive of its pages
    Split {
        /// PDF to split
        input: PathBuf,
        /// Archive path (default: <input name>.zip in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        naming: NamingArgs,
    },
    /// Show the name, phone and file name each page would get
    Inspect {
        /// PDF to inspect
        input: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        naming: NamingArgs,
    },
    /// Serve the browser upload form
    Serve {
        /// Listen address (default: SPLITTER_BIND or 127.0.0.1:8501)
        #[arg(short, long)]
        bind: Option<String>,
        /// Largest accepted upload in MiB (default: SPLITTER_MAX_UPLOAD_MB or 50)
        #[arg(long)]
        max_upload_mb: Option<usize>,
        #[command(flatten)]
        naming: NamingArgs,
    },
}

/// `--title-rule` values.
#[derive(Clone, Copy, ValueEnum)]
enum TitleRuleArg {
    /// Replace the title text wherever it occurs, e.g. "DR_ John Smith"
    Literal,
    /// Prefix a period-terminated title, e.g. "DR_John Smith"
    Prefix,
}

impl From<TitleRuleArg> for TitleRule {
    fn from(arg: TitleRuleArg) -> Self {
        match arg {
            TitleRuleArg::Literal => TitleRule::Literal,
            TitleRuleArg::Prefix => TitleRule::Prefix,
        }
    }
}

#[derive(Args)]
struct NamingArgs {
    /// How a title such as "DR." is folded into the name
    #[arg(long, value_enum, default_value = "literal")]
    title_rule: TitleRuleArg,
    /// Keep extracted text verbatim in file names
    #[arg(long)]
    no_sanitize: bool,
}

impl NamingArgs {
    fn options(&self) -> SplitOptions {
        SplitOptions {
            title_rule: self.title_rule.into(),
            sanitize: !self.no_sanitize,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Split {
            input,
            output,
            naming,
        } => run_split(&input, output, &naming.options()),
        Commands::Inspect {
            input,
            json,
            naming,
        } => run_inspect(&input, json, &naming.options()),
        Commands::Serve {
            bind,
            max_upload_mb,
            naming,
        } => {
            let env = ServerSettings::from_env();
            let settings = ServerSettings {
                bind: bind.unwrap_or(env.bind),
                max_upload_mb: max_upload_mb.unwrap_or(env.max_upload_mb),
            };
            let router = server::build_router(naming.options(), settings.max_upload_bytes());
            server::start_server(&settings.bind, router)
                .await
                .with_context(|| format!("Server on {} failed", settings.bind))
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", elapsed_label(elapsed));
    }

    result
}

fn read_input(input: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))
}

fn run_split(input: &Path, output: Option<PathBuf>, options: &SplitOptions) -> anyhow::Result<()> {
    let bytes = read_input(input)?;
    let upload_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages")?
            .progress_chars("#>-"),
    );

    let outcome = split_document(&bytes, &upload_name, options, &pb)
        .with_context(|| format!("Failed to split {}", input.display()))?;

    let output = output.unwrap_or_else(|| PathBuf::from(&outcome.archive_name));
    std::fs::write(&output, &outcome.archive)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Split {} pages into {} ({} bytes)",
        outcome.pages.len(),
        output.display(),
        outcome.archive.len()
    );
    Ok(())
}

fn run_inspect(input: &Path, json: bool, options: &SplitOptions) -> anyhow::Result<()> {
    let bytes = read_input(input)?;
    let records = inspect_document(&bytes, options)
        .with_context(|| format!("Failed to read pages of {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No pages.");
        return Ok(());
    }

    println!(
        "{:>4} | {:<28} | {:<14} | {}",
        "Page", "Name", "Mobile", "File"
    );
    println!("{}", "-".repeat(90));
    for r in &records {
        println!(
            "{:>4} | {:<28} | {:<14} | {}",
            r.page_number,
            name_cell(&r.identity.display_name, 28),
            r.identity.phone,
            r.file_name.replace('\n', "\\n"),
        );
    }
    println!("\n{} pages", records.len());
    Ok(())
}

/// One table cell: line breaks flattened, cut to `width` chars with a
/// trailing `…` when longer.
fn name_cell(name: &str, width: usize) -> String {
    let flat = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= width {
        return flat;
    }
    let mut cell: String = flat.chars().take(width.saturating_sub(1)).collect();
    cell.push('…');
    cell
}

fn elapsed_label(d: Duration) -> String {
    match d.as_secs() {
        s if s < 60 => format!("{:.2}s", d.as_secs_f64()),
        s => format!("{}m{:02}s", s / 60, s % 60),
    }
}
