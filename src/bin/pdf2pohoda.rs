//! CLI binary for pdf2pohoda.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, loads `Settings` from the environment, and prints
//! per-file results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2pohoda::{
    resolve_input, BatchProgressCallback, ConversionConfig, Pipeline, ProgressCallback, Settings,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a log line per
/// finished file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the file currently being processed.
    started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut g| g.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_files} PDF file(s)…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, file: &str) {
        if let Ok(mut g) = self.started.lock() {
            *g = Some(Instant::now());
        }
        self.bar.set_message(file.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, xml_path: &str) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index + 1,
            total,
            xml_path,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, file: &str, error: &str) {
        let secs = self.elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);

        let first_line = error.lines().next().unwrap_or("");
        let msg = if first_line.chars().count() > 80 {
            let cut: String = first_line.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index + 1,
            total,
            file,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);

        if failed == 0 {
            eprintln!(
                "{} {} file(s) converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) converted  ({} failed, see error log)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one invoice (writes faktura.xml next to it)
  pdf2pohoda faktura.pdf

  # Convert every PDF in a directory
  pdf2pohoda ./invoices

  # Check the XML against a schema and push valid ones to Pohoda
  pdf2pohoda --validate --schema schema/invoice.xsd --submit ./invoices

  # Non-zero exit code when any file fails
  pdf2pohoda --fail-on-error ./invoices

ENVIRONMENT VARIABLES (required, may also come from .env):
  OPENAI_API_KEY     OpenAI API key
  POHODA_URL         Pohoda mServer URL
  POHODA_USERNAME    Pohoda user
  POHODA_PASSWORD    Pohoda password
  POHODA_AGENDA      Agenda (ledger) identifier sent with each import

OPTIONAL:
  PDFIUM_LIB_PATH    Directory containing libpdfium; system library otherwise
  RUST_LOG           Override log filtering
"#;

/// Convert PDF invoices to Pohoda issued-invoice XML using an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2pohoda",
    version,
    about = "Convert PDF invoices to Pohoda issued-invoice XML using an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// A PDF file, or a directory whose PDF files are converted.
    input: PathBuf,

    /// Chat model ID.
    #[arg(long, env = "PDF2POHODA_MODEL", default_value = pdf2pohoda::config::DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PDF2POHODA_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max output tokens per invoice (provider default if unset).
    #[arg(long, env = "PDF2POHODA_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2POHODA_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Validate each generated XML against the schema.
    #[arg(long, env = "PDF2POHODA_VALIDATE")]
    validate: bool,

    /// XSD used by --validate.
    #[arg(long, env = "PDF2POHODA_SCHEMA", default_value = pdf2pohoda::config::DEFAULT_SCHEMA_PATH)]
    schema: PathBuf,

    /// POST each generated XML to the Pohoda mServer.
    #[arg(long, env = "PDF2POHODA_SUBMIT")]
    submit: bool,

    /// Append-only error log.
    #[arg(long, env = "PDF2POHODA_LOG_FILE", default_value = pdf2pohoda::config::DEFAULT_LOG_PATH)]
    log_file: PathBuf,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Exit with a non-zero status if any file fails.
    #[arg(long, env = "PDF2POHODA_FAIL_ON_ERROR")]
    fail_on_error: bool,

    /// Print the batch report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2POHODA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2POHODA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2POHODA_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so `.env` values reach the `env = ...` flags too.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports each file; keep INFO logs out of its way.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Environment ──────────────────────────────────────────────────────
    // Nothing is opened or logged before every required value is present.
    let settings = Settings::from_env().context("Configuration error")?;

    let config = build_config(&cli).await?;

    // ── Input ────────────────────────────────────────────────────────────
    let input = resolve_input(&cli.input).context("Invalid input")?;

    // ── Pipeline ─────────────────────────────────────────────────────────
    let mut pipeline =
        Pipeline::from_config(&config, &settings).context("Failed to set up the pipeline")?;
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        pipeline = pipeline.with_progress(cb);
    }

    let report = pipeline.run(&input).await;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        for file in &report.files {
            match (file.output(), file.error()) {
                (Some(out), _) => eprintln!("{} {}", green("✓"), out.xml_path.display()),
                (None, Some(err)) => eprintln!("{} {}", red("✗"), err),
                (None, None) => {}
            }
        }
        eprintln!(
            "Converted {}/{} file(s) in {}ms",
            report.succeeded(),
            report.total(),
            report.total_duration_ms
        );
    }

    let flagged = report.needs_attention();
    if flagged > 0 && !cli.quiet && !cli.json {
        eprintln!(
            "{} {} converted file(s) failed validation or submission",
            cyan("⚠"),
            bold(&flagged.to_string())
        );
    }
    if (report.failed() > 0 || flagged > 0) && !cli.quiet {
        eprintln!(
            "{}",
            dim(&format!("Details logged to {}", config.log_path.display()))
        );
    }

    if config.fail_on_error {
        report.into_result().context("Batch finished with failures")?;
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .model(&cli.model)
        .temperature(cli.temperature)
        .validate(cli.validate)
        .schema_path(&cli.schema)
        .submit(cli.submit)
        .log_path(&cli.log_file)
        .fail_on_error(cli.fail_on_error);

    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(ref dir) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(dir);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}
