//! CLI binary for kb-ingest.
//!
//! A thin shim over the library crate that maps CLI flags (and the job's
//! environment variables) to `IngestConfig` and prints the run report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use kb_ingest::{
    html_to_markdown, run, DirSecretStore, EnvSecretStore, FetchWindow, IngestConfig,
    IngestProgressCallback, IngestReport, ProgressCallback, SecretStore, SourceKind, SourceReport,
    WikiRoot, WikiScope,
};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar per source, reused between sources.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn counted_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} records  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS)
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {pos} pages  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS)
    }
}

impl IngestProgressCallback for CliProgressCallback {
    fn on_source_start(&self, source: SourceKind, total: Option<usize>) {
        self.bar.reset();
        self.bar.set_prefix(source.to_string());
        match total {
            Some(n) => {
                self.bar.set_style(Self::counted_style());
                self.bar.set_length(n as u64);
            }
            None => self.bar.set_style(Self::spinner_style()),
        }
    }

    fn on_record_complete(&self, _source: SourceKind, id: &str, _path: &Path) {
        self.bar.set_message(id.to_string());
        self.bar.inc(1);
    }

    fn on_record_error(&self, source: SourceKind, id: &str, error: &str) {
        let msg = match error.char_indices().nth(80) {
            Some((idx, _)) => format!("{}\u{2026}", &error[..idx]),
            None => error.to_string(),
        };
        self.bar
            .println(format!("  {} {} {}  {}", red("✗"), source, id, red(&msg)));
        self.bar.inc(1);
    }

    fn on_source_complete(&self, source: SourceKind, written: usize, failed: usize) {
        let mark = if failed == 0 { green("✔") } else { cyan("⚠") };
        self.bar.println(format!(
            "{} {:<10} {} written{}",
            mark,
            source.to_string(),
            bold(&written.to_string()),
            if failed > 0 {
                format!("  ({} failed)", red(&failed.to_string()))
            } else {
                String::new()
            }
        ));
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Last 24 hours of Q&A content plus two wiki trees
  kb-ingest --wiki-root 892986628=tfe --wiki-root 1521043813=gitlab

  # Full backfill of questions only
  kb-ingest --initial-load --source questions

  # Everything created since a Unix timestamp, keys read from mounted secrets
  kb-ingest --from-date 1717200000 --secrets-dir /run/secrets \
      --qa-api-key-param qa/api-key --wiki-api-key-param wiki/token

  # Convert one HTML file (no network)
  kb-ingest --convert body.html
  curl -s https://example.com/page.html | kb-ingest --convert -

  # Machine-readable run report
  kb-ingest --json > report.json

OUTPUT LAYOUT:
  <output-dir>/articles/<article_id>.json
  <output-dir>/questions/<question_id>.json
  <wiki-output-dir>/<classifier>/<Page_Title>.json   (default <output-dir>/confluence)

ENVIRONMENT VARIABLES:
  STACKOVERFLOW_API_URL         Q&A API base URL
  STACKOVERFLOW_API_KEY         Q&A API key
  STACKOVERFLOW_API_KEY_PARAM   Secret name holding the Q&A API key
  CONFLUENCE_API_URL            Wiki base URL
  CONFLUENCE_API_KEY            Wiki bearer token
  CONFLUENCE_API_KEY_PARAM      Secret name holding the wiki token
  SSM_OVERRIDE                  "true": use the *_API_KEY values, ignore *_PARAM names
  RAW_OUTPUT_DIR                Output root (default /tmp)
  CONFLUENCE_OUTPUT_DIR         Wiki output root
  CERT_PATH                     Extra PEM root certificate
  RUST_LOG                      Log filter, overrides -v / -q
"#;

/// Ingest Q&A and wiki content as Markdown JSON records.
#[derive(Parser, Debug)]
#[command(
    name = "kb-ingest",
    version,
    about = "Ingest Q&A and wiki content as Markdown JSON records",
    long_about = "Fetch articles and questions from a Q&A API and page trees from a wiki API, \
keep the records tagged with topics of interest, convert their HTML bodies to Markdown, and \
write one JSON file per record for a knowledge-base indexer.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Convert one HTML file ('-' for stdin) to Markdown and exit.
    #[arg(long, value_name = "FILE")]
    convert: Option<String>,

    /// Ingest everything, ignoring any time window.
    #[arg(long, env = "KB_INITIAL_LOAD", conflicts_with_all = ["from_date", "since_hours"])]
    initial_load: bool,

    /// Only items created at or after this Unix timestamp.
    #[arg(long, env = "KB_FROM_DATE", value_name = "TS", conflicts_with = "since_hours")]
    from_date: Option<i64>,

    /// Only items created in the last N hours.
    #[arg(long, env = "KB_SINCE_HOURS", value_name = "H", default_value_t = 24)]
    since_hours: u32,

    /// Sources to ingest (repeatable). Default: articles, questions, and wiki
    /// when wiki pages are given.
    #[arg(long = "source", value_enum, value_name = "SOURCE")]
    sources: Vec<SourceArg>,

    /// Output root for Q&A records.
    #[arg(short, long, env = "RAW_OUTPUT_DIR", default_value = "/tmp")]
    output_dir: PathBuf,

    /// Output root for wiki pages. Default: <output-dir>/confluence.
    #[arg(long, env = "CONFLUENCE_OUTPUT_DIR")]
    wiki_output_dir: Option<PathBuf>,

    /// Q&A API base URL.
    #[arg(long, env = "STACKOVERFLOW_API_URL")]
    qa_api_url: Option<String>,

    /// Q&A API key.
    #[arg(long, env = "STACKOVERFLOW_API_KEY", hide_env_values = true)]
    qa_api_key: Option<String>,

    /// Secret name holding the Q&A API key.
    #[arg(long, env = "STACKOVERFLOW_API_KEY_PARAM")]
    qa_api_key_param: Option<String>,

    /// Wiki base URL.
    #[arg(long, env = "CONFLUENCE_API_URL")]
    wiki_api_url: Option<String>,

    /// Wiki bearer token.
    #[arg(long, env = "CONFLUENCE_API_KEY", hide_env_values = true)]
    wiki_api_key: Option<String>,

    /// Secret name holding the wiki token.
    #[arg(long, env = "CONFLUENCE_API_KEY_PARAM")]
    wiki_api_key_param: Option<String>,

    /// Use the API keys given directly and ignore secret names.
    #[arg(long, env = "SSM_OVERRIDE")]
    keys_from_env: bool,

    /// Read named secrets from files in this directory instead of environment variables.
    #[arg(long, env = "KB_SECRETS_DIR")]
    secrets_dir: Option<PathBuf>,

    /// Extra PEM root certificate for internal endpoints.
    #[arg(long, env = "CERT_PATH")]
    cert_path: Option<PathBuf>,

    /// Tag to keep (repeatable). Default: the built-in topic list.
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// Wiki page whose descendants are ingested, as PAGE_ID=CLASSIFIER (repeatable).
    #[arg(long = "wiki-root", value_name = "ID=CLASS")]
    wiki_roots: Vec<String>,

    /// Single wiki page to ingest, as PAGE_ID=CLASSIFIER (repeatable).
    #[arg(long = "wiki-page", value_name = "ID=CLASS")]
    wiki_pages: Vec<String>,

    /// Items per listing page.
    #[arg(long, env = "KB_PAGE_SIZE", default_value_t = 100,
          value_parser = clap::value_parser!(u32).range(1..=100))]
    page_size: u32,

    /// Ids per by-id request.
    #[arg(long, env = "KB_BATCH_SIZE", default_value_t = 25)]
    batch_size: usize,

    /// Stop each listing after this many pages.
    #[arg(long, env = "KB_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Concurrent by-id requests.
    #[arg(short, long, env = "KB_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Per-request timeout in seconds.
    #[arg(long, env = "KB_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "KB_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "KB_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "KB_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "KB_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SourceArg {
    Articles,
    Questions,
    Wiki,
}

impl From<SourceArg> for SourceKind {
    fn from(v: SourceArg) -> Self {
        match v {
            SourceArg::Articles => SourceKind::Articles,
            SourceArg::Questions => SourceKind::Questions,
            SourceArg::Wiki => SourceKind::Wiki,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level logs unless --verbose is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.convert.is_none();
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

    // ── Convert-only mode ────────────────────────────────────────────────
    if let Some(ref input) = cli.convert {
        let html = read_input(input)?;
        let markdown = html_to_markdown(&html);
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(markdown.as_bytes())
            .context("Failed to write to stdout")?;
        if !markdown.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn IngestProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let secrets: Box<dyn SecretStore> = match cli.secrets_dir {
        Some(ref dir) => Box::new(DirSecretStore::new(dir)),
        None => Box::new(EnvSecretStore),
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run(&config, secrets.as_ref())
        .await
        .context("Ingestion failed")?;
    drop(config);

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report);
    }

    Ok(())
}

/// Map CLI args to `IngestConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<IngestConfig> {
    let window = if cli.initial_load {
        FetchWindow::InitialLoad
    } else if let Some(ts) = cli.from_date {
        FetchWindow::Since(ts)
    } else {
        FetchWindow::LastHours(cli.since_hours)
    };

    let mut roots = Vec::with_capacity(cli.wiki_roots.len() + cli.wiki_pages.len());
    for arg in &cli.wiki_roots {
        roots.push(WikiRoot::parse(arg, WikiScope::Descendants).context("Invalid --wiki-root")?);
    }
    for arg in &cli.wiki_pages {
        roots.push(WikiRoot::parse(arg, WikiScope::Single).context("Invalid --wiki-page")?);
    }

    let sources: Vec<SourceKind> = if cli.sources.is_empty() {
        let mut s = vec![SourceKind::Articles, SourceKind::Questions];
        if !roots.is_empty() {
            s.push(SourceKind::Wiki);
        }
        s
    } else {
        cli.sources.iter().map(|&s| s.into()).collect()
    };

    let mut builder = IngestConfig::builder()
        .sources(sources)
        .window(window)
        .output_dir(&cli.output_dir)
        .page_size(cli.page_size)
        .batch_size(cli.batch_size)
        .concurrency(cli.concurrency)
        .request_timeout_secs(cli.timeout);

    if let Some(ref url) = cli.qa_api_url {
        builder = builder.qa_api_url(url);
    }
    if let Some(ref key) = cli.qa_api_key {
        builder = builder.qa_api_key(key);
    }
    if let Some(ref url) = cli.wiki_api_url {
        builder = builder.wiki_api_url(url);
    }
    if let Some(ref key) = cli.wiki_api_key {
        builder = builder.wiki_api_key(key);
    }
    if !cli.keys_from_env {
        if let Some(ref name) = cli.qa_api_key_param {
            builder = builder.qa_api_key_param(name);
        }
        if let Some(ref name) = cli.wiki_api_key_param {
            builder = builder.wiki_api_key_param(name);
        }
    }
    if let Some(ref dir) = cli.wiki_output_dir {
        builder = builder.wiki_output_dir(dir);
    }
    if let Some(ref path) = cli.cert_path {
        builder = builder.cert_path(path);
    }
    if let Some(n) = cli.max_pages {
        builder = builder.max_pages(n);
    }
    if !cli.tags.is_empty() {
        builder = builder.tags(cli.tags.iter().cloned());
    }
    for root in roots {
        builder = builder.wiki_root(root);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Read `--convert` input from a file or stdin.
fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read HTML from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))
    }
}

fn print_summary(report: &IngestReport) {
    let line = |name: &str, r: &Option<SourceReport>| {
        if let Some(r) = r {
            eprintln!(
                "   {:<10} {} listed  {} matched  {} written{}",
                name,
                dim(&r.listed.to_string()),
                dim(&r.matched.to_string()),
                bold(&r.written.to_string()),
                if r.failures.is_empty() {
                    String::new()
                } else {
                    format!("  {} failed", red(&r.failures.len().to_string()))
                }
            );
            for f in &r.failures {
                eprintln!("     {} {}", red("✗"), dim(&f.to_string()));
            }
        }
    };

    let failed = report.total_failed();
    eprintln!(
        "{} {} records written in {}ms",
        if failed == 0 { green("✔") } else { cyan("⚠") },
        bold(&report.total_written().to_string()),
        report.duration_ms
    );
    line("articles", &report.articles);
    line("questions", &report.questions);
    line("wiki", &report.wiki);
}
