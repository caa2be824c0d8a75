//! CLI entry point for `mailvault`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use mailvault::batch;
use mailvault::config::{self, Config};
use mailvault::export;
use mailvault::progress::{ProgressEvent, ProgressLog};
use mailvault::readpst::Readpst;
use mailvault::rpc::RpcServer;

#[derive(Parser)]
#[command(
    name = "mailvault",
    version,
    about = "Combine .msg, .eml and .pst emails into a single searchable text file"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Root folder to search recursively, or a single message/archive file
    #[arg(short, long, value_name = "PATH", default_value = "msg_files")]
    input: PathBuf,

    /// Output text file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "combined_emails.txt"
    )]
    output: PathBuf,

    /// Output encoding, e.g. "utf-8" or "windows-1252"
    #[arg(long, value_name = "LABEL")]
    encoding: Option<String>,

    /// Also list attachments in the text output
    #[arg(long)]
    attachments: bool,

    /// Write the JSON sidecar to this path (default: <output>.json)
    #[arg(long, value_name = "FILE", conflicts_with = "no_json")]
    json: Option<PathBuf>,

    /// Disable the JSON sidecar
    #[arg(long)]
    no_json: bool,

    /// Write the hashes CSV (default path: <output stem>_hashes.csv)
    #[arg(long)]
    hashes: bool,

    /// Custom path for the hashes CSV (implies --hashes)
    #[arg(long, value_name = "FILE")]
    hashes_path: Option<PathBuf>,

    /// Append JSONL progress events to this file
    #[arg(long, value_name = "FILE")]
    progress_file: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-RPC requests over stdio
    Serve,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Serve) => cmd_serve(&config),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => cmd_combine(&cli, &config),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if config.general.log_file && std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailvault.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Run the combine pipeline over the input root.
fn cmd_combine(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let scan = batch::scan_input(&cli.input)?;

    let encoding = cli
        .encoding
        .clone()
        .unwrap_or_else(|| config.export.default_encoding.clone());
    let show_attachments = cli.attachments || config.export.show_attachments;

    let json_enabled = !cli.no_json && (cli.json.is_some() || config.export.json_sidecar);
    let json_path = cli
        .json
        .clone()
        .unwrap_or_else(|| default_json_path(&cli.output));
    let hashes_enabled = cli.hashes || cli.hashes_path.is_some() || config.export.hashes;
    let hashes_path = cli
        .hashes_path
        .clone()
        .unwrap_or_else(|| default_hashes_path(&cli.output));

    println!();
    println!("  {:<14} {}", "Input", scan.root.display());
    println!("  {:<14} {}", "Output", cli.output.display());
    if json_enabled {
        println!("  {:<14} {}", "JSON sidecar", json_path.display());
    }
    if hashes_enabled {
        println!("  {:<14} {}", "Hashes CSV", hashes_path.display());
    }
    println!(
        "  {:<14} {} .msg, {} .eml, {} .pst",
        "Found",
        scan.msg_files.len(),
        scan.eml_files.len(),
        scan.pst_files.len()
    );
    println!();

    let root_label = scan.root_label.display().to_string();
    let mut exporter = export::TextExporter::create(&cli.output, &root_label, &encoding)?;

    let mut progress_log = cli.progress_file.as_ref().and_then(|path| {
        match ProgressLog::create(path) {
            Ok(log) => Some(log),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not open progress log");
                None
            }
        }
    });

    let pb = ProgressBar::new(scan.total() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Processing [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let tool = Readpst::new(config.tools.readpst.clone());
    let mut emit = |event: &ProgressEvent| {
        if let Some(log) = progress_log.as_mut() {
            log.record(event);
        }
        if let ProgressEvent::Processed { processed, .. } = event {
            pb.set_position(*processed as u64);
        }
    };

    let batch = batch::run_batch(&scan, &mut exporter, &tool, show_attachments, &mut emit)?;
    pb.finish_and_clear();
    exporter.finish()?;

    if json_enabled && !batch.messages.is_empty() {
        let source_root = scan.root.display().to_string();
        match export::export_json(&batch.messages, &json_path, &source_root, Some(&cli.output)) {
            Ok(()) => println!("  JSON sidecar written: {}", json_path.display()),
            Err(e) => {
                warn!(path = %json_path.display(), error = %e, "Could not write JSON sidecar")
            }
        }
    }
    if hashes_enabled && !batch.messages.is_empty() {
        match export::export_hashes(&batch.messages, &hashes_path) {
            Ok(()) => println!("  Hashes CSV written: {}", hashes_path.display()),
            Err(e) => {
                warn!(path = %hashes_path.display(), error = %e, "Could not write hashes CSV")
            }
        }
    }

    let output_size = std::fs::metadata(&cli.output).map(|m| m.len()).unwrap_or(0);
    println!();
    println!("  {:<14} {}", "Messages", batch.processed);
    println!("  {:<14} {}", "Output", cli.output.display());
    println!("  {:<14} {}", "Output size", format_size(output_size, BINARY));
    if batch.errors > 0 {
        println!("  {:<14} {}", "Errors", batch.errors);
        println!("  Error details are recorded in the output file.");
    }
    println!();

    Ok(())
}

/// Serve line-delimited JSON-RPC over stdio until EOF or shutdown.
fn cmd_serve(config: &Config) -> anyhow::Result<()> {
    let tool = Readpst::new(config.tools.readpst.clone());
    let server = RpcServer::new(tool);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    server.serve(stdin.lock(), stdout.lock())?;
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailvault", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// `<output>.json`, appended to the full output name.
fn default_json_path(output: &Path) -> PathBuf {
    PathBuf::from(format!("{}.json", output.display()))
}

/// `<output stem>_hashes.csv` next to the output file.
fn default_hashes_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "combined_emails".to_string());
    output.with_file_name(format!("{stem}_hashes.csv"))
}
