use anyhow::Result;
use clap::{Parser, ValueEnum};
use smart_image_renamer_core::{
    app_paths, load_config, load_config_from, run, AppConfig, BulkChoice, BulkMode, FileOutcome,
    MediaMetadataReader, MetadataSource, PlanOptions, Prompt, RenameError, RenamePlan, RunOptions,
    RunReport,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const TAGS_HELP: &str = "\
Format string for the file name is defined by a mix of custom text and following tags enclosed in {}:
  YYYY        Year
  MM          Month
  DD          Day
  hh          Hours
  mm          Minutes
  ss          Seconds
  Seq         Sequence number
  Artist      Artist
  Make        Camera Make
  Model       Camera Model
  Height      Height of image in pixels
  Folder      Parent folder of the image file

Examples:
  Format String:          {YYYY}-{MM}-{DD}-{Folder}-{Seq}
  File Name:              2014-05-09-Wedding_Shoot-001.JPEG
                          2014-05-09-Wedding_Shoot-002.JPEG

  Format String:          {YYYY}{DD}{MM}_{Model}_Beach_Shoot_{Seq}
  File Name:              20140905_PENTAX K-x_Beach_Shoot_001.JPEG
                          20140905_PENTAX K-x_Beach_Shoot_002.JPEG";

#[derive(Debug, Parser)]
#[command(name = "smart-image-renamer", version)]
#[command(about = "Rename your photos in bulk using information stored in EXIF")]
#[command(after_help = TAGS_HELP)]
struct Cli {
    /// Format of the new file name [default: {YYYY}-{MM}-{DD}_{hh}-{mm}-{ss}_{Height}]
    #[arg(short = 'f', value_name = "FORMAT")]
    format: Option<String>,
    /// Starting sequence number [default: 1]
    #[arg(short = 's', value_name = "SEQUENCE")]
    sequence: Option<u64>,
    /// Recurse into sub directories
    #[arg(short = 'r', default_value_t = false)]
    recursive: bool,
    /// Include hidden files and directories
    #[arg(short = 'i', default_value_t = false)]
    include_hidden: bool,
    /// Test mode, report what would be renamed without changing anything
    #[arg(short = 't', default_value_t = false)]
    test: bool,
    /// When to apply computed renames
    #[arg(short = 'b', long = "bulk", value_enum)]
    bulk: Option<BulkArg>,
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    verbose: bool,
    #[arg(short = 'q', long)]
    quiet: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Read defaults from this file instead of the user config
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Print the effective configuration and exit
    #[arg(long, default_value_t = false)]
    show_config: bool,
    /// Files or directories to rename
    #[arg(required_unless_present = "show_config")]
    input: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BulkArg {
    Always,
    Never,
    Ask,
}

impl From<BulkArg> for BulkMode {
    fn from(value: BulkArg) -> Self {
        match value {
            BulkArg::Always => BulkMode::Always,
            BulkArg::Never => BulkMode::Never,
            BulkArg::Ask => BulkMode::Ask,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match execute(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            log::error!("{:#}", err);
            match err.downcast_ref::<RenameError>() {
                Some(RenameError::Configuration(_)) => ExitCode::from(2),
                _ => ExitCode::from(1),
            }
        }
    }
}

fn execute(cli: Cli) -> Result<u8> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    if cli.show_config {
        cmd_show_config(&cli, &config)?;
        return Ok(0);
    }

    let options = run_options(&cli, &config);
    log::debug!("format string: {}", options.plan.template);

    let report = run(&options, &MediaMetadataReader, &mut StdinPrompt)?;

    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            if !cli.quiet {
                for line in rename_lines(&report, cli.verbose) {
                    println!("{}", line);
                }
                print_summary(&report);
            }
        }
    }

    Ok(u8::try_from(report.exit_code()).unwrap_or(1))
}

fn run_options(cli: &Cli, config: &AppConfig) -> RunOptions {
    RunOptions {
        plan: PlanOptions {
            inputs: cli.input.clone(),
            recursive: cli.recursive || config.recursive_default,
            include_hidden: cli.include_hidden || config.include_hidden_default,
            template: cli
                .format
                .clone()
                .unwrap_or_else(|| config.template.clone()),
            sequence_start: cli.sequence.unwrap_or(config.sequence_start),
        },
        dry_run: cli.test,
        bulk_mode: cli.bulk.map(BulkMode::from).unwrap_or(config.bulk_mode),
    }
}

fn cmd_show_config(cli: &Cli, config: &AppConfig) -> Result<()> {
    match &cli.config {
        Some(path) => println!("config file: {}", path.display()),
        None => println!("config file: {}", app_paths()?.config_path.display()),
    }
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Error
    } else if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| match record.level() {
            log::Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "{}: {}", level, record.args()),
        })
        .init();
}

/// `old --> new` for every applied (or, in test mode, planned) rename.
fn rename_lines(report: &RunReport, full_paths: bool) -> Vec<String> {
    let show = |path: &Path| {
        if full_paths {
            path.display().to_string()
        } else {
            path.file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default()
        }
    };
    report
        .entries
        .iter()
        .filter(|e| matches!(e.outcome, FileOutcome::Renamed | FileOutcome::WouldRename))
        .filter_map(|e| {
            let destination = e.destination.as_deref()?;
            Some(format!("{} --> {}", show(e.source.as_path()), show(destination)))
        })
        .collect()
}

fn print_summary(report: &RunReport) {
    let stats = &report.stats;
    if report.dry_run {
        println!("\nTest mode: no files were changed.");
    }
    println!("Processed {} files.", stats.renamed);
    println!(
        "scanned={} renamed={} unchanged={} declined={} failed={} hidden_skip={} protected_skip={} unsupported_skip={}",
        stats.scanned,
        stats.renamed,
        stats.unchanged,
        stats.declined,
        stats.failed,
        stats.skipped_hidden,
        stats.skipped_protected,
        stats.skipped_unsupported
    );
    if let Some(reason) = &report.aborted {
        println!("Aborted: {}", reason);
    }
}

/// Asks on the terminal; end of input counts as abort.
struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, plan: &RenamePlan) -> BulkChoice {
        let stdin = io::stdin();
        loop {
            eprint!("{}", prompt_line(plan));
            let _ = io::stderr().flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return BulkChoice::Abort,
                Ok(_) => {}
            }
            if let Some(choice) = parse_choice(&line) {
                return choice;
            }
        }
    }
}

fn prompt_line(plan: &RenamePlan) -> String {
    let note = match plan.metadata_source {
        MetadataSource::FileTimestamp => " (no metadata found, date taken from the file timestamp)",
        MetadataSource::Exif | MetadataSource::VideoTrack => "",
    };
    format!(
        "Rename {} --> {}{}? [y]es/[n]o/[a]lways/ne[v]er/a[b]ort: ",
        plan.source.display(),
        plan.destination.display(),
        note
    )
}

fn parse_choice(input: &str) -> Option<BulkChoice> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(BulkChoice::Yes),
        "n" | "no" => Some(BulkChoice::No),
        "a" | "always" => Some(BulkChoice::Always),
        "v" | "never" => Some(BulkChoice::Never),
        "b" | "abort" | "q" | "quit" => Some(BulkChoice::Abort),
        _ => None,
    }
}
