//! espm CLI - Command-line tool for inspecting Bethesda plugin files.
//!
//! This is the main entry point for the espm command-line application.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, LevelFilter};

use espm::prelude::*;

/// Number of payload bytes shown per subrecord by `dump`.
const PREVIEW_LEN: usize = 16;

/// espm - Bethesda plugin inspection tool
#[derive(Parser)]
#[command(name = "espm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify a file as plugin, save or archive
    Sniff {
        /// Path to the file
        #[arg(env = "ESPM_INPUT")]
        input: PathBuf,
    },

    /// Show the file header record of a plugin
    Info {
        /// Game whose record layout the file uses
        #[arg(short, long, env = "ESPM_GAME")]
        game: GameId,

        /// Path to the plugin file
        #[arg(env = "ESPM_INPUT")]
        input: PathBuf,
    },

    /// List the records and groups of a plugin
    List {
        /// Game whose record layout the file uses
        #[arg(short, long, env = "ESPM_GAME")]
        game: GameId,

        /// Path to the plugin file
        #[arg(env = "ESPM_INPUT")]
        input: PathBuf,

        /// Walk into groups instead of skipping them
        #[arg(long)]
        descend: bool,

        /// Show one line per entry
        #[arg(short, long)]
        detailed: bool,
    },

    /// Decode records and print their subrecords
    Dump {
        /// Game whose record layout the file uses
        #[arg(short, long, env = "ESPM_GAME")]
        game: GameId,

        /// Path to the plugin file
        #[arg(env = "ESPM_INPUT")]
        input: PathBuf,

        /// Only dump records with this type tag
        #[arg(short, long)]
        filter: Option<Tag>,

        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Sniff { input } => {
            cmd_sniff(&input)?;
        }
        Commands::Info { game, input } => {
            cmd_info(&input, game)?;
        }
        Commands::List {
            game,
            input,
            descend,
            detailed,
        } => {
            cmd_list(&input, game, descend, detailed)?;
        }
        Commands::Dump {
            game,
            input,
            filter,
            json,
        } => {
            cmd_dump(&input, game, filter, json)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn cmd_sniff(input: &Path) -> Result<()> {
    let plugin = Plugin::load(input).context("Failed to open file")?;

    let by_extension = FileKind::from_extension(plugin.path());
    let by_signature = plugin.kind().context("Failed to read file signature")?;

    println!("{}", plugin.name());
    println!("  Extension: {}", by_extension);
    println!("  Signature: {}", by_signature);

    if by_extension != by_signature && by_extension != FileKind::Unknown {
        println!("  Warning: extension and signature disagree");
    }

    Ok(())
}

fn cmd_info(input: &Path, game: GameId) -> Result<()> {
    let plugin = Plugin::load(input).context("Failed to open plugin")?;
    let header = plugin
        .read_header(game)
        .context("Failed to read plugin header")?;

    println!("{} ({})", plugin.name(), game);
    println!("  Size:        {} bytes", plugin.len());
    println!("  Flags:       {:#010x}", header.flags());
    println!("  Identifier:  {:#010x}", header.identifier());
    println!("  Payload:     {} bytes", header.payload_size());
    println!("  Subrecords:  {}", header.subrecords().len());

    for subrecord in header.subrecords() {
        println!("    {} {:>8} bytes", subrecord.tag(), subrecord.len());
    }

    Ok(())
}

fn cmd_list(input: &Path, game: GameId, descend: bool, detailed: bool) -> Result<()> {
    let plugin = Plugin::load(input).context("Failed to open plugin")?;

    let options = DriverOptions {
        descend_groups: descend,
        read: ReadOptions::skip(),
    };
    let mut reader = plugin
        .reader_with(game, options)
        .context("Failed to open plugin")?;

    let pb = ProgressBar::new(plugin.len());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let mut totals: BTreeMap<Tag, usize> = BTreeMap::new();
    let mut groups = 0;

    while let Some(entry) = reader.next_entry().context("Failed to read entry")? {
        if detailed {
            let indent = "  ".repeat(entry.depth());
            match &entry {
                Entry::Group { offset, header, .. } => pb.println(format!(
                    "{:>10x} {}GRUP {} type {} ({} bytes)",
                    offset,
                    indent,
                    header.label_tag(),
                    header.group_type,
                    header.size
                )),
                Entry::Record {
                    offset,
                    tag,
                    record,
                    ..
                } => pb.println(format!(
                    "{:>10x} {}{} {:08x} flags {:08x} ({} bytes)",
                    offset,
                    indent,
                    tag,
                    record.identifier(),
                    record.flags(),
                    record.payload_size()
                )),
            }
        }

        match entry {
            Entry::Group { .. } => groups += 1,
            Entry::Record { tag, .. } => *totals.entry(tag).or_default() += 1,
        }

        pb.set_position(reader.position()?);
    }

    pb.finish_and_clear();
    debug!("Walked {} in {:?}", plugin.name(), start.elapsed());

    let records: usize = totals.values().sum();
    for (tag, count) in &totals {
        println!("{} {:>8}", tag, count);
    }
    println!("\nTotal: {} records, {} groups", records, groups);

    Ok(())
}

fn cmd_dump(input: &Path, game: GameId, filter: Option<Tag>, json: bool) -> Result<()> {
    let plugin = Plugin::load(input).context("Failed to open plugin")?;
    let reader = plugin.reader(game).context("Failed to open plugin")?;

    let mut count = 0;
    for entry in reader {
        let entry = entry.context("Failed to read entry")?;
        let Entry::Record {
            offset,
            tag,
            record,
            ..
        } = entry
        else {
            continue;
        };

        if filter.is_some_and(|f| f != tag) {
            continue;
        }

        if json {
            let line = serde_json::json!({
                "offset": offset,
                "tag": tag,
                "record": record,
            });
            println!("{}", serde_json::to_string(&line)?);
        } else {
            println!(
                "{:#010x} {} {:08x} flags {:08x}",
                offset,
                tag,
                record.identifier(),
                record.flags()
            );
            for subrecord in record.subrecords() {
                println!(
                    "    {} {:>6}  {}",
                    subrecord.tag(),
                    subrecord.len(),
                    hex_preview(subrecord.data())
                );
            }
        }
        count += 1;
    }

    if !json {
        println!("\nTotal: {} records", count);
    }

    Ok(())
}

/// Hex and ASCII rendering of the first bytes of a payload.
fn hex_preview(data: &[u8]) -> String {
    let shown = &data[..data.len().min(PREVIEW_LEN)];

    let hex: Vec<String> = shown.iter().map(|b| format!("{:02x}", b)).collect();
    let ascii: String = shown
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect();
    let more = if data.len() > PREVIEW_LEN { " ..." } else { "" };

    format!("{:<width$} |{}|{}", hex.join(" "), ascii, more, width = PREVIEW_LEN * 3 - 1)
}
