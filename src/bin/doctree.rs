//! Command-line driver that builds a tree from CSV rows and reports on it.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use csv::ReaderBuilder;
use doctree::tree::{
    KeyCodec, NameKeys, NodeShape, NumberKeys, Tree, TreeOptions, TreeStatsSnapshot, VerifyReport,
};
use doctree::MemoryStore;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "doctree",
    version,
    about = "Build and inspect balanced name and number trees",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load key,value rows into a fresh tree, then verify it.
    Build {
        #[arg(value_name = "CSV", help = "CSV file of key,value rows")]
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = KeyKind::Name, help = "Key domain")]
        kind: KeyKind,

        #[arg(long, value_name = "N", help = "Tree order, overrides the options file")]
        order: Option<usize>,

        #[arg(long, value_name = "FILE", env = "DOCTREE_OPTIONS", help = "TOML tree options")]
        options: Option<PathBuf>,

        #[arg(long, value_name = "CSV", help = "CSV file of keys to remove afterwards")]
        remove: Option<PathBuf>,

        #[arg(long, help = "Include the node layout in the report")]
        shape: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
enum KeyKind {
    Name,
    Number,
}

impl KeyKind {
    fn label(self) -> &'static str {
        match self {
            KeyKind::Name => "name",
            KeyKind::Number => "number",
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct BuildReport {
    kind: KeyKind,
    order: usize,
    inserted: usize,
    removed: usize,
    entries: usize,
    verify: VerifyReport,
    stats: TreeStatsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    shape: Option<NodeShape>,
}

fn main() {
    init_tracing();
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

/// Returns whether the built tree passed verification.
fn run() -> Result<bool, Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Build {
            input,
            kind,
            order,
            options,
            remove,
            shape,
        } => {
            let mut opts = match &options {
                Some(path) => TreeOptions::load(path)?,
                None => TreeOptions::default(),
            };
            if let Some(order) = order {
                opts.order = order;
            }
            let job = BuildJob {
                input: &input,
                remove: remove.as_deref(),
                options: opts,
                shape,
            };
            let report = match kind {
                KeyKind::Name => job.run(NameKeys, kind, |raw| Ok(raw.as_bytes().to_vec()))?,
                KeyKind::Number => job.run(NumberKeys, kind, |raw| {
                    raw.parse::<i64>()
                        .map_err(|err| format!("invalid number key '{raw}': {err}").into())
                })?,
            };
            emit(&cli.format, &report, |_| print_build_text(&report))?;
            Ok(report.verify.success)
        }
    }
}

struct BuildJob<'a> {
    input: &'a Path,
    remove: Option<&'a Path>,
    options: TreeOptions,
    shape: bool,
}

impl BuildJob<'_> {
    fn run<C, P>(&self, codec: C, kind: KeyKind, parse: P) -> Result<BuildReport, Box<dyn Error>>
    where
        C: KeyCodec,
        P: Fn(&str) -> Result<C::Key, Box<dyn Error>>,
    {
        let mut store = MemoryStore::new();
        let order = self.options.order;
        let tree: Tree<C, Vec<u8>> = Tree::create(&mut store, codec, self.options.clone())?;

        let mut inserted = 0;
        for (line, fields) in read_rows(self.input)? {
            let [key, value] = fields.as_slice() else {
                return Err(format!(
                    "{}:{line}: expected key,value but found {} fields",
                    self.input.display(),
                    fields.len()
                )
                .into());
            };
            tree.put(&mut store, &parse(key.as_str())?, &value.as_bytes().to_vec())?;
            inserted += 1;
        }

        let mut removed = 0;
        if let Some(path) = self.remove {
            for (_, fields) in read_rows(path)? {
                let Some(key) = fields.first() else { continue };
                if tree.remove(&mut store, &parse(key.as_str())?)?.is_some() {
                    removed += 1;
                }
            }
        }

        tree.emit_stats();
        Ok(BuildReport {
            kind,
            order,
            inserted,
            removed,
            entries: tree.len(&store)?,
            verify: tree.verify(&store)?,
            stats: tree.stats_snapshot(),
            shape: if self.shape {
                Some(tree.shape(&store)?)
            } else {
                None
            },
        })
    }
}

/// Reads non-empty CSV records as trimmed fields, tagged with their line.
fn read_rows(path: &Path) -> Result<Vec<(u64, Vec<String>)>, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |pos| pos.line());
        let fields: Vec<String> = record.iter().map(|f| f.trim().to_string()).collect();
        if fields.iter().all(String::is_empty) {
            continue;
        }
        rows.push((line, fields));
    }
    Ok(rows)
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(OutputFormat),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(OutputFormat::Text),
    }
    Ok(())
}

fn print_build_text(report: &BuildReport) {
    println!(
        "Tree ({}, order {}) => inserted={} removed={} entries={}",
        report.kind.label(),
        report.order,
        report.inserted,
        report.removed,
        report.entries
    );
    let counts = &report.verify.counts;
    println!(
        "Verify => success={} leaves={} interiors={} entries={} height={}",
        report.verify.success, counts.leaves, counts.interiors, counts.entries, counts.height
    );
    for finding in &report.verify.findings {
        println!("- {:?}: {}", finding.severity, finding.message);
    }
    let stats = &report.stats;
    println!(
        "Stats => leaf_splits={} internal_splits={} root_demotions={} borrows={} leaf_merges={} internal_merges={} root_collapses={}",
        stats.leaf_splits,
        stats.internal_splits,
        stats.root_demotions,
        stats.borrows,
        stats.leaf_merges,
        stats.internal_merges,
        stats.root_collapses
    );
    if let Some(shape) = &report.shape {
        println!();
        print!("{shape}");
    }
}
