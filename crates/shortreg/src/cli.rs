use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use shortreg_rows::{Row, RowSource};
use shortreg_xlsx::MalformedXmlPolicy;
use tracing_subscriber::EnvFilter;

use crate::position::{read_positions, NetShortPosition, RowLayout};
use crate::register::{Register, RegisterConfig, DEFAULT_MAX_PREVIOUS_DAYS};
use crate::source::{Document, DocumentFormat, SourceOptions};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Xlsx,
    Xls,
}

impl From<FormatArg> for DocumentFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Xlsx => DocumentFormat::Xlsx,
            FormatArg::Xls => DocumentFormat::Xls,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "shortreg",
    about = "Read the Swedish short-position register (Blankningsregistret)."
)]
pub struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output format.
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Print the raw text rows of a register file.
    Rows(DocumentArgs),
    /// Print the net short positions of a register file, sorted.
    Positions(DocumentArgs),
    /// Fetch the latest published register on or before a date.
    Search(SearchArgs),
}

#[derive(clap::Args)]
struct ReaderArgs {
    /// Case-insensitive fragment of the sheet name to read.
    #[arg(long)]
    sheet: Option<String>,

    /// Report malformed sheet XML as an error instead of ending the rows quietly.
    #[arg(long)]
    strict_xml: bool,
}

impl ReaderArgs {
    fn source_options(&self) -> SourceOptions {
        let mut options = SourceOptions::default();
        if let Some(sheet) = &self.sheet {
            options = options.with_sheet_fragment(sheet.clone());
        }
        if self.strict_xml {
            options = options.with_malformed_xml(MalformedXmlPolicy::Fail);
        }
        options
    }
}

#[derive(clap::Args)]
struct DocumentArgs {
    /// Register file (`.xlsx` or `.xls`).
    path: PathBuf,

    /// Container format (default: from the file extension).
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    #[command(flatten)]
    reader: ReaderArgs,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// First date to try (default: today).
    #[arg(long)]
    date: Option<NaiveDate>,

    /// How many earlier days to try when nothing is published on `--date`.
    #[arg(long, default_value_t = DEFAULT_MAX_PREVIOUS_DAYS)]
    days: u32,

    /// Document URL with a `{date}` placeholder (default: the published register).
    #[arg(long)]
    url_template: Option<String>,

    /// Container format (default: from the URL template's extension).
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// HTTP request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[command(flatten)]
    reader: ReaderArgs,
}

/// Install a `tracing` subscriber on stderr (`RUST_LOG`, default `info`); `log` records from
/// the library crates are forwarded to it.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> Result<()> {
    run_with_args(Args::parse())
}

pub fn run_with_args(args: Args) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Rows(doc) => {
            let mut document = open_document(&doc)?;
            let rows = document
                .try_row_source()?
                .rows()
                .collect::<Result<Vec<Row>, _>>()?;
            write_rows(&mut out, args.output, &rows)?;
        }
        Command::Positions(doc) => {
            let mut document = open_document(&doc)?;
            let layout = RowLayout::from(document.format());
            let mut positions = read_positions(document.try_row_source()?, layout);
            positions.sort();
            write_positions(&mut out, args.output, &positions)?;
        }
        Command::Search(search) => {
            let mut config = RegisterConfig::default()
                .with_timeout(Duration::from_secs(search.timeout))
                .with_max_previous_days(search.days)
                .with_source(search.reader.source_options());
            if let Some(template) = search.url_template {
                config = config.with_url_template(template);
            }
            if let Some(format) = search.format {
                config = config.with_format(format.into());
            }
            let register = Register::new(config);
            let mut positions = match search.date {
                Some(date) => register.search(date, search.days),
                None => register.search_latest(),
            };
            positions.sort();
            write_positions(&mut out, args.output, &positions)?;
        }
    }
    Ok(())
}

fn open_document(args: &DocumentArgs) -> Result<Document<BufReader<File>>> {
    let format = match args.format {
        Some(format) => format.into(),
        None => format_from_path(&args.path)?,
    };
    let file =
        File::open(&args.path).with_context(|| format!("open {}", args.path.display()))?;
    Document::open(format, BufReader::new(file), args.reader.source_options())
        .with_context(|| format!("read {}", args.path.display()))
}

fn format_from_path(path: &Path) -> Result<DocumentFormat> {
    match DocumentFormat::from_path(path) {
        Some(format) => Ok(format),
        None => anyhow::bail!(
            "cannot tell the format of {} from its extension; pass --format xlsx|xls",
            path.display()
        ),
    }
}

fn write_rows(out: &mut impl Write, output: OutputFormat, rows: &[Row]) -> Result<()> {
    match output {
        OutputFormat::Text => {
            for row in rows {
                writeln!(out, "{}", row.join("\t"))?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, rows)?;
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn write_positions(
    out: &mut impl Write,
    output: OutputFormat,
    positions: &[NetShortPosition],
) -> Result<()> {
    match output {
        OutputFormat::Text => {
            for p in positions {
                let threshold = if p.significant { " " } else { "<" };
                write!(
                    out,
                    "{}  {}  {threshold}{:>5.2}%  {}  {}",
                    p.position_date, p.isin, p.position_in_percent, p.issuer, p.position_holder
                )?;
                match &p.comment {
                    Some(comment) => writeln!(out, "  ({comment})")?,
                    None => writeln!(out)?,
                }
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, positions)?;
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}
