use crate::config::load_config;
use crate::layout_dump::{LayoutDump, write_layout_dump};
use crate::render::{render_svg, write_output};
use crate::step::parse_steps;
use crate::store::GraphStore;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "caseflow", version, about = "Lays out test-case workflows as positioned graphs")]
pub struct Args {
    /// Input file with the step sequence (JSON) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config file (JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Also write the positioned graph (JSON) to this file
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,

    /// Test case id recorded on the start insertion point
    #[arg(long = "caseId")]
    pub case_id: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Svg,
}

pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("caseflow=info,warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let steps = parse_steps(&input)?;

    let mut store = GraphStore::new(config.layout.clone());
    store.set_case_id(args.case_id.clone());
    store.set_graph(steps)?;

    let rendered = match args.output_format {
        OutputFormat::Json => LayoutDump::from_store(&store).to_json()?,
        OutputFormat::Svg => render_svg(store.graph(), store.layout(), &config.theme, &config.render),
    };
    write_output(&rendered, args.output.as_deref())?;
    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &store)?;
    }
    info!(
        nodes = store.nodes().len(),
        format = ?args.output_format,
        "workflow written"
    );
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
