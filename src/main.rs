//! msgpack-cli - Convert between JSON and MessagePack, and call
//! MessagePack-RPC methods from the command line.
//!
//! Converted data and RPC replies go to stdout; logs go to stderr.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use msgpack_cli::convert::{self, Direction};
use msgpack_cli::options::parse_timeout;
use msgpack_cli::{rpc, ConversionOptions};

/// Convert between JSON and MessagePack, or call a MessagePack-RPC method
#[derive(Debug, Parser)]
#[command(name = "msgpack-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encode JSON data from input file to MessagePack
    Encode(EncodeArgs),

    /// Decode MessagePack data from input file to JSON
    Decode(DecodeArgs),

    /// Call RPC method and write result to STDOUT
    Rpc(RpcArgs),
}

#[derive(Debug, Args)]
struct EncodeArgs {
    /// File where data are read from ("-" for STDIN)
    input_file: PathBuf,

    /// Write output data to file instead of STDOUT
    #[arg(long, value_name = "OUTPUT_FILE")]
    out: Option<PathBuf>,

    /// Decode every JSON number as a float instead of classifying integers
    #[arg(long = "disable-int64-conv")]
    disable_int64_conv: bool,
}

#[derive(Debug, Args)]
struct DecodeArgs {
    /// File where data are read from ("-" for STDIN)
    input_file: PathBuf,

    /// Write output data to file instead of STDOUT
    #[arg(long, value_name = "OUTPUT_FILE")]
    out: Option<PathBuf>,

    /// Pretty-print - indent output JSON data
    #[arg(long)]
    pp: bool,
}

#[derive(Debug, Args)]
struct RpcArgs {
    /// Server hostname
    host: String,

    /// Server port
    port: u16,

    /// Name of RPC method
    method: String,

    /// Parameters of RPC method in JSON format
    #[arg(allow_hyphen_values = true, conflicts_with = "file")]
    params: Option<String>,

    /// File where parameters of the RPC method are read from
    #[arg(long, value_name = "INPUT_FILE")]
    file: Option<PathBuf>,

    /// Pretty-print - indent output JSON data
    #[arg(long)]
    pp: bool,

    /// Timeout of RPC call in seconds
    #[arg(long, default_value = "30", value_parser = parse_timeout_arg)]
    timeout: u64,

    /// Decode every JSON number as a float instead of classifying integers
    #[arg(long = "disable-int64-conv")]
    disable_int64_conv: bool,
}

fn parse_timeout_arg(text: &str) -> std::result::Result<u64, String> {
    parse_timeout(text).map_err(|e| e.to_string())
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "msgpack_cli=warn".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Encode(args) => {
            let options =
                ConversionOptions::default().with_convert_numbers(!args.disable_int64_conv);
            run_conversion(&args.input_file, args.out.as_deref(), Direction::Encode, &options)
        }
        Command::Decode(args) => {
            let options = ConversionOptions::default().with_indent(args.pp);
            run_conversion(&args.input_file, args.out.as_deref(), Direction::Decode, &options)
        }
        Command::Rpc(args) => run_rpc(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_conversion(
    input: &Path,
    output: Option<&Path>,
    direction: Direction,
    options: &ConversionOptions,
) -> Result<()> {
    let reader = open_input(input)?;
    let writer = open_output(output)?;

    let count = convert::run(reader, writer, direction, options)?;
    info!("Converted {} value(s) from {}", count, input.display());
    Ok(())
}

fn run_rpc(args: RpcArgs) -> Result<()> {
    let params = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameters from {}", path.display()))?,
        None => args.params.unwrap_or_default(),
    };

    let options = ConversionOptions::default()
        .with_convert_numbers(!args.disable_int64_conv)
        .with_indent(args.pp)
        .with_timeout_secs(args.timeout)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let reply = runtime.block_on(rpc::call_and_render(
        &args.host,
        args.port,
        &args.method,
        &params,
        &options,
    ))?;

    println!("{}", reply);
    Ok(())
}

/// Open the input stream; `-` is standard input.
fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Open the output stream; standard output unless a file is given.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}
