use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process;

use ansi_term::Colour::Red;
use clap::Parser;
use log::LevelFilter;

use gzinflate::deflate::InflateOptions;
use gzinflate::gzip::reader::GzipDecoder;
use gzinflate::gzip::GzipOptions;

/// Decompress a gzip file to standard output.
#[derive(Parser, Debug)]
#[command(name = "gzinflate")]
#[command(author, version, about, long_about = None)]
struct Args {
  /// gzip file to decompress
  #[arg(value_name = "FILE", required_unless_present = "file", conflicts_with = "file")]
  input: Option<PathBuf>,

  /// gzip file to decompress (alternative to the positional argument)
  #[arg(short = 'f', long = "file", value_name = "FILE")]
  file: Option<PathBuf>,

  /// More log output on stderr (-v, -vv, -vvv). RUST_LOG overrides it.
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,

  /// Log every block and symbol with the bit position it was read at
  #[arg(long)]
  explain: bool,

  /// Check the CRC32 and size recorded in each member trailer
  #[arg(long)]
  verify: bool,

  /// Stop after the first gzip member
  #[arg(long)]
  first_member_only: bool,

  /// Print each member header as JSON on stderr
  #[arg(long)]
  header_json: bool,

  /// Longest extra field, file name or comment accepted, in bytes
  #[arg(long, default_value_t = 65535)]
  max_header_field: usize,
}

impl Args {
  fn options(&self) -> GzipOptions {
    GzipOptions {
      max_header_field: self.max_header_field,
      verify_trailer: self.verify,
      multi_member: !self.first_member_only,
      inflate: InflateOptions {
        explain: self.explain,
      },
    }
  }

  fn log_level(&self) -> LevelFilter {
    let level = match self.verbose {
      0 => LevelFilter::Warn,
      1 => LevelFilter::Info,
      2 => LevelFilter::Debug,
      _ => LevelFilter::Trace,
    };
    if self.explain {
      level.max(LevelFilter::Info)
    } else {
      level
    }
  }
}

fn init_logging(level: LevelFilter) {
  let mut builder = pretty_env_logger::formatted_builder();
  builder.filter_level(level);
  if let Ok(filters) = std::env::var("RUST_LOG") {
    builder.parse_filters(&filters);
  }
  builder.init();
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
  let path = match (&args.input, &args.file) {
    (Some(p), _) | (None, Some(p)) => p,
    (None, None) => return Err("no input file given".into()),
  };
  let infile = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
  let mut decoder = GzipDecoder::new(BufReader::new(infile), args.options());

  let stdout = io::stdout();
  let mut out = stdout.lock();
  while let Some(member) = decoder.next_member()? {
    if args.header_json {
      eprintln!("{}", serde_json::to_string(&member.header)?);
    }
    out.write_all(&member.data)?;
  }
  out.flush()?;
  log::info!("decoded {} member(s)", decoder.members_read());
  Ok(())
}

fn main() {
  let args = Args::parse();
  init_logging(args.log_level());

  if let Err(e) = run(&args) {
    eprintln!("{} {}", Red.bold().paint("error:"), e);
    process::exit(1);
  }
}
