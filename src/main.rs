use color_eyre::eyre::WrapErr;
use std::fs::File;
use std::io::{self, BufReader};
use tracing::{info, span, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::collector::{IconSource, ParseOptions, ParsePolicy, TableSchema};

/// Extraction of weekly weather tables from HTML
mod collector;
/// Weather records produced by the collector
mod weather;

const USAGE: &str = "\
Usage: weekly-weather [OPTIONS] <INPUT>

Prints the weekly weather table found in INPUT (a file, or - for stdin).

Options:
  --strict              Fail on the first malformed row instead of skipping it
  --days <N>            Number of forecast days each city should have [default: 7]
  --icon-attr <NAME>    Image attribute holding the weather icon id [default: alt]
  --icon-index <N>      Take the icon id from the image attribute at this position
  -t, --trace           Log parsing progress to stderr
  -h, --help            Print this help";

struct Args {
    pub input: String,
    pub strict: bool,
    pub days: Option<usize>,
    pub icon_attr: Option<String>,
    pub icon_index: Option<usize>,
    pub trace: bool,
}

impl Args {
    fn parse_options(&self) -> ParseOptions {
        let mut schema = TableSchema::default();
        if let Some(days) = self.days {
            schema.forecast_days = days;
        }
        if let Some(index) = self.icon_index {
            schema.icon = IconSource::Position(index);
        } else if let Some(name) = &self.icon_attr {
            schema.icon = IconSource::Attribute(name.clone());
        }
        ParseOptions {
            schema,
            policy: if self.strict {
                ParsePolicy::Strict
            } else {
                ParsePolicy::Lenient
            },
        }
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = match parse_args()? {
        Some(args) => args,
        None => {
            println!("{}", USAGE);
            return Ok(());
        }
    };
    if args.trace {
        tracing_subscriber::fmt::fmt()
            .with_span_events(FmtSpan::ACTIVE)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_writer(io::stderr)
            .finish()
            .init();
        info!("Logger initialized");
    }

    let options = args.parse_options();
    let collection = {
        let span = span!(Level::DEBUG, "Reading input", input = %args.input);
        let _enter = span.enter();
        if args.input == "-" {
            collector::parse_html(io::stdin().lock(), &options)?
        } else {
            let file = File::open(&args.input)
                .wrap_err_with(|| format!("Could not open {}", args.input))?;
            collector::parse_html(BufReader::new(file), &options)?
        }
    };

    match collection {
        Some(collection) if collection.is_empty() => println!("weather table has no cities"),
        Some(collection) => print!("{}", collection),
        None => println!("no weather table found"),
    }
    Ok(())
}

/// Returns `None` when help was requested
fn parse_args() -> Result<Option<Args>, pico_args::Error> {
    let mut pargs = pico_args::Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        return Ok(None);
    }
    let args = Args {
        strict: pargs.contains("--strict"),
        days: pargs.opt_value_from_str("--days")?,
        icon_attr: pargs.opt_value_from_str("--icon-attr")?,
        icon_index: pargs.opt_value_from_str("--icon-index")?,
        trace: pargs.contains(["--trace", "-t"]),
        input: pargs.free_from_str()?,
    };
    Ok(Some(args))
}
