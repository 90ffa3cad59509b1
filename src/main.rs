use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use survey_link::angle::AngleUnit;
use survey_link::nmea;
use survey_link::port::{LineTransport, ReplayTransport, SerialTransport, Transport};
use survey_link::proto::{ResultRecord, Value, parse_batch};
use survey_link::station::Station;

mod cli;

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let default_level = if args.debug {
        "info,survey_link=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_target(true).init();

    if let cli::Cmd::Decode {
        requests,
        responses,
    } = &args.cmd
    {
        for rec in parse_batch(requests, responses)? {
            println!("{}", render(&rec, args.unit));
        }
        return Ok(());
    }

    if let cli::Cmd::Nmea { output } = &args.cmd {
        let mut out: Box<dyn Write> = match output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("create {}", path.display()))?,
            )),
            None => Box::new(io::stdout().lock()),
        };
        let count = match &args.replay {
            Some(path) => {
                let file =
                    File::open(path).with_context(|| format!("open {}", path.display()))?;
                let mut src = LineTransport::new(
                    file,
                    path.display().to_string(),
                    Duration::from_millis(args.ser.timeout_ms),
                );
                nmea::collect(&mut src, &mut out)?
            }
            None => nmea::collect(&mut SerialTransport::open(&args.ser)?, &mut out)?,
        };
        eprintln!("{count} sentences");
        return Ok(());
    }

    let transport: Box<dyn Transport> = match &args.replay {
        Some(path) => Box::new(ReplayTransport::open(path)?),
        None => Box::new(SerialTransport::open(&args.ser)?),
    };
    let mut station = Station::new(args.ser.dev.clone(), transport);

    let records = match args.cmd.request(args.unit)? {
        Some(req) => vec![station.execute_one(&req)?],
        None => match &args.cmd {
            cli::Cmd::Raw { batch } => station.execute_raw(batch)?,
            _ => Vec::new(),
        },
    };
    for rec in &records {
        println!("{}", render(rec, args.unit));
    }
    Ok(())
}

fn render(rec: &ResultRecord, unit: AngleUnit) -> String {
    rec.fields()
        .into_iter()
        .map(|(name, value)| match value {
            Value::Angle(a) => format!("{}={}", name, a.format(unit)),
            other => format!("{}={}", name, other),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
