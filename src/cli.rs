//! CLI application.
//!
//! This module implements a CLI application that decodes a DAB MSC
//! sub-channel from a file of soft bits, or encodes sub-channel bytes into a
//! file of soft bits. The soft bits are stored as little-endian `f32` values,
//! with every CIF occupying 55296 values. Standard input and standard output
//! are used when no file is given.

use crate::{
    mode::REFERENCE_SAMPLE_RATE,
    msc::{MscConfig, MscDecoder, MscEncoder},
    subchannel::Protection,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Read, Write},
    path::PathBuf,
    time::{Duration, Instant},
};

/// Decode or encode a DAB MSC sub-channel
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Decode sub-channel bytes from MSC soft bits
    Decode {
        #[command(flatten)]
        subchannel: SubChannelArgs,
        #[command(flatten)]
        io: IoArgs,
        /// Output the CIFs decoded while the time deinterleaver fills
        #[arg(long)]
        emit_incomplete: bool,
    },
    /// Encode sub-channel bytes into MSC soft bits
    Encode {
        #[command(flatten)]
        subchannel: SubChannelArgs,
        #[command(flatten)]
        io: IoArgs,
        /// Append 15 empty CIFs so that all the input goes through the time
        /// interleaver
        #[arg(long)]
        flush: bool,
    },
}

#[derive(clap::Args, Debug)]
struct SubChannelArgs {
    /// DAB transmission mode (1 to 4)
    #[arg(long, default_value_t = 1)]
    mode: u8,
    /// Sample rate (in Hz)
    #[arg(long, default_value_t = REFERENCE_SAMPLE_RATE)]
    sample_rate: f64,
    /// Sub-channel start address (in CUs)
    #[arg(long)]
    address: usize,
    /// Sub-channel size (in CUs)
    #[arg(long)]
    size: usize,
    /// EEP protection profile ("1-A" to "4-A", "1-B" to "4-B")
    #[arg(long)]
    protection: Protection,
}

impl SubChannelArgs {
    fn config(&self) -> MscConfig {
        MscConfig {
            mode: self.mode,
            sample_rate: self.sample_rate,
            address: self.address,
            size: self.size,
            protection: self.protection.index(),
        }
    }
}

#[derive(clap::Args, Debug)]
struct IoArgs {
    /// Input file (standard input is used if not specified)
    #[arg(long)]
    input: Option<PathBuf>,
    /// Output file (standard output is used if not specified)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Time interval used to log statistics (in seconds)
    #[arg(long, default_value_t = 10.0)]
    stats_interval: f64,
}

impl IoArgs {
    fn open(&self) -> Result<(Box<dyn Read>, Box<dyn Write>)> {
        let input: Box<dyn Read> = match &self.input {
            Some(path) => Box::new(BufReader::new(
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
            )),
            None => Box::new(std::io::stdin().lock()),
        };
        let output: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?,
            )),
            None => Box::new(BufWriter::new(std::io::stdout().lock())),
        };
        Ok((input, output))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
struct Stats {
    cifs_in: u64,
    cifs_out: u64,
    corrected_errors: u64,
}

#[derive(Debug)]
struct StatsReporter {
    interval: Option<Duration>,
    last: Instant,
}

impl StatsReporter {
    fn new(interval: f64) -> StatsReporter {
        StatsReporter {
            interval: if interval > 0.0 {
                Some(Duration::from_secs_f64(interval))
            } else {
                None
            },
            last: Instant::now(),
        }
    }

    fn maybe_report(&mut self, stats: &Stats) {
        if let Some(interval) = self.interval {
            if self.last.elapsed() >= interval {
                report_stats(stats);
                self.last = Instant::now();
            }
        }
    }
}

fn report_stats(stats: &Stats) {
    log::info!(
        "CIFs in: {}, CIFs out: {}, corrected errors: {}",
        stats.cifs_in,
        stats.cifs_out,
        stats.corrected_errors
    );
}

// Fills buf with the next block of the input. Returns false at the end of
// the input.
fn read_block(reader: &mut dyn Read, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err).context("failed to read input"),
        }
    }
    if filled != 0 && filled != buf.len() {
        log::warn!("discarding {} bytes of incomplete input at the end", filled);
    }
    Ok(filled == buf.len())
}

fn decode(
    mut decoder: MscDecoder,
    input: &mut dyn Read,
    output: &mut dyn Write,
    stats_interval: f64,
) -> Result<Stats> {
    let mut stats = Stats::default();
    let mut reporter = StatsReporter::new(stats_interval);
    let mut buf = vec![0u8; 4 * decoder.mode_parameters().cif_bits()];
    while read_block(input, &mut buf)? {
        let soft = buf
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect::<Vec<f32>>();
        stats.cifs_in += 1;
        for cif in decoder
            .push_soft_bits(&soft)
            .context("failed to decode CIF")?
        {
            stats.cifs_out += 1;
            stats.corrected_errors += cif.corrected_errors as u64;
            output
                .write_all(&cif.data)
                .context("failed to write output")?;
        }
        reporter.maybe_report(&stats);
    }
    output.flush().context("failed to write output")?;
    Ok(stats)
}

fn encode(
    mut encoder: MscEncoder,
    input: &mut dyn Read,
    output: &mut dyn Write,
    stats_interval: f64,
    flush: bool,
) -> Result<Stats> {
    let mut stats = Stats::default();
    let mut reporter = StatsReporter::new(stats_interval);
    let mut buf = vec![0u8; encoder.cif_bytes()];
    let mut write_cif = |encoder: &mut MscEncoder, data: &[u8], stats: &mut Stats| -> Result<()> {
        let soft = encoder
            .encode_soft_cif(data)
            .context("failed to encode CIF")?;
        let bytes = soft
            .iter()
            .flat_map(|x| x.to_le_bytes())
            .collect::<Vec<u8>>();
        output.write_all(&bytes).context("failed to write output")?;
        stats.cifs_out += 1;
        Ok(())
    };
    while read_block(input, &mut buf)? {
        stats.cifs_in += 1;
        write_cif(&mut encoder, &buf, &mut stats)?;
        reporter.maybe_report(&stats);
    }
    if flush {
        let empty = vec![0u8; encoder.cif_bytes()];
        for _ in 0..15 {
            write_cif(&mut encoder, &empty, &mut stats)?;
        }
    }
    output.flush().context("failed to write output")?;
    Ok(stats)
}

/// Main function of the CLI application.
pub fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    log::info!("dab-msc v{} started", env!("CARGO_PKG_VERSION"));
    let stats = match args.command {
        Command::Decode {
            subchannel,
            io,
            emit_incomplete,
        } => {
            let mut decoder = subchannel
                .config()
                .decoder()
                .context("invalid sub-channel configuration")?;
            decoder.set_emit_incomplete(emit_incomplete);
            log::info!(
                "decoding {} in {}",
                decoder.subchannel(),
                decoder.mode_parameters().mode()
            );
            let (mut input, mut output) = io.open()?;
            decode(decoder, &mut input, &mut output, io.stats_interval)?
        }
        Command::Encode {
            subchannel,
            io,
            flush,
        } => {
            let encoder = subchannel
                .config()
                .encoder()
                .context("invalid sub-channel configuration")?;
            log::info!(
                "encoding {} in {}",
                encoder.subchannel(),
                encoder.mode_parameters().mode()
            );
            let (mut input, mut output) = io.open()?;
            encode(encoder, &mut input, &mut output, io.stats_interval, flush)?
        }
    };
    report_stats(&stats);
    Ok(())
}
