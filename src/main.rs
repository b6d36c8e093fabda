use std::env;
use std::error::Error;
use std::fs;
use std::process;

use indicatif::ProgressBar;
use tracing::{debug, error, info, warn};

mod audio;
mod color;
mod decode;
mod diag;
mod link;
mod raster;
mod rle;
mod stream;

use diag::Diagnostic;
use link::LinkConfig;
use raster::{FitPolicy, VGA_HEIGHT, VGA_WIDTH};

struct Options {
    width: u32,
    height: u32,
    audio_path: Option<String>,
    budget: u32,
    interval: u32,
    positional: Vec<String>,
}

fn parse_options(args: &[String]) -> Result<Options, Box<dyn Error>> {
    let mut options = Options {
        width: VGA_WIDTH,
        height: VGA_HEIGHT,
        audio_path: None,
        budget: 64,
        interval: 4,
        positional: Vec::new(),
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--width" => options.width = iter.next().ok_or("--width needs a value")?.parse()?,
            "--height" => options.height = iter.next().ok_or("--height needs a value")?.parse()?,
            "--audio" => {
                options.audio_path = Some(iter.next().ok_or("--audio needs a value")?.clone())
            }
            "--budget" => options.budget = iter.next().ok_or("--budget needs a value")?.parse()?,
            "--interval" => {
                options.interval = iter.next().ok_or("--interval needs a value")?.parse()?
            }
            _ => options.positional.push(arg.clone()),
        }
    }
    Ok(options)
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    let mut short_runs = 0usize;
    for diagnostic in diagnostics {
        match diagnostic {
            Diagnostic::ShortRun { .. } => {
                short_runs += 1;
                debug!("{}", diagnostic);
            }
            Diagnostic::DimensionMismatch { .. } => warn!("{}", diagnostic),
        }
    }
    if short_runs > 0 {
        warn!(
            "{} runs shorter than {} pixels (compression efficiency warning)",
            short_runs,
            rle::SHORT_RUN_THRESHOLD
        );
    }
}

fn encode_command(input_path: &str, output_path: &str, options: &Options) -> Result<(), Box<dyn Error>> {
    let source = raster::load_image(input_path)?;
    // dimension mismatch is a warning here, not a fatal error
    let (frame, mut diagnostics) =
        raster::conform(&source, options.width, options.height, FitPolicy::PadTruncate)?;

    let progress = ProgressBar::new(u64::from(options.height));
    let (bytes, encode_diagnostics) = rle::encode_to_bytes(&frame, &audio::RowCounter, &progress);
    progress.finish_and_clear();
    diagnostics.extend(encode_diagnostics);
    report_diagnostics(&diagnostics);

    fs::write(output_path, &bytes)?;

    let uncompressed = options.width as usize * options.height as usize * 3;
    info!(
        "Encoded {} -> {}: {} codewords, {} bytes (raw {} bytes, ratio {:.2}:1)",
        input_path,
        output_path,
        bytes.len() / stream::CODEWORD_BYTES,
        bytes.len(),
        uncompressed,
        uncompressed as f64 / bytes.len() as f64
    );
    Ok(())
}

fn decode_command(input_path: &str, output_path: &str, options: &Options) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(input_path)?;
    match decode::decode(&bytes, options.width, options.height) {
        Ok((frame, audio_track)) => {
            raster::save_png(&frame, output_path)?;
            if let Some(audio_path) = &options.audio_path {
                audio::write_wav_track(audio_path, &audio_track)?;
                info!("Wrote {} audio samples to {}", audio_track.len(), audio_path);
            }
            info!("Decoded {} -> {}", input_path, output_path);
            Ok(())
        }
        Err(failure) => {
            // keep the decoded prefix on disk for inspection
            raster::save_png(&failure.frame, output_path)?;
            error!(
                "Decode failed after {} complete scanlines: {}; partial frame written to {}",
                failure.audio.len(),
                failure.error,
                output_path
            );
            Err(Box::new(failure.error))
        }
    }
}

fn simulate_command(input_path: &str, options: &Options) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(input_path)?;
    let config = LinkConfig {
        cycle_budget: options.budget,
        ready_interval: options.interval,
    };
    let (_, audio_track, report) =
        link::stream_decode(&bytes, options.width, options.height, config)?;
    info!(
        "Streamed {} nibbles over {} cycles ({} scanlines of audio recovered)",
        report.nibbles,
        report.cycles,
        audio_track.len()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  To encode:   {} encode <input-raster> <output-stream> [--width W] [--height H]\n  To decode:   {} decode <input-stream> <output-raster> [--width W] [--height H] [--audio <out.wav>]\n  To simulate: {} simulate <input-stream> [--budget N] [--interval N]",
            args[0], args[0], args[0]
        );
        process::exit(1);
    }

    let command = &args[1];
    let options = parse_options(&args[2..])?;

    match command.as_str() {
        "encode" => {
            if options.positional.len() != 2 {
                eprintln!("Usage: {} encode <input-raster> <output-stream>", args[0]);
                process::exit(1);
            }
            encode_command(&options.positional[0], &options.positional[1], &options)?;
        }
        "decode" => {
            if options.positional.len() != 2 {
                eprintln!("Usage: {} decode <input-stream> <output-raster>", args[0]);
                process::exit(1);
            }
            decode_command(&options.positional[0], &options.positional[1], &options)?;
        }
        "simulate" => {
            if options.positional.len() != 1 {
                eprintln!("Usage: {} simulate <input-stream>", args[0]);
                process::exit(1);
            }
            simulate_command(&options.positional[0], &options)?;
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            process::exit(1);
        }
    }

    Ok(())
}
