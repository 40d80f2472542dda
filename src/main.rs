//! recopy - resumable single-file copy
//!
//! Copies one file into a folder and can pick an interrupted copy back up at
//! the exact byte where it stopped, as long as the source has not changed in
//! the meantime.

use clap::Parser;
use crossterm::style::{Color, Stylize};
use std::path::PathBuf;
use std::process::ExitCode;

use recopy::engine::{self, CopyError, CopyOptions};
use recopy::logger::{Logger, NoopLogger, TextLogger};
use recopy::progress::{format_mb, ConsoleProgress, NoopProgress, ProgressSink};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Resumable single-file copy - continue an interrupted copy from the exact byte where it stopped"
)]
struct Args {
    /// Source file
    source: PathBuf,

    /// Destination folder (defaults to the current directory)
    destination: Option<PathBuf>,

    /// Copy block size in bytes
    #[arg(long, default_value_t = engine::DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Suppress the progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Write activity log entries to file
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Abandon in place on Ctrl-C: the partial file and control record become
    // the next run's resume-or-reject input.
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        std::process::exit(130);
    })
    .expect("Error setting Ctrl-C handler");

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CopyError::User(e)) => {
            eprintln!("{} {e}", "ERROR:".with(Color::Red).bold());
            ExitCode::from(9)
        }
        Err(CopyError::Fatal(e)) => {
            eprintln!("{} {e:?}", "FATAL ERROR:".with(Color::Red).bold());
            ExitCode::from(10)
        }
    }
}

fn run(args: &Args) -> Result<(), CopyError> {
    let destination = match &args.destination {
        Some(d) => d.clone(),
        None => std::env::current_dir()?,
    };

    println!("Source file: {}", args.source.display());
    println!("Destination folder: {}", destination.display());

    // Choose logger once; zero overhead in the copy loop with NoopLogger
    let logger: Box<dyn Logger> = match &args.log_file {
        Some(p) => match TextLogger::new(p) {
            Ok(l) => Box::new(l),
            Err(_) => Box::new(NoopLogger),
        },
        None => Box::new(NoopLogger),
    };
    let sink: Box<dyn ProgressSink> = if args.quiet {
        Box::new(NoopProgress)
    } else {
        Box::new(ConsoleProgress::new())
    };

    let opts = CopyOptions {
        buffer_size: args.buffer_size,
        ..CopyOptions::default()
    };
    let summary = match engine::copy_with_resume(
        &args.source,
        &destination,
        &opts,
        sink.as_ref(),
        logger.as_ref(),
    ) {
        Ok(summary) => summary,
        Err(e) => {
            logger.error("copy", &e.to_string());
            return Err(e);
        }
    };

    if let Some(warning) = &summary.control_cleanup {
        eprintln!("{} {warning}", "WARNING:".with(Color::Yellow).bold());
    }
    println!(
        "{} {} in {:.1}s",
        "Copied".with(Color::Green).bold(),
        format_mb(summary.total_len),
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}
