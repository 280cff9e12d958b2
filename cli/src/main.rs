//! unrule CLI - ruled-line removal for scanned documents

use std::path::{Path, PathBuf};
use std::thread;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use unrule::{
    document_info, CancelToken, PipelineOptions, ProgressEvent, ProgressPhase, ProgressSink,
};

#[derive(Parser)]
#[command(name = "unrule")]
#[command(version)]
#[command(about = "Remove printed ruled lines from scanned documents", long_about = None)]
struct Cli {
    /// Input file (PDF, PNG, JPEG)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output path (default: processed_<input> next to the input)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Restore pages one at a time instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Suppress the progress bar
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore a scanned document or image (default)
    Restore {
        /// Input file (PDF, PNG, JPEG)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output path (default: processed_<input> next to the input)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Restore pages one at a time instead of in parallel
        #[arg(long)]
        sequential: bool,

        /// Suppress the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show page and embedded-image counts for a PDF
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Restore {
            input,
            output,
            sequential,
            quiet,
        }) => cmd_restore(&input, output.as_deref(), sequential, quiet),
        Some(Commands::Info { input, json }) => cmd_info(&input, json),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            if let Some(input) = cli.input {
                cmd_restore(&input, cli.output.as_deref(), cli.sequential, cli.quiet)
            } else {
                println!("{}", "Usage: unrule <FILE> [-o OUTPUT]".yellow());
                println!("       unrule --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_restore(
    input: &Path,
    output: Option<&Path>,
    sequential: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = PipelineOptions::new()
        .with_parallel(!sequential)
        .with_cancel_token(CancelToken::new());

    let (sink, events) = ProgressSink::channel();

    // Pipeline on a worker thread; this thread owns the display.
    let input_path = input.to_path_buf();
    let output_path = output.map(Path::to_path_buf);
    let worker = thread::spawn(move || {
        unrule::restore_file_with_options(
            &input_path,
            output_path.as_deref(),
            options,
            &sink,
        )
    });

    if quiet {
        for _ in events {}
    } else {
        drive_progress_bar(events);
    }

    let written = worker
        .join()
        .map_err(|_| "restoration thread panicked")??;

    println!(
        "{} {}",
        "Restored:".green().bold(),
        written.display()
    );
    Ok(())
}

/// Consume progress events until the channel closes, keeping one bar in
/// sync with the current phase.
fn drive_progress_bar(events: crossbeam_channel::Receiver<ProgressEvent>) {
    let bar = ProgressBar::hidden();
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut current_phase: Option<ProgressPhase> = None;
    for event in events {
        if current_phase != Some(event.phase) {
            current_phase = Some(event.phase);
            bar.set_length(event.total as u64);
            bar.set_message(event.phase.label());
            bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        }
        bar.set_length(event.total as u64);
        bar.set_position(event.completed as u64);
    }
    bar.finish_with_message(ProgressPhase::Done.label());
}

fn cmd_info(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let info = document_info(input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", "Document".green().bold());
    println!("  PDF version:     {}", info.version);
    println!("  Pages:           {}", info.page_count);
    println!("  Embedded images: {}", info.embedded_images);
    println!("  Encrypted:       {}", if info.encrypted { "yes" } else { "no" });
    if !info.has_embedded_images() {
        println!(
            "  {}",
            "No embedded images; restoration will rasterize every page.".dimmed()
        );
    }
    Ok(())
}

fn cmd_version() {
    println!("unrule {}", env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dispatch_parses_bare_input() {
        let cli = Cli::parse_from(["unrule", "scan.pdf", "-o", "clean.pdf"]);
        assert_eq!(cli.input, Some(PathBuf::from("scan.pdf")));
        assert_eq!(cli.output, Some(PathBuf::from("clean.pdf")));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_restore_subcommand_parses() {
        let cli = Cli::parse_from(["unrule", "restore", "scan.pdf", "--sequential"]);
        match cli.command {
            Some(Commands::Restore {
                input, sequential, ..
            }) => {
                assert_eq!(input, PathBuf::from("scan.pdf"));
                assert!(sequential);
            }
            _ => panic!("expected restore subcommand"),
        }
    }

    #[test]
    fn test_restore_unsupported_input_fails_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, b"plain text").unwrap();
        let output = dir.path().join("out.pdf");

        let result = cmd_restore(&input, Some(output.as_path()), true, true);
        assert!(result.is_err());
        assert!(!output.exists());
    }
}
