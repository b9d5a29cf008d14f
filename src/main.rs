// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! `duck-decode` command-line front-end.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use duck_core::config::CliConfig;
use duck_core::stego::output::format_size;
use duck_core::{capacity, decode_with, encode, EncodeOptions, OwnedCarrier, Progress, StegoError};
use tracing_subscriber::EnvFilter;

/// Exit code when the image carries no hidden content.
const EXIT_NOT_STEGANOGRAPHIC: u8 = 3;
/// Exit code when a password is missing or wrong.
const EXIT_PASSWORD: u8 = 4;
/// Exit code when hidden content exists but cannot be recovered.
const EXIT_UNRECOVERABLE: u8 = 5;

#[derive(Parser)]
#[command(name = "duck-decode", version)]
#[command(about = "Recover files hidden in image pixels, or hide new ones", long_about = None)]
struct Cli {
    /// TOML config file (output_dir, compress, log_filter)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (overrides the configured filter with `debug`)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recover the hidden file from an image
    #[command(alias = "d")]
    Decode {
        /// Carrier image (PNG or BMP)
        image: PathBuf,

        /// Password, if the content is protected
        password: Option<String>,

        /// Output directory (default: config value, else current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Hide a file in a cover image
    #[command(alias = "e")]
    Encode {
        /// Cover image (PNG or BMP)
        cover: PathBuf,

        /// File to hide
        file: PathBuf,

        /// Output image; must be lossless (PNG or BMP)
        output: PathBuf,

        /// Optional password
        password: Option<String>,

        /// Store the file uncompressed
        #[arg(long)]
        no_compress: bool,
    },

    /// Show how many bytes an image can hold
    #[command(alias = "c")]
    Capacity {
        /// Carrier image (PNG or BMP)
        image: PathBuf,

        /// Filename that will be stored alongside the content
        #[arg(long, default_value = "")]
        name: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match CliConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => CliConfig::default(),
    };

    let default_filter = if cli.verbose { "debug" } else { config.log_filter.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Decode { image, password, output } => {
            let output_dir = output.unwrap_or_else(|| config.output_dir.clone());
            run_decode(&image, password.as_deref(), &output_dir)
        }
        Commands::Encode { cover, file, output, password, no_compress } => {
            let options = EncodeOptions { compress: config.compress && !no_compress };
            run_encode(&cover, &file, &output, password.as_deref(), &options)
        }
        Commands::Capacity { image, name } => run_capacity(&image, &name),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(e: &StegoError) -> u8 {
    if e.is_not_steganographic() {
        EXIT_NOT_STEGANOGRAPHIC
    } else if e.needs_password() {
        EXIT_PASSWORD
    } else if e.is_unrecoverable() {
        EXIT_UNRECOVERABLE
    } else {
        1
    }
}

fn run_decode(image: &Path, password: Option<&str>, output_dir: &Path) -> Result<(), StegoError> {
    tracing::info!("Loading image...");
    let carrier = OwnedCarrier::open(image)?;
    let outcome = decode_with(&carrier.as_grid(), password, output_dir, &mut Progress::silent())?;
    println!("Decoded: {}", outcome.written_path.display());
    println!("Type: {}", outcome.file_type().unwrap_or("unknown"));
    println!("Size: {}", outcome.size_display());
    Ok(())
}

fn run_encode(
    cover: &Path,
    file: &Path,
    output: &Path,
    password: Option<&str>,
    options: &EncodeOptions,
) -> Result<(), StegoError> {
    let mut carrier = OwnedCarrier::open(cover)?;
    let content = std::fs::read(file)?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    encode(&mut carrier.as_grid_mut(), &file_name, &content, password, options)?;
    carrier.save(output)?;
    println!(
        "Encoded {} ({}) into {}",
        file_name,
        format_size(content.len() as u64),
        output.display()
    );
    Ok(())
}

fn run_capacity(image: &Path, name: &str) -> Result<(), StegoError> {
    let carrier = OwnedCarrier::open(image)?;
    let layout = carrier.layout();
    let plain = capacity(&layout, false, name.len());
    let protected = capacity(&layout, true, name.len());
    println!("{}x{} pixels", layout.width, layout.height);
    println!("Capacity: {} ({} bytes)", format_size(plain as u64), plain);
    println!("Capacity with password: {} ({} bytes)", format_size(protected as u64), protected);
    Ok(())
}
