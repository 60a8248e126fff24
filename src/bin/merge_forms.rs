//! AcroForm Merger
//!
//! Validates and parses a destination PDF and any number of source PDFs,
//! merges the sources' forms into the destination in order and writes the
//! result.
//!
//! Usage:
//!   cargo run --bin merge_forms -- --output merged.pdf dest.pdf source1.pdf source2.pdf
//!   cargo run --bin merge_forms -- --config config.json --output merged.pdf dest.pdf source.pdf

use pdf_formkit::config::PdfConfig;
use pdf_formkit::document::Document;
use pdf_formkit::forms::combine_forms;
use pdf_formkit::validation::validate_and_parse;
use pdf_formkit::writer::DocumentWriter;
use std::path::{Path, PathBuf};

struct MergeArgs {
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    inputs: Vec<PathBuf>,
}

impl MergeArgs {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut output = None;
        let mut config = None;
        let mut inputs = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--output" | "-o" => {
                    i += 1;
                    if i < args.len() {
                        output = Some(PathBuf::from(&args[i]));
                    }
                },
                "--config" => {
                    i += 1;
                    if i < args.len() {
                        config = Some(PathBuf::from(&args[i]));
                    }
                },
                other => inputs.push(PathBuf::from(other)),
            }
            i += 1;
        }

        Self { output, config, inputs }
    }
}

fn load(path: &Path, config: &PdfConfig) -> Result<Document, Box<dyn std::error::Error>> {
    let data = std::fs::read(path)?;
    let (doc, report) = validate_and_parse(&data, config)?;
    for warning in &report.warnings {
        log::warn!("{}: {}", path.display(), warning);
    }
    Ok(doc)
}

fn run(args: &MergeArgs, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = match args.config {
        Some(ref path) => PdfConfig::from_json_file(path)?,
        None => PdfConfig::default(),
    };

    let mut dest = load(&args.inputs[0], &config)?;
    let mut sources = Vec::with_capacity(args.inputs.len() - 1);
    for path in &args.inputs[1..] {
        sources.push(load(path, &config)?);
    }

    let outcome = combine_forms(&mut dest, sources)?;
    for (path, merge) in args.inputs[1..].iter().zip(&outcome.merges) {
        println!("{}: {:?}", path.display(), merge);
    }

    DocumentWriter::with_config(&dest, &config).save(output)?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn main() {
    env_logger::init();

    let args = MergeArgs::from_args();
    let output = match args.output {
        Some(ref output) if args.inputs.len() >= 2 => output.clone(),
        _ => {
            eprintln!("Usage: merge_forms --output PATH [--config FILE] DEST SOURCE...");
            std::process::exit(2);
        },
    };

    if let Err(e) = run(&args, &output) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
