//! AcroForm Filler
//!
//! Sets field values by name from a JSON object and writes the result.
//!
//! Usage:
//!   cargo run --bin fill_form -- --context values.json --output filled.pdf form.pdf

use pdf_formkit::config::PdfConfig;
use pdf_formkit::forms::{fill_fields, values_from_json};
use pdf_formkit::validation::validate_and_parse;
use pdf_formkit::writer::DocumentWriter;
use std::path::{Path, PathBuf};

struct FillArgs {
    context: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    input: Option<PathBuf>,
}

impl FillArgs {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut parsed = Self {
            context: None,
            output: None,
            config: None,
            input: None,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--context" => {
                    i += 1;
                    if i < args.len() {
                        parsed.context = Some(PathBuf::from(&args[i]));
                    }
                },
                "--output" | "-o" => {
                    i += 1;
                    if i < args.len() {
                        parsed.output = Some(PathBuf::from(&args[i]));
                    }
                },
                "--config" => {
                    i += 1;
                    if i < args.len() {
                        parsed.config = Some(PathBuf::from(&args[i]));
                    }
                },
                other => parsed.input = Some(PathBuf::from(other)),
            }
            i += 1;
        }

        parsed
    }
}

fn run(
    context: &Path,
    output: &Path,
    input: &Path,
    config: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => PdfConfig::from_json_file(path)?,
        None => PdfConfig::default(),
    };
    let context: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(context)?)?;
    let values = values_from_json(&context)?;

    let (mut doc, _) = validate_and_parse(&std::fs::read(input)?, &config)?;
    let outcome = fill_fields(&mut doc, &values)?;
    println!("Filled {} fields", outcome.filled.len());
    for name in &outcome.missing {
        println!("  no field named '{}'", name);
    }

    DocumentWriter::with_config(&doc, &config).save(output)?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn main() {
    env_logger::init();

    let args = FillArgs::from_args();
    let (context, output, input) = match (&args.context, &args.output, &args.input) {
        (Some(context), Some(output), Some(input)) => (context, output, input),
        _ => {
            eprintln!("Usage: fill_form --context JSON --output PATH [--config FILE] INPUT");
            std::process::exit(2);
        },
    };

    if let Err(e) = run(context, output, input, args.config.as_ref()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
