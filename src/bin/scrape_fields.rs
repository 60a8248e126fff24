//! AcroForm Field Scraper
//!
//! Validates each input PDF, lists its form field names and prints a JSON
//! report. With `--stamp`, every field gets the value and the changed
//! documents are written to the output directory.
//!
//! Usage:
//!   cargo run --bin scrape_fields -- form1.pdf form2.pdf
//!   cargo run --bin scrape_fields -- --stamp "STUFF!" --output-dir out --output-name stamped.pdf form.pdf
//!   cargo run --bin scrape_fields -- --config config.json --pretty form.pdf

use pdf_formkit::config::PdfConfig;
use pdf_formkit::forms::{scrape_files, ScrapeOptions};
use pdf_formkit::object::Object;
use std::path::PathBuf;

struct ScrapeArgs {
    files: Vec<PathBuf>,
    stamp: Option<String>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
    config: Option<PathBuf>,
    pretty: bool,
}

impl ScrapeArgs {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut parsed = Self {
            files: Vec::new(),
            stamp: None,
            output_dir: None,
            output_name: None,
            config: None,
            pretty: false,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--stamp" => {
                    i += 1;
                    if i < args.len() {
                        parsed.stamp = Some(args[i].clone());
                    }
                },
                "--output-dir" => {
                    i += 1;
                    if i < args.len() {
                        parsed.output_dir = Some(PathBuf::from(&args[i]));
                    }
                },
                "--output-name" => {
                    i += 1;
                    if i < args.len() {
                        parsed.output_name = Some(args[i].clone());
                    }
                },
                "--config" => {
                    i += 1;
                    if i < args.len() {
                        parsed.config = Some(PathBuf::from(&args[i]));
                    }
                },
                "--pretty" => {
                    parsed.pretty = true;
                },
                other => parsed.files.push(PathBuf::from(other)),
            }
            i += 1;
        }

        parsed
    }
}

fn main() {
    env_logger::init();

    let args = ScrapeArgs::from_args();
    if args.files.is_empty() {
        eprintln!("Usage: scrape_fields [--stamp VALUE] [--output-dir DIR] [--output-name NAME] [--config FILE] FILE...");
        std::process::exit(2);
    }

    let config = match args.config {
        Some(ref path) => match PdfConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error reading config {}: {}", path.display(), e);
                std::process::exit(2);
            },
        },
        None => PdfConfig::default(),
    };

    let mut options = ScrapeOptions::new().with_config(config);
    if let Some(ref value) = args.stamp {
        options = options.with_stamp(Object::text(value));
    }
    let output_dir = args.output_dir.clone().unwrap_or_else(|| options.output_dir.clone());
    let output_name = args.output_name.clone().unwrap_or_else(|| options.output_name.clone());
    options = options.with_output(output_dir, output_name);

    let report = scrape_files(&args.files, &options);
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match json {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error encoding report: {}", e);
            std::process::exit(1);
        },
    }

    // Exit non-zero only when no file could be read.
    if report.failures().count() == report.files.len() {
        std::process::exit(1);
    }
}
