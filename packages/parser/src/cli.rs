//! Command-line interface for the parser.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::batch::{BatchRunner, BatchStats};
use crate::config::BatchConfig;
use crate::error::{ParserError, Result};
use crate::schema::SchemaValidator;

/// S2ORC Parser - Turn flat annotated full-text records into hierarchical documents.
#[derive(Parser)]
#[command(name = "s2orc-parser")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse JSONL record files into one JSONL file of documents.
    Parse {
        /// Input JSONL files, processed in sorted path order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output JSONL file
        #[arg(short, long)]
        output: PathBuf,

        /// Worker threads (default: S2ORC_WORKERS or one per core)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Lines per parallel chunk (default: S2ORC_CHUNK_SIZE or 1024)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Skip schema validation of the built documents
        #[arg(long)]
        no_validate: bool,
    },

    /// Check every line of a document file against the output schema.
    Validate {
        /// JSONL file of documents
        file: PathBuf,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            inputs,
            output,
            workers,
            chunk_size,
            no_validate,
        } => {
            let mut config = BatchConfig::from_env().with_validation(!no_validate);
            if let Some(workers) = workers {
                config = config.with_workers(workers);
            }
            if let Some(chunk_size) = chunk_size {
                config = config.with_chunk_size(chunk_size);
            }
            parse_command(inputs, &output, &config)
        }
        Commands::Validate { file } => validate_command(&file),
    }
}

/// Execute the parse command.
fn parse_command(mut inputs: Vec<PathBuf>, output: &Path, config: &BatchConfig) -> Result<()> {
    inputs.sort();
    inputs.dedup();

    // Fail before creating the output file
    for input in &inputs {
        if !input.is_file() {
            return Err(ParserError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Input file does not exist: {}", input.display()),
            )));
        }
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(ParserError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Output directory does not exist: {}", parent.display()),
            )));
        }
    }

    println!(
        "{} {} file(s) into {}",
        style("Parsing").bold(),
        style(inputs.len()).cyan(),
        style(output.display()).green()
    );
    println!();

    // One pool and one compiled schema for every input file.
    let runner = BatchRunner::new(config)?;

    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let mut writer = BufWriter::new(File::create(output)?);
    let mut total = BatchStats::default();

    for input in &inputs {
        let name = input.display().to_string();
        pb.set_message(format!("{name}..."));
        tracing::info!(input = %name, "processing input file");

        let reader = BufReader::new(File::open(input)?);
        let result = runner.run_with_progress(reader, &mut writer, |stats| {
            pb.set_message(format!("{name}: {} records", stats.processed));
        });

        let stats = match result {
            Ok(stats) => stats,
            Err(e) => {
                pb.finish_and_clear();
                return Err(e);
            }
        };

        pb.println(format!(
            "  {} {} written, {} skipped",
            style(&name).dim(),
            style(stats.written).green(),
            style(stats.skipped).yellow()
        ));
        total += stats;
    }

    pb.finish_and_clear();

    println!();
    println!("  Records: {}", total.processed);
    println!("  Written: {}", style(total.written).green());
    if total.skipped > 0 {
        println!("  Skipped: {}", style(total.skipped).yellow().bold());
    }
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        output.display()
    );

    Ok(())
}

/// Execute the validate command.
fn validate_command(file: &Path) -> Result<()> {
    let validator = SchemaValidator::new()?;
    let reader = BufReader::new(File::open(file)?);

    let (checked, failures) = validate_lines(reader, &validator)?;

    for failure in &failures {
        println!("  {} {}", style("✗").red(), failure);
    }

    if failures.is_empty() {
        println!(
            "{} {} document(s) in {}",
            style("Valid:").green().bold(),
            checked,
            file.display()
        );
        Ok(())
    } else {
        Err(ParserError::SchemaValidation { errors: failures })
    }
}

/// Validate every non-blank line, returning the line count and failures.
fn validate_lines<R: BufRead>(
    reader: R,
    validator: &SchemaValidator,
) -> Result<(usize, Vec<String>)> {
    let mut checked = 0;
    let mut failures = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        checked += 1;

        let outcome = serde_json::from_str::<serde_json::Value>(&line)
            .map_err(ParserError::from)
            .and_then(|value| validator.validate(&value));
        if let Err(e) = outcome {
            failures.push(format!("line {}: {e}", index + 1));
        }
    }

    Ok((checked, failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_cli_parse_parse_command() {
        let cli = Cli::parse_from([
            "s2orc-parser",
            "parse",
            "b.jsonl",
            "a.jsonl",
            "--output",
            "out.jsonl",
        ]);

        let Commands::Parse {
            inputs,
            output,
            workers,
            chunk_size,
            no_validate,
        } = cli.command
        else {
            panic!("expected parse command");
        };
        assert_eq!(inputs, vec![PathBuf::from("b.jsonl"), PathBuf::from("a.jsonl")]);
        assert_eq!(output, PathBuf::from("out.jsonl"));
        assert!(workers.is_none());
        assert!(chunk_size.is_none());
        assert!(!no_validate);
    }

    #[test]
    fn test_cli_parse_parse_with_options() {
        let cli = Cli::parse_from([
            "s2orc-parser",
            "parse",
            "in.jsonl",
            "-o",
            "out.jsonl",
            "--workers",
            "4",
            "--chunk-size",
            "16",
            "--no-validate",
        ]);

        let Commands::Parse {
            workers,
            chunk_size,
            no_validate,
            ..
        } = cli.command
        else {
            panic!("expected parse command");
        };
        assert_eq!(workers, Some(4));
        assert_eq!(chunk_size, Some(16));
        assert!(no_validate);
    }

    #[test]
    fn test_cli_parse_requires_input() {
        let result = Cli::try_parse_from(["s2orc-parser", "parse", "--output", "out.jsonl"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_validate() {
        let cli = Cli::parse_from(["s2orc-parser", "validate", "docs.jsonl"]);
        let Commands::Validate { file } = cli.command else {
            panic!("expected validate command");
        };
        assert_eq!(file, PathBuf::from("docs.jsonl"));
    }

    #[test]
    fn test_validate_lines_reports_line_numbers() {
        let validator = SchemaValidator::new().expect("validator");
        let valid = serde_json::json!({
            "corpusid": 1,
            "externalids": {},
            "title": null,
            "abstract": null,
            "sections": [],
            "bibliography": {},
            "figures": {},
            "tables": {},
            "formulas": {}
        });
        let input = format!("{valid}\n\n{{\"corpusid\": 2}}\nnot json\n");

        let (checked, failures) = validate_lines(Cursor::new(input), &validator).expect("read");

        assert_eq!(checked, 3);
        assert_eq!(failures.len(), 2);
        assert!(failures[0].starts_with("line 3: "));
        assert!(failures[1].starts_with("line 4: "));
    }
}
