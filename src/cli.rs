//! Command line front end: resolve a declared type, then check JSON
//! documents against it.
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::manager::{Manager, ManagerOptions};
use crate::result::ValidateResult;
use crate::validator::Validator;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON documents against TypeScript-style interface and type declarations
#[derive(Parser, Debug)]
#[command(name = "tsguard", version)]
pub struct CommandLineInterface {
    /// log resolution steps to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate every input document against a type
    Check(CheckOut),
    /// print the resolved validator tree for a type
    Inspect(InspectOut),
}

#[derive(Args, Debug, Clone)]
struct TypeSettings {
    /// declaration file that bare type names are looked up in
    #[arg(long, short)]
    file: Option<PathBuf>,

    /// type name or inline type expression, e.g. `ReqDemo` or `{ a: string }[]`
    #[arg(long = "type", short = 't')]
    type_expr: String,

    /// reject explicit null in optional fields
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// JSON settings file (strictNullChecks, extensions)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    type_settings: TypeSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// only report failures
    #[arg(long, short)]
    quiet: bool,
}

#[derive(clap::Parser, Debug)]
struct InspectOut {
    #[command(flatten)]
    type_settings: TypeSettings,
}

/// One JSON value to validate, labelled by where it came from.
#[derive(Debug, Clone)]
pub struct Document {
    pub label: String,
    pub value: Value,
}

#[derive(Serialize)]
struct Report<'a> {
    source: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ValidateResult>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeSettings {
    fn options(&self) -> Result<ManagerOptions> {
        let mut options = match &self.config {
            Some(path) => ManagerOptions::from(Config::load(path)?),
            None => ManagerOptions::default(),
        };
        options.strict_null_checks |= self.strict;
        Ok(options)
    }

    fn resolve(&self) -> Result<Validator> {
        let mut manager = Manager::with_options(self.options()?);
        let validator = manager
            .resolve(&self.type_expr, self.file.as_deref())
            .with_context(|| format!("failed to resolve `{}`", self.type_expr))?;
        debug!(cached = manager.cache_len(), kind = validator.kind_name(), "resolved");
        Ok(validator)
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let label = source_path.to_string_lossy().to_string();
            let source = read_source(&source_path).with_context(|| format!("failed to read {label}"))?;
            let values = if self.ndjson {
                source
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(i, line)| {
                        let value = serde_json::from_str::<Value>(line)
                            .with_context(|| format!("failed to parse JSON line {} of {label}", i + 1))?;
                        Ok((format!("{label}:{}", i + 1), value))
                    })
                    .collect::<Result<Vec<_>>>()?
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({label})"))?;
                vec![(label.clone(), value)]
            };
            for (label, value) in values {
                self.process(label, value, &mut documents)?;
            }
        }
        Ok(documents)
    }

    fn process(&self, label: String, value: Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => match value.pointer(pointer) {
                Some(selected) => selected.clone(),
                None => bail!("JSON pointer {pointer} selects nothing in {label}"),
            },
        };
        match self.jq_expr.as_deref() {
            None => out.push(Document { label, value }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {label}"))?;
                let many = results.len() > 1;
                for (i, value) in results.into_iter().enumerate() {
                    let label = if many { format!("{label}#{i}") } else { label.clone() };
                    out.push(Document { label, value });
                }
            }
        }
        Ok(())
    }
}

/// Validate every document in parallel; results keep input order.
pub fn check_documents(validator: &Validator, documents: &[Document]) -> Vec<ValidateResult> {
    documents.par_iter().map(|doc| validator.validate(&doc.value)).collect()
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Check(target) => {
                let validator = target.type_settings.resolve()?;
                let documents = target.input_settings.load_documents()?;
                let results = check_documents(&validator, &documents);
                let failures = results.iter().filter(|r| r.is_error()).count();
                for (doc, result) in documents.iter().zip(&results) {
                    if target.quiet && result.is_success() {
                        continue;
                    }
                    match target.format {
                        OutputFormat::Text => print_text(doc, result),
                        OutputFormat::Json => print_json(doc, result)?,
                    }
                }
                if target.format == OutputFormat::Text {
                    let summary = format!("{} checked, {} failed", documents.len(), failures);
                    if failures == 0 {
                        eprintln!("{}", summary.green());
                    } else {
                        eprintln!("{}", summary.red());
                    }
                }
                Ok(if failures == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
            }
            Command::Inspect(target) => {
                let validator = target.type_settings.resolve()?;
                println!("{validator}");
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn print_text(doc: &Document, result: &ValidateResult) {
    if result.is_success() {
        println!("{} {}", "✓".green(), doc.label);
    } else {
        println!("{} {}: {}", "✗".red(), doc.label, result.to_string().red());
    }
}

fn print_json(doc: &Document, result: &ValidateResult) -> Result<()> {
    let report = Report {
        source: &doc.label,
        ok: result.is_success(),
        path: result.is_error().then(|| result.path()),
        error: result.is_error().then_some(result),
    };
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn read_source(path: &std::path::Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
