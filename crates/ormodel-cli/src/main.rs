mod commands;
mod reader;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ormodel_core::{
    merge_overlays, BuildOptions, Diagnostic, DiagnosticSeverity, Metamodel, MetamodelDocument,
};
use reader::{load_unit, LoadedUnit};

#[derive(Parser)]
#[command(
    name = "ormodel",
    version,
    about = "ORM metamodel builder: resolve entity metadata into managed types and attributes"
)]
struct Cli {
    /// Persistence unit to build (defaults to the first unit in persistence.yaml)
    #[arg(long, global = true)]
    unit: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the metamodel and output it as JSON
    Build {
        /// Input path (metadata file or directory, defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reject overrides that change an attribute's category
        #[arg(long)]
        strict: bool,
    },

    /// Show the attributes of one managed type
    Inspect {
        /// Class name (fully qualified or unambiguous simple name)
        class: String,

        /// Input path (metadata file or directory, defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Only list attributes declared by the type itself
        #[arg(long)]
        declared: bool,
    },

    /// Analyze associations and inheritance and output a graph
    Analyze {
        /// Input path (metadata file or directory, defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format: mermaid (default) or dot
        #[arg(long, default_value = "mermaid")]
        format: String,
    },

    /// Build the metamodel and report diagnostics
    Validate {
        /// Input path (metadata file or directory, defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Reject overrides that change an attribute's category
        #[arg(long)]
        strict: bool,

        /// Output format: human (default) or json
        #[arg(long, default_value = "human")]
        format: String,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("ORMODEL_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let unit = cli.unit.as_deref();

    match cli.command {
        Commands::Build {
            path,
            output,
            strict,
        } => match run_build(&path, unit, output.as_deref(), strict) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
        Commands::Inspect {
            class,
            path,
            declared,
        } => match commands::inspect::run_inspect(&path, unit, &class, declared) {
            Ok(output) => println!("{output}"),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
        Commands::Analyze { path, format } => {
            match commands::analyze::run_analyze(&path, unit, &format) {
                Ok(output) => println!("{output}"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
        Commands::Validate {
            path,
            strict,
            format,
        } => match run_validate(&path, unit, strict, &format) {
            Ok((output, error_count)) => {
                println!("{output}");
                if error_count > 0 {
                    process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
    }
}

/// Read, merge and filter one unit's metadata.
fn prepare(
    input_path: &Path,
    unit: Option<&str>,
) -> Result<(LoadedUnit, Vec<ormodel_core::ManagedTypeMetadata>), String> {
    let loaded = load_unit(input_path, unit)?;
    if loaded.metadata.is_empty() && loaded.overlays.is_empty() {
        return Err(format!(
            "No metadata files (*.meta.json) found at: {}",
            input_path.display()
        ));
    }

    let mut merged = merge_overlays(loaded.metadata.clone(), &loaded.overlays);
    if !loaded.classes.is_empty() {
        merged.retain(|m| loaded.classes.contains(&m.class_name));
    }
    Ok((loaded, merged))
}

pub fn build_model(
    input_path: &Path,
    unit: Option<&str>,
    strict: bool,
) -> Result<(LoadedUnit, Metamodel), String> {
    let (loaded, merged) = prepare(input_path, unit)?;
    let model = Metamodel::build(&merged, &BuildOptions { strict }).map_err(|e| {
        let d = e.to_diagnostic();
        format!("{}:{}:{} error[{}]: {}", d.file, d.line, d.col, d.code, d.message)
    })?;
    Ok((loaded, model))
}

fn run_build(
    input_path: &Path,
    unit: Option<&str>,
    output_file: Option<&Path>,
    strict: bool,
) -> Result<String, String> {
    let (loaded, model) = build_model(input_path, unit, strict)?;
    let document = MetamodelDocument::from_model(&model);

    let mut value =
        serde_json::to_value(&document).map_err(|e| format!("JSON serialization error: {e}"))?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("unit".into(), serde_json::json!(loaded.name));
        obj.insert("sources".into(), serde_json::json!(loaded.sources));
        obj.insert("properties".into(), serde_json::json!(loaded.properties));
    }
    let json = serde_json::to_string_pretty(&value)
        .map_err(|e| format!("JSON serialization error: {e}"))?;

    if let Some(out_path) = output_file {
        std::fs::write(out_path, &json)
            .map_err(|e| format!("Failed to write {}: {e}", out_path.display()))?;
        return Ok(format!("Written to {}", out_path.display()));
    }

    Ok(json)
}

fn run_validate(
    input_path: &Path,
    unit: Option<&str>,
    strict: bool,
    format: &str,
) -> Result<(String, usize), String> {
    let (loaded, merged) = prepare(input_path, unit)?;

    let (diagnostics, type_count): (Vec<Diagnostic>, usize) =
        match Metamodel::build(&merged, &BuildOptions { strict }) {
            Ok(model) => (model.warnings().to_vec(), model.len()),
            Err(e) => (vec![e.to_diagnostic()], 0),
        };

    let error_count = diagnostics
        .iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .count();
    let warning_count = diagnostics.len() - error_count;
    let file_count = loaded.sources.len() + loaded.overlays.len();

    if format == "json" {
        let output = serde_json::json!({
            "diagnostics": diagnostics,
            "summary": {
                "errors": error_count,
                "warnings": warning_count,
                "types": type_count,
                "files": file_count,
            }
        });
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| format!("JSON serialization error: {e}"))?;
        return Ok((json, error_count));
    }

    // Human-readable format
    let mut lines: Vec<String> = Vec::new();

    for d in &diagnostics {
        let severity = match d.severity {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
        };
        lines.push(format!(
            "{}:{}:{} {}[{}]: {}",
            d.file, d.line, d.col, severity, d.code, d.message
        ));
    }

    let error_word = if error_count == 1 { "error" } else { "errors" };
    let warning_word = if warning_count == 1 {
        "warning"
    } else {
        "warnings"
    };
    let file_word = if file_count == 1 { "file" } else { "files" };
    lines.push(format!(
        "{error_count} {error_word}, {warning_count} {warning_word} in {file_count} {file_word}."
    ));

    Ok((lines.join("\n"), error_count))
}
