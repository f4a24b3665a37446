use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ifc_pset_sync::config::{Policy, SyncOptions};
use ifc_pset_sync::export::{export_json, export_skipped_csv};
use ifc_pset_sync::parser::load_model;
use ifc_pset_sync::pipeline::{convert_batch, convert_excel_to_ifc, reconcile_files};
use ifc_pset_sync::sync::{find_pipe_assemblies, index_components};

#[derive(Parser, Debug)]
#[command(name = "ifc-pset-sync")]
#[command(about = "Write pipe dimensions from an attribute sheet into IFC models")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct SheetArgs {
    /// Treat unmatched rows and header problems as errors
    #[arg(long)]
    strict: bool,

    /// Worksheet to read (default: first sheet)
    #[arg(long, value_name = "NAME")]
    sheet: Option<String>,
}

impl SheetArgs {
    fn options(&self) -> SyncOptions {
        SyncOptions {
            policy: if self.strict {
                Policy::Strict
            } else {
                Policy::BestEffort
            },
            sheet_name: self.sheet.clone(),
            ..SyncOptions::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Update one model from the attribute sheet
    Sync {
        /// Path to IFC file
        model: PathBuf,

        /// Path to attribute spreadsheet (xlsx, xls, ods or csv)
        attributes: PathBuf,

        /// Output IFC path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        #[command(flatten)]
        sheet: SheetArgs,

        /// Write the sync report as JSON
        #[arg(long, value_name = "FILE")]
        report_json: Option<PathBuf>,

        /// Write skipped rows as CSV
        #[arg(long, value_name = "FILE")]
        report_csv: Option<PathBuf>,
    },

    /// Update several models, writing <name>_updated.<ext> into a folder
    Batch {
        /// Path to attribute spreadsheet
        attributes: PathBuf,

        /// Output folder
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// IFC files to update
        #[arg(required = true)]
        models: Vec<PathBuf>,

        #[command(flatten)]
        sheet: SheetArgs,
    },

    /// Print the component name → GlobalId index as JSON
    Index {
        /// Path to IFC file
        model: PathBuf,
    },

    /// Carry GlobalIds over from an earlier export and tidy names
    Reconcile {
        /// Earlier export whose GlobalIds are kept
        old: PathBuf,

        /// New export to update
        new: PathBuf,

        /// Output IFC path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Sync {
            model,
            attributes,
            output,
            sheet,
            report_json,
            report_csv,
        } => {
            let report = convert_excel_to_ifc(&model, &attributes, &output, &sheet.options())?;
            println!(
                "Updated {}: {} of {} rows matched, {} created, {} updated",
                output.display(),
                report.matched,
                report.records,
                report.properties_created,
                report.properties_updated
            );

            if let Some(path) = &report_json {
                export_json(&report, path)?;
                println!("Exported report to JSON: {}", path.display());
            }
            if let Some(path) = &report_csv {
                export_skipped_csv(&report, path)?;
                println!("Exported skipped rows to CSV: {}", path.display());
            }
        }
        Command::Batch {
            attributes,
            output,
            models,
            sheet,
        } => {
            let batch = convert_batch(&models, &attributes, &output, &sheet.options())?;
            println!("{}", serde_json::to_string_pretty(&batch)?);
            if batch.failed() > 0 {
                color_eyre::eyre::bail!(
                    "{} of {} models failed",
                    batch.failed(),
                    batch.items.len()
                );
            }
        }
        Command::Index { model } => {
            let model = load_model(&model)?;
            let pipes = find_pipe_assemblies(&model);
            let index: std::collections::BTreeMap<_, _> =
                index_components(&model, &pipes).into_iter().collect();
            println!("{}", serde_json::to_string_pretty(&index)?);
        }
        Command::Reconcile { old, new, output } => {
            let report = reconcile_files(&old, &new, &output)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
