use crate::commands::{print_json, Context};
use anyhow::{anyhow, Context as _, Result};
use clap::{Args, Subcommand};
use dimicall_ingest::export::export_contacts_csv;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Subcommand)]
pub enum ExportCommand {
    /// Write every contact as CSV with French column headers
    Csv(ExportCsvArgs),
}

#[derive(Debug, Args)]
pub struct ExportCsvArgs {
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ExportReport {
    format: String,
    count: usize,
    output: Option<String>,
}

pub fn export_csv(ctx: &Context<'_>, args: ExportCsvArgs) -> Result<()> {
    let contacts = ctx.store.contacts().list(None, 0)?;
    let data = export_contacts_csv(&contacts)?;
    write_export(
        ctx,
        ExportReport {
            format: "csv".to_string(),
            count: contacts.len(),
            output: args.out.as_ref().map(|path| path.display().to_string()),
        },
        args.out.as_deref(),
        &data,
    )
}

fn write_export(ctx: &Context<'_>, report: ExportReport, out: Option<&Path>, data: &str) -> Result<()> {
    let Some(path) = out else {
        if ctx.json {
            return Err(anyhow!("--json requires --out for export commands"));
        }
        print!("{data}");
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create export directory {}", parent.display()))?;
    }
    fs::write(path, data).with_context(|| format!("write export file {}", path.display()))?;
    if ctx.json {
        print_json(&report)
    } else {
        println!("Exported {} contacts to {}", report.count, path.display());
        Ok(())
    }
}
