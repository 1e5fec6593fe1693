use crate::commands::{print_json, Context};
use crate::error::invalid_input;
use crate::util::{now_utc, parse_mapping_override};
use anyhow::{Context as _, Result};
use clap::Args;
use dimicall_core::{Contact, ImportRunId, MappingTarget};
use dimicall_ingest::{
    import_path, preview_path, ContactSink, DiscardSink, ImportOptions, ImportResult,
    IngestError, MappingPlan,
};
use dimicall_store::repo::ContactsRepo;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ImportArgs {
    pub file: PathBuf,
    /// Force a column onto a field, e.g. `--map "Portable=phone"` or `--map "Notes=unmapped"`
    #[arg(long = "map", value_name = "COLUMN=FIELD")]
    pub overrides: Vec<String>,
    /// Parse and report without saving anything
    #[arg(long)]
    pub dry_run: bool,
    /// Fill call slots from numbered call columns
    #[arg(long)]
    pub slot_aware: bool,
}

#[derive(Debug, Args)]
pub struct MappingArgs {
    pub file: PathBuf,
    #[arg(long = "map", value_name = "COLUMN=FIELD")]
    pub overrides: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<ImportRunId>,
    dry_run: bool,
    #[serde(flatten)]
    result: &'a ImportResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MappingReport<'a> {
    mappings: &'a dimicall_core::ColumnMappings,
    mapping_info: &'a dimicall_ingest::MappingInfo,
    missing_required: Vec<dimicall_core::CanonicalField>,
}

/// Writes each accepted chunk in one transaction, tagged with the import run.
struct StoreSink<'a> {
    contacts: ContactsRepo<'a>,
    run: ImportRunId,
    now: i64,
}

impl ContactSink for StoreSink<'_> {
    fn accept(&mut self, contacts: Vec<Contact>) -> dimicall_ingest::Result<()> {
        self.contacts
            .insert_many(self.now, Some(self.run), &contacts)
            .map(|_| ())
            .map_err(|err| IngestError::Sink(Box::new(err)))
    }
}

fn options_for(ctx: &Context<'_>, overrides: &[String], slot_aware: bool) -> Result<ImportOptions> {
    let mut options = ctx.config.import_options();
    options.overrides = overrides
        .iter()
        .map(|raw| parse_mapping_override(raw))
        .collect::<Result<Vec<(String, MappingTarget)>>>()?;
    if slot_aware {
        options.normalize.slot_aware = true;
    }
    Ok(options)
}

pub fn import(ctx: &Context<'_>, args: ImportArgs) -> Result<()> {
    let options = options_for(ctx, &args.overrides, args.slot_aware)?;
    let label = args.file.display().to_string();

    let (run_id, result) = if args.dry_run {
        let mut sink = DiscardSink::default();
        let result =
            import_path(&args.file, &options, &mut sink).with_context(|| format!("import {label}"))?;
        (None, result)
    } else {
        let runs = ctx.store.import_runs();
        let run = runs.start(now_utc(), &label)?;
        let mut sink = StoreSink {
            contacts: ctx.store.contacts(),
            run: run.id,
            now: now_utc(),
        };
        let result = match import_path(&args.file, &options, &mut sink) {
            Ok(result) => result,
            Err(err) => {
                runs.finish(now_utc(), run.id, 0, 0, false)?;
                return Err(err).with_context(|| format!("import {label}"));
            }
        };
        runs.finish(
            now_utc(),
            run.id,
            result.accepted_count,
            result.rejected_count,
            result.complete,
        )?;
        (Some(run.id), result)
    };

    if ctx.json {
        print_json(&ImportReport {
            run_id,
            dry_run: args.dry_run,
            result: &result,
        })?;
    } else {
        print_import_summary(&label, args.dry_run, &result);
    }

    if result.needs_mapping {
        return Err(invalid_input(
            "required fields are not mapped; see `dimicall mapping` and pass --map COLUMN=FIELD",
        ));
    }
    Ok(())
}

fn print_import_summary(label: &str, dry_run: bool, result: &ImportResult) {
    let verb = if dry_run { "Checked" } else { "Imported" };
    println!(
        "{verb} {label}: accepted {}, rejected {}",
        result.accepted_count, result.rejected_count
    );
    if !result.complete {
        println!("Import stopped early: the rest of the file could not be read.");
    }
    if let Some(info) = &result.mapping_info {
        println!("Unmapped columns: {}", info.unmapped_headers.join(", "));
    }
    if !result.errors.is_empty() {
        println!("Rejected rows:");
        for error in &result.errors {
            println!("- {error}");
        }
    }
    if !result.warnings.is_empty() {
        println!("Warnings:");
        for warning in &result.warnings {
            println!("- {warning}");
        }
    }
}

pub fn mapping(ctx: &Context<'_>, args: MappingArgs) -> Result<()> {
    let options = options_for(ctx, &args.overrides, false)?;
    let MappingPlan { mappings, info } = preview_path(&args.file, &options)
        .with_context(|| format!("read header of {}", args.file.display()))?;
    let missing_required = mappings.missing_required();

    if ctx.json {
        return print_json(&MappingReport {
            mappings: &mappings,
            mapping_info: &info,
            missing_required,
        });
    }

    for mapping in mappings.iter() {
        println!(
            "{:<30} -> {} (priority {})",
            mapping.source_column, mapping.target_field, mapping.priority
        );
    }
    for conflict in mappings.conflicts() {
        println!("warning: {conflict}");
    }
    if !missing_required.is_empty() {
        let fields = missing_required
            .iter()
            .map(|field| field.key())
            .collect::<Vec<_>>()
            .join(", ");
        println!("missing required fields: {fields}");
    }
    Ok(())
}

pub fn list_runs(ctx: &Context<'_>) -> Result<()> {
    let runs = ctx.store.import_runs().list()?;
    if ctx.json {
        let items: Vec<_> = runs
            .iter()
            .map(|run| {
                serde_json::json!({
                    "id": run.id,
                    "source": run.source,
                    "started_at": run.started_at,
                    "finished_at": run.finished_at,
                    "accepted_count": run.accepted_count,
                    "rejected_count": run.rejected_count,
                    "complete": run.complete,
                })
            })
            .collect();
        return print_json(&items);
    }
    if runs.is_empty() {
        println!("no imports");
        return Ok(());
    }
    for run in runs {
        let state = if run.complete { "complete" } else { "partial" };
        println!(
            "{}  {}  accepted {}  rejected {}  {}",
            run.id, run.source, run.accepted_count, run.rejected_count, state
        );
    }
    Ok(())
}
