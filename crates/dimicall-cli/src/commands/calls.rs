use crate::commands::{print_json, Context};
use crate::error::invalid_input;
use crate::util::{now_utc, parse_call_date, parse_call_instant, parse_contact_id, parse_status};
use anyhow::Result;
use clap::Args;
use dimicall_core::time::CallDuration;
use dimicall_core::{NewCall, RecordedCallDto};
use serde::Serialize;

#[derive(Debug, Args)]
pub struct RecordCallArgs {
    pub id: String,
    /// Call date, e.g. 2024-03-15 or 15/03/2024
    #[arg(long)]
    pub date: Option<String>,
    /// Call outcome, e.g. "Répondeur" or "voicemail"
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub comment: Option<String>,
    #[arg(long, requires = "ended_at")]
    pub started_at: Option<String>,
    #[arg(long, requires = "started_at")]
    pub ended_at: Option<String>,
}

#[derive(Debug, Args)]
pub struct CallDurationArgs {
    #[arg(long)]
    pub started_at: String,
    #[arg(long)]
    pub ended_at: String,
}

#[derive(Debug, Serialize)]
struct DurationReport {
    seconds: u64,
    formatted: String,
    clamped: bool,
}

impl From<CallDuration> for DurationReport {
    fn from(duration: CallDuration) -> Self {
        Self {
            seconds: duration.seconds,
            formatted: duration.to_string(),
            clamped: duration.clamped,
        }
    }
}

pub fn record_call(ctx: &Context<'_>, args: RecordCallArgs) -> Result<()> {
    let id = parse_contact_id(&args.id)?;
    let date = args.date.as_deref().map(parse_call_date).transpose()?;
    let status = args.status.as_deref().map(parse_status).transpose()?;
    let call = NewCall::new(date, status, args.comment.as_deref());
    if call.is_empty() {
        return Err(invalid_input("a call needs at least --date or --status"));
    }
    let duration = match (&args.started_at, &args.ended_at) {
        (Some(start), Some(end)) => Some(CallDuration::between(
            parse_call_instant(start)?,
            parse_call_instant(end)?,
        )),
        _ => None,
    };

    let now = now_utc();
    let recorded = ctx.store.calls().record_call(now, id, &call)?;
    if let Some(duration) = &duration {
        ctx.store.calls().set_duration(now, id, duration)?;
    }

    let dto = RecordedCallDto {
        contact_id: id,
        slot: recorded.slot,
        revision: recorded.revision,
        duration: duration.map(|duration| duration.to_string()),
    };
    if ctx.json {
        return print_json(&dto);
    }
    println!("Recorded call in slot {} of {}", dto.slot.index, dimicall_core::CALL_SLOTS);
    if let Some(duration) = &dto.duration {
        println!("Duration: {duration}");
    }
    Ok(())
}

pub fn call_duration(json: bool, args: CallDurationArgs) -> Result<()> {
    let duration = CallDuration::between(
        parse_call_instant(&args.started_at)?,
        parse_call_instant(&args.ended_at)?,
    );
    if json {
        return print_json(&DurationReport::from(duration));
    }
    println!("{duration}");
    if duration.clamped {
        eprintln!("warning: the call ended before it started; duration set to zero");
    }
    Ok(())
}
