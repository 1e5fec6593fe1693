use crate::commands::{print_json, Context};
use crate::error::not_found;
use crate::util::{or_dash, parse_contact_id};
use anyhow::Result;
use clap::Args;
use dimicall_core::time::{format_date, format_time};
use dimicall_core::{CallSlot, Contact, ContactListItemDto, ScheduledEvent, CALL_SLOTS};

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub limit: Option<usize>,
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub id: String,
}

pub fn list_contacts(ctx: &Context<'_>, args: ListArgs) -> Result<()> {
    let contacts = ctx.store.contacts().list(args.limit, args.offset)?;
    let items: Vec<ContactListItemDto> = contacts.iter().map(ContactListItemDto::from).collect();

    if ctx.json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("no contacts");
        return Ok(());
    }
    for item in items {
        let row = item
            .row_number
            .map(|row| row.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  #{row}  {}  {}  {}  calls {}/{CALL_SLOTS}",
            item.id,
            item.display_name,
            or_dash(item.phone.as_deref()),
            item.status,
            item.calls_used
        );
    }
    Ok(())
}

pub fn show_contact(ctx: &Context<'_>, args: ShowArgs) -> Result<()> {
    let id = parse_contact_id(&args.id)?;
    let contact = ctx
        .store
        .contacts()
        .get(id)?
        .ok_or_else(|| not_found("contact not found"))?;

    if ctx.json {
        return print_json(&contact);
    }
    print_contact(&contact);
    Ok(())
}

fn print_contact(contact: &Contact) {
    println!("{}", contact.display_name());
    println!("id: {}", contact.id);
    println!("phone: {}", or_dash(contact.phone.as_deref()));
    println!("email: {}", or_dash(contact.email.as_deref()));
    println!("source: {}", or_dash(contact.source.as_deref()));
    println!("status: {}", contact.status);
    if let Some(comment) = &contact.comment {
        println!("comment: {comment}");
    }
    if !contact.callback.is_empty() {
        println!("callback: {}", format_event(&contact.callback));
    }
    if !contact.appointment.is_empty() {
        println!("appointment: {}", format_event(&contact.appointment));
    }
    if let Some(duration) = &contact.call_duration {
        println!("last call duration: {duration}");
    }
    println!("calls:");
    for slot in contact.calls.slots() {
        println!("  {}", format_slot(slot));
    }
}

fn format_event(event: &ScheduledEvent) -> String {
    let date = event.date.map(format_date);
    let time = event.time.map(format_time);
    [date, time].into_iter().flatten().collect::<Vec<_>>().join(" ")
}

fn format_slot(slot: &CallSlot) -> String {
    if slot.is_free() {
        return format!("{}. (free)", slot.index);
    }
    let mut line = format!(
        "{}. {} {}",
        slot.index,
        slot.date.map(format_date).unwrap_or_else(|| "-".to_string()),
        slot.status.map(|status| status.label()).unwrap_or("-"),
    );
    if let Some(comment) = &slot.comment {
        line.push_str(" - ");
        line.push_str(comment);
    }
    line
}
