use anyhow::Result;
use dimicall_config::AppConfig;
use dimicall_store::Store;
use serde::Serialize;
use std::io::{self, Write};

pub mod calls;
pub mod completions;
pub mod contacts;
pub mod export;
pub mod import;

pub struct Context<'a> {
    pub store: &'a Store,
    pub json: bool,
    pub config: &'a AppConfig,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
