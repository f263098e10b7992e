use anyhow::Result;
use notion_ics_core::CalendarBundle;
use notion_ics_core::config::Config;

use super::{OutputArgs, read_input, write_calendar};

pub fn run(cfg: &Config, input: &str, output: &OutputArgs) -> Result<()> {
    let json = read_input(input)?;
    let bundle = CalendarBundle::from_json(&json)?;

    write_calendar(&bundle, cfg, output)?;

    Ok(())
}
