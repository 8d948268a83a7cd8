//! `chg sources` — provider configuration and state overview.

use anyhow::Result;

use crate::config::Config;
use crate::poll;
use crate::state;

pub fn list_sources(config: &Config) -> Result<()> {
    let stored = poll::load_state(&config.state.path)?;
    let slots = stored
        .as_ref()
        .map(|s| s.source_control_data.clone())
        .unwrap_or_default();

    println!("{:<16} {:<10} {:<8} STATE", "PROVIDER", "TYPE", "SLOT");
    for (index, entry) in config.providers.iter().enumerate() {
        let slot_state = match slots.get(index) {
            Some(slot) if slot.value != state::EMPTY_STATE => "stored",
            Some(_) => "empty",
            None => "absent",
        };
        println!(
            "{:<16} {:<10} {:<8} {}",
            entry.effective_name(),
            entry.kind,
            state::slot_name(index),
            slot_state
        );
    }
    if config.providers.is_empty() {
        println!("(no providers configured)");
    }

    match stored {
        Some(s) => println!("\nlast poll: {}", s.last_poll),
        None => println!("\nlast poll: never (run `chg init`)"),
    }
    Ok(())
}
