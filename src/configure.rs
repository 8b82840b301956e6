use crate::settings::{
    clamp_endpoint_index, endpoint_label, Settings, SettingsStore, ENDPOINT_SLOTS,
    QUICK_ACTION_SLOTS,
};
use anyhow::Result;
use std::io::{self, Write};
use std::path::Path;

pub fn run(data_dir: &Path) -> Result<()> {
    let store = SettingsStore::new(data_dir);
    let mut settings = store.load();
    let mut dirty = false;

    println!("hookpost configure");
    println!("Data dir: {}", data_dir.display());
    println!();

    loop {
        println!("Menu:");
        println!("1. Configure endpoints");
        println!("2. Configure quick actions");
        println!("3. Clear all endpoints");
        println!("4. Save and exit");
        println!("5. Exit without saving");
        print!("Select an option: ");
        io::stdout().flush().ok();

        let choice = read_line()?.trim().to_string();
        println!();

        match choice.as_str() {
            "1" => {
                dirty |= configure_endpoints(&mut settings)?;
            }
            "2" => {
                dirty |= configure_quick_actions(&mut settings)?;
            }
            "3" => {
                settings.endpoints.iter_mut().for_each(|e| {
                    e.name.clear();
                    e.url.clear();
                });
                settings.last_index = 0;
                dirty = true;
                println!("Endpoints cleared (not yet saved).");
            }
            "4" => {
                if dirty {
                    match store.save(&settings) {
                        Ok(()) => {
                            println!("Saved.");
                            break;
                        }
                        // All-or-nothing: the message names the bad slot.
                        Err(e) => println!("Not saved: {e}"),
                    }
                } else {
                    println!("No changes to save.");
                    break;
                }
            }
            "5" | "q" | "Q" => {
                if dirty {
                    println!("Exited without saving.");
                }
                break;
            }
            _ => {
                println!("Invalid option.");
            }
        }
        println!();
    }

    Ok(())
}

fn configure_endpoints(settings: &mut Settings) -> Result<bool> {
    let mut dirty = false;
    loop {
        for (i, endpoint) in settings.endpoints.iter().enumerate() {
            println!("{}. {}", i + 1, endpoint_label(i, endpoint));
        }
        print!("Slot to edit (1-{ENDPOINT_SLOTS}, empty to finish): ");
        io::stdout().flush().ok();

        let input = read_line()?.trim().to_string();
        if input.is_empty() {
            break;
        }
        let Some(slot) = parse_slot(&input, ENDPOINT_SLOTS) else {
            println!("Invalid slot.");
            continue;
        };

        let endpoint = &mut settings.endpoints[slot];
        let name = prompt_with_current("Name", &endpoint.name)?;
        let url = prompt_with_current("URL (https://discord.com/api/webhooks/…)", &endpoint.url)?;
        endpoint.name = name.trim().to_string();
        endpoint.url = url.trim().to_string();
        dirty = true;
        println!();
    }
    Ok(dirty)
}

fn configure_quick_actions(settings: &mut Settings) -> Result<bool> {
    let mut dirty = false;
    loop {
        for (i, qa) in settings.quick_actions.iter().enumerate() {
            let state = if qa.message.is_empty() { "not set" } else { "set" };
            println!("{}. {} [{}]", i + 1, qa.label, state);
        }
        print!("Action to edit (1-{QUICK_ACTION_SLOTS}, empty to finish): ");
        io::stdout().flush().ok();

        let input = read_line()?.trim().to_string();
        if input.is_empty() {
            break;
        }
        let Some(slot) = parse_slot(&input, QUICK_ACTION_SLOTS) else {
            println!("Invalid action.");
            continue;
        };

        let current_endpoint = settings.quick_actions[slot].endpoint_index;
        let label = prompt_with_current("Label", &settings.quick_actions[slot].label)?;
        let message = prompt_with_current("Message", &settings.quick_actions[slot].message)?;
        let endpoint_raw = prompt_with_current(
            "Endpoint slot (1-5)",
            &format!("{}", current_endpoint + 1),
        )?;

        let qa = &mut settings.quick_actions[slot];
        qa.label = if label.trim().is_empty() {
            format!("{}", slot + 1)
        } else {
            label.trim().to_string()
        };
        qa.message = message.trim().to_string();
        qa.endpoint_index = endpoint_raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .map(clamp_endpoint_index)
            .unwrap_or(current_endpoint);
        dirty = true;
        println!();
    }
    Ok(dirty)
}

fn parse_slot(input: &str, slots: usize) -> Option<usize> {
    match input.parse::<usize>() {
        Ok(n) if (1..=slots).contains(&n) => Some(n - 1),
        _ => None,
    }
}

fn prompt_with_current(label: &str, current: &str) -> Result<String> {
    if current.trim().is_empty() {
        print!("{label}: ");
    } else {
        print!("{label} [{current}]: ");
    }
    io::stdout().flush().ok();
    let input = read_line()?.trim().to_string();
    if input.is_empty() && !current.trim().is_empty() {
        Ok(current.to_string())
    } else {
        Ok(input)
    }
}

fn read_line() -> Result<String> {
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(buf)
}
