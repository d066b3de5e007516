//! Profile management CLI commands
//!
//! Handles: rigsync profile list/show/create/delete/rename

use clap::Subcommand;
use serde_json::json;
use std::io::{self, Write};

use rigsync_core::profile::DEFAULT_PROFILE;
use rigsync_core::util::dir_has_entries;
use rigsync_core::{AppSettings, DeviceId, Profile, ProfileStore, SyncRoot};

/// Profile commands
#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List all profiles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show profile details
    Show {
        /// Profile name
        name: String,
    },
    /// Create a new empty profile
    Create {
        /// Profile name
        name: String,
    },
    /// Delete a profile and every capture under it
    Delete {
        /// Profile name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Rename a profile
    Rename {
        /// Current profile name
        name: String,
        /// New profile name
        new_name: String,
    },
}

/// Execute a profile command
pub fn execute(cmd: ProfileCommands, root: SyncRoot) -> anyhow::Result<()> {
    let store = ProfileStore::open(root.clone())?;

    match cmd {
        ProfileCommands::List { json } => list(&store, &root, json),
        ProfileCommands::Show { name } => show(&store, &name),
        ProfileCommands::Create { name } => {
            let profile = store.create(&name)?;
            println!("Created profile: {}", profile.name);
            Ok(())
        }
        ProfileCommands::Delete { name, force } => delete(&store, &root, &name, force),
        ProfileCommands::Rename { name, new_name } => rename(&store, &root, &name, &new_name),
    }
}

fn list(store: &ProfileStore, root: &SyncRoot, json_output: bool) -> anyhow::Result<()> {
    let names = store.list()?;
    let settings = AppSettings::load(root);

    if json_output {
        let output = json!({
            "count": names.len(),
            "profiles": names,
            "lastSelectedProfile": settings.last_selected_profile,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Profiles:");
    for name in &names {
        if *name == settings.last_selected_profile {
            println!("  {name} (last selected)");
        } else {
            println!("  {name}");
        }
    }
    Ok(())
}

fn show(store: &ProfileStore, name: &str) -> anyhow::Result<()> {
    // A capture directory without metadata still counts as a profile; it
    // reads back with default metadata, same as the engine treats it.
    let profile = match store.get(name)? {
        Some(profile) => profile,
        None => {
            if !store.list()?.iter().any(|known| known == name) {
                anyhow::bail!("profile '{name}' not found");
            }
            Profile::new(name)
        }
    };

    println!("Profile: {}", profile.name);
    println!("Created: {}", profile.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!(
        "Modified: {}",
        profile.last_modified.format("%Y-%m-%d %H:%M:%S")
    );
    if !profile.notes.is_empty() {
        println!("Notes: {}", profile.notes);
    }

    let dir = store.profile_dir(name);
    println!("\nDevices:");
    for device in DeviceId::ALL {
        let enabled = if profile.is_enabled(device) {
            "enabled"
        } else {
            "disabled"
        };
        let captured = if dir_has_entries(&dir.join(device.capture_dir())) {
            "captured"
        } else {
            "no capture"
        };
        println!("  {:<15} {enabled:<10} {captured}", device.as_str());
    }
    Ok(())
}

fn delete(store: &ProfileStore, root: &SyncRoot, name: &str, force: bool) -> anyhow::Result<()> {
    if !force {
        print!("Delete profile '{name}' and all of its captures? [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete(name)?;
    println!("Deleted profile: {name}");

    let mut settings = AppSettings::load(root);
    if settings.last_selected_profile == name {
        settings.last_selected_profile = DEFAULT_PROFILE.to_string();
        settings.save(root)?;
    }
    Ok(())
}

fn rename(store: &ProfileStore, root: &SyncRoot, name: &str, new_name: &str) -> anyhow::Result<()> {
    store.rename(name, new_name)?;
    println!("Renamed profile '{name}' to '{new_name}'");

    let mut settings = AppSettings::load(root);
    if settings.last_selected_profile == name {
        settings.last_selected_profile = new_name.to_string();
        settings.save(root)?;
    }
    Ok(())
}
