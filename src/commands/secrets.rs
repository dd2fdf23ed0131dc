//! `kvault secret ...` handlers
//!
//! Each handler calls one [`SecretClient`] operation and prints the result
//! either as pretty JSON (`--json`) or as a human-readable summary/table.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use colored::Colorize;
use prettytable::{cell, row, Table};
use serde::Serialize;

use crate::cli::SecretCommand;
use crate::config::Config;
use crate::error::{KvaultError, Result};
use crate::secrets::{
    DeletedSecretBundle, DeletedSecretItem, SecretAttributes, SecretBundle, SecretClient,
    SecretItem, SecretSetParameters, SecretUpdateParameters,
};

/// Builds a client from `config` and runs `command`.
///
/// # Errors
///
/// Returns configuration, authentication, transport and service errors.
pub async fn handle_secret(config: &Config, command: SecretCommand, json: bool) -> Result<()> {
    let client = SecretClient::from_config(config)?;
    run(&client, command, json).await
}

/// Runs `command` against an existing client.
pub async fn run(client: &SecretClient, command: SecretCommand, json: bool) -> Result<()> {
    match command {
        SecretCommand::Set {
            name,
            value,
            file,
            content_type,
            tags,
            disabled,
            expires,
            not_before,
        } => {
            let value = match (value, file) {
                (Some(value), _) => value,
                (None, Some(path)) => read_value_file(&path)?,
                (None, None) => {
                    return Err(KvaultError::InvalidArgument(
                        "either --value or --file is required".to_string(),
                    )
                    .into())
                }
            };
            let parameters = SecretSetParameters {
                value,
                tags: tag_map(tags),
                content_type,
                attributes: attributes(disabled.then_some(false), expires, not_before),
            };
            let bundle = client.set_secret(&name, &parameters).await?;
            output_bundle(&bundle, json, false)
        }
        SecretCommand::Get { name, version } => {
            let bundle = client.get_secret(&name, version.as_deref()).await?;
            output_bundle(&bundle, json, true)
        }
        SecretCommand::Update {
            name,
            version,
            content_type,
            tags,
            enabled,
            expires,
        } => {
            let parameters = SecretUpdateParameters {
                content_type,
                attributes: attributes(enabled, expires, None),
                tags: tag_map(tags),
            };
            let bundle = client
                .update_secret_properties(&name, version.as_deref(), &parameters)
                .await?;
            output_bundle(&bundle, json, false)
        }
        SecretCommand::Delete { name } => {
            let deleted = client.delete_secret(&name).await?;
            output_deleted(&deleted, json)
        }
        SecretCommand::ShowDeleted { name } => {
            let deleted = client.get_deleted_secret(&name).await?;
            output_deleted(&deleted, json)
        }
        SecretCommand::Recover { name } => {
            let bundle = client.recover_deleted_secret(&name).await?;
            output_bundle(&bundle, json, false)
        }
        SecretCommand::Purge { name } => {
            client.purge_deleted_secret(&name).await?;
            if json {
                print_json(&serde_json::json!({"purged": name}))
            } else {
                println!("{} {}", "Purged".green(), name);
                Ok(())
            }
        }
        SecretCommand::Backup { name, output } => {
            let backup = client.backup_secret(&name).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &backup.value).map_err(KvaultError::Io)?;
                    println!("Backup of {} written to {}", name, path.display());
                    Ok(())
                }
                None if json => print_json(&backup),
                None => {
                    println!("{}", backup.value);
                    Ok(())
                }
            }
        }
        SecretCommand::Restore { input } => {
            let blob = std::fs::read_to_string(&input).map_err(KvaultError::Io)?;
            let bundle = client.restore_secret(&blob).await?;
            output_bundle(&bundle, json, false)
        }
        SecretCommand::List { max_results } => {
            let items = SecretClient::collect_all(client.list_secrets(max_results)).await?;
            if json {
                return print_json(&items);
            }
            println!("\nSecrets in {}:\n", client.vault_url());
            print!("{}", items_table(&items));
            println!();
            Ok(())
        }
        SecretCommand::Versions { name, max_results } => {
            let items =
                SecretClient::collect_all(client.list_secret_versions(&name, max_results)).await?;
            if json {
                return print_json(&items);
            }
            println!("\nVersions of {}:\n", name);
            print!("{}", versions_table(&items));
            println!();
            Ok(())
        }
        SecretCommand::ListDeleted { max_results } => {
            let items =
                SecretClient::collect_all(client.list_deleted_secrets(max_results)).await?;
            if json {
                return print_json(&items);
            }
            println!("\nDeleted secrets in {}:\n", client.vault_url());
            print!("{}", deleted_table(&items));
            println!();
            Ok(())
        }
    }
}

fn read_value_file(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        KvaultError::InvalidArgument(format!("cannot read {}: {}", path.display(), e))
    })?;
    Ok(raw.trim_end_matches(['\r', '\n']).to_string())
}

fn tag_map(tags: Vec<(String, String)>) -> Option<HashMap<String, String>> {
    if tags.is_empty() {
        None
    } else {
        Some(tags.into_iter().collect())
    }
}

fn attributes(
    enabled: Option<bool>,
    expires: Option<DateTime<Utc>>,
    not_before: Option<DateTime<Utc>>,
) -> Option<SecretAttributes> {
    if enabled.is_none() && expires.is_none() && not_before.is_none() {
        return None;
    }
    Some(SecretAttributes {
        enabled,
        exp: expires,
        nbf: not_before,
        ..SecretAttributes::default()
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(KvaultError::Serialization)?;
    println!("{}", json);
    Ok(())
}

fn output_bundle(bundle: &SecretBundle, json: bool, show_value: bool) -> Result<()> {
    if json {
        if show_value {
            return print_json(bundle);
        }
        let mut redacted = bundle.clone();
        redacted.value = None;
        return print_json(&redacted);
    }
    print!("{}", bundle_details(bundle, show_value));
    Ok(())
}

fn output_deleted(deleted: &DeletedSecretBundle, json: bool) -> Result<()> {
    if json {
        let mut redacted = deleted.clone();
        redacted.secret.value = None;
        return print_json(&redacted);
    }
    let mut out = bundle_details(&deleted.secret, false);
    out.push_str(&format!(
        "Recovery Id:     {}\n",
        deleted.recovery_id.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!("Deleted:         {}\n", format_time(deleted.deleted_date)));
    out.push_str(&format!(
        "Purge Scheduled: {}\n",
        format_time(deleted.scheduled_purge_date)
    ));
    print!("{}", out);
    Ok(())
}

fn bundle_details(bundle: &SecretBundle, show_value: bool) -> String {
    let id = bundle.secret_id().and_then(|id| id.ok());
    let attrs = bundle.attributes.clone().unwrap_or_default();

    let mut out = String::new();
    out.push_str(&format!(
        "Name:            {}\n",
        id.as_ref().map(|id| id.name.as_str()).unwrap_or("-")
    ));
    out.push_str(&format!(
        "Version:         {}\n",
        id.as_ref().and_then(|id| id.version.as_deref()).unwrap_or("-")
    ));
    if show_value {
        out.push_str(&format!(
            "Value:           {}\n",
            bundle.value.as_deref().unwrap_or("")
        ));
    }
    out.push_str(&format!(
        "Content Type:    {}\n",
        bundle.content_type.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!("Enabled:         {}\n", format_enabled(attrs.enabled)));
    out.push_str(&format!("Created:         {}\n", format_time(attrs.created)));
    out.push_str(&format!("Updated:         {}\n", format_time(attrs.updated)));
    out.push_str(&format!("Expires:         {}\n", format_time(attrs.exp)));
    out.push_str(&format!("Tags:            {}\n", format_tags(&bundle.tags)));
    out
}

fn items_table(items: &[SecretItem]) -> String {
    let mut table = Table::new();
    table.add_row(row!["Name", "Enabled", "Content Type", "Updated", "Tags"]);
    for item in items {
        let attrs = item.attributes.clone().unwrap_or_default();
        table.add_row(row![
            item.name().unwrap_or_default(),
            format_enabled(attrs.enabled),
            item.content_type.as_deref().unwrap_or("-"),
            format_time(attrs.updated),
            format_tags(&item.tags)
        ]);
    }
    table.to_string()
}

fn versions_table(items: &[SecretItem]) -> String {
    let mut table = Table::new();
    table.add_row(row!["Version", "Enabled", "Created", "Expires"]);
    for item in items {
        let attrs = item.attributes.clone().unwrap_or_default();
        let version = item
            .id
            .as_deref()
            .and_then(|id| id.parse::<crate::secrets::SecretId>().ok())
            .and_then(|id| id.version)
            .unwrap_or_else(|| "-".to_string());
        table.add_row(row![
            version,
            format_enabled(attrs.enabled),
            format_time(attrs.created),
            format_time(attrs.exp)
        ]);
    }
    table.to_string()
}

fn deleted_table(items: &[DeletedSecretItem]) -> String {
    let mut table = Table::new();
    table.add_row(row!["Name", "Deleted", "Purge Scheduled", "Recovery Id"]);
    for item in items {
        table.add_row(row![
            item.item.name().unwrap_or_default(),
            format_time(item.deleted_date),
            format_time(item.scheduled_purge_date),
            item.recovery_id.as_deref().unwrap_or("-")
        ]);
    }
    table.to_string()
}

fn format_enabled(enabled: Option<bool>) -> String {
    match enabled {
        Some(true) => "Yes".green().to_string(),
        Some(false) => "No".red().to_string(),
        None => "-".to_string(),
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_tags(tags: &Option<HashMap<String, String>>) -> String {
    let Some(tags) = tags.as_ref().filter(|t| !t.is_empty()) else {
        return "-".to_string();
    };
    let mut pairs: Vec<String> = tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();
    pairs.join(", ")
}
