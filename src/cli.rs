//! Command-line interface definition for kvault
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the `secret` command family.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kvault - secrets vault client
///
/// Reads, writes and manages secrets in a Key Vault style service,
/// authenticating through the vault's bearer challenge.
#[derive(Parser, Debug, Clone)]
#[command(name = "kvault")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Override the vault URL from config
    #[arg(long)]
    pub vault_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for kvault
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage secrets
    Secret {
        /// Secret subcommand
        #[command(subcommand)]
        command: SecretCommand,
    },
}

/// Secret management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SecretCommand {
    /// Create a secret or add a new version
    Set {
        /// Secret name
        name: String,

        /// Secret value
        #[arg(long, required_unless_present = "file", conflicts_with = "file")]
        value: Option<String>,

        /// Read the value from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Content type, e.g. text/plain
        #[arg(long)]
        content_type: Option<String>,

        /// Tag as key=value (repeatable)
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,

        /// Create the version disabled
        #[arg(long)]
        disabled: bool,

        /// Expiry time (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        expires: Option<DateTime<Utc>>,

        /// Not-before time (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        not_before: Option<DateTime<Utc>>,
    },

    /// Show a secret and its value
    Get {
        /// Secret name
        name: String,

        /// Version (latest if omitted)
        version: Option<String>,
    },

    /// Change content type, tags or attributes of a version
    Update {
        /// Secret name
        name: String,

        /// Version (latest if omitted)
        version: Option<String>,

        /// New content type
        #[arg(long)]
        content_type: Option<String>,

        /// Replace tags with key=value pairs (repeatable)
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,

        /// Enable or disable the version
        #[arg(long)]
        enabled: Option<bool>,

        /// New expiry time (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        expires: Option<DateTime<Utc>>,
    },

    /// Delete a secret (soft delete when the vault supports it)
    Delete {
        /// Secret name
        name: String,
    },

    /// Show a soft-deleted secret
    ShowDeleted {
        /// Secret name
        name: String,
    },

    /// Recover a soft-deleted secret
    Recover {
        /// Secret name
        name: String,
    },

    /// Permanently remove a soft-deleted secret
    Purge {
        /// Secret name
        name: String,
    },

    /// Download a backup blob
    Backup {
        /// Secret name
        name: String,

        /// Write the blob to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restore a secret from a backup blob
    Restore {
        /// File containing the blob
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List secrets
    List {
        /// Page size requested from the vault
        #[arg(long)]
        max_results: Option<u32>,
    },

    /// List versions of a secret
    Versions {
        /// Secret name
        name: String,

        /// Page size requested from the vault
        #[arg(long)]
        max_results: Option<u32>,
    },

    /// List soft-deleted secrets
    ListDeleted {
        /// Page size requested from the vault
        #[arg(long)]
        max_results: Option<u32>,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: None,
            verbose: false,
            json: false,
            vault_url: None,
            command: Commands::Secret {
                command: SecretCommand::List { max_results: None },
            },
        }
    }
}

/// Parses a `key=value` tag.
fn parse_tag(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid tag '{raw}', expected key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid tag '{raw}', key is empty"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert!(cli.config.is_none());
        assert!(!cli.verbose);
        assert!(!cli.json);
        assert!(matches!(
            cli.command,
            Commands::Secret {
                command: SecretCommand::List { max_results: None }
            }
        ));
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "kvault",
            "--config",
            "custom.yaml",
            "-v",
            "--vault-url",
            "https://v.example.net",
            "secret",
            "list",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("custom.yaml"));
        assert!(cli.verbose);
        assert!(cli.json);
        assert_eq!(cli.vault_url.as_deref(), Some("https://v.example.net"));
    }

    #[test]
    fn test_cli_parse_set_with_tags() {
        let cli = Cli::try_parse_from([
            "kvault", "secret", "set", "db", "--value", "hunter2", "--tag", "env=prod", "--tag",
            "team=core", "--expires", "2030-01-01T00:00:00Z",
        ])
        .unwrap();
        let Commands::Secret {
            command:
                SecretCommand::Set {
                    name,
                    value,
                    tags,
                    expires,
                    disabled,
                    ..
                },
        } = cli.command
        else {
            panic!("Expected secret set command");
        };
        assert_eq!(name, "db");
        assert_eq!(value.as_deref(), Some("hunter2"));
        assert_eq!(
            tags,
            vec![
                ("env".to_string(), "prod".to_string()),
                ("team".to_string(), "core".to_string())
            ]
        );
        assert_eq!(expires.unwrap().to_rfc3339(), "2030-01-01T00:00:00+00:00");
        assert!(!disabled);
    }

    #[test]
    fn test_cli_set_requires_value_or_file() {
        assert!(Cli::try_parse_from(["kvault", "secret", "set", "db"]).is_err());
        assert!(Cli::try_parse_from(["kvault", "secret", "set", "db", "--file", "v.txt"]).is_ok());
        assert!(Cli::try_parse_from([
            "kvault", "secret", "set", "db", "--value", "x", "--file", "v.txt"
        ])
        .is_err());
    }

    #[test]
    fn test_cli_parse_get_with_version() {
        let cli = Cli::try_parse_from(["kvault", "secret", "get", "db", "abc123"]).unwrap();
        if let Commands::Secret {
            command: SecretCommand::Get { name, version },
        } = cli.command
        {
            assert_eq!(name, "db");
            assert_eq!(version.as_deref(), Some("abc123"));
        } else {
            panic!("Expected secret get command");
        }
    }

    #[test]
    fn test_cli_parse_update_enabled_flag() {
        let cli =
            Cli::try_parse_from(["kvault", "secret", "update", "db", "--enabled", "false"]).unwrap();
        if let Commands::Secret {
            command: SecretCommand::Update { version, enabled, .. },
        } = cli.command
        {
            assert!(version.is_none());
            assert_eq!(enabled, Some(false));
        } else {
            panic!("Expected secret update command");
        }
    }

    #[test]
    fn test_cli_parse_soft_delete_commands() {
        for sub in ["delete", "show-deleted", "recover", "purge"] {
            let cli = Cli::try_parse_from(["kvault", "secret", sub, "db"]);
            assert!(cli.is_ok(), "failed to parse {sub}");
        }
        assert!(Cli::try_parse_from(["kvault", "secret", "list-deleted"]).is_ok());
    }

    #[test]
    fn test_cli_parse_versions_max_results() {
        let cli = Cli::try_parse_from(["kvault", "secret", "versions", "db", "--max-results", "5"])
            .unwrap();
        if let Commands::Secret {
            command: SecretCommand::Versions { name, max_results },
        } = cli.command
        {
            assert_eq!(name, "db");
            assert_eq!(max_results, Some(5));
        } else {
            panic!("Expected secret versions command");
        }
    }

    #[test]
    fn test_cli_restore_requires_input() {
        assert!(Cli::try_parse_from(["kvault", "secret", "restore"]).is_err());
        assert!(Cli::try_parse_from(["kvault", "secret", "restore", "-i", "blob.txt"]).is_ok());
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(
            parse_tag("k=v=w").unwrap(),
            ("k".to_string(), "v=w".to_string())
        );
        assert_eq!(parse_tag("k=").unwrap(), ("k".to_string(), String::new()));
        assert!(parse_tag("novalue").is_err());
        assert!(parse_tag("=v").is_err());
    }

    #[test]
    fn test_cli_rejects_bad_timestamp() {
        assert!(Cli::try_parse_from([
            "kvault", "secret", "set", "db", "--value", "x", "--expires", "tomorrow"
        ])
        .is_err());
    }
}
