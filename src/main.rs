#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level as TraceLevel, debug};
use tracing_subscriber::FmtSubscriber;

use wrdm_config::config::{AppPaths, ConnectionConfig, PreferenceUpdate};
use wrdm_config::{App, ConfigError, Response};

#[derive(Debug, Parser)]
#[command(name = "wrdm-config", version, about = "Manage wrdm preferences and saved connections")]
struct Cli {
    /// Configuration directory (default: $WRDM_CONFIG_DIR, then the platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read, update or restore user preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),
    /// List installed font families
    Fonts,
    /// Manage saved connection profiles
    #[command(subcommand)]
    Conn(ConnCommand),
}

#[derive(Debug, Subcommand)]
enum PrefsCommand {
    Get,
    /// Merge `section.field=value` pairs; values are JSON, or plain strings
    Set {
        #[arg(required = true)]
        values: Vec<String>,
    },
    Restore,
}

#[derive(Debug, Subcommand)]
enum ConnCommand {
    /// Whole tree
    List,
    /// One node by `/`-separated path
    Get { path: String },
    /// Stored server at the path, or default settings for a new one
    Profile { path: String },
    /// Flat `[{group_name, connections}]` form
    Export,
    /// Replace the tree with flat groups read from a JSON file
    Import {
        file: PathBuf,
        /// The file holds the nested tree as `list` prints it
        #[arg(long)]
        tree: bool,
    },
    /// Create a server, or overwrite one with `--replace`; omitted fields take defaults
    Save {
        config: String,
        #[arg(long, default_value = "")]
        parent: String,
        #[arg(long)]
        replace: Option<String>,
    },
    Delete { path: String },
    GroupCreate {
        name: String,
        #[arg(long, default_value = "")]
        parent: String,
    },
    Rename { path: String, name: String },
    GroupDelete {
        path: String,
        /// Delete the group's connections too instead of lifting them out
        #[arg(long)]
        include_connections: bool,
    },
    /// Move a node under another group (empty target = root)
    Move {
        path: String,
        #[arg(default_value = "")]
        to: String,
    },
    /// Reorder a group's children
    Reorder {
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long, default_value = "")]
        parent: String,
    },
}

fn parse_assignments(values: &[String]) -> Result<Map<String, Value>, ConfigError> {
    let mut map = Map::new();
    for assignment in values {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| ConfigError::validation(assignment, "expected KEY=VALUE"))?;
        let key = key.trim();
        // text keys keep the raw value unless it is a quoted JSON string
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(Value::String(text)) => Value::String(text),
            _ if PreferenceUpdate::is_text_key(key) => Value::String(raw.to_string()),
            Ok(value) => value,
            Err(_) => Value::String(raw.to_string()),
        };
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

/// Settings left out of the JSON take the defaults of a new profile
fn parse_connection(text: &str) -> Result<ConnectionConfig, ConfigError> {
    serde_json::from_str::<ConnectionConfig>(text)
        .map(ConnectionConfig::with_defaults)
        .map_err(|e| ConfigError::validation("config", e.to_string()))
}

fn read_json<T: DeserializeOwned>(file: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(file).map_err(|e| ConfigError::persistence(file, e))?;
    serde_json::from_str(&contents).map_err(|e| ConfigError::validation("import", e.to_string()))
}

fn run(app: &App, command: Command) -> Response {
    match command {
        Command::Prefs(PrefsCommand::Get) => Response::from_value(app.preferences.get()),
        Command::Prefs(PrefsCommand::Set { values }) => Response::from_result(
            parse_assignments(&values).and_then(|map| app.preferences.set(&map).map(drop)),
        ),
        Command::Prefs(PrefsCommand::Restore) => Response::from_result(app.preferences.restore()),
        Command::Fonts => Response::from_value(app.fonts()),
        Command::Conn(command) => run_conn(app, command),
    }
}

fn run_conn(app: &App, command: ConnCommand) -> Response {
    let profiles = &app.profiles;
    match command {
        ConnCommand::List => Response::from_value(profiles.list()),
        ConnCommand::Get { path } => Response::from_result(profiles.get(&path)),
        ConnCommand::Profile { path } => Response::from_value(profiles.connection_or_default(&path)),
        ConnCommand::Export => Response::from_value(profiles.export_groups()),
        ConnCommand::Import { file, tree: false } => Response::from_result(
            read_json(&file)
                .and_then(|groups| profiles.import_groups(groups))
                .map(|tree| tree.to_connections()),
        ),
        ConnCommand::Import { file, tree: true } => Response::from_result(
            read_json(&file)
                .and_then(|wire| profiles.import_connections(wire))
                .map(|tree| tree.to_connections()),
        ),
        ConnCommand::Save {
            config,
            parent,
            replace,
        } => Response::from_result(parse_connection(&config).and_then(|config| {
            profiles.save_connection(&parent, replace.as_deref(), config)
        })),
        ConnCommand::Delete { path } => Response::from_result(profiles.remove(&path).map(drop)),
        ConnCommand::GroupCreate { name, parent } => {
            Response::from_result(profiles.create_group(&parent, &name))
        }
        ConnCommand::Rename { path, name } => Response::from_result(profiles.rename(&path, &name)),
        ConnCommand::GroupDelete {
            path,
            include_connections,
        } => Response::from_result(profiles.delete_group(&path, include_connections).map(drop)),
        ConnCommand::Move { path, to } => Response::from_result(profiles.move_node(&path, &to)),
        ConnCommand::Reorder { names, parent } => {
            Response::from_result(profiles.reorder(&parent, &names))
        }
    }
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    // stdout carries the response envelope only
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")?;

    let cli = Cli::parse();
    debug!(command = ?cli.command, "Parsed command line");

    let app = App::open(AppPaths::resolve(cli.config_dir.as_deref()));
    let response = run(&app, cli.command);

    let output = serde_json::to_string_pretty(&response).context("Failed to encode response")?;
    println!("{output}");

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignments_json_and_strings() {
        let values = vec![
            "general.font_size=16".to_string(),
            "general.check_update=true".to_string(),
            "general.font=Fira Code".to_string(),
        ];
        let map = parse_assignments(&values).unwrap();
        assert_eq!(map["general.font_size"], Value::from(16));
        assert_eq!(map["general.check_update"], Value::Bool(true));
        assert_eq!(map["general.font"], Value::from("Fira Code"));

        assert!(parse_assignments(&["novalue".to_string()]).is_err());
    }

    #[test]
    fn test_parse_assignments_text_keys_keep_raw_value() {
        let values = vec![
            "general.font=123".to_string(),
            "editor.font=\"456\"".to_string(),
            "general.font_size=123".to_string(),
        ];
        let map = parse_assignments(&values).unwrap();
        assert_eq!(map["general.font"], Value::from("123"));
        assert_eq!(map["editor.font"], Value::from("456"));
        assert_eq!(map["general.font_size"], Value::from(123));

        let dir = tempfile::tempdir().unwrap();
        let app = App::open(AppPaths::new(dir.path()));
        let response = run(
            &app,
            Command::Prefs(PrefsCommand::Set {
                values: vec!["general.font=123".to_string()],
            }),
        );
        assert!(response.success);
        assert_eq!(app.preferences.get().general.font, "123");
    }

    #[test]
    fn test_parse_connection_fills_defaults() {
        let config = parse_connection(r#"{"name": "cache", "port": 6380}"#).unwrap();
        assert_eq!(config.name, "cache");
        assert_eq!(config.port, 6380);
        assert_eq!(config.addr, "127.0.0.1");
        assert_eq!(config.key_separator, ":");

        let config =
            parse_connection(r##"{"name": "cache", "keySeparator": "#", "exec_timeout": 3}"##)
                .unwrap();
        assert_eq!(config.key_separator, "#");
        assert_eq!(config.exec_timeout, 3);
        assert_eq!(config.conn_timeout, 60);

        assert!(parse_connection("[1, 2]").is_err());
    }

    #[test]
    fn test_run_reports_errors_in_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::open(AppPaths::new(dir.path()));

        let created = run(
            &app,
            Command::Conn(ConnCommand::GroupCreate {
                name: "prod".to_string(),
                parent: String::new(),
            }),
        );
        assert!(created.success);

        let duplicate = run(
            &app,
            Command::Conn(ConnCommand::GroupCreate {
                name: "prod".to_string(),
                parent: String::new(),
            }),
        );
        assert!(!duplicate.success);
        assert!(duplicate.message.unwrap().contains("prod"));
    }

    #[test]
    fn test_import_groups_and_tree_files() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::open(AppPaths::new(dir.path().join("config")));

        let groups = dir.path().join("groups.json");
        fs::write(
            &groups,
            r##"[{"groupName": "team", "connections": [
                {"name": "a", "addr": "10.0.0.1", "port": 6379, "keySeparator": "#"}
            ]}]"##,
        )
        .unwrap();
        let response = run(
            &app,
            Command::Conn(ConnCommand::Import {
                file: groups,
                tree: false,
            }),
        );
        assert!(response.success);
        let a = app.profiles.connection_or_default("team/a");
        assert_eq!(a.key_separator, "#");

        let tree = dir.path().join("tree.json");
        fs::write(
            &tree,
            r#"[{"name": "prod", "type": "group", "connections": [
                {"name": "eu", "type": "group", "connections": [
                    {"name": "db1", "addr": "10.0.0.2", "port": 6380}
                ]}
            ]}]"#,
        )
        .unwrap();
        let response = run(
            &app,
            Command::Conn(ConnCommand::Import {
                file: tree,
                tree: true,
            }),
        );
        assert!(response.success);
        assert!(app.profiles.get("prod/eu/db1").is_ok());
        assert!(app.profiles.get("team").is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
