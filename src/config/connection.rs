//! Connection profile types
//!
//! `ProfileNode` is the in-memory tree node: either a group holding nested
//! nodes, or a server leaf holding a `ConnectionConfig`. `Connection` is the
//! flat wire shape (config fields inline plus a `type` tag and children) that
//! front ends exchange; converting it into a `ProfileNode` is where mixed
//! group/leaf payloads get rejected.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::connection::*;
use crate::error::{ConfigError, Result};

/// How to reach one data store instance.
///
/// Field names follow the front end's camelCase JSON; snake_case spellings are
/// accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub addr: String,
    #[serde(default, skip_serializing_if = "is_zero_u16")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Key pattern applied when a database is first opened
    #[serde(default, alias = "default_filter", skip_serializing_if = "String::is_empty")]
    pub default_filter: String,
    /// Separator used to fold keys into a namespace tree
    #[serde(default, alias = "key_separator", skip_serializing_if = "String::is_empty")]
    pub key_separator: String,
    /// Seconds; enforced by the live connection, not here
    #[serde(default, alias = "conn_timeout", skip_serializing_if = "is_zero_u32")]
    pub conn_timeout: u32,
    /// Seconds
    #[serde(default, alias = "exec_timeout", skip_serializing_if = "is_zero_u32")]
    pub exec_timeout: u32,
    /// `#RRGGBB` or `#RRGGBBAA`, empty for no marker
    #[serde(default, alias = "mark_color", skip_serializing_if = "String::is_empty")]
    pub mark_color: String,
}

fn is_zero_u16(value: &u16) -> bool {
    *value == 0
}

fn is_zero_u32(value: &u32) -> bool {
    *value == 0
}

impl ConnectionConfig {
    /// A new profile pre-filled with the usual local server settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: ADDR.to_string(),
            port: PORT,
            username: String::new(),
            password: String::new(),
            default_filter: DEFAULT_FILTER.to_string(),
            key_separator: KEY_SEPARATOR.to_string(),
            conn_timeout: CONN_TIMEOUT,
            exec_timeout: EXEC_TIMEOUT,
            mark_color: String::new(),
        }
    }

    /// Fill every unset (empty or zero) connection setting with the value
    /// `new` would give it
    pub fn with_defaults(self) -> Self {
        let defaults = ConnectionConfig::new(self.name.clone());
        let or_default = |value: String, default: String| {
            if value.is_empty() { default } else { value }
        };
        Self {
            addr: or_default(self.addr, defaults.addr),
            port: if self.port == 0 { defaults.port } else { self.port },
            default_filter: or_default(self.default_filter, defaults.default_filter),
            key_separator: or_default(self.key_separator, defaults.key_separator),
            conn_timeout: if self.conn_timeout == 0 {
                defaults.conn_timeout
            } else {
                self.conn_timeout
            },
            exec_timeout: if self.exec_timeout == 0 {
                defaults.exec_timeout
            } else {
                self.exec_timeout
            },
            ..self
        }
    }

    pub fn conn_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.conn_timeout))
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.exec_timeout))
    }

    /// True when anything other than the name is set
    pub fn has_connection_fields(&self) -> bool {
        let bare = ConnectionConfig {
            name: self.name.clone(),
            ..Default::default()
        };
        *self != bare
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if self.addr.trim().is_empty() {
            return Err(ConfigError::invalid_node(&self.name, "address is required"));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid_node(&self.name, "port is required"));
        }
        if !self.mark_color.is_empty() && !is_hex_color(&self.mark_color) {
            return Err(ConfigError::invalid_node(
                &self.name,
                format!("mark color '{}' is not #RRGGBB or #RRGGBBAA", self.mark_color),
            ));
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Names identify a node among its siblings and form path segments
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::invalid_node(name, "name must not be empty"));
    }
    if name != name.trim() {
        return Err(ConfigError::invalid_node(
            name,
            "name must not start or end with whitespace",
        ));
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(ConfigError::invalid_node(
            name,
            format!("name must not contain '{PATH_SEPARATOR}'"),
        ));
    }
    Ok(())
}

/// One node of the saved-connection tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProfileNode {
    Group {
        name: String,
        #[serde(default)]
        connections: Vec<ProfileNode>,
    },
    Server(ConnectionConfig),
}

impl ProfileNode {
    pub fn group(name: impl Into<String>) -> Self {
        ProfileNode::Group {
            name: name.into(),
            connections: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProfileNode::Group { name, .. } => name,
            ProfileNode::Server(config) => &config.name,
        }
    }

    pub(crate) fn set_name(&mut self, new_name: String) {
        match self {
            ProfileNode::Group { name, .. } => *name = new_name,
            ProfileNode::Server(config) => config.name = new_name,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ProfileNode::Group { .. })
    }

    /// Children of a group; always empty for a server
    pub fn children(&self) -> &[ProfileNode] {
        match self {
            ProfileNode::Group { connections, .. } => connections,
            ProfileNode::Server(_) => &[],
        }
    }

    /// Every server config below this node, depth-first
    pub fn servers(&self) -> Vec<&ConnectionConfig> {
        let mut out = Vec::new();
        collect_servers(self, &mut out);
        out
    }

    /// Check this node and everything below it. `parent` is the path of the
    /// containing group, used in error messages.
    pub fn validate(&self, parent: &str) -> Result<()> {
        match self {
            ProfileNode::Server(config) => config.validate(),
            ProfileNode::Group { name, connections } => {
                validate_name(name)?;
                validate_siblings(connections, &join_path(parent, name))
            }
        }
    }
}

fn collect_servers<'a>(node: &'a ProfileNode, out: &mut Vec<&'a ConnectionConfig>) {
    match node {
        ProfileNode::Server(config) => out.push(config),
        ProfileNode::Group { connections, .. } => {
            for child in connections {
                collect_servers(child, out);
            }
        }
    }
}

/// Validate each node and require unique names within `nodes`
pub(crate) fn validate_siblings(nodes: &[ProfileNode], parent: &str) -> Result<()> {
    for (idx, node) in nodes.iter().enumerate() {
        if nodes[..idx].iter().any(|n| n.name() == node.name()) {
            return Err(ConfigError::DuplicateName {
                parent: display_parent(parent),
                name: node.name().to_string(),
            });
        }
        node.validate(parent)?;
    }
    Ok(())
}

pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}{PATH_SEPARATOR}{name}")
    }
}

pub(crate) fn display_parent(parent: &str) -> String {
    if parent.is_empty() {
        "<root>".to_string()
    } else {
        parent.to_string()
    }
}

/// Flat wire shape: config fields inline, a `type` tag and nested children
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(flatten)]
    pub config: ConnectionConfig,
    /// `"group"` for containers; anything else (usually empty) is a server
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<Connection>,
}

const GROUP_KIND: &str = "group";

impl TryFrom<Connection> for ProfileNode {
    type Error = ConfigError;

    fn try_from(conn: Connection) -> Result<Self> {
        if conn.kind == GROUP_KIND {
            if conn.config.has_connection_fields() {
                return Err(ConfigError::invalid_node(
                    &conn.config.name,
                    "a group cannot carry connection settings",
                ));
            }
            validate_name(&conn.config.name)?;
            let connections = conn
                .connections
                .into_iter()
                .map(ProfileNode::try_from)
                .collect::<Result<Vec<_>>>()?;
            Ok(ProfileNode::Group {
                name: conn.config.name,
                connections,
            })
        } else {
            if !conn.connections.is_empty() {
                return Err(ConfigError::invalid_node(
                    &conn.config.name,
                    "a server cannot contain nested connections",
                ));
            }
            conn.config.validate()?;
            Ok(ProfileNode::Server(conn.config))
        }
    }
}

impl From<&ProfileNode> for Connection {
    fn from(node: &ProfileNode) -> Self {
        match node {
            ProfileNode::Group { name, connections } => Connection {
                config: ConnectionConfig {
                    name: name.clone(),
                    ..Default::default()
                },
                kind: GROUP_KIND.to_string(),
                connections: connections.iter().map(Connection::from).collect(),
            },
            ProfileNode::Server(config) => Connection {
                config: config.clone(),
                kind: String::new(),
                connections: Vec::new(),
            },
        }
    }
}

/// A group name with its servers as a flat list (bulk import/export form).
/// An empty `group_name` stands for servers at the root of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionGroup {
    #[serde(default, alias = "group_name")]
    pub group_name: String,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

/// Summary of one logical database on a live server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDB {
    pub name: String,
    pub keys: u64,
    /// Keys with an expiry set
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub expires: u64,
    /// Average TTL in milliseconds over sampled keys
    #[serde(rename = "avgTTL", alias = "avg_ttl", default, skip_serializing_if = "is_zero_u64")]
    pub avg_ttl: u64,
}

fn is_zero_u64(value: &u64) -> bool {
    *value == 0
}

impl ConnectionDB {
    pub fn new(name: impl Into<String>, keys: u64) -> Self {
        Self {
            name: name.into(),
            keys,
            ..Default::default()
        }
    }

    /// Parse one line of the server's keyspace report,
    /// e.g. `db0:keys=12,expires=3,avg_ttl=1000`. Unrecognised fields are skipped.
    pub fn parse_keyspace_line(line: &str) -> Result<Self> {
        let line = line.trim();
        let (name, fields) = line
            .split_once(':')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| ConfigError::validation(line, "expected '<db>:<field>=<value>,...'"))?;

        let mut db = ConnectionDB::new(name, 0);
        let mut saw_keys = false;
        for field in fields.split(',').filter(|f| !f.is_empty()) {
            let (key, value) = field
                .split_once('=')
                .ok_or_else(|| ConfigError::validation(line, format!("malformed field '{field}'")))?;
            let target = match key {
                "keys" => {
                    saw_keys = true;
                    &mut db.keys
                }
                "expires" => &mut db.expires,
                "avg_ttl" => &mut db.avg_ttl,
                _ => continue,
            };
            *target = value.parse().map_err(|_| {
                ConfigError::validation(line, format!("'{key}' is not a number: '{value}'"))
            })?;
        }

        if !saw_keys {
            return Err(ConfigError::validation(line, "missing 'keys' field"));
        }
        Ok(db)
    }
}
