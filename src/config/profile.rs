//! The saved-connection tree and the rules every mutation must respect
//!
//! Nodes are addressed by `/`-separated paths of sibling names from the root,
//! e.g. `"prod/cache-1"`; the empty path is the root itself. Every operation
//! checks its preconditions before touching the tree, so a failed call leaves
//! it exactly as it was.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::connection::{
    ConnectionConfig, ConnectionGroup, Connection, ProfileNode, display_parent, join_path,
    validate_name, validate_siblings,
};
use crate::constants::connection::PATH_SEPARATOR;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfiles {
    #[serde(default)]
    connections: Vec<ProfileNode>,
}

/// Split `"a/b/c"` into `("a/b", "c")`; a single segment has an empty parent
fn split_path(path: &str) -> (&str, &str) {
    let path = path.trim_matches(PATH_SEPARATOR);
    path.rsplit_once(PATH_SEPARATOR).unwrap_or(("", path))
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_SEPARATOR).filter(|s| !s.is_empty())
}

fn normalize(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join(&PATH_SEPARATOR.to_string())
}

fn position(siblings: &[ProfileNode], name: &str, path: &str) -> Result<usize> {
    siblings
        .iter()
        .position(|n| n.name() == name)
        .ok_or_else(|| ConfigError::NotFound(path.to_string()))
}

fn ensure_free(siblings: &[ProfileNode], name: &str, parent: &str) -> Result<()> {
    if siblings.iter().any(|n| n.name() == name) {
        return Err(ConfigError::DuplicateName {
            parent: display_parent(parent),
            name: name.to_string(),
        });
    }
    Ok(())
}

impl ConnectionProfiles {
    /// Build a tree from nodes, validating every node and sibling list
    pub fn from_nodes(connections: Vec<ProfileNode>) -> Result<Self> {
        validate_siblings(&connections, "")?;
        Ok(Self { connections })
    }

    pub fn from_connections(wire: Vec<Connection>) -> Result<Self> {
        let nodes = wire
            .into_iter()
            .map(ProfileNode::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::from_nodes(nodes)
    }

    pub fn to_connections(&self) -> Vec<Connection> {
        self.connections.iter().map(Connection::from).collect()
    }

    pub fn nodes(&self) -> &[ProfileNode] {
        &self.connections
    }

    pub fn validate(&self) -> Result<()> {
        validate_siblings(&self.connections, "")
    }

    pub fn get(&self, path: &str) -> Result<&ProfileNode> {
        let (parent, name) = split_path(path);
        let siblings = self.children(parent)?;
        let idx = position(siblings, name, path)?;
        Ok(&siblings[idx])
    }

    fn children(&self, parent: &str) -> Result<&Vec<ProfileNode>> {
        let mut current = &self.connections;
        for segment in segments(parent) {
            let node = current
                .iter()
                .find(|n| n.name() == segment)
                .ok_or_else(|| ConfigError::NotFound(parent.to_string()))?;
            current = match node {
                ProfileNode::Group { connections, .. } => connections,
                ProfileNode::Server(_) => {
                    return Err(ConfigError::invalid_node(parent, "not a group"));
                }
            };
        }
        Ok(current)
    }

    fn children_mut(&mut self, parent: &str) -> Result<&mut Vec<ProfileNode>> {
        let mut current = &mut self.connections;
        for segment in segments(parent) {
            let node = current
                .iter_mut()
                .find(|n| n.name() == segment)
                .ok_or_else(|| ConfigError::NotFound(parent.to_string()))?;
            current = match node {
                ProfileNode::Group { connections, .. } => connections,
                ProfileNode::Server(_) => {
                    return Err(ConfigError::invalid_node(parent, "not a group"));
                }
            };
        }
        Ok(current)
    }

    /// Insert `node` as the last child of the group at `parent`
    pub fn add(&mut self, parent: &str, node: ProfileNode) -> Result<()> {
        let parent = normalize(parent);
        node.validate(&parent)?;
        let siblings = self.children_mut(&parent)?;
        ensure_free(siblings, node.name(), &parent)?;
        info!(parent = %display_parent(&parent), name = %node.name(), group = node.is_group(), "Adding profile node");
        siblings.push(node);
        Ok(())
    }

    pub fn create_group(&mut self, parent: &str, name: &str) -> Result<()> {
        self.add(parent, ProfileNode::group(name))
    }

    pub fn remove(&mut self, path: &str) -> Result<ProfileNode> {
        let (parent, name) = split_path(path);
        let siblings = self.children_mut(parent)?;
        let idx = position(siblings, name, path)?;
        info!(path = %path, "Removing profile node");
        Ok(siblings.remove(idx))
    }

    /// Rename a group or server in place
    pub fn rename(&mut self, path: &str, new_name: &str) -> Result<()> {
        validate_name(new_name)?;
        let (parent, name) = split_path(path);
        let siblings = self.children_mut(parent)?;
        let idx = position(siblings, name, path)?;
        if name == new_name {
            return Ok(());
        }
        ensure_free(siblings, new_name, parent)?;
        info!(path = %path, new_name = %new_name, "Renaming profile node");
        siblings[idx].set_name(new_name.to_string());
        Ok(())
    }

    /// Create a server under `parent`, or, with `replace`, overwrite the server
    /// at that path. Replacing may rename the server and move it to `parent`.
    pub fn save_connection(
        &mut self,
        parent: &str,
        replace: Option<&str>,
        config: ConnectionConfig,
    ) -> Result<()> {
        let parent = normalize(parent);
        config.validate()?;

        let Some(existing) = replace.map(normalize).filter(|p| !p.is_empty()) else {
            return self.add(&parent, ProfileNode::Server(config));
        };

        if self.get(&existing)?.is_group() {
            return Err(ConfigError::invalid_node(
                &existing,
                "a group cannot be replaced by a server",
            ));
        }

        let (old_parent, old_name) = split_path(&existing);
        if old_parent == parent {
            let siblings = self.children_mut(&parent)?;
            if config.name != old_name {
                ensure_free(siblings, &config.name, &parent)?;
            }
            let idx = position(siblings, old_name, &existing)?;
            info!(path = %existing, name = %config.name, "Updating connection profile");
            siblings[idx] = ProfileNode::Server(config);
            return Ok(());
        }

        // check the destination first so a failure changes nothing
        ensure_free(self.children(&parent)?, &config.name, &parent)?;
        self.remove(&existing)?;
        self.add(&parent, ProfileNode::Server(config))
    }

    /// Remove a group. Without `include_connections` its children are spliced
    /// into the parent where the group was, provided no name collides.
    pub fn delete_group(&mut self, path: &str, include_connections: bool) -> Result<ProfileNode> {
        let path = normalize(path);
        let (parent, name) = split_path(&path);
        let siblings = self.children_mut(parent)?;
        let idx = position(siblings, name, &path)?;

        if !siblings[idx].is_group() {
            return Err(ConfigError::invalid_node(&path, "not a group"));
        }
        if include_connections {
            info!(path = %path, "Deleting group with its connections");
            return Ok(siblings.remove(idx));
        }

        let collision = siblings[idx].children().iter().map(|c| c.name()).find(|child| {
            siblings
                .iter()
                .enumerate()
                .any(|(i, n)| i != idx && n.name() == *child)
        });
        if let Some(child) = collision {
            return Err(ConfigError::DuplicateName {
                parent: display_parent(parent),
                name: child.to_string(),
            });
        }

        let mut group = siblings.remove(idx);
        if let ProfileNode::Group { connections, .. } = &mut group {
            let lifted = std::mem::take(connections);
            debug!(path = %path, count = lifted.len(), "Lifting group children into parent");
            siblings.splice(idx..idx, lifted);
        }
        info!(path = %path, "Deleted group, kept its connections");
        Ok(group)
    }

    /// Re-parent the node at `path` under the group at `new_parent`
    pub fn move_node(&mut self, path: &str, new_parent: &str) -> Result<()> {
        let path = normalize(path);
        let new_parent = normalize(new_parent);
        self.get(&path)?;

        // sibling names are unique, so a path prefix is exactly the ancestor relation
        let inside = new_parent == path
            || new_parent.starts_with(&format!("{path}{PATH_SEPARATOR}"));
        if inside {
            return Err(ConfigError::Cycle {
                node: path,
                target: new_parent,
            });
        }

        let (old_parent, name) = split_path(&path);
        if old_parent == new_parent {
            return Ok(());
        }

        ensure_free(self.children(&new_parent)?, name, &new_parent)?;
        let node = self.remove(&path)?;
        info!(from = %path, to = %display_parent(&new_parent), "Moving profile node");
        self.children_mut(&new_parent)?.push(node);
        Ok(())
    }

    /// Reorder the children of `parent`; `names` must be a permutation of them
    pub fn reorder(&mut self, parent: &str, names: &[String]) -> Result<()> {
        let parent = normalize(parent);
        let siblings = self.children_mut(&parent)?;

        let mut remaining = siblings.clone();
        let mut ordered = Vec::with_capacity(remaining.len());
        for name in names {
            let idx = remaining
                .iter()
                .position(|n| n.name() == name)
                .ok_or_else(|| {
                    ConfigError::validation(
                        join_path(&parent, name),
                        "not a child of this group, or listed twice",
                    )
                })?;
            ordered.push(remaining.remove(idx));
        }
        if let Some(missing) = remaining.first() {
            return Err(ConfigError::validation(
                join_path(&parent, missing.name()),
                "missing from the new order",
            ));
        }

        debug!(parent = %display_parent(&parent), count = ordered.len(), "Reordered profile nodes");
        *siblings = ordered;
        Ok(())
    }

    /// Export as flat groups. Servers at the root form a group with an empty
    /// name (listed first); each top-level group carries every server below
    /// it, depth-first, so nested sub-groups do not survive the export.
    pub fn to_groups(&self) -> Vec<ConnectionGroup> {
        let mut groups = Vec::new();

        let root: Vec<ConnectionConfig> = self
            .connections
            .iter()
            .filter_map(|n| match n {
                ProfileNode::Server(config) => Some(config.clone()),
                ProfileNode::Group { .. } => None,
            })
            .collect();
        if !root.is_empty() {
            groups.push(ConnectionGroup {
                group_name: String::new(),
                connections: root,
            });
        }

        for node in self.connections.iter().filter(|n| n.is_group()) {
            groups.push(ConnectionGroup {
                group_name: node.name().to_string(),
                connections: node.servers().into_iter().cloned().collect(),
            });
        }
        groups
    }

    /// Rebuild a tree from flat groups (inverse of `to_groups` for trees
    /// without nested sub-groups)
    pub fn from_groups(groups: Vec<ConnectionGroup>) -> Result<Self> {
        let mut nodes = Vec::new();
        for group in groups {
            let servers = group.connections.into_iter().map(ProfileNode::Server);
            if group.group_name.is_empty() {
                nodes.extend(servers);
            } else {
                nodes.push(ProfileNode::Group {
                    name: group.group_name,
                    connections: servers.collect(),
                });
            }
        }
        Self::from_nodes(nodes)
    }
}
