//! Profile store: the persisted saved-connection tree

use tracing::info;

use crate::config::{
    AppPaths, Connection, ConnectionConfig, ConnectionGroup, ConnectionProfiles, ProfileNode,
};
use crate::constants::connection::PATH_SEPARATOR;
use crate::error::Result;
use crate::persistence::{Persisted, Storage, TomlFile};

pub struct ProfileStore<S = TomlFile<ConnectionProfiles>> {
    cell: Persisted<ConnectionProfiles, S>,
}

impl ProfileStore {
    /// Store backed by `connections.toml` in the config directory
    pub fn open(paths: &AppPaths) -> Self {
        Self::new(TomlFile::new(paths.connections()))
    }
}

impl<S> ProfileStore<S>
where
    S: Storage<ConnectionProfiles>,
{
    /// A stored tree that breaks the naming or node rules is not served;
    /// mutations are refused until an import replaces it.
    pub fn new(storage: S) -> Self {
        Self {
            cell: Persisted::with_check(storage, ConnectionProfiles::validate),
        }
    }

    pub fn storage(&self) -> &S {
        self.cell.storage()
    }

    pub fn snapshot(&self) -> ConnectionProfiles {
        self.cell.snapshot()
    }

    /// The whole tree in wire form
    pub fn list(&self) -> Vec<Connection> {
        self.cell.read(ConnectionProfiles::to_connections)
    }

    pub fn get(&self, path: &str) -> Result<ProfileNode> {
        self.cell.read(|profiles| profiles.get(path).cloned())
    }

    /// Stored server at `path`, or a fresh profile with default settings
    /// named after the last path segment when nothing is stored there
    pub fn connection_or_default(&self, path: &str) -> ConnectionConfig {
        match self.get(path) {
            Ok(ProfileNode::Server(config)) => config,
            _ => {
                let name = path
                    .trim_end_matches(PATH_SEPARATOR)
                    .rsplit(PATH_SEPARATOR)
                    .next()
                    .unwrap_or_default();
                ConnectionConfig::new(name)
            }
        }
    }

    pub fn save_connection(
        &self,
        parent: &str,
        replace: Option<&str>,
        config: ConnectionConfig,
    ) -> Result<()> {
        self.mutate(|profiles| profiles.save_connection(parent, replace, config))
    }

    pub fn remove(&self, path: &str) -> Result<ProfileNode> {
        self.mutate(|profiles| profiles.remove(path))
    }

    pub fn create_group(&self, parent: &str, name: &str) -> Result<()> {
        self.mutate(|profiles| profiles.create_group(parent, name))
    }

    pub fn rename(&self, path: &str, new_name: &str) -> Result<()> {
        self.mutate(|profiles| profiles.rename(path, new_name))
    }

    pub fn delete_group(&self, path: &str, include_connections: bool) -> Result<ProfileNode> {
        self.mutate(|profiles| profiles.delete_group(path, include_connections))
    }

    pub fn move_node(&self, path: &str, new_parent: &str) -> Result<()> {
        self.mutate(|profiles| profiles.move_node(path, new_parent))
    }

    pub fn reorder(&self, parent: &str, names: &[String]) -> Result<()> {
        self.mutate(|profiles| profiles.reorder(parent, names))
    }

    pub fn export_groups(&self) -> Vec<ConnectionGroup> {
        self.cell.read(ConnectionProfiles::to_groups)
    }

    /// Replace the whole tree with one rebuilt from flat groups
    pub fn import_groups(&self, groups: Vec<ConnectionGroup>) -> Result<ConnectionProfiles> {
        let profiles = ConnectionProfiles::from_groups(groups)?;
        let count = profiles.nodes().len();
        let profiles = self.cell.replace(profiles)?;
        info!(count, "Imported connection groups");
        Ok(profiles)
    }

    /// Replace the whole tree with one in wire form, as `list` returns it
    pub fn import_connections(&self, wire: Vec<Connection>) -> Result<ConnectionProfiles> {
        let profiles = ConnectionProfiles::from_connections(wire)?;
        let count = profiles.nodes().len();
        let profiles = self.cell.replace(profiles)?;
        info!(count, "Imported connection tree");
        Ok(profiles)
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut ConnectionProfiles) -> Result<R>) -> Result<R> {
        self.cell.update(f).map(|(_, output)| output)
    }
}
