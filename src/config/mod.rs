mod server;
pub use server::{PositionalField, Role, ServerDescriptor, ServerSpec, Servers, DEFAULT_PORT};

mod lib_option;
pub use lib_option::{LibOption, LibOptionKey, LibOptions};

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tokio::fs;

use crate::client::Client;
use crate::common::Result;
use crate::error::CacheError;

// The store uses the namespace as a literal key prefix with its own ceiling.
pub const MAX_NAMESPACE_BYTES: usize = 128;

// Adapter configuration: the server list, client library tuning options,
// the key namespace and optionally pre connected clients per role.
//
// Not meant to be shared across threads; the owning adapter mutates it
// exclusively.
#[derive(Debug)]
pub struct Options {
    servers: Vec<ServerDescriptor>,
    lib_options: LibOptions,
    namespace: String,
    primary_resource: Option<Client>,
    replica_resource: Option<Client>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            servers: vec![
                ServerDescriptor::new("127.0.0.1").role(Role::Primary),
                ServerDescriptor::new("127.0.0.1").role(Role::Replica),
            ],
            lib_options: LibOptions::default(),
            namespace: String::new(),
            primary_resource: None,
            replica_resource: None,
        }
    }
}

// Serde facing shape consumed by the generic options loading mechanism.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct OptionsConfig {
    servers: Option<Servers>,
    lib_options: Option<BTreeMap<String, Value>>,
    namespace: Option<String>,
}

impl Options {
    pub async fn load_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let f = fs::File::open(path).await?;
        let config = serde_yaml::from_reader::<_, OptionsConfig>(f.into_std().await)
            .map_err(|err| CacheError::configuration(err.to_string()))?;

        Options::from_config(config)
    }

    pub(crate) fn from_config(config: OptionsConfig) -> Result<Self> {
        let mut options = Options::default();

        if let Some(servers) = config.servers {
            options.set_servers(servers)?;
        }
        if let Some(lib_options) = config.lib_options {
            options.set_lib_options(lib_options.into_iter().map(|(key, value)| {
                // Numeric keys in the source map are option codes.
                match key.parse::<i64>() {
                    Ok(code) => (LibOptionKey::Code(code), value),
                    Err(_) => (LibOptionKey::Name(key), value),
                }
            }))?;
        }
        if let Some(namespace) = config.namespace {
            options.set_namespace(namespace)?;
        }

        Ok(options)
    }

    // Appends the server unless a structurally equal entry is already present.
    pub fn add_server(&mut self, server: ServerDescriptor) -> &mut Self {
        if !self.servers.contains(&server) {
            self.servers.push(server);
        }
        self
    }

    // Replaces the whole server list. Fails when any spec lacks a host or
    // when the resulting list contains no primary; the previous list is kept
    // untouched on failure.
    pub fn set_servers(&mut self, servers: impl Into<Servers>) -> Result<&mut Self> {
        let descriptors = servers.into().into_descriptors()?;

        let mut replacement: Vec<ServerDescriptor> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if !replacement.contains(&descriptor) {
                replacement.push(descriptor);
            }
        }

        if !replacement.iter().any(|s| s.role == Role::Primary) {
            return Err(CacheError::configuration(
                "no master found in provided server definition",
            ));
        }

        self.servers = replacement;
        Ok(self)
    }

    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }

    pub fn primary_servers(&self) -> Vec<ServerDescriptor> {
        self.servers
            .iter()
            .filter(|s| s.role == Role::Primary)
            .cloned()
            .collect()
    }

    pub fn replica_servers(&self) -> Vec<ServerDescriptor> {
        self.servers
            .iter()
            .filter(|s| s.role == Role::Replica)
            .cloned()
            .collect()
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) -> Result<&mut Self> {
        let namespace = namespace.into();
        if namespace.len() > MAX_NAMESPACE_BYTES {
            return Err(CacheError::configuration(format!(
                "namespace must be no longer than {} characters",
                MAX_NAMESPACE_BYTES
            )));
        }
        self.namespace = namespace;
        Ok(self)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set_lib_option(
        &mut self,
        key: impl Into<LibOptionKey>,
        value: Value,
    ) -> Result<&mut Self> {
        self.lib_options.set(key, value)?;
        Ok(self)
    }

    pub fn set_lib_options<K, I>(&mut self, options: I) -> Result<&mut Self>
    where
        K: Into<LibOptionKey>,
        I: IntoIterator<Item = (K, Value)>,
    {
        self.lib_options.merge(options)?;
        Ok(self)
    }

    pub fn lib_option(&self, key: impl Into<LibOptionKey>) -> Result<Option<&Value>> {
        self.lib_options.get(key)
    }

    pub fn lib_options(&self) -> &LibOptions {
        &self.lib_options
    }

    // Pre connected clients bypass server selection entirely.
    pub fn set_primary_resource(&mut self, client: Client) -> &mut Self {
        self.primary_resource = Some(client);
        self
    }

    pub fn set_replica_resource(&mut self, client: Client) -> &mut Self {
        self.replica_resource = Some(client);
        self
    }

    pub(crate) fn take_primary_resource(&mut self) -> Option<Client> {
        self.primary_resource.take()
    }

    pub(crate) fn take_replica_resource(&mut self) -> Option<Client> {
        self.replica_resource.take()
    }
}
