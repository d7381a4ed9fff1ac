mod capabilities;
pub use capabilities::{Capabilities, Support, SupportedDatatypes};

use std::collections::HashMap;

use rand::seq::SliceRandom;
use serde_json::Value;

use crate::client::{Api, Client, Serializer};
use crate::common::{info, Result};
use crate::config::{LibOption, Options, Role};
use crate::error::CacheError;

// Connection state of one replication role.
#[derive(Debug)]
enum RoleConnection {
    Unconnected,
    Connected(Client),
}

// SSDB storage adapter.
//
// Keeps one lazily established connection per role for its whole lifetime:
// writes and authoritative statistics go to a primary, plain reads to a
// replica. There is no reconnect or health checking; a failed call surfaces
// the store's own failure. Methods take exclusive references, so the lazy
// first connect cannot race.
#[derive(Debug)]
pub struct SsdbCache {
    options: Options,
    primary: RoleConnection,
    replica: RoleConnection,
    capabilities: Capabilities,
}

impl SsdbCache {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            primary: RoleConnection::Unconnected,
            replica: RoleConnection::Unconnected,
            capabilities: Capabilities::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn connection(&mut self, role: Role) -> Result<&mut Client> {
        let slot = match role {
            Role::Primary => &self.primary,
            Role::Replica => &self.replica,
        };

        if matches!(slot, RoleConnection::Unconnected) {
            // A pre connected resource from the options bypasses selection.
            let configured = match role {
                Role::Primary => self.options.take_primary_resource(),
                Role::Replica => self.options.take_replica_resource(),
            };
            let client = match configured {
                Some(client) => client,
                None => connect(role, &self.options).await?,
            };

            match role {
                Role::Primary => self.primary = RoleConnection::Connected(client),
                Role::Replica => self.replica = RoleConnection::Connected(client),
            }
        }

        let slot = match role {
            Role::Primary => &mut self.primary,
            Role::Replica => &mut self.replica,
        };
        match slot {
            RoleConnection::Connected(client) => Ok(client),
            RoleConnection::Unconnected => unreachable!(),
        }
    }

    /* reading */

    pub async fn get_item(&mut self, key: &str) -> Result<Option<Value>> {
        self.connection(Role::Replica).await?.get(key).await
    }

    pub async fn get_items(&mut self, keys: &[String]) -> Result<HashMap<String, Value>> {
        self.connection(Role::Replica).await?.multi_get(keys).await
    }

    pub async fn has_item(&mut self, key: &str) -> Result<bool> {
        self.connection(Role::Replica).await?.exists(key).await
    }

    // There is no batch existence primitive; one check per key.
    pub async fn has_items(&mut self, keys: &[String]) -> Result<HashMap<String, bool>> {
        let client = self.connection(Role::Replica).await?;
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            found.insert(key.clone(), client.exists(key).await?);
        }
        Ok(found)
    }

    pub async fn get_metadata(&mut self, key: &str) -> Result<Option<Value>> {
        self.connection(Role::Replica).await?.get(key).await
    }

    pub async fn get_metadatas(&mut self, keys: &[String]) -> Result<HashMap<String, Value>> {
        self.connection(Role::Replica).await?.multi_get(keys).await
    }

    /* writing */

    pub async fn set_item(&mut self, key: &str, value: &Value) -> Result<()> {
        self.connection(Role::Primary).await?.set(key, value).await
    }

    pub async fn set_items(&mut self, entries: &HashMap<String, Value>) -> Result<()> {
        self.connection(Role::Primary)
            .await?
            .multi_set(entries)
            .await
    }

    // Insert if absent. Returns whether the value was stored.
    pub async fn add_item(&mut self, key: &str, value: &Value) -> Result<bool> {
        self.connection(Role::Primary)
            .await?
            .setnx(key, value)
            .await
    }

    // Update if present. The store has no conditional swap, so presence is
    // checked first; another writer can slip in between the two calls.
    pub async fn replace_item(&mut self, key: &str, value: &Value) -> Result<bool> {
        let client = self.connection(Role::Primary).await?;
        if !client.exists(key).await? {
            return Ok(false);
        }
        client.getset(key, value).await?;
        Ok(true)
    }

    // Set only when the stored value still equals the token. Check then act,
    // same caveat as replace_item.
    pub async fn check_and_set_item(
        &mut self,
        token: &Value,
        key: &str,
        value: &Value,
    ) -> Result<bool> {
        let client = self.connection(Role::Primary).await?;
        match client.get(key).await? {
            Some(current) if &current == token => {
                client.getset(key, value).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn remove_item(&mut self, key: &str) -> Result<()> {
        self.connection(Role::Primary).await?.del(key).await
    }

    pub async fn remove_items(&mut self, keys: &[String]) -> Result<()> {
        self.connection(Role::Primary).await?.multi_del(keys).await
    }

    pub async fn increment_item(&mut self, key: &str, delta: i64) -> Result<i64> {
        self.connection(Role::Primary)
            .await?
            .incr(key, delta)
            .await
    }

    pub async fn decrement_item(&mut self, key: &str, delta: i64) -> Result<i64> {
        self.increment_item(key, delta.saturating_neg()).await
    }

    /* maintenance */

    pub async fn flush(&mut self) -> Result<()> {
        self.connection(Role::Primary).await?.flushdb().await
    }

    pub async fn total_space(&mut self) -> Result<u64> {
        let stats = self.connection(Role::Primary).await?.stats().await?;
        stat_u64(&stats, "limit_maxbytes")
    }

    pub async fn available_space(&mut self) -> Result<u64> {
        let stats = self.connection(Role::Primary).await?.stats().await?;
        let limit = stat_u64(&stats, "limit_maxbytes")?;
        let used = stat_u64(&stats, "bytes")?;
        Ok(limit.saturating_sub(used))
    }
}

// Reads one named statistic from a stats response as an unsigned integer.
fn stat_u64(stats: &HashMap<String, String>, name: &str) -> Result<u64> {
    let value = stats
        .get(name)
        .ok_or_else(|| CacheError::protocol(format!("stats entry '{}' missing", name)))?;
    value
        .parse::<u64>()
        .map_err(|_| CacheError::protocol(format!("stats entry '{}' is not a decimal", name)))
}

// Picks one server for the role uniformly at random and connects to it.
// Weights are carried in the descriptors but not consulted here.
async fn connect(role: Role, options: &Options) -> Result<Client> {
    let candidates = match role {
        Role::Primary => options.primary_servers(),
        Role::Replica => {
            let replicas = options.replica_servers();
            // A primary only list still serves reads.
            if replicas.is_empty() {
                options.servers().to_vec()
            } else {
                replicas
            }
        }
    };

    let server = candidates.choose(&mut rand::thread_rng()).ok_or_else(|| {
        CacheError::configuration(format!("no {} server configured", role))
    })?;

    let mut client = Client::from_addr(&server.host, server.port).await?;
    client.set_serializer(serializer_from(options)?);
    info!(server = %server, %role, "Initialized ssdb connection");

    Ok(client)
}

fn serializer_from(options: &Options) -> Result<Serializer> {
    match options.lib_option(LibOption::Serializer)? {
        Some(Value::String(mode)) if mode == "raw" => Ok(Serializer::Raw),
        _ => Ok(Serializer::Json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_are_invariant() {
        let a = SsdbCache::new(Options::default());
        let b = SsdbCache::new(Options::default());

        assert_eq!(a.capabilities(), b.capabilities());
        // Repeated retrieval returns field for field identical values.
        assert_eq!(a.capabilities(), a.capabilities());

        let capabilities = a.capabilities();
        assert_eq!(capabilities.supported_datatypes.object, Support::Degraded);
        assert_eq!(capabilities.supported_datatypes.resource, Support::No);
        assert_eq!(capabilities.min_ttl, 1);
        assert_eq!(capabilities.max_ttl, 0);
        assert_eq!(capabilities.max_key_length, 255);
        assert!(capabilities.namespace_is_prefix);
    }

    #[test]
    fn serializer_selection_from_lib_options() {
        let mut options = Options::default();
        assert_eq!(serializer_from(&options).unwrap(), Serializer::Json);

        options
            .set_lib_option(LibOption::Serializer, Value::String("raw".into()))
            .unwrap();
        assert_eq!(serializer_from(&options).unwrap(), Serializer::Raw);
    }
}
