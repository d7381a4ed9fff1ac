use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::Result;
use crate::error::CacheError;

// Default ssdb-server listen port.
pub const DEFAULT_PORT: u16 = 8888;

// Role a server plays in the replication topology.
// Writes and authoritative statistics go to Primary, plain reads to Replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Role {
    #[serde(rename = "master")]
    Primary,
    #[default]
    #[serde(rename = "slave")]
    Replica,
}

impl Role {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Role::Primary => "master",
            Role::Replica => "slave",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CacheError;
    // The external forms are compared case sensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(Role::Primary),
            "slave" => Ok(Role::Replica),
            other => Err(CacheError::configuration(format!(
                "invalid server type '{}' (expected 'master' or 'slave')",
                other
            ))),
        }
    }
}

// Connection parameters of a single server plus its role and weight.
// Equality is structural and is used to deduplicate the server list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerDescriptor {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub weight: u32,
    #[serde(default, rename = "type")]
    pub role: Role,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ServerDescriptor {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            weight: 0,
            role: Role::Replica,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

impl fmt::Display for ServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}?weight={}&type={}", self.host, self.port, self.weight, self.role)
    }
}

// A single server spec in one of the accepted input forms.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServerSpec {
    // "[scheme://]host[:port][?weight=W&type=T]"
    Uri(String),
    // {host: .., port: .., weight: .., type: ..}
    Keyed(ServerDescriptor),
    // [host, port?, weight?, type?]
    Positional(Vec<PositionalField>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PositionalField {
    Int(i64),
    Str(String),
}

impl ServerSpec {
    pub(crate) fn into_descriptor(self) -> Result<ServerDescriptor> {
        match self {
            ServerSpec::Uri(uri) => parse_uri(&uri),
            ServerSpec::Keyed(descriptor) => {
                if descriptor.host.is_empty() {
                    return Err(missing_host());
                }
                Ok(descriptor)
            }
            ServerSpec::Positional(fields) => parse_positional(fields),
        }
    }
}

fn missing_host() -> CacheError {
    CacheError::configuration("the list of servers must contain a host value")
}

// Parses "[scheme://]host[:port][?weight=W&type=T]".
// A missing scheme defaults to tcp and the scheme is otherwise ignored.
pub(crate) fn parse_uri(uri: &str) -> Result<ServerDescriptor> {
    let uri = uri.trim();
    let rest = match uri.find("://") {
        Some(pos) => &uri[pos + 3..],
        None => uri,
    };

    let (authority, query) = match rest.split_once('?') {
        Some((authority, query)) => (authority, Some(query)),
        None => (rest, None),
    };

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| {
                CacheError::configuration(format!("invalid port in server spec '{}'", uri))
            })?;
            (host, port)
        }
        None => (authority, DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err(missing_host());
    }

    let mut descriptor = ServerDescriptor::new(host).port(port);

    if let Some(query) = query {
        for pair in query.split('&') {
            let (key, value) = match pair.split_once('=') {
                Some((key, value)) => (key, value),
                None => continue,
            };
            match key {
                "weight" => {
                    descriptor.weight = value.parse::<u32>().map_err(|_| {
                        CacheError::configuration(format!(
                            "invalid weight in server spec '{}'",
                            uri
                        ))
                    })?;
                }
                "type" => descriptor.role = value.parse()?,
                _ => {}
            }
        }
    }

    Ok(descriptor)
}

fn parse_positional(fields: Vec<PositionalField>) -> Result<ServerDescriptor> {
    let mut fields = fields.into_iter();

    let host = match fields.next() {
        Some(PositionalField::Str(host)) if !host.is_empty() => host,
        Some(PositionalField::Int(host)) => host.to_string(),
        _ => return Err(missing_host()),
    };
    let mut descriptor = ServerDescriptor::new(host);

    if let Some(port) = fields.next() {
        descriptor.port = match port {
            PositionalField::Int(n) => u16::try_from(n)
                .map_err(|_| CacheError::configuration(format!("invalid port {}", n)))?,
            PositionalField::Str(s) => s
                .parse()
                .map_err(|_| CacheError::configuration(format!("invalid port '{}'", s)))?,
        };
    }
    if let Some(weight) = fields.next() {
        descriptor.weight = match weight {
            PositionalField::Int(n) => u32::try_from(n)
                .map_err(|_| CacheError::configuration(format!("invalid weight {}", n)))?,
            PositionalField::Str(s) => s
                .parse()
                .map_err(|_| CacheError::configuration(format!("invalid weight '{}'", s)))?,
        };
    }
    if let Some(role) = fields.next() {
        descriptor.role = match role {
            PositionalField::Str(s) => s.parse()?,
            PositionalField::Int(n) => {
                return Err(CacheError::configuration(format!(
                    "invalid server type '{}'",
                    n
                )))
            }
        };
    }

    Ok(descriptor)
}

// Accepted input forms of a whole server list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Servers {
    // "host:port?query,host:port?query,..."
    Delimited(String),
    List(Vec<ServerSpec>),
}

impl Servers {
    pub(crate) fn into_descriptors(self) -> Result<Vec<ServerDescriptor>> {
        match self {
            Servers::Delimited(csv) => csv
                .split(',')
                .map(|segment| parse_uri(segment.trim()))
                .collect(),
            Servers::List(specs) => specs
                .into_iter()
                .map(ServerSpec::into_descriptor)
                .collect(),
        }
    }
}

impl From<&str> for Servers {
    fn from(s: &str) -> Self {
        Servers::Delimited(s.to_owned())
    }
}

impl From<String> for Servers {
    fn from(s: String) -> Self {
        Servers::Delimited(s)
    }
}

impl From<Vec<ServerSpec>> for Servers {
    fn from(specs: Vec<ServerSpec>) -> Self {
        Servers::List(specs)
    }
}

impl From<Vec<ServerDescriptor>> for Servers {
    fn from(descriptors: Vec<ServerDescriptor>) -> Self {
        Servers::List(descriptors.into_iter().map(ServerSpec::Keyed).collect())
    }
}
