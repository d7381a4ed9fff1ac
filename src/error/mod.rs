use std::fmt;
use std::io;

#[derive(Debug)]
pub enum CacheError {
    // Invalid adapter configuration given at construction or via a setter.
    Configuration { message: String },
    // A lib option name that does not resolve against the option registry.
    UnknownLibOption { name: String, lookup: String },
    // Failed to reach the selected server.
    Connection(io::Error),
    // Malformed response packet from the server.
    Protocol { message: String },
    // The store answered a request with an error status.
    Store { message: String },
    // Value could not round trip through the configured serializer.
    Serialize(serde_json::Error),
}

impl CacheError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        CacheError::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        CacheError::Protocol {
            message: message.into(),
        }
    }

    pub(crate) fn store(message: impl Into<String>) -> Self {
        CacheError::Store {
            message: message.into(),
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CacheError::Configuration { message } => {
                write!(f, "invalid configuration: {}", message)
            }
            CacheError::UnknownLibOption { name, lookup } => {
                write!(f, "unknown lib option '{}' ({})", name, lookup)
            }
            CacheError::Connection(err) => write!(f, "connection error: {}", err),
            CacheError::Protocol { message } => write!(f, "protocol error: {}", message),
            CacheError::Store { message } => write!(f, "store error: {}", message),
            CacheError::Serialize(err) => write!(f, "serialize error: {}", err),
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(err: io::Error) -> Self {
        CacheError::Connection(err)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialize(err)
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Connection(err) => Some(err),
            CacheError::Serialize(err) => Some(err),
            _ => None,
        }
    }
}
