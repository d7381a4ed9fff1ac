use std::collections::BTreeMap;

use serde_json::Value;

use crate::common::Result;
use crate::error::CacheError;

// Registry of recognized client library tuning options.
// The discriminants are the stable integer codes accepted verbatim as keys.
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibOption {
    Compression = 1,
    Serializer = 2,
    PrefixKey = 3,
    ConnectTimeout = 4,
    RecvTimeout = 5,
    SendTimeout = 6,
}

impl LibOption {
    pub fn code(self) -> i64 {
        self as i64
    }

    fn from_normalized(name: &str) -> Option<Self> {
        match name {
            "COMPRESSION" => Some(LibOption::Compression),
            "SERIALIZER" => Some(LibOption::Serializer),
            "PREFIX_KEY" => Some(LibOption::PrefixKey),
            "CONNECT_TIMEOUT" => Some(LibOption::ConnectTimeout),
            "RECV_TIMEOUT" => Some(LibOption::RecvTimeout),
            "SEND_TIMEOUT" => Some(LibOption::SendTimeout),
            _ => None,
        }
    }
}

// A lib option key as given by the caller, before normalization.
#[derive(Debug, Clone)]
pub enum LibOptionKey {
    Name(String),
    Code(i64),
}

impl From<&str> for LibOptionKey {
    fn from(name: &str) -> Self {
        LibOptionKey::Name(name.to_owned())
    }
}

impl From<String> for LibOptionKey {
    fn from(name: String) -> Self {
        LibOptionKey::Name(name)
    }
}

impl From<i64> for LibOptionKey {
    fn from(code: i64) -> Self {
        LibOptionKey::Code(code)
    }
}

impl From<LibOption> for LibOptionKey {
    fn from(option: LibOption) -> Self {
        LibOptionKey::Code(option.code())
    }
}

impl LibOptionKey {
    // Names are resolved against the registry after uppercasing and mapping
    // spaces and hyphens to underscores. Integer codes pass through verbatim.
    pub(crate) fn normalize(self) -> Result<i64> {
        match self {
            LibOptionKey::Code(code) => Ok(code),
            LibOptionKey::Name(name) => {
                let normalized = name.to_uppercase().replace([' ', '-'], "_");
                match LibOption::from_normalized(&normalized) {
                    Some(option) => Ok(option.code()),
                    None => Err(CacheError::UnknownLibOption {
                        lookup: format!("OPT_{}", normalized),
                        name,
                    }),
                }
            }
        }
    }
}

// Lib option values keyed by normalized option code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibOptions(BTreeMap<i64, Value>);

impl LibOptions {
    pub fn set(&mut self, key: impl Into<LibOptionKey>, value: Value) -> Result<()> {
        let code = key.into().normalize()?;
        self.0.insert(code, value);
        Ok(())
    }

    // Merges the given options into the map. New keys override existing ones,
    // keys absent from the batch are preserved.
    pub fn merge<K, I>(&mut self, options: I) -> Result<()>
    where
        K: Into<LibOptionKey>,
        I: IntoIterator<Item = (K, Value)>,
    {
        // Normalize every key before mutating so that one unknown name does
        // not leave a partially applied batch behind.
        let normalized = options
            .into_iter()
            .map(|(key, value)| key.into().normalize().map(|code| (code, value)))
            .collect::<Result<Vec<_>>>()?;

        self.0.extend(normalized);
        Ok(())
    }

    pub fn get(&self, key: impl Into<LibOptionKey>) -> Result<Option<&Value>> {
        let code = key.into().normalize()?;
        Ok(self.0.get(&code))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&i64, &Value)> {
        self.0.iter()
    }
}
