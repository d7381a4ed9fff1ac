use serde::Serialize;

// Degree of support for storing a given value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Support {
    Yes,
    // Stored, but not restored identically (opaque objects come back as maps).
    Degraded,
    No,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportedDatatypes {
    pub null: Support,
    pub boolean: Support,
    pub integer: Support,
    pub double: Support,
    pub string: Support,
    pub array: Support,
    pub object: Support,
    pub resource: Support,
}

// Published contract the surrounding cache framework reads to decide
// serialization and ttl handling. Identical for every adapter instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub supported_datatypes: SupportedDatatypes,
    pub min_ttl: u64,
    // 0 means unbounded.
    pub max_ttl: u64,
    pub static_ttl: bool,
    pub ttl_precision: u64,
    pub use_request_time: bool,
    pub expired_read: bool,
    pub max_key_length: usize,
    pub namespace_is_prefix: bool,
}

impl Capabilities {
    pub(crate) fn new() -> Self {
        Self {
            supported_datatypes: SupportedDatatypes {
                null: Support::Yes,
                boolean: Support::Yes,
                integer: Support::Yes,
                double: Support::Yes,
                string: Support::Yes,
                array: Support::Yes,
                object: Support::Degraded,
                resource: Support::No,
            },
            min_ttl: 1,
            max_ttl: 0,
            static_ttl: true,
            ttl_precision: 1,
            use_request_time: false,
            expired_read: false,
            max_key_length: 255,
            namespace_is_prefix: true,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::new()
    }
}
