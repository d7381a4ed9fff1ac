pub(crate) mod connection;
pub(crate) mod packet;

use crate::common::Result;
use crate::error::CacheError;
use crate::protocol::packet::Packet;

// Every block and the packet itself are terminated by a newline.
pub(crate) const DELIMITER: u8 = b'\n';

pub(crate) mod status {
    pub(crate) const OK: &str = "ok";
    pub(crate) const NOT_FOUND: &str = "not_found";
}

// A request packet: the command name followed by its arguments.
#[derive(Debug)]
pub(crate) struct Request {
    blocks: Vec<Vec<u8>>,
}

impl Request {
    pub(crate) fn new(command: &str) -> Self {
        Self {
            blocks: vec![command.as_bytes().to_vec()],
        }
    }

    pub(crate) fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.blocks.push(arg.as_ref().to_vec());
        self
    }

    pub(crate) fn blocks(&self) -> &[Vec<u8>] {
        &self.blocks
    }
}

// A response packet: a status block followed by the payload blocks.
#[derive(Debug, PartialEq)]
pub(crate) struct Response {
    status: String,
    blocks: Vec<Vec<u8>>,
}

impl Response {
    pub(crate) fn from_packet(packet: Packet) -> Result<Self> {
        let mut blocks = packet.into_blocks().into_iter();

        let status = match blocks.next() {
            Some(status) => String::from_utf8(status)
                .map_err(|_| CacheError::protocol("status block is not valid utf8"))?,
            None => return Err(CacheError::protocol("empty response packet")),
        };

        Ok(Self {
            status,
            blocks: blocks.collect(),
        })
    }

    pub(crate) fn status(&self) -> &str {
        &self.status
    }

    pub(crate) fn is_ok(&self) -> bool {
        self.status == status::OK
    }

    pub(crate) fn is_not_found(&self) -> bool {
        self.status == status::NOT_FOUND
    }

    pub(crate) fn blocks(&self) -> &[Vec<u8>] {
        &self.blocks
    }

    pub(crate) fn into_blocks(self) -> Vec<Vec<u8>> {
        self.blocks
    }

    // Diagnostic carried by an error status, falling back to the status itself.
    pub(crate) fn error_message(&self) -> String {
        if self.blocks.is_empty() {
            self.status().to_owned()
        } else {
            let detail = self
                .blocks
                .iter()
                .map(|block| String::from_utf8_lossy(block))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{}: {}", self.status, detail)
        }
    }
}
