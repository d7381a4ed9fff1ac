use bytes::Buf;

use crate::protocol::DELIMITER;

// Raw packet: a sequence of length prefixed blocks terminated by an empty line.
//
//   <decimal len>\n<len bytes>\n ... \n
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Packet(Vec<Vec<u8>>);

#[derive(Debug)]
pub(crate) enum Error {
    // Not enough data is available to decode a packet from the buffer.
    Incomplete,
    Invalid(String),
}

type ByteCursor<'a> = std::io::Cursor<&'a [u8]>;

impl Packet {
    pub(crate) fn check_parse(src: &mut ByteCursor) -> Result<(), Error> {
        loop {
            if cursor::consume_terminator(src)? {
                return Ok(());
            }
            let len = cursor::get_decimal(src)? as usize;
            cursor::skip_block_data(src, len)?;
        }
    }

    pub(crate) fn parse(src: &mut ByteCursor) -> Result<Packet, Error> {
        let mut blocks = Vec::new();

        loop {
            if cursor::consume_terminator(src)? {
                return Ok(Packet(blocks));
            }
            let len = cursor::get_decimal(src)? as usize;
            blocks.push(cursor::get_block_data(src, len)?);
        }
    }

    pub(crate) fn into_blocks(self) -> Vec<Vec<u8>> {
        self.0
    }
}

// cursor utilities.
mod cursor {
    use super::*;

    // True when the cursor sits on the empty line closing a packet.
    pub(super) fn consume_terminator(src: &mut ByteCursor) -> Result<bool, Error> {
        if !src.has_remaining() {
            return Err(Error::Incomplete);
        }
        if src.chunk()[0] == DELIMITER {
            src.advance(1);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub(super) fn get_decimal(src: &mut ByteCursor) -> Result<u64, Error> {
        let line = get_line(src)?;

        atoi::atoi::<u64>(line)
            .ok_or_else(|| Error::Invalid("invalid block length format".into()))
    }

    // Block data is binary safe: the length decides where it ends, the
    // delimiter after it is only verified.
    pub(super) fn get_block_data(src: &mut ByteCursor, len: usize) -> Result<Vec<u8>, Error> {
        if src.remaining() < len + 1 {
            return Err(Error::Incomplete);
        }
        let data = Vec::from(&src.chunk()[..len]);
        if src.chunk()[len] != DELIMITER {
            return Err(Error::Invalid("block data not followed by delimiter".into()));
        }
        src.advance(len + 1);
        Ok(data)
    }

    pub(super) fn skip_block_data(src: &mut ByteCursor, len: usize) -> Result<(), Error> {
        if src.remaining() < len + 1 {
            return Err(Error::Incomplete);
        }
        if src.chunk()[len] != DELIMITER {
            return Err(Error::Invalid("block data not followed by delimiter".into()));
        }
        src.advance(len + 1);
        Ok(())
    }

    pub(super) fn get_line<'a>(src: &'a mut ByteCursor) -> Result<&'a [u8], Error> {
        let start = src.position() as usize;
        let end = src.get_ref().len();

        for i in start..end {
            if src.get_ref()[i] == DELIMITER {
                src.set_position((i + 1) as u64);

                return Ok(&src.get_ref()[start..i]);
            }
        }

        Err(Error::Incomplete)
    }
}
