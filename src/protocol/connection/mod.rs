use std::io::{self, Cursor};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use crate::common::Result;
use crate::error::CacheError;
use crate::protocol::packet::{self, Packet};
use crate::protocol::{Request, Response, DELIMITER};

pub(crate) struct Connection<T = TcpStream> {
    stream: BufWriter<T>,
    // The buffer for reading response packets.
    buffer: BytesMut,
}

impl<T> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

impl<T> Connection<T>
where
    T: AsyncWrite + AsyncRead + Unpin,
{
    pub(crate) fn new(stream: T, buffer_size: Option<usize>) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(buffer_size.unwrap_or(4 * 1024)),
        }
    }

    pub(crate) async fn write_request(&mut self, request: &Request) -> Result<()> {
        for block in request.blocks() {
            self.write_decimal(block.len() as u64).await?;
            self.stream.write_all(block).await?;
            self.stream.write_u8(DELIMITER).await?;
        }
        self.stream.write_u8(DELIMITER).await?;

        self.stream.flush().await?;
        Ok(())
    }

    pub(crate) async fn read_response(&mut self) -> Result<Option<Response>> {
        loop {
            if let Some(packet) = self.parse_packet()? {
                return Ok(Some(Response::from_packet(packet)?));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(CacheError::Connection(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "connection reset by peer",
                    )))
                };
            }
        }
    }

    fn parse_packet(&mut self) -> Result<Option<Packet>> {
        use packet::Error::Incomplete;

        let mut buf = Cursor::new(&self.buffer[..]);

        match Packet::check_parse(&mut buf) {
            Ok(_) => {
                let len = buf.position() as usize;
                buf.set_position(0);
                let packet = Packet::parse(&mut buf)
                    .map_err(|err| CacheError::protocol(format!("{:?}", err)))?;
                self.buffer.advance(len);

                Ok(Some(packet))
            }
            Err(Incomplete) => Ok(None),
            Err(packet::Error::Invalid(message)) => Err(CacheError::protocol(message)),
        }
    }

    async fn write_decimal(&mut self, val: u64) -> io::Result<()> {
        use std::io::Write;

        let mut buf = [0u8; 20];
        let mut buf = Cursor::new(&mut buf[..]);
        write!(&mut buf, "{}", val)?;

        let pos = buf.position() as usize;
        self.stream.write_all(&buf.get_ref()[..pos]).await?;
        self.stream.write_u8(DELIMITER).await
    }
}
