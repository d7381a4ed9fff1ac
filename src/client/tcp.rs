use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::client::{Api, Serializer};
use crate::common::{debug, Result};
use crate::error::CacheError;
use crate::protocol::connection::Connection;
use crate::protocol::{Request, Response};

#[derive(Debug)]
pub struct Client<T = TcpStream> {
    connection: Connection<T>,
    serializer: Serializer,
}

impl Client {
    pub async fn from_addr(host: &str, port: u16) -> Result<Self> {
        debug!(host, port, "Connect to ssdb server");
        Ok(Client::new(TcpStream::connect((host, port)).await?))
    }
}

impl<T> Client<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: T) -> Self {
        Self {
            connection: Connection::new(stream, None),
            serializer: Serializer::default(),
        }
    }

    async fn request(&mut self, request: Request) -> Result<Response> {
        self.connection.write_request(&request).await?;

        match self.connection.read_response().await? {
            Some(response) => Ok(response),
            None => Err(CacheError::Connection(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            ))),
        }
    }

    // Issues a request whose response carries no payload of interest.
    async fn request_ok(&mut self, request: Request) -> Result<()> {
        let response = self.request(request).await?;
        if response.is_ok() {
            Ok(())
        } else {
            Err(CacheError::store(response.error_message()))
        }
    }

    // Issues a request answered with a single "1"/"0" block.
    async fn request_bool(&mut self, request: Request) -> Result<bool> {
        let response = self.request(request).await?;
        if !response.is_ok() {
            return Err(CacheError::store(response.error_message()));
        }
        Ok(first_block(&response)? == b"1")
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        match (self.serializer, value) {
            (Serializer::Raw, Value::String(s)) => Ok(s.clone().into_bytes()),
            _ => Ok(serde_json::to_vec(value)?),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        match self.serializer {
            Serializer::Json => Ok(serde_json::from_slice(bytes)?),
            Serializer::Raw => Ok(Value::String(
                String::from_utf8_lossy(bytes).into_owned(),
            )),
        }
    }
}

fn first_block(response: &Response) -> Result<&[u8]> {
    response
        .blocks()
        .first()
        .map(Vec::as_slice)
        .ok_or_else(|| CacheError::protocol("response payload block missing"))
}

#[async_trait]
impl<T> Api for Client<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn get(&mut self, key: &str) -> Result<Option<Value>> {
        let response = self.request(Request::new("get").arg(key)).await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_ok() {
            return Err(CacheError::store(response.error_message()));
        }
        self.decode(first_block(&response)?).map(Some)
    }

    async fn multi_get(&mut self, keys: &[String]) -> Result<HashMap<String, Value>> {
        let mut request = Request::new("multi_get");
        for key in keys {
            request = request.arg(key);
        }

        let response = self.request(request).await?;
        if !response.is_ok() {
            return Err(CacheError::store(response.error_message()));
        }

        // Payload is alternating key and value blocks. Missing keys are
        // simply absent from the payload.
        let mut entries = HashMap::new();
        let mut blocks = response.into_blocks().into_iter();
        while let (Some(key), Some(value)) = (blocks.next(), blocks.next()) {
            let key = String::from_utf8(key)
                .map_err(|_| CacheError::protocol("key block is not valid utf8"))?;
            entries.insert(key, self.decode(&value)?);
        }

        Ok(entries)
    }

    async fn exists(&mut self, key: &str) -> Result<bool> {
        self.request_bool(Request::new("exists").arg(key)).await
    }

    async fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        let value = self.encode(value)?;
        self.request_ok(Request::new("set").arg(key).arg(value))
            .await
    }

    async fn multi_set(&mut self, entries: &HashMap<String, Value>) -> Result<()> {
        let mut request = Request::new("multi_set");
        for (key, value) in entries {
            request = request.arg(key).arg(self.encode(value)?);
        }
        self.request_ok(request).await
    }

    async fn del(&mut self, key: &str) -> Result<()> {
        self.request_ok(Request::new("del").arg(key)).await
    }

    async fn multi_del(&mut self, keys: &[String]) -> Result<()> {
        let mut request = Request::new("multi_del");
        for key in keys {
            request = request.arg(key);
        }
        self.request_ok(request).await
    }

    async fn incr(&mut self, key: &str, delta: i64) -> Result<i64> {
        let response = self
            .request(Request::new("incr").arg(key).arg(delta.to_string()))
            .await?;
        if !response.is_ok() {
            return Err(CacheError::store(response.error_message()));
        }

        atoi::atoi::<i64>(first_block(&response)?)
            .ok_or_else(|| CacheError::protocol("incr response is not a decimal"))
    }

    async fn setnx(&mut self, key: &str, value: &Value) -> Result<bool> {
        let value = self.encode(value)?;
        self.request_bool(Request::new("setnx").arg(key).arg(value))
            .await
    }

    async fn getset(&mut self, key: &str, value: &Value) -> Result<Option<Value>> {
        let value = self.encode(value)?;
        let response = self
            .request(Request::new("getset").arg(key).arg(value))
            .await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_ok() {
            return Err(CacheError::store(response.error_message()));
        }
        self.decode(first_block(&response)?).map(Some)
    }

    async fn flushdb(&mut self) -> Result<()> {
        self.request_ok(Request::new("flushdb")).await
    }

    async fn stats(&mut self) -> Result<HashMap<String, String>> {
        let response = self.request(Request::new("info")).await?;
        if !response.is_ok() {
            return Err(CacheError::store(response.error_message()));
        }

        let mut blocks = response.into_blocks().into_iter();
        // info responses may carry a leading banner block before the pairs.
        if blocks.len() % 2 == 1 {
            blocks.next();
        }

        let mut stats = HashMap::new();
        while let (Some(key), Some(value)) = (blocks.next(), blocks.next()) {
            stats.insert(
                String::from_utf8_lossy(&key).into_owned(),
                String::from_utf8_lossy(&value).into_owned(),
            );
        }
        Ok(stats)
    }

    fn set_serializer(&mut self, serializer: Serializer) {
        self.serializer = serializer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncWriteExt, DuplexStream};

    async fn respond(server: &mut DuplexStream, blocks: &[&[u8]]) {
        let mut payload = Vec::new();
        for block in blocks {
            payload.extend_from_slice(block.len().to_string().as_bytes());
            payload.push(b'\n');
            payload.extend_from_slice(block);
            payload.push(b'\n');
        }
        payload.push(b'\n');
        server.write_all(&payload).await.unwrap();
        server.flush().await.unwrap();
    }

    #[test]
    fn get_maps_not_found_to_none() {
        tokio_test::block_on(async move {
            let (stream, mut server) = tokio::io::duplex(1024);
            let mut client = Client::new(stream);

            respond(&mut server, &[b"not_found"]).await;
            assert_eq!(client.get("missing").await.unwrap(), None);
        })
    }

    #[test]
    fn get_decodes_structured_value() {
        tokio_test::block_on(async move {
            let (stream, mut server) = tokio::io::duplex(1024);
            let mut client = Client::new(stream);

            respond(&mut server, &[b"ok", br#"{"n":1}"#]).await;
            assert_eq!(client.get("key").await.unwrap(), Some(json!({"n": 1})));
        })
    }

    #[test]
    fn error_status_carries_server_message() {
        tokio_test::block_on(async move {
            let (stream, mut server) = tokio::io::duplex(1024);
            let mut client = Client::new(stream);

            respond(&mut server, &[b"error", b"out of disk"]).await;
            match client.set("key", &json!(1)).await.unwrap_err() {
                CacheError::Store { message } => assert_eq!(message, "error: out of disk"),
                other => panic!("unexpected error: {:?}", other),
            }
        })
    }

    #[test]
    fn incr_parses_new_value() {
        tokio_test::block_on(async move {
            let (stream, mut server) = tokio::io::duplex(1024);
            let mut client = Client::new(stream);

            respond(&mut server, &[b"ok", b"-3"]).await;
            assert_eq!(client.incr("counter", -4).await.unwrap(), -3);
        })
    }

    #[test]
    fn raw_serializer_passes_strings_through() {
        tokio_test::block_on(async move {
            let (stream, mut server) = tokio::io::duplex(1024);
            let mut client = Client::new(stream);
            client.set_serializer(Serializer::Raw);

            respond(&mut server, &[b"ok", b"plain text"]).await;
            assert_eq!(
                client.get("key").await.unwrap(),
                Some(json!("plain text"))
            );
        })
    }

    #[test]
    fn stats_skips_banner_block() {
        tokio_test::block_on(async move {
            let (stream, mut server) = tokio::io::duplex(1024);
            let mut client = Client::new(stream);

            respond(
                &mut server,
                &[b"ok", b"ssdb-server", b"limit_maxbytes", b"1024", b"bytes", b"256"],
            )
            .await;
            let stats = client.stats().await.unwrap();
            assert_eq!(stats.get("limit_maxbytes").map(String::as_str), Some("1024"));
            assert_eq!(stats.get("bytes").map(String::as_str), Some("256"));
        })
    }
}
