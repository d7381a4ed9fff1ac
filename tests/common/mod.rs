use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub type Store = Arc<Mutex<HashMap<String, Vec<u8>>>>;

pub const LIMIT_MAXBYTES: u64 = 1_048_576;
pub const USED_BYTES: u64 = 65_536;

// Minimal scripted ssdb server speaking the block protocol, backed by an
// in-memory map shared across its connections.
pub async fn spawn_server() -> (SocketAddr, Store) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store: Store = Arc::new(Mutex::new(HashMap::new()));

    let accept_store = store.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => return,
            };
            tokio::spawn(handle(stream, accept_store.clone()));
        }
    });

    (addr, store)
}

async fn handle(mut stream: TcpStream, store: Store) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buffer.extend_from_slice(&chunk[..n]);

        while let Some((request, consumed)) = parse_packet(&buffer) {
            buffer.drain(..consumed);
            let response = dispatch(request, &store);
            if stream.write_all(&encode(&response)).await.is_err() {
                return;
            }
        }
    }
}

fn parse_packet(buffer: &[u8]) -> Option<(Vec<Vec<u8>>, usize)> {
    let mut pos = 0;
    let mut blocks = Vec::new();

    loop {
        if pos >= buffer.len() {
            return None;
        }
        if buffer[pos] == b'\n' {
            return Some((blocks, pos + 1));
        }

        let newline = buffer[pos..].iter().position(|&b| b == b'\n')? + pos;
        let len: usize = std::str::from_utf8(&buffer[pos..newline])
            .ok()?
            .parse()
            .ok()?;
        let start = newline + 1;
        if buffer.len() < start + len + 1 {
            return None;
        }
        blocks.push(buffer[start..start + len].to_vec());
        pos = start + len + 1;
    }
}

fn encode(blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = Vec::new();
    for block in blocks {
        payload.extend_from_slice(block.len().to_string().as_bytes());
        payload.push(b'\n');
        payload.extend_from_slice(block);
        payload.push(b'\n');
    }
    payload.push(b'\n');
    payload
}

fn ok(payload: impl IntoIterator<Item = Vec<u8>>) -> Vec<Vec<u8>> {
    let mut blocks = vec![b"ok".to_vec()];
    blocks.extend(payload);
    blocks
}

fn dispatch(request: Vec<Vec<u8>>, store: &Store) -> Vec<Vec<u8>> {
    let mut blocks = request.into_iter();
    let command = match blocks.next() {
        Some(command) => String::from_utf8_lossy(&command).into_owned(),
        None => return vec![b"client_error".to_vec()],
    };
    let args: Vec<Vec<u8>> = blocks.collect();
    let key = |index: usize| String::from_utf8_lossy(&args[index]).into_owned();
    let mut store = store.lock().unwrap();

    match command.as_str() {
        "get" => match store.get(&key(0)) {
            Some(value) => ok([value.clone()]),
            None => vec![b"not_found".to_vec()],
        },
        "set" => {
            store.insert(key(0), args[1].clone());
            ok([b"1".to_vec()])
        }
        "exists" => {
            let found = store.contains_key(&key(0));
            ok([if found { b"1".to_vec() } else { b"0".to_vec() }])
        }
        "del" => {
            store.remove(&key(0));
            ok([b"1".to_vec()])
        }
        "multi_get" => {
            let mut payload = Vec::new();
            for arg in &args {
                let key = String::from_utf8_lossy(arg).into_owned();
                if let Some(value) = store.get(&key) {
                    payload.push(arg.clone());
                    payload.push(value.clone());
                }
            }
            ok(payload)
        }
        "multi_set" => {
            let mut stored = 0u64;
            for pair in args.chunks(2) {
                if let [key_bytes, value] = pair {
                    store.insert(
                        String::from_utf8_lossy(key_bytes).into_owned(),
                        value.clone(),
                    );
                    stored += 1;
                }
            }
            ok([stored.to_string().into_bytes()])
        }
        "multi_del" => {
            for arg in &args {
                store.remove(&String::from_utf8_lossy(arg).into_owned());
            }
            ok([args.len().to_string().into_bytes()])
        }
        "incr" => {
            let delta: i64 = String::from_utf8_lossy(&args[1]).parse().unwrap_or(0);
            let current: i64 = store
                .get(&key(0))
                .and_then(|v| String::from_utf8_lossy(v).parse().ok())
                .unwrap_or(0);
            let next = current + delta;
            store.insert(key(0), next.to_string().into_bytes());
            ok([next.to_string().into_bytes()])
        }
        "setnx" => {
            if store.contains_key(&key(0)) {
                ok([b"0".to_vec()])
            } else {
                store.insert(key(0), args[1].clone());
                ok([b"1".to_vec()])
            }
        }
        "getset" => match store.insert(key(0), args[1].clone()) {
            Some(previous) => ok([previous]),
            None => vec![b"not_found".to_vec()],
        },
        "flushdb" => {
            store.clear();
            ok([])
        }
        "info" => ok([
            b"ssdb-server".to_vec(),
            b"limit_maxbytes".to_vec(),
            LIMIT_MAXBYTES.to_string().into_bytes(),
            b"bytes".to_vec(),
            USED_BYTES.to_string().into_bytes(),
        ]),
        _ => vec![b"client_error".to_vec(), b"unknown command".to_vec()],
    }
}
