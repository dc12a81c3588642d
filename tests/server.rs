//! End-to-end tests: a real listener driven through `server::run`.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use bytes::Bytes;
use flintkv::{
    build_registry, snapshot, ConnectionStats, ReplicaOf, ReplicationInfo, RespValue,
    ServerConfig, StorageEngine,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};

const READ_TIMEOUT: Duration = Duration::from_secs(3);

struct TestServer {
    addr: std::net::SocketAddr,
    storage: Arc<StorageEngine>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start(config: ServerConfig) -> Result<Self> {
        Self::start_with(config, Arc::new(StorageEngine::new())).await
    }

    async fn start_with(config: ServerConfig, storage: Arc<StorageEngine>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let replication = Arc::new(ReplicationInfo::from_replica_of(config.replicaof.clone()));
        let registry = Arc::new(build_registry(Arc::clone(&storage), &config, replication));

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(flintkv::server::run(
            listener,
            registry,
            Arc::new(ConnectionStats::new()),
            async move {
                let _ = stopped.await;
            },
        ));

        Ok(Self {
            addr,
            storage,
            stop,
            task,
        })
    }

    async fn client(&self) -> Result<Client> {
        let stream = TcpStream::connect(self.addr)
            .await
            .context("connect to test server")?;
        Ok(Client { stream })
    }

    async fn shutdown(self) -> Result<()> {
        let _ = self.stop.send(());
        self.task.await??;
        Ok(())
    }
}

struct Client {
    stream: TcpStream,
}

impl Client {
    /// Sends `parts` as one request and reads exactly `expected` back.
    async fn call(&mut self, parts: &[&str], expected: &[u8]) -> Result<()> {
        let request = RespValue::command(parts.iter().map(|p| Bytes::from(p.to_string())));
        self.stream.write_all(&request.serialize()).await?;

        let reply = self.read_exact(expected.len()).await?;
        assert_eq!(
            String::from_utf8_lossy(&reply),
            String::from_utf8_lossy(expected),
            "reply to {:?}",
            parts
        );
        Ok(())
    }

    async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        timeout(READ_TIMEOUT, self.stream.read_exact(&mut buf))
            .await
            .context("timed out waiting for reply")??;
        Ok(buf)
    }
}

fn config_with_dir(dir: &str) -> ServerConfig {
    ServerConfig {
        dir: dir.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn basic_commands_end_to_end() -> Result<()> {
    let server = TestServer::start(config_with_dir("/tmp")).await?;
    let mut client = server.client().await?;

    client.call(&["PING"], b"+PONG\r\n").await?;
    client.call(&["ECHO", "hey"], b"$3\r\nhey\r\n").await?;
    client.call(&["SET", "foo", "bar"], b"+OK\r\n").await?;
    client.call(&["get", "foo"], b"$3\r\nbar\r\n").await?;
    client.call(&["GET", "missing"], b"$-1\r\n").await?;
    client.call(&["KEYS", "*"], b"*1\r\n$3\r\nfoo\r\n").await?;
    client
        .call(&["CONFIG", "GET", "dir"], b"*2\r\n$3\r\ndir\r\n$4\r\n/tmp\r\n")
        .await?;
    client
        .call(&["FOO"], b"-ERR unknown command 'FOO'\r\n")
        .await?;

    server.shutdown().await
}

#[tokio::test]
async fn set_px_expires_but_key_stays_listed() -> Result<()> {
    let server = TestServer::start(ServerConfig::default()).await?;
    let mut client = server.client().await?;

    client
        .call(&["SET", "foo", "bar", "PX", "100"], b"+OK\r\n")
        .await?;
    client.call(&["GET", "foo"], b"$3\r\nbar\r\n").await?;

    tokio::time::sleep(Duration::from_millis(150)).await;

    client.call(&["GET", "foo"], b"$-1\r\n").await?;
    client.call(&["KEYS", "*"], b"*1\r\n$3\r\nfoo\r\n").await?;
    assert_eq!(server.storage.len(), 1);

    server.shutdown().await
}

#[tokio::test]
async fn writes_are_visible_across_connections() -> Result<()> {
    let server = TestServer::start(ServerConfig::default()).await?;
    let mut writer = server.client().await?;
    let mut reader = server.client().await?;

    writer.call(&["SET", "shared", "value"], b"+OK\r\n").await?;
    reader.call(&["GET", "shared"], b"$5\r\nvalue\r\n").await?;

    server.shutdown().await
}

#[tokio::test]
async fn many_concurrent_clients() -> Result<()> {
    let server = TestServer::start(ServerConfig::default()).await?;

    let mut tasks = Vec::new();
    for i in 0..20 {
        let mut client = server.client().await?;
        tasks.push(tokio::spawn(async move {
            let key = format!("key:{}", i);
            let value = format!("value:{:02}", i);
            client.call(&["SET", key.as_str(), value.as_str()], b"+OK\r\n").await?;
            client
                .call(&["GET", key.as_str()], format!("$8\r\n{}\r\n", value).as_bytes())
                .await
        }));
    }
    for task in tasks {
        task.await??;
    }

    assert_eq!(server.storage.len(), 20);
    server.shutdown().await
}

#[tokio::test]
async fn replica_reports_its_master() -> Result<()> {
    let config = ServerConfig {
        replicaof: Some(ReplicaOf {
            host: "localhost".to_string(),
            port: 6379,
        }),
        ..Default::default()
    };
    let server = TestServer::start(config).await?;
    let mut client = server.client().await?;

    let request = RespValue::command(["INFO", "replication"]).serialize();
    client.stream.write_all(&request).await?;

    let header = client.read_exact(4).await?;
    assert_eq!(header[0], b'$');
    let mut line = header;
    while !line.ends_with(b"\r\n") {
        line.extend(client.read_exact(1).await?);
    }
    let len: usize = std::str::from_utf8(&line[1..line.len() - 2])?.parse()?;
    let body = client.read_exact(len + 2).await?;
    let body = String::from_utf8(body)?;

    assert!(body.contains("role:slave\n"));
    assert!(body.contains("master_replid:8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb\n"));
    assert!(body.contains("master_host:localhost\n"));

    client
        .call(
            &["PSYNC", "?", "-1"],
            b"+FULLRESYNC 8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb 0\r\n",
        )
        .await?;
    client
        .call(&["REPLCONF", "listening-port", "6380"], b"+OK\r\n")
        .await?;

    server.shutdown().await
}

#[tokio::test]
async fn snapshot_seeds_the_store() -> Result<()> {
    let mut rdb = b"REDIS0011".to_vec();
    rdb.extend_from_slice(&[0xFE, 0x00, 0xFB, 0x02, 0x01]);
    rdb.extend_from_slice(&[0x00, 0x05]);
    rdb.extend_from_slice(b"apple");
    rdb.extend_from_slice(&[0x03]);
    rdb.extend_from_slice(b"red");
    // Expired in 1970
    rdb.push(0xFC);
    rdb.extend_from_slice(&1_000u64.to_le_bytes());
    rdb.extend_from_slice(&[0x00, 0x04]);
    rdb.extend_from_slice(b"pear");
    rdb.extend_from_slice(&[0x05]);
    rdb.extend_from_slice(b"green");
    rdb.push(0xFF);

    let dir = std::env::temp_dir().join(format!("flintkv-e2e-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let config = ServerConfig {
        dir: dir.display().to_string(),
        dbfilename: "seed.rdb".to_string(),
        ..Default::default()
    };
    std::fs::write(config.snapshot_path(), &rdb)?;

    let storage = Arc::new(StorageEngine::new());
    let summary = snapshot::load_file(config.snapshot_path(), &storage)?;
    std::fs::remove_dir_all(&dir)?;
    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.expired, 1);

    let server = TestServer::start_with(config, storage).await?;
    let mut client = server.client().await?;

    client.call(&["GET", "apple"], b"$3\r\nred\r\n").await?;
    client.call(&["GET", "pear"], b"$-1\r\n").await?;
    client.call(&["KEYS", "*"], b"*1\r\n$5\r\napple\r\n").await?;
    client
        .call(&["CONFIG", "GET", "dbfilename"], b"*2\r\n$10\r\ndbfilename\r\n$8\r\nseed.rdb\r\n")
        .await?;

    server.shutdown().await
}

#[tokio::test]
async fn handshake_reaches_master() -> Result<()> {
    let master = TcpListener::bind("127.0.0.1:0").await?;
    let master_port = master.local_addr()?.port();

    let expected: &[u8] = b"*1\r\n$4\r\nPING\r\n\
        *3\r\n$8\r\nREPLCONF\r\n$14\r\nlistening-port\r\n$4\r\n6380\r\n\
        *3\r\n$8\r\nREPLCONF\r\n$4\r\ncapa\r\n$6\r\npsync2\r\n\
        *3\r\n$5\r\nPSYNC\r\n$1\r\n?\r\n$2\r\n-1\r\n";

    let received = tokio::spawn(async move {
        let (mut socket, _) = master.accept().await?;
        let mut buf = vec![0u8; expected.len()];
        socket.read_exact(&mut buf).await?;
        anyhow::Ok(buf)
    });

    let replica_of: ReplicaOf = format!("127.0.0.1 {}", master_port).parse()?;
    let _link = flintkv::replication::connect_to_master(
        &replica_of,
        6380,
        flintkv::replication::HANDSHAKE_PAUSE,
    )
    .await?;

    let received = timeout(READ_TIMEOUT, received).await???;
    assert_eq!(received, expected);
    Ok(())
}
