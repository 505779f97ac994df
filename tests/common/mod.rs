//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use minsig::config::{BrokerConfig, TlsConfig};
use minsig::http::HttpServer;
use minsig::lifecycle::Shutdown;
use minsig::rendezvous::{RendezvousTable, SlotKey};

/// A broker running on an ephemeral local port.
pub struct TestBroker {
    pub addr: SocketAddr,
    pub table: RendezvousTable,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

#[allow(dead_code)]
impl TestBroker {
    pub fn url(&self, slot: &str) -> String {
        format!("http://{}/{}", self.addr, slot)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Poll until `slot` holds an offer.
    pub async fn wait_for_slot(&self, slot: &str) {
        let key = SlotKey::try_from(slot).unwrap();
        for _ in 0..200 {
            if self.table.contains(&key) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("slot {} never opened", slot);
    }

    /// Poll until the table is empty.
    pub async fn wait_until_empty(&self) {
        for _ in 0..200 {
            if self.table.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("table still holds {} slots", self.table.len());
    }
}

/// Start a broker with `config`, listening on 127.0.0.1 with a random port.
pub async fn start_broker(config: BrokerConfig) -> TestBroker {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config);
    let table = server.table().clone();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let task = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    TestBroker {
        addr,
        table,
        shutdown,
        task,
    }
}

/// Start a broker with default settings.
#[allow(dead_code)]
pub async fn start_default_broker() -> TestBroker {
    start_broker(BrokerConfig::default()).await
}

/// A client that never reuses connections, so one hung request cannot
/// delay another.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// A self-signed certificate for 127.0.0.1, written to a temporary directory
/// that lives as long as this value.
#[allow(dead_code)]
pub struct TestCert {
    pub dir: tempfile::TempDir,
    pub tls: TlsConfig,
}

#[allow(dead_code)]
pub fn self_signed_tls(bind_address: SocketAddr) -> TestCert {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["127.0.0.1".to_string(), "localhost".to_string()])
            .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let cert_path = dir.path().join("cert.pem");
    let key_path = dir.path().join("key.pem");
    std::fs::write(&cert_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();

    TestCert {
        tls: TlsConfig {
            bind_address: bind_address.to_string(),
            cert_path: cert_path.to_string_lossy().into_owned(),
            key_path: key_path.to_string_lossy().into_owned(),
        },
        dir,
    }
}

/// An address on 127.0.0.1 that was free a moment ago.
#[allow(dead_code)]
pub fn unused_local_addr() -> SocketAddr {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
}

/// Poll until something accepts connections on `addr`.
#[allow(dead_code)]
pub async fn wait_for_listener(addr: SocketAddr) {
    for _ in 0..200 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("nothing listening on {}", addr);
}

/// Like [`client`], but trusting any certificate.
#[allow(dead_code)]
pub fn tls_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
}
