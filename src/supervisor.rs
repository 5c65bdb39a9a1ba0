//! Connection establishment and the reconnect policy.
//!
//! The policy is deliberately asymmetric: a failure on the very first
//! attempt exits the process, since an unreachable server at startup
//! usually means misconfiguration; once any connection has succeeded,
//! losses are retried until shutdown is requested.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::Duration;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_util::codec::Framed;
use tracing::{error, info, warn};

use udpirc_proto::IrcCodec;

use crate::bridge::BridgeTable;
use crate::config::ServerConfig;
use crate::error::RelayError;
use crate::session::{Disconnect, IrcSession, IrcStream, IrcTransport};

/// Delay before retrying after a lost connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Owns the IRC transport lifecycle and the retry policy.
pub struct ConnectionSupervisor {
    config: Arc<ServerConfig>,
    bridges: Arc<BridgeTable>,
    shutdown: watch::Receiver<bool>,
}

impl ConnectionSupervisor {
    pub fn new(
        config: ServerConfig,
        bridges: BridgeTable,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            bridges: Arc::new(bridges),
            shutdown,
        }
    }

    /// Run until shutdown or a fatal error.
    pub async fn run(&mut self) -> Result<(), RelayError> {
        let mut ever_connected = false;
        loop {
            if *self.shutdown.borrow() {
                return Ok(());
            }

            let transport = match self.connect().await {
                Ok(transport) => transport,
                Err(e) if ever_connected => {
                    warn!(error = %e, "reconnect failed; retrying");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
                Err(e) => {
                    error!(
                        error = %e,
                        host = %self.config.host,
                        port = self.config.port,
                        "initial connection failed"
                    );
                    return Err(e);
                }
            };
            ever_connected = true;

            let (session, out_rx) =
                IrcSession::new(Arc::clone(&self.config), Arc::clone(&self.bridges));
            match session
                .run(transport, out_rx, self.shutdown.clone())
                .await?
            {
                Disconnect::Shutdown => {
                    info!("shutdown complete");
                    return Ok(());
                }
                Disconnect::Lost(reason) => {
                    info!(
                        reason = reason.as_deref().unwrap_or("connection lost"),
                        "disconnected; reconnecting"
                    );
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    async fn connect(&self) -> Result<IrcTransport, RelayError> {
        info!(
            host = %self.config.host,
            port = self.config.port,
            tls = self.config.tls,
            "connecting"
        );
        let tcp = TcpStream::connect((self.config.host.as_str(), self.config.port))
            .await
            .map_err(RelayError::Connect)?;

        let stream: Box<dyn IrcStream> = if self.config.tls {
            let connector = tls_connector();
            let server_name = ServerName::try_from(self.config.host.clone())
                .map_err(|_| RelayError::InvalidServerName(self.config.host.clone()))?;
            let tls = connector
                .connect(server_name, tcp)
                .await
                .map_err(RelayError::Connect)?;
            Box::new(tls)
        } else {
            Box::new(tcp)
        };

        Ok(Framed::new(stream, IrcCodec::new()))
    }
}

/// Client TLS config with the platform trust store.
fn tls_connector() -> TlsConnector {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for cert in native.certs {
        if let Err(e) = roots.add(cert) {
            warn!(error = %e, "failed to add root certificate");
        }
    }
    for e in &native.errors {
        warn!(error = %e, "error loading native certificates");
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}
