//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

mod config;
mod core;
mod error;
mod identity;

use std::sync::Arc;

use clap::Parser;
use config::Config;
use dvpn_id::NodeId;
use dvpn_net::listen::{EntryKind, ListenEntry, ListenTable, accept_loop};
use dvpn_net::tls::{client_config, install_crypto_provider, server_config};
use dvpn_net::SecureConn;
use dvpn_session::{Session, Update};
use rustls_pki_types::ServerName;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::{TlsAcceptor, TlsConnector};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::Core;
use crate::error::Error;

#[derive(Parser)]
#[command(name = "dvpnd", about = "Multipoint VPN routing daemon")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: String,
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive("dvpn=info".parse().unwrap())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

enum CoreMsg {
    Lsa(NodeId, Arc<dvpn_lsa::Lsa>),
    Down(NodeId),
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime");

    let exit_code = runtime.block_on(run(cli));
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> i32 {
    match try_run(cli).await {
        Ok(()) => 0,
        Err(error) => {
            error!(%error, "startup failed");
            1
        }
    }
}

async fn try_run(cli: Cli) -> Result<(), Error> {
    // Init/teardown order: TLS library -> load key -> bind listen sockets
    // -> register signal handler -> run loop -> on signal, tear down in
    // reverse.
    install_crypto_provider();

    let config = Config::load(&cli.config)?;
    let (local_cert, local_key, local_id) = identity::load(&config.private_key_file)?;
    info!(node_id = %local_id, "identity loaded");

    let client_cfg = Arc::new(client_config(local_cert.clone(), local_key.clone_key())?);
    let server_cfg = Arc::new(server_config(local_cert, local_key)?);

    let mut listen_table = ListenTable::new();
    for peer in &config.peers {
        if !peer.role.accepts_in() {
            continue;
        }
        let kind = if peer.fingerprint == "any" {
            EntryKind::Wildcard
        } else {
            let id: NodeId = peer
                .fingerprint
                .parse()
                .map_err(|_| config::Error::BadFingerprint { peer: peer.name.clone() })?;
            EntryKind::Fingerprint(id)
        };
        listen_table.push(ListenEntry {
            name: peer.name.clone(),
            kind,
            new_conn: Box::new(|| true),
        });
    }
    let listen_table = Arc::new(listen_table);

    let (core_tx, mut core_rx) = mpsc::unbounded_channel::<CoreMsg>();

    let core_task = tokio::spawn(async move {
        let mut core = Core::new(local_id);
        while let Some(msg) = core_rx.recv().await {
            match msg {
                CoreMsg::Lsa(from, lsa) => core.handle_lsa(from, lsa),
                CoreMsg::Down(from) => core.handle_peer_down(from),
            }
        }
    });

    let (accepted_tx, mut accepted_rx) = mpsc::channel(32);
    let mut listen_tasks = Vec::new();
    for addr in &config.listen_addresses {
        let listener = TcpListener::bind(addr).await.map_err(Error::Io)?;
        info!(%addr, "listening");
        let acceptor = TlsAcceptor::from(server_cfg.clone());
        let task = tokio::spawn(accept_loop(
            listener,
            acceptor,
            listen_table.clone(),
            accepted_tx.clone(),
        ));
        listen_tasks.push(task);
    }
    drop(accepted_tx);

    let accept_forward_tx = core_tx.clone();
    let accept_forward_task = tokio::spawn(async move {
        while let Some((name, conn)) = accepted_rx.recv().await {
            info!(%name, "accepted inbound peer");
            spawn_session(conn, accept_forward_tx.clone());
        }
    });

    let mut dial_tasks = Vec::new();
    for peer in &config.peers {
        if !peer.role.dials_out() {
            continue;
        }
        let address = peer.address.clone().expect("validated at config load");
        let expected: NodeId = peer
            .fingerprint
            .parse()
            .map_err(|_| Error::Identity(format!("peer '{}' has no usable fingerprint", peer.name)))?;
        let connector = TlsConnector::from(client_cfg.clone());
        let core_tx = core_tx.clone();
        let name = peer.name.clone();
        dial_tasks.push(tokio::spawn(async move {
            dial_peer_forever(&name, &address, connector, expected, core_tx).await;
        }));
    }

    tokio::signal::ctrl_c()
        .await
        .expect("failed to install SIGINT handler");
    info!("received SIGINT, shutting down");

    for task in dial_tasks {
        task.abort();
    }
    accept_forward_task.abort();
    for task in listen_tasks {
        task.abort();
    }
    core_task.abort();

    Ok(())
}

async fn dial_peer_forever(
    name: &str,
    address: &str,
    connector: TlsConnector,
    expected: NodeId,
    core_tx: mpsc::UnboundedSender<CoreMsg>,
) {
    let Some((hostname, port)) = address.rsplit_once(':') else {
        error!(%name, %address, "peer address must be host:port");
        return;
    };
    let Ok(port) = port.parse::<u16>() else {
        error!(%name, %address, "peer address has a non-numeric port");
        return;
    };
    let Ok(server_name) = ServerName::try_from(hostname.to_string()) else {
        error!(%name, %hostname, "not a valid server name");
        return;
    };

    loop {
        info!(%name, %address, "dialing");
        let conn = dvpn_net::connect::dial_with_backoff(
            hostname,
            port,
            connector.clone(),
            server_name.clone(),
            expected,
        )
        .await;
        info!(%name, "connected");

        let (_handle, mut updates) = Session::new(conn).spawn();
        while let Some(update) = updates.recv().await {
            match update {
                Update::Connected => {}
                Update::LsaReceived(lsa) => {
                    let _ = core_tx.send(CoreMsg::Lsa(expected, lsa));
                }
                Update::TunnelFrame(_) => {}
                Update::Dead => {
                    warn!(%name, "session died, will redial");
                    let _ = core_tx.send(CoreMsg::Down(expected));
                    break;
                }
            }
        }
    }
}

fn spawn_session<S>(conn: SecureConn<S>, core_tx: mpsc::UnboundedSender<CoreMsg>)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let from = conn.peer_ids().first().copied();
    let (_handle, mut updates) = Session::new(conn).spawn();
    tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            match update {
                Update::Connected => {}
                Update::LsaReceived(lsa) => {
                    if let Some(from) = from {
                        let _ = core_tx.send(CoreMsg::Lsa(from, lsa));
                    }
                }
                Update::TunnelFrame(_) => {}
                Update::Dead => {
                    if let Some(from) = from {
                        let _ = core_tx.send(CoreMsg::Down(from));
                    }
                    break;
                }
            }
        }
    });
}
