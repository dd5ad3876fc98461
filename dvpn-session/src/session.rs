//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// A peer session: owns one secure connection from KEY_VERIFIED onward,
// drives the CONNECTED record exchange, and schedules the rx-timeout and
// keepalive timers. Routing-plane and tunnel-frame content is handed to the
// owner over a channel rather than mutated in place here — only the owner
// may mutate the Adj-RIB a received LSA belongs to.
//

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dvpn_id::NodeId;
use dvpn_lsa::{Lsa, codec};
use dvpn_net::SecureConn;
use dvpn_util::TimeoutTask;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::record::{Record, RecordReader, encode_keepalive, encode_lsa, encode_tunnel_frame};
use crate::state::{SessionEvent, SessionState};

const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(20);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Jitters `base` by a factor in `[0.9, 1.1)`.
fn jittered(base: Duration) -> Duration {
    let factor = 0.9 + rand::random::<f64>() * 0.2;
    base.mul_f64(factor)
}

/// Commands a [`SessionHandle`] may ask the session's own task to run.
pub enum Command {
    SendLsa(Arc<Lsa>),
    SendTunnelFrame(Bytes),
    Cancel,
}

/// What the session reports back to its owner as it runs.
pub enum Update {
    Connected,
    LsaReceived(Arc<Lsa>),
    TunnelFrame(Bytes),
    Dead,
}

/// A cheaply-cloneable handle used to drive a running session from outside
/// its own task.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    pub fn send_lsa(&self, lsa: Arc<Lsa>) {
        let _ = self.commands.send(Command::SendLsa(lsa));
    }

    pub fn send_tunnel_frame(&self, frame: Bytes) {
        let _ = self.commands.send(Command::SendTunnelFrame(frame));
    }

    pub fn cancel(&self) {
        let _ = self.commands.send(Command::Cancel);
    }
}

enum TimerFired {
    Rx,
    Keepalive,
}

pub struct Session<S> {
    conn: SecureConn<S>,
    state: SessionState,
    peer_ids: Vec<NodeId>,
    reader: RecordReader,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an already key-verified connection (the product of
    /// `dvpn_net::connect`/`listen`, whose handshake has already run the
    /// `verify_key_ids` check).
    pub fn new(conn: SecureConn<S>) -> Session<S> {
        let peer_ids = conn.peer_ids().to_vec();
        Session {
            conn,
            state: SessionState::KeyVerified,
            peer_ids,
            reader: RecordReader::new(),
        }
    }

    pub fn peer_ids(&self) -> &[NodeId] {
        &self.peer_ids
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Spawns the session's own task and returns a handle to drive it plus
    /// a receiver for the updates it emits. The task runs until the session
    /// reaches `DEAD`.
    pub fn spawn(self) -> (SessionHandle, mpsc::UnboundedReceiver<Update>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        tokio::spawn(self.run(cmd_rx, update_tx));
        (SessionHandle { commands: cmd_tx }, update_rx)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        updates: mpsc::UnboundedSender<Update>,
    ) {
        SessionEvent::HandshakeDone.log_for(&self.peer_ids);
        self.state = SessionState::Connected;
        if updates.send(Update::Connected).is_err() {
            return;
        }

        let (timer_tx, mut timer_rx) = mpsc::unbounded_channel();

        let mut rx_timeout = {
            let timer_tx = timer_tx.clone();
            TimeoutTask::new(KEEPALIVE_TIMEOUT, move || async move {
                let _ = timer_tx.send(TimerFired::Rx);
            })
        };
        let mut keepalive_timer = spawn_keepalive_timer(&timer_tx);

        loop {
            tokio::select! {
                record = self.reader.next_record(&mut self.conn) => {
                    match record {
                        Ok(Record::Keepalive) => {
                            rx_timeout.reset(KEEPALIVE_TIMEOUT);
                        }
                        Ok(Record::Tunnel(frame)) => {
                            rx_timeout.reset(KEEPALIVE_TIMEOUT);
                            if updates.send(Update::TunnelFrame(frame)).is_err() {
                                break;
                            }
                        }
                        Ok(Record::Lsa(bytes)) => {
                            rx_timeout.reset(KEEPALIVE_TIMEOUT);
                            match codec::deserialise(&bytes) {
                                Ok(lsa) => {
                                    if updates.send(Update::LsaReceived(Arc::new(lsa))).is_err() {
                                        break;
                                    }
                                }
                                Err(error) => {
                                    error.log();
                                    break;
                                }
                            }
                        }
                        Err(error) => {
                            error.log();
                            SessionEvent::PeerClosed.log_for(&self.peer_ids);
                            break;
                        }
                    }
                }
                Some(cmd) = commands.recv() => {
                    match cmd {
                        Command::SendLsa(lsa) => {
                            let body = encode_lsa(&codec::serialise(&lsa));
                            if let Err(error) = self.conn.record_send(&body).await {
                                error.log();
                                SessionEvent::SendError.log_for(&self.peer_ids);
                                break;
                            }
                        }
                        Command::SendTunnelFrame(frame) => {
                            let body = encode_tunnel_frame(&frame);
                            if let Err(error) = self.conn.record_send(&body).await {
                                error.log();
                                SessionEvent::SendError.log_for(&self.peer_ids);
                                break;
                            }
                        }
                        Command::Cancel => {
                            SessionEvent::Cancel.log_for(&self.peer_ids);
                            break;
                        }
                    }
                }
                Some(fired) = timer_rx.recv() => {
                    match fired {
                        TimerFired::Rx => {
                            SessionEvent::RxTimeout.log_for(&self.peer_ids);
                            break;
                        }
                        TimerFired::Keepalive => {
                            if let Err(error) = self.conn.record_send(&encode_keepalive()).await {
                                error.log();
                                break;
                            }
                            keepalive_timer = spawn_keepalive_timer(&timer_tx);
                        }
                    }
                }
            }
        }

        self.state = SessionState::Dead;
        drop(rx_timeout);
        drop(keepalive_timer);
        let _ = updates.send(Update::Dead);
    }
}

fn spawn_keepalive_timer(
    timer_tx: &mpsc::UnboundedSender<TimerFired>,
) -> TimeoutTask {
    let timer_tx = timer_tx.clone();
    TimeoutTask::new(jittered(KEEPALIVE_INTERVAL), move || async move {
        let _ = timer_tx.send(TimerFired::Keepalive);
    })
}

impl SessionEvent {
    fn log_for(self, peer_ids: &[NodeId]) {
        debug!(?self, peers = peer_ids.len(), "session event");
        if matches!(self, SessionEvent::RxTimeout | SessionEvent::SendError) {
            warn!(?self, "session torn down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_ten_percent() {
        let base = Duration::from_secs(15);
        for _ in 0..1000 {
            let got = jittered(base);
            assert!(got >= base.mul_f64(0.9));
            assert!(got < base.mul_f64(1.1));
        }
    }
}
