//! Peer relay for spork messages.
//!
//! The adapter sits between the transport and the [`SporkManager`]: inbound
//! messages are ingested and, when they were new, relayed to every other
//! peer; `GetSporks` requests are answered with everything on file; a timer
//! drives maintenance. Bad messages are logged and dropped, never reported
//! back as peer faults.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use evo_types::{SporkId, SporkMessage};

use crate::error::SporkError;
use crate::manager::{IngestOutcome, SporkManager};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

pub type PeerId = u64;

/// Spork messages as they travel between peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SporkWireMessage {
    Spork(SporkMessage),
    GetSporks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundSpork {
    pub peer: PeerId,
    pub message: SporkWireMessage,
}

/// Work for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundSpork {
    /// Send to every connected peer except `except`.
    Relay { except: Option<PeerId>, message: SporkMessage },
    SendTo { peer: PeerId, message: SporkMessage },
}

/// A locally requested spork change. Only honoured on signing nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastRequest {
    pub spork_id: SporkId,
    pub value: i64,
}

pub struct SporkNetworkAdapter {
    manager: Arc<SporkManager>,
    tick_interval: Duration,
}

impl SporkNetworkAdapter {
    pub fn new(manager: Arc<SporkManager>, tick_interval: Duration) -> Self {
        Self { manager, tick_interval }
    }

    pub fn manager(&self) -> &Arc<SporkManager> {
        &self.manager
    }

    pub fn handle_message(&self, inbound: InboundSpork) -> Vec<OutboundSpork> {
        match inbound.message {
            SporkWireMessage::GetSporks => self
                .manager
                .messages()
                .into_iter()
                .map(|message| OutboundSpork::SendTo { peer: inbound.peer, message })
                .collect(),
            SporkWireMessage::Spork(message) => match self.manager.ingest(message.clone()) {
                Ok(IngestOutcome::Accepted { .. }) => {
                    vec![OutboundSpork::Relay { except: Some(inbound.peer), message }]
                }
                Ok(IngestOutcome::Stale) => {
                    debug!("Stale spork {} from peer {}", message.spork_id, inbound.peer);
                    Vec::new()
                }
                Err(e @ SporkError::UnknownSigner(_)) | Err(e @ SporkError::UnknownSpork(_)) => {
                    debug!("Dropping spork message from peer {}: {}", inbound.peer, e);
                    Vec::new()
                }
                Err(e) => {
                    warn!("Dropping spork message from peer {}: {}", inbound.peer, e);
                    Vec::new()
                }
            },
        }
    }

    /// Periodic maintenance. Returns the number of messages dropped.
    pub fn handle_tick(&self) -> usize {
        let removed = self.manager.check_and_remove();
        debug!("Spork tick: {} messages retained", self.manager.messages().len());
        removed
    }

    pub fn handle_broadcast(&self, request: BroadcastRequest) -> Result<Vec<OutboundSpork>, SporkError> {
        let message = self.manager.broadcast(request.spork_id, request.value)?;
        info!("Broadcasting spork {} = {}", request.spork_id, request.value);
        Ok(vec![OutboundSpork::Relay { except: None, message }])
    }

    /// Runs until the inbound channel closes or shutdown fires.
    pub async fn run(
        self,
        mut inbound: mpsc::Receiver<InboundSpork>,
        mut requests: mpsc::Receiver<BroadcastRequest>,
        outbound: mpsc::Sender<OutboundSpork>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            let commands = tokio::select! {
                message = inbound.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => {
                        info!("Spork inbound channel closed, stopping adapter");
                        break;
                    }
                },
                Some(request) = requests.recv() => match self.handle_broadcast(request) {
                    Ok(commands) => commands,
                    Err(e) => {
                        warn!("Cannot broadcast spork {}: {}", request.spork_id, e);
                        Vec::new()
                    }
                },
                _ = ticker.tick() => {
                    self.handle_tick();
                    Vec::new()
                }
                _ = shutdown.recv() => {
                    info!("Spork adapter shutting down");
                    break;
                }
            };

            for command in commands {
                if outbound.send(command).await.is_err() {
                    warn!("Spork outbound channel closed, stopping adapter");
                    return;
                }
            }
        }
    }
}
