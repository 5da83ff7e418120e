//! Tokio runtime wrapper around [`HandsfreeCore`]
//!
//! [`HandsfreeService::start`] spawns one task that owns the core and drains a
//! bounded channel of notifications, so notifications are processed strictly
//! one at a time in arrival order. Outbound events are forwarded to a
//! [`HostTransport`]. The race guard is backed by [`TokioRaceGuardTimer`],
//! which feeds its expiry back into the same channel. An expiry already queued
//! when its timer is cancelled is recognised by its generation and dropped.
//!
//! ```rust,no_run
//! use handsfree_core::prelude::*;
//! # async fn run(
//! #     voice: Box<dyn VoiceChannel>,
//! #     audio: Box<dyn AudioStream>,
//! #     transport: std::sync::Arc<dyn HostTransport>,
//! # ) -> handsfree_core::Result<()> {
//! let (service, task) = HandsfreeService::start(HandsfreeConfig::default(), voice, audio, transport).await?;
//! service
//!     .submit(Notification::signaling(ConnectionHandle(1), HfEvent::Ring))
//!     .await?;
//! service.shutdown().await?;
//! task.await.ok();
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio_path::{AudioStream, RaceGuardTimer, VoiceChannel};
use crate::config::HandsfreeConfig;
use crate::dispatcher::HandsfreeCore;
use crate::errors::{HandsfreeError, Result};
use crate::events::OutboundEvent;
use crate::notification::Notification;
use crate::types::ConnectionHandle;

/// Pending notifications before `submit` starts waiting
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Delivery of outbound events to the host controller
#[async_trait]
pub trait HostTransport: Send + Sync {
    async fn send(&self, event: OutboundEvent) -> Result<()>;
}

#[derive(Debug)]
enum Command {
    Notify(Notification),
    Shutdown,
}

/// Race guard timer running one sleeping task per armed link
#[derive(Clone)]
pub struct TokioRaceGuardTimer {
    tasks: Arc<Mutex<HashMap<ConnectionHandle, JoinHandle<()>>>>,
    tx: mpsc::Sender<Command>,
}

impl TokioRaceGuardTimer {
    fn new(tx: mpsc::Sender<Command>) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            tx,
        }
    }

    /// Number of links with a running timer task
    pub fn armed_count(&self) -> usize {
        self.tasks.lock().values().filter(|task| !task.is_finished()).count()
    }

    fn cancel_all(&self) {
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }
}

impl RaceGuardTimer for TokioRaceGuardTimer {
    fn arm(&mut self, handle: ConnectionHandle, generation: u64, timeout: Duration) {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            debug!(handle = %handle, generation, "Race guard timer fired");
            let expired = Notification::RaceGuardExpired { handle, generation };
            if tx.send(Command::Notify(expired)).await.is_err() {
                debug!(handle = %handle, "Event loop gone, dropping race guard expiry");
            }
        });
        if let Some(previous) = self.tasks.lock().insert(handle, task) {
            previous.abort();
        }
    }

    fn cancel(&mut self, handle: ConnectionHandle) {
        if let Some(task) = self.tasks.lock().remove(&handle) {
            task.abort();
        }
    }
}

/// Handle to a running hands-free event loop
#[derive(Clone)]
pub struct HandsfreeService {
    tx: mpsc::Sender<Command>,
    timer: TokioRaceGuardTimer,
}

impl HandsfreeService {
    /// Validate `config` and spawn the event loop. Must be called from within
    /// a tokio runtime.
    pub async fn start(
        config: HandsfreeConfig,
        voice: Box<dyn VoiceChannel>,
        audio: Box<dyn AudioStream>,
        transport: Arc<dyn HostTransport>,
    ) -> Result<(Self, JoinHandle<()>)> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let timer = TokioRaceGuardTimer::new(tx.clone());
        let core = HandsfreeCore::new(config, voice, audio, Box::new(timer.clone()));

        let task = tokio::spawn(run_event_loop(core, rx, transport, timer.clone()));
        info!("Hands-free service started");
        Ok((Self { tx, timer }, task))
    }

    /// Queue a notification for processing
    pub async fn submit(&self, notification: Notification) -> Result<()> {
        self.tx
            .send(Command::Notify(notification))
            .await
            .map_err(|_| HandsfreeError::ChannelClosed)
    }

    /// Stop the event loop after the notifications already queued
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| HandsfreeError::ChannelClosed)
    }

    pub fn timer(&self) -> &TokioRaceGuardTimer {
        &self.timer
    }
}

async fn run_event_loop(
    mut core: HandsfreeCore,
    mut rx: mpsc::Receiver<Command>,
    transport: Arc<dyn HostTransport>,
    timer: TokioRaceGuardTimer,
) {
    info!("Starting hands-free event loop");

    while let Some(command) = rx.recv().await {
        let notification = match command {
            Command::Notify(notification) => notification,
            Command::Shutdown => break,
        };
        for event in core.handle(notification) {
            let opcode = event.opcode;
            if let Err(e) = transport.send(event).await {
                warn!(opcode = format_args!("0x{:04x}", opcode), "Failed to deliver event: {}", e);
            }
        }
    }

    timer.cancel_all();
    let remaining = core.links().count();
    if remaining > 0 {
        warn!(remaining, "Event loop stopped with links still registered");
    }
    info!("Hands-free event loop ended");
}
