//! HandsfreeService on a paused tokio clock

mod common;

use async_trait::async_trait;
use common::{peer_address, CallLog, RecordingAudioStream, RecordingVoiceChannel, StackCall};
use handsfree_core::events::EVENT_AUDIO_OPENED;
use handsfree_core::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const HANDLE: ConnectionHandle = ConnectionHandle(0x0010);

struct ChannelTransport {
    tx: mpsc::UnboundedSender<OutboundEvent>,
    failures_left: Mutex<usize>,
}

#[async_trait]
impl HostTransport for ChannelTransport {
    async fn send(&self, event: OutboundEvent) -> Result<()> {
        {
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err(HandsfreeError::transport("host link down"));
            }
        }
        self.tx
            .send(event)
            .map_err(|_| HandsfreeError::transport("receiver dropped"))
    }
}

async fn start(
    config: HandsfreeConfig,
    failures: usize,
) -> (
    HandsfreeService,
    tokio::task::JoinHandle<()>,
    CallLog,
    mpsc::UnboundedReceiver<OutboundEvent>,
) {
    let log = CallLog::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let transport = Arc::new(ChannelTransport {
        tx,
        failures_left: Mutex::new(failures),
    });
    let (service, task) = HandsfreeService::start(
        config,
        Box::new(RecordingVoiceChannel(log.clone())),
        Box::new(RecordingAudioStream(log.clone())),
        transport,
    )
    .await
    .expect("service starts");
    (service, task, log, rx)
}

async fn submit_all(service: &HandsfreeService, events: Vec<HfEvent>) {
    for event in events {
        service
            .submit(Notification::signaling(HANDLE, event))
            .await
            .expect("loop running");
    }
}

fn connected() -> HfEvent {
    HfEvent::ConnectionState {
        state: ConnectionState::Connected,
        address: peer_address(),
        profile: ProfileKind::HandsFree,
    }
}

fn slc_connected() -> HfEvent {
    HfEvent::ConnectionState {
        state: ConnectionState::SlcConnected,
        address: peer_address(),
        profile: ProfileKind::HandsFree,
    }
}

#[tokio::test(start_paused = true)]
async fn test_race_guard_fallback_after_timeout() {
    let (service, task, log, _rx) = start(HandsfreeConfig::default(), 0).await;

    submit_all(
        &service,
        vec![
            connected(),
            slc_connected(),
            HfEvent::CodecSelected(CodecId::Cvsd),
            HfEvent::CallIndicators { active: true, held: false, setup: CallSetupState::Idle },
        ],
    )
    .await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(log.count(|c| matches!(c, StackCall::CreateInitiator { .. })), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    service.shutdown().await.expect("loop running");
    task.await.expect("loop exits cleanly");

    assert_eq!(log.count(|c| matches!(c, StackCall::CreateInitiator { .. })), 1);
    assert!(log.snapshot().contains(&StackCall::Remove(ScoIndex(1))));
}

#[tokio::test(start_paused = true)]
async fn test_open_channel_cancels_timer() {
    let (service, task, log, mut rx) = start(HandsfreeConfig::default(), 0).await;

    submit_all(
        &service,
        vec![
            connected(),
            HfEvent::CodecSelected(CodecId::Msbc),
            HfEvent::CallIndicators { active: true, held: false, setup: CallSetupState::Idle },
        ],
    )
    .await;
    service
        .submit(Notification::Voice(ScoEvent::Connected { index: ScoIndex(1) }))
        .await
        .expect("loop running");

    let mut opened = false;
    while let Some(event) = rx.recv().await {
        if event.opcode == EVENT_AUDIO_OPENED {
            opened = true;
            break;
        }
    }
    assert!(opened);
    assert_eq!(service.timer().armed_count(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    service.shutdown().await.expect("loop running");
    task.await.expect("loop exits cleanly");
    assert_eq!(log.count(|c| matches!(c, StackCall::CreateInitiator { .. })), 0);
}

#[tokio::test]
async fn test_events_forwarded_in_order() {
    let (service, task, _log, mut rx) = start(HandsfreeConfig::default(), 0).await;

    submit_all(
        &service,
        vec![
            connected(),
            HfEvent::CallIndicators { active: true, held: false, setup: CallSetupState::Incoming },
        ],
    )
    .await;
    service.shutdown().await.expect("loop running");
    task.await.expect("loop exits cleanly");

    let mut received = Vec::new();
    while let Ok(event) = rx.try_recv() {
        received.push(event);
    }
    assert_eq!(received.len(), 4);
    assert_eq!(received[0], OutboundEvent::link_opened(HANDLE, peer_address(), 0));
    assert_eq!(received[1], OutboundEvent::profile_selected(HANDLE, ProfileKind::HandsFree));
    assert_eq!(received[2].text().as_deref(), Some("2,1"));
    assert_eq!(received[3].text().as_deref(), Some("3,1"));
}

#[tokio::test]
async fn test_transport_failure_does_not_stop_loop() {
    let (service, task, _log, mut rx) = start(HandsfreeConfig::default(), 1).await;

    submit_all(&service, vec![connected(), HfEvent::Ring]).await;
    service.shutdown().await.expect("loop running");
    task.await.expect("loop exits cleanly");

    let mut received = Vec::new();
    while let Ok(event) = rx.try_recv() {
        received.push(event);
    }
    // The link-opened event was lost; the rest arrived
    assert_eq!(received.len(), 2);
    assert_eq!(received[1].opcode, AtEvent::Ring.opcode());
}

#[tokio::test]
async fn test_submit_after_shutdown_fails() {
    let (service, task, _log, _rx) = start(HandsfreeConfig::default(), 0).await;
    service.shutdown().await.expect("loop running");
    task.await.expect("loop exits cleanly");

    let result = service.submit(Notification::signaling(HANDLE, HfEvent::Ring)).await;
    assert!(matches!(result, Err(HandsfreeError::ChannelClosed)));
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let log = CallLog::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    let transport = Arc::new(ChannelTransport {
        tx,
        failures_left: Mutex::new(0),
    });
    let config = HandsfreeConfig::default().with_race_guard_timeout(Duration::ZERO);
    let result = HandsfreeService::start(
        config,
        Box::new(RecordingVoiceChannel(log.clone())),
        Box::new(RecordingAudioStream(log)),
        transport,
    )
    .await;
    assert!(matches!(result, Err(HandsfreeError::Configuration { .. })));
}
