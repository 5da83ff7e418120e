//! Call Lifecycle Example
//!
//! Drives a `HandsfreeService` through one incoming call against simulated
//! stack and audio collaborators, printing every event that would go to the
//! host controller. The simulated AG never opens the voice channel, so the
//! race guard fires and the hands-free side connects as initiator.
//!
//! Run with: cargo run --example call_lifecycle
//! Set HANDSFREE_LOG_LEVEL=debug to watch every state transition.

use async_trait::async_trait;
use handsfree_core::config::ag_features;
use handsfree_core::logging::{setup_logging, LoggingConfig};
use handsfree_core::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const HANDLE: ConnectionHandle = ConnectionHandle(0x0040);

struct SimulatedStack {
    next_index: u16,
}

impl VoiceChannel for SimulatedStack {
    fn create_as_acceptor(&mut self) -> Result<ScoIndex> {
        self.next_index += 1;
        info!("stack: acceptor registered on index {}", self.next_index);
        Ok(ScoIndex(self.next_index))
    }

    fn accept(&mut self, index: ScoIndex, params: &ScoParams) -> Result<()> {
        info!("stack: accepting index {} ({} ms)", index.0, params.max_latency_ms);
        Ok(())
    }

    fn create_as_initiator(&mut self, address: DeviceAddress, params: &ScoParams) -> Result<ScoIndex> {
        self.next_index += 1;
        info!(
            "stack: connecting to {} on index {} ({} ms)",
            address, self.next_index, params.max_latency_ms
        );
        Ok(ScoIndex(self.next_index))
    }

    fn remove(&mut self, index: ScoIndex) -> Result<()> {
        info!("stack: removed index {}", index.0);
        Ok(())
    }
}

struct SimulatedAudio;

impl AudioStream for SimulatedAudio {
    fn open(&mut self, handle: ConnectionHandle, config: &StreamConfig) -> Result<()> {
        info!(
            "audio: {} streaming at {} Hz, speaker {}, mic {}",
            handle, config.sample_rate, config.speaker_level, config.mic_gain
        );
        Ok(())
    }

    fn close(&mut self, handle: ConnectionHandle) -> Result<()> {
        info!("audio: {} closed", handle);
        Ok(())
    }

    fn set_sample_rate(&mut self, _handle: ConnectionHandle, sample_rate: u32) -> Result<()> {
        info!("audio: sample rate {} Hz", sample_rate);
        Ok(())
    }

    fn set_speaker_level(&mut self, _handle: ConnectionHandle, level: u8) -> Result<()> {
        info!("audio: speaker level {}", level);
        Ok(())
    }

    fn set_mic_gain(&mut self, _handle: ConnectionHandle, level: u8) -> Result<()> {
        info!("audio: mic gain {}", level);
        Ok(())
    }
}

struct PrintingTransport;

#[async_trait]
impl HostTransport for PrintingTransport {
    async fn send(&self, event: OutboundEvent) -> Result<()> {
        println!("📤 {}  {:02x?}", event, event.encode().as_ref());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    setup_logging(LoggingConfig::from_env("call_lifecycle")?)?;

    println!("📞 Hands-Free Call Lifecycle Example");
    println!("====================================\n");

    let config = HandsfreeConfig::default().with_race_guard_timeout(Duration::from_millis(300));
    let (service, task) = HandsfreeService::start(
        config,
        Box::new(SimulatedStack { next_index: 0 }),
        Box::new(SimulatedAudio),
        Arc::new(PrintingTransport),
    )
    .await?;

    let address = DeviceAddress([0x00, 0x1b, 0xdc, 0x0f, 0x22, 0x31]);
    let signaling = [
        HfEvent::ConnectionState {
            state: ConnectionState::Connected,
            address,
            profile: ProfileKind::HandsFree,
        },
        HfEvent::ConnectionState {
            state: ConnectionState::SlcConnected,
            address,
            profile: ProfileKind::HandsFree,
        },
        HfEvent::AgFeatures(ag_features::CODEC_NEGOTIATION | ag_features::INBAND_RING_TONE),
        HfEvent::CodecSelected(CodecId::Msbc),
        HfEvent::CallIndicators { active: false, held: false, setup: CallSetupState::Incoming },
        HfEvent::Ring,
        HfEvent::CallerId { number: "+15550100".to_string(), number_type: 145 },
        HfEvent::CallIndicators { active: true, held: false, setup: CallSetupState::Idle },
    ];
    for event in signaling {
        service.submit(Notification::signaling(HANDLE, event)).await?;
    }

    // The AG stays silent; wait for the race guard
    tokio::time::sleep(Duration::from_millis(500)).await;

    // The initiator attempt got index 2
    service
        .submit(Notification::Voice(ScoEvent::Connected { index: ScoIndex(2) }))
        .await?;
    service
        .submit(Notification::signaling(
            HANDLE,
            HfEvent::Volume { kind: VolumeKind::Speaker, level: 12 },
        ))
        .await?;
    service
        .submit(Notification::signaling(
            HANDLE,
            HfEvent::CallIndicators { active: false, held: false, setup: CallSetupState::Idle },
        ))
        .await?;
    service
        .submit(Notification::signaling(
            HANDLE,
            HfEvent::ConnectionState {
                state: ConnectionState::Disconnected,
                address,
                profile: ProfileKind::HandsFree,
            },
        ))
        .await?;

    service.shutdown().await?;
    task.await?;

    println!("\n✅ Call lifecycle complete");
    Ok(())
}
