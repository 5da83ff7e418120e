//! Voice channel lifecycle for each link
//!
//! The local side always waits for the AG to open the voice channel
//! (acceptor first). If a call is active and the channel is still not open a
//! fixed time after the first codec selection, the race guard fires and the
//! local side removes the half-open channel and opens it itself, once per call.
//!
//! ```text
//!              connected                     peer opens
//!   Closed ─────────────────▶ AwaitingAcceptor ──────────▶ Open
//!     ▲                             │   ▲                    │
//!     │                 race guard  │   └────────────────────┘
//!     │                             ▼        channel drops
//!     └──── disconnected ─── AwaitingInitiatorRetry ──▶ Open
//! ```
//!
//! The coordinator talks to three collaborators: the [`VoiceChannel`] layer of
//! the Bluetooth stack, the local [`AudioStream`] and a [`RaceGuardTimer`] that
//! later delivers [`crate::notification::Notification::RaceGuardExpired`].
//! Collaborator failures are logged and never propagated; a failed request
//! leaves the phase where it was.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::call_state::CallTransition;
use crate::codec::CodecNegotiator;
use crate::config::{HandsfreeConfig, ScoParams};
use crate::errors::Result;
use crate::events::OutboundEvent;
use crate::link::{AudioPhase, LinkContext};
use crate::types::{CodecId, ConnectionHandle, DeviceAddress, ScoIndex, VolumeKind};
use crate::volume::map_volume;

/// Voice-channel (SCO/eSCO) requests into the Bluetooth stack
pub trait VoiceChannel: Send {
    /// Register a channel that waits for the peer to connect
    fn create_as_acceptor(&mut self) -> Result<ScoIndex>;

    /// Accept a pending peer connection request
    fn accept(&mut self, index: ScoIndex, params: &ScoParams) -> Result<()>;

    /// Open a channel towards `address`
    fn create_as_initiator(&mut self, address: DeviceAddress, params: &ScoParams) -> Result<ScoIndex>;

    fn remove(&mut self, index: ScoIndex) -> Result<()>;
}

/// Local audio device carrying the voice stream of a link
pub trait AudioStream: Send {
    /// Open and start the stream
    fn open(&mut self, handle: ConnectionHandle, config: &StreamConfig) -> Result<()>;

    /// Stop and close the stream
    fn close(&mut self, handle: ConnectionHandle) -> Result<()>;

    fn set_sample_rate(&mut self, handle: ConnectionHandle, sample_rate: u32) -> Result<()>;

    fn set_speaker_level(&mut self, handle: ConnectionHandle, level: u8) -> Result<()>;

    fn set_mic_gain(&mut self, handle: ConnectionHandle, level: u8) -> Result<()>;
}

/// Single-shot timer per link. Expiry must be delivered back to the core as
/// a `RaceGuardExpired` notification carrying the same handle and generation.
pub trait RaceGuardTimer: Send {
    /// Start the timer, replacing any running one for `handle`
    fn arm(&mut self, handle: ConnectionHandle, generation: u64, timeout: Duration);

    fn cancel(&mut self, handle: ConnectionHandle);
}

/// Parameters used to start the local audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    /// Device-scale speaker level
    pub speaker_level: u8,
    /// Device-scale microphone gain
    pub mic_gain: u8,
}

/// Drives [`AudioPhase`] transitions for every link
pub struct AudioPathCoordinator {
    config: Arc<HandsfreeConfig>,
    voice: Box<dyn VoiceChannel>,
    audio: Box<dyn AudioStream>,
    timer: Box<dyn RaceGuardTimer>,
    /// Last race guard generation handed out, across all links
    generation: u64,
}

impl AudioPathCoordinator {
    pub fn new(
        config: Arc<HandsfreeConfig>,
        voice: Box<dyn VoiceChannel>,
        audio: Box<dyn AudioStream>,
        timer: Box<dyn RaceGuardTimer>,
    ) -> Self {
        Self {
            config,
            voice,
            audio,
            timer,
            generation: 0,
        }
    }

    /// Signaling reached "connected": wait for the peer to open the channel
    pub fn on_link_connected(&mut self, link: &mut LinkContext) {
        link.race_guard_primed = true;
        if link.audio_path.phase != AudioPhase::Closed {
            debug!(handle = %link.handle, phase = ?link.audio_path.phase, "Voice channel already set up");
            return;
        }
        self.request_acceptor(link);
    }

    /// Signaling reached "disconnected": tear down and reset the link
    pub fn on_link_disconnected(&mut self, link: &mut LinkContext) {
        self.disarm_race_guard(link);
        if link.audio_path.is_open() {
            if let Err(e) = self.audio.close(link.handle) {
                warn!(handle = %link.handle, "Failed to close audio stream: {}", e);
            }
        }
        if let Some(index) = link.audio_path.index {
            if let Err(e) = self.voice.remove(index) {
                warn!(handle = %link.handle, index = index.0, "Failed to remove voice channel: {}", e);
            }
        }
        link.reset(&self.config);
    }

    pub fn on_codec_selected(&mut self, link: &mut LinkContext, codec: CodecId) {
        link.audio_path.use_wideband = CodecNegotiator::on_codec_selected(codec);
        info!(handle = %link.handle, ?codec, "Codec selected");

        if link.audio_path.is_open() {
            let rate = CodecNegotiator::sample_rate(link.audio_path.use_wideband);
            if let Err(e) = self.audio.set_sample_rate(link.handle, rate) {
                warn!(handle = %link.handle, rate, "Failed to reconfigure audio stream: {}", e);
            }
        }

        if link.race_guard_primed {
            link.race_guard_primed = false;
            if link.audio_path.phase == AudioPhase::AwaitingAcceptor {
                self.arm_race_guard(link);
            }
        }
    }

    /// Follow-up to a call indicator change
    pub fn on_call_update(&mut self, link: &mut LinkContext, transition: Option<CallTransition>) {
        if !link.call_active {
            self.disarm_race_guard(link);
        }
        // After an initiator attempt only a reconnect primes the guard again
        if transition == Some(CallTransition::Terminated)
            && link.audio_path.phase != AudioPhase::AwaitingInitiatorRetry
        {
            link.race_guard_primed = true;
        }
    }

    /// The race guard expired. `audio_busy_elsewhere` is set when the
    /// arbitration policy forbids opening a channel on this link right now.
    pub fn on_race_guard_expired(&mut self, link: &mut LinkContext, generation: u64, audio_busy_elsewhere: bool) {
        if !link.pending_race_guard || link.race_guard_generation != generation {
            debug!(
                handle = %link.handle,
                generation,
                current = link.race_guard_generation,
                "Stale race guard expiry ignored"
            );
            return;
        }
        link.pending_race_guard = false;

        if link.audio_path.is_open() || !link.call_active {
            debug!(
                handle = %link.handle,
                phase = ?link.audio_path.phase,
                call_active = link.call_active,
                "Race guard expired with nothing to do"
            );
            return;
        }
        if audio_busy_elsewhere {
            info!(handle = %link.handle, "Race guard fallback declined, audio open on another link");
            return;
        }

        info!(handle = %link.handle, "Peer did not open the voice channel, connecting as initiator");
        if let Some(index) = link.audio_path.index.take() {
            if let Err(e) = self.voice.remove(index) {
                warn!(handle = %link.handle, index = index.0, "Failed to remove voice channel: {}", e);
            }
        }
        let params = self.sco_params(link);
        match self.voice.create_as_initiator(link.remote_address, &params) {
            Ok(index) => link.audio_path.index = Some(index),
            Err(e) => warn!(handle = %link.handle, "Failed to create voice channel as initiator: {}", e),
        }
        link.audio_path.phase = AudioPhase::AwaitingInitiatorRetry;
    }

    /// The peer wants to open the voice channel
    pub fn on_connection_requested(&mut self, link: &mut LinkContext, index: ScoIndex, audio_busy_elsewhere: bool) {
        self.disarm_race_guard(link);
        if link.audio_path.phase != AudioPhase::AwaitingAcceptor {
            debug!(
                handle = %link.handle,
                index = index.0,
                phase = ?link.audio_path.phase,
                "Ignoring voice channel request"
            );
            return;
        }
        if audio_busy_elsewhere {
            info!(handle = %link.handle, index = index.0, "Declining voice channel, audio open on another link");
            return;
        }
        let params = self.sco_params(link);
        match self.voice.accept(index, &params) {
            Ok(()) => debug!(handle = %link.handle, index = index.0, "Accepted voice channel request"),
            Err(e) => warn!(handle = %link.handle, index = index.0, "Failed to accept voice channel: {}", e),
        }
    }

    /// The stack confirmed the voice channel is up
    pub fn on_channel_connected(&mut self, link: &mut LinkContext, index: ScoIndex) -> Option<OutboundEvent> {
        if link.audio_path.is_open() {
            debug!(handle = %link.handle, index = index.0, "Voice channel already open");
            return None;
        }
        self.disarm_race_guard(link);
        link.audio_path.index = Some(index);
        link.audio_path.phase = AudioPhase::Open;

        let stream = self.stream_config(link);
        info!(
            handle = %link.handle,
            index = index.0,
            sample_rate = stream.sample_rate,
            "Voice channel open"
        );
        if let Err(e) = self.audio.open(link.handle, &stream) {
            warn!(handle = %link.handle, "Failed to start audio stream: {}", e);
        }
        Some(OutboundEvent::audio_opened(link.handle))
    }

    /// The voice channel went down; go back to waiting for the peer
    pub fn on_channel_disconnected(&mut self, link: &mut LinkContext, index: ScoIndex) -> Option<OutboundEvent> {
        if !link.audio_path.is_open() {
            debug!(
                handle = %link.handle,
                index = index.0,
                phase = ?link.audio_path.phase,
                "Voice channel disconnect outside open phase"
            );
            return None;
        }
        info!(handle = %link.handle, index = index.0, "Voice channel closed");
        if let Err(e) = self.audio.close(link.handle) {
            warn!(handle = %link.handle, "Failed to close audio stream: {}", e);
        }
        link.audio_path.index = None;
        link.audio_path.phase = AudioPhase::Closed;
        self.request_acceptor(link);
        Some(OutboundEvent::audio_closed(link.handle))
    }

    /// Store a reported profile-scale level and apply it to an open stream
    pub fn on_volume(&mut self, link: &mut LinkContext, kind: VolumeKind, level: u8) {
        let device_level = map_volume(level, self.config.hf_volume_max, self.config.device_volume_max);
        let result = match kind {
            VolumeKind::Speaker => {
                link.speaker_volume = level;
                if !link.audio_path.is_open() {
                    return;
                }
                self.audio.set_speaker_level(link.handle, device_level)
            }
            VolumeKind::Microphone => {
                link.mic_volume = level;
                if !link.audio_path.is_open() {
                    return;
                }
                self.audio.set_mic_gain(link.handle, device_level)
            }
        };
        if let Err(e) = result {
            warn!(handle = %link.handle, ?kind, device_level, "Failed to apply volume: {}", e);
        }
    }

    fn request_acceptor(&mut self, link: &mut LinkContext) {
        match self.voice.create_as_acceptor() {
            Ok(index) => {
                debug!(handle = %link.handle, index = index.0, "Waiting for peer to open voice channel");
                link.audio_path.index = Some(index);
                link.audio_path.phase = AudioPhase::AwaitingAcceptor;
            }
            Err(e) => {
                warn!(handle = %link.handle, "Failed to create voice channel as acceptor: {}", e);
            }
        }
    }

    fn arm_race_guard(&mut self, link: &mut LinkContext) {
        if link.pending_race_guard {
            self.timer.cancel(link.handle);
        }
        self.generation += 1;
        link.pending_race_guard = true;
        link.race_guard_generation = self.generation;
        let timeout = self.config.race_guard_timeout;
        debug!(
            handle = %link.handle,
            generation = self.generation,
            timeout_ms = timeout.as_millis() as u64,
            "Race guard armed"
        );
        self.timer.arm(link.handle, self.generation, timeout);
    }

    fn disarm_race_guard(&mut self, link: &mut LinkContext) {
        if link.pending_race_guard {
            link.pending_race_guard = false;
            self.timer.cancel(link.handle);
            debug!(handle = %link.handle, "Race guard disarmed");
        }
    }

    /// Profile parameters narrowed to the link's negotiated codec
    fn sco_params(&self, link: &LinkContext) -> ScoParams {
        let mut params = self.config.sco_params(link.profile_kind).clone();
        params.use_wideband &= link.audio_path.use_wideband;
        params
    }

    fn stream_config(&self, link: &LinkContext) -> StreamConfig {
        let hf_max = self.config.hf_volume_max;
        let device_max = self.config.device_volume_max;
        StreamConfig {
            sample_rate: CodecNegotiator::sample_rate(link.audio_path.use_wideband),
            channels: 1,
            bits_per_sample: 16,
            speaker_level: map_volume(link.speaker_volume, hf_max, device_max),
            mic_gain: map_volume(link.mic_volume, hf_max, device_max),
        }
    }
}
