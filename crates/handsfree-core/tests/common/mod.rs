#![allow(dead_code)]

//! Recording collaborators shared by the integration tests

use handsfree_core::prelude::*;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Everything the core asked its collaborators to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCall {
    CreateAcceptor(ScoIndex),
    Accept { index: ScoIndex, max_latency_ms: u16, use_wideband: bool },
    CreateInitiator { address: DeviceAddress, index: ScoIndex, use_wideband: bool },
    Remove(ScoIndex),
    OpenStream(ConnectionHandle, StreamConfig),
    CloseStream(ConnectionHandle),
    SampleRate(ConnectionHandle, u32),
    SpeakerLevel(ConnectionHandle, u8),
    MicGain(ConnectionHandle, u8),
    ArmTimer(ConnectionHandle, Duration),
    CancelTimer(ConnectionHandle),
}

#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<StackCall>>>,
    next_index: Arc<Mutex<u16>>,
    failing: Arc<Mutex<HashSet<&'static str>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<StackCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    pub fn snapshot(&self) -> Vec<StackCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&StackCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// Make every later call of `operation` fail
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().insert(operation);
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.failing.lock().contains(operation) {
            return Err(HandsfreeError::voice_channel(operation, "injected failure"));
        }
        Ok(())
    }

    fn check_audio(&self, operation: &'static str) -> Result<()> {
        if self.failing.lock().contains(operation) {
            return Err(HandsfreeError::audio_stream(operation, "injected failure"));
        }
        Ok(())
    }

    fn record(&self, call: StackCall) {
        self.calls.lock().push(call);
    }

    fn allocate(&self) -> ScoIndex {
        let mut next = self.next_index.lock();
        *next += 1;
        ScoIndex(*next)
    }
}

pub struct RecordingVoiceChannel(pub CallLog);

impl VoiceChannel for RecordingVoiceChannel {
    fn create_as_acceptor(&mut self) -> Result<ScoIndex> {
        self.0.check("create_as_acceptor")?;
        let index = self.0.allocate();
        self.0.record(StackCall::CreateAcceptor(index));
        Ok(index)
    }

    fn accept(&mut self, index: ScoIndex, params: &ScoParams) -> Result<()> {
        self.0.check("accept")?;
        self.0.record(StackCall::Accept {
            index,
            max_latency_ms: params.max_latency_ms,
            use_wideband: params.use_wideband,
        });
        Ok(())
    }

    fn create_as_initiator(&mut self, address: DeviceAddress, params: &ScoParams) -> Result<ScoIndex> {
        self.0.check("create_as_initiator")?;
        let index = self.0.allocate();
        self.0.record(StackCall::CreateInitiator {
            address,
            index,
            use_wideband: params.use_wideband,
        });
        Ok(index)
    }

    fn remove(&mut self, index: ScoIndex) -> Result<()> {
        self.0.check("remove")?;
        self.0.record(StackCall::Remove(index));
        Ok(())
    }
}

pub struct RecordingAudioStream(pub CallLog);

impl AudioStream for RecordingAudioStream {
    fn open(&mut self, handle: ConnectionHandle, config: &StreamConfig) -> Result<()> {
        self.0.check_audio("open")?;
        self.0.record(StackCall::OpenStream(handle, *config));
        Ok(())
    }

    fn close(&mut self, handle: ConnectionHandle) -> Result<()> {
        self.0.check_audio("close")?;
        self.0.record(StackCall::CloseStream(handle));
        Ok(())
    }

    fn set_sample_rate(&mut self, handle: ConnectionHandle, sample_rate: u32) -> Result<()> {
        self.0.record(StackCall::SampleRate(handle, sample_rate));
        Ok(())
    }

    fn set_speaker_level(&mut self, handle: ConnectionHandle, level: u8) -> Result<()> {
        self.0.record(StackCall::SpeakerLevel(handle, level));
        Ok(())
    }

    fn set_mic_gain(&mut self, handle: ConnectionHandle, level: u8) -> Result<()> {
        self.0.record(StackCall::MicGain(handle, level));
        Ok(())
    }
}

pub struct RecordingTimer(pub CallLog);

impl RaceGuardTimer for RecordingTimer {
    fn arm(&mut self, handle: ConnectionHandle, _generation: u64, timeout: Duration) {
        self.0.record(StackCall::ArmTimer(handle, timeout));
    }

    fn cancel(&mut self, handle: ConnectionHandle) {
        self.0.record(StackCall::CancelTimer(handle));
    }
}

/// A core wired to recording collaborators
pub struct Harness {
    pub core: HandsfreeCore,
    pub log: CallLog,
}

impl Harness {
    pub fn new(config: HandsfreeConfig) -> Self {
        let log = CallLog::new();
        let core = HandsfreeCore::new(
            config,
            Box::new(RecordingVoiceChannel(log.clone())),
            Box::new(RecordingAudioStream(log.clone())),
            Box::new(RecordingTimer(log.clone())),
        );
        Self { core, log }
    }

    pub fn connect(&mut self, handle: ConnectionHandle, profile: ProfileKind) -> Vec<OutboundEvent> {
        self.signal(
            handle,
            HfEvent::ConnectionState {
                state: ConnectionState::Connected,
                address: peer_address(),
                profile,
            },
        )
    }

    /// Connect, bring up the SLC and announce AG features
    pub fn connect_slc(&mut self, handle: ConnectionHandle, ag_features: u32) -> Vec<OutboundEvent> {
        let mut events = self.connect(handle, ProfileKind::HandsFree);
        events.extend(self.signal(
            handle,
            HfEvent::ConnectionState {
                state: ConnectionState::SlcConnected,
                address: peer_address(),
                profile: ProfileKind::HandsFree,
            },
        ));
        events.extend(self.signal(handle, HfEvent::AgFeatures(ag_features)));
        events
    }

    pub fn disconnect(&mut self, handle: ConnectionHandle) -> Vec<OutboundEvent> {
        self.signal(
            handle,
            HfEvent::ConnectionState {
                state: ConnectionState::Disconnected,
                address: peer_address(),
                profile: ProfileKind::HandsFree,
            },
        )
    }

    pub fn signal(&mut self, handle: ConnectionHandle, event: HfEvent) -> Vec<OutboundEvent> {
        self.core.handle(Notification::signaling(handle, event))
    }

    pub fn indicators(
        &mut self,
        handle: ConnectionHandle,
        active: bool,
        held: bool,
        setup: CallSetupState,
    ) -> Vec<OutboundEvent> {
        self.signal(handle, HfEvent::CallIndicators { active, held, setup })
    }

    pub fn voice(&mut self, event: ScoEvent) -> Vec<OutboundEvent> {
        self.core.handle(Notification::Voice(event))
    }

    /// Deliver the expiry of the most recently armed guard
    pub fn expire(&mut self, handle: ConnectionHandle) -> Vec<OutboundEvent> {
        let generation = self.generation(handle);
        self.expire_generation(handle, generation)
    }

    pub fn expire_generation(&mut self, handle: ConnectionHandle, generation: u64) -> Vec<OutboundEvent> {
        self.core.handle(Notification::RaceGuardExpired { handle, generation })
    }

    pub fn generation(&self, handle: ConnectionHandle) -> u64 {
        self.core.link(handle).map_or(0, |l| l.race_guard_generation)
    }

    pub fn phase(&self, handle: ConnectionHandle) -> Option<AudioPhase> {
        self.core.link(handle).map(|l| l.audio_path.phase)
    }
}

pub fn peer_address() -> DeviceAddress {
    DeviceAddress([0x00, 0x1b, 0xdc, 0x0f, 0x22, 0x31])
}
