//! Inbound notifications from the profile stack, the voice-channel layer and
//! the race-guard timer

use serde::{Deserialize, Serialize};

use crate::types::{
    CallListEntry, CallSetupState, CodecId, ConnectionHandle, ConnectionState, DeviceAddress,
    ProfileKind, ScoIndex, VolumeKind,
};

/// Profile/call-signaling notification for one link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HfEvent {
    ConnectionState {
        state: ConnectionState,
        address: DeviceAddress,
        profile: ProfileKind,
    },
    AgFeatures(u32),
    ServiceState(u8),
    /// Home (0) or roaming (1) network
    ServiceType(u8),
    Signal(u8),
    Battery(u8),
    CallIndicators {
        active: bool,
        held: bool,
        setup: CallSetupState,
    },
    Ring,
    InbandRing(bool),
    Ok,
    Error,
    CmeError(u16),
    /// +CLIP calling line identification
    CallerId { number: String, number_type: u16 },
    /// +BINP number attached to a voice tag
    VoiceTagNumber { number: String, number_type: u16 },
    /// +COPS network operator name
    OperatorName(String),
    /// +CNUM subscriber number record
    SubscriberNumber(String),
    /// +CLCC current-calls entry
    CallListEntry(CallListEntry),
    /// +BIND HF indicator status
    HfIndicator { id: u8, value: u8 },
    Volume { kind: VolumeKind, level: u8 },
    CodecSelected(CodecId),
    /// Stack event this core does not know about
    Unknown(u16),
}

/// Voice-channel notification, tagged only with the channel index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoEvent {
    Connected { index: ScoIndex },
    Disconnected { index: ScoIndex },
    ConnectionRequested { index: ScoIndex },
    ParametersChanged { index: ScoIndex },
}

impl ScoEvent {
    pub fn index(&self) -> ScoIndex {
        match *self {
            Self::Connected { index }
            | Self::Disconnected { index }
            | Self::ConnectionRequested { index }
            | Self::ParametersChanged { index } => index,
        }
    }
}

/// Everything the dispatcher consumes, in delivery order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    Signaling {
        handle: ConnectionHandle,
        event: HfEvent,
    },
    Voice(ScoEvent),
    /// Timer expiry for the race guard armed as `generation`
    RaceGuardExpired {
        handle: ConnectionHandle,
        generation: u64,
    },
}

impl Notification {
    pub fn signaling(handle: ConnectionHandle, event: HfEvent) -> Self {
        Self::Signaling { handle, event }
    }
}
