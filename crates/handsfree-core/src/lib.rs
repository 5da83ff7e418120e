//! # handsfree-core
//!
//! Call and audio-path coordination for the Hands-Free (HF) side of the
//! Bluetooth Hands-Free and Headset profiles.
//!
//! The crate sits between a Bluetooth profile stack and a host controller. It
//! consumes notifications from the stack (signaling state, AG indicators, AT
//! responses, voice-channel events) and produces a stream of compact binary
//! events for the host, while driving the voice channel and the local audio
//! stream through collaborator traits.
//!
//! ## Components
//!
//! - [`call_state::CallStateTracker`]: forwards call, held and call-setup
//!   indicator changes in a fixed order
//! - [`codec::CodecNegotiator`]: narrowband/wideband decision
//! - [`audio_path::AudioPathCoordinator`]: acceptor-first voice channel state
//!   machine with a race-guard fallback to the initiator role
//! - [`events::EventTranslator`]: stack notifications to outward records
//! - [`volume::map_volume`]: profile to device volume scale
//! - [`link::LinkRegistry`]: per-device state keyed by connection handle
//!
//! [`dispatcher::HandsfreeCore`] ties them together as a synchronous
//! `Notification -> Vec<OutboundEvent>` function. [`service::HandsfreeService`]
//! runs it on tokio with a real timer and an async host transport.
//!
//! ## Quick Start
//!
//! ```rust
//! use handsfree_core::prelude::*;
//! use std::time::Duration;
//!
//! struct Stack(u16);
//!
//! impl VoiceChannel for Stack {
//!     fn create_as_acceptor(&mut self) -> Result<ScoIndex> {
//!         self.0 += 1;
//!         Ok(ScoIndex(self.0))
//!     }
//!     fn accept(&mut self, _index: ScoIndex, _params: &ScoParams) -> Result<()> { Ok(()) }
//!     fn create_as_initiator(&mut self, _addr: DeviceAddress, _params: &ScoParams) -> Result<ScoIndex> {
//!         self.0 += 1;
//!         Ok(ScoIndex(self.0))
//!     }
//!     fn remove(&mut self, _index: ScoIndex) -> Result<()> { Ok(()) }
//! }
//!
//! struct Speaker;
//!
//! impl AudioStream for Speaker {
//!     fn open(&mut self, _h: ConnectionHandle, _c: &StreamConfig) -> Result<()> { Ok(()) }
//!     fn close(&mut self, _h: ConnectionHandle) -> Result<()> { Ok(()) }
//!     fn set_sample_rate(&mut self, _h: ConnectionHandle, _r: u32) -> Result<()> { Ok(()) }
//!     fn set_speaker_level(&mut self, _h: ConnectionHandle, _l: u8) -> Result<()> { Ok(()) }
//!     fn set_mic_gain(&mut self, _h: ConnectionHandle, _l: u8) -> Result<()> { Ok(()) }
//! }
//!
//! struct NoTimer;
//!
//! impl RaceGuardTimer for NoTimer {
//!     fn arm(&mut self, _h: ConnectionHandle, _g: u64, _t: Duration) {}
//!     fn cancel(&mut self, _h: ConnectionHandle) {}
//! }
//!
//! let mut core = HandsfreeCore::new(
//!     HandsfreeConfig::default(),
//!     Box::new(Stack(0)),
//!     Box::new(Speaker),
//!     Box::new(NoTimer),
//! );
//!
//! let handle = ConnectionHandle(0x0040);
//! let events = core.handle(Notification::signaling(
//!     handle,
//!     HfEvent::ConnectionState {
//!         state: ConnectionState::Connected,
//!         address: DeviceAddress([0x00, 0x1b, 0xdc, 0x0f, 0x22, 0x31]),
//!         profile: ProfileKind::HandsFree,
//!     },
//! ));
//! assert_eq!(events.len(), 2);
//!
//! let events = core.handle(Notification::Voice(ScoEvent::Connected { index: ScoIndex(1) }));
//! assert_eq!(events, vec![OutboundEvent::audio_opened(handle)]);
//! ```

pub mod audio_path;
pub mod call_state;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod link;
pub mod logging;
pub mod notification;
pub mod service;
pub mod types;
pub mod volume;

pub use errors::{HandsfreeError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use crate::audio_path::{AudioStream, RaceGuardTimer, StreamConfig, VoiceChannel};
    pub use crate::config::{AudioArbitration, HandsfreeConfig, ScoParams};
    pub use crate::dispatcher::HandsfreeCore;
    pub use crate::errors::{HandsfreeError, Result};
    pub use crate::events::{AtEvent, EventPayload, OutboundEvent};
    pub use crate::link::{AudioPhase, LinkContext};
    pub use crate::notification::{HfEvent, Notification, ScoEvent};
    pub use crate::service::{HandsfreeService, HostTransport};
    pub use crate::types::{
        CallSetupState, CodecId, ConnectionHandle, ConnectionState, DeviceAddress, ProfileKind,
        ScoIndex, VolumeKind,
    };
}
