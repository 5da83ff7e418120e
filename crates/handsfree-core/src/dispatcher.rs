//! Single-threaded notification dispatcher
//!
//! [`HandsfreeCore`] owns the link registry and the audio path coordinator.
//! Every notification is processed to completion before the next one; the
//! returned events are the only observable output. Notifications for links the
//! registry does not know are dropped.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audio_path::{AudioPathCoordinator, AudioStream, RaceGuardTimer, VoiceChannel};
use crate::call_state::CallStateTracker;
use crate::codec::CodecNegotiator;
use crate::config::{ag_features, AudioArbitration, HandsfreeConfig};
use crate::events::{EventTranslator, OutboundEvent, STATUS_SUCCESS};
use crate::link::{LinkContext, LinkRegistry};
use crate::notification::{HfEvent, Notification, ScoEvent};
use crate::types::{ConnectionHandle, ConnectionState, DeviceAddress, ProfileKind};

pub struct HandsfreeCore {
    config: Arc<HandsfreeConfig>,
    registry: LinkRegistry,
    audio_path: AudioPathCoordinator,
}

impl HandsfreeCore {
    pub fn new(
        config: HandsfreeConfig,
        voice: Box<dyn VoiceChannel>,
        audio: Box<dyn AudioStream>,
        timer: Box<dyn RaceGuardTimer>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            audio_path: AudioPathCoordinator::new(config.clone(), voice, audio, timer),
            registry: LinkRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &HandsfreeConfig {
        &self.config
    }

    pub fn link(&self, handle: ConnectionHandle) -> Option<&LinkContext> {
        self.registry.get(handle)
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkContext> {
        self.registry.iter()
    }

    /// Process one notification and return the events it produced, in order
    pub fn handle(&mut self, notification: Notification) -> Vec<OutboundEvent> {
        debug!("Handling notification: {:?}", notification);
        match notification {
            Notification::Signaling { handle, event } => self.handle_signaling(handle, event),
            Notification::Voice(event) => self.handle_voice(event),
            Notification::RaceGuardExpired { handle, generation } => {
                let busy = self.audio_busy_elsewhere(handle);
                self.with_link(handle, |audio_path, link| {
                    audio_path.on_race_guard_expired(link, generation, busy);
                });
                Vec::new()
            }
        }
    }

    fn handle_signaling(&mut self, handle: ConnectionHandle, event: HfEvent) -> Vec<OutboundEvent> {
        match event {
            HfEvent::ConnectionState { state, address, profile } => match state {
                ConnectionState::Connected => self.on_connected(handle, address, profile),
                ConnectionState::SlcConnected => {
                    match self.registry.get_mut(handle) {
                        Some(link) => {
                            link.remote_address = address;
                            info!(handle = %handle, address = %address, "Service level connection up");
                        }
                        None => warn!(handle = %handle, "Service level connection for unknown link"),
                    }
                    Vec::new()
                }
                ConnectionState::Disconnected => self.on_disconnected(handle),
            },
            HfEvent::Unknown(id) => {
                debug!(handle = %handle, id, "Ignoring unknown stack event");
                Vec::new()
            }
            event => {
                let Some(link) = self.registry.get_mut(handle) else {
                    warn!(handle = %handle, "Dropping notification for unknown link: {:?}", event);
                    return Vec::new();
                };
                let before = link.audio_path.index;
                let events = Self::apply_link_event(&self.config, &mut self.audio_path, link, &event);
                let after = link.audio_path.index;
                self.registry.reindex_sco(handle, before, after);
                events
            }
        }
    }

    fn apply_link_event(
        config: &HandsfreeConfig,
        audio_path: &mut AudioPathCoordinator,
        link: &mut LinkContext,
        event: &HfEvent,
    ) -> Vec<OutboundEvent> {
        match event {
            HfEvent::AgFeatures(features) => {
                link.audio_path.use_wideband = CodecNegotiator::negotiate(*features, config.local_features);
                link.inband_ring = features & ag_features::INBAND_RING_TONE != 0;
            }
            HfEvent::InbandRing(enabled) => {
                link.inband_ring = *enabled;
                debug!(handle = %link.handle, enabled, "In-band ring changed");
            }
            HfEvent::CallIndicators { active, held, setup } => {
                let update = CallStateTracker::on_call_indicators(link, *active, *held, *setup);
                audio_path.on_call_update(link, update.transition);
                return update.into_events(link.handle);
            }
            HfEvent::Volume { kind, level } => audio_path.on_volume(link, *kind, *level),
            HfEvent::CodecSelected(codec) => audio_path.on_codec_selected(link, *codec),
            _ => {}
        }
        EventTranslator::translate(event, link).into_iter().collect()
    }

    fn on_connected(
        &mut self,
        handle: ConnectionHandle,
        address: DeviceAddress,
        profile: ProfileKind,
    ) -> Vec<OutboundEvent> {
        if self.registry.contains(handle) {
            warn!(handle = %handle, "Duplicate connect for live link ignored");
            return Vec::new();
        }
        info!(handle = %handle, address = %address, ?profile, "Link connected");

        let mut link = LinkContext::new(handle, profile, &self.config);
        // Headset links never report a service level connection
        if profile == ProfileKind::Headset {
            link.remote_address = address;
        }
        self.audio_path.on_link_connected(&mut link);
        let index = link.audio_path.index;
        self.registry.insert(link);
        self.registry.reindex_sco(handle, None, index);

        vec![
            OutboundEvent::link_opened(handle, address, STATUS_SUCCESS),
            OutboundEvent::profile_selected(handle, profile),
        ]
    }

    fn on_disconnected(&mut self, handle: ConnectionHandle) -> Vec<OutboundEvent> {
        let Some(mut link) = self.registry.remove(handle) else {
            debug!(handle = %handle, "Disconnect for unknown link");
            return Vec::new();
        };
        info!(handle = %handle, "Link disconnected");
        self.audio_path.on_link_disconnected(&mut link);
        vec![OutboundEvent::link_closed(handle)]
    }

    fn handle_voice(&mut self, event: ScoEvent) -> Vec<OutboundEvent> {
        let index = event.index();
        let Some(handle) = self.registry.handle_for_sco(index) else {
            warn!(index = index.0, "Dropping voice channel event for unknown index: {:?}", event);
            return Vec::new();
        };

        match event {
            ScoEvent::Connected { index } => self
                .with_link(handle, |audio_path, link| audio_path.on_channel_connected(link, index))
                .flatten()
                .into_iter()
                .collect(),
            ScoEvent::Disconnected { index } => self
                .with_link(handle, |audio_path, link| audio_path.on_channel_disconnected(link, index))
                .flatten()
                .into_iter()
                .collect(),
            ScoEvent::ConnectionRequested { index } => {
                let busy = self.audio_busy_elsewhere(handle);
                self.with_link(handle, |audio_path, link| {
                    audio_path.on_connection_requested(link, index, busy)
                });
                Vec::new()
            }
            ScoEvent::ParametersChanged { index } => {
                debug!(handle = %handle, index = index.0, "Voice channel parameters changed");
                Vec::new()
            }
        }
    }

    /// Run `f` against a registered link, keeping the voice-channel index map current
    fn with_link<R>(
        &mut self,
        handle: ConnectionHandle,
        f: impl FnOnce(&mut AudioPathCoordinator, &mut LinkContext) -> R,
    ) -> Option<R> {
        let Some(link) = self.registry.get_mut(handle) else {
            debug!(handle = %handle, "No link registered");
            return None;
        };
        let before = link.audio_path.index;
        let result = f(&mut self.audio_path, link);
        let after = link.audio_path.index;
        self.registry.reindex_sco(handle, before, after);
        Some(result)
    }

    fn audio_busy_elsewhere(&self, handle: ConnectionHandle) -> bool {
        self.config.audio_arbitration == AudioArbitration::SingleActive
            && self.registry.other_audio_open(handle)
    }
}
