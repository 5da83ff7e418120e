//! Per-device link state and the handle-keyed registry
//!
//! A [`LinkContext`] exists for every live signaling connection. It is created
//! when the connection reaches "connected" and removed when it reaches
//! "disconnected". The [`LinkRegistry`] owns all contexts and keeps a secondary
//! index from voice-channel index to handle, since voice-channel notifications
//! only carry the channel index.

use std::collections::HashMap;
use tracing::debug;

use crate::config::HandsfreeConfig;
use crate::types::{CallSetupState, ConnectionHandle, DeviceAddress, ProfileKind, ScoIndex};

/// Voice channel lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioPhase {
    #[default]
    Closed,
    /// Waiting for the AG to open the channel
    AwaitingAcceptor,
    Open,
    /// Local side attempted to open the channel after the race guard fired
    AwaitingInitiatorRetry,
}

/// The voice channel's own sub-state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioPathState {
    pub index: Option<ScoIndex>,
    pub phase: AudioPhase,
    pub use_wideband: bool,
}

impl AudioPathState {
    pub fn is_open(&self) -> bool {
        self.phase == AudioPhase::Open
    }
}

/// Combined call and audio state for one remote device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkContext {
    pub handle: ConnectionHandle,
    pub remote_address: DeviceAddress,
    pub profile_kind: ProfileKind,
    pub call_active: bool,
    pub call_held: bool,
    pub call_setup: CallSetupState,
    pub inband_ring: bool,
    pub speaker_volume: u8,
    pub mic_volume: u8,
    pub audio_path: AudioPathState,
    /// Race guard armed and not yet fulfilled or expired
    pub pending_race_guard: bool,
    /// Generation of the most recent arm; expiries for older ones are stale
    pub race_guard_generation: u64,
    /// The next codec selection may arm the race guard
    pub race_guard_primed: bool,
}

impl LinkContext {
    pub fn new(handle: ConnectionHandle, profile_kind: ProfileKind, config: &HandsfreeConfig) -> Self {
        Self {
            handle,
            remote_address: DeviceAddress::EMPTY,
            profile_kind,
            call_active: false,
            call_held: false,
            call_setup: CallSetupState::Idle,
            inband_ring: false,
            speaker_volume: config.default_speaker_volume,
            mic_volume: config.default_mic_volume,
            audio_path: AudioPathState::default(),
            pending_race_guard: false,
            race_guard_generation: 0,
            race_guard_primed: false,
        }
    }

    /// Back to the freshly-connected defaults, keeping handle and profile
    pub fn reset(&mut self, config: &HandsfreeConfig) {
        *self = Self::new(self.handle, self.profile_kind, config);
    }
}

/// Owner of every live [`LinkContext`]
#[derive(Debug, Default)]
pub struct LinkRegistry {
    links: HashMap<ConnectionHandle, LinkContext>,
    by_sco_index: HashMap<ScoIndex, ConnectionHandle>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a context for a new connection. Returns `false` and leaves the
    /// registry untouched if the handle is already live.
    pub fn insert(&mut self, link: LinkContext) -> bool {
        if self.links.contains_key(&link.handle) {
            return false;
        }
        debug!(handle = %link.handle, "Registered link");
        self.links.insert(link.handle, link);
        true
    }

    pub fn remove(&mut self, handle: ConnectionHandle) -> Option<LinkContext> {
        let link = self.links.remove(&handle)?;
        self.by_sco_index.retain(|_, h| *h != handle);
        debug!(handle = %handle, "Unregistered link");
        Some(link)
    }

    pub fn get(&self, handle: ConnectionHandle) -> Option<&LinkContext> {
        self.links.get(&handle)
    }

    pub fn get_mut(&mut self, handle: ConnectionHandle) -> Option<&mut LinkContext> {
        self.links.get_mut(&handle)
    }

    pub fn contains(&self, handle: ConnectionHandle) -> bool {
        self.links.contains_key(&handle)
    }

    pub fn handle_for_sco(&self, index: ScoIndex) -> Option<ConnectionHandle> {
        self.by_sco_index.get(&index).copied()
    }

    /// Re-point the voice-channel index of a link after it changed
    pub fn reindex_sco(&mut self, handle: ConnectionHandle, old: Option<ScoIndex>, new: Option<ScoIndex>) {
        if old == new {
            return;
        }
        if let Some(old) = old {
            if self.by_sco_index.get(&old) == Some(&handle) {
                self.by_sco_index.remove(&old);
            }
        }
        if let Some(new) = new {
            self.by_sco_index.insert(new, handle);
        }
    }

    /// Whether any link other than `except` currently has an open voice channel
    pub fn other_audio_open(&self, except: ConnectionHandle) -> bool {
        self.links
            .values()
            .any(|l| l.handle != except && l.audio_path.is_open())
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkContext> {
        self.links.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(handle: u16) -> LinkContext {
        LinkContext::new(ConnectionHandle(handle), ProfileKind::HandsFree, &HandsfreeConfig::default())
    }

    #[test]
    fn test_new_link_defaults() {
        let l = link(1);
        assert_eq!(l.speaker_volume, 8);
        assert_eq!(l.mic_volume, 8);
        assert_eq!(l.audio_path.phase, AudioPhase::Closed);
        assert_eq!(l.audio_path.index, None);
        assert!(l.remote_address.is_empty());
        assert!(!l.pending_race_guard);
        assert_eq!(l.race_guard_generation, 0);
    }

    #[test]
    fn test_reset_keeps_identity() {
        let config = HandsfreeConfig::default();
        let mut l = LinkContext::new(ConnectionHandle(3), ProfileKind::Headset, &config);
        l.call_active = true;
        l.audio_path.phase = AudioPhase::Open;
        l.audio_path.index = Some(ScoIndex(4));
        l.remote_address = DeviceAddress([1, 2, 3, 4, 5, 6]);
        l.reset(&config);
        assert_eq!(l, LinkContext::new(ConnectionHandle(3), ProfileKind::Headset, &config));
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut registry = LinkRegistry::new();
        assert!(registry.insert(link(1)));
        assert!(!registry.insert(link(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sco_index_tracking() {
        let mut registry = LinkRegistry::new();
        registry.insert(link(1));
        registry.insert(link(2));

        registry.reindex_sco(ConnectionHandle(1), None, Some(ScoIndex(10)));
        registry.reindex_sco(ConnectionHandle(2), None, Some(ScoIndex(11)));
        assert_eq!(registry.handle_for_sco(ScoIndex(10)), Some(ConnectionHandle(1)));

        registry.reindex_sco(ConnectionHandle(1), Some(ScoIndex(10)), Some(ScoIndex(12)));
        assert_eq!(registry.handle_for_sco(ScoIndex(10)), None);
        assert_eq!(registry.handle_for_sco(ScoIndex(12)), Some(ConnectionHandle(1)));

        registry.remove(ConnectionHandle(1));
        assert_eq!(registry.handle_for_sco(ScoIndex(12)), None);
        assert_eq!(registry.handle_for_sco(ScoIndex(11)), Some(ConnectionHandle(2)));
    }

    #[test]
    fn test_other_audio_open() {
        let mut registry = LinkRegistry::new();
        registry.insert(link(1));
        registry.insert(link(2));
        registry.get_mut(ConnectionHandle(1)).unwrap().audio_path.phase = AudioPhase::Open;
        assert!(registry.other_audio_open(ConnectionHandle(2)));
        assert!(!registry.other_audio_open(ConnectionHandle(1)));
    }
}
