//! Outward event records and their wire encoding
//!
//! Every record sent to the host controller is `[handle: u16 LE][payload]`,
//! framed by the transport with the record's opcode. Payload shapes:
//!
//! | Event | Payload |
//! |---|---|
//! | Link opened | 6-byte address (byte-reversed), 1-byte status |
//! | Link closed, audio opened, audio closed | none |
//! | Service-level connected | 4-byte AG feature bitmap (LE) |
//! | Profile type | 1-byte profile |
//! | AT passthrough, indicators, call list | 2-byte number (LE), NUL-terminated text |
//!
//! [`EventTranslator`] maps stack notifications onto these records. Text fields
//! are copied verbatim and cut to [`AT_TEXT_CAPACITY`]; nothing is escaped.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::link::LinkContext;
use crate::notification::HfEvent;
use crate::types::{CallListEntry, ConnectionHandle, DeviceAddress, IndicatorId, ProfileKind, VolumeKind};

pub const EVENT_LINK_OPENED: u16 = 0x0301;
pub const EVENT_LINK_CLOSED: u16 = 0x0302;
pub const EVENT_SERVICE_LEVEL_CONNECTED: u16 = 0x0303;
pub const EVENT_AUDIO_OPENED: u16 = 0x0304;
pub const EVENT_AUDIO_CLOSED: u16 = 0x0305;
pub const EVENT_PROFILE_TYPE: u16 = 0x0306;
pub const AT_EVENT_BASE: u16 = 0x0320;

/// Outward text buffer size, terminator included
pub const AT_TEXT_CAPACITY: usize = 128;

pub const STATUS_SUCCESS: u8 = 0;

/// AT passthrough event kinds, numbered from [`AT_EVENT_BASE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AtEvent {
    Ok = 0,
    Error = 1,
    CmeError = 2,
    Ring = 3,
    SpeakerVolume = 4,
    MicVolume = 5,
    CallerId = 9,
    Indicator = 10,
    VoiceTagNumber = 11,
    SubscriberNumber = 14,
    OperatorName = 16,
    CallList = 17,
    HfIndicator = 18,
    CodecSelected = 19,
}

impl AtEvent {
    pub fn opcode(self) -> u16 {
        AT_EVENT_BASE + self as u16
    }
}

/// Opcode-specific body of an outward event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    None,
    LinkOpened { address: DeviceAddress, status: u8 },
    Features(u32),
    Profile(ProfileKind),
    At { num: u16, text: Vec<u8> },
}

/// One record for the host controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEvent {
    pub opcode: u16,
    pub handle: ConnectionHandle,
    pub payload: EventPayload,
}

impl OutboundEvent {
    pub fn link_opened(handle: ConnectionHandle, address: DeviceAddress, status: u8) -> Self {
        Self {
            opcode: EVENT_LINK_OPENED,
            handle,
            payload: EventPayload::LinkOpened { address, status },
        }
    }

    pub fn link_closed(handle: ConnectionHandle) -> Self {
        Self::bare(EVENT_LINK_CLOSED, handle)
    }

    pub fn audio_opened(handle: ConnectionHandle) -> Self {
        Self::bare(EVENT_AUDIO_OPENED, handle)
    }

    pub fn audio_closed(handle: ConnectionHandle) -> Self {
        Self::bare(EVENT_AUDIO_CLOSED, handle)
    }

    pub fn service_level_connected(handle: ConnectionHandle, ag_features: u32) -> Self {
        Self {
            opcode: EVENT_SERVICE_LEVEL_CONNECTED,
            handle,
            payload: EventPayload::Features(ag_features),
        }
    }

    pub fn profile_selected(handle: ConnectionHandle, profile: ProfileKind) -> Self {
        Self {
            opcode: EVENT_PROFILE_TYPE,
            handle,
            payload: EventPayload::Profile(profile),
        }
    }

    /// AT passthrough record; `text` is cut to fit the outward buffer
    pub fn at(handle: ConnectionHandle, kind: AtEvent, num: u16, text: impl AsRef<[u8]>) -> Self {
        Self {
            opcode: kind.opcode(),
            handle,
            payload: EventPayload::At {
                num,
                text: bounded_text(text.as_ref()),
            },
        }
    }

    pub fn indicator(handle: ConnectionHandle, id: IndicatorId, value: u8) -> Self {
        Self::at(handle, AtEvent::Indicator, 0, encode_indicator(id.as_u8(), value))
    }

    fn bare(opcode: u16, handle: ConnectionHandle) -> Self {
        Self {
            opcode,
            handle,
            payload: EventPayload::None,
        }
    }

    /// Text field of an AT record, lossily decoded
    pub fn text(&self) -> Option<String> {
        match &self.payload {
            EventPayload::At { text, .. } => Some(String::from_utf8_lossy(text).into_owned()),
            _ => None,
        }
    }

    /// `[handle LE][payload]`
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + AT_TEXT_CAPACITY + 2);
        buf.put_slice(&self.handle.to_le_bytes());
        match &self.payload {
            EventPayload::None => {}
            EventPayload::LinkOpened { address, status } => {
                buf.put_slice(&address.to_reversed_bytes());
                buf.put_u8(*status);
            }
            EventPayload::Features(features) => buf.put_u32_le(*features),
            EventPayload::Profile(profile) => buf.put_u8(*profile as u8),
            EventPayload::At { num, text } => {
                buf.put_u16_le(*num);
                buf.put_slice(text);
                buf.put_u8(0);
            }
        }
        buf.freeze()
    }
}

impl fmt::Display for OutboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event 0x{:04x} on {}", self.opcode, self.handle)?;
        if let EventPayload::At { num, text } = &self.payload {
            write!(f, " [{}] \"{}\"", num, String::from_utf8_lossy(text))?;
        }
        Ok(())
    }
}

/// Copy up to the first NUL, leaving room for the terminator
fn bounded_text(text: &[u8]) -> Vec<u8> {
    let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
    let end = end.min(AT_TEXT_CAPACITY - 1);
    text[..end].to_vec()
}

/// `"<indicator_id>,<value>"`
pub fn encode_indicator(id: u8, value: u8) -> String {
    format!("{},{}", id, value)
}

/// `"<index>,<direction>,<status>,<mode>,<is_conference>"` plus `",<number>,<type>"` when known
pub fn encode_call_list_entry(entry: &CallListEntry) -> String {
    let mut text = format!(
        "{},{},{},{},{}",
        entry.index,
        entry.direction,
        entry.status,
        entry.mode,
        u8::from(entry.is_conference)
    );
    if let Some((number, number_type)) = &entry.number {
        text.push_str(&format!(",{},{}", number, number_type));
    }
    text
}

/// Maps stack notifications onto outward records
#[derive(Debug, Clone, Copy, Default)]
pub struct EventTranslator;

impl EventTranslator {
    /// At most one outward record per notification. Connection-state and
    /// call-indicator notifications are owned by other components and yield
    /// `None` here, as do unrecognised ones.
    pub fn translate(event: &HfEvent, link: &LinkContext) -> Option<OutboundEvent> {
        let handle = link.handle;
        let out = match event {
            HfEvent::AgFeatures(features) => OutboundEvent::service_level_connected(handle, *features),
            HfEvent::ServiceState(v) => OutboundEvent::indicator(handle, IndicatorId::Service, *v),
            HfEvent::ServiceType(v) => OutboundEvent::indicator(handle, IndicatorId::Roam, *v),
            HfEvent::Signal(v) => OutboundEvent::indicator(handle, IndicatorId::Signal, *v),
            HfEvent::Battery(v) => OutboundEvent::indicator(handle, IndicatorId::Battery, *v),
            HfEvent::Ring => OutboundEvent::at(handle, AtEvent::Ring, 0, ""),
            HfEvent::Ok => OutboundEvent::at(handle, AtEvent::Ok, 0, ""),
            HfEvent::Error => OutboundEvent::at(handle, AtEvent::Error, 0, ""),
            HfEvent::CmeError(code) => OutboundEvent::at(handle, AtEvent::CmeError, *code, ""),
            HfEvent::CallerId { number, number_type } => {
                OutboundEvent::at(handle, AtEvent::CallerId, *number_type, number)
            }
            HfEvent::VoiceTagNumber { number, number_type } => {
                OutboundEvent::at(handle, AtEvent::VoiceTagNumber, *number_type, number)
            }
            HfEvent::OperatorName(name) => OutboundEvent::at(handle, AtEvent::OperatorName, 0, name),
            HfEvent::SubscriberNumber(record) => {
                OutboundEvent::at(handle, AtEvent::SubscriberNumber, 0, record)
            }
            HfEvent::CallListEntry(entry) => {
                OutboundEvent::at(handle, AtEvent::CallList, 0, encode_call_list_entry(entry))
            }
            HfEvent::HfIndicator { id, value } => {
                OutboundEvent::at(handle, AtEvent::HfIndicator, 0, encode_indicator(*id, *value))
            }
            HfEvent::Volume { kind, level } => {
                let at = match kind {
                    VolumeKind::Speaker => AtEvent::SpeakerVolume,
                    VolumeKind::Microphone => AtEvent::MicVolume,
                };
                OutboundEvent::at(handle, at, u16::from(*level), "")
            }
            HfEvent::CodecSelected(codec) => {
                OutboundEvent::at(handle, AtEvent::CodecSelected, *codec as u16, "")
            }
            HfEvent::ConnectionState { .. }
            | HfEvent::CallIndicators { .. }
            | HfEvent::InbandRing(_)
            | HfEvent::Unknown(_) => return None,
        };
        Some(out)
    }
}
