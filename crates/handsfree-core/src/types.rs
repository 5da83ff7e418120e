//! Core types for handsfree-core
//!
//! Identifiers and small value enums shared by every component: connection
//! handles, device addresses, voice-channel indexes and the call/indicator
//! vocabulary reported by the Audio Gateway.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque signaling-connection identifier assigned by the profile stack
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ConnectionHandle(pub u16);

impl ConnectionHandle {
    /// Little-endian wire form used as the prefix of every outward event
    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Voice-channel (SCO) identifier handed out by the voice-channel collaborator
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScoIndex(pub u16);

impl fmt::Display for ScoIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 6-byte Bluetooth device address, most significant byte first
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceAddress(pub [u8; 6]);

impl DeviceAddress {
    pub const EMPTY: DeviceAddress = DeviceAddress([0; 6]);

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Address bytes in the order the host transport expects (least significant first)
    pub fn to_reversed_bytes(&self) -> [u8; 6] {
        let mut out = self.0;
        out.reverse();
        out
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}

/// Signaling connection state reported by the profile stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    SlcConnected,
}

/// Profile negotiated for a link, fixed for the link's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProfileKind {
    #[default]
    HandsFree = 0,
    Headset = 1,
}

/// The AG's call-setup indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CallSetupState {
    #[default]
    Idle = 0,
    Incoming = 1,
    Dialing = 2,
    Alerting = 3,
}

impl CallSetupState {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Incoming),
            2 => Some(Self::Dialing),
            3 => Some(Self::Alerting),
            _ => None,
        }
    }

    /// Whether a call attempt is being set up in either direction
    pub fn is_in_progress(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Indicator identifiers as carried in `"<indicator_id>,<value>"` payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum IndicatorId {
    Service = 1,
    Call = 2,
    CallSetup = 3,
    CallHeld = 4,
    Signal = 5,
    Roam = 6,
    Battery = 7,
}

impl IndicatorId {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Which gain a volume report refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeKind {
    Speaker,
    Microphone,
}

/// Codec agreed during in-band codec selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CodecId {
    /// CVSD narrowband
    Cvsd = 1,
    /// mSBC wideband
    Msbc = 2,
}

impl CodecId {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Cvsd),
            2 => Some(Self::Msbc),
            _ => None,
        }
    }

    pub fn is_wideband(self) -> bool {
        matches!(self, Self::Msbc)
    }
}

/// One entry of the AG's current-calls list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallListEntry {
    pub index: u8,
    /// 0 = outgoing, 1 = incoming
    pub direction: u8,
    /// 0 active, 1 held, 2 dialing, 3 alerting, 4 incoming, 5 waiting
    pub status: u8,
    /// 0 voice, 1 data, 2 fax
    pub mode: u8,
    pub is_conference: bool,
    /// Caller number and its type, present only when the AG supplied one
    pub number: Option<(String, u16)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_reversal() {
        let addr = DeviceAddress([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        assert_eq!(addr.to_reversed_bytes(), [0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
        assert_eq!(addr.to_string(), "11:22:33:44:55:66");
        assert!(!addr.is_empty());
        assert!(DeviceAddress::default().is_empty());
    }

    #[test]
    fn test_call_setup_conversion() {
        assert_eq!(CallSetupState::from_u8(2), Some(CallSetupState::Dialing));
        assert_eq!(CallSetupState::from_u8(9), None);
        assert!(!CallSetupState::Idle.is_in_progress());
        assert!(CallSetupState::Alerting.is_in_progress());
    }

    #[test]
    fn test_codec_ids() {
        assert_eq!(CodecId::from_u8(2), Some(CodecId::Msbc));
        assert!(CodecId::Msbc.is_wideband());
        assert!(!CodecId::Cvsd.is_wideband());
        assert_eq!(CodecId::from_u8(0), None);
    }

    #[test]
    fn test_handle_wire_order() {
        assert_eq!(ConnectionHandle(0x0102).to_le_bytes(), [0x02, 0x01]);
    }
}
