//! Static configuration for the hands-free core
//!
//! Everything here is fixed for the lifetime of a [`crate::dispatcher::HandsfreeCore`]:
//! the feature mask advertised to the Audio Gateway, one SCO parameter set per
//! profile, the race-guard timeout, default gains and the multi-link audio
//! arbitration policy.
//!
//! # Usage Examples
//!
//! ```rust
//! use handsfree_core::config::{AudioArbitration, HandsfreeConfig};
//! use std::time::Duration;
//!
//! let config = HandsfreeConfig::new()
//!     .with_race_guard_timeout(Duration::from_millis(800))
//!     .with_audio_arbitration(AudioArbitration::SingleActive);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.default_speaker_volume, 8);
//! ```
//!
//! Configuration can also be loaded from JSON; omitted fields take their defaults:
//!
//! ```rust
//! use handsfree_core::config::HandsfreeConfig;
//!
//! let config = HandsfreeConfig::from_json_str(r#"{ "race_guard_timeout_ms": 250 }"#).unwrap();
//! assert_eq!(config.race_guard_timeout.as_millis(), 250);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{HandsfreeError, Result};
use crate::types::ProfileKind;

/// Hands-free unit feature bits advertised to the AG
pub mod hf_features {
    pub const EC_NR: u32 = 1 << 0;
    pub const THREE_WAY_CALLING: u32 = 1 << 1;
    pub const CLI_PRESENTATION: u32 = 1 << 2;
    pub const VOICE_RECOGNITION: u32 = 1 << 3;
    pub const REMOTE_VOLUME_CONTROL: u32 = 1 << 4;
    pub const ENHANCED_CALL_STATUS: u32 = 1 << 5;
    pub const ENHANCED_CALL_CONTROL: u32 = 1 << 6;
    pub const CODEC_NEGOTIATION: u32 = 1 << 7;
    pub const HF_INDICATORS: u32 = 1 << 8;
    pub const ESCO_S4: u32 = 1 << 9;
}

/// Audio Gateway feature bits announced after SLC setup
pub mod ag_features {
    pub const THREE_WAY_CALLING: u32 = 1 << 0;
    pub const EC_NR: u32 = 1 << 1;
    pub const VOICE_RECOGNITION: u32 = 1 << 2;
    pub const INBAND_RING_TONE: u32 = 1 << 3;
    pub const VOICE_TAG: u32 = 1 << 4;
    pub const REJECT_CALL: u32 = 1 << 5;
    pub const ENHANCED_CALL_STATUS: u32 = 1 << 6;
    pub const ENHANCED_CALL_CONTROL: u32 = 1 << 7;
    pub const EXTENDED_ERROR_CODES: u32 = 1 << 8;
    pub const CODEC_NEGOTIATION: u32 = 1 << 9;
    pub const HF_INDICATORS: u32 = 1 << 10;
    pub const ESCO_S4: u32 = 1 << 11;
}

/// SCO/eSCO packet-type mask bits
pub mod sco_packet_types {
    pub const HV3: u16 = 0x0004;
    pub const EV3: u16 = 0x0008;
    pub const EV4: u16 = 0x0010;
    pub const EV5: u16 = 0x0020;
    pub const NO_3_EV3: u16 = 0x0080;
    pub const NO_3_EV5: u16 = 0x0200;

    /// EV3 family and 2-EV3, excluding 3-EV3/3-EV5
    pub const HANDS_FREE: u16 = HV3 | EV3 | EV4 | EV5 | NO_3_EV3 | NO_3_EV5;
}

pub const DEFAULT_RACE_GUARD_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_VOLUME: u8 = 8;
pub const HF_VOLUME_MAX: u8 = 15;
pub const DEFAULT_DEVICE_VOLUME_MAX: u8 = 10;

/// eSCO retransmission effort policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetransmissionEffort {
    None,
    OptimizePower,
    OptimizeQuality,
    DontCare,
}

/// Parameter set used when creating or accepting a voice channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoParams {
    /// Maximum transmit latency in milliseconds
    pub max_latency_ms: u16,
    pub packet_types: u16,
    pub retransmission_effort: RetransmissionEffort,
    /// Whether the link may carry wideband speech
    pub use_wideband: bool,
}

impl ScoParams {
    /// T2 settings for Hands-Free links
    pub fn handsfree() -> Self {
        Self {
            max_latency_ms: 13,
            packet_types: sco_packet_types::HANDS_FREE,
            retransmission_effort: RetransmissionEffort::OptimizePower,
            use_wideband: true,
        }
    }

    /// S3 settings for Headset links
    pub fn headset() -> Self {
        Self {
            max_latency_ms: 10,
            packet_types: sco_packet_types::HANDS_FREE,
            retransmission_effort: RetransmissionEffort::OptimizePower,
            use_wideband: false,
        }
    }
}

/// How voice channels on several simultaneous links are arbitrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioArbitration {
    /// Every link runs its own voice channel
    #[default]
    Independent,
    /// At most one link may have an open voice channel
    SingleActive,
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandsfreeConfig {
    /// Feature mask advertised to the AG (see [`hf_features`])
    pub local_features: u32,
    pub handsfree_sco: ScoParams,
    pub headset_sco: ScoParams,
    #[serde(rename = "race_guard_timeout_ms", with = "duration_ms")]
    pub race_guard_timeout: Duration,
    pub default_speaker_volume: u8,
    pub default_mic_volume: u8,
    /// Top of the profile volume scale
    pub hf_volume_max: u8,
    /// Top of the audio device volume scale
    pub device_volume_max: u8,
    pub audio_arbitration: AudioArbitration,
}

impl Default for HandsfreeConfig {
    fn default() -> Self {
        Self {
            local_features: hf_features::EC_NR
                | hf_features::THREE_WAY_CALLING
                | hf_features::CLI_PRESENTATION
                | hf_features::VOICE_RECOGNITION
                | hf_features::REMOTE_VOLUME_CONTROL
                | hf_features::ENHANCED_CALL_STATUS
                | hf_features::ENHANCED_CALL_CONTROL
                | hf_features::CODEC_NEGOTIATION,
            handsfree_sco: ScoParams::handsfree(),
            headset_sco: ScoParams::headset(),
            race_guard_timeout: Duration::from_millis(DEFAULT_RACE_GUARD_TIMEOUT_MS),
            default_speaker_volume: DEFAULT_VOLUME,
            default_mic_volume: DEFAULT_VOLUME,
            hf_volume_max: HF_VOLUME_MAX,
            device_volume_max: DEFAULT_DEVICE_VOLUME_MAX,
            audio_arbitration: AudioArbitration::Independent,
        }
    }
}

impl HandsfreeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document, filling omitted fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_local_features(mut self, features: u32) -> Self {
        self.local_features = features;
        self
    }

    pub fn with_race_guard_timeout(mut self, timeout: Duration) -> Self {
        self.race_guard_timeout = timeout;
        self
    }

    pub fn with_default_volumes(mut self, speaker: u8, mic: u8) -> Self {
        self.default_speaker_volume = speaker;
        self.default_mic_volume = mic;
        self
    }

    pub fn with_device_volume_max(mut self, max: u8) -> Self {
        self.device_volume_max = max;
        self
    }

    pub fn with_audio_arbitration(mut self, policy: AudioArbitration) -> Self {
        self.audio_arbitration = policy;
        self
    }

    pub fn with_sco_params(mut self, profile: ProfileKind, params: ScoParams) -> Self {
        match profile {
            ProfileKind::HandsFree => self.handsfree_sco = params,
            ProfileKind::Headset => self.headset_sco = params,
        }
        self
    }

    /// SCO parameter set matching a link's profile
    pub fn sco_params(&self, profile: ProfileKind) -> &ScoParams {
        match profile {
            ProfileKind::HandsFree => &self.handsfree_sco,
            ProfileKind::Headset => &self.headset_sco,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.hf_volume_max == 0 {
            return Err(HandsfreeError::config("hf_volume_max must be greater than zero"));
        }
        if self.default_speaker_volume > self.hf_volume_max
            || self.default_mic_volume > self.hf_volume_max
        {
            return Err(HandsfreeError::config(format!(
                "default volumes must not exceed {}",
                self.hf_volume_max
            )));
        }
        if self.race_guard_timeout.is_zero() {
            return Err(HandsfreeError::config("race_guard_timeout must be non-zero"));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
