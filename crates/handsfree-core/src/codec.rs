//! Narrowband/wideband speech selection
//!
//! The decision is made twice per link. When the AG announces its features,
//! [`CodecNegotiator::negotiate`] predicts whether wideband speech will be used.
//! When in-band codec selection completes, [`CodecNegotiator::on_codec_selected`]
//! overrides the prediction; the selected codec always wins when the audio
//! stream is configured.

use tracing::debug;

use crate::config::{ag_features, hf_features};
use crate::types::CodecId;

pub const NARROWBAND_SAMPLE_RATE: u32 = 8_000;
pub const WIDEBAND_SAMPLE_RATE: u32 = 16_000;

/// Stateless codec decision helper
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecNegotiator;

impl CodecNegotiator {
    /// Wideband iff both the AG and the local configuration support codec negotiation
    pub fn negotiate(ag_feature_flags: u32, local_feature_mask: u32) -> bool {
        let use_wideband = (ag_feature_flags & ag_features::CODEC_NEGOTIATION) != 0
            && (local_feature_mask & hf_features::CODEC_NEGOTIATION) != 0;
        debug!(
            ag_features = format_args!("0x{:08x}", ag_feature_flags),
            local_features = format_args!("0x{:08x}", local_feature_mask),
            use_wideband,
            "Predicted speech bandwidth from capabilities"
        );
        use_wideband
    }

    /// Authoritative result of in-band codec selection
    pub fn on_codec_selected(codec: CodecId) -> bool {
        codec.is_wideband()
    }

    pub fn sample_rate(use_wideband: bool) -> u32 {
        if use_wideband {
            WIDEBAND_SAMPLE_RATE
        } else {
            NARROWBAND_SAMPLE_RATE
        }
    }
}
