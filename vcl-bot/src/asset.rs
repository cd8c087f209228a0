//! Startup check of the looped audio asset
//!
//! The stream type is fixed to Ogg/Opus, so an asset that is missing or not
//! Opus-in-Ogg would make every play attempt fail and the player would spin
//! through error -> idle -> replay. Probing once at startup turns that into
//! a single fatal error instead.

use std::fmt;
use std::path::{Path, PathBuf};
use symphonia::core::codecs::{CODEC_TYPE_NULL, CODEC_TYPE_OPUS};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// What the probe found in the asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    pub path: PathBuf,
    pub codec: &'static str,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl fmt::Display for AssetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.path.display(), self.codec)?;
        if let Some(rate) = self.sample_rate {
            write!(f, ", {} Hz", rate)?;
        }
        if let Some(channels) = self.channels {
            write!(f, ", {} ch", channels)?;
        }
        write!(f, ")")
    }
}

/// Verify `path` is a readable Ogg container with an Opus track
pub fn probe_asset(path: &Path) -> Result<AssetInfo> {
    debug!("Probing audio asset: {}", path.display());

    let asset_error = |reason: String| Error::Asset {
        path: path.to_path_buf(),
        reason,
    };

    let file = std::fs::File::open(path).map_err(|e| asset_error(format!("cannot open: {}", e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("ogg");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| asset_error(format!("not an Ogg stream: {}", e)))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| asset_error("no audio track found".to_string()))?;

    let params = &track.codec_params;
    if params.codec != CODEC_TYPE_OPUS {
        let found = symphonia::default::get_codecs()
            .get_codec(params.codec)
            .map(|d| d.short_name)
            .unwrap_or("unknown");
        return Err(asset_error(format!("expected Opus audio, found {}", found)));
    }

    let info = AssetInfo {
        path: path.to_path_buf(),
        codec: "opus",
        sample_rate: params.sample_rate,
        channels: params.channels.map(|c| c.count() as u16),
    };
    info!("Audio asset: {}", info);
    Ok(info)
}
