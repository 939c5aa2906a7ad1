// Container probing and packet reading using Symphonia

use crate::config::EngineConfig;
use playhead_core::{MediaTime, MediaUrl, PlayerError, Result};
use playhead_transport_http::{HttpClient, HttpRangeSource};
use std::fs::File;
use std::io::ErrorKind;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use symphonia::core::codecs::CodecParameters;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Track information
#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Indefinite when the container does not know the frame count
    pub duration: MediaTime,
}

/// Audio demuxer wrapper
pub struct Demuxer {
    format_reader: Box<dyn FormatReader>,
    track_id: u32,
}

impl Demuxer {
    /// Open and probe `url`. Blocks on file or network I/O.
    pub fn open(url: &MediaUrl, config: &EngineConfig) -> Result<Self> {
        Self::open_cancellable(url, config, Arc::new(AtomicBool::new(false)))
    }

    /// Like [`Demuxer::open`], but network requests stop once `cancel` is
    /// set, including the reads made later through the returned demuxer
    pub fn open_cancellable(url: &MediaUrl, config: &EngineConfig, cancel: Arc<AtomicBool>) -> Result<Self> {
        let media_source: Box<dyn MediaSource> = match url {
            MediaUrl::File(path) => {
                let file = File::open(path).map_err(|e| {
                    PlayerError::Load(format!("Failed to open {}: {}", path.display(), e))
                })?;
                Box::new(file)
            }
            MediaUrl::Http(address) => {
                let client = HttpClient::new(config.http.clone()).with_cancel(cancel);
                Box::new(HttpRangeSource::open(address, client)?)
            }
        };

        let mut hint = Hint::new();
        if let Some(extension) = url.extension() {
            hint.with_extension(&extension);
        }

        Self::from_media_source(media_source, hint)
    }

    /// Create demuxer from a media source
    pub fn from_media_source(media_source: Box<dyn MediaSource>, hint: Hint) -> Result<Self> {
        let media_source_stream = MediaSourceStream::new(media_source, Default::default());

        let probe_result = symphonia::default::get_probe()
            .format(
                &hint,
                media_source_stream,
                &FormatOptions {
                    enable_gapless: true,
                    ..Default::default()
                },
                &MetadataOptions::default(),
            )
            .map_err(|e| match e {
                SymphoniaError::Unsupported(what) => PlayerError::UnsupportedFormat(what.to_string()),
                other => PlayerError::Load(format!("Failed to probe media: {}", other)),
            })?;

        let format_reader = probe_result.format;
        let track_id = format_reader
            .default_track()
            .ok_or_else(|| PlayerError::Load("No default track found".to_string()))?
            .id;

        Ok(Self {
            format_reader,
            track_id,
        })
    }

    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    pub fn codec_params(&self) -> Result<&CodecParameters> {
        self.format_reader
            .tracks()
            .iter()
            .find(|t| t.id == self.track_id)
            .map(|t| &t.codec_params)
            .ok_or_else(|| PlayerError::Load("Track not found".to_string()))
    }

    /// Get track information
    pub fn track_info(&self) -> Result<TrackInfo> {
        let params = self.codec_params()?;

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| PlayerError::UnsupportedFormat("Sample rate not specified".to_string()))?;
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(2);

        let duration = match params.n_frames {
            Some(frames) => MediaTime::new(frames as i64, sample_rate as i32),
            None => MediaTime::POSITIVE_INFINITY,
        };

        Ok(TrackInfo {
            sample_rate,
            channels,
            duration,
        })
    }

    /// Next packet of our track; `None` at end of stream
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            match self.format_reader.next_packet() {
                Ok(packet) if packet.track_id() == self.track_id => return Ok(Some(packet)),
                Ok(_) => continue,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(SymphoniaError::IoError(e)) => {
                    return Err(PlayerError::Network(format!("Failed to read packet: {}", e)));
                }
                Err(e) => {
                    return Err(PlayerError::Decoding(format!("Failed to read packet: {}", e)));
                }
            }
        }
    }

    /// Seek to `position`; returns how many frames the decoder must drop
    /// after the seek to land exactly on it
    pub fn seek(&mut self, position: MediaTime, sample_rate: u32) -> Result<u64> {
        let time_base = self
            .codec_params()?
            .time_base
            .ok_or_else(|| PlayerError::Playback("Track has no time base".to_string()))?;

        // ts = seconds * denom / numer
        let ts = (i128::from(position.value()) * i128::from(time_base.denom))
            / (i128::from(position.timescale()) * i128::from(time_base.numer));
        let ts = ts.max(0) as u64;

        let seeked = self
            .format_reader
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| PlayerError::Playback(format!("Seek failed: {}", e)))?;

        let behind = seeked.required_ts.saturating_sub(seeked.actual_ts);
        let skip_frames = (u128::from(behind) * u128::from(time_base.numer) * u128::from(sample_rate))
            / u128::from(time_base.denom);
        Ok(skip_frames as u64)
    }
}
