// Audio decoding using Symphonia

use crate::demux::Demuxer;
use playhead_core::{PlayerError, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::Packet;

/// Audio decoder producing interleaved f32 samples
pub struct AudioDecoder {
    decoder: Box<dyn Decoder>,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl AudioDecoder {
    /// Create decoder for the demuxer's track
    pub fn from_demuxer(demuxer: &Demuxer) -> Result<Self> {
        let params = demuxer.codec_params()?;
        let decoder = symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
            .map_err(|e| match e {
                SymphoniaError::Unsupported(what) => PlayerError::UnsupportedFormat(what.to_string()),
                other => PlayerError::Decoding(format!("Failed to create decoder: {}", other)),
            })?;

        Ok(Self {
            decoder,
            sample_buf: None,
        })
    }

    /// Decode a packet into interleaved samples.
    ///
    /// Returns `Ok(None)` for a corrupt packet that should be skipped.
    pub fn decode(&mut self, packet: &Packet) -> Result<Option<&[f32]>> {
        let decoded = match self.decoder.decode(packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet: {}", msg);
                return Ok(None);
            }
            Err(e) => return Err(PlayerError::Decoding(format!("Decoding failed: {}", e))),
        };

        let spec = *decoded.spec();
        let frames = decoded.capacity() as u64;
        let reusable = self
            .sample_buf
            .as_ref()
            .map(|buf| buf.capacity() as u64 >= frames * spec.channels.count() as u64)
            .unwrap_or(false);
        if !reusable {
            self.sample_buf = Some(SampleBuffer::new(frames, spec));
        }

        match self.sample_buf.as_mut() {
            Some(buf) => {
                buf.copy_interleaved_ref(decoded);
                Ok(Some(buf.samples()))
            }
            None => Ok(None),
        }
    }

    /// Forget decoder state, required after a seek
    pub fn reset(&mut self) {
        self.decoder.reset();
    }
}
