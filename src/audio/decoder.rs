//! Compressed and container audio decoding via symphonia
//!
//! Handles everything the hound reader does not: MP3, FLAC, Vorbis, AAC/MP4,
//! and WAV variants hound rejects (e.g. WAVE_FORMAT_EXTENSIBLE with odd masks).

use std::fs::File;
use std::path::Path;
use log::{debug, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use crate::audio::{AudioData, AudioFormat, AudioHeader, WavAudio};
use crate::error::{ReverbError, Result};

/// Probe `path` and open a format reader for it.
fn open_format(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path)
        .map_err(|e| ReverbError::decode(format!("Cannot open {}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ReverbError::decode(format!("Unsupported format for {}: {}", path.display(), e)))?;
    Ok(probed.format)
}

/// Decoder for `track_id`, or `None` if the reader no longer carries that track.
fn track_decoder(format: &dyn FormatReader, track_id: u32) -> Result<Option<Box<dyn Decoder>>> {
    let Some(track) = format.tracks().iter().find(|t| t.id == track_id) else {
        return Ok(None);
    };

    symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map(Some)
        .map_err(|e| ReverbError::decode(format!("Failed to create decoder: {}", e)))
}

/// Decode an entire file into normalized f32 samples.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<WavAudio> {
    let path = path.as_ref();
    debug!("Decoding {} with symphonia", path.display());

    let mut format = open_format(path)?;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ReverbError::decode("No audio track found"))?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| ReverbError::decode("Sample rate not found"))?;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

    let mut decoder = track_decoder(format.as_ref(), track_id)?
        .ok_or_else(|| ReverbError::decode("No audio track found"))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut buf_frames = 0u64;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                // The track list changed; keep going if our track survived.
                match track_decoder(format.as_ref(), track_id)? {
                    Some(new_decoder) => {
                        warn!("Stream reset in {}, restarting decoder for track {}", path.display(), track_id);
                        decoder = new_decoder;
                        sample_buf = None;
                        continue;
                    }
                    None => {
                        warn!(
                            "Track {} ended at a stream reset in {}, keeping {} decoded samples",
                            track_id, path.display(), samples.len()
                        );
                        break;
                    }
                }
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let packet_channels = spec.channels.count() as u16;
                if *channels.get_or_insert(packet_channels) != packet_channels {
                    return Err(ReverbError::decode(format!(
                        "Channel count changed mid-stream in {}", path.display()
                    )));
                }

                let capacity = decoded.capacity() as u64;
                if sample_buf.is_none() || buf_frames < capacity {
                    sample_buf = Some(SampleBuffer::<f32>::new(capacity, spec));
                    buf_frames = capacity;
                }

                if let Some(buf) = sample_buf.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {}", e);
            }
            Err(SymphoniaError::ResetRequired) => {
                warn!("Decoder reset requested in {}, dropping one packet", path.display());
                decoder.reset();
            }
            Err(e) => return Err(e.into()),
        }
    }

    let channels = channels.ok_or_else(|| ReverbError::decode("Channel count not found"))?;
    let data = AudioData::from_interleaved(samples, channels)?;
    debug!("Decoded {} frames, {} Hz, {} channels", data.len(), sample_rate, channels);

    let audio = WavAudio {
        header: AudioHeader::new(sample_rate, channels, AudioFormat::Float32, data.len() as u32),
        data,
    };
    audio.header.validate()?;

    Ok(audio)
}
