//! WAV Alert Playback
//!
//! ## Overview
//!
//! The alert is a 16-bit mono PCM WAV file streamed to a digital audio
//! output (I2S on the reference board). [`WavPlayer`] implements
//! [`ActionTrigger`]:
//!
//! 1. Locate the `fmt ` and `data` chunks of the RIFF container, skipping
//!    any other chunk
//! 2. Reject anything that is not 16-bit mono PCM
//! 3. Open the output at the file's sample rate
//! 4. Stream the data chunk in [`I2S_BUFFER_SIZE`] pieces; a short write is
//!    logged and followed by a short pause, a failed write stops streaming
//! 5. Wait for the output buffer to drain
//!
//! The output is closed on every path once it has been opened.
//!
//! ## Asset sources
//!
//! Assets are addressed by path through an [`AudioSource`]:
//! [`EmbeddedAsset`] for a file linked into flash and [`FsAssets`] for a
//! directory on the host (`std`).

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::constants::power::{I2S_BUFFER_SIZE, I2S_DRAIN_MS, I2S_SHORT_WRITE_PAUSE_MS};
use crate::errors::PlaybackError;
use crate::traits::{ActionTrigger, TelemetrySink};

const RIFF_HEADER_LEN: u32 = 12;
const CHUNK_HEADER_LEN: u32 = 8;
const FMT_MIN_LEN: u32 = 16;
const FORMAT_PCM: u16 = 1;

/// Random-access reader for audio assets
pub trait AudioSource {
    /// Read up to `buf.len()` bytes of `asset` starting at `offset`
    ///
    /// Returns the number of bytes read; 0 at end of asset.
    fn read_at(&mut self, asset: &str, offset: u32, buf: &mut [u8]) -> Result<usize, PlaybackError>;
}

/// PCM stream parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PcmFormat {
    /// Samples per second
    pub sample_rate: u32,
    /// Bits per sample
    pub bits_per_sample: u16,
    /// Interleaved channels
    pub channels: u16,
}

/// Digital audio output peripheral
pub trait AudioOutput {
    /// Peripheral failure
    type Error: fmt::Debug;

    /// Initialize the peripheral for `format`
    fn begin(&mut self, format: PcmFormat) -> Result<(), Self::Error>;

    /// Queue PCM bytes; returns how many were accepted
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Deinitialize the peripheral
    fn end(&mut self) -> Result<(), Self::Error>;
}

/// Location and format of the PCM data in a WAV file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WavInfo {
    /// Stream parameters from the `fmt ` chunk
    pub format: PcmFormat,
    /// Offset of the first PCM byte
    pub data_offset: u32,
    /// Declared length of the `data` chunk
    pub data_len: u32,
}

fn read_exact<A: AudioSource>(
    source: &mut A,
    asset: &str,
    offset: u32,
    buf: &mut [u8],
) -> Result<bool, PlaybackError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read_at(asset, offset + filled as u32, &mut buf[filled..])?;
        if n == 0 {
            return Ok(false);
        }
        filled += n;
    }
    Ok(true)
}

fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Parse the RIFF/WAVE structure of `asset`
pub fn parse_wav<A: AudioSource>(source: &mut A, asset: &str) -> Result<WavInfo, PlaybackError> {
    let mut header = [0u8; RIFF_HEADER_LEN as usize];
    let found = read_exact(source, asset, 0, &mut header)?;
    if !found || &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
        return Err(PlaybackError::InvalidWav {
            reason: "RIFF/WAVE header not found",
        });
    }

    let mut format = None;
    let mut offset = RIFF_HEADER_LEN;
    loop {
        let mut chunk = [0u8; CHUNK_HEADER_LEN as usize];
        if !read_exact(source, asset, offset, &mut chunk)? {
            break;
        }
        let size = u32_at(&chunk, 4);
        let body = offset + CHUNK_HEADER_LEN;

        match &chunk[0..4] {
            b"fmt " => {
                if size < FMT_MIN_LEN {
                    return Err(PlaybackError::InvalidWav {
                        reason: "fmt chunk too small",
                    });
                }
                let mut fmt = [0u8; FMT_MIN_LEN as usize];
                if !read_exact(source, asset, body, &mut fmt)? {
                    break;
                }
                if u16_at(&fmt, 0) != FORMAT_PCM {
                    return Err(PlaybackError::Unsupported {
                        reason: "only PCM is supported",
                    });
                }
                format = Some(PcmFormat {
                    channels: u16_at(&fmt, 2),
                    sample_rate: u32_at(&fmt, 4),
                    bits_per_sample: u16_at(&fmt, 14),
                });
            }
            b"data" => {
                return match format {
                    Some(format) => Ok(WavInfo {
                        format,
                        data_offset: body,
                        data_len: size,
                    }),
                    None => Err(PlaybackError::InvalidWav {
                        reason: "data chunk before fmt chunk",
                    }),
                };
            }
            _ => {}
        }

        // Chunks are word aligned.
        offset = body.saturating_add(size).saturating_add(size & 1);
    }

    Err(PlaybackError::InvalidWav {
        reason: "fmt or data chunk missing",
    })
}

/// A single asset held in memory (typically linked into flash)
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedAsset<'a> {
    path: &'a str,
    bytes: &'a [u8],
}

impl<'a> EmbeddedAsset<'a> {
    /// Serve `bytes` under `path`
    pub const fn new(path: &'a str, bytes: &'a [u8]) -> Self {
        Self { path, bytes }
    }
}

impl AudioSource for EmbeddedAsset<'_> {
    fn read_at(&mut self, asset: &str, offset: u32, buf: &mut [u8]) -> Result<usize, PlaybackError> {
        if asset != self.path {
            return Err(PlaybackError::Source {
                reason: "asset not found",
            });
        }
        let start = (offset as usize).min(self.bytes.len());
        let n = buf.len().min(self.bytes.len() - start);
        buf[..n].copy_from_slice(&self.bytes[start..start + n]);
        Ok(n)
    }
}

#[cfg(feature = "std")]
pub use fs::FsAssets;

#[cfg(feature = "std")]
mod fs {
    use std::fs::File;
    use std::io::{Read, Seek, SeekFrom};
    use std::path::PathBuf;
    use std::string::{String, ToString};

    use super::AudioSource;
    use crate::errors::PlaybackError;

    /// Assets resolved relative to a directory on the host
    pub struct FsAssets {
        root: PathBuf,
        open: Option<(String, File)>,
    }

    impl FsAssets {
        /// Resolve asset paths below `root`
        pub fn new<P: Into<PathBuf>>(root: P) -> Self {
            Self {
                root: root.into(),
                open: None,
            }
        }

        fn file(&mut self, asset: &str) -> Result<&mut File, PlaybackError> {
            let reopen = !matches!(&self.open, Some((name, _)) if name == asset);
            if reopen {
                let path = self.root.join(asset.trim_start_matches('/'));
                let file = File::open(path).map_err(|_| PlaybackError::Source {
                    reason: "asset could not be opened",
                })?;
                self.open = Some((asset.to_string(), file));
            }
            match &mut self.open {
                Some((_, file)) => Ok(file),
                None => Err(PlaybackError::Source {
                    reason: "asset could not be opened",
                }),
            }
        }
    }

    impl AudioSource for FsAssets {
        fn read_at(&mut self, asset: &str, offset: u32, buf: &mut [u8]) -> Result<usize, PlaybackError> {
            let file = self.file(asset)?;
            file.seek(SeekFrom::Start(u64::from(offset)))
                .and_then(|_| file.read(buf))
                .map_err(|_| PlaybackError::Source {
                    reason: "asset read failed",
                })
        }
    }
}

/// Closes the output when dropped
struct OpenOutput<'a, O: AudioOutput, S: TelemetrySink> {
    output: &'a mut O,
    sink: &'a mut S,
}

impl<O: AudioOutput, S: TelemetrySink> Drop for OpenOutput<'_, O, S> {
    fn drop(&mut self) {
        match self.output.end() {
            Ok(()) => record!(self.sink, "[Audio] output released"),
            Err(e) => record!(self.sink, "[Audio] output release failed: {:?}", e),
        }
    }
}

/// Streams WAV assets to an audio output
pub struct WavPlayer<A, O, D, S> {
    source: A,
    output: O,
    delay: D,
    sink: S,
}

impl<A, O, D, S> WavPlayer<A, O, D, S>
where
    A: AudioSource,
    O: AudioOutput,
    D: DelayNs,
    S: TelemetrySink,
{
    /// Player reading from `source` and writing to `output`
    pub fn new(source: A, output: O, delay: D, sink: S) -> Self {
        Self {
            source,
            output,
            delay,
            sink,
        }
    }

    /// Audio output
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Split into source and output
    pub fn into_parts(self) -> (A, O) {
        (self.source, self.output)
    }

    fn inspect(&mut self, asset: &str) -> Result<WavInfo, PlaybackError> {
        let info = parse_wav(&mut self.source, asset)?;
        let format = info.format;
        record!(
            self.sink,
            "[Audio] WAV rate={} bits={} channels={} size={}",
            format.sample_rate,
            format.bits_per_sample,
            format.channels,
            info.data_len
        );
        if format.bits_per_sample != 16 {
            return Err(PlaybackError::Unsupported {
                reason: "only 16-bit audio is supported",
            });
        }
        if format.channels != 1 {
            return Err(PlaybackError::Unsupported {
                reason: "only mono audio is supported",
            });
        }
        Ok(info)
    }

    fn stream(&mut self, asset: &str, info: WavInfo) -> Result<(), PlaybackError> {
        if let Err(e) = self.output.begin(info.format) {
            record!(self.sink, "[Audio] output init failed: {:?}", e);
            return Err(PlaybackError::Output {
                reason: "output init failed",
            });
        }
        let mut out = OpenOutput {
            output: &mut self.output,
            sink: &mut self.sink,
        };

        let mut buffer = [0u8; I2S_BUFFER_SIZE];
        let mut remaining = info.data_len;
        let mut offset = info.data_offset;
        let mut written = 0u32;
        let mut result = Ok(());

        while remaining > 0 {
            let want = buffer.len().min(remaining as usize);
            let read = self.source.read_at(asset, offset, &mut buffer[..want])?;
            if read == 0 {
                break;
            }
            match out.output.write(&buffer[..read]) {
                Ok(accepted) => {
                    written += accepted as u32;
                    if accepted != read {
                        record!(out.sink, "[Audio] short write: {}/{}", accepted, read);
                        self.delay.delay_ms(I2S_SHORT_WRITE_PAUSE_MS);
                    }
                }
                Err(e) => {
                    record!(out.sink, "[Audio] write failed: {:?}", e);
                    result = Err(PlaybackError::Output {
                        reason: "write failed",
                    });
                    break;
                }
            }
            offset += read as u32;
            remaining -= read as u32;
        }

        record!(out.sink, "[Audio] wrote {}/{} bytes", written, info.data_len);
        self.delay.delay_ms(I2S_DRAIN_MS);
        drop(out);
        result
    }
}

impl<A, O, D, S> ActionTrigger for WavPlayer<A, O, D, S>
where
    A: AudioSource,
    O: AudioOutput,
    D: DelayNs,
    S: TelemetrySink,
{
    fn play(&mut self, asset: &str) -> Result<(), PlaybackError> {
        record!(self.sink, "[Audio] playing {}", asset);
        let result = self
            .inspect(asset)
            .and_then(|info| self.stream(asset, info));
        match &result {
            Ok(()) => record!(self.sink, "[Audio] playback finished"),
            Err(e) => record!(self.sink, "[Audio] playback aborted: {}", e),
        }
        result
    }
}
