use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;

use crate::utils::errors::ExtractError;

/// Size of one ETI-NI frame. Every frame handed out by the
/// [`Extractor`] has exactly this size, padded with 0x55.
pub const ETI_NI_FRAME_SIZE: usize = 6144;

/// Raw FIB size used by FIC dump files.
pub const FIB_SIZE: usize = 32;

const SYNC_PHASE0: u32 = 0x49C5_F8FF;
const SYNC_PHASE1: u32 = 0xB63A_07FF;

// A sliding search gives up after one full frame plus the largest
// carriage header.
const SYNC_SEARCH_RANGE: usize = ETI_NI_FRAME_SIZE + 10;

/// ETI carriage identified from the first bytes of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    /// Fixed 6144 byte frames, sync word first.
    Raw,
    /// Each frame prefixed with a 16-bit little-endian length.
    Streamed,
    /// A 32-bit frame count header, then framed as [`StreamType::Streamed`].
    Framed,
}

impl Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Raw => write!(f, "RAW"),
            StreamType::Streamed => write!(f, "STREAMED"),
            StreamType::Framed => write!(f, "FRAMED"),
        }
    }
}

/// Extracts 6144 byte ETI frames from a continuous byte stream.
///
/// The carriage format is identified from the first bytes pushed in:
/// the two alternating sync words are looked for at the offsets used by
/// the raw, streamed and framed carriages, with a byte-wise sliding
/// search as a last resort.
///
/// # Example
///
/// ```rust,no_run
/// use dabeti::process::extract::Extractor;
///
/// let mut extractor = Extractor::default();
/// let data = std::fs::read("ensemble.eti")?;
/// extractor.push_bytes(&data);
///
/// for frame in &mut extractor {
///     let frame = frame?;
///     assert_eq!(frame.as_ref().len(), 6144);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Extractor {
    buffer: VecDeque<u8>,
    stream_type: Option<StreamType>,
    io_counter: usize,
    frames_processed: usize,
    error_count: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            buffer: VecDeque::with_capacity(2 * ETI_NI_FRAME_SIZE),
            stream_type: None,
            io_counter: 0,
            frames_processed: 0,
            error_count: 0,
        }
    }
}

impl Extractor {
    /// Adds raw input data to the internal buffer.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend(data);
        self.io_counter += 1;
    }

    /// The identified carriage, once enough input has been seen.
    pub fn stream_type(&self) -> Option<StreamType> {
        self.stream_type
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    /// Reports leftover input after the final push.
    ///
    /// Input files must not contain incomplete frames, so trailing bytes
    /// after the last full frame are an error.
    pub fn finish(&self) -> Result<(), ExtractError> {
        if self.stream_type.is_some() && !self.buffer.is_empty() {
            return Err(ExtractError::IncompleteFrame {
                read: self.buffer.len(),
                expected: ETI_NI_FRAME_SIZE,
            });
        }

        Ok(())
    }

    fn sync_at(&self, offset: usize) -> bool {
        let mut word = [0u8; 4];
        for (i, b) in word.iter_mut().enumerate() {
            match self.buffer.get(offset + i) {
                Some(byte) => *b = *byte,
                None => return false,
            }
        }

        let sync = u32::from_le_bytes(word);
        sync == SYNC_PHASE0 || sync == SYNC_PHASE1
    }

    fn identify(&mut self) -> Result<(), ExtractError> {
        if self.buffer.len() < 10 {
            return self.insufficient();
        }

        if self.sync_at(0) {
            self.stream_type = Some(StreamType::Raw);
            return Ok(());
        }

        if self.sync_at(2) {
            self.stream_type = Some(StreamType::Streamed);
            return Ok(());
        }

        if self.sync_at(6) {
            // Drop the leading 32-bit frame count, frames follow with
            // their 16-bit length prefixes.
            self.stream_type = Some(StreamType::Framed);
            self.consume_front(4);
            return Ok(());
        }

        // Search for the sync marker byte by byte
        let search_end = self.buffer.len().saturating_sub(4).min(SYNC_SEARCH_RANGE);
        for offset in 1..search_end {
            if self.sync_at(offset) {
                self.stream_type = Some(StreamType::Raw);
                self.consume_front(offset);
                return Ok(());
            }
        }

        if self.buffer.len() >= SYNC_SEARCH_RANGE + 4 {
            return Err(ExtractError::FormatUnrecognized);
        }

        self.insufficient()
    }

    fn consume_front(&mut self, cnt: usize) {
        self.buffer.drain(..cnt);
    }

    fn insufficient(&mut self) -> Result<(), ExtractError> {
        self.io_counter -= 1;
        Err(ExtractError::InsufficientData)
    }

    fn iter_insufficient(&mut self) -> Option<Result<EtiFrame, ExtractError>> {
        self.io_counter -= 1;
        Some(Err(ExtractError::InsufficientData))
    }

    fn take_frame(&mut self, payload_len: usize) -> EtiFrame {
        let mut data = vec![0x55u8; ETI_NI_FRAME_SIZE];
        for (dst, src) in data.iter_mut().zip(self.buffer.drain(..payload_len)) {
            *dst = src;
        }

        self.frames_processed += 1;

        EtiFrame { data: data.into() }
    }
}

impl Iterator for Extractor {
    type Item = Result<EtiFrame, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.io_counter == 0 {
            return None;
        }

        if self.stream_type.is_none() {
            match self.identify() {
                Ok(()) => {}
                Err(ExtractError::InsufficientData) => return None,
                Err(e) => {
                    self.error_count += 1;
                    return Some(Err(e));
                }
            }
        }

        match self.stream_type {
            Some(StreamType::Raw) => {
                if self.buffer.len() < ETI_NI_FRAME_SIZE {
                    return self.iter_insufficient();
                }

                Some(Ok(self.take_frame(ETI_NI_FRAME_SIZE)))
            }
            Some(StreamType::Streamed) | Some(StreamType::Framed) => {
                if self.buffer.len() < 2 {
                    return self.iter_insufficient();
                }

                let frame_size =
                    u16::from_le_bytes([self.buffer[0], self.buffer[1]]) as usize;
                if frame_size > ETI_NI_FRAME_SIZE {
                    self.error_count += 1;
                    return Some(Err(ExtractError::FrameTooLarge(frame_size)));
                }

                if self.buffer.len() < 2 + frame_size {
                    return self.iter_insufficient();
                }

                self.consume_front(2);
                Some(Ok(self.take_frame(frame_size)))
            }
            None => None,
        }
    }
}

/// One padded ETI-NI frame.
#[derive(Debug, Clone)]
pub struct EtiFrame {
    pub data: Arc<[u8]>,
}

impl AsRef<[u8]> for EtiFrame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Splits a FIC dump (a bare concatenation of 32 byte FIBs) into FIBs.
///
/// Used for the FIC-only input mode, where no ETI framing is present.
#[derive(Debug, Default)]
pub struct FibSource {
    buffer: VecDeque<u8>,
}

impl FibSource {
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    pub fn leftover(&self) -> usize {
        self.buffer.len()
    }
}

impl Iterator for FibSource {
    type Item = [u8; FIB_SIZE];

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.len() < FIB_SIZE {
            return None;
        }

        let mut fib = [0u8; FIB_SIZE];
        for (dst, src) in fib.iter_mut().zip(self.buffer.drain(..FIB_SIZE)) {
            *dst = src;
        }

        Some(fib)
    }
}

#[cfg(test)]
fn raw_frame_bytes(phase: usize) -> Vec<u8> {
    let mut frame = vec![0u8; ETI_NI_FRAME_SIZE];
    frame[0] = 0xFF;
    let fsync: &[u8] = if phase % 2 == 0 {
        &[0x07, 0x3A, 0xB6]
    } else {
        &[0xF8, 0xC5, 0x49]
    };
    frame[1..4].copy_from_slice(fsync);
    frame
}

#[test]
fn identify_raw() {
    let mut extractor = Extractor::default();
    extractor.push_bytes(&raw_frame_bytes(0));

    let frame = extractor.next().unwrap().unwrap();
    assert_eq!(extractor.stream_type(), Some(StreamType::Raw));
    assert_eq!(frame.as_ref().len(), ETI_NI_FRAME_SIZE);
    assert!(extractor.finish().is_ok());
}

#[test]
fn identify_streamed_and_pad() {
    let mut data = Vec::new();
    for phase in 0..2 {
        let frame = raw_frame_bytes(phase);
        data.extend_from_slice(&1000u16.to_le_bytes());
        data.extend_from_slice(&frame[..1000]);
    }

    let mut extractor = Extractor::default();
    extractor.push_bytes(&data);

    let frame = extractor.next().unwrap().unwrap();
    assert_eq!(extractor.stream_type(), Some(StreamType::Streamed));
    assert_eq!(frame.as_ref().len(), ETI_NI_FRAME_SIZE);
    // bytes past the carried payload are padding
    assert_eq!(frame.as_ref()[1000], 0x55);

    let frame = extractor.next().unwrap().unwrap();
    assert_eq!(frame.as_ref()[1], 0xF8);
}

#[test]
fn identify_framed_with_count_header() {
    let mut data = Vec::new();
    data.extend_from_slice(&2u32.to_le_bytes());
    let frame = raw_frame_bytes(0);
    data.extend_from_slice(&6144u16.to_le_bytes());
    data.extend_from_slice(&frame);

    let mut extractor = Extractor::default();
    extractor.push_bytes(&data);

    let frame = extractor.next().unwrap().unwrap();
    assert_eq!(extractor.stream_type(), Some(StreamType::Framed));
    assert_eq!(frame.as_ref()[0], 0xFF);
}

#[test]
fn sliding_search_skips_junk() {
    let mut data = vec![0x11u8; 23];
    data.extend_from_slice(&raw_frame_bytes(0));

    let mut extractor = Extractor::default();
    extractor.push_bytes(&data);

    let frame = extractor.next().unwrap().unwrap();
    assert_eq!(extractor.stream_type(), Some(StreamType::Raw));
    assert_eq!(frame.as_ref()[0], 0xFF);
}

#[test]
fn unrecognized_input() {
    let mut extractor = Extractor::default();
    extractor.push_bytes(&vec![0x42u8; SYNC_SEARCH_RANGE + 16]);

    match extractor.next() {
        Some(Err(ExtractError::FormatUnrecognized)) => {}
        other => panic!("expected FormatUnrecognized, got {other:?}"),
    }
}

#[test]
fn oversized_streamed_frame() {
    let mut data = Vec::new();
    let frame = raw_frame_bytes(0);
    data.extend_from_slice(&100u16.to_le_bytes());
    data.extend_from_slice(&frame[..100]);

    let mut extractor = Extractor::default();
    extractor.push_bytes(&data);
    let _ = extractor.next().unwrap().unwrap();

    extractor.push_bytes(&7000u16.to_le_bytes());
    extractor.push_bytes(&[0u8; 32]);
    match extractor.next() {
        Some(Err(ExtractError::FrameTooLarge(7000))) => {}
        other => panic!("expected FrameTooLarge, got {other:?}"),
    }
}

#[test]
fn fib_source_chunks() {
    let mut source = FibSource::default();
    source.push_bytes(&[0xAA; 80]);

    assert_eq!(source.next().unwrap().len(), FIB_SIZE);
    assert!(source.next().is_some());
    assert!(source.next().is_none());
    assert_eq!(source.leftover(), 16);
}
