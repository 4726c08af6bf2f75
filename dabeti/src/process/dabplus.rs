//! DAB+ audio superframe extraction (TS 102 563).
//!
//! Subchannel data accumulates until a valid firecode word is found,
//! then whole superframes of `subchannel_index * 120` bytes are
//! Reed-Solomon corrected and cut into access units.

use reed_solomon::Decoder;

use crate::utils::crc::{CRC_CCITT_ALG, Crc16, firecode};
use crate::utils::errors::SuperframeError;

const RS_PARITY_LEN: usize = 10;
const SF_ROW_LEN: usize = 120;
const SF_DATA_ROW_LEN: usize = 110;

/// Audio parameters from the superframe header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperframeHeader {
    pub dac_rate: bool,
    pub sbr_flag: bool,
    pub aac_channel_mode: bool,
    pub ps_flag: bool,
    pub mpeg_surround_config: u8,
    pub num_aus: usize,
}

impl SuperframeHeader {
    fn parse(audio_params: u8) -> Self {
        let dac_rate = audio_params & 0x40 != 0;
        let sbr_flag = audio_params & 0x20 != 0;

        // AAC core sampling rates 16, 24, 32 and 48 kHz
        let num_aus = match (dac_rate, sbr_flag) {
            (false, true) => 2,
            (true, true) => 3,
            (false, false) => 4,
            (true, false) => 6,
        };

        Self {
            dac_rate,
            sbr_flag,
            aac_channel_mode: audio_params & 0x10 != 0,
            ps_flag: audio_params & 0x08 != 0,
            mpeg_surround_config: audio_params & 0x07,
            num_aus,
        }
    }

    /// Offset of the first access unit, right after the header and the
    /// 12-bit au_start fields.
    fn first_au_start(&self) -> usize {
        match self.num_aus {
            2 => 5,
            3 => 6,
            4 => 8,
            _ => 11,
        }
    }
}

/// One corrected and validated superframe.
#[derive(Debug)]
pub struct Superframe {
    pub header: SuperframeHeader,
    pub aus: Vec<Vec<u8>>,
    /// Byte errors corrected by the Reed-Solomon pass.
    pub rs_corrections: usize,
}

/// Accumulates one subchannel's MSC data and decodes superframes.
pub struct SuperframeDecoder {
    subchannel_index: usize,
    data: Vec<u8>,
    rs: Decoder,
    crc: Crc16,
}

impl SuperframeDecoder {
    /// `subchannel_index` is the subchannel bitrate in kbit/s divided
    /// by 8, which is also the number of interleaved RS codewords.
    pub fn new(subchannel_index: usize) -> Self {
        Self {
            subchannel_index,
            data: Vec::new(),
            rs: Decoder::new(RS_PARITY_LEN),
            crc: Crc16::new(&CRC_CCITT_ALG),
        }
    }

    /// Feeds one frame worth of stream data. Returns a superframe once
    /// enough valid data has accumulated.
    ///
    /// A superframe that fails validation is discarded wholesale before
    /// the error is returned, so the firecode search resynchronizes on
    /// later data.
    pub fn push(&mut self, streamdata: &[u8]) -> Result<Option<Superframe>, SuperframeError> {
        self.data.extend_from_slice(streamdata);

        if !self.seek_valid_firecode()? {
            return Ok(None);
        }

        let sf_len = self.subchannel_index * SF_ROW_LEN;
        if self.subchannel_index == 0 || self.data.len() < sf_len {
            // wait for the rest of the superframe
            return Ok(None);
        }

        let result = self.decode();
        self.data.drain(..sf_len);
        result.map(Some)
    }

    /// Scans for a plausible superframe header and drops everything in
    /// front of it. Clears the buffer when none is found.
    fn seek_valid_firecode(&mut self) -> Result<bool, SuperframeError> {
        if self.data.len() < 10 {
            return Ok(false);
        }

        for i in 0..self.data.len() - 10 {
            let b = &self.data[i..];

            // the bytes after the firecode must not be zero, to avoid
            // syncing inside a zero byte region
            if b[3] == 0x00 && b[4] & 0xF0 == 0x00 {
                continue;
            }

            let header_firecode = u16::from_be_bytes([b[0], b[1]]);
            if header_firecode == firecode(&b[2..11]) {
                log::debug!("found valid firecode at offset {i}");
                self.data.drain(..i);
                return Ok(true);
            }
        }

        let scanned = self.data.len();
        self.data.clear();
        Err(SuperframeError::FirecodeNotFound(scanned))
    }

    fn decode(&mut self) -> Result<Superframe, SuperframeError> {
        let rs_corrections = self.rs_correct()?;

        let header = SuperframeHeader::parse(self.data[2]);
        if header.mpeg_surround_config > 2 {
            return Err(SuperframeError::InvalidAudioParams(
                header.mpeg_surround_config,
            ));
        }
        let num_aus = header.num_aus;

        // each au_start is encoded in three nibbles, n-1 starts for n AUs
        let mut au_start = Vec::with_capacity(num_aus + 1);
        au_start.push(header.first_au_start());
        for au in 0..num_aus - 1 {
            let nib = au * 3;
            let nibble = |i: usize| {
                let byte = self.data[3 + i / 2] as usize;
                if i % 2 == 0 { byte >> 4 } else { byte & 0x0F }
            };
            au_start.push(nibble(nib) << 8 | nibble(nib + 1) << 4 | nibble(nib + 2));
        }

        // the end of the last AU is where the RS parity begins
        let end = self.subchannel_index * SF_DATA_ROW_LEN;
        au_start.push(end);

        for (index, window) in au_start.windows(2).enumerate() {
            if window[0] + 2 > window[1] || window[1] > end {
                return Err(SuperframeError::InvalidAuBoundary {
                    index,
                    start: window[0],
                    end,
                });
            }
        }

        let mut aus = Vec::with_capacity(num_aus);
        for (index, window) in au_start.windows(2).enumerate() {
            let au = &self.data[window[0]..window[1] - 2];
            let au_crc = u16::from_be_bytes([self.data[window[1] - 2], self.data[window[1] - 1]]);
            let calculated = self.crc.complemented(au);
            if calculated != au_crc {
                return Err(SuperframeError::AuCrcMismatch {
                    index,
                    calculated,
                    read: au_crc,
                });
            }
            aus.push(au.to_vec());
        }

        Ok(Superframe {
            header,
            aus,
            rs_corrections,
        })
    }

    /// Corrects the superframe in place. The RS codewords are
    /// interleaved column by column over the subchannel index.
    fn rs_correct(&mut self) -> Result<usize, SuperframeError> {
        let mut total_corrections = 0;
        let mut rs_packet = [0u8; SF_ROW_LEN];

        for column in 0..self.subchannel_index {
            for (pos, byte) in rs_packet.iter_mut().enumerate() {
                *byte = self.data[pos * self.subchannel_index + column];
            }

            let (corrected, corrections) = self
                .rs
                .correct_err_count(&rs_packet, None)
                .map_err(|_| SuperframeError::RsUncorrectable { column })?;

            if corrections > 0 {
                for pos in 0..SF_DATA_ROW_LEN {
                    self.data[pos * self.subchannel_index + column] = corrected[pos];
                }
                total_corrections += corrections;
            }
        }

        Ok(total_corrections)
    }
}

#[cfg(test)]
fn build_superframe_data() -> Vec<u8> {
    let crc = Crc16::new(&CRC_CCITT_ALG);

    // subchannel_index 1: 110 data bytes, 10 parity bytes
    let mut data = vec![0u8; SF_DATA_ROW_LEN];

    // dac_rate 0, sbr 0: 4 AUs starting at 8
    data[2] = 0x00;
    let au_start = [8usize, 34, 60, 86, 110];
    let nibbles: Vec<u8> = au_start[1..4]
        .iter()
        .flat_map(|&s| [(s >> 8) as u8, (s >> 4) as u8 & 0x0F, s as u8 & 0x0F])
        .collect();
    for (i, nibble) in nibbles.iter().enumerate() {
        data[3 + i / 2] |= if i % 2 == 0 { nibble << 4 } else { *nibble };
    }

    for (index, window) in au_start.windows(2).enumerate() {
        for i in window[0]..window[1] - 2 {
            data[i] = (index as u8 + 1) * 3;
        }
        let au_crc = crc.complemented(&data[window[0]..window[1] - 2]);
        data[window[1] - 2..window[1]].copy_from_slice(&au_crc.to_be_bytes());
    }

    let word = firecode(&data[2..11]);
    data[..2].copy_from_slice(&word.to_be_bytes());

    data
}

#[cfg(test)]
fn build_superframe() -> Vec<u8> {
    use reed_solomon::Encoder;

    Encoder::new(RS_PARITY_LEN)
        .encode(&build_superframe_data())
        .to_vec()
}

#[test]
fn decodes_clean_superframe() -> Result<(), SuperframeError> {
    let mut decoder = SuperframeDecoder::new(1);
    let sf = build_superframe();

    // half a superframe is not enough
    assert!(decoder.push(&sf[..60])?.is_none());

    let superframe = decoder.push(&sf[60..])?.expect("superframe");
    assert_eq!(superframe.header.num_aus, 4);
    assert!(!superframe.header.dac_rate);
    assert_eq!(superframe.rs_corrections, 0);
    assert_eq!(superframe.aus.len(), 4);
    assert_eq!(superframe.aus[0].len(), 24);
    assert_eq!(superframe.aus[3].len(), 22);
    assert!(superframe.aus[1].iter().all(|&b| b == 6));

    Ok(())
}

#[test]
fn corrects_byte_errors_with_rs() -> Result<(), SuperframeError> {
    let mut decoder = SuperframeDecoder::new(1);
    let mut sf = build_superframe();

    // corrupt a payload byte past the header so sync still works
    sf[40] ^= 0xA5;

    let superframe = decoder.push(&sf)?.expect("superframe");
    assert_eq!(superframe.rs_corrections, 1);
    assert!(superframe.aus[1].iter().all(|&b| b == 6));

    Ok(())
}

#[test]
fn skips_garbage_before_the_header() -> Result<(), SuperframeError> {
    let mut decoder = SuperframeDecoder::new(1);
    let sf = build_superframe();

    let mut stream = vec![0x00u8; 17];
    stream.extend_from_slice(&sf);

    let superframe = decoder.push(&stream)?.expect("superframe");
    assert_eq!(superframe.aus.len(), 4);

    Ok(())
}

#[test]
fn discards_failed_superframe_and_resyncs() -> Result<(), SuperframeError> {
    use reed_solomon::Encoder;

    let mut decoder = SuperframeDecoder::new(1);

    // break AU 0's checksum before the RS encode so the corruption
    // survives correction
    let mut data = build_superframe_data();
    data[33] ^= 0xFF;
    let bad = Encoder::new(RS_PARITY_LEN).encode(&data).to_vec();

    assert!(matches!(
        decoder.push(&bad),
        Err(SuperframeError::AuCrcMismatch { index: 0, .. })
    ));

    // the failed superframe was dropped, the next clean one decodes
    let sf = build_superframe();
    assert!(decoder.push(&sf[..60])?.is_none());
    let superframe = decoder.push(&sf[60..])?.expect("superframe");
    assert_eq!(superframe.aus.len(), 4);

    Ok(())
}

#[test]
fn reports_when_no_firecode_matches() {
    let mut decoder = SuperframeDecoder::new(1);

    let result = decoder.push(&[0x55u8; 240]);
    assert!(matches!(
        result,
        Err(SuperframeError::FirecodeNotFound(240))
    ));

    // the buffer was dropped, pushing a clean superframe still works
    let sf = build_superframe();
    assert!(decoder.push(&sf).unwrap().is_some());
}
