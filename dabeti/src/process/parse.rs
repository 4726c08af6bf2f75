use anyhow::Result;

use crate::log_or_err;
use crate::process::extract::{ETI_NI_FRAME_SIZE, EtiFrame};
use crate::structs::frame::{FrameCharacterization, StreamCharacterization, Tist};
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::crc::{CRC_CCITT_ALG, Crc16};
use crate::utils::errors::FrameError;

const SYNC_PHASE0: u32 = 0x07_3AB6;
const SYNC_PHASE1: u32 = 0xF8_C549;

/// Parses 6144 byte ETI frames into their LIDATA fields.
///
/// Checks the ERR byte, FSYNC alternation, FCT continuity and both the
/// header and EOF CRCs, then slices out the FIC and the per-stream MST
/// payloads.
#[derive(Default)]
pub struct Parser {
    state: ParserState,
}

impl Parser {
    pub fn parse(&mut self, frame: &EtiFrame) -> Result<ParsedFrame> {
        ParsedFrame::read(&mut self.state, frame.as_ref())
    }

    /// Sets the failure level for validation errors.
    ///
    /// - `log::Level::Error`: Only fail on Error level messages (default)
    /// - `log::Level::Warn`: Fail on Warning level and above (strict mode)
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.state.fail_level = level;
    }

    /// Keep going when the ERR byte flags a corrupted frame.
    pub fn set_ignore_error(&mut self, ignore: bool) {
        self.state.ignore_error = ignore;
    }
}

#[derive(Debug)]
pub struct ParserState {
    pub fail_level: log::Level,
    pub ignore_error: bool,

    last_fct: Option<u8>,
    prev_sync: u32,
    crc: Crc16,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            fail_level: log::Level::Error,
            ignore_error: false,
            last_fct: None,
            prev_sync: 0,
            crc: Crc16::new(&CRC_CCITT_ALG),
        }
    }
}

/// One decoded LIDATA frame.
#[derive(Debug)]
pub struct ParsedFrame {
    pub fc: FrameCharacterization,
    pub streams: Vec<StreamCharacterization>,
    /// Multiplex Network Signalling Channel word from the EOH.
    pub mnsc: u16,
    pub header_crc_ok: bool,
    /// FIC bytes, a whole number of 32 byte FIBs (empty when FICF=0).
    pub fic: Vec<u8>,
    /// MST payload per stream, `streams[i].stream_len()` bytes each.
    pub stream_data: Vec<Vec<u8>>,
    pub eof_crc_ok: bool,
    pub tist: Tist,
}

impl ParsedFrame {
    fn read(state: &mut ParserState, p: &[u8]) -> Result<Self> {
        debug_assert_eq!(p.len(), ETI_NI_FRAME_SIZE);

        // ERR: 0xFF means no error condition on the link
        if p[0] != 0xFF {
            let err = FrameError::ErrByteSet(p[0]);
            if state.ignore_error {
                log::warn!("{err}");
            } else {
                log_or_err!(state, log::Level::Error, err);
            }
        }

        // FSYNC alternates between the two phases every frame
        let fsync = ((p[1] as u32) << 16) | ((p[2] as u32) << 8) | p[3] as u32;
        if state.prev_sync != 0 {
            let expect_alternation = state.prev_sync == SYNC_PHASE0 && fsync == SYNC_PHASE1
                || state.prev_sync == SYNC_PHASE1 && fsync == SYNC_PHASE0;
            if expect_alternation {
                state.prev_sync = fsync;
            } else {
                let err = FrameError::SyncNotAlternating {
                    read: fsync,
                    prev: state.prev_sync,
                };
                state.prev_sync = 0;
                log_or_err!(state, log::Level::Warn, err);
            }
        } else {
            state.prev_sync = fsync;
        }

        let mut reader = BsIoSliceReader::from_slice(&p[4..8]);
        let fc = FrameCharacterization::read(&mut reader)?;

        if let Some(last_fct) = state.last_fct {
            let expected = ((last_fct as u16 + 1) % 250) as u8;
            if fc.fct != expected {
                let err = FrameError::FctDiscontinuity {
                    read: fc.fct,
                    expected,
                };
                log_or_err!(state, log::Level::Warn, err);
            }
        }
        state.last_fct = Some(fc.fct);

        let nst = fc.nst;
        let eoh_end = 8 + 4 * nst + 4;
        if eoh_end > ETI_NI_FRAME_SIZE {
            return Err(FrameError::LayoutOverrun(format!(
                "EOH would end at {eoh_end} with NST={nst}"
            ))
            .into());
        }

        let mut reader = BsIoSliceReader::from_slice(&p[8..8 + 4 * nst]);
        let mut streams = Vec::with_capacity(nst);
        for _ in 0..nst {
            streams.push(StreamCharacterization::read(&mut reader)?);
        }

        // EOH
        let mnsc = u16::from_be_bytes([p[8 + 4 * nst], p[8 + 4 * nst + 1]]);
        let header_crc = u16::from_be_bytes([p[8 + 4 * nst + 2], p[8 + 4 * nst + 3]]);
        let calculated = state.crc.complemented(&p[4..8 + 4 * nst + 2]);
        let header_crc_ok = calculated == header_crc;
        if !header_crc_ok {
            let err = FrameError::HeaderCrcMismatch {
                calculated,
                read: header_crc,
            };
            log_or_err!(state, log::Level::Warn, err);
        }

        // MST: FIC first, then the stream payloads
        let fic_len = fc.fic_len();
        let mst_start = 12 + 4 * nst;
        let mst_len: usize = streams.iter().map(|s| s.stream_len()).sum();

        // FL counts the STC, EOH, FIC and MST in 32 bit words
        let expected_fl = (nst + 1 + (fic_len + mst_len) / 4) as u16;
        if fc.fl != expected_fl {
            let err = FrameError::InvalidFrameLength {
                fl: fc.fl,
                expected: expected_fl,
            };
            log_or_err!(state, log::Level::Warn, err);
        }

        let eof_start = mst_start + fic_len + mst_len;
        if eof_start + 8 > ETI_NI_FRAME_SIZE {
            return Err(FrameError::LayoutOverrun(format!(
                "EOF would start at {eof_start} with FIC {fic_len} and MST {mst_len} bytes"
            ))
            .into());
        }

        let fic = p[mst_start..mst_start + fic_len].to_vec();

        let mut stream_data = Vec::with_capacity(nst);
        let mut offset = mst_start + fic_len;
        for stream in &streams {
            stream_data.push(p[offset..offset + stream.stream_len()].to_vec());
            offset += stream.stream_len();
        }

        // EOF: CRC over FIC and MST, then two RFU bytes
        let eof_crc = u16::from_be_bytes([p[eof_start], p[eof_start + 1]]);
        let calculated = state.crc.complemented(&p[mst_start..eof_start]);
        let eof_crc_ok = calculated == eof_crc;
        if !eof_crc_ok {
            let err = FrameError::EofCrcMismatch {
                calculated,
                read: eof_crc,
            };
            log_or_err!(state, log::Level::Warn, err);
        }

        let tist_ix = eof_start + 4;
        let tist = Tist {
            raw: u32::from_be_bytes([
                p[tist_ix],
                p[tist_ix + 1],
                p[tist_ix + 2],
                p[tist_ix + 3],
            ]),
        };

        Ok(Self {
            fc,
            streams,
            mnsc,
            header_crc_ok,
            fic,
            stream_data,
            eof_crc_ok,
            tist,
        })
    }
}

#[cfg(test)]
pub(crate) fn build_test_frame(fct: u8, phase: usize, fib_payload: Option<&[u8; 30]>) -> EtiFrame {
    use std::sync::Arc;

    let crc = Crc16::new(&CRC_CCITT_ALG);
    let mut p = vec![0x55u8; ETI_NI_FRAME_SIZE];

    p[0] = 0xFF;
    let fsync: &[u8] = if phase % 2 == 0 {
        &[0x07, 0x3A, 0xB6]
    } else {
        &[0xF8, 0xC5, 0x49]
    };
    p[1..4].copy_from_slice(fsync);

    // FC: FICF=1, NST=1, FP=0, MID=1, FL = (1 STC + 1 EOH + 24 FIC words + 6 MST words)
    let nst = 1usize;
    let stl = 3u16; // 24 bytes of MST
    let fl: u16 = (nst + 1 + 24 + stl as usize * 2) as u16;
    p[4] = fct;
    p[5] = 0x80 | nst as u8;
    p[6] = 0x08 | (fl >> 8) as u8;
    p[7] = (fl & 0xFF) as u8;

    // STC: SCID=5, SAD=0x54, TPL=EEP 3-A (0x22), STL=3
    p[8] = (5 << 2) | 0x00;
    p[9] = 0x54;
    p[10] = (0x22 << 2) | ((stl >> 8) as u8 & 0x03);
    p[11] = (stl & 0xFF) as u8;

    // EOH: MNSC + header CRC
    p[12] = 0x12;
    p[13] = 0x34;
    let header_crc = !crc.update(crc.init, &p[4..14]);
    p[14..16].copy_from_slice(&header_crc.to_be_bytes());

    // FIC: three FIBs, first one optionally carrying a payload
    let mst_start = 12 + 4 * nst;
    for fib in 0..3 {
        let start = mst_start + 32 * fib;
        let body: [u8; 30] = match (fib, fib_payload) {
            (0, Some(payload)) => *payload,
            _ => {
                let mut empty = [0xFFu8; 30];
                empty[0] = 0xFF; // end marker
                empty
            }
        };
        p[start..start + 30].copy_from_slice(&body);
        let fib_crc = !crc.update(crc.init, &body);
        p[start + 30..start + 32].copy_from_slice(&fib_crc.to_be_bytes());
    }

    // MST stream payload
    let data_start = mst_start + 96;
    for (i, byte) in p[data_start..data_start + 24].iter_mut().enumerate() {
        *byte = i as u8;
    }

    // EOF + TIST
    let eof_start = data_start + 24;
    let eof_crc = !crc.update(crc.init, &p[mst_start..eof_start]);
    p[eof_start..eof_start + 2].copy_from_slice(&eof_crc.to_be_bytes());
    p[eof_start + 2] = 0xFF;
    p[eof_start + 3] = 0xFF;
    p[eof_start + 4..eof_start + 8].copy_from_slice(&0x0000_4000u32.to_be_bytes());

    EtiFrame {
        data: Arc::from(p.into_boxed_slice()),
    }
}

#[test]
fn parse_synthetic_frame() -> Result<()> {
    let mut parser = Parser::default();
    let frame = build_test_frame(0, 0, None);

    let parsed = parser.parse(&frame)?;
    assert_eq!(parsed.fc.fct, 0);
    assert_eq!(parsed.fc.nst, 1);
    assert_eq!(parsed.fc.fic_len(), 96);
    assert_eq!(parsed.streams[0].scid, 5);
    assert_eq!(parsed.streams[0].sad, 0x54);
    assert_eq!(parsed.streams[0].stream_len(), 24);
    assert_eq!(parsed.mnsc, 0x1234);
    assert!(parsed.header_crc_ok);
    assert!(parsed.eof_crc_ok);
    assert_eq!(parsed.fic.len(), 96);
    assert_eq!(parsed.stream_data[0][3], 3);
    assert_eq!(parsed.tist.milliseconds(), 1.0);

    Ok(())
}

#[test]
fn fct_must_wrap_at_250() -> Result<()> {
    let mut parser = Parser::default();

    parser.parse(&build_test_frame(249, 0, None))?;
    // 249 wraps to 0, phases keep alternating
    parser.parse(&build_test_frame(0, 1, None))?;

    // In strict mode a discontinuity is fatal
    parser.set_fail_level(log::Level::Warn);
    assert!(parser.parse(&build_test_frame(7, 0, None)).is_err());

    Ok(())
}

#[test]
fn err_byte_aborts_unless_ignored() {
    let mut parser = Parser::default();
    let frame = build_test_frame(0, 0, None);

    let mut corrupted = frame.as_ref().to_vec();
    corrupted[0] = 0x0F;
    let corrupted = EtiFrame {
        data: corrupted.into(),
    };

    assert!(parser.parse(&corrupted).is_err());

    let mut parser = Parser::default();
    parser.set_ignore_error(true);
    assert!(parser.parse(&corrupted).is_ok());
}

#[test]
fn frame_length_mismatch_is_reported() {
    let mut parser = Parser::default();
    parser.set_fail_level(log::Level::Warn);

    let frame = build_test_frame(0, 0, None);
    let mut tampered = frame.as_ref().to_vec();

    // FL one word short, header CRC recomputed so only FL disagrees
    // with the layout
    let fl = (((tampered[6] & 0x07) as u16) << 8 | tampered[7] as u16) - 1;
    tampered[6] = (tampered[6] & 0xF8) | (fl >> 8) as u8;
    tampered[7] = (fl & 0xFF) as u8;
    let crc = Crc16::new(&CRC_CCITT_ALG);
    let header_crc = !crc.update(crc.init, &tampered[4..14]);
    tampered[14..16].copy_from_slice(&header_crc.to_be_bytes());

    let tampered = EtiFrame {
        data: tampered.into(),
    };
    let err = parser.parse(&tampered).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FrameError>(),
        Some(FrameError::InvalidFrameLength { fl: 31, expected: 32 })
    ));
}

#[test]
fn header_crc_mismatch_is_reported() -> Result<()> {
    let mut parser = Parser::default();
    let frame = build_test_frame(0, 0, None);

    let mut tampered = frame.as_ref().to_vec();
    tampered[12] ^= 0x01; // MNSC byte, covered by the header CRC
    let tampered = EtiFrame {
        data: tampered.into(),
    };

    let parsed = parser.parse(&tampered)?;
    assert!(!parsed.header_crc_ok);

    Ok(())
}
