//! Fast Information Channel decoding.
//!
//! The FIC is carried at the start of the MST as a sequence of 32 byte
//! FIBs, each protected by a CRC and packed with FIGs. The decoder
//! keeps the ensemble database, the FIG repetition statistics and the
//! watermark decoder across frames.

pub mod charset;
pub mod database;
pub mod fig0;
pub mod fig1;
pub mod fig2;
pub mod rates;
pub mod tables;
pub mod watermark;

use database::Ensemble;
use fig0::Fig0State;
use rates::RateStatistics;
use watermark::WatermarkDecoder;

use crate::structs::fig::{Fig0, Fig1, Fig2, FigResult};
use crate::utils::crc::{CRC_CCITT_ALG, Crc16};
use crate::utils::errors::FicError;

pub const FIB_SIZE: usize = 32;

/// One decoded FIG together with its header description.
#[derive(Debug)]
pub struct DecodedFig {
    pub figtype: u8,
    pub ext: u8,
    pub len: usize,
    /// Rendering of the FIG header fields, e.g. "C/N=0 OE=0 P/D=0".
    pub header: String,
    pub result: FigResult,
}

#[derive(Debug)]
pub struct FibReport {
    pub index: u8,
    pub crc_ok: bool,
    pub figs: Vec<DecodedFig>,
}

#[derive(Debug)]
pub struct FicReport {
    pub fibs: Vec<FibReport>,
}

/// Carousel occupancy display, one row of FIGs per FIB.
#[derive(Debug, Default)]
struct Figalyser {
    figs: [Vec<(u8, u8, usize)>; 4],
    current_fib: usize,
}

impl Figalyser {
    fn set_fib(&mut self, fib: usize) {
        self.current_fib = fib & 0x03;
    }

    fn push(&mut self, figtype: u8, ext: u8, len: usize) {
        self.figs[self.current_fib].push((figtype, ext, len));
    }

    fn analyse(&self, mid: u8) -> String {
        let num_fibs = if mid == 3 { 4 } else { 3 };
        let mut line = String::from("FIC ");

        for (fib, figs) in self.figs.iter().take(num_fibs).enumerate() {
            let mut consumed = 7;
            let mut fic_size = 0;
            line += &format!("[{fib} ");

            for &(figtype, ext, len) in figs {
                line += &format!("{figtype:01}/{ext:02} ({len:2}) ");
                consumed += 10;
                fic_size += len;
            }

            line.push(' ');
            for _ in 0..60usize.saturating_sub(consumed) {
                line.push(' ');
            }

            line.push('|');
            for i in 0..15 {
                line.push(if 2 * i < fic_size { '#' } else { '-' });
            }
            line += "| ]   ";
        }

        line
    }

    fn clear(&mut self) {
        for figs in &mut self.figs {
            figs.clear();
        }
    }
}

/// Decodes FIC data frame by frame, accumulating ensemble state.
pub struct FicDecoder {
    pub ensemble: Ensemble,
    pub wm_decoder: WatermarkDecoder,
    pub rates: RateStatistics,
    fig0_state: Fig0State,
    figalyser: Figalyser,
    mode_identity: u8,
    crc: Crc16,
}

impl Default for FicDecoder {
    fn default() -> Self {
        Self {
            ensemble: Ensemble::default(),
            wm_decoder: WatermarkDecoder::new(),
            rates: RateStatistics::new(),
            fig0_state: Fig0State::new(),
            figalyser: Figalyser::default(),
            mode_identity: 0,
            crc: Crc16::new(&CRC_CCITT_ALG),
        }
    }
}

impl FicDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// MID from the LIDATA FC, needed for the TII identifier range
    /// checks and the FIB count.
    pub fn set_mode_identity(&mut self, mid: u8) {
        self.mode_identity = mid;
        self.fig0_state.set_mode_identity(mid);
    }

    /// Decodes the FIC data of one frame, a whole number of FIBs.
    pub fn process_fic(&mut self, fic: &[u8]) -> Result<FicReport, FicError> {
        if fic.len() % FIB_SIZE != 0 {
            return Err(FicError::UnalignedFicLength(fic.len()));
        }

        self.figalyser.clear();
        let mut fibs = Vec::with_capacity(fic.len() / FIB_SIZE);

        for (index, fib) in fic.chunks_exact(FIB_SIZE).enumerate() {
            self.figalyser.set_fib(index);
            self.rates.new_fib(index as u8);

            let fib_crc = u16::from_be_bytes([fib[30], fib[31]]);
            let calculated = self.crc.complemented(&fib[..30]);
            let crc_ok = calculated == fib_crc;
            if !crc_ok {
                log::warn!(
                    "{}",
                    FicError::FibCrcMismatch {
                        calculated,
                        read: fib_crc,
                    }
                );
            }

            let figs = self.decode_fib(fib, crc_ok)?;
            fibs.push(FibReport {
                index: index as u8,
                crc_ok,
                figs,
            });
        }

        Ok(FicReport { fibs })
    }

    fn decode_fib(&mut self, fib: &[u8], crc_ok: bool) -> Result<Vec<DecodedFig>, FicError> {
        let mut figs = Vec::new();
        let mut pos = 0;

        while pos < 29 {
            let figtype = (fib[pos] & 0xE0) >> 5;
            if figtype == 7 {
                // end marker
                break;
            }
            let figlen = (fib[pos] & 0x1F) as usize;
            if figlen == 0 {
                break;
            }
            if pos + 1 + figlen > 30 {
                return Err(FicError::FigOverrun {
                    figtype,
                    ext: fib[pos + 1] & 0x1F,
                    len: figlen,
                });
            }

            let f = &fib[pos + 1..pos + 1 + figlen];
            figs.push(self.decode_fig(figtype, figlen, f, crc_ok));
            pos += figlen + 1;
        }

        Ok(figs)
    }

    fn decode_fig(&mut self, figtype: u8, figlen: usize, f: &[u8], crc_ok: bool) -> DecodedFig {
        let (ext, header, result) = match figtype {
            0 => {
                let fig0 = Fig0::new(f, crc_ok);
                let header = format!(
                    "C/N={} OE={} P/D={}",
                    fig0.cn as u8, fig0.oe as u8, fig0.pd as u8
                );
                let result = fig0::fig0_select(
                    &fig0,
                    &mut self.fig0_state,
                    &mut self.ensemble,
                    &mut self.wm_decoder,
                );
                (fig0.ext, header, result)
            }
            1 => {
                let fig1 = Fig1::new(f, crc_ok);
                let header = format!("OE={}", fig1.oe as u8);
                let result = fig1::fig1_select(&fig1, &mut self.ensemble);
                (fig1.ext, header, result)
            }
            2 => {
                let fig2 = Fig2::new(f, crc_ok);
                let header = format!(
                    "Toggle flag={}, Segment_index={}",
                    fig2.toggle_flag as u8, fig2.segment_index
                );
                let result = fig2::fig2_select(&fig2, &mut self.ensemble);
                (fig2.ext, header, result)
            }
            5 => {
                // FIDC
                let d1 = (f[0] & 0x80) >> 7;
                let d2 = (f[0] & 0x40) >> 6;
                let tcid = (f[0] & 0x38) >> 3;
                let ext = f[0] & 0x07;
                let header = format!("D1={d1}, D2={d2}, TCId={tcid}");
                let mut result = FigResult::default();
                result.complete = true;
                (ext, header, result)
            }
            6 => {
                let mut result = FigResult::default();
                result.err("unsupported FIG 6 (Conditional access)");
                return DecodedFig {
                    figtype,
                    ext: 0,
                    len: figlen,
                    header: String::new(),
                    result,
                };
            }
            _ => {
                let mut result = FigResult::default();
                result.err(format!("unknown FIG {figtype}"));
                return DecodedFig {
                    figtype,
                    ext: 0,
                    len: figlen,
                    header: String::new(),
                    result,
                };
            }
        };

        self.figalyser.push(figtype, ext, figlen);
        self.rates.announce_fig(figtype, ext, result.complete);

        DecodedFig {
            figtype,
            ext,
            len: figlen,
            header,
            result,
        }
    }

    /// Renders the FIG occupancy of the last processed frame.
    pub fn carousel_occupancy(&self) -> String {
        self.figalyser.analyse(self.mode_identity)
    }

    /// Clears the change tracking databases at the end of a run.
    pub fn clear_change_db(&mut self) {
        self.fig0_state.clear_change_db();
    }
}

#[cfg(test)]
fn build_fib_typed(figs: &[(u8, &[u8])]) -> Vec<u8> {
    let crc = Crc16::new(&CRC_CCITT_ALG);
    let mut fib = vec![0xFFu8; FIB_SIZE];

    let mut pos = 0;
    for (figtype, fig) in figs {
        fib[pos] = (figtype << 5) | fig.len() as u8;
        fib[pos + 1..pos + 1 + fig.len()].copy_from_slice(fig);
        pos += fig.len() + 1;
    }

    let checksum = crc.complemented(&fib[..30]);
    fib[30..].copy_from_slice(&checksum.to_be_bytes());
    fib
}

#[test]
fn decodes_fig0_0_from_fib() -> Result<(), FicError> {
    let mut decoder = FicDecoder::new();

    // FIG 0/0 with EId 0xD999
    let fib = build_fib_typed(&[(0, &[0x00, 0xD9, 0x99, 0x00, 0x07])]);
    let report = decoder.process_fic(&fib)?;

    assert_eq!(report.fibs.len(), 1);
    assert!(report.fibs[0].crc_ok);
    assert_eq!(report.fibs[0].figs.len(), 1);
    assert_eq!(report.fibs[0].figs[0].figtype, 0);
    assert_eq!(report.fibs[0].figs[0].ext, 0);
    assert_eq!(decoder.ensemble.eid, 0xD999);

    Ok(())
}

#[test]
fn corrupted_fib_reports_but_keeps_database_untouched() -> Result<(), FicError> {
    let mut decoder = FicDecoder::new();

    let mut fib = build_fib_typed(&[(0, &[0x00, 0xD9, 0x99, 0x00, 0x07])]);
    fib[31] ^= 0xFF;
    let report = decoder.process_fic(&fib)?;

    assert!(!report.fibs[0].crc_ok);
    // still decoded and reported
    assert_eq!(report.fibs[0].figs.len(), 1);
    // but the database stays unchanged
    assert_eq!(decoder.ensemble.eid, 0);

    Ok(())
}

#[test]
fn unaligned_fic_is_rejected() {
    let mut decoder = FicDecoder::new();
    assert!(matches!(
        decoder.process_fic(&[0u8; 33]),
        Err(FicError::UnalignedFicLength(33))
    ));
}

#[test]
fn overrunning_fig_is_rejected() {
    let mut decoder = FicDecoder::new();
    let crc = Crc16::new(&CRC_CCITT_ALG);

    // FIG claiming 31 bytes of data cannot fit a 30 byte FIB body
    let mut fib = vec![0xFFu8; FIB_SIZE];
    fib[0] = 0x1F;
    let checksum = crc.complemented(&fib[..30]);
    fib[30..].copy_from_slice(&checksum.to_be_bytes());

    assert!(matches!(
        decoder.process_fic(&fib),
        Err(FicError::FigOverrun { .. })
    ));
}

#[test]
fn carousel_occupancy_renders_bars() -> Result<(), FicError> {
    let mut decoder = FicDecoder::new();
    decoder.set_mode_identity(1);

    let fib = build_fib_typed(&[(0, &[0x00, 0xD9, 0x99, 0x00, 0x07])]);
    let mut fic = fib.clone();
    fic.extend_from_slice(&build_fib_typed(&[]));
    fic.extend_from_slice(&build_fib_typed(&[]));
    decoder.process_fic(&fic)?;

    let line = decoder.carousel_occupancy();
    assert!(line.starts_with("FIC [0 0/00 ( 5) "));
    assert!(line.contains("|###------------| ]"));

    Ok(())
}
