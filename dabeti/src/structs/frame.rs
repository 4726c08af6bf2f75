//! Fields of the ETI LIDATA structure (EN 300 799 5.3).

use std::io;

use crate::utils::bitstream_io::BsIoSliceReader;

/// FC - Frame Characterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCharacterization {
    /// Frame count, modulo 250.
    pub fct: u8,
    /// Fast Information Channel present.
    pub ficf: bool,
    /// Number of streams.
    pub nst: usize,
    /// Frame phase.
    pub fp: u8,
    /// Mode identity (1..4 transmission mode, 0 reserved).
    pub mid: u8,
    /// Frame length in words, covering STC, EOH and MST.
    pub fl: u16,
}

impl FrameCharacterization {
    pub fn read(reader: &mut BsIoSliceReader) -> io::Result<Self> {
        Ok(Self {
            fct: reader.get_n(8)?,
            ficf: reader.get()?,
            nst: reader.get_n::<u8>(7)? as usize,
            fp: reader.get_n(3)?,
            mid: reader.get_n(2)?,
            fl: reader.get_n(11)?,
        })
    }

    /// FIC length in bytes: none without FICF, 128 in transmission
    /// mode III, 96 otherwise.
    pub fn fic_len(&self) -> usize {
        if !self.ficf {
            0
        } else if self.mid == 3 {
            128
        } else {
            96
        }
    }
}

/// Sub-channel protection, decoded from the 6-bit TPL field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    Uep { table_switch: bool, index: u8 },
    Eep { option: u8, level: u8 },
}

impl Protection {
    pub fn from_tpl(tpl: u8) -> Self {
        if (tpl & 0x20) != 0 {
            Protection::Eep {
                option: (tpl & 0x1C) >> 2,
                level: tpl & 0x03,
            }
        } else {
            Protection::Uep {
                table_switch: (tpl & 0x08) != 0,
                index: tpl & 0x07,
            }
        }
    }

    /// Verbose rendering including code rate and CU overhead.
    pub fn describe(&self) -> String {
        match self {
            Protection::Eep { option, level } => {
                let detail = match (option, level) {
                    (0, 0) => "1-A, 1/4, 16 CUs",
                    (0, 1) => "2-A, 3/8, 8 CUs",
                    (0, 2) => "3-A, 1/2, 6 CUs",
                    (0, 3) => "4-A, 3/4, 4 CUs",
                    (1, 0) => "1-B, 4/9, 27 CUs",
                    (1, 1) => "2-B, 4/7, 21 CUs",
                    (1, 2) => "3-B, 4/6, 18 CUs",
                    (1, 3) => "4-B, 4/5, 15 CUs",
                    _ => return format!("Equal Error Protection. Unknown option {option}"),
                };
                format!("Equal Error Protection. {detail}")
            }
            Protection::Uep { table_switch, index } => format!(
                "Unequal Error Protection. Table switch {}, UEP index {}",
                *table_switch as u8, index
            ),
        }
    }

    /// Short rendering used by the statistics document.
    pub fn short_label(&self) -> String {
        match self {
            Protection::Eep { option: 0, level } => format!("EEP {}-A", level + 1),
            Protection::Eep { option: 1, level } => format!("EEP {}-B", level + 1),
            Protection::Eep { .. } => "unknown".to_owned(),
            Protection::Uep { table_switch, index } => format!(
                "UEP table switch {} index {}",
                *table_switch as u8, index
            ),
        }
    }
}

/// STC - Stream Characterization entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCharacterization {
    /// Sub-channel identifier.
    pub scid: u8,
    /// Sub-channel start address in CUs.
    pub sad: u16,
    /// Sub-channel type and protection level.
    pub tpl: u8,
    /// Stream length in multiples of 8 bytes.
    pub stl: u16,
}

impl StreamCharacterization {
    pub fn read(reader: &mut BsIoSliceReader) -> io::Result<Self> {
        Ok(Self {
            scid: reader.get_n(6)?,
            sad: reader.get_n(10)?,
            tpl: reader.get_n(6)?,
            stl: reader.get_n(10)?,
        })
    }

    pub fn protection(&self) -> Protection {
        Protection::from_tpl(self.tpl)
    }

    pub fn bitrate_kbps(&self) -> u32 {
        self.stl as u32 * 8 / 3
    }

    /// Number of bytes this stream carries per frame.
    pub fn stream_len(&self) -> usize {
        self.stl as usize * 8
    }

    /// RS interleaving index of a DAB+ sub-channel carried here.
    pub fn subchannel_index(&self) -> usize {
        self.stl as usize / 3
    }
}

/// TIST - Time Stamp. The lower 24 bits count 1/16384 ms units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tist {
    pub raw: u32,
}

impl Tist {
    pub fn milliseconds(&self) -> f64 {
        (self.raw & 0xFF_FFFF) as f64 / 16384.0
    }
}

#[test]
fn fc_fields() -> io::Result<()> {
    // FCT=7, FICF=1, NST=2, FP=4, MID=1, FL=0x10A
    let bytes = [0x07, 0x82, 0x89, 0x0A];
    let mut reader = BsIoSliceReader::from_slice(&bytes);
    let fc = FrameCharacterization::read(&mut reader)?;

    assert_eq!(fc.fct, 7);
    assert!(fc.ficf);
    assert_eq!(fc.nst, 2);
    assert_eq!(fc.fp, 4);
    assert_eq!(fc.mid, 1);
    assert_eq!(fc.fl, 0x10A);
    assert_eq!(fc.fic_len(), 96);

    Ok(())
}

#[test]
fn protection_rendering() {
    let eep = Protection::from_tpl(0x23);
    assert_eq!(
        eep,
        Protection::Eep {
            option: 0,
            level: 3
        }
    );
    assert_eq!(eep.describe(), "Equal Error Protection. 4-A, 3/4, 4 CUs");
    assert_eq!(eep.short_label(), "EEP 4-A");

    let uep = Protection::from_tpl(0x0B);
    assert_eq!(
        uep,
        Protection::Uep {
            table_switch: true,
            index: 3
        }
    );
}

#[test]
fn tist_scaling() {
    let tist = Tist { raw: 0x0100_4000 };
    assert_eq!(tist.milliseconds(), 1.0);
}
