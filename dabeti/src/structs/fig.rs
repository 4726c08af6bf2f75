//! Common FIG structures shared by the type 0, 1 and 2 decoders.

/// One line of decoded FIG output, with a nesting depth for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FigMessage {
    pub indent: usize,
    pub text: String,
}

/// Result of decoding a single FIG.
///
/// `complete` reports that the carousel has come full circle for this
/// FIG: a key already seen before the tracker was last cleared showed
/// up again.
#[derive(Debug, Default)]
pub struct FigResult {
    pub msgs: Vec<FigMessage>,
    pub errors: Vec<String>,
    pub complete: bool,
}

impl FigResult {
    pub fn msg(&mut self, indent: usize, text: impl Into<String>) {
        self.msgs.push(FigMessage {
            indent,
            text: text.into(),
        });
    }

    pub fn err(&mut self, text: impl Into<String>) {
        self.errors.push(text.into());
    }
}

/// FIG type 0 header and payload (EN 300 401 5.2.2.1).
#[derive(Debug, Clone, Copy)]
pub struct Fig0<'a> {
    /// Current/Next flag.
    pub cn: bool,
    /// Other Ensemble flag.
    pub oe: bool,
    /// Programme/Data flag, switches between 16 and 32 bit SIds.
    pub pd: bool,
    pub ext: u8,
    /// Whether the owning FIB passed its CRC; the database is only
    /// mutated when it did.
    pub crc_ok: bool,
    /// FIG data field including the header byte, as the extension
    /// decoders index it.
    pub f: &'a [u8],
}

impl<'a> Fig0<'a> {
    pub fn new(f: &'a [u8], crc_ok: bool) -> Self {
        Self {
            cn: f[0] & 0x80 != 0,
            oe: f[0] & 0x40 != 0,
            pd: f[0] & 0x20 != 0,
            ext: f[0] & 0x1F,
            crc_ok,
            f,
        }
    }

    pub fn figlen(&self) -> usize {
        self.f.len()
    }
}

/// FIG type 1 header (EN 300 401 5.2.2.2).
#[derive(Debug, Clone, Copy)]
pub struct Fig1<'a> {
    pub charset: u8,
    pub oe: bool,
    pub ext: u8,
    pub crc_ok: bool,
    pub f: &'a [u8],
}

impl<'a> Fig1<'a> {
    pub fn new(f: &'a [u8], crc_ok: bool) -> Self {
        Self {
            charset: (f[0] & 0xF0) >> 4,
            oe: f[0] & 0x08 != 0,
            ext: f[0] & 0x07,
            crc_ok,
            f,
        }
    }

    pub fn figlen(&self) -> usize {
        self.f.len()
    }
}

/// FIG type 2 header (EN 300 401 V2 5.2.2.3).
#[derive(Debug, Clone, Copy)]
pub struct Fig2<'a> {
    pub toggle_flag: bool,
    pub segment_index: u8,
    pub rfu: u8,
    pub ext: u8,
    pub crc_ok: bool,
    pub f: &'a [u8],
}

impl<'a> Fig2<'a> {
    pub fn new(f: &'a [u8], crc_ok: bool) -> Self {
        Self {
            toggle_flag: f[0] & 0x80 != 0,
            segment_index: (f[0] & 0x70) >> 4,
            rfu: (f[0] & 0x08) >> 3,
            ext: f[0] & 0x07,
            crc_ok,
            f,
        }
    }

    pub fn figlen(&self) -> usize {
        self.f.len()
    }
}

#[test]
fn fig0_header_bits() {
    let data = [0b1010_0001u8, 0x00];
    let fig0 = Fig0::new(&data, true);

    assert!(fig0.cn);
    assert!(!fig0.oe);
    assert!(fig0.pd);
    assert_eq!(fig0.ext, 1);
    assert_eq!(fig0.figlen(), 2);
}

#[test]
fn fig2_header_bits() {
    let data = [0b1011_0101u8];
    let fig2 = Fig2::new(&data, true);

    assert!(fig2.toggle_flag);
    assert_eq!(fig2.segment_index, 3);
    assert_eq!(fig2.rfu, 0);
    assert_eq!(fig2.ext, 5);
}
