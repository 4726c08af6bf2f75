//! Label character set handling.
//!
//! FIG1 labels use the complete EBU Latin based repertoire
//! (TS 101 756 Annex C); FIG2 labels are UTF-8 or UCS-2.

/// Character set identifiers carried in FIG1 and FIG2 headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CharacterSet {
    EbuLatin,
    Ucs2,
    Utf8,
    #[default]
    Undefined,
}

#[rustfmt::skip]
const EBU_LATIN: [&str; 256] = [
    "\u{0}", "\u{0118}", "\u{012E}", "\u{0172}", "\u{0102}", "\u{0116}", "\u{010E}", "\u{0218}",
    "\u{021A}", "\u{010A}", "\n", "\u{B}", "\u{0120}", "\u{0139}", "\u{017B}", "\u{0143}",
    "\u{0105}", "\u{0119}", "\u{012F}", "\u{0173}", "\u{0103}", "\u{0117}", "\u{010F}", "\u{0219}",
    "\u{021B}", "\u{010B}", "\u{0147}", "\u{011A}", "\u{0121}", "\u{013A}", "\u{017C}", "\r",
    " ", "!", "\"", "#", "\u{0142}", "%", "&", "'",
    "(", ")", "*", "+", ",", "-", ".", "/",
    "0", "1", "2", "3", "4", "5", "6", "7",
    "8", "9", ":", ";", "<", "=", ">", "?",
    "@", "A", "B", "C", "D", "E", "F", "G",
    "H", "I", "J", "K", "L", "M", "N", "O",
    "P", "Q", "R", "S", "T", "U", "V", "W",
    "X", "Y", "Z", "[", "\u{016E}", "]", "\u{0141}", "_",
    "\u{0104}", "a", "b", "c", "d", "e", "f", "g",
    "h", "i", "j", "k", "l", "m", "n", "o",
    "p", "q", "r", "s", "t", "u", "v", "w",
    "x", "y", "z", "\u{AB}", "\u{016F}", "\u{BB}", "\u{013D}", "\u{0126}",
    "\u{E1}", "\u{E0}", "\u{E9}", "\u{E8}", "\u{ED}", "\u{EC}", "\u{F3}", "\u{F2}",
    "\u{FA}", "\u{F9}", "\u{D1}", "\u{C7}", "\u{015E}", "\u{DF}", "\u{A1}", "\u{0178}",
    "\u{E2}", "\u{E4}", "\u{EA}", "\u{EB}", "\u{EE}", "\u{EF}", "\u{F4}", "\u{F6}",
    "\u{FB}", "\u{FC}", "\u{F1}", "\u{E7}", "\u{015F}", "\u{011F}", "\u{0131}", "\u{FF}",
    "\u{0136}", "\u{0145}", "\u{A9}", "\u{0122}", "\u{011E}", "\u{011B}", "\u{0148}", "\u{0151}",
    "\u{0150}", "\u{20AC}", "\u{A3}", "$", "\u{0100}", "\u{0112}", "\u{012A}", "\u{016A}",
    "\u{0137}", "\u{0146}", "\u{013B}", "\u{0123}", "\u{013C}", "\u{0130}", "\u{0144}", "\u{0171}",
    "\u{0170}", "\u{BF}", "\u{013E}", "\u{B0}", "\u{0101}", "\u{0113}", "\u{012B}", "\u{016B}",
    "\u{C1}", "\u{C0}", "\u{C9}", "\u{C8}", "\u{CD}", "\u{CC}", "\u{D3}", "\u{D2}",
    "\u{DA}", "\u{D9}", "\u{0158}", "\u{010C}", "\u{0160}", "\u{017D}", "\u{D0}", "\u{013F}",
    "\u{C2}", "\u{C4}", "\u{CA}", "\u{CB}", "\u{CE}", "\u{CF}", "\u{D4}", "\u{D6}",
    "\u{DB}", "\u{DC}", "\u{0159}", "\u{010D}", "\u{0161}", "\u{017E}", "\u{0111}", "\u{0140}",
    "\u{C3}", "\u{C5}", "\u{C6}", "\u{0152}", "\u{0177}", "\u{DD}", "\u{D5}", "\u{D8}",
    "\u{DE}", "\u{014A}", "\u{0154}", "\u{0106}", "\u{015A}", "\u{0179}", "\u{0164}", "\u{F0}",
    "\u{E3}", "\u{E5}", "\u{E6}", "\u{0153}", "\u{0175}", "\u{FD}", "\u{F5}", "\u{F8}",
    "\u{FE}", "\u{014B}", "\u{0155}", "\u{0107}", "\u{015B}", "\u{017A}", "\u{0165}", "\u{0127}",
];

/// Converts an EBU Latin byte string to UTF-8. Conversion stops at the
/// first NUL byte.
pub fn ebu_latin_to_utf8(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());

    for &byte in bytes {
        if byte == 0 {
            break;
        }
        out.push_str(EBU_LATIN[byte as usize]);
    }

    out
}

/// Decodes a big-endian UCS-2 byte string. Invalid code units are
/// replaced with U+2047.
pub fn ucs2_to_utf8(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() / 2);

    for pair in bytes.chunks_exact(2) {
        let unit = u16::from_be_bytes([pair[0], pair[1]]);
        if unit == 0 {
            break;
        }
        out.push(char::from_u32(unit as u32).unwrap_or('\u{2047}'));
    }

    out
}

/// Decodes a UTF-8 byte string, replacing invalid sequences.
pub fn utf8_lossy(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Applies the 16-bit short label mask: a set bit keeps the character
/// at that position, at most 8 characters.
pub fn flag_to_short_label(label: &str, flag: u16) -> String {
    label
        .chars()
        .enumerate()
        .filter(|(i, _)| *i < 16 && flag & (0x8000 >> i) != 0)
        .map(|(_, c)| c)
        .take(8)
        .collect()
}

#[test]
fn ascii_passthrough() {
    assert_eq!(ebu_latin_to_utf8(b"Radio 1"), "Radio 1");
}

#[test]
fn accented_characters() {
    assert_eq!(ebu_latin_to_utf8(&[0x82, 0x97]), "\u{E9}\u{F6}");
    assert_eq!(ebu_latin_to_utf8(&[0xA9]), "\u{20AC}");
}

#[test]
fn short_label_mask() {
    // keep "DAB" out of "DAB Radio 1     "
    assert_eq!(flag_to_short_label("DAB Radio 1     ", 0xE000), "DAB");
    assert_eq!(flag_to_short_label("Sunshine Radio  ", 0xFF00), "Sunshine");
}

#[test]
fn ucs2_decode() {
    assert_eq!(ucs2_to_utf8(&[0x00, 0x44, 0x00, 0x41, 0x00, 0x42]), "DAB");
}
