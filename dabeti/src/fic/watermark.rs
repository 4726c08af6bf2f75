//! Multiplexer watermark extraction.
//!
//! Some multiplexers hide an ASCII identification string in the FIC:
//! newer versions encode it in the ordering of FIG 0/1 subchannels,
//! older ones in the ConfInd bit of FIG 0/10. The payload is preceded
//! by a 0x55 0x55 sync pattern and sent at one bit every other
//! occurrence.

#[derive(Debug, Default)]
pub struct WatermarkDecoder {
    fig0_1_bits: Vec<bool>,
    confind_bits: Vec<bool>,
}

fn calc_watermark(bits: &[bool]) -> String {
    // Look for the sync pattern, 16 alternating bits
    let mut alternance_count = 0usize;
    let mut last_bit = true;
    let mut bit_ix = 0usize;

    while bit_ix < bits.len() {
        if alternance_count == 16 {
            break;
        }
        if last_bit != bits[bit_ix] {
            last_bit = bits[bit_ix];
            alternance_count += 1;
        } else {
            alternance_count = 0;
            last_bit = true;
        }
        bit_ix += 1;
    }

    if bit_ix >= bits.len() {
        return String::new();
    }

    log::debug!(
        "watermark sync at bit {} out of {}",
        bit_ix - alternance_count,
        bits.len()
    );

    let mut watermark = String::new();
    let mut b = 0u8;
    let mut i = 0;

    while bit_ix < bits.len() {
        b |= (bits[bit_ix] as u8) << (7 - i);

        if i == 7 {
            watermark.push(b as char);
            b = 0;
            i = 0;
        } else {
            i += 1;
        }

        bit_ix += 2;
    }

    watermark
}

impl WatermarkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The order of FIG 0/1 subchannels carries the bits.
    pub fn push_fig0_1_bit(&mut self, bit: bool) {
        self.fig0_1_bits.push(bit);
    }

    /// The ConfInd of FIG 0/10 carries the old-style watermark.
    pub fn push_confind_bit(&mut self, confind: bool) {
        self.confind_bits.push(confind);
    }

    pub fn calculate_watermark(&self) -> String {
        let w_new = calc_watermark(&self.fig0_1_bits);
        let w_old = calc_watermark(&self.confind_bits);

        if !w_new.is_empty() {
            w_new
        } else if !w_old.is_empty() {
            format!("{w_old} (old watermark)")
        } else {
            "(NOT FOUND)".to_owned()
        }
    }
}

#[cfg(test)]
fn push_message(decoder: &mut WatermarkDecoder, message: &str) {
    // sync pattern, then each payload bit twice so that the stride-2
    // read sees it once
    for i in 0..16 {
        decoder.push_confind_bit(i % 2 == 1);
    }
    for byte in message.bytes() {
        for bit in (0..8).rev() {
            let value = byte & (1 << bit) != 0;
            decoder.push_confind_bit(value);
            decoder.push_confind_bit(value);
        }
    }
}

#[test]
fn decodes_old_watermark() {
    let mut decoder = WatermarkDecoder::new();
    push_message(&mut decoder, "ODR");

    let watermark = decoder.calculate_watermark();
    assert!(watermark.starts_with("ODR"), "got {watermark:?}");
    assert!(watermark.ends_with("(old watermark)"));
}

#[test]
fn reports_missing_sync() {
    let mut decoder = WatermarkDecoder::new();
    for _ in 0..100 {
        decoder.push_fig0_1_bit(true);
    }

    assert_eq!(decoder.calculate_watermark(), "(NOT FOUND)");
}
