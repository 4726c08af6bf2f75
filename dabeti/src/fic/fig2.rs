//! FIG type 2, extended labels (EN 300 401 V2 8.1.14).
//!
//! Extended labels are segmented. Segments accumulate in the database
//! until the full set is present, at which point the label can be
//! assembled. A change of the toggle flag discards everything
//! collected so far.

use crate::fic::charset::CharacterSet;
use crate::fic::database::{Ensemble, Label};
use crate::structs::fig::{Fig2, FigResult};

fn update_label_segment(fig2: &Fig2, label: &mut Label, segment: &[u8], r: &mut FigResult) {
    if label.toggle_flag != fig2.toggle_flag {
        label.segments.clear();
        label.extended_label_charset = CharacterSet::Undefined;
        label.toggle_flag = fig2.toggle_flag;
    }

    let mut segment = segment;

    if fig2.segment_index == 0 {
        if segment.is_empty() {
            r.err("FIG2 label length too short");
            return;
        }

        // first segment carries the encoding and segment count
        let encoding_flag = (segment[0] & 0x80) >> 7;
        let segment_count = ((segment[0] & 0x70) >> 4) + 1;

        if encoding_flag != 0 {
            label.extended_label_charset = CharacterSet::Ucs2;
            r.msg(1, "encoding=UCS-2");
        } else {
            label.extended_label_charset = CharacterSet::Utf8;
            r.msg(1, "encoding=UTF-8");
        }
        label.segment_count = segment_count;
        r.msg(1, format!("Total number of segments={segment_count}"));

        if fig2.rfu == 0 {
            let rfa = segment[0] & 0x0F;
            r.msg(1, format!("rfa={rfa}"));
            if segment.len() <= 3 {
                r.err("FIG2 label length too short");
                return;
            }
            let char_flag = u16::from_be_bytes([segment[1], segment[2]]);
            r.msg(1, format!("character flag={char_flag:04x}"));
            segment = &segment[3..];
        } else {
            let text_control = segment[0] & 0x0F;
            r.msg(1, format!("text control=0x{text_control:02x}"));
            if segment.len() <= 1 {
                r.err("FIG2 label length too short");
                return;
            }
            segment = &segment[1..];
        }
    }

    if fig2.crc_ok {
        label
            .segments
            .insert(fig2.segment_index, segment.to_vec());
    }

    r.msg(1, format!("Label segments=\"{}\"", label.assembly_state()));
    let assembled = label.assemble();
    if !assembled.is_empty() {
        r.msg(1, format!("Label=\"{assembled}\""));
    }
}

pub fn fig2_select(fig2: &Fig2, ensemble: &mut Ensemble) -> FigResult {
    let mut r = FigResult::default();
    let f = fig2.f;
    let figlen = fig2.figlen();

    r.msg(0, format!("toggle flag={}", fig2.toggle_flag as u8));
    r.msg(0, format!("segment index={}", fig2.segment_index));
    r.msg(0, format!("rfu={}", fig2.rfu));

    // identifier field length depends on the extension
    let identifier_len = match fig2.ext {
        0 | 1 => 3,
        4 | 6 => {
            let pd = (f.get(1).copied().unwrap_or(0) & 0x80) >> 7;
            if pd != 0 { 6 } else { 4 }
        }
        5 => 5,
        _ => {
            r.err(format!("unhandled extension FIG 2/{}", fig2.ext));
            r.complete = true;
            return r;
        }
    };

    if figlen <= identifier_len {
        r.err("FIG2 length error");
        r.complete = true;
        return r;
    }
    let segment = &f[identifier_len..];

    match fig2.ext {
        0 => {
            // Ensemble label
            let eid = u16::from_be_bytes([f[1], f[2]]);
            r.msg(1, format!("Ensemble ID=0x{eid:04X}"));
            update_label_segment(fig2, &mut ensemble.label, segment, &mut r);
        }
        1 => {
            // Programme service label
            let sid = u16::from_be_bytes([f[1], f[2]]) as u32;
            r.msg(1, format!("Service ID=0x{sid:04X}"));
            match ensemble.get_service(sid) {
                Some(service) => {
                    update_label_segment(fig2, &mut service.label, segment, &mut r)
                }
                None => r.err(format!("Service 0x{sid:X} Not yet in DB")),
            }
        }
        4 => {
            // Service component label
            let scids = f[1] & 0x0F;
            let pd = (f[1] & 0x80) >> 7 != 0;
            let sid = if pd {
                u32::from_be_bytes([f[2], f[3], f[4], f[5]])
            } else {
                u16::from_be_bytes([f[2], f[3]]) as u32
            };
            r.msg(1, format!("Service ID=0x{sid:04X}"));
            r.msg(1, format!("Service Component ID=0x{scids:04X}"));
            match ensemble
                .get_service(sid)
                .and_then(|s| s.get_component_by_scids(scids))
            {
                Some(component) => {
                    update_label_segment(fig2, &mut component.label, segment, &mut r)
                }
                None => r.err(format!(
                    "Service 0x{sid:X} component SCIdS={scids} Not yet in DB"
                )),
            }
        }
        5 => {
            // Data service label
            let sid = u32::from_be_bytes([f[1], f[2], f[3], f[4]]);
            r.msg(1, format!("Service ID=0x{sid:04X}"));
            match ensemble.get_service(sid) {
                Some(service) => {
                    update_label_segment(fig2, &mut service.label, segment, &mut r)
                }
                None => r.err(format!("Service 0x{sid:X} Not yet in DB")),
            }
        }
        6 => {
            // X-PAD user application label, not kept in the database
            let pd = (f[1] & 0x80) >> 7 != 0;
            let xpadapp = if pd { f[6] & 0x1F } else { f[4] & 0x1F };
            let xpadappdesc = match xpadapp {
                2 => "DLS",
                12 => "MOT",
                _ => "?",
            };
            r.msg(1, format!("X-PAD App={xpadapp:02X} ({xpadappdesc})"));
            let mut label = Label::default();
            update_label_segment(fig2, &mut label, segment, &mut r);
        }
        _ => unreachable!(),
    }

    r.complete = true;
    r
}

#[cfg(test)]
fn ensemble_label_fig(toggle: bool, segment_index: u8, payload: &[u8]) -> Vec<u8> {
    let mut data = vec![
        ((toggle as u8) << 7) | (segment_index << 4), // header, rfu=0, ext=0
        0xD9,
        0x99,
    ];
    data.push(0x10); // UTF-8, two segments
    data.extend_from_slice(&[0x00, 0x00]); // character flag
    data.extend_from_slice(payload);

    // segments past the first skip the encoding byte
    if segment_index != 0 {
        data.drain(3..6);
    }
    data
}

#[test]
fn assembles_two_segment_label() {
    let mut ensemble = Ensemble::default();

    let data = ensemble_label_fig(false, 0, b"Radio ");
    let r = fig2_select(&Fig2::new(&data, true), &mut ensemble);
    assert!(!r.msgs.iter().any(|m| m.text.starts_with("Label=")));

    let data = ensemble_label_fig(false, 1, "Øst".as_bytes());
    let r = fig2_select(&Fig2::new(&data, true), &mut ensemble);
    assert!(r.msgs.iter().any(|m| m.text == "Label=\"Radio Øst\""));
    assert_eq!(ensemble.label.assemble(), "Radio Øst");
}

#[test]
fn toggle_change_discards_segments() {
    let mut ensemble = Ensemble::default();

    let data = ensemble_label_fig(false, 1, b"tail");
    fig2_select(&Fig2::new(&data, true), &mut ensemble);
    assert_eq!(ensemble.label.segments.len(), 1);

    let data = ensemble_label_fig(true, 0, b"head");
    fig2_select(&Fig2::new(&data, true), &mut ensemble);
    assert_eq!(ensemble.label.segments.len(), 1);
    assert!(ensemble.label.segments.contains_key(&0));
}

#[test]
fn service_label_requires_existing_service() {
    let mut ensemble = Ensemble::default();

    let data = [0x01u8, 0xAB, 0xCD, 0x10, 0x00, 0x00, b'X'];
    let r = fig2_select(&Fig2::new(&data, true), &mut ensemble);
    assert_eq!(r.errors.len(), 1);
    assert!(r.errors[0].contains("Not yet in DB"));
}
