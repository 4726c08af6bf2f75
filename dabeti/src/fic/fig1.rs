//! FIG type 1, labels (EN 300 401 8.1.13 and 8.1.14).

use crate::fic::charset;
use crate::fic::database::Ensemble;
use crate::structs::fig::{Fig1, FigResult};

fn decode_label(fig1: &Fig1, raw: &[u8]) -> String {
    // charset 0 is the EBU Latin based repertoire, everything else is
    // not allowed in FIG1
    match fig1.charset {
        0 => charset::ebu_latin_to_utf8(raw),
        _ => charset::utf8_lossy(raw),
    }
}

pub fn fig1_select(fig1: &Fig1, ensemble: &mut Ensemble) -> FigResult {
    let mut r = FigResult::default();
    let f = fig1.f;
    let figlen = fig1.figlen();

    if figlen < 19 {
        r.err(format!("FIG 1/{} too short: {figlen}", fig1.ext));
        r.complete = true;
        return r;
    }

    let label = decode_label(fig1, &f[figlen - 18..figlen - 2]);
    let flag = u16::from_be_bytes([f[figlen - 2], f[figlen - 1]]);

    let store = |target: &mut crate::fic::database::Label| {
        target.label = label.clone();
        target.shortlabel_flag = flag;
    };

    match fig1.ext {
        0 => {
            // Ensemble label
            let eid = u16::from_be_bytes([f[1], f[2]]);
            r.msg(0, format!(
                "Ensemble ID 0x{eid:04X} label: \"{label}\", Short label mask: 0x{flag:04X}"
            ));
            if fig1.crc_ok {
                store(&mut ensemble.label);
            }
        }
        1 => {
            // Programme service label
            let sid = u16::from_be_bytes([f[1], f[2]]) as u32;
            r.msg(0, format!(
                "Service ID 0x{sid:X} label: \"{label}\", Short label mask: 0x{flag:04X}"
            ));
            if fig1.crc_ok {
                store(&mut ensemble.get_or_create_service(sid).label);
            }
        }
        4 => {
            // Service component label
            let pd = (f[1] & 0x80) >> 7 != 0;
            let scids = f[1] & 0x0F;
            let sid = if pd {
                u32::from_be_bytes([f[2], f[3], f[4], f[5]])
            } else {
                u16::from_be_bytes([f[2], f[3]]) as u32
            };
            r.msg(0, format!(
                "Service ID  0x{sid:X} , Service Component ID 0x{scids:04X} Short, \
                 label: \"{label}\", label mask: 0x{flag:04X}"
            ));
            if fig1.crc_ok {
                match ensemble
                    .get_service(sid)
                    .and_then(|s| s.get_component_by_scids(scids))
                {
                    Some(component) => store(&mut component.label),
                    None => r.err(format!(
                        "Service 0x{sid:X} component SCIdS={scids} not yet in DB"
                    )),
                }
            }
        }
        5 => {
            // Data service label
            let sid = u32::from_be_bytes([f[1], f[2], f[3], f[4]]);
            r.msg(0, format!(
                "Service ID 0x{sid:X} label: \"{label}\", Short label mask: 0x{flag:04X}"
            ));
            if fig1.crc_ok {
                store(&mut ensemble.get_or_create_service(sid).label);
            }
        }
        6 => {
            // X-PAD user application label
            let pd = (f[1] & 0x80) >> 7 != 0;
            let scids = f[1] & 0x0F;
            let (sid, xpadapp) = if pd {
                (u32::from_be_bytes([f[2], f[3], f[4], f[5]]), f[6] & 0x1F)
            } else {
                (u16::from_be_bytes([f[2], f[3]]) as u32, f[4] & 0x1F)
            };
            let xpadappdesc = match xpadapp {
                2 => "DLS",
                12 => "MOT",
                _ => "?",
            };
            r.msg(0, format!(
                "Service ID  0x{sid:X} , Service Component ID 0x{scids:04X} Short, \
                 X-PAD App {xpadapp:02X} ({xpadappdesc}), label: \"{label}\", label mask: 0x{flag:04X}"
            ));
        }
        _ => {
            r.err(format!("unhandled extension FIG 1/{}", fig1.ext));
        }
    }

    // FIG1s always contain a complete set of information
    r.complete = true;
    r
}

#[test]
fn fig1_0_stores_ensemble_label() {
    let mut ensemble = Ensemble::default();

    let mut data = vec![0x00u8, 0xD9, 0x99];
    data.extend_from_slice(b"DAB Radio 1     ");
    data.extend_from_slice(&0xE000u16.to_be_bytes());

    let fig1 = Fig1::new(&data, true);
    let r = fig1_select(&fig1, &mut ensemble);

    assert!(r.complete);
    assert_eq!(ensemble.label.label, "DAB Radio 1     ");
    assert_eq!(ensemble.label.shortlabel(), "DAB");
    assert!(r.msgs[0].text.contains("Ensemble ID 0xD999"));
}

#[test]
fn fig1_1_creates_service() {
    let mut ensemble = Ensemble::default();

    let mut data = vec![0x01u8, 0xAB, 0xCD];
    data.extend_from_slice(b"Sunshine Radio  ");
    data.extend_from_slice(&0xFF00u16.to_be_bytes());

    let fig1 = Fig1::new(&data, true);
    fig1_select(&fig1, &mut ensemble);

    let service = ensemble.get_service(0xABCD).unwrap();
    assert_eq!(service.label.shortlabel(), "Sunshine");
}

#[test]
fn fib_crc_failure_skips_database() {
    let mut ensemble = Ensemble::default();

    let mut data = vec![0x00u8, 0xD9, 0x99];
    data.extend_from_slice(b"DAB Radio 1     ");
    data.extend_from_slice(&0xE000u16.to_be_bytes());

    let fig1 = Fig1::new(&data, false);
    let r = fig1_select(&fig1, &mut ensemble);

    assert!(!r.msgs.is_empty());
    assert_eq!(ensemble.label.label, "");
}
