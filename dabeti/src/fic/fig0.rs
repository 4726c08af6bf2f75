//! FIG type 0 decoders, MCI and part of the SI (EN 300 401 6 and 8).
//!
//! Each extension keeps a set of already-seen database keys. Seeing a
//! key twice means the carousel came full circle for that FIG, which
//! the caller reports as a complete cycle and uses for the repetition
//! rate statistics.

use std::collections::{BTreeMap, BTreeSet};

use crate::fic::database::Ensemble;
use crate::fic::tables;
use crate::fic::watermark::WatermarkDecoder;
use crate::structs::fig::{Fig0, FigResult};

fn is_complete(seen: &mut BTreeSet<u64>, key: u64) -> bool {
    if seen.contains(&key) {
        seen.clear();
        true
    } else {
        seen.insert(key);
        false
    }
}

/// Variant used by 0/14, 0/17, 0/28 and 0/31: the key is re-inserted
/// after a completed cycle.
fn is_complete_reinsert(seen: &mut BTreeSet<u64>, key: u64) -> bool {
    let complete = seen.contains(&key);
    if complete {
        seen.clear();
    }
    seen.insert(key);
    complete
}

/// Mutable state shared by the FIG 0 extension decoders.
#[derive(Debug, Default)]
pub struct Fig0State {
    international_table_id: u8,
    mode_identity: u8,
    /// Ensemble ECC from FIG 0/9.
    pub ensemble_ecc: u8,

    subchannels_seen: BTreeSet<u64>,
    services_0_2_seen: BTreeSet<u64>,
    components_0_3_seen: BTreeSet<u64>,
    components_0_5_seen: BTreeSet<u64>,
    links_seen: BTreeSet<u64>,
    components_0_8_seen: BTreeSet<u64>,
    regions_0_11_seen: BTreeSet<u64>,
    components_0_13_seen: BTreeSet<u64>,
    subch_0_14_seen: BTreeSet<u64>,
    pnums_seen: BTreeSet<u64>,
    services_0_17_seen: BTreeSet<u64>,
    services_0_18_seen: BTreeSet<u64>,
    clusters_0_19_seen: BTreeSet<u64>,
    regions_0_21_seen: BTreeSet<u64>,
    identifiers_0_22_seen: BTreeSet<u64>,
    services_0_24_seen: BTreeSet<u64>,
    services_0_25_seen: BTreeSet<u64>,
    clusters_0_26_seen: BTreeSet<u64>,
    services_0_27_seen: BTreeSet<u64>,
    clusters_0_28_seen: BTreeSet<u64>,
    redirections_seen: BTreeSet<u64>,

    /// FIG 0/6 database key to LA, to detect link activation changes.
    link_activation: BTreeMap<u16, bool>,
    /// FIG 0/22 main identifier positions, keyed by database key.
    tii_positions: BTreeMap<u16, (f64, f64)>,
}

impl Fig0State {
    pub fn new() -> Self {
        Self::default()
    }

    /// MID is signalled in LIDATA FC and constrains TII identifiers.
    pub fn set_mode_identity(&mut self, mid: u8) {
        self.mode_identity = mid;
    }

    pub fn international_table(&self) -> u8 {
        self.international_table_id
    }

    /// Clears the databases that track changes over time, used when a
    /// new configuration is announced.
    pub fn clear_change_db(&mut self) {
        self.link_activation.clear();
        self.tii_positions.clear();
    }
}

pub fn fig0_select(
    fig0: &Fig0,
    state: &mut Fig0State,
    ensemble: &mut Ensemble,
    wm_decoder: &mut WatermarkDecoder,
) -> FigResult {
    match fig0.ext {
        0 => fig0_0(fig0, ensemble),
        1 => fig0_1(fig0, state, ensemble, wm_decoder),
        2 => fig0_2(fig0, state, ensemble),
        3 => fig0_3(fig0, state),
        5 => fig0_5(fig0, state),
        6 => fig0_6(fig0, state),
        7 => fig0_7(fig0),
        8 => fig0_8(fig0, state, ensemble),
        9 => fig0_9(fig0, state),
        10 => fig0_10(fig0, wm_decoder),
        11 => fig0_11(fig0, state),
        13 => fig0_13(fig0, state),
        14 => fig0_14(fig0, state),
        16 => fig0_16(fig0, state),
        17 => fig0_17(fig0, state),
        18 => fig0_18(fig0, state),
        19 => fig0_19(fig0, state),
        21 => fig0_21(fig0, state),
        22 => fig0_22(fig0, state),
        24 => fig0_24(fig0, state),
        25 => fig0_25(fig0, state),
        26 => fig0_26(fig0, state),
        27 => fig0_27(fig0, state),
        28 => fig0_28(fig0, state),
        31 => fig0_31(fig0, state),
        _ => {
            let mut r = FigResult::default();
            r.err(format!("unhandled extension FIG 0/{}", fig0.ext));
            r
        }
    }
}

// FIG 0/0 Ensemble information
// EN 300 401 6.4
fn fig0_0(fig0: &Fig0, ensemble: &mut Ensemble) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;

    let eid = u16::from_be_bytes([f[1], f[2]]);
    r.msg(0, format!("Ensemble ID=0x{eid:02x}"));
    if fig0.crc_ok {
        ensemble.eid = eid;
    }

    let cid = (f[1] & 0xF0) >> 4;
    r.msg(0, format!("Country ID={cid}"));

    let eref = (f[1] as u16 & 0x0F) * 256 + f[2] as u16;
    r.msg(0, format!("Ensemble reference={eref}"));

    let change = (f[3] & 0xC0) >> 6;
    r.msg(0, format!("Change flag={change}"));

    let alarm = (f[3] & 0x20) >> 5;
    r.msg(0, format!("Alarm flag={alarm}"));

    let cif_hi = f[3] & 0x1F;
    let cif_lo = f[4];
    r.msg(0, format!("CIF Count={cif_hi}/{cif_lo}"));

    if change != 0 {
        r.msg(0, format!("Occurrence change={}", f[5]));
    }

    r.complete = true;
    r
}

// FIG 0/1 Basic sub-channel organization
// EN 300 401 6.2.1
fn fig0_1(
    fig0: &Fig0,
    state: &mut Fig0State,
    ensemble: &mut Ensemble,
    wm_decoder: &mut WatermarkDecoder,
) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;
    let mut subch_ids = Vec::new();

    while i + 2 < figlen {
        let subch_id = f[i] >> 2;
        subch_ids.push(subch_id);
        r.complete |= is_complete(&mut state.subchannels_seen, subch_id as u64);

        let start_addr = ((f[i] as u16 & 0x03) << 8) | f[i + 1] as u16;
        let long_flag = f[i + 2] >> 7 != 0;

        r.msg(0, format!("Subch 0x{subch_id:x}"));
        r.msg(0, format!("start_addr {start_addr}"));

        if long_flag {
            if i + 3 >= figlen {
                r.err("long form sub-channel field truncated");
                break;
            }

            let option = (f[i + 2] >> 4) & 0x07;
            let protection_level = (f[i + 2] >> 2) & 0x03;
            let subchannel_size = ((f[i + 2] as u16 & 0x03) << 8) | f[i + 3] as u16;
            i += 4;

            r.msg(0, "long");
            let protection = match option {
                0 => {
                    let p = format!("EEP {protection_level}-A");
                    r.msg(0, p.clone());
                    p
                }
                1 => {
                    let p = format!("EEP {protection_level}-B");
                    r.msg(0, p.clone());
                    p
                }
                _ => {
                    r.err(format!(
                        "Invalid option {option} protection {protection_level}"
                    ));
                    String::new()
                }
            };
            r.msg(0, format!("subch size {subchannel_size}"));

            if fig0.crc_ok {
                let subch = ensemble.get_or_create_subchannel(subch_id);
                subch.start_address = start_addr;
                subch.num_cu = subchannel_size;
                subch.protection = protection;
            }
        } else {
            let table_switch = (f[i + 2] >> 6) & 0x01;
            let table_index = f[i + 2] & 0x3F;

            r.msg(0, "short");
            if table_switch != 0 {
                r.err(format!("Invalid table_switch {table_switch}"));
            }
            r.msg(0, format!("table index {table_index}"));
            i += 3;

            if fig0.crc_ok {
                let subch = ensemble.get_or_create_subchannel(subch_id);
                subch.start_address = start_addr;
                subch.protection = format!("UEP {table_index}");
            }
        }
    }

    // the ordering of pairs of sub-channels carries the watermark
    if subch_ids.len() >= 2 {
        wm_decoder.push_fig0_1_bit(subch_ids[0] > subch_ids[1]);
    }

    r
}

// FIG 0/2 Basic service and service component definition
// EN 300 401 6.3.1
fn fig0_2(fig0: &Fig0, state: &mut Fig0State, ensemble: &mut Ensemble) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut k = 1;

    while k < figlen {
        let (sid, ids);
        if !fig0.pd {
            if k + 2 > figlen {
                break;
            }
            sid = u16::from_be_bytes([f[k], f[k + 1]]) as u32;
            let cid = (f[k] & 0xF0) >> 4;
            let sref = (f[k] as u32 & 0x0F) * 256 + f[k + 1] as u32;
            ids = format!("Country id={cid}, Service reference={sref}");
            k += 2;
        } else {
            if k + 4 > figlen {
                break;
            }
            sid = u32::from_be_bytes([f[k], f[k + 1], f[k + 2], f[k + 3]]);
            let ecc = f[k];
            let cid = (f[k + 1] & 0xF0) >> 4;
            let sref = (f[k + 1] as u32 & 0x0F) * 65536 + f[k + 2] as u32 * 256 + f[k + 3] as u32;
            ids = format!("ECC={ecc}, Country id={cid}, Service reference={sref}");
            k += 4;
        }

        if k >= figlen {
            break;
        }

        r.complete |= is_complete(&mut state.services_0_2_seen, sid as u64);

        let local = (f[k] & 0x80) >> 7;
        let caid = (f[k] & 0x70) >> 4;
        let ncomp = f[k] & 0x0F;

        r.msg(0, format!(
            "Service ID=0x{sid:X} ({ids}), \
             Number of components={ncomp}, Local flag={local}, CAID={caid}"
        ));

        if fig0.crc_ok {
            let service = ensemble.get_or_create_service(sid);
            service.programme_not_data = !fig0.pd;
        }

        k += 1;
        for comp in 0..ncomp {
            if k + 2 > figlen {
                r.err("component list truncated");
                break;
            }

            let timd = (f[k] & 0xC0) >> 6;
            let ps = (f[k + 1] & 0x02) >> 1;
            let ca = f[k + 1] & 0x01;
            let scty = f[k] & 0x3F;
            let subchid = (f[k + 1] & 0xFC) >> 2;

            let psdesc = if ps == 0 {
                "Secondary service"
            } else {
                "Primary service"
            };

            r.msg(1, format!("Component[{comp}]"));
            match timd {
                0 => {
                    // MSC stream audio
                    let sctydesc = tables::ascty_type(scty);
                    r.msg(2, format!(
                        "Stream audio mode, {psdesc}, {sctydesc}, SubChannel ID={subchid:02X}, CA={ca}"
                    ));
                    if fig0.crc_ok {
                        ensemble
                            .get_or_create_service(sid)
                            .get_or_create_component(subchid);
                    }
                }
                1 => {
                    // MSC stream data
                    let sctydesc = format!("DSCTy={scty} {}", tables::dscty_type(scty));
                    r.msg(2, format!(
                        "Stream data mode, {psdesc}, {sctydesc}, SubChannel ID={subchid:02X}, CA={ca}"
                    ));
                    if fig0.crc_ok {
                        ensemble
                            .get_or_create_service(sid)
                            .get_or_create_component(subchid);
                    }
                }
                2 => {
                    let sctydesc = format!("DSCTy={scty} {}", tables::dscty_type(scty));
                    r.msg(2, format!(
                        "FIDC mode, {psdesc}, {sctydesc}, Fast Information Data Channel ID={subchid:02X}, CA={ca}"
                    ));
                }
                _ => {
                    r.msg(2, format!(
                        "MSC Packet Mode, {psdesc}, Service Component ID={subchid:02X}, CA={ca}"
                    ));
                }
            }
            k += 2;
        }
    }

    r
}

// FIG 0/3 Service component in packet mode
// EN 300 401 6.3.2
fn fig0_3(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 4 < figlen {
        let scid = ((f[i] as u16) << 4) | ((f[i + 1] >> 4) as u16 & 0x0F);
        r.complete |= is_complete(&mut state.components_0_3_seen, scid as u64);

        let rfa = (f[i + 1] >> 1) & 0x07;
        let caorg_flag = f[i + 1] & 0x01 != 0;
        let dg_flag = (f[i + 2] >> 7) & 0x01;
        let rfu = (f[i + 2] >> 6) & 0x01;
        let dscty = f[i + 2] & 0x3F;
        let subchid = f[i + 3] >> 2;
        let packet_address = ((f[i + 3] as u16 & 0x03) << 8) | f[i + 4] as u16;

        r.msg(0, "-");
        r.msg(1, format!("SCId=0x{scid:X}"));
        r.msg(1, format!(
            "CAOrg flag={} CAOrg field {}",
            caorg_flag as u8,
            if caorg_flag { "present" } else { "absent" }
        ));
        r.msg(1, format!("DG flag={dg_flag}"));
        r.msg(1, format!("DSCTy={dscty} {}", tables::dscty_type(dscty)));
        r.msg(1, format!("SubChId=0x{subchid:X}"));
        r.msg(1, format!("Packet address=0x{packet_address:X}"));

        if rfa != 0 {
            r.err(format!("Rfa={rfa} invalid value"));
        }
        if rfu != 0 {
            r.err(format!("Rfu={rfu} invalid value"));
        }

        i += 5;
        if caorg_flag {
            if i + 1 < figlen {
                let caorg = u16::from_be_bytes([f[i], f[i + 1]]);
                let camode = f[i] >> 5;
                let shared_flag = f[i + 1];
                r.msg(1, format!(
                    "CAOrg=0x{caorg:X} CAMode={camode} \"{}\" SharedFlag=0x{shared_flag:X}{}",
                    tables::ca_mode(camode),
                    if shared_flag == 0 { " invalid" } else { "" }
                ));
            } else {
                r.err("Invalid figlen");
            }
            i += 2;
        }
    }

    r
}

// FIG 0/5 Service component language
// EN 300 401 8.1.2
fn fig0_5(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 1 < figlen {
        let ls_flag = f[i] >> 7 != 0;
        r.msg(0, "-");

        if !ls_flag {
            // Short form
            let msc_fic_flag = (f[i] >> 6) & 0x01;
            let language = f[i + 1];
            r.msg(1, "form=short");
            r.msg(1, format!("MSC/FIC flag={msc_fic_flag} MSC"));

            if msc_fic_flag == 0 {
                r.msg(1, format!("SubChId=0x{:X}", f[i] & 0x3F));
            } else {
                r.msg(1, format!("FIDCId=0x{:X}", f[i] & 0x3F));
            }
            r.msg(1, format!(
                "Language=0x{language:X} {}",
                tables::language_name(language)
            ));

            let key = ((msc_fic_flag as u64) << 7) | (f[i] & 0x3F) as u64;
            r.complete |= is_complete(&mut state.components_0_5_seen, key);
            i += 2;
        } else {
            // Long form
            if i + 2 < figlen {
                r.msg(1, "form=long");
                let rfa = (f[i] >> 4) & 0x07;
                let scid = ((f[i] as u16 & 0x0F) << 8) | f[i + 1] as u16;
                let key = (1u64 << 15) | scid as u64;
                r.complete |= is_complete(&mut state.components_0_5_seen, key);
                let language = f[i + 2];

                if rfa != 0 {
                    r.err(format!("Rfa={rfa} invalid value"));
                }
                r.msg(1, format!("SCId=0x{scid:X}"));
                r.msg(1, format!(
                    "Language=0x{language:X} {}",
                    tables::language_name(language)
                ));
            } else {
                r.err("Long form FIG is too short");
            }
            i += 3;
        }
    }

    r
}

// FIG 0/6 Service linking information
// EN 300 401 8.1.15
fn fig0_6(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 1 < figlen {
        let id_list_flag = (f[i] >> 7) & 0x01 != 0;
        let la = (f[i] >> 6) & 0x01 != 0;
        let sh = (f[i] >> 5) & 0x01;
        let ils = (f[i] >> 4) & 0x01;
        let lsn = ((f[i] as u16 & 0x0F) << 8) | f[i + 1] as u16;
        let key = ((fig0.oe as u16) << 15)
            | ((fig0.pd as u16) << 14)
            | ((sh as u16) << 13)
            | ((ils as u16) << 12)
            | lsn;
        r.complete |= is_complete(&mut state.links_seen, key as u64);

        r.msg(0, "-");
        r.msg(1, format!("Id list flag={}", id_list_flag as u8));
        r.msg(1, format!(
            "LA={} {}",
            la as u8,
            if la { "active" } else { "inactive" }
        ));
        r.msg(1, format!("S/H={sh} {}", if sh != 0 { "Hard" } else { "Soft" }));
        r.msg(1, format!(
            "ILS={ils} {}",
            if ils != 0 { "international" } else { "national" }
        ));
        r.msg(1, format!("LSN={lsn}"));
        r.msg(1, format!("database key=0x{key:04x}"));

        // check activation / deactivation
        if let Some(&previous) = state.link_activation.get(&key)
            && previous != la
        {
            if la {
                r.msg(1, "status=activated");
            } else {
                r.msg(1, "status=deactivated");
            }
        }
        state.link_activation.insert(key, la);
        i += 2;

        if !id_list_flag {
            if !fig0.cn {
                // Change Event Indication
                r.msg(1, "CEI=true");
            }
            continue;
        }

        if i >= figlen {
            break;
        }

        let number_of_ids = (f[i] & 0x0F) as usize;
        if !fig0.pd {
            let idlq = (f[i] >> 5) & 0x03;
            let shd = (f[i] >> 4) & 0x01;
            r.msg(1, format!("IdLQ={idlq}"));
            r.msg(1, format!(
                "Shd={shd} {}",
                if shd != 0 {
                    "b11-8 in 4-F are different services"
                } else {
                    "single service"
                }
            ));

            let id_name = |j: usize| {
                if (j == 0 && !fig0.oe && !fig0.cn) || idlq == 0 {
                    "DAB SId"
                } else if idlq == 1 {
                    "RDS PI"
                } else if idlq == 2 {
                    "(AM-FM legacy)"
                } else {
                    "DRM-AMSS service"
                }
            };

            if ils == 0 {
                r.msg(1, "Id List:");
                let mut j = 0;
                while j < number_of_ids && i + 2 + j * 2 < figlen {
                    r.msg(2, "-");
                    let id = u16::from_be_bytes([f[i + 1 + j * 2], f[i + 2 + j * 2]]);
                    r.msg(3, format!("{}=0x{id:X}", id_name(j)));
                    j += 1;
                }
                if number_of_ids == 0 && idlq == 1 {
                    r.err("deadlink");
                }
                i += number_of_ids * 2 + 1;
            } else {
                r.msg(1, "Id List:");
                let mut j = 0;
                while j < number_of_ids && i + 3 + j * 3 < figlen {
                    r.msg(2, "-");
                    let ecc = f[i + 1 + j * 3];
                    let id = u16::from_be_bytes([f[i + 2 + j * 3], f[i + 3 + j * 3]]);
                    r.msg(3, format!("{}=ecc 0x{ecc:02X} Id 0x{id:04X}", id_name(j)));
                    j += 1;
                }
                if number_of_ids == 0 && idlq == 1 {
                    r.err("deadlink");
                }
                i += number_of_ids * 3 + 1;
            }
        } else {
            r.msg(1, "Id List:");
            let mut j = 0;
            while j < number_of_ids && i + 4 + j * 4 < figlen {
                let id = u32::from_be_bytes([
                    f[i + 1 + j * 4],
                    f[i + 2 + j * 4],
                    f[i + 3 + j * 4],
                    f[i + 4 + j * 4],
                ]);
                r.msg(2, format!("- 0x{id:X}"));
                j += 1;
            }
            i += number_of_ids * 4 + 1;
        }
    }

    r
}

// FIG 0/7 Configuration information
// EN 300 401 V2 6.4.2
fn fig0_7(fig0: &Fig0) -> FigResult {
    let mut r = FigResult::default();

    if fig0.figlen() != 3 {
        r.err("FIG0/7 has incorrect length");
    } else {
        let field = u16::from_be_bytes([fig0.f[1], fig0.f[2]]);
        r.msg(0, format!("Services={}", field >> 10));
        r.msg(0, format!("Count={}", field & 0x3FF));
    }

    r.complete = true;
    r
}

// FIG 0/8 Service component global definition
// EN 300 401 6.3.5
fn fig0_8(fig0: &Fig0, state: &mut Fig0State, ensemble: &mut Ensemble) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let sid_len = if fig0.pd { 4 } else { 2 };
    let mut i = 1;

    while i + sid_len + 1 < figlen {
        let sid = if fig0.pd {
            u32::from_be_bytes([f[i], f[i + 1], f[i + 2], f[i + 3]])
        } else {
            u16::from_be_bytes([f[i], f[i + 1]]) as u32
        };
        i += sid_len;

        let ext_flag = f[i] >> 7 != 0;
        let rfa = (f[i] >> 4) & 0x7;
        let scids = f[i] & 0x0F;
        r.complete |= is_complete(
            &mut state.components_0_8_seen,
            ((sid as u64) << 8) | scids as u64,
        );

        let mut desc = format!(
            "SId=0x{sid:X}, Ext flag={} 8-bit Rfa {}",
            ext_flag as u8,
            if ext_flag { "present" } else { "absent" }
        );
        if rfa != 0 {
            desc += &format!(", Rfa={rfa} invalid value");
        }
        desc += &format!(", SCIdS=0x{scids:X}");
        i += 1;

        if i < figlen {
            let ls_flag = f[i] >> 7 != 0;
            desc += &format!(
                ", L/S flag={} {}",
                ls_flag as u8,
                if ls_flag { "Long form" } else { "Short form" }
            );
            if !ls_flag {
                if i + (ext_flag as usize) < figlen {
                    let msc_fic_flag = (f[i] >> 6) & 0x01;
                    if msc_fic_flag == 0 {
                        let subchid = f[i] & 0x3F;
                        desc += &format!(", MSC/FIC flag={msc_fic_flag} MSC, SubChId=0x{subchid:X}");
                        if fig0.crc_ok
                            && let Some(service) = ensemble.get_service(sid)
                        {
                            service.get_or_create_component(subchid).scids = Some(scids);
                        }
                    } else {
                        desc += &format!(
                            ", MSC/FIC flag={msc_fic_flag} FIC, FIDCId=0x{:X}",
                            f[i] & 0x3F
                        );
                    }
                    if ext_flag {
                        let rfa = f[i + 1];
                        if rfa != 0 {
                            desc += &format!(", Rfa=0x{rfa:X} invalid value");
                        }
                    }
                }
                i += 1 + ext_flag as usize;
            } else {
                if i + 1 < figlen {
                    let rfa = (f[i] >> 4) & 0x07;
                    let scid = ((f[i] as u16 & 0x0F) << 8) | f[i + 1] as u16;
                    if rfa != 0 {
                        desc += &format!(", Rfa={rfa} invalid value");
                    }
                    desc += &format!(", SCId=0x{scid:X}");
                }
                i += 2;
            }
        }
        r.msg(0, desc);
    }

    r
}

fn lto_to_string(lto: i8) -> String {
    format!(
        "{}{}:{:02}",
        if lto >= 0 { "" } else { "-" },
        lto.abs() >> 1,
        (lto & 0x01) * 30
    )
}

// FIG 0/9 Country, LTO and international table
// EN 300 401 8.1.3.2
fn fig0_9(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    if i + 2 >= figlen {
        return r;
    }

    let key = ((fig0.oe as u8) << 1) | fig0.pd as u8;
    let ext_flag = f[i] >> 7 != 0;
    let lto_uniq = (f[i] >> 6) & 0x01;
    let mut ensemble_lto = (f[i] & 0x3F) as i8;
    if ensemble_lto & 0x20 != 0 {
        // negative LTO
        ensemble_lto = (ensemble_lto as u8 | 0xC0) as i8;
    }

    let mut desc = format!(
        "Ext flag={} extended field {}, LTO uniq={lto_uniq} {}, Ensemble LTO=0x{:X} {}",
        ext_flag as u8,
        if ext_flag { "present" } else { "absent" },
        if lto_uniq != 0 {
            "several time zones"
        } else {
            "one time zone (time specified by Ensemble LTO)"
        },
        ensemble_lto as u8 & 0x3F,
        lto_to_string(ensemble_lto)
    );
    if ensemble_lto.abs() > 24 {
        desc += " out of range -12 hours to +12 hours";
    }

    state.ensemble_ecc = f[i + 1];
    let international_table_id = f[i + 2];
    state.international_table_id = international_table_id;
    desc += &format!(
        ", Ensemble ECC=0x{:X}, International Table Id=0x{international_table_id:X}, database key=0x{key:x}",
        state.ensemble_ecc
    );
    r.msg(0, desc);
    i += 3;

    if ext_flag {
        while i < figlen {
            let number_of_services = (f[i] >> 6) as usize;
            let mut lto = (f[i] & 0x3F) as i8;
            if lto & 0x20 != 0 {
                lto = (lto as u8 | 0xC0) as i8;
            }

            let mut desc = format!(
                "Number of services={number_of_services}, LTO=0x{:X} {}",
                lto as u8 & 0x3F,
                lto_to_string(lto)
            );
            if lto.abs() > 24 {
                desc += " out of range -12 hours to +12 hours";
            }
            if number_of_services == 0 && lto == 0 {
                desc += ", CEI";
            }
            i += 1;

            if !fig0.pd {
                if i >= figlen {
                    break;
                }
                desc += &format!(", ECC=0x{:X}", f[i]);
                r.msg(1, desc);
                i += 1;
                let mut j = i;
                while j + 1 < figlen && j < i + number_of_services * 2 {
                    let sid = u16::from_be_bytes([f[j], f[j + 1]]);
                    r.msg(2, format!("SId 0x{sid:X}"));
                    j += 2;
                }
                i += number_of_services * 2;
            } else {
                r.msg(1, desc);
                let mut j = i;
                while j + 3 < figlen && j < i + number_of_services * 4 {
                    let sid = u32::from_be_bytes([f[j], f[j + 1], f[j + 2], f[j + 3]]);
                    r.msg(2, format!("SId 0x{sid:X}"));
                    j += 4;
                }
                i += number_of_services * 4;
            }
        }
    }

    r.complete = true;
    r
}

// FIG 0/10 Date and time
// EN 300 401 8.1.3.1
fn fig0_10(fig0: &Fig0, wm_decoder: &mut WatermarkDecoder) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;

    let mjd = ((f[1] as u32 & 0x7F) << 10) | ((f[2] as u32) << 2) | (f[3] >> 6) as u32;
    let date_str = tables::mjd_to_string(mjd);

    let lsi = (f[3] & 0x20) != 0;
    let conf_ind = (f[3] & 0x10) != 0;
    wm_decoder.push_confind_bit(conf_ind);
    let utc = (f[3] & 0x8) != 0;

    let hours = ((f[3] & 0x7) << 2) | (f[4] >> 6);
    let minutes = f[4] & 0x3F;

    if utc {
        let seconds = f[5] >> 2;
        let milliseconds = ((f[5] as u16 & 0x3) << 8) | f[6] as u16;
        r.msg(0, format!(
            "FIG 0/{}(long): MJD=0x{mjd:X} {date_str}, LSI {}, ConfInd {}, \
             UTC Time: {hours:02}:{minutes:02}:{seconds:02}.{milliseconds}",
            fig0.ext, lsi as u8, conf_ind as u8
        ));
    } else {
        r.msg(0, format!(
            "FIG 0/{}(short): MJD=0x{mjd:X} {date_str}, LSI {}, ConfInd {}, \
             UTC Time: {hours:02}:{minutes:02}",
            fig0.ext, lsi as u8, conf_ind as u8
        ));
    }

    r.complete = true;
    r
}

fn check_main_id(main_id: u8, mode_identity: u8, r: &mut FigResult) {
    // coding range is 0 to 69 for modes I, II and IV, 0 to 5 for mode III
    match mode_identity {
        1 | 2 | 4 if main_id > 69 => {
            r.err(format!("invalid value for transmission mode {mode_identity}"));
        }
        3 if main_id > 5 => {
            r.err(format!("invalid value for transmission mode {mode_identity}"));
        }
        _ => {}
    }
}

// FIG 0/11 Region definition
// EN 300 401 8.1.16.1
fn fig0_11(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 1 < figlen {
        let gaty = f[i] >> 4;
        let ge_flag = (f[i] >> 3) & 0x01;
        let region_id = ((f[i] as u16 & 0x07) << 8) | f[i + 1] as u16;
        r.complete |= is_complete(&mut state.regions_0_11_seen, region_id as u64);

        let key = ((fig0.oe as u16) << 12) | ((fig0.pd as u16) << 11) | region_id;
        i += 2;

        r.msg(0, format!("GATy={gaty}"));

        let ge_msg = format!(
            "G/E flag={ge_flag} {} coverage area",
            if ge_flag != 0 { "Global" } else { "Ensemble" }
        );

        match gaty {
            0 => {
                // TII list
                r.msg(0, "Geographical area defined by a TII list");
                r.msg(0, ge_msg);
                r.msg(0, format!("RegionId=0x{region_id:X}"));
                r.msg(0, format!("database key=0x{key:X}"));

                if i >= figlen {
                    break;
                }

                let rfu = f[i] >> 5;
                if rfu != 0 {
                    r.err(format!("Rfu={rfu} invalid value"));
                }
                let length_tii_list = (f[i] & 0x1F) as usize;
                r.msg(0, format!(", Length of TII list={length_tii_list}"));
                if length_tii_list == 0 {
                    r.msg(0, "CEI");
                }
                i += 1;

                let mut j = 0;
                while i + 1 < figlen && j < length_tii_list {
                    // transmitter group
                    let rfa = f[i] >> 7;
                    let main_id = f[i] & 0x7F;
                    if rfa != 0 {
                        r.err(format!("Rfa={rfa} invalid value, MainId=0x{main_id:X}"));
                    } else {
                        r.msg(1, format!("MainId=0x{main_id:X}"));
                    }
                    check_main_id(main_id, state.mode_identity, &mut r);

                    let rfa2 = f[i + 1] >> 5;
                    if rfa2 != 0 {
                        r.err(format!("Rfa={rfa2} invalid value"));
                    }
                    let length_sub_id_list = (f[i + 1] & 0x1F) as usize;
                    r.msg(1, format!("Length of SubId={length_sub_id_list}"));
                    i += 2;

                    // SubIds are 5-bit fields packed MSB first
                    let mut bit_pos: i8 = 3;
                    let mut sub_id: u8 = 0;
                    let mut k = 0;
                    while i < figlen && k < length_sub_id_list {
                        if bit_pos >= 0 {
                            sub_id |= (f[i] >> bit_pos) & 0x1F;
                            r.msg(2, format!("SubId=0x{sub_id:X}"));
                            if sub_id == 0 || sub_id > 23 {
                                r.err(format!("Invalid SubId=0x{sub_id:X}"));
                            }
                            bit_pos -= 5;
                            sub_id = 0;
                            k += 1;
                        }
                        if bit_pos < 0 {
                            sub_id = (f[i] << (-bit_pos) as u32) & 0x1F;
                            bit_pos += 8;
                            i += 1;
                        }
                    }
                    if bit_pos > 3 {
                        // skip padding
                        i += 1;
                    }
                    if k < length_sub_id_list {
                        r.err(format!(
                            "{} SubId missing, fig length too short !",
                            length_sub_id_list - k
                        ));
                    }
                    j += 1;
                }
                if j < length_tii_list {
                    r.err(format!(
                        "{} Transmitter group missing, fig length too short !",
                        length_tii_list - j
                    ));
                }
            }
            1 => {
                // spherical rectangle
                r.msg(0,
                    "Geographical area defined as a spherical rectangle \
                     by the geographical co-ordinates of one corner and its latitude and \
                     longitude extents");
                r.msg(0, ge_msg);
                r.msg(0, format!("RegionId=0x{region_id:X}"));
                r.msg(0, format!("database key=0x{key:X}"));

                if i + 6 < figlen {
                    let lat_coarse = i16::from_be_bytes([f[i], f[i + 1]]);
                    let lng_coarse = i16::from_be_bytes([f[i + 2], f[i + 3]]);
                    let mut latitude = lat_coarse as f64 * 90.0 / 32768.0;
                    let mut longitude = lng_coarse as f64 * 180.0 / 32768.0;
                    r.msg(0, format!(
                        "Lat Lng coarse=0x{lat_coarse:X} 0x{lng_coarse:X} => {latitude:.6}, {longitude:.6}"
                    ));

                    let extent_lat = ((f[i + 4] as u16) << 4) | (f[i + 5] >> 4) as u16;
                    let extent_lng = ((f[i + 5] as u16 & 0x0F) << 8) | f[i + 6] as u16;
                    latitude += extent_lat as f64 * 90.0 / 32768.0;
                    longitude += extent_lng as f64 * 180.0 / 32768.0;
                    r.msg(0, format!(
                        "Extent Lat Lng=0x{extent_lat:X} 0x{extent_lng:X} => {latitude:.6}, {longitude:.6}"
                    ));
                } else {
                    r.err("Coordinates missing, fig length too short !");
                }
                i += 7;
            }
            _ => {
                r.msg(0, "reserved for future use of the geographical");
                r.msg(0, ge_msg);
                r.msg(0, format!("RegionId=0x{region_id:X}"));
                r.msg(0, format!("database key=0x{key:X}"));
                r.msg(0, format!("stop Region definition iteration {i}/{figlen}"));
                r.err("Stopping iteration because Rfu encountered");
                break;
            }
        }
    }

    r
}

// FIG 0/13 User application information
// EN 300 401 8.1.20
fn fig0_13(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let sid_len = if fig0.pd { 4 } else { 2 };
    let mut k = 1;

    if k + sid_len >= figlen {
        return r;
    }

    let sid = if fig0.pd {
        u32::from_be_bytes([f[k], f[k + 1], f[k + 2], f[k + 3]])
    } else {
        u16::from_be_bytes([f[k], f[k + 1]]) as u32
    };
    k += sid_len;

    let scids = f[k] >> 4;
    let no = f[k] & 0x0F;
    k += 1;

    r.complete |= is_complete(
        &mut state.components_0_13_seen,
        ((sid as u64) << 8) | scids as u64,
    );

    r.msg(0, format!("SId=0x{sid:X} SCIdS={scids} No={no}"));

    for _ in 0..no {
        if k + 2 > figlen {
            r.err("user application list truncated");
            break;
        }
        let user_app_type = (((f[k] as u16) << 8) | (f[k + 1] as u16 & 0xE0)) >> 5;
        let user_app_len = f[k + 1] & 0x1F;
        k += 2;

        r.msg(1, format!(
            "User Application {user_app_type} '{}'; length {user_app_len}",
            tables::user_application_name(user_app_type)
        ));

        // skip the user application data field
        k += user_app_len as usize;
    }

    r
}

// FIG 0/14 FEC sub-channel organization
// EN 300 401 6.2.2
fn fig0_14(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;

    for i in 1..fig0.figlen() {
        let subchid = f[i] >> 2;
        r.complete |= is_complete_reinsert(&mut state.subch_0_14_seen, subchid as u64);
        let fec_scheme = f[i] & 0x3;

        r.msg(0, "-");
        r.msg(1, format!("SubChId=0x{subchid:X}"));
        r.msg(1, format!(
            "FEC scheme={fec_scheme} {}",
            tables::fec_scheme(fec_scheme)
        ));
    }

    r
}

// FIG 0/16 Programme Number
// EN 300 401 8.1.4 and 8.1.10.3
fn fig0_16(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 4 < figlen {
        let sid = u16::from_be_bytes([f[i], f[i + 1]]);
        let pnum = u16::from_be_bytes([f[i + 2], f[i + 3]]);
        r.complete |= is_complete(
            &mut state.pnums_seen,
            ((sid as u64) << 16) | pnum as u64,
        );
        let rfa = f[i + 4] >> 6;
        let rfu = (f[i + 4] >> 2) & 0x0F;
        let continuation_flag = (f[i + 4] >> 1) & 0x01;
        let update_flag = f[i + 4] & 0x01;

        r.msg(0, "-");
        r.msg(1, format!("SId=0x{sid:X}"));
        r.msg(1, format!("PNum=0x{pnum:X} {}", tables::pnum_to_string(pnum)));

        if rfa != 0 {
            r.err(format!("Rfa={rfa} invalid value"));
        }
        if rfu != 0 {
            r.err(format!(", Rfu=0x{rfu:X} invalid value"));
        }

        r.msg(1, format!(
            "Continuation flag={continuation_flag}, the programme will {}",
            if continuation_flag != 0 {
                "be interrupted but continued later"
            } else {
                "not be subject to a planned interruption"
            }
        ));
        r.msg(1, format!(
            "Update flag={update_flag} {}re-direction",
            if update_flag != 0 { "" } else { "no " }
        ));
        i += 5;

        if update_flag != 0 {
            if i + 1 < figlen {
                let new_sid = u16::from_be_bytes([f[i], f[i + 1]]);
                r.msg(1, format!("New SId=0x{new_sid:X}"));
                if i + 3 < figlen {
                    let new_pnum = u16::from_be_bytes([f[i + 2], f[i + 3]]);
                    r.msg(1, format!(
                        "New PNum=0x{new_pnum:X} {}",
                        tables::pnum_to_string(new_pnum)
                    ));
                } else {
                    r.err("missing New PNum !");
                }
            } else {
                r.err("missing New SId and New PNum !");
            }
            i += 4;
        }
    }

    r
}

// FIG 0/17 Programme Type
// EN 300 401 8.1.5
fn fig0_17(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 3 < figlen {
        let sid = u16::from_be_bytes([f[i], f[i + 1]]);
        r.complete |= is_complete_reinsert(&mut state.services_0_17_seen, sid as u64);
        let sd_flag = f[i + 2] >> 7;
        let ps_flag = (f[i + 2] >> 6) & 0x01;
        let l_flag = (f[i + 2] >> 5) & 0x01;
        let cc_flag = (f[i + 2] >> 4) & 0x01;
        let rfa = f[i + 2] & 0x0F;

        r.msg(0, "-");
        r.msg(1, format!("SId=0x{sid:X}"));
        r.msg(1, format!(
            "S/D={sd_flag} Programme Type codes and language (when present), \
             {}represent the current programme contents",
            if sd_flag != 0 { "" } else { "may not " }
        ));
        r.msg(1, format!(
            "P/S={ps_flag} {} service component",
            if ps_flag != 0 { "secondary" } else { "primary" }
        ));
        r.msg(1, format!(
            "L flag={l_flag} language field {}",
            if l_flag != 0 { "present" } else { "absent" }
        ));
        r.msg(1, format!(
            "CC flag={cc_flag} complementary code and preceding Rfa and Rfu fields {}",
            if cc_flag != 0 { "present" } else { "absent" }
        ));
        if rfa != 0 {
            r.err(format!("Rfa=0x{rfa:X} invalid value"));
        }

        i += 3;
        if l_flag != 0 {
            if i < figlen {
                let language = f[i];
                r.msg(1, format!(
                    "Language=0x{language:X} {}",
                    tables::language_name(language)
                ));
            } else {
                r.err("Language= invalid FIG length");
            }
            i += 1;
        }

        if i < figlen {
            let rfa = f[i] >> 6;
            let rfu = (f[i] >> 5) & 0x01;
            if rfa != 0 {
                r.err(format!("Rfa=0x{rfa:X} invalid value"));
            }
            if rfu != 0 {
                r.err(format!("Rfu={rfu} invalid value"));
            }
            let int_code = f[i] & 0x1F;
            r.msg(1, format!(
                "Int code=0x{int_code:X} {}",
                tables::programme_type(state.international_table_id, int_code)
            ));
            i += 1;
        } else {
            r.err("Int code: invalid FIG length");
        }

        if cc_flag != 0 {
            if i < figlen {
                let rfa = f[i] >> 6;
                let rfu = (f[i] >> 5) & 0x01;
                if rfa != 0 {
                    r.err(format!("Rfa=0x{rfa:X} invalid value"));
                }
                if rfu != 0 {
                    r.err(format!("Rfu={rfu} invalid value"));
                }
                let comp_code = f[i] & 0x1F;
                r.msg(1, format!(
                    "Comp code=0x{comp_code:X} {}",
                    tables::programme_type(state.international_table_id, comp_code)
                ));
                i += 1;
            } else {
                r.err("Comp code= invalid FIG length");
            }
        }
    }

    r
}

fn announcement_flags(prefix: &str, asu_flags: u16, r: &mut FigResult) {
    for j in 0..16 {
        if asu_flags & (1 << j) != 0 {
            r.msg(2, format!("{prefix}={}", tables::announcement_type(j)));
        }
    }
}

// FIG 0/18 Announcement support
// EN 300 401 8.1.6.1
fn fig0_18(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 4 < figlen {
        let sid = u16::from_be_bytes([f[i], f[i + 1]]);
        r.complete |= is_complete(&mut state.services_0_18_seen, sid as u64);
        let asu_flags = u16::from_be_bytes([f[i + 2], f[i + 3]]);
        let rfa = f[i + 4] >> 5;
        let number_clusters = (f[i + 4] & 0x1F) as usize;

        let mut desc = format!("SId=0x{sid:X}, Asu flags=0x{asu_flags:04x}");
        if rfa != 0 {
            desc += &format!(", Rfa={rfa} invalid value");
        }
        desc += &format!(", Number of clusters={number_clusters}");
        let key = ((fig0.oe as u32) << 17) | ((fig0.pd as u32) << 16) | sid as u32;
        desc += &format!(", database key=0x{key:05x}");
        // Change Event Indication
        if number_clusters == 0 && asu_flags == 0 {
            desc += ", CEI";
        }
        r.msg(0, desc);
        i += 5;

        let mut j = 0;
        while j < number_clusters && i < figlen {
            r.msg(1, format!("Cluster Id=0x{:X}", f[i]));
            i += 1;
            j += 1;
        }
        if j < number_clusters {
            r.err("missing Cluster Id, fig length too short !");
        }

        announcement_flags("Announcement support", asu_flags, &mut r);
    }

    r
}

// FIG 0/19 Announcement switching
// EN 300 401 8.1.6.2
fn fig0_19(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 3 < figlen {
        let cluster_id = f[i];
        r.complete |= is_complete(&mut state.clusters_0_19_seen, cluster_id as u64);
        let asw_flags = u16::from_be_bytes([f[i + 1], f[i + 2]]);
        let new_flag = f[i + 3] >> 7;
        let region_flag = (f[i + 3] >> 6) & 0x1;
        let subchid = f[i + 3] & 0x3F;

        let mut desc = format!(
            "Cluster Id=0x{cluster_id:02x}, Asw flags=0x{asw_flags:04x}, \
             New flag={new_flag} {}, Region flag={region_flag} last byte {}, SubChId={subchid}",
            if new_flag != 0 { "new" } else { "repeat" },
            if region_flag != 0 { "present" } else { "absent" }
        );
        if region_flag != 0 {
            if i + 4 < figlen {
                let rfa = f[i + 4] >> 6;
                let region_lp = f[i + 4] & 0x3F;
                if rfa != 0 {
                    desc += &format!(", Rfa={rfa} invalid value");
                }
                desc += &format!(", Region Lower Part=0x{region_lp:02x}");
            } else {
                desc += "missing Region Lower Part, fig length too short !";
            }
        }
        r.msg(0, desc);

        announcement_flags("Announcement switching", asw_flags, &mut r);
        i += 4 + region_flag as usize;
    }

    r
}

// FIG 0/21 Frequency Information
// EN 300 401 8.1.8
fn fig0_21(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 1 < figlen {
        let region_id = ((f[i] as u16) << 3) | (f[i + 1] >> 5) as u16;
        r.complete |= is_complete(&mut state.regions_0_21_seen, region_id as u64);
        let length_fi_list = (f[i + 1] & 0x1F) as usize;
        r.msg(0, format!("RegionId=0x{region_id:03x}"));
        r.msg(0, format!("Len={length_fi_list}"));
        i += 2;

        if i + length_fi_list > figlen {
            r.err(format!(
                "FIG0/21 FI Len error: expect {i} + {length_fi_list} <= {figlen}"
            ));
            break;
        }

        let mut j = i;
        while j + 2 < i + length_fi_list {
            let id_field = u16::from_be_bytes([f[j], f[j + 1]]);
            let randm = f[j + 2] >> 4;
            let continuity_flag = (f[j + 2] >> 3) & 0x01;
            let length_freq_list = (f[j + 2] & 0x07) as usize;

            let idfield = match randm {
                0x0 | 0x1 => "EId",
                0x6 => "DRM Service Id",
                0x8 => "RDS PI",
                0x9 | 0xa | 0xc => "Dummy",
                0xe => "AMSS Service Id",
                _ => {
                    r.err("R&M invalid");
                    "invalid"
                }
            };
            r.msg(1, format!("ID field=0x{id_field:X}{idfield}"));

            let rm_str = match randm {
                0x0 => " DAB ensemble, no local windows",
                0x6 => " DRM",
                0x8 => " FM with RDS",
                0x9 => " FM without RDS",
                0xa => " AM (MW in 9 kHz steps & LW)",
                0xc => " AM (MW in 5 kHz steps & SW)",
                0xe => " AMSS",
                _ => {
                    r.err("R&M is Rfu");
                    " Rfu"
                }
            };
            r.msg(1, format!("R&M=0x{randm:1x}{rm_str}"));

            let continuity_str = if !fig0.oe
                || (randm != 0x6 && !(0x8..=0xa).contains(&randm) && randm != 0xc && randm != 0xe)
            {
                if continuity_flag == 0 {
                    match randm {
                        0x0 | 0x1 => "=continuous output not expected",
                        0x6 => "=no compensating time delay on DRM audio signal",
                        0x8 | 0x9 => "=no compensating time delay on FM audio signal",
                        0xa | 0xc | 0xe => "=no compensating time delay on AM audio signal",
                        _ => "=Rfu",
                    }
                } else {
                    match randm {
                        0x0 | 0x1 => "=continuous output possible",
                        0x6 => "=compensating time delay on DRM audio signal",
                        0x8 | 0x9 => "=compensating time delay on FM audio signal",
                        0xa | 0xc | 0xe => "=compensating time delay on AM audio signal",
                        _ => {
                            r.err("continuity is Rfu");
                            "=Rfu"
                        }
                    }
                }
            } else {
                r.err("Rfu");
                "=reserved for future addition"
            };
            r.msg(1, format!("Continuity flag={continuity_flag} {continuity_str}"));

            let key = ((fig0.oe as u64) << 32)
                | ((fig0.pd as u64) << 31)
                | ((region_id as u64) << 20)
                | ((id_field as u64) << 4)
                | randm as u64;
            r.msg(1, format!("database key=0x{key:09}"));
            // Change Event Indication
            if length_freq_list == 0 {
                r.msg(1, "CEI");
            }
            j += 3;

            let mut k = j;
            match randm {
                0x0 | 0x1 => {
                    while k + 2 < j + length_freq_list {
                        let ifreq = (((f[k] as u32 & 0x07) << 16)
                            | ((f[k + 1] as u32) << 8)
                            | f[k + 2] as u32)
                            * 16;
                        if ifreq != 0 {
                            let control_field = f[k] >> 3;
                            let trans_mode = (control_field >> 1) & 0x07;
                            if control_field & 0x10 == 0 {
                                r.msg(2, format!("{ifreq} KHz"));
                                if control_field & 0x01 == 0 {
                                    r.msg(2, "geographically adjacent area");
                                } else {
                                    r.msg(2, "no geographically adjacent area");
                                }
                                if trans_mode == 0 {
                                    r.msg(2, "no transmission mode signalled");
                                } else if trans_mode <= 4 {
                                    r.msg(2, format!("transmission mode {trans_mode}"));
                                } else {
                                    r.msg(2, format!("invalid transmission mode 0x{trans_mode:x}"));
                                }
                            } else {
                                r.msg(2, format!(
                                    "{ifreq} KHz, invalid Control field b23 0x{control_field:x}"
                                ));
                            }
                        } else {
                            r.err("Frequency not to be used (0)");
                        }
                        k += 3;
                    }
                }
                0x8 | 0x9 | 0xa => {
                    while k < j + length_freq_list {
                        if f[k] != 0 {
                            if randm == 0xa {
                                let ifreq = if f[k] < 16 {
                                    144 + f[k] as u32 * 9
                                } else {
                                    387 + f[k] as u32 * 9
                                };
                                r.msg(2, format!("{ifreq} KHz"));
                            } else {
                                let freq = 87.5 + f[k] as f32 * 0.1;
                                r.msg(2, format!("{freq:.1} MHz"));
                            }
                        } else {
                            r.err("Frequency not to be used (0)");
                        }
                        k += 1;
                    }
                }
                0xc => {
                    while k + 1 < j + length_freq_list {
                        let ifreq = u16::from_be_bytes([f[k], f[k + 1]]) as u32 * 5;
                        if ifreq != 0 {
                            r.msg(2, format!("{ifreq} KHz"));
                        } else {
                            r.err("Frequency not to be used (0)");
                        }
                        k += 2;
                    }
                }
                0x6 | 0xe => {
                    while k + 2 < j + length_freq_list {
                        let id_field2 = f[k];
                        let ifreq = ((f[k + 1] as u32 & 0x7f) << 8) | f[k + 2] as u32;
                        if ifreq != 0 {
                            r.msg(2, format!("{ifreq} KHz"));
                        } else {
                            r.err("Frequency not to be used (0)");
                        }
                        if randm == 0x6 {
                            r.msg(2, format!("DRM Service Id 0x{id_field2:X}"));
                        } else {
                            r.msg(2, format!("AMSS Service Id 0x{id_field2:X}"));
                        }
                        if f[k + 1] & 0x80 != 0 {
                            r.msg(2, "invalid Rfu b15 set to 1 instead of 0");
                        }
                        k += 3;
                    }
                }
                _ => {}
            }
            j += length_freq_list;
        }
        i += length_fi_list;
    }

    r
}

// FIG 0/22 Transmitter Identification Information database
// EN 300 401 8.1.9
fn fig0_22(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i < figlen {
        let ms = f[i] >> 7 != 0;
        let main_id = f[i] & 0x7F;
        r.complete |= is_complete(
            &mut state.identifiers_0_22_seen,
            ((ms as u64) << 7) | main_id as u64,
        );
        let key = ((fig0.oe as u16) << 8) | ((fig0.pd as u16) << 7) | main_id as u16;

        let mut desc = format!(
            "M/S={} {}identifier, MainId=0x{main_id:X}",
            ms as u8,
            if ms { "Sub-" } else { "Main " }
        );
        match state.mode_identity {
            1 | 2 | 4 if main_id > 69 => {
                desc += &format!(" invalid value for transmission mode {}", state.mode_identity);
            }
            3 if main_id > 5 => {
                desc += &format!(" invalid value for transmission mode {}", state.mode_identity);
            }
            _ => {}
        }
        desc += &format!(", database key=0x{key:X}");
        i += 1;

        if !ms {
            // Main identifier
            if i + 4 < figlen {
                let lat_coarse = i16::from_be_bytes([f[i], f[i + 1]]);
                let lng_coarse = i16::from_be_bytes([f[i + 2], f[i + 3]]);
                let lat_fine = f[i + 4] >> 4;
                let lng_fine = f[i + 4] & 0x0F;
                let latitude =
                    ((((lat_coarse as i32) << 4) | lat_fine as i32) as f64) * 90.0 / 524288.0;
                let longitude =
                    ((((lng_coarse as i32) << 4) | lng_fine as i32) as f64) * 180.0 / 524288.0;
                state.tii_positions.insert(key, (latitude, longitude));
                desc += &format!(
                    ", Lat Lng coarse=0x{lat_coarse:X} 0x{lng_coarse:X}, \
                     Lat Lng fine=0x{lat_fine:X} 0x{lng_fine:X} => Lat Lng={latitude:.6}, {longitude:.6}"
                );
                i += 5;
            } else {
                desc += ", invalid length of Latitude Longitude coarse fine";
            }
            r.msg(0, desc);
        } else {
            // Sub-identifier
            if i >= figlen {
                desc += ", invalid fig length or Number of SubId fields length";
                r.msg(0, desc);
                break;
            }

            let rfu = f[i] >> 3;
            let nb_sub_id_fields = (f[i] & 0x07) as usize;
            if rfu != 0 {
                desc += &format!(", Rfu={rfu} invalid value");
            }
            desc += &format!(
                ", Number of SubId fields={nb_sub_id_fields}{}",
                if nb_sub_id_fields == 0 { ", CEI" } else { "" }
            );
            r.msg(0, desc);
            i += 1;

            let mut j = i;
            while j < i + nb_sub_id_fields * 6 && j + 5 < figlen {
                let sub_id = f[j] >> 3;
                let mut desc = format!("SubId=0x{sub_id:X}");
                if sub_id == 0 || sub_id > 23 {
                    desc += " invalid value";
                }

                let td = ((f[j] as u16 & 0x03) << 8) | f[j + 1] as u16;
                let lat_offset = i16::from_be_bytes([f[j + 2], f[j + 3]]);
                let lng_offset = i16::from_be_bytes([f[j + 4], f[j + 5]]);
                desc += &format!(
                    ", TD={td} us, Lat Lng offset=0x{lat_offset:X} 0x{lng_offset:X}"
                );

                let lat_sub = 90.0 * lat_offset as f64 / 524288.0;
                let lng_sub = 180.0 * lng_offset as f64 / 524288.0;
                if let Some(&(lat_main, lng_main)) = state.tii_positions.get(&key) {
                    desc += &format!(
                        " => Lat Lng={:.6}, {:.6}",
                        lat_sub + lat_main,
                        lng_sub + lng_main
                    );
                } else {
                    desc += &format!(
                        " => Lat Lng={lat_sub:.6}, {lng_sub:.6} wrong value because \
                         Main identifier latitude/longitude not available in database"
                    );
                }
                r.msg(1, desc);
                j += 6;
            }
            i += nb_sub_id_fields * 6;
        }
    }

    r
}

// FIG 0/24 Other ensemble services
// EN 300 401 8.1.10.2
fn fig0_24(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let sid_len = if fig0.pd { 4 } else { 2 };
    let mut i = 1;

    while i + sid_len < figlen {
        let sid = if fig0.pd {
            u32::from_be_bytes([f[i], f[i + 1], f[i + 2], f[i + 3]])
        } else {
            u16::from_be_bytes([f[i], f[i + 1]]) as u32
        };
        i += sid_len;

        r.complete |= is_complete(&mut state.services_0_24_seen, sid as u64);
        let rfa = f[i] >> 7;
        let caid = (f[i] >> 4) & 0x07;
        let number_of_eids = (f[i] & 0x0F) as usize;
        let key = ((fig0.oe as u64) << 33) | ((fig0.pd as u64) << 32) | sid as u64;

        let mut desc = format!(
            "SId=0x{sid:X}, CAId={caid}, Number of EId={number_of_eids}, database key={key:09}"
        );
        if rfa != 0 {
            desc += &format!(", Rfa={rfa} invalid value");
        }
        // Change Event Indication
        if number_of_eids == 0 {
            desc += ", CEI";
        }
        r.msg(0, desc);
        i += 1;

        let mut j = i;
        while j + 1 < figlen && j < i + number_of_eids * 2 {
            let eid = u16::from_be_bytes([f[j], f[j + 1]]);
            r.msg(1, format!("EId 0x{eid:04x}"));
            j += 2;
        }
        i += number_of_eids * 2;
    }

    r
}

// FIG 0/25 Other ensemble announcement support
// EN 300 401 8.1.10.5.1
fn fig0_25(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 4 < figlen {
        let sid = u16::from_be_bytes([f[i], f[i + 1]]);
        r.complete |= is_complete(&mut state.services_0_25_seen, sid as u64);
        let asu_flags = u16::from_be_bytes([f[i + 2], f[i + 3]]);
        let rfu = f[i + 4] >> 4;
        let number_eids = (f[i + 4] & 0x0F) as usize;

        let mut desc = format!("SId=0x{sid:X}, Asu flags=0x{asu_flags:X}");
        if rfu != 0 {
            desc += &format!(", Rfu={rfu} invalid value");
        }
        desc += &format!(", Number of EIds={number_eids}");
        let key = ((fig0.oe as u32) << 17) | ((fig0.pd as u32) << 16) | sid as u32;
        desc += &format!(", database key=0x{key:05x}");
        // Change Event Indication
        if number_eids == 0 {
            desc += ", CEI";
        }
        r.msg(0, desc);
        i += 5;

        let mut j = 0;
        while j < number_eids && i + 1 < figlen {
            let eid = u16::from_be_bytes([f[i], f[i + 1]]);
            r.msg(1, format!("EId=0x{eid:X}"));
            i += 2;
            j += 1;
        }
        if j < number_eids {
            r.err("missing EId, fig length too short !");
        }

        announcement_flags("Other Ensemble Announcement support", asu_flags, &mut r);
    }

    r
}

// FIG 0/26 Other ensemble announcement switching
// EN 300 401 8.1.10.5.2
fn fig0_26(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 6 < figlen {
        let cluster_id_current = f[i];
        r.complete |= is_complete(&mut state.clusters_0_26_seen, cluster_id_current as u64);
        let asw_flags = u16::from_be_bytes([f[i + 1], f[i + 2]]);
        let new_flag = f[i + 3] >> 7;
        let region_flag = (f[i + 3] >> 6) & 0x01;
        let region_id_current = f[i + 3] & 0x3F;
        let eid_other = u16::from_be_bytes([f[i + 4], f[i + 5]]);
        let cluster_id_other = f[i + 6];

        r.msg(0, "-");
        r.msg(1, format!("Cluster Id Current Ensemble=0x{cluster_id_current:X}"));
        r.msg(1, format!("Asw flags=0x{asw_flags:X}"));
        r.msg(1, format!(
            "New flag={new_flag} {} announcement",
            if new_flag != 0 { "newly introduced" } else { "repeated" }
        ));
        r.msg(1, format!(
            "Region flag={region_flag} last byte {}",
            if region_flag != 0 {
                "present"
            } else {
                "absent. The announcement concerns the whole service area"
            }
        ));
        r.msg(1, format!("Region Id Current Ensemble=0x{region_id_current:X}"));
        r.msg(1, format!("EId Other Ensemble=0x{eid_other:X}"));
        r.msg(1, format!("Cluster Id Other Ensemble=0x{cluster_id_other:X}"));

        i += 7;
        if region_flag != 0 {
            if i < figlen {
                let rfa = f[i] >> 6;
                let region_id_other = f[i] & 0x3F;
                if rfa != 0 {
                    r.err(format!("Rfa={rfa} invalid value"));
                }
                r.msg(1, format!("Region Id Other Ensemble=0x{region_id_other:X}"));
            } else {
                r.err("missing Region Id Other Ensemble, fig length too short !");
            }
            i += 1;
        }

        r.msg(1, "Announcement switching:");
        for j in 0..16 {
            if asw_flags & (1 << j) != 0 {
                r.msg(2, format!("- {}", tables::announcement_type(j)));
            }
        }
    }

    r
}

// FIG 0/27 FM announcement support
// EN 300 401 8.1.11.2.1
fn fig0_27(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 2 < figlen {
        let sid = u16::from_be_bytes([f[i], f[i + 1]]);
        r.complete |= is_complete(&mut state.services_0_27_seen, sid as u64);
        let rfu = f[i + 2] >> 4;
        let number_pi_codes = (f[i + 2] & 0x0F) as usize;
        let key = ((fig0.oe as u8) << 5) | ((fig0.pd as u8) << 4) | number_pi_codes as u8;

        let mut desc = format!("SId=0x{sid:X}");
        if rfu != 0 {
            desc += &format!(", Rfu={rfu} invalid value");
        }
        desc += &format!(", Number of PI codes={number_pi_codes}");
        if number_pi_codes > 12 {
            desc += " above maximum value of 12";
        }
        desc += &format!(", database key=0x{key:02X}");
        // CEI is signalled by Number of PI codes = 0
        if number_pi_codes == 0 {
            desc += ", CEI";
        }
        r.msg(0, desc);
        i += 3;

        let mut j = 0;
        while j < number_pi_codes && i + 1 < figlen {
            let pi = u16::from_be_bytes([f[i], f[i + 1]]);
            r.msg(1, format!("PI=0x{pi:X}"));
            i += 2;
            j += 1;
        }
        if j != number_pi_codes {
            r.err("fig length too short !");
        }
    }

    r
}

// FIG 0/28 FM announcement switching
// EN 300 401 8.1.11.2.2
fn fig0_28(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();
    let mut i = 1;

    while i + 3 < figlen {
        let cluster_id_current = f[i];
        r.complete |=
            is_complete_reinsert(&mut state.clusters_0_28_seen, cluster_id_current as u64);
        let new_flag = f[i + 1] >> 7;
        let rfa = (f[i + 1] >> 6) & 0x01;
        let region_id_current = f[i + 1] & 0x3F;
        let pi = u16::from_be_bytes([f[i + 2], f[i + 3]]);

        r.msg(0, "-");
        r.msg(1, format!("Cluster Id Current Ensemble=0x{cluster_id_current:X}"));
        if cluster_id_current == 0 {
            r.err("Cluster Id Current Ensemble invalid value 0");
        }
        r.msg(1, format!(
            "New flag={new_flag} {} announcement",
            if new_flag != 0 { "newly introduced" } else { "repeated" }
        ));
        if rfa != 0 {
            r.err(format!("Rfa={rfa} invalid value"));
        }
        r.msg(1, format!("Region Id Current Ensemble=0x{region_id_current:X}"));
        r.msg(1, format!("PI=0x{pi:X}"));
        i += 4;
    }

    r
}

// FIG 0/31 FIC re-direction
// EN 300 401 8.1.12
fn fig0_31(fig0: &Fig0, state: &mut Fig0State) -> FigResult {
    let mut r = FigResult::default();
    let f = fig0.f;
    let figlen = fig0.figlen();

    if figlen >= 7 {
        let type0_flags = u32::from_be_bytes([f[1], f[2], f[3], f[4]]);
        let type1_flags = f[5];
        let type2_flags = f[6];

        let key = ((type1_flags as u64) << 32)
            | ((type2_flags as u64) << 40)
            | type0_flags as u64;
        r.complete |= is_complete_reinsert(&mut state.redirections_seen, key);

        r.msg(0, format!("FIG type 0 flag field=0x{type0_flags:X}"));
        r.msg(0, format!("FIG type 1 flag field=0x{type1_flags:X}"));
        r.msg(0, format!("FIG type 2 flag field=0x{type2_flags:X}"));

        let oe = fig0.oe as u8;
        for j in 0..32u32 {
            if type0_flags & (1 << j) == 0 {
                continue;
            }
            if j <= 5
                || j == 8
                || j == 10
                || j == 13
                || j == 14
                || j == 19
                || j == 26
                || j == 28
            {
                r.err(format!(
                    "OE {oe} FIG 0/{j}=carried in AIC, invalid configuration, \
                     shall always be carried entirely in the FIC"
                ));
            } else if j == 21 || j == 24 {
                r.msg(1, format!(
                    "OE {oe} FIG 0/{j}=carried in AIC, same shall be carried in FIC"
                ));
            } else if !fig0.oe {
                r.msg(1, format!(
                    "OE {oe} FIG 0/{j}=carried in AIC, same shall be carried in FIC"
                ));
            } else {
                r.msg(1, format!(
                    "OE {oe} FIG 0/{j}=carried in AIC, may be carried entirely in AIC"
                ));
            }
        }

        for (figtype, flags) in [(1u8, type1_flags), (2, type2_flags)] {
            for j in 0..8u8 {
                if flags & (1 << j) == 0 {
                    continue;
                }
                if !fig0.oe {
                    r.msg(1, format!(
                        "OE {oe} FIG {figtype}/{j}=carried in AIC, same shall be carried in FIC"
                    ));
                } else {
                    r.msg(1, format!(
                        "OE {oe} FIG {figtype}/{j}=carried in AIC, may be carried entirely in AIC"
                    ));
                }
            }
        }
    }

    if figlen != 7 {
        r.err(format!("invalid length {figlen}, expecting 7"));
    }

    r
}

#[cfg(test)]
fn decode(data: &[u8], state: &mut Fig0State, ensemble: &mut Ensemble) -> FigResult {
    let mut wm = WatermarkDecoder::new();
    let fig0 = Fig0::new(data, true);
    fig0_select(&fig0, state, ensemble, &mut wm)
}

#[test]
fn fig0_0_updates_ensemble_id() {
    let mut state = Fig0State::new();
    let mut ensemble = Ensemble::default();

    // EId 0xD999, no change, CIF count 12/34
    let data = [0x00u8, 0xD9, 0x99, 0x0C, 0x22];
    let r = decode(&data, &mut state, &mut ensemble);

    assert!(r.complete);
    assert!(r.errors.is_empty());
    assert_eq!(ensemble.eid, 0xD999);
    assert_eq!(r.msgs[0].text, "Ensemble ID=0xd999");
}

#[test]
fn fig0_1_long_form_creates_subchannel() {
    let mut state = Fig0State::new();
    let mut ensemble = Ensemble::default();

    // subch 3, start 54, long form, EEP 3-A (option 0, level 3), size 84
    let data = [0x01u8, 0x0C, 0x36, 0x8C, 0x54];
    let r = decode(&data, &mut state, &mut ensemble);

    assert!(!r.complete);
    let subch = ensemble.get_subchannel(3).unwrap();
    assert_eq!(subch.start_address, 54);
    assert_eq!(subch.num_cu, 84);
    assert_eq!(subch.protection, "EEP 3-A");
}

#[test]
fn fig0_1_second_pass_completes() {
    let mut state = Fig0State::new();
    let mut ensemble = Ensemble::default();

    let data = [0x01u8, 0x0C, 0x36, 0x8C, 0x54];
    assert!(!decode(&data, &mut state, &mut ensemble).complete);
    assert!(decode(&data, &mut state, &mut ensemble).complete);
}

#[test]
fn fig0_10_pushes_confind_bit() {
    let mut wm = WatermarkDecoder::new();
    // MJD 57388, ConfInd set, short form 14:25
    let mjd = 57388u32;
    let data = [
        0x0Au8,
        (mjd >> 10) as u8 & 0x7F,
        (mjd >> 2) as u8,
        ((mjd as u8 & 0x03) << 6) | 0x10 | ((14 >> 2) & 0x07),
        ((14u8 & 0x03) << 6) | 25,
    ];
    let fig0 = Fig0::new(&data, true);
    let r = fig0_10(&fig0, &mut wm);

    assert!(r.complete);
    assert!(r.msgs[0].text.contains("Fri Jan 01 2016"));
    assert!(r.msgs[0].text.contains("14:25"));
}

#[test]
fn fig0_17_uses_international_table() {
    let mut state = Fig0State::new();
    let mut ensemble = Ensemble::default();

    // FIG 0/9 selects table 1
    let fig0_9_data = [0x09u8, 0x00, 0xE1, 0x01];
    decode(&fig0_9_data, &mut state, &mut ensemble);
    assert_eq!(state.international_table(), 1);

    // SId 0xABCD, no language, Int code 10 (Pop Music)
    let data = [0x11u8, 0xAB, 0xCD, 0x00, 0x0A];
    let r = decode(&data, &mut state, &mut ensemble);
    assert!(r.msgs.iter().any(|m| m.text.contains("Pop Music")));
}

#[test]
fn fig0_31_flags_invalid_redirection() {
    let mut state = Fig0State::new();
    let mut ensemble = Ensemble::default();

    // FIG 0/0 carried in AIC is an invalid configuration
    let data = [0x1Fu8, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00];
    let r = decode(&data, &mut state, &mut ensemble);
    assert_eq!(r.errors.len(), 1);
    assert!(r.errors[0].contains("FIG 0/0"));
}
