//! Ensemble database, gathers data from the FIC for the statistics
//! output.
//!
//! Services, components and subchannels are created lazily as FIGs
//! referring to them arrive; lookups that require an existing entry
//! report "not yet in DB" instead.

use std::collections::BTreeMap;

use crate::fic::charset::{self, CharacterSet};

/// A service, component or ensemble label.
///
/// FIG1 carries the 16-character EBU Latin label with the short label
/// flag field; FIG2 carries an extended label split over up to eight
/// segments, keyed by segment index.
#[derive(Debug, Default, Clone)]
pub struct Label {
    /// FIG1 label, already converted to UTF-8.
    pub label: String,
    /// FIG1 short label flag field.
    pub shortlabel_flag: u16,
    pub segments: BTreeMap<u8, Vec<u8>>,
    pub extended_label_charset: CharacterSet,
    pub toggle_flag: bool,
    /// Total segment count announced in segment 0, zero until seen.
    pub segment_count: u8,
}

impl Label {
    pub fn shortlabel(&self) -> String {
        charset::flag_to_short_label(&self.label, self.shortlabel_flag)
    }

    /// Concatenates and decodes the FIG2 segments. Returns an empty
    /// string while segments are still missing.
    pub fn assemble(&self) -> String {
        if self.segment_count == 0 {
            return String::new();
        }

        let mut bytes = Vec::new();
        for index in 0..self.segment_count {
            match self.segments.get(&index) {
                Some(segment) => bytes.extend_from_slice(segment),
                None => return String::new(),
            }
        }

        match self.extended_label_charset {
            CharacterSet::Ucs2 => charset::ucs2_to_utf8(&bytes),
            CharacterSet::Utf8 => charset::utf8_lossy(&bytes),
            _ => String::new(),
        }
    }

    /// Which segments have been received so far, for display.
    pub fn assembly_state(&self) -> String {
        let present: Vec<String> = self.segments.keys().map(|k| k.to_string()).collect();
        format!("[{} out of {}]", present.join(","), self.segment_count)
    }
}

#[derive(Debug, Default, Clone)]
pub struct Component {
    pub subch_id: Option<u8>,
    pub scids: Option<u8>,
    pub label: Label,
}

#[derive(Debug, Default, Clone)]
pub struct Service {
    pub id: u32,
    pub label: Label,
    pub programme_not_data: bool,
    pub components: Vec<Component>,
}

impl Service {
    pub fn get_or_create_component(&mut self, subch_id: u8) -> &mut Component {
        let pos = self
            .components
            .iter()
            .position(|c| c.subch_id == Some(subch_id));

        match pos {
            Some(pos) => &mut self.components[pos],
            None => {
                self.components.push(Component {
                    subch_id: Some(subch_id),
                    ..Default::default()
                });
                self.components.last_mut().unwrap()
            }
        }
    }

    pub fn get_component_by_scids(&mut self, scids: u8) -> Option<&mut Component> {
        self.components
            .iter_mut()
            .find(|c| c.scids == Some(scids))
    }
}

#[derive(Debug, Default, Clone)]
pub struct Subchannel {
    pub id: u8,
    pub start_address: u16,
    pub num_cu: u16,
    /// Short protection description, e.g. "EEP 3-A".
    pub protection: String,
}

/// All information gathered about the ensemble so far.
#[derive(Debug, Default, Clone)]
pub struct Ensemble {
    pub eid: u16,
    pub label: Label,
    pub services: Vec<Service>,
    pub subchannels: Vec<Subchannel>,
}

impl Ensemble {
    pub fn get_service(&mut self, service_id: u32) -> Option<&mut Service> {
        self.services.iter_mut().find(|s| s.id == service_id)
    }

    pub fn get_or_create_service(&mut self, service_id: u32) -> &mut Service {
        let pos = self.services.iter().position(|s| s.id == service_id);

        match pos {
            Some(pos) => &mut self.services[pos],
            None => {
                self.services.push(Service {
                    id: service_id,
                    ..Default::default()
                });
                self.services.last_mut().unwrap()
            }
        }
    }

    pub fn get_subchannel(&mut self, subch_id: u8) -> Option<&mut Subchannel> {
        self.subchannels.iter_mut().find(|s| s.id == subch_id)
    }

    pub fn get_or_create_subchannel(&mut self, subch_id: u8) -> &mut Subchannel {
        let pos = self.subchannels.iter().position(|s| s.id == subch_id);

        match pos {
            Some(pos) => &mut self.subchannels[pos],
            None => {
                self.subchannels.push(Subchannel {
                    id: subch_id,
                    ..Default::default()
                });
                self.subchannels.last_mut().unwrap()
            }
        }
    }
}

#[test]
fn lazy_service_creation() {
    let mut ensemble = Ensemble::default();

    assert!(ensemble.get_service(0xD123).is_none());
    ensemble.get_or_create_service(0xD123).programme_not_data = true;
    assert!(ensemble.get_service(0xD123).is_some());
    assert_eq!(ensemble.services.len(), 1);

    ensemble.get_or_create_service(0xD123);
    assert_eq!(ensemble.services.len(), 1);
}

#[test]
fn label_assembly() {
    let mut label = Label {
        extended_label_charset: CharacterSet::Utf8,
        segment_count: 2,
        ..Default::default()
    };

    label.segments.insert(0, b"Radio ".to_vec());
    assert_eq!(label.assemble(), "");
    assert_eq!(label.assembly_state(), "[0 out of 2]");

    label.segments.insert(1, "Øst".as_bytes().to_vec());
    assert_eq!(label.assemble(), "Radio Øst");
}

#[test]
fn short_label_from_flag() {
    let label = Label {
        label: "DAB Radio 1     ".to_owned(),
        shortlabel_flag: 0xE000,
        ..Default::default()
    };

    assert_eq!(label.shortlabel(), "DAB");
}
