//! YAML statistics document written at the end of an analysis run.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use dabeti::fic::database::Ensemble;

#[derive(Debug, Serialize)]
pub struct StatisticsDocument {
    pub ensemble: EnsembleStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decoded_subchannels: Vec<SubchannelDumpStats>,
}

#[derive(Debug, Serialize)]
pub struct EnsembleStats {
    /// Ensemble id, e.g. "0xD999".
    pub id: String,
    pub label: String,
    pub shortlabel: String,
    pub services: Vec<ServiceStats>,
}

#[derive(Debug, Serialize)]
pub struct ServiceStats {
    pub id: String,
    pub label: String,
    pub shortlabel: String,
    pub programme: bool,
    pub components: Vec<ComponentStats>,
}

#[derive(Debug, Serialize)]
pub struct ComponentStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scids: Option<u8>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subchannel: Option<SubchannelStats>,
}

#[derive(Debug, Serialize)]
pub struct SubchannelStats {
    pub id: u8,
    pub start_address: u16,
    pub size_cu: u16,
    pub protection: String,
}

/// Per-subchannel totals of the `--decode-stream` MSC extraction.
#[derive(Debug, Serialize)]
pub struct SubchannelDumpStats {
    pub subchannel_id: u8,
    pub access_units: usize,
    pub bytes_written: usize,
    pub rs_corrections: usize,
}

impl StatisticsDocument {
    pub fn from_ensemble(ensemble: &Ensemble, decoded: Vec<SubchannelDumpStats>) -> Self {
        let services = ensemble
            .services
            .iter()
            .map(|service| ServiceStats {
                id: format!("0x{:X}", service.id),
                label: service.label.label.trim_end().to_owned(),
                shortlabel: service.label.shortlabel().trim_end().to_owned(),
                programme: service.programme_not_data,
                components: service
                    .components
                    .iter()
                    .map(|component| ComponentStats {
                        scids: component.scids,
                        label: component.label.label.trim_end().to_owned(),
                        subchannel: component.subch_id.and_then(|subch_id| {
                            ensemble
                                .subchannels
                                .iter()
                                .find(|s| s.id == subch_id)
                                .map(|s| SubchannelStats {
                                    id: s.id,
                                    start_address: s.start_address,
                                    size_cu: s.num_cu,
                                    protection: s.protection.clone(),
                                })
                        }),
                    })
                    .collect(),
            })
            .collect();

        Self {
            ensemble: EnsembleStats {
                id: format!("0x{:04X}", ensemble.eid),
                label: ensemble.label.label.trim_end().to_owned(),
                shortlabel: ensemble.label.shortlabel().trim_end().to_owned(),
                services,
            },
            decoded_subchannels: decoded,
        }
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml_ng::to_string(self)?;
        let mut file = File::create(path)?;
        file.write_all(yaml.as_bytes())?;
        Ok(())
    }
}

#[test]
fn document_from_database() {
    let mut ensemble = Ensemble::default();
    ensemble.eid = 0xD999;
    ensemble.label.label = "DAB Ensemble    ".to_owned();
    ensemble.label.shortlabel_flag = 0xE000;

    let subch = ensemble.get_or_create_subchannel(3);
    subch.start_address = 54;
    subch.num_cu = 84;
    subch.protection = "EEP 3-A".to_owned();

    let service = ensemble.get_or_create_service(0x4001);
    service.programme_not_data = true;
    service.label.label = "Radio 1         ".to_owned();
    service.get_or_create_component(3).scids = Some(0);

    let document = StatisticsDocument::from_ensemble(&ensemble, Vec::new());
    assert_eq!(document.ensemble.id, "0xD999");
    assert_eq!(document.ensemble.shortlabel, "DAB");
    assert_eq!(document.ensemble.services.len(), 1);

    let service = &document.ensemble.services[0];
    assert_eq!(service.id, "0x4001");
    assert!(service.programme);
    let subch = service.components[0].subchannel.as_ref().unwrap();
    assert_eq!(subch.id, 3);
    assert_eq!(subch.protection, "EEP 3-A");

    let yaml = serde_yaml_ng::to_string(&document).unwrap();
    assert!(yaml.contains("0xD999"));
    assert!(!yaml.contains("decoded_subchannels"));
}
