use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::client::{BlueprintConfigurationRecord, DomainRecord};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to serialize {0}: {1}")]
    SerializationError(String, serde_json::Error),

    #[error("Unable to write {0}: {1}")]
    WriteError(String, std::io::Error),
}

/// Outcome of a provisioning run, built from the read-back state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub domain_id: String,
    pub domain_arn: String,
    pub portal_url: String,
    pub root_domain_unit_id: String,
    pub configured_blueprints: Vec<String>,
}

impl SummaryRecord {
    pub fn new(domain: &DomainRecord, blueprints: &[BlueprintConfigurationRecord]) -> Self {
        return Self {
            domain_id: domain.id.clone(),
            domain_arn: domain.arn.clone(),
            portal_url: domain.portal_url.clone(),
            root_domain_unit_id: domain.root_domain_unit_id.clone(),
            configured_blueprints: blueprints
                .iter()
                .map(|blueprint| blueprint.environment_blueprint_id.clone())
                .collect(),
        };
    }
}

/// Writes `contents` as indented JSON, replacing whatever is at `path`.
pub fn write_json<T: Serialize>(path: &PathBuf, contents: &T) -> Result<(), Error> {
    let location = path.display().to_string();

    let file_contents = match serde_json::to_string_pretty(contents) {
        Ok(data) => data,
        Err(error) => return Err(Error::SerializationError(location, error)),
    };

    match fs::write(path, file_contents) {
        Ok(_) => return Ok(()),
        Err(error) => return Err(Error::WriteError(location, error)),
    }
}
