use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, io, path::PathBuf};
use validator::{Validate, ValidationError};

pub const DEFAULT_CONFIG_PATH: &str = "./provisioner.yaml";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Validation errors: {0}")]
    ValidationError(String),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

/// How users get attached to the domain through the identity federation instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserAssignment {
    #[default]
    Manual,
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ConfigFile {
    pub location: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DomainSettings {
    #[validate(length(min = 1, max = 64))]
    pub name: String,

    pub description: String,

    pub execution_role: String,

    pub service_role: String,

    pub idc_instance_arn: String,

    pub user_assignment: UserAssignment,

    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Blueprint {
    #[validate(length(min = 1))]
    pub id: String,

    /// Only used in progress output, never sent to the service.
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BlueprintSettings {
    pub manage_access_role: String,

    pub provisioning_role: String,

    /// Empty means "the client region only".
    pub enabled_regions: Vec<String>,

    #[validate]
    pub items: Vec<Blueprint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StackSettings {
    #[validate(length(min = 1))]
    pub stack_name: String,

    pub region: Option<String>,

    #[validate(custom = "validate_json_file")]
    pub json: ConfigFile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    pub profile_name: Option<String>,

    /// Left out of a file, the default provider chain picks the region.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub region: Option<String>,

    pub settle_seconds: u64,

    #[validate]
    pub domain: DomainSettings,

    #[validate]
    pub blueprints: BlueprintSettings,

    #[validate(custom = "validate_json_file")]
    pub summary: ConfigFile,

    #[validate]
    pub stack: StackSettings,
}

impl Default for DomainSettings {
    fn default() -> Self {
        let tags = [
            ("Environment", "Test"),
            ("Purpose", "SageMaker Unified Studio Rust API"),
            ("CreatedBy", "datazone-domain-provisioner"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

        return Self {
            name: String::from("Corporate-Python-API"),
            description: String::from(
                "SageMaker Unified Studio domain created via the DataZone API",
            ),
            execution_role: String::from(
                "arn:aws:iam::000557565608:role/service-role/AmazonSageMakerDomainExecution",
            ),
            service_role: String::from(
                "arn:aws:iam::000557565608:role/service-role/AmazonSageMakerDomainService",
            ),
            idc_instance_arn: String::from("arn:aws:sso:::instance/ssoins-790730fbc9d864c7"),
            user_assignment: UserAssignment::Manual,
            tags,
        };
    }
}

impl Default for BlueprintSettings {
    fn default() -> Self {
        let items = [
            ("ciw5fxhc6v6rio", "Lakehouse Catalog"),
            ("c9gx7j7bemrv0w", "ML Experiments"),
            ("4k186sfh08eqxc", "Tooling"),
            ("d8w7c3fmbsz5cg", "Data Lake"),
            ("c9ybygnen3sukw", "Workflows"),
        ]
        .into_iter()
        .map(|(id, label)| Blueprint {
            id: id.to_string(),
            label: label.to_string(),
        })
        .collect();

        return Self {
            manage_access_role: String::from(
                "arn:aws:iam::000557565608:role/service-role/AmazonSageMakerManageAccess-us-west-2-dzd_c3mt22a3kr50wg",
            ),
            provisioning_role: String::from(
                "arn:aws:iam::000557565608:role/service-role/AmazonSageMakerProvisioning-000557565608",
            ),
            enabled_regions: Vec::new(),
            items,
        };
    }
}

impl Default for StackSettings {
    fn default() -> Self {
        return Self {
            stack_name: String::from("SageMakerUnifiedStudioStack"),
            region: None,
            json: ConfigFile {
                location: PathBuf::from("stack_outputs.json"),
            },
        };
    }
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            profile_name: None,
            region: Some(String::from("us-west-2")),
            settle_seconds: 5,
            domain: DomainSettings::default(),
            blueprints: BlueprintSettings::default(),
            summary: ConfigFile {
                location: PathBuf::from("domain_info.json"),
            },
            stack: StackSettings::default(),
        };
    }
}

pub fn parse(path: &PathBuf) -> Result<Config, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    let config: Config = match serde_yaml::from_str(&contents) {
        Ok(data) => Ok(data),
        Err(error) => Err(Error::ParsingError(error.to_string())),
    }?;

    check(&config)?;

    return Ok(config);
}

/// Like [`parse`], but a missing file yields the built-in deployment defaults.
pub fn load(path: &PathBuf) -> Result<Config, Error> {
    let result = parse(path);
    if let Err(Error::FileNotFound(location)) = &result {
        tracing::info!(%location, "no config file, using built-in defaults");
        let config = Config::default();
        check(&config)?;
        return Ok(config);
    }

    return result;
}

fn check(config: &Config) -> Result<(), Error> {
    match config.validate() {
        Ok(_) => return Ok(()),
        Err(error) => return Err(Error::ValidationError(error.to_string())),
    }
}

fn validate_json_file(json_file: &ConfigFile) -> Result<(), ValidationError> {
    let file_extension = match json_file.location.extension() {
        Some(extension) => extension,
        None => {
            return Err(ValidationError::new(
                "Unable to parse the extension of the JSON file location",
            ))
        }
    };
    if file_extension != "json" {
        return Err(ValidationError::new(
            "The JSON file location has to end with `.json`",
        ));
    }

    return Ok(());
}
