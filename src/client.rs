use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_datazone::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_datazone::primitives::{DateTime, DateTimeFormat};
use aws_sdk_datazone::types::{AuthType, DomainVersion, SingleSignOn};
use aws_types::region::Region;
use aws_types::SdkConfig;
use serde::{Deserialize, Serialize};

use crate::config::{Config, DomainSettings, UserAssignment};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Service error occurred: {0}.")]
    ServiceError(String),

    #[error("Unknown error occurred: {0}.")]
    UnknownError(String),

    #[error("No region configured and none found in the environment")]
    MissingRegion,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub id: String,
    pub name: String,
    pub arn: String,
    pub portal_url: String,
    pub root_domain_unit_id: String,
    pub status: String,
    pub domain_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlueprintConfigurationRecord {
    pub domain_id: String,
    pub environment_blueprint_id: String,
    pub enabled_regions: Vec<String>,
    pub created_at: Option<String>,
}

/// The control-plane calls needed to stand up a domain and its blueprints.
///
/// Every call is a single request. Nothing here retries or paginates.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Region the handle is bound to.
    fn region(&self) -> &str;

    async fn create_domain(&self, domain: &DomainSettings) -> Result<DomainRecord, Error>;

    async fn configure_blueprint(
        &self,
        domain_id: &str,
        blueprint_id: &str,
        manage_access_role: &str,
        provisioning_role: &str,
        enabled_regions: &[String],
    ) -> Result<BlueprintConfigurationRecord, Error>;

    async fn list_blueprint_configurations(
        &self,
        domain_id: &str,
    ) -> Result<Vec<BlueprintConfigurationRecord>, Error>;

    async fn get_domain(&self, domain_id: &str) -> Result<DomainRecord, Error>;
}

/// Loads the shared SDK config for `region`, falling back to the default
/// provider chain when no region is given.
pub async fn load_sdk_config(
    region: Option<&String>,
    profile_name: Option<&String>,
) -> Result<SdkConfig, Error> {
    let region = match region {
        Some(provided_region) => Region::new(provided_region.clone()),
        None => match RegionProviderChain::default_provider().region().await {
            Some(found_region) => found_region,
            None => return Err(Error::MissingRegion),
        },
    };

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
    if let Some(profile_name) = profile_name {
        loader = loader.profile_name(profile_name);
    }

    return Ok(loader.load().await);
}

pub struct DataZoneClient {
    region: String,

    client: aws_sdk_datazone::Client,
}

impl DataZoneClient {
    pub async fn new(config: &Config) -> Result<Self, Error> {
        let sdk_config =
            load_sdk_config(config.region.as_ref(), config.profile_name.as_ref()).await?;
        let region = match sdk_config.region() {
            Some(region) => region.to_string(),
            None => return Err(Error::MissingRegion),
        };
        let client = aws_sdk_datazone::Client::new(&sdk_config);

        return Ok(Self { region, client });
    }
}

#[async_trait]
impl ControlPlane for DataZoneClient {
    fn region(&self) -> &str {
        return &self.region;
    }

    async fn create_domain(&self, domain: &DomainSettings) -> Result<DomainRecord, Error> {
        let user_assignment = match domain.user_assignment {
            UserAssignment::Manual => aws_sdk_datazone::types::UserAssignment::Manual,
            UserAssignment::Automatic => aws_sdk_datazone::types::UserAssignment::Automatic,
        };
        let single_sign_on = SingleSignOn::builder()
            .r#type(AuthType::IamIdc)
            .user_assignment(user_assignment)
            .idc_instance_arn(&domain.idc_instance_arn)
            .build();

        let mut request = self
            .client
            .create_domain()
            .name(&domain.name)
            .description(&domain.description)
            .domain_execution_role(&domain.execution_role)
            .service_role(&domain.service_role)
            .domain_version(DomainVersion::V2)
            .single_sign_on(single_sign_on);
        if !domain.tags.is_empty() {
            let tags: HashMap<String, String> = domain.tags.clone().into_iter().collect();
            request = request.set_tags(Some(tags));
        }

        tracing::debug!(name = %domain.name, region = %self.region, "CreateDomain");
        let output = request.send().await.map_err(from_sdk_error)?;

        return Ok(DomainRecord {
            id: output.id().to_string(),
            name: output.name().unwrap_or_default().to_string(),
            arn: output.arn().unwrap_or_default().to_string(),
            portal_url: output.portal_url().unwrap_or_default().to_string(),
            root_domain_unit_id: output.root_domain_unit_id().unwrap_or_default().to_string(),
            status: output
                .status()
                .map(|status| status.as_str().to_string())
                .unwrap_or_default(),
            domain_version: output
                .domain_version()
                .map(|version| version.as_str().to_string())
                .unwrap_or_default(),
        });
    }

    async fn configure_blueprint(
        &self,
        domain_id: &str,
        blueprint_id: &str,
        manage_access_role: &str,
        provisioning_role: &str,
        enabled_regions: &[String],
    ) -> Result<BlueprintConfigurationRecord, Error> {
        tracing::debug!(
            domain_id,
            blueprint_id,
            ?enabled_regions,
            "PutEnvironmentBlueprintConfiguration"
        );
        let output = self
            .client
            .put_environment_blueprint_configuration()
            .domain_identifier(domain_id)
            .environment_blueprint_identifier(blueprint_id)
            .manage_access_role_arn(manage_access_role)
            .provisioning_role_arn(provisioning_role)
            .set_enabled_regions(Some(enabled_regions.to_vec()))
            .send()
            .await
            .map_err(from_sdk_error)?;

        return Ok(BlueprintConfigurationRecord {
            domain_id: output.domain_id().to_string(),
            environment_blueprint_id: output.environment_blueprint_id().to_string(),
            enabled_regions: output.enabled_regions().to_vec(),
            created_at: format_timestamp(output.created_at()),
        });
    }

    async fn list_blueprint_configurations(
        &self,
        domain_id: &str,
    ) -> Result<Vec<BlueprintConfigurationRecord>, Error> {
        tracing::debug!(domain_id, "ListEnvironmentBlueprintConfigurations");
        let output = self
            .client
            .list_environment_blueprint_configurations()
            .domain_identifier(domain_id)
            .send()
            .await
            .map_err(from_sdk_error)?;

        let items = output
            .items()
            .iter()
            .map(|item| BlueprintConfigurationRecord {
                domain_id: item.domain_id().to_string(),
                environment_blueprint_id: item.environment_blueprint_id().to_string(),
                enabled_regions: item.enabled_regions().to_vec(),
                created_at: format_timestamp(item.created_at()),
            })
            .collect();

        return Ok(items);
    }

    async fn get_domain(&self, domain_id: &str) -> Result<DomainRecord, Error> {
        tracing::debug!(domain_id, "GetDomain");
        let output = self
            .client
            .get_domain()
            .identifier(domain_id)
            .send()
            .await
            .map_err(from_sdk_error)?;

        return Ok(DomainRecord {
            id: output.id().to_string(),
            name: output.name().unwrap_or_default().to_string(),
            arn: output.arn().unwrap_or_default().to_string(),
            portal_url: output.portal_url().unwrap_or_default().to_string(),
            root_domain_unit_id: output.root_domain_unit_id().unwrap_or_default().to_string(),
            status: output.status().as_str().to_string(),
            domain_version: output
                .domain_version()
                .map(|version| version.as_str().to_string())
                .unwrap_or_default(),
        });
    }
}

fn format_timestamp(timestamp: Option<&DateTime>) -> Option<String> {
    return timestamp.and_then(|timestamp| timestamp.fmt(DateTimeFormat::DateTime).ok());
}

fn from_sdk_error<E, R>(error: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match error {
        SdkError::ServiceError(context) => {
            let err = context.err();
            return Error::ServiceError(format!(
                "{}: {}",
                err.code().unwrap_or("Unknown"),
                err.message().unwrap_or_default()
            ));
        }
        other => return Error::UnknownError(DisplayErrorContext(&other).to_string()),
    }
}
