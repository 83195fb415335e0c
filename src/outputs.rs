use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::Output;
use serde::{Deserialize, Serialize};

use crate::client;
use crate::config::{Config, StackSettings};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Service error occurred: {0}.")]
    ServiceError(String),

    #[error("Unknown error occurred: {0}.")]
    UnknownError(String),

    #[error("Stack {0} not found")]
    NotFoundError(String),

    #[error("Stack {0} has no `{1}` output")]
    MissingOutput(String, String),

    #[error(transparent)]
    ClientError(#[from] client::Error),
}

/// The values the declarative domain stack exports for other stacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackOutputs {
    pub domain_id: String,
    pub domain_arn: String,
    pub portal_url: String,
    pub root_domain_unit_id: String,
}

impl StackOutputs {
    pub fn from_outputs(stack_name: &str, outputs: &[Output]) -> Result<Self, Error> {
        let find = |key: &str| -> Result<String, Error> {
            let value = outputs
                .iter()
                .find(|output| output.output_key() == Some(key))
                .and_then(|output| output.output_value());

            match value {
                Some(value) => return Ok(value.to_string()),
                None => {
                    return Err(Error::MissingOutput(
                        stack_name.to_string(),
                        key.to_string(),
                    ))
                }
            }
        };

        return Ok(Self {
            domain_id: find("DomainId")?,
            domain_arn: find("DomainArn")?,
            portal_url: find("PortalUrl")?,
            root_domain_unit_id: find("RootDomainUnitId")?,
        });
    }
}

pub struct Stack {
    pub stack_name: String,

    client: aws_sdk_cloudformation::Client,
}

impl Stack {
    pub async fn new(settings: &StackSettings, config: &Config) -> Result<Self, Error> {
        let region = settings.region.as_ref().or(config.region.as_ref());
        let sdk_config = client::load_sdk_config(region, config.profile_name.as_ref()).await?;
        let client = aws_sdk_cloudformation::Client::new(&sdk_config);

        return Ok(Self {
            stack_name: settings.stack_name.clone(),
            client,
        });
    }

    pub async fn get_outputs(&self) -> Result<Vec<Output>, Error> {
        tracing::debug!(stack_name = %self.stack_name, "DescribeStacks");
        let result = self
            .client
            .describe_stacks()
            .stack_name(&self.stack_name)
            .send()
            .await;

        let result = match result {
            Ok(data) => data,
            Err(SdkError::ServiceError(context)) => {
                let err = context.err();
                if err.code() == Some("ValidationError") {
                    return Err(Error::NotFoundError(self.stack_name.clone()));
                }
                return Err(Error::ServiceError(err.to_string()));
            }
            Err(err) => return Err(Error::UnknownError(DisplayErrorContext(&err).to_string())),
        };

        let outputs = match result.stacks().first() {
            Some(stack) => stack.outputs().to_vec(),
            None => return Err(Error::NotFoundError(self.stack_name.clone())),
        };

        return Ok(outputs);
    }

    pub async fn domain_outputs(&self) -> Result<StackOutputs, Error> {
        let outputs = self.get_outputs().await?;

        return StackOutputs::from_outputs(&self.stack_name, &outputs);
    }
}
