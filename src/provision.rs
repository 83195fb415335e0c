use std::time::Duration;

use crate::client::{self, BlueprintConfigurationRecord, ControlPlane, DomainRecord};
use crate::config::{BlueprintSettings, Config};
use crate::writer::{self, SummaryRecord};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to create domain {0}: {1}")]
    CreateDomain(String, client::Error),

    #[error("Unable to read back domain {0}: {1}")]
    Verify(String, client::Error),

    #[error("Provisioning succeeded but the summary was not saved: {0}")]
    Persist(#[from] writer::Error),
}

#[derive(Debug)]
pub struct BlueprintFailure {
    pub blueprint_id: String,
    pub label: String,
    pub error: client::Error,
}

#[derive(Debug)]
pub struct Report {
    pub domain: DomainRecord,
    pub summary: SummaryRecord,
    pub failures: Vec<BlueprintFailure>,
}

/// Creates the domain, enables every configured blueprint, reads the result
/// back and saves a summary of it.
///
/// Only domain creation, read-back and the summary write are fatal. A
/// blueprint that fails to configure is reported in [`Report::failures`]
/// and the remaining blueprints are still attempted.
pub async fn run<C: ControlPlane + ?Sized>(client: &C, config: &Config) -> Result<Report, Error> {
    banner("Creating SageMaker Unified Studio Domain");
    println!("Creating domain: {}", config.domain.name);
    let domain = match client.create_domain(&config.domain).await {
        Ok(domain) => domain,
        Err(error) => return Err(Error::CreateDomain(config.domain.name.clone(), error)),
    };
    println!("Domain created successfully!");
    println!("  Domain ID: {}", domain.id);
    println!("  Domain ARN: {}", domain.arn);
    println!("  Portal URL: {}", domain.portal_url);

    // Fixed delay, the domain exposes no readiness signal we wait on.
    println!("\nWaiting for domain to be ready...");
    tokio::time::sleep(Duration::from_secs(config.settle_seconds)).await;

    banner("Configuring Environment Blueprints");
    let failures = configure_blueprints(client, &domain.id, &config.blueprints).await;

    banner("Configured Blueprints Summary");
    let blueprints = match client.list_blueprint_configurations(&domain.id).await {
        Ok(blueprints) => blueprints,
        Err(error) => return Err(Error::Verify(domain.id.clone(), error)),
    };
    print_blueprints(&blueprints);

    banner("Final Domain Details");
    let details = match client.get_domain(&domain.id).await {
        Ok(details) => details,
        Err(error) => return Err(Error::Verify(domain.id.clone(), error)),
    };
    print_domain(&details);

    banner("Domain Creation Completed Successfully!");
    println!("You can access your domain at: {}", details.portal_url);

    let summary = SummaryRecord::new(&details, &blueprints);
    writer::write_json(&config.summary.location, &summary)?;
    println!(
        "Domain information saved to: {}",
        config.summary.location.display()
    );

    return Ok(Report {
        domain: details,
        summary,
        failures,
    });
}

async fn configure_blueprints<C: ControlPlane + ?Sized>(
    client: &C,
    domain_id: &str,
    settings: &BlueprintSettings,
) -> Vec<BlueprintFailure> {
    let enabled_regions = if settings.enabled_regions.is_empty() {
        vec![client.region().to_string()]
    } else {
        settings.enabled_regions.clone()
    };

    let mut failures = Vec::new();
    for blueprint in &settings.items {
        println!("Configuring blueprint: {}", blueprint.id);
        let outcome = client
            .configure_blueprint(
                domain_id,
                &blueprint.id,
                &settings.manage_access_role,
                &settings.provisioning_role,
                &enabled_regions,
            )
            .await;

        match outcome {
            Ok(_) => println!("  Blueprint configured successfully!"),
            Err(error) => {
                let label = if blueprint.label.is_empty() {
                    blueprint.id.clone()
                } else {
                    blueprint.label.clone()
                };
                println!("  Warning: Failed to configure {}: {}", label, error);
                tracing::warn!(
                    blueprint_id = %blueprint.id,
                    %label,
                    %error,
                    "blueprint configuration failed"
                );

                failures.push(BlueprintFailure {
                    blueprint_id: blueprint.id.clone(),
                    label,
                    error,
                });
            }
        }
    }

    return failures;
}

fn banner(title: &str) {
    let rule = "=".repeat(60);
    println!("\n{}\n{}\n{}", rule, title, rule);
}

fn print_blueprints(blueprints: &[BlueprintConfigurationRecord]) {
    println!("Total configured blueprints: {}", blueprints.len());
    for (index, blueprint) in blueprints.iter().enumerate() {
        println!(
            "  {}. Blueprint ID: {}",
            index + 1,
            blueprint.environment_blueprint_id
        );
        println!(
            "     Enabled Regions: {}",
            blueprint.enabled_regions.join(", ")
        );
        println!(
            "     Created: {}",
            blueprint.created_at.as_deref().unwrap_or("unknown")
        );
    }
}

fn print_domain(domain: &DomainRecord) {
    println!("Domain Name: {}", domain.name);
    println!("Domain ID: {}", domain.id);
    println!("Domain ARN: {}", domain.arn);
    println!("Portal URL: {}", domain.portal_url);
    println!("Root Domain Unit ID: {}", domain.root_domain_unit_id);
    println!("Status: {}", domain.status);
    println!("Domain Version: {}", domain.domain_version);
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::tempdir;
    use tokio::time::Instant;

    use super::run;
    use super::Error;
    use crate::client::{self, BlueprintConfigurationRecord, ControlPlane, DomainRecord};
    use crate::config::{Config, ConfigFile, DomainSettings};
    use crate::writer::SummaryRecord;

    #[derive(Default)]
    struct FakeControlPlane {
        failing_blueprints: HashSet<String>,
        reject_create: bool,
        fail_read_back: bool,

        domains: Mutex<Vec<DomainRecord>>,
        configured: Mutex<Vec<BlueprintConfigurationRecord>>,
        create_calls: Mutex<usize>,
        configure_calls: Mutex<Vec<(String, Vec<String>, Instant)>>,
        created_at: Mutex<Option<Instant>>,
    }

    impl FakeControlPlane {
        fn failing(blueprint_ids: &[&str]) -> Self {
            return Self {
                failing_blueprints: blueprint_ids.iter().map(|id| id.to_string()).collect(),
                ..Default::default()
            };
        }
    }

    #[async_trait]
    impl ControlPlane for FakeControlPlane {
        fn region(&self) -> &str {
            return "us-west-2";
        }

        async fn create_domain(
            &self,
            domain: &DomainSettings,
        ) -> Result<DomainRecord, client::Error> {
            *self.create_calls.lock().unwrap() += 1;
            if self.reject_create {
                return Err(client::Error::ServiceError(String::from(
                    "AccessDeniedException: not authorized",
                )));
            }

            let mut domains = self.domains.lock().unwrap();
            if domains.iter().any(|existing| existing.name == domain.name) {
                return Err(client::Error::ServiceError(format!(
                    "ConflictException: Domain {} already exists",
                    domain.name
                )));
            }

            let id = format!("dzd_{}", domains.len() + 1);
            let record = DomainRecord {
                id: id.clone(),
                name: domain.name.clone(),
                arn: format!("arn:aws:datazone:us-west-2:000000000000:domain/{}", id),
                portal_url: format!("https://{}.sagemaker.us-west-2.on.aws", id),
                root_domain_unit_id: format!("unit_{}", id),
                status: String::from("CREATING"),
                domain_version: String::from("V2"),
            };
            domains.push(record.clone());
            *self.created_at.lock().unwrap() = Some(Instant::now());

            return Ok(record);
        }

        async fn configure_blueprint(
            &self,
            domain_id: &str,
            blueprint_id: &str,
            _manage_access_role: &str,
            _provisioning_role: &str,
            enabled_regions: &[String],
        ) -> Result<BlueprintConfigurationRecord, client::Error> {
            self.configure_calls.lock().unwrap().push((
                blueprint_id.to_string(),
                enabled_regions.to_vec(),
                Instant::now(),
            ));
            if self.failing_blueprints.contains(blueprint_id) {
                return Err(client::Error::ServiceError(String::from(
                    "ValidationException: blueprint not available",
                )));
            }

            let record = BlueprintConfigurationRecord {
                domain_id: domain_id.to_string(),
                environment_blueprint_id: blueprint_id.to_string(),
                enabled_regions: enabled_regions.to_vec(),
                created_at: Some(String::from("2024-12-03T10:00:00Z")),
            };
            self.configured.lock().unwrap().push(record.clone());

            return Ok(record);
        }

        async fn list_blueprint_configurations(
            &self,
            domain_id: &str,
        ) -> Result<Vec<BlueprintConfigurationRecord>, client::Error> {
            if self.fail_read_back {
                return Err(client::Error::UnknownError(String::from("connection reset")));
            }

            let configured = self.configured.lock().unwrap();
            return Ok(configured
                .iter()
                .filter(|record| record.domain_id == domain_id)
                .cloned()
                .collect());
        }

        async fn get_domain(&self, domain_id: &str) -> Result<DomainRecord, client::Error> {
            let domains = self.domains.lock().unwrap();
            match domains.iter().find(|domain| domain.id == domain_id) {
                Some(domain) => {
                    return Ok(DomainRecord {
                        status: String::from("AVAILABLE"),
                        ..domain.clone()
                    })
                }
                None => {
                    return Err(client::Error::ServiceError(String::from(
                        "ResourceNotFoundException: no such domain",
                    )))
                }
            }
        }
    }

    fn config_writing_to(location: PathBuf) -> Config {
        return Config {
            summary: ConfigFile { location },
            ..Default::default()
        };
    }

    fn read_summary(location: &PathBuf) -> SummaryRecord {
        let contents = std::fs::read_to_string(location).unwrap();
        return serde_json::from_str(&contents).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn configures_every_blueprint() {
        let dir = tempdir().unwrap();
        let location = dir.path().join("domain_info.json");
        let config = config_writing_to(location.clone());
        let client = FakeControlPlane::default();

        let report = run(&client, &config).await.unwrap();

        let expected: HashSet<String> = config
            .blueprints
            .items
            .iter()
            .map(|blueprint| blueprint.id.clone())
            .collect();
        let written = read_summary(&location);
        assert_eq!(report.summary, written);
        assert_eq!(expected.len(), written.configured_blueprints.len());
        assert_eq!(
            expected,
            written.configured_blueprints.into_iter().collect::<HashSet<_>>()
        );
        assert_eq!("dzd_1", written.domain_id);
        assert_eq!("unit_dzd_1", written.root_domain_unit_id);
        assert_eq!(true, report.failures.is_empty());
        assert_eq!("AVAILABLE", report.domain.status);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_blueprints_do_not_stop_the_rest() {
        let dir = tempdir().unwrap();
        let location = dir.path().join("domain_info.json");
        let config = config_writing_to(location.clone());
        let client = FakeControlPlane::failing(&["ciw5fxhc6v6rio", "d8w7c3fmbsz5cg"]);

        let report = run(&client, &config).await.unwrap();

        assert_eq!(5, client.configure_calls.lock().unwrap().len());
        let labels: Vec<&str> = report
            .failures
            .iter()
            .map(|failure| failure.label.as_str())
            .collect();
        assert_eq!(vec!["Lakehouse Catalog", "Data Lake"], labels);

        let written = read_summary(&location);
        assert_eq!(
            vec!["c9gx7j7bemrv0w", "4k186sfh08eqxc", "c9ybygnen3sukw"],
            written.configured_blueprints
        );
    }

    #[tokio::test(start_paused = true)]
    async fn every_blueprint_failing_still_persists() {
        let dir = tempdir().unwrap();
        let location = dir.path().join("domain_info.json");
        let mut config = config_writing_to(location.clone());
        config.blueprints.items.truncate(2);
        let client = FakeControlPlane::failing(&["ciw5fxhc6v6rio", "c9gx7j7bemrv0w"]);

        let report = run(&client, &config).await.unwrap();

        assert_eq!(2, report.failures.len());
        assert_eq!(true, read_summary(&location).configured_blueprints.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_create_writes_nothing() {
        let dir = tempdir().unwrap();
        let location = dir.path().join("domain_info.json");
        let config = config_writing_to(location.clone());
        let client = FakeControlPlane {
            reject_create: true,
            ..Default::default()
        };

        let result = run(&client, &config).await;

        match result.err().unwrap() {
            Error::CreateDomain(name, _) => assert_eq!("Corporate-Python-API", name),
            _ => panic!("Expected `CreateDomain` error"),
        }
        assert_eq!(false, location.exists());
        assert_eq!(true, client.configure_calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn persist_failure_is_fatal_after_provisioning() {
        let dir = tempdir().unwrap();
        let location = dir.path().join("missing").join("domain_info.json");
        let config = config_writing_to(location.clone());
        let client = FakeControlPlane::default();

        let result = run(&client, &config).await;

        match result.err().unwrap() {
            Error::Persist(_) => {}
            _ => panic!("Expected `Persist` error"),
        }
        assert_eq!(false, location.exists());
        assert_eq!(5, client.configured.lock().unwrap().len());
    }

    #[tokio::test(start_paused = true)]
    async fn read_back_failure_writes_nothing() {
        let dir = tempdir().unwrap();
        let location = dir.path().join("domain_info.json");
        let config = config_writing_to(location.clone());
        let client = FakeControlPlane {
            fail_read_back: true,
            ..Default::default()
        };

        match run(&client, &config).await.err().unwrap() {
            Error::Verify(domain_id, _) => assert_eq!("dzd_1", domain_id),
            _ => panic!("Expected `Verify` error"),
        }
        assert_eq!(false, location.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_with_same_name_fails_once() {
        let dir = tempdir().unwrap();
        let location = dir.path().join("domain_info.json");
        let config = config_writing_to(location.clone());
        let client = FakeControlPlane::default();

        run(&client, &config).await.unwrap();
        let first = read_summary(&location);

        let result = run(&client, &config).await;

        match result.err().unwrap() {
            Error::CreateDomain(name, error) => {
                assert_eq!("Corporate-Python-API", name);
                assert_eq!(true, error.to_string().contains("already exists"));
            }
            _ => panic!("Expected `CreateDomain` error"),
        }
        assert_eq!(2, *client.create_calls.lock().unwrap());
        assert_eq!(5, client.configure_calls.lock().unwrap().len());
        assert_eq!(first, read_summary(&location));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_before_first_blueprint() {
        let dir = tempdir().unwrap();
        let config = config_writing_to(dir.path().join("domain_info.json"));
        let client = FakeControlPlane::default();

        run(&client, &config).await.unwrap();

        let created_at = (*client.created_at.lock().unwrap()).unwrap();
        let calls = client.configure_calls.lock().unwrap();
        let (_, _, first_call) = calls.first().unwrap();
        assert_eq!(true, first_call.duration_since(created_at) >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn enabled_regions_default_to_client_region() {
        let dir = tempdir().unwrap();
        let mut config = config_writing_to(dir.path().join("domain_info.json"));
        let client = FakeControlPlane::default();

        run(&client, &config).await.unwrap();
        {
            let calls = client.configure_calls.lock().unwrap();
            for (_, regions, _) in calls.iter() {
                assert_eq!(vec![String::from("us-west-2")], *regions);
            }
        }

        config.domain.name = String::from("Corporate-Multi-Region");
        config.blueprints.enabled_regions =
            vec![String::from("us-east-1"), String::from("eu-west-1")];
        let client = FakeControlPlane::default();

        let report = run(&client, &config).await.unwrap();

        let calls = client.configure_calls.lock().unwrap();
        for (_, regions, _) in calls.iter() {
            assert_eq!(config.blueprints.enabled_regions, *regions);
        }
        assert_eq!("Corporate-Multi-Region", report.domain.name);
    }
}
