//! CLI command definitions.
//!
//! Each subcommand loads the nimbusfile it needs and maps to one template or
//! stack operation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::warn;

use nimbus_core::{Nimbusfile, ParameterStore, TemplateRegistry, DEFAULT_NIMBUSFILE};
use nimbus_deploy::{AwsCliClient, AwsCliOptions, Credentials, DeployConfig, DeployDriver};

pub mod deploy;
pub mod destroy;
pub mod list;
pub mod show;
pub mod templates;

/// Nimbus - manage AWS CloudFormation stacks
#[derive(Parser)]
#[command(name = "nimbus")]
#[command(version, about = "Nimbus - manage AWS CloudFormation stacks")]
#[command(long_about = r#"
Nimbus assembles CloudFormation templates declared in a nimbusfile and
creates, updates or deletes stacks from them.

COMMANDS:
  templates   → List the templates declared in the nimbusfile
  show        → Print a template as JSON or YAML
  list        → Show running stacks
  create      → Create a stack from a template
  update      → Update a running stack with the current template
  destroy     → Delete a stack and all of its resources

EXIT CODES:
  0 - Success
  1 - General or CloudFormation error
  2 - Missing nimbusfile or invalid arguments
  3 - Template error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub globals: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the nimbusfile
    #[arg(short, long, global = true, env = "NIMBUS_FILE", default_value = DEFAULT_NIMBUSFILE)]
    pub file: PathBuf,

    /// AWS access key id
    #[arg(long, global = true, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub aws_access_key_id: Option<String>,

    /// AWS secret access key
    #[arg(long, global = true, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_access_key: Option<String>,

    /// SNS topic ARNs notified of stack events (comma separated)
    #[arg(long, global = true, env = "AWS_NOTIFICATION_ARNS", value_delimiter = ',')]
    pub notification_arns: Vec<String>,

    /// AWS region
    #[arg(long, global = true, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Named AWS CLI profile
    #[arg(long, global = true, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Log CloudFormation calls without making them
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl GlobalArgs {
    pub fn deploy_config(&self) -> DeployConfig {
        let mut config = DeployConfig::new().notification_arns(
            self.notification_arns
                .iter()
                .map(|arn| arn.trim())
                .filter(|arn| !arn.is_empty())
                .map(String::from)
                .collect(),
        );
        if let (Some(id), Some(secret)) = (&self.aws_access_key_id, &self.aws_secret_access_key) {
            config = config.credentials(Credentials::new(id, secret));
        }
        if let Some(region) = &self.region {
            config = config.region(region);
        }
        config
    }

    pub fn driver(&self) -> Result<DeployDriver<AwsCliClient>> {
        let config = self.deploy_config();
        let mut options = AwsCliOptions::new();
        if let Some(profile) = &self.profile {
            options = options.profile(profile);
        }
        if self.dry_run {
            options = options.dry_run();
        }
        let client = AwsCliClient::new(config.clone(), options)?;
        Ok(DeployDriver::new(client, config))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the templates declared in the nimbusfile
    Templates,

    /// Print a template
    Show(show::ShowArgs),

    /// Show running stacks
    List,

    /// Create a stack from a template
    Create(deploy::DeployArgs),

    /// Update a running stack with the current template
    Update(deploy::DeployArgs),

    /// Delete a stack and all of its resources
    Destroy(destroy::DestroyArgs),
}

/// Bad command line usage that clap cannot detect.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Templates and stack parameters declared by a nimbusfile.
pub struct Workspace {
    pub registry: TemplateRegistry,
    pub store: ParameterStore,
}

impl Workspace {
    pub fn load(path: &Path) -> Result<Self> {
        let registry = TemplateRegistry::new();
        let store = ParameterStore::new();
        Nimbusfile::new(path)
            .load(&registry, &store)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        Ok(Self { registry, store })
    }

    /// The named template, or the only declared one when no name is given.
    pub fn template(&self, name: Option<&str>) -> Result<String> {
        if let Some(name) = name {
            return Ok(name.to_string());
        }
        self.registry.default_template().ok_or_else(|| {
            let names = self.registry.names();
            let message = if names.is_empty() {
                "no templates defined".to_string()
            } else {
                format!("no template given; choose one of: {}", names.join(", "))
            };
            UsageError(message).into()
        })
    }

    /// Warn about references to names the template never declares.
    /// Returns how many were found.
    pub fn warn_dangling(&self, name: &str) -> Result<usize> {
        let template = self.registry.get_required(name)?;
        let dangling = template.dangling_references();
        for reference in &dangling {
            warn!(
                "Template '{}' references undeclared name '{}'",
                template.name(),
                reference
            );
        }
        Ok(dangling.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use nimbus_core::props;

    fn workspace(names: &[&str]) -> Workspace {
        let registry = TemplateRegistry::new();
        for name in names {
            registry
                .build(*name, |t| {
                    t.resource("Queue", props! { "Type" => "AWS::SQS::Queue" })?;
                    Ok(())
                })
                .unwrap();
        }
        Workspace {
            registry,
            store: ParameterStore::new(),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create() {
        let cli = Cli::try_parse_from(["nimbus", "create", "--prompt", "prod", "cluster"]).unwrap();
        match cli.command {
            Commands::Create(args) => {
                assert!(args.prompt);
                assert_eq!(args.stack, "prod");
                assert_eq!(args.template.as_deref(), Some("cluster"));
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_region_and_arns_flags() {
        let cli = Cli::try_parse_from([
            "nimbus",
            "--region",
            "eu-west-1",
            "--notification-arns",
            "arn:a,arn:b",
            "list",
        ])
        .unwrap();
        let config = cli.globals.deploy_config();
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.notification_arns, vec!["arn:a", "arn:b"]);
    }

    #[test]
    fn test_default_template() {
        let single = workspace(&["cluster"]);
        assert_eq!(single.template(None).unwrap(), "cluster");
        assert_eq!(single.template(Some("other")).unwrap(), "other");

        let many = workspace(&["a", "b"]);
        let err = many.template(None).unwrap_err();
        assert!(err.is::<UsageError>());
        assert!(err.to_string().contains("a, b"));
    }

    #[test]
    fn test_missing_nimbusfile() {
        let dir = tempfile::tempdir().unwrap();
        let err = Workspace::load(&dir.path().join("nimbusfile.yaml"))
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<nimbus_core::TemplateError>(),
            Some(nimbus_core::TemplateError::NimbusfileNotFound(_))
        ));
    }

    #[test]
    fn test_warn_dangling_counts_undeclared_names() {
        let ws = workspace(&["clean"]);
        ws.registry
            .build("broken", |t| {
                t.resource(
                    "Topic",
                    props! {
                        "Type" => "AWS::SNS::Topic",
                        "Properties" => props! {
                            "Region" => nimbus_core::Reference::to("AWS::Region"),
                            "Queue" => nimbus_core::Reference::to("Missing"),
                        },
                    },
                )?;
                Ok(())
            })
            .unwrap();

        assert_eq!(ws.warn_dangling("clean").unwrap(), 0);
        assert_eq!(ws.warn_dangling("broken").unwrap(), 1);
        assert!(ws.warn_dangling("absent").is_err());
    }
}
