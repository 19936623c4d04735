//! # nimbus_deploy
//!
//! CloudFormation stack deployment for Nimbus templates.
//!
//! # Features
//!
//! - **StackClient**: async seam over the CloudFormation API
//! - **AwsCliClient**: client that drives the `aws` command line tool
//! - **MockStackClient**: in-memory client for tests
//! - **DeployDriver**: create, update, destroy and list stacks
//!
//! # Example
//!
//! ```rust,no_run
//! use nimbus_core::{props, ParameterStore, TemplateRegistry};
//! use nimbus_deploy::{AwsCliClient, AwsCliOptions, DeployConfig, DeployDriver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = TemplateRegistry::new();
//!     registry.build("queue", |t| {
//!         t.resource("Queue", props! { "Type" => "AWS::SQS::Queue" })?;
//!         Ok(())
//!     })?;
//!
//!     let client = AwsCliClient::new(DeployConfig::from_env(), AwsCliOptions::default())?;
//!     let driver = DeployDriver::new(client, DeployConfig::from_env());
//!     let id = driver
//!         .create(&registry, &ParameterStore::new(), "queue-dev", "queue", None)
//!         .await?;
//!     println!("Created {}", id);
//!     Ok(())
//! }
//! ```

pub mod aws;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod mock;

pub use aws::{AwsCliClient, AwsCliOptions};
pub use client::{StackClient, StackParameter, StackRequest, StackSummary};
pub use config::{parse_arns, Credentials, DeployConfig};
pub use driver::DeployDriver;
pub use error::{DeployError, DeployResult};
pub use mock::{CapturedCall, MockStackClient};
