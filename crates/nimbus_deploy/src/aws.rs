//! CloudFormation client backed by the `aws` command line tool.
//!
//! Every operation runs `aws cloudformation <action> ... --output json` and
//! parses the JSON reply. Credentials from [`DeployConfig`] are handed to the
//! child process through its environment, never on the command line.

use std::io::ErrorKind;
use std::process::{Command, Stdio};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::client::{StackClient, StackRequest, StackSummary};
use crate::config::{DeployConfig, ACCESS_KEY_ENV, SECRET_KEY_ENV};
use crate::error::{DeployError, DeployResult};

/// Arguments longer than this are elided from logged command lines.
const MAX_LOGGED_ARG: usize = 80;

/// Options for [`AwsCliClient`].
#[derive(Debug, Clone)]
pub struct AwsCliOptions {
    /// Executable to invoke
    pub program: String,
    /// Named profile passed as `--profile`
    pub profile: Option<String>,
    /// Log commands without executing them
    pub dry_run: bool,
}

impl Default for AwsCliOptions {
    fn default() -> Self {
        Self {
            program: "aws".to_string(),
            profile: None,
            dry_run: false,
        }
    }
}

impl AwsCliOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackIdReply {
    stack_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeReply {
    #[serde(default)]
    stacks: Vec<StackSummary>,
}

/// `aws` CLI based CloudFormation client.
pub struct AwsCliClient {
    config: DeployConfig,
    options: AwsCliOptions,
}

impl AwsCliClient {
    /// Create a client, failing if the CLI cannot be run.
    pub fn new(config: DeployConfig, options: AwsCliOptions) -> DeployResult<Self> {
        if !options.dry_run && !Self::is_available(&options.program) {
            return Err(DeployError::ClientUnavailable(format!(
                "'{}' is not installed or not on PATH",
                options.program
            )));
        }
        info!("Using CloudFormation client: {}", options.program);
        Ok(Self::with_options(config, options))
    }

    /// Create a client without checking that the CLI exists.
    pub fn with_options(config: DeployConfig, options: AwsCliOptions) -> Self {
        Self { config, options }
    }

    fn is_available(program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Arguments for `create-stack` or `update-stack`.
    fn stack_args(&self, action: &str, request: &StackRequest) -> DeployResult<Vec<String>> {
        let mut args = vec![
            "cloudformation".to_string(),
            action.to_string(),
            "--stack-name".to_string(),
            request.stack_name.clone(),
            "--template-body".to_string(),
            request.template_body.clone(),
        ];

        // JSON form keeps commas in list parameters intact.
        if !request.parameters.is_empty() {
            args.push("--parameters".to_string());
            args.push(serde_json::to_string(&request.parameters)?);
        }

        if !request.capabilities.is_empty() {
            args.push("--capabilities".to_string());
            args.extend(request.capabilities.iter().cloned());
        }

        if !request.notification_arns.is_empty() {
            args.push("--notification-arns".to_string());
            args.extend(request.notification_arns.iter().cloned());
        }

        if request.disable_rollback {
            args.push("--disable-rollback".to_string());
        }

        args.push("--client-request-token".to_string());
        args.push(format!("nimbus-{}", uuid::Uuid::new_v4()));

        Ok(self.with_common_args(args))
    }

    fn with_common_args(&self, mut args: Vec<String>) -> Vec<String> {
        if let Some(region) = &self.config.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
        if let Some(profile) = &self.options.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args.push("--output".to_string());
        args.push("json".to_string());
        args
    }

    /// Format command for logging.
    fn format_command(&self, args: &[String]) -> String {
        let mut cmd = self.options.program.clone();
        for arg in args {
            if arg.len() > MAX_LOGGED_ARG {
                cmd.push_str(&format!(" <{} bytes>", arg.len()));
            } else if arg.contains(' ') || arg.contains('"') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }

    /// Run the CLI and return its stdout.
    async fn execute(&self, args: &[String]) -> DeployResult<Option<String>> {
        if self.options.dry_run {
            info!("[dry-run] {}", self.format_command(args));
            return Ok(None);
        }

        let mut cmd = tokio::process::Command::new(&self.options.program);
        cmd.args(args).kill_on_drop(true);
        if let Some(credentials) = &self.config.credentials {
            cmd.env(ACCESS_KEY_ENV, &credentials.access_key_id);
            cmd.env(SECRET_KEY_ENV, &credentials.secret_access_key);
        }

        debug!("Executing: {}", self.format_command(args));

        let output = cmd.output().await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DeployError::ClientUnavailable(format!(
                "'{}' is not installed or not on PATH",
                self.options.program
            )),
            _ => DeployError::Io(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("{} exited with {}", self.format_command(&args[..2]), output.status);
            return Err(DeployError::from_stderr(&stderr));
        }

        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    async fn stack_operation(&self, action: &str, request: &StackRequest) -> DeployResult<String> {
        let args = self.stack_args(action, request)?;
        match self.execute(&args).await? {
            Some(stdout) => {
                let reply: StackIdReply = serde_json::from_str(&stdout)?;
                Ok(reply.stack_id)
            }
            None => Ok(request.stack_name.clone()),
        }
    }
}

#[async_trait]
impl StackClient for AwsCliClient {
    async fn create_stack(&self, request: &StackRequest) -> DeployResult<String> {
        self.stack_operation("create-stack", request).await
    }

    async fn update_stack(&self, request: &StackRequest) -> DeployResult<String> {
        self.stack_operation("update-stack", request).await
    }

    async fn delete_stack(&self, stack_name: &str) -> DeployResult<()> {
        let args = self.with_common_args(vec![
            "cloudformation".to_string(),
            "delete-stack".to_string(),
            "--stack-name".to_string(),
            stack_name.to_string(),
        ]);
        self.execute(&args).await?;
        Ok(())
    }

    async fn describe_stacks(&self) -> DeployResult<Vec<StackSummary>> {
        let args = self.with_common_args(vec![
            "cloudformation".to_string(),
            "describe-stacks".to_string(),
        ]);
        match self.execute(&args).await? {
            Some(stdout) => {
                let reply: DescribeReply = serde_json::from_str(&stdout)?;
                Ok(reply.stacks)
            }
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    fn client(config: DeployConfig) -> AwsCliClient {
        AwsCliClient::with_options(config, AwsCliOptions::default())
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_create_args() {
        let request = StackRequest::new("web", r#"{"Resources":{}}"#)
            .parameter("Subnets", "subnet-a,subnet-b")
            .capabilities(vec!["CAPABILITY_IAM".to_string()])
            .notification_arns(vec!["arn:a".to_string(), "arn:b".to_string()])
            .disable_rollback(true);
        let args = client(DeployConfig::new().region("eu-west-1"))
            .stack_args("create-stack", &request)
            .unwrap();

        assert_eq!(&args[..2], ["cloudformation", "create-stack"]);
        assert_eq!(value_after(&args, "--stack-name"), Some("web"));
        assert_eq!(value_after(&args, "--template-body"), Some(r#"{"Resources":{}}"#));
        assert_eq!(
            value_after(&args, "--parameters"),
            Some(r#"[{"ParameterKey":"Subnets","ParameterValue":"subnet-a,subnet-b"}]"#)
        );
        assert_eq!(value_after(&args, "--capabilities"), Some("CAPABILITY_IAM"));
        assert!(args.contains(&"arn:b".to_string()));
        assert!(args.contains(&"--disable-rollback".to_string()));
        assert_eq!(value_after(&args, "--region"), Some("eu-west-1"));
        assert_eq!(args.last().map(String::as_str), Some("json"));
    }

    #[test]
    fn test_optional_args_omitted() {
        let request = StackRequest::new("web", "{}");
        let args = client(DeployConfig::new()).stack_args("update-stack", &request).unwrap();

        assert!(!args.contains(&"--parameters".to_string()));
        assert!(!args.contains(&"--capabilities".to_string()));
        assert!(!args.contains(&"--notification-arns".to_string()));
        assert!(!args.contains(&"--disable-rollback".to_string()));
        assert!(!args.contains(&"--region".to_string()));
    }

    #[test]
    fn test_credentials_never_in_args() {
        let config = DeployConfig::new().credentials(Credentials::new("AKIA123", "s3cret"));
        let args = client(config)
            .stack_args("create-stack", &StackRequest::new("web", "{}"))
            .unwrap();
        assert!(!args.iter().any(|a| a.contains("s3cret") || a.contains("AKIA123")));
    }

    #[test]
    fn test_format_command_elides_long_args() {
        let client = client(DeployConfig::new());
        let body = "x".repeat(200);
        let formatted = client.format_command(&[
            "cloudformation".to_string(),
            "--template-body".to_string(),
            body,
        ]);
        assert_eq!(formatted, "aws cloudformation --template-body <200 bytes>");
    }

    #[tokio::test]
    async fn test_dry_run_skips_execution() {
        let client = AwsCliClient::new(
            DeployConfig::new(),
            AwsCliOptions::new().program("nimbus-missing-aws").dry_run(),
        )
        .unwrap();

        let id = client.create_stack(&StackRequest::new("web", "{}")).await.unwrap();
        assert_eq!(id, "web");
        assert!(client.describe_stacks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let options = AwsCliOptions::new().program("nimbus-missing-aws");
        assert!(matches!(
            AwsCliClient::new(DeployConfig::new(), options.clone()),
            Err(DeployError::ClientUnavailable(_))
        ));

        let client = AwsCliClient::with_options(DeployConfig::new(), options);
        assert!(matches!(
            client.delete_stack("web").await,
            Err(DeployError::ClientUnavailable(_))
        ));
    }
}
