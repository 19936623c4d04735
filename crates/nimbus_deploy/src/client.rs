//! CloudFormation client trait and request types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeployResult;

/// One parameter value passed to a stack operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackParameter {
    pub parameter_key: String,
    pub parameter_value: String,
}

impl StackParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            parameter_key: key.into(),
            parameter_value: value.into(),
        }
    }
}

/// Everything needed to create or update a stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackRequest {
    /// Stack name
    pub stack_name: String,
    /// Serialized template document
    pub template_body: String,
    /// Parameter values, in declaration order
    pub parameters: Vec<StackParameter>,
    /// Acknowledged capabilities (e.g. `CAPABILITY_IAM`)
    pub capabilities: Vec<String>,
    /// SNS topics notified of stack events
    pub notification_arns: Vec<String>,
    /// Keep failed resources for inspection
    pub disable_rollback: bool,
}

impl StackRequest {
    pub fn new(stack_name: impl Into<String>, template_body: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            template_body: template_body.into(),
            parameters: Vec::new(),
            capabilities: Vec::new(),
            notification_arns: Vec::new(),
            disable_rollback: false,
        }
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(StackParameter::new(key, value));
        self
    }

    pub fn capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn notification_arns(mut self, arns: Vec<String>) -> Self {
        self.notification_arns = arns;
        self
    }

    pub fn disable_rollback(mut self, disable: bool) -> Self {
        self.disable_rollback = disable;
        self
    }

    /// Look up a parameter value by key.
    pub fn parameter_value(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.parameter_key == key)
            .map(|p| p.parameter_value.as_str())
    }
}

/// A running stack as reported by `DescribeStacks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackSummary {
    #[serde(default)]
    pub stack_name: Option<String>,
    #[serde(default)]
    pub stack_status: String,
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
}

impl StackSummary {
    pub fn new(stack_name: impl Into<String>, stack_status: impl Into<String>) -> Self {
        Self {
            stack_name: Some(stack_name.into()),
            stack_status: stack_status.into(),
            creation_time: None,
            description: None,
        }
    }

    /// Name, if the service reported a non-empty one.
    pub fn name(&self) -> Option<&str> {
        self.stack_name.as_deref().filter(|name| !name.is_empty())
    }
}

/// CloudFormation client trait.
#[async_trait]
pub trait StackClient: Send + Sync {
    /// Create a stack. Returns the stack id.
    async fn create_stack(&self, request: &StackRequest) -> DeployResult<String>;

    /// Update a running stack. Returns the stack id.
    async fn update_stack(&self, request: &StackRequest) -> DeployResult<String>;

    /// Delete a stack and all of its resources.
    async fn delete_stack(&self, stack_name: &str) -> DeployResult<()>;

    /// Describe every stack visible to the credentials.
    async fn describe_stacks(&self) -> DeployResult<Vec<StackSummary>>;
}
