//! In-memory CloudFormation client for tests.
//!
//! Records every request and keeps a stack table that create/delete calls
//! update, so driver behavior can be checked without AWS.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::client::{StackClient, StackRequest, StackSummary};
use crate::error::{DeployError, DeployResult};

/// One recorded client call.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedCall {
    pub method: String,
    pub stack_name: Option<String>,
    pub request: Option<StackRequest>,
}

/// Mock stack client.
#[derive(Clone, Default)]
pub struct MockStackClient {
    stacks: Arc<RwLock<Vec<StackSummary>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Service message returned by every call once set.
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl MockStackClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stack as if it were already running.
    pub fn with_stack(self, stack: StackSummary) -> Self {
        self.stacks.write().push(stack);
        self
    }

    /// Fail every call with `DeployError::Api(message)`.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls.read().iter().any(|c| c.method == method)
    }

    /// The most recent create or update request.
    pub fn last_request(&self) -> Option<StackRequest> {
        self.captured_calls
            .read()
            .iter()
            .rev()
            .find_map(|c| c.request.clone())
    }

    /// Names of the stacks the mock currently holds.
    pub fn stack_names(&self) -> Vec<String> {
        self.stacks
            .read()
            .iter()
            .filter_map(|s| s.name().map(String::from))
            .collect()
    }

    fn record_call(&self, method: &str, stack_name: Option<&str>, request: Option<&StackRequest>) {
        self.captured_calls.write().push(CapturedCall {
            method: method.to_string(),
            stack_name: stack_name.map(String::from),
            request: request.cloned(),
        });
    }

    fn check_failure(&self) -> DeployResult<()> {
        match self.simulate_failure.read().clone() {
            Some(message) => Err(DeployError::Api(message)),
            None => Ok(()),
        }
    }

    fn stack_id(name: &str) -> String {
        format!("arn:aws:cloudformation:us-east-1:123456789012:stack/{}/mock", name)
    }

    fn exists(&self, name: &str) -> bool {
        self.stacks.read().iter().any(|s| s.name() == Some(name))
    }
}

#[async_trait]
impl StackClient for MockStackClient {
    async fn create_stack(&self, request: &StackRequest) -> DeployResult<String> {
        self.record_call("create_stack", Some(&request.stack_name), Some(request));
        self.check_failure()?;
        if self.exists(&request.stack_name) {
            return Err(DeployError::Api(format!(
                "Stack [{}] already exists",
                request.stack_name
            )));
        }

        let mut summary = StackSummary::new(&request.stack_name, "CREATE_COMPLETE");
        summary.creation_time = Some(Utc::now());
        self.stacks.write().push(summary);
        Ok(Self::stack_id(&request.stack_name))
    }

    async fn update_stack(&self, request: &StackRequest) -> DeployResult<String> {
        self.record_call("update_stack", Some(&request.stack_name), Some(request));
        self.check_failure()?;

        let mut stacks = self.stacks.write();
        let stack = stacks
            .iter_mut()
            .find(|s| s.name() == Some(request.stack_name.as_str()))
            .ok_or_else(|| {
                DeployError::Api(format!("Stack [{}] does not exist", request.stack_name))
            })?;
        stack.stack_status = "UPDATE_COMPLETE".to_string();
        Ok(Self::stack_id(&request.stack_name))
    }

    async fn delete_stack(&self, stack_name: &str) -> DeployResult<()> {
        self.record_call("delete_stack", Some(stack_name), None);
        self.check_failure()?;
        // CloudFormation treats deleting a missing stack as success.
        self.stacks.write().retain(|s| s.name() != Some(stack_name));
        Ok(())
    }

    async fn describe_stacks(&self) -> DeployResult<Vec<StackSummary>> {
        self.record_call("describe_stacks", None, None);
        self.check_failure()?;
        Ok(self.stacks.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_describe() {
        let client = MockStackClient::new();
        let id = client.create_stack(&StackRequest::new("web", "{}")).await.unwrap();

        assert!(id.contains("stack/web/"));
        assert_eq!(client.stack_names(), vec!["web"]);
        assert!(client.was_called("create_stack"));
        assert_eq!(client.describe_stacks().await.unwrap()[0].stack_status, "CREATE_COMPLETE");
    }

    #[tokio::test]
    async fn test_create_existing_fails() {
        let client = MockStackClient::new().with_stack(StackSummary::new("web", "CREATE_COMPLETE"));
        let result = client.create_stack(&StackRequest::new("web", "{}")).await;
        assert!(matches!(result, Err(DeployError::Api(msg)) if msg == "Stack [web] already exists"));
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let client = MockStackClient::new();
        let result = client.update_stack(&StackRequest::new("web", "{}")).await;
        assert!(matches!(result, Err(DeployError::Api(_))));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_simulated_failure() {
        let client = MockStackClient::new().simulate_failure("Rate exceeded");
        let result = client.describe_stacks().await;
        assert!(matches!(result, Err(DeployError::Api(msg)) if msg == "Rate exceeded"));
    }

    #[tokio::test]
    async fn test_delete_removes_stack() {
        let client = MockStackClient::new().with_stack(StackSummary::new("web", "CREATE_COMPLETE"));
        client.delete_stack("web").await.unwrap();
        assert!(client.stack_names().is_empty());
        assert_eq!(client.get_calls()[0].stack_name.as_deref(), Some("web"));
    }
}
