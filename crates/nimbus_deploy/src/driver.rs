//! Stack lifecycle operations over a [`StackClient`].

use nimbus_core::{ParameterStore, Prompter, Serializer, StackParameters, TemplateRegistry};
use tracing::{info, warn};

use crate::client::{StackClient, StackRequest, StackSummary};
use crate::config::DeployConfig;
use crate::error::{DeployError, DeployResult};

/// Deploys registered templates as CloudFormation stacks.
pub struct DeployDriver<C> {
    client: C,
    config: DeployConfig,
}

impl<C: StackClient> DeployDriver<C> {
    pub fn new(client: C, config: DeployConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Render `template` and resolve the parameters stored for `stack`.
    ///
    /// With a prompter, each declared parameter is asked for in order.
    pub fn prepare(
        &self,
        registry: &TemplateRegistry,
        store: &ParameterStore,
        stack: &str,
        template: &str,
        prompter: Option<&dyn Prompter>,
    ) -> DeployResult<StackRequest> {
        let template = registry.get_required(template)?;
        for reference in template.dangling_references() {
            warn!(
                "Template '{}' references undeclared name '{}'",
                template.name(),
                reference
            );
        }

        let body = Serializer::render(&template)?;
        let params = StackParameters::resolve(&template, stack, store.get_params(stack), prompter)?;

        let request = params.into_pairs().into_iter().fold(
            StackRequest::new(stack, body)
                .capabilities(self.config.capabilities.clone())
                .notification_arns(self.config.notification_arns.clone())
                .disable_rollback(self.config.disable_rollback),
            |request, (key, value)| request.parameter(key, value),
        );
        Ok(request)
    }

    /// Create `stack` from `template`. Returns the stack id.
    pub async fn create(
        &self,
        registry: &TemplateRegistry,
        store: &ParameterStore,
        stack: &str,
        template: &str,
        prompter: Option<&dyn Prompter>,
    ) -> DeployResult<String> {
        let request = self.prepare(registry, store, stack, template, prompter)?;
        info!("Creating stack '{}' from template '{}'", stack, template);
        let id = self.client.create_stack(&request).await?;
        info!("Stack created: {}", id);
        Ok(id)
    }

    /// Update the running `stack` with the current `template`.
    pub async fn update(
        &self,
        registry: &TemplateRegistry,
        store: &ParameterStore,
        stack: &str,
        template: &str,
        prompter: Option<&dyn Prompter>,
    ) -> DeployResult<String> {
        let request = self.prepare(registry, store, stack, template, prompter)?;
        info!("Updating stack '{}' from template '{}'", stack, template);
        let id = self.client.update_stack(&request).await?;
        info!("Stack update started: {}", id);
        Ok(id)
    }

    /// Delete `stack`. Unless `force` is set the confirmer must answer `y`;
    /// anything else, or no confirmer at all, aborts.
    pub async fn destroy(
        &self,
        stack: &str,
        force: bool,
        confirmer: Option<&dyn Prompter>,
    ) -> DeployResult<()> {
        if !force {
            let answer = match confirmer {
                Some(confirmer) => confirmer.prompt(&format!("Delete stack {} [y/N] ", stack))?,
                None => String::new(),
            };
            if !answer.trim().eq_ignore_ascii_case("y") {
                return Err(DeployError::Aborted(stack.to_string()));
            }
        }

        info!("Deleting stack '{}'", stack);
        self.client.delete_stack(stack).await
    }

    /// Running stacks that have a name.
    pub async fn list(&self) -> DeployResult<Vec<StackSummary>> {
        let stacks = self.client.describe_stacks().await?;
        Ok(stacks.into_iter().filter(|s| s.name().is_some()).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use nimbus_core::{props, Reference, TemplateError};

    use super::*;
    use crate::mock::MockStackClient;

    /// Answers prompts from a fixed script and records the questions.
    #[derive(Default)]
    struct ScriptedPrompter {
        answers: RefCell<VecDeque<String>>,
        asked: RefCell<Vec<String>>,
    }

    impl ScriptedPrompter {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: RefCell::new(answers.iter().map(|a| a.to_string()).collect()),
                asked: RefCell::default(),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn prompt(&self, message: &str) -> std::io::Result<String> {
            self.asked.borrow_mut().push(message.to_string());
            Ok(self.answers.borrow_mut().pop_front().unwrap_or_default())
        }
    }

    fn registry() -> TemplateRegistry {
        let registry = TemplateRegistry::new();
        registry
            .build("cluster", |t| {
                t.parameter(
                    "ClusterSize",
                    props! { "Description" => "Number of nodes", "Default" => "3" },
                )?;
                t.resource(
                    "Group",
                    props! {
                        "Type" => "AWS::AutoScaling::AutoScalingGroup",
                        "Properties" => props! { "DesiredCapacity" => Reference::to("ClusterSize") },
                    },
                )?;
                Ok(())
            })
            .unwrap();
        registry
    }

    fn driver(client: MockStackClient) -> DeployDriver<MockStackClient> {
        DeployDriver::new(client, DeployConfig::default())
    }

    #[tokio::test]
    async fn test_create_sends_rendered_template() {
        let registry = registry();
        let store = ParameterStore::new();
        store.set_params("prod", [("ClusterSize", "5")]);
        let driver = driver(MockStackClient::new());

        driver.create(&registry, &store, "prod", "cluster", None).await.unwrap();

        let request = driver.client().last_request().unwrap();
        assert_eq!(request.stack_name, "prod");
        assert_eq!(request.template_body, Serializer::output(&registry, "cluster").unwrap());
        assert_eq!(request.parameter_value("ClusterSize"), Some("5"));
        assert_eq!(request.capabilities, vec!["CAPABILITY_IAM"]);
        assert!(request.disable_rollback);
    }

    #[tokio::test]
    async fn test_create_with_prompt() {
        let registry = registry();
        let store = ParameterStore::new();
        let prompter = ScriptedPrompter::new(&["7"]);
        let driver = driver(MockStackClient::new());

        driver
            .create(&registry, &store, "prod", "cluster", Some(&prompter))
            .await
            .unwrap();

        assert_eq!(*prompter.asked.borrow(), vec!["Number of nodes [3]: "]);
        assert_eq!(
            driver.client().last_request().unwrap().parameter_value("ClusterSize"),
            Some("7")
        );
    }

    #[tokio::test]
    async fn test_unknown_template_makes_no_call() {
        let driver = driver(MockStackClient::new());
        let result = driver
            .create(&registry(), &ParameterStore::new(), "prod", "missing", None)
            .await;

        assert!(matches!(
            result,
            Err(DeployError::Template(TemplateError::UnknownTemplate(_)))
        ));
        assert_eq!(driver.client().call_count(), 0);
    }

    #[tokio::test]
    async fn test_api_error_propagates() {
        let driver = driver(MockStackClient::new().simulate_failure("Template format error"));
        let result = driver
            .update(&registry(), &ParameterStore::new(), "prod", "cluster", None)
            .await;
        assert!(matches!(result, Err(DeployError::Api(msg)) if msg == "Template format error"));
    }

    #[tokio::test]
    async fn test_destroy_requires_confirmation() {
        let client = MockStackClient::new().with_stack(StackSummary::new("prod", "CREATE_COMPLETE"));
        let driver = driver(client);

        let declined = ScriptedPrompter::new(&["n"]);
        let result = driver.destroy("prod", false, Some(&declined)).await;
        assert!(matches!(result, Err(DeployError::Aborted(stack)) if stack == "prod"));
        assert_eq!(*declined.asked.borrow(), vec!["Delete stack prod [y/N] "]);
        assert!(!driver.client().was_called("delete_stack"));

        let confirmed = ScriptedPrompter::new(&[" Y \n"]);
        driver.destroy("prod", false, Some(&confirmed)).await.unwrap();
        assert!(driver.client().stack_names().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_force_skips_prompt() {
        let driver = driver(MockStackClient::new());
        driver.destroy("prod", true, None).await.unwrap();
        assert!(driver.client().was_called("delete_stack"));
    }

    #[tokio::test]
    async fn test_list_skips_unnamed_stacks() {
        let mut unnamed = StackSummary::new("", "DELETE_COMPLETE");
        unnamed.stack_name = None;
        let client = MockStackClient::new()
            .with_stack(StackSummary::new("prod", "CREATE_COMPLETE"))
            .with_stack(unnamed)
            .with_stack(StackSummary::new("", "DELETE_COMPLETE"));

        let stacks = driver(client).list().await.unwrap();
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].name(), Some("prod"));
    }
}
