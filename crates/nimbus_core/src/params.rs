//! Stack parameter values supplied at deployment time.

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::template::Template;

/// Parameter name to wire value.
pub type ParameterValues = IndexMap<String, String>;

/// Parameter values keyed by stack name.
#[derive(Debug, Default)]
pub struct ParameterStore {
    params: Mutex<HashMap<String, ParameterValues>>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the values for `stack`, replacing any earlier set.
    pub fn set_params<I, K, V>(&self, stack: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let stack = stack.into();
        let values: ParameterValues = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        debug!("Setting {} parameter(s) for stack: {}", values.len(), stack);
        self.params.lock().insert(stack, values);
    }

    /// Values recorded for `stack`, or an empty set.
    pub fn get_params(&self, stack: &str) -> ParameterValues {
        self.params.lock().get(stack).cloned().unwrap_or_default()
    }

    /// Stack names with recorded values, sorted.
    pub fn stacks(&self) -> Vec<String> {
        let mut stacks: Vec<_> = self.params.lock().keys().cloned().collect();
        stacks.sort();
        stacks
    }
}

/// Interactive source of parameter values.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter {
    /// Show `message` and return the line the operator typed.
    fn prompt(&self, message: &str) -> std::io::Result<String>;
}

/// Final parameter list for deploying one template as one stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackParameters {
    stack: String,
    template: String,
    values: ParameterValues,
}

impl StackParameters {
    /// Check `stored` against the parameters `template` declares and, when a
    /// prompter is given, ask for each declared parameter in order.
    ///
    /// Every stored name must be declared by the template. The prompt reads
    /// `"{Description} [{Default}]: "`; an empty answer keeps the stored
    /// value, then the declared default, then leaves the parameter unset.
    pub fn resolve(
        template: &Template,
        stack: &str,
        stored: ParameterValues,
        prompter: Option<&dyn Prompter>,
    ) -> TemplateResult<Self> {
        if let Some(undeclared) = stored
            .keys()
            .find(|name| !template.parameters().contains_key(name.as_str()))
        {
            return Err(TemplateError::UndeclaredParameter {
                stack: stack.to_string(),
                parameter: undeclared.clone(),
            });
        }

        let mut values = stored;

        if let Some(prompter) = prompter {
            for (name, fragment) in template.parameters() {
                let description = fragment
                    .get("Description")
                    .and_then(|v| v.as_str())
                    .unwrap_or(name.as_str());
                let default = values.get(name).cloned().or_else(|| {
                    fragment
                        .get("Default")
                        .and_then(|v| v.to_parameter_string())
                });

                let message = format!(
                    "{} [{}]: ",
                    description,
                    default.as_deref().unwrap_or_default()
                );
                let answer = prompter.prompt(&message)?;
                let answer = answer.trim();

                if !answer.is_empty() {
                    values.insert(name.clone(), answer.to_string());
                } else if let Some(default) = default {
                    values.insert(name.clone(), default);
                }
            }
        }

        Ok(Self {
            stack: stack.to_string(),
            template: template.name().to_string(),
            values,
        })
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn values(&self) -> &ParameterValues {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(name, value)` pairs in declaration order of the supplied values.
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.values.into_iter().collect()
    }
}
