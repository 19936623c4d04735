//! Template registry and the scoped construction context.

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{TemplateError, TemplateResult};
use crate::fragment::Fragment;
use crate::reference::Handle;
use crate::template::{Section, Template};
use crate::value::Properties;

#[derive(Default)]
struct RegistryState {
    templates: IndexMap<String, Template>,
    active: Option<String>,
}

/// Named collection of templates for the lifetime of the store.
///
/// Templates are assembled inside a construction context opened with
/// [`TemplateRegistry::begin`] or [`TemplateRegistry::build`]. At most one
/// context is active at a time; a second `begin` fails with
/// [`TemplateError::NestedContext`]. Names keep their first registration
/// position; re-opening a name resets its content.
#[derive(Default)]
pub struct TemplateRegistry {
    state: Mutex<RegistryState>,
}

impl TemplateRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a construction context for `name`.
    ///
    /// The named entry is created (or reset to an empty template) and becomes
    /// the target of section builders until the returned guard is dropped.
    pub fn begin(&self, name: impl Into<String>) -> TemplateResult<TemplateBuilder<'_>> {
        let name = name.into();
        let mut state = self.state.lock();

        if let Some(active) = &state.active {
            return Err(TemplateError::NestedContext {
                active: active.clone(),
                requested: name,
            });
        }

        if state.templates.contains_key(&name) {
            warn!("Redefining template: {}", name);
        }
        state.templates.insert(name.clone(), Template::new(&name));
        state.active = Some(name.clone());
        info!("Opened template: {}", name);

        Ok(TemplateBuilder {
            registry: self,
            name,
        })
    }

    /// Run `body` inside a construction context for `name`.
    ///
    /// The context is closed before this returns, whether `body` succeeds,
    /// fails or panics.
    pub fn build<F, T>(&self, name: impl Into<String>, body: F) -> TemplateResult<T>
    where
        F: FnOnce(&TemplateBuilder<'_>) -> TemplateResult<T>,
    {
        let builder = self.begin(name)?;
        let result = body(&builder);
        builder.finish();
        result
    }

    /// Name of the template under construction, if any.
    pub fn active(&self) -> Option<String> {
        self.state.lock().active.clone()
    }

    pub fn is_building(&self) -> bool {
        self.state.lock().active.is_some()
    }

    fn close(&self, name: &str) {
        let mut state = self.state.lock();
        if state.active.as_deref() == Some(name) {
            state.active = None;
            info!("Closed template: {}", name);
        }
    }

    /// Set the description of the template under construction.
    pub fn description(&self, text: impl Into<String>) -> TemplateResult<()> {
        let mut state = self.state.lock();
        let template = active_template(&mut state)?;
        template.set_description(text);
        debug!("Set description of template: {}", template.name());
        Ok(())
    }

    /// Declare a mapping (a verbatim lookup table) in the active template.
    pub fn mapping(&self, name: impl Into<String>, table: Properties) -> TemplateResult<Handle> {
        self.declare(Section::Mappings, name, table)
    }

    /// Declare a parameter in the active template.
    pub fn parameter(&self, name: impl Into<String>, props: Properties) -> TemplateResult<Handle> {
        self.declare(Section::Parameters, name, props)
    }

    /// Declare a resource in the active template.
    pub fn resource(&self, name: impl Into<String>, props: Properties) -> TemplateResult<Handle> {
        self.declare(Section::Resources, name, props)
    }

    /// Declare an output in the active template.
    pub fn output(&self, name: impl Into<String>, props: Properties) -> TemplateResult<Handle> {
        self.declare(Section::Outputs, name, props)
    }

    /// Write `body` into `section` of the active template, replacing any
    /// entry of the same name.
    pub fn declare(
        &self,
        section: Section,
        name: impl Into<String>,
        body: Properties,
    ) -> TemplateResult<Handle> {
        let name = name.into();
        let mut state = self.state.lock();
        let template = active_template(&mut state)?;
        insert_entry(template, section, &name, body)?;
        Ok(Handle::new(name))
    }

    /// Snapshot of a registered template.
    pub fn get(&self, name: &str) -> Option<Template> {
        self.state.lock().templates.get(name).cloned()
    }

    /// Snapshot of a registered template, failing if it is unknown.
    pub fn get_required(&self, name: &str) -> TemplateResult<Template> {
        self.get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))
    }

    /// Borrow a registered template for the duration of `read`.
    ///
    /// The registry lock is held while `read` runs, so `read` must not call
    /// back into the registry.
    pub(crate) fn with_template<R>(
        &self,
        name: &str,
        read: impl FnOnce(&Template) -> R,
    ) -> TemplateResult<R> {
        let state = self.state.lock();
        let template = state
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))?;
        Ok(read(template))
    }

    /// Check if a template is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().templates.contains_key(name)
    }

    /// Registered template names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.state.lock().templates.keys().cloned().collect()
    }

    /// The only registered template, when exactly one exists.
    pub fn default_template(&self) -> Option<String> {
        let state = self.state.lock();
        match state.templates.len() {
            1 => state.templates.keys().next().cloned(),
            _ => None,
        }
    }

    /// Get the number of registered templates.
    pub fn len(&self) -> usize {
        self.state.lock().templates.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().templates.is_empty()
    }
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TemplateRegistry")
            .field("templates", &state.templates.keys().collect::<Vec<_>>())
            .field("active", &state.active)
            .finish()
    }
}

fn active_template(state: &mut RegistryState) -> TemplateResult<&mut Template> {
    let RegistryState { templates, active } = state;
    let name = active.as_deref().ok_or(TemplateError::NoActiveTemplate)?;
    templates
        .get_mut(name)
        .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))
}

fn insert_entry(
    template: &mut Template,
    section: Section,
    name: &str,
    body: Properties,
) -> TemplateResult<()> {
    if name.is_empty() {
        return Err(TemplateError::EmptyName {
            section: section.to_string(),
        });
    }
    if template
        .insert(section, name, Fragment::new(body))
        .is_some()
    {
        debug!(
            "Replaced {} '{}' in template: {}",
            section.entry_kind(),
            name,
            template.name()
        );
    } else {
        debug!(
            "Declared {} '{}' in template: {}",
            section.entry_kind(),
            name,
            template.name()
        );
    }
    Ok(())
}

/// Guard for an open construction context.
///
/// Section builders called on the guard write into its template. Dropping
/// the guard closes the context.
pub struct TemplateBuilder<'r> {
    registry: &'r TemplateRegistry,
    name: String,
}

impl<'r> TemplateBuilder<'r> {
    /// Name of the template being built.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self, text: impl Into<String>) -> TemplateResult<()> {
        self.registry.description(text)
    }

    pub fn mapping(&self, name: impl Into<String>, table: Properties) -> TemplateResult<Handle> {
        self.declare(Section::Mappings, name, table)
    }

    pub fn parameter(&self, name: impl Into<String>, props: Properties) -> TemplateResult<Handle> {
        self.declare(Section::Parameters, name, props)
    }

    pub fn resource(&self, name: impl Into<String>, props: Properties) -> TemplateResult<Handle> {
        self.declare(Section::Resources, name, props)
    }

    pub fn output(&self, name: impl Into<String>, props: Properties) -> TemplateResult<Handle> {
        self.declare(Section::Outputs, name, props)
    }

    pub fn declare(
        &self,
        section: Section,
        name: impl Into<String>,
        body: Properties,
    ) -> TemplateResult<Handle> {
        self.registry.declare(section, name, body)
    }

    /// Copy of an entry declared earlier in this template, for deriving
    /// variants with [`Fragment::mutate`].
    pub fn fragment(&self, section: Section, name: &str) -> Option<Fragment> {
        let state = self.registry.state.lock();
        state
            .templates
            .get(&self.name)
            .and_then(|template| template.fragment(section, name))
            .cloned()
    }

    /// Close the context explicitly.
    pub fn finish(self) {}
}

impl Drop for TemplateBuilder<'_> {
    fn drop(&mut self) {
        self.registry.close(&self.name);
    }
}

impl std::fmt::Debug for TemplateBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateBuilder")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;
    use crate::reference::Reference;
    use crate::value::Value;

    #[test]
    fn test_begin_registers_empty_template() {
        let registry = TemplateRegistry::new();
        assert!(registry.is_empty());

        let builder = registry.begin("web").unwrap();
        assert_eq!(builder.name(), "web");
        assert_eq!(registry.active().as_deref(), Some("web"));
        drop(builder);

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("web"));
        assert!(registry.get("web").unwrap().is_empty());
        assert!(!registry.is_building());
    }

    #[test]
    fn test_builder_writes_sections() {
        let registry = TemplateRegistry::new();
        registry
            .build("web", |t| {
                t.description("Web tier")?;
                t.parameter("Size", props! { "Default" => "3" })?;
                t.resource("Group", props! { "Type" => "X" })?;
                Ok(())
            })
            .unwrap();

        let template = registry.get_required("web").unwrap();
        assert_eq!(template.description(), Some("Web tier"));
        assert!(template.fragment(Section::Parameters, "Size").is_some());
        assert!(template.fragment(Section::Resources, "Group").is_some());
    }

    #[test]
    fn test_ambient_builders_target_active_template() {
        let registry = TemplateRegistry::new();
        let _guard = registry.begin("db").unwrap();

        registry.output("Endpoint", props! { "Value" => "x" }).unwrap();
        assert!(registry
            .get("db")
            .unwrap()
            .fragment(Section::Outputs, "Endpoint")
            .is_some());
    }

    #[test]
    fn test_no_active_template() {
        let registry = TemplateRegistry::new();
        let result = registry.resource("Orphan", props! {});
        assert!(matches!(result, Err(TemplateError::NoActiveTemplate)));
        assert!(matches!(
            registry.description("nothing"),
            Err(TemplateError::NoActiveTemplate)
        ));
    }

    #[test]
    fn test_context_cleared_after_failure() {
        let registry = TemplateRegistry::new();
        let result: TemplateResult<()> = registry.build("broken", |t| {
            t.resource("First", props! { "Type" => "X" })?;
            Err(TemplateError::InvalidNimbusfile("mid-block failure".to_string()))
        });

        assert!(result.is_err());
        assert!(!registry.is_building());
        assert!(matches!(
            registry.parameter("Late", props! {}),
            Err(TemplateError::NoActiveTemplate)
        ));
    }

    #[test]
    fn test_context_cleared_after_panic() {
        let registry = TemplateRegistry::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = registry.build("panicky", |_| -> TemplateResult<()> {
                panic!("builder blew up");
            });
        }));

        assert!(outcome.is_err());
        assert!(matches!(
            registry.resource("Late", props! {}),
            Err(TemplateError::NoActiveTemplate)
        ));
    }

    #[test]
    fn test_nested_context_rejected() {
        let registry = TemplateRegistry::new();
        let _outer = registry.begin("outer").unwrap();

        let nested = registry.begin("inner");
        match nested {
            Err(TemplateError::NestedContext { active, requested }) => {
                assert_eq!(active, "outer");
                assert_eq!(requested, "inner");
            }
            other => panic!("expected nested context error, got {:?}", other),
        }
        assert!(!registry.contains("inner"));
        assert_eq!(registry.active().as_deref(), Some("outer"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let registry = TemplateRegistry::new();
        let _guard = registry.begin("t").unwrap();
        assert!(matches!(
            registry.resource("", props! {}),
            Err(TemplateError::EmptyName { .. })
        ));
    }

    #[test]
    fn test_reopen_resets_template() {
        let registry = TemplateRegistry::new();
        registry
            .build("a", |t| t.resource("Old", props! {}).map(|_| ()))
            .unwrap();
        registry.build("b", |_| Ok(())).unwrap();
        registry
            .build("a", |t| t.resource("New", props! {}).map(|_| ()))
            .unwrap();

        assert_eq!(registry.names(), vec!["a", "b"]);
        let template = registry.get("a").unwrap();
        assert!(template.fragment(Section::Resources, "Old").is_none());
        assert!(template.fragment(Section::Resources, "New").is_some());
    }

    #[test]
    fn test_handle_produces_references() {
        let registry = TemplateRegistry::new();
        let handle = registry
            .build("t", |t| t.resource("Foo", props! { "Type" => "AWS::EC2::SecurityGroup" }))
            .unwrap();

        assert_eq!(handle.reference(), Reference::to("Foo"));
        assert_eq!(
            handle.attribute("GroupId"),
            Reference::attribute_of("Foo", "GroupId")
        );
    }

    #[test]
    fn test_fragment_copy_for_variants() {
        let registry = TemplateRegistry::new();
        registry
            .build("t", |t| {
                t.resource("Primary", props! { "Type" => "AWS::SQS::Queue" })?;
                let base = t.fragment(Section::Resources, "Primary").unwrap();
                let variant = base.mutate("DeletionPolicy", "Retain")?;
                t.resource("Secondary", variant.into_properties())?;
                Ok(())
            })
            .unwrap();

        let template = registry.get("t").unwrap();
        assert!(template
            .fragment(Section::Resources, "Primary")
            .unwrap()
            .get("DeletionPolicy")
            .is_none());
        assert_eq!(
            template
                .fragment(Section::Resources, "Secondary")
                .unwrap()
                .get("DeletionPolicy"),
            Some(&Value::from("Retain"))
        );
    }

    #[test]
    fn test_default_template() {
        let registry = TemplateRegistry::new();
        assert_eq!(registry.default_template(), None);

        registry.build("only", |_| Ok(())).unwrap();
        assert_eq!(registry.default_template().as_deref(), Some("only"));

        registry.build("second", |_| Ok(())).unwrap();
        assert_eq!(registry.default_template(), None);
    }

    #[test]
    fn test_with_template_reads_without_copy() {
        let registry = TemplateRegistry::new();
        registry
            .build("web", |t| {
                t.resource("Queue", props! { "Type" => "AWS::SQS::Queue" })?;
                Ok(())
            })
            .unwrap();

        let count = registry.with_template("web", |t| t.resources().len()).unwrap();
        assert_eq!(count, 1);
        assert!(matches!(
            registry.with_template("missing", |t| t.resources().len()),
            Err(TemplateError::UnknownTemplate(_))
        ));
        // The lock is released once the reader returns.
        assert!(registry.contains("web"));
    }
}
