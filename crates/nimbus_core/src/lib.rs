//! # nimbus_core
//!
//! Template assembly engine for Nimbus.
//!
//! This crate accumulates declarative fragments into CloudFormation template
//! documents, resolves symbolic cross-references lazily, and renders the
//! result deterministically.
//!
//! # Architecture
//!
//! - **Value / Fragment**: ordered property trees, with copy-on-mutate variants
//! - **Reference**: `Ref` / `Fn::GetAtt` pointers resolved only at output time
//! - **Registry**: named templates and the scoped construction context
//! - **Serializer**: canonical JSON (or YAML) rendering
//! - **ParameterStore**: per-stack parameter values for deployment
//! - **Nimbusfile**: YAML declarations loaded through the same builders
//!
//! # Example
//!
//! ```rust
//! use nimbus_core::{props, Reference, Serializer, TemplateRegistry};
//!
//! let registry = TemplateRegistry::new();
//! registry.build("cluster", |t| {
//!     t.parameter("Size", props! { "Type" => "Number", "Default" => "3" })?;
//!     let group = t.resource("Group", props! {
//!         "Type" => "AWS::EC2::SecurityGroup",
//!         "Properties" => props! { "Count" => Reference::to("Size") },
//!     })?;
//!     t.output("GroupId", props! { "Value" => group.attribute("GroupId") })?;
//!     Ok(())
//! })?;
//!
//! let json = Serializer::output(&registry, "cluster")?;
//! assert!(json.contains(r#""Fn::GetAtt": ["#));
//! # Ok::<(), nimbus_core::TemplateError>(())
//! ```

pub mod error;
pub mod fragment;
pub mod nimbusfile;
pub mod params;
pub mod path;
pub mod reference;
pub mod registry;
pub mod serializer;
pub mod template;
pub mod value;

// Re-export main types for convenience
pub use error::{TemplateError, TemplateResult};
pub use fragment::Fragment;
pub use nimbusfile::{Nimbusfile, DEFAULT_NIMBUSFILE};
pub use params::{ParameterStore, ParameterValues, Prompter, StackParameters};
pub use path::{Path, PathSegment};
pub use reference::{Handle, Reference};
pub use registry::{TemplateBuilder, TemplateRegistry};
pub use serializer::Serializer;
pub use template::{Section, SectionEntries, Template, FORMAT_VERSION};
pub use value::{Properties, Value};
