//! Filter type schemas.
//!
//! A `FilterType` describes what a node of that type looks like: its tag,
//! ordered input ports, default parameters (which also fix each parameter's
//! type), whether it produces an output, and the operation it runs.

use crate::pipeline::node::{AnyFilter, BuiltinFilter, FilterOperation};
use crate::pipeline::port::PortDescriptor;
use crate::types::{ParamMap, ParamValue};
use std::fmt;
use std::sync::Arc;

/// Immutable schema of a registered filter.
#[derive(Debug, Clone)]
pub struct FilterType {
    tag: String,
    ports: Vec<PortDescriptor>,
    defaults: ParamMap,
    produces_output: bool,
    description: Option<String>,
    filter: AnyFilter,
}

impl FilterType {
    /// Schema for a built-in filter.
    pub fn builtin(
        tag: &str,
        ports: Vec<PortDescriptor>,
        defaults: Vec<(&str, ParamValue)>,
        filter: BuiltinFilter,
    ) -> Self {
        Self {
            tag: tag.to_string(),
            ports,
            defaults: defaults
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            produces_output: true,
            description: None,
            filter: AnyFilter::Builtin(filter),
        }
    }

    /// Schema for a host-supplied operation. Ports and parameters are added
    /// with the `with_*` builders.
    pub fn plugin(tag: impl Into<String>, operation: Arc<dyn FilterOperation>) -> Self {
        Self {
            tag: tag.into(),
            ports: Vec::new(),
            defaults: ParamMap::new(),
            produces_output: true,
            description: None,
            filter: AnyFilter::Plugin(operation),
        }
    }

    pub fn with_port(mut self, port: PortDescriptor) -> Self {
        self.ports.push(port);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, default: impl Into<ParamValue>) -> Self {
        self.defaults.insert(name.into(), default.into());
        self
    }

    /// Mark the type as producing no output (file writers, shell commands).
    pub fn without_output(mut self) -> Self {
        self.produces_output = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        &self.ports
    }

    /// Position of the input port called `name`.
    pub fn port_index(&self, name: &str) -> Option<usize> {
        self.ports.iter().position(|p| p.name == name)
    }

    pub fn defaults(&self) -> &ParamMap {
        &self.defaults
    }

    pub fn produces_output(&self) -> bool {
        self.produces_output
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn filter(&self) -> &AnyFilter {
        &self.filter
    }

    /// A type without input ports is a constant/generator source.
    pub fn is_source(&self) -> bool {
        self.ports.is_empty()
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ports: Vec<&str> = self.ports.iter().map(|p| p.name.as_ref()).collect();
        write!(f, "{}({})", self.tag, ports.join(", "))?;
        if !self.produces_output {
            write!(f, " -> ()")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::OperationError;
    use crate::pipeline::node::FilterInputs;
    use crate::types::Value;

    struct FileOut;

    impl FilterOperation for FileOut {
        fn name(&self) -> &str {
            "fileout"
        }

        fn execute(&self, _params: &ParamMap, _inputs: &FilterInputs) -> Result<Value, OperationError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_plugin_builder() {
        let ty = FilterType::plugin("fileout", Arc::new(FileOut))
            .with_port(PortDescriptor::required("in"))
            .with_param("path", "out.png")
            .without_output();

        assert_eq!(ty.tag(), "fileout");
        assert_eq!(ty.port_index("in"), Some(0));
        assert_eq!(ty.port_index("out"), None);
        assert!(!ty.produces_output());
        assert!(!ty.is_source());
        assert_eq!(
            ty.defaults().get("path"),
            Some(&ParamValue::Text("out.png".into()))
        );
        assert_eq!(ty.to_string(), "fileout(in) -> ()");
    }
}
