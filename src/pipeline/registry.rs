//! Filter type registry.
//!
//! Maps a tag to its [`FilterType`]. Registration happens up front; graphs
//! then share the registry read-only behind an `Arc`, so a registry can no
//! longer change once a graph has been built from it.

use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::filter_type::FilterType;
use crate::pipeline::id::FilterTypeId;
use crate::pipeline::nodes::builtin_filter_types;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// A source of filter types that can be registered as a unit.
pub trait FilterModule {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Every filter type this module provides.
    fn filter_types(&self) -> Vec<FilterType>;
}

/// The built-in arithmetic and array filters.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinModule;

impl FilterModule for BuiltinModule {
    fn name(&self) -> &str {
        "builtin"
    }

    fn filter_types(&self) -> Vec<FilterType> {
        builtin_filter_types()
    }
}

/// Registry of filter types, indexed by tag.
#[derive(Debug, Default, Clone)]
pub struct FilterRegistry {
    types: Vec<FilterType>,
    by_tag: HashMap<String, FilterTypeId>,
}

impl FilterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in filters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for ty in builtin_filter_types() {
            // Built-in tags are distinct.
            let tag = ty.tag().to_string();
            let id = FilterTypeId(registry.types.len() as u32);
            registry.types.push(ty);
            registry.by_tag.insert(tag, id);
        }
        registry
    }

    /// Process-wide registry of the built-in filters, initialised on first use.
    pub fn global() -> Arc<FilterRegistry> {
        static GLOBAL: OnceLock<Arc<FilterRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(FilterRegistry::with_builtins()))
            .clone()
    }

    /// Register a filter type. Fails if the tag is already taken.
    pub fn register(&mut self, ty: FilterType) -> GraphResult<FilterTypeId> {
        if self.by_tag.contains_key(ty.tag()) {
            return Err(GraphError::DuplicateType(ty.tag().to_string()));
        }
        let id = FilterTypeId(self.types.len() as u32);
        tracing::debug!("Registered filter type {}", ty);
        self.by_tag.insert(ty.tag().to_string(), id);
        self.types.push(ty);
        Ok(id)
    }

    /// Register every type of `module`.
    ///
    /// Either all types are registered or, on the first tag collision,
    /// none are.
    pub fn register_module(&mut self, module: &dyn FilterModule) -> GraphResult<Vec<FilterTypeId>> {
        let types = module.filter_types();

        let mut seen = std::collections::HashSet::new();
        for ty in &types {
            if self.by_tag.contains_key(ty.tag()) || !seen.insert(ty.tag().to_string()) {
                tracing::warn!(
                    "Module '{}' collides on filter type '{}'",
                    module.name(),
                    ty.tag()
                );
                return Err(GraphError::DuplicateType(ty.tag().to_string()));
            }
        }

        let ids = types
            .into_iter()
            .map(|ty| self.register(ty))
            .collect::<GraphResult<Vec<_>>>()?;
        tracing::info!(
            "Registered {} filter types from module '{}'",
            ids.len(),
            module.name()
        );
        Ok(ids)
    }

    /// Look up a type by tag.
    pub fn lookup(&self, tag: &str) -> GraphResult<&FilterType> {
        self.id_of(tag).map(|id| &self.types[id.index()])
    }

    /// Resolve a tag to its id.
    pub fn id_of(&self, tag: &str) -> GraphResult<FilterTypeId> {
        self.by_tag
            .get(tag)
            .copied()
            .ok_or_else(|| GraphError::UnknownType(tag.to_string()))
    }

    /// Get a type by id. Ids only come from this registry.
    pub fn get(&self, id: FilterTypeId) -> &FilterType {
        &self.types[id.index()]
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    /// Registered tags in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.tag())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::OperationError;
    use crate::pipeline::node::{FilterInputs, FilterOperation};
    use crate::pipeline::port::PortDescriptor;
    use crate::types::{ParamMap, Value};

    struct Noop;

    impl FilterOperation for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn execute(&self, _params: &ParamMap, _inputs: &FilterInputs) -> Result<Value, OperationError> {
            Ok(Value::Null)
        }
    }

    struct ImageModule;

    impl FilterModule for ImageModule {
        fn name(&self) -> &str {
            "image"
        }

        fn filter_types(&self) -> Vec<FilterType> {
            vec![
                FilterType::plugin("compose_image", Arc::new(Noop))
                    .with_port(PortDescriptor::required("in_a"))
                    .with_port(PortDescriptor::required("in_b")),
                FilterType::plugin("fileout", Arc::new(Noop))
                    .with_port(PortDescriptor::required("in"))
                    .without_output(),
            ]
        }
    }

    struct CollidingModule;

    impl FilterModule for CollidingModule {
        fn name(&self) -> &str {
            "colliding"
        }

        fn filter_types(&self) -> Vec<FilterType> {
            vec![
                FilterType::plugin("shell", Arc::new(Noop)),
                FilterType::plugin("add", Arc::new(Noop)),
            ]
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = FilterRegistry::with_builtins();
        for tag in ["add", "sub", "mult", "div", "pow", "sqrt", "const", "compose", "decompose"] {
            assert!(registry.contains(tag), "missing {tag}");
        }
        assert_eq!(registry.tags().next(), Some("add"));
    }

    #[test]
    fn test_duplicate_type() {
        let mut registry = FilterRegistry::with_builtins();
        let err = registry
            .register(FilterType::plugin("add", Arc::new(Noop)))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateType(tag) if tag == "add"));
    }

    #[test]
    fn test_unknown_type() {
        let registry = FilterRegistry::new();
        assert!(matches!(
            registry.lookup("grad"),
            Err(GraphError::UnknownType(tag)) if tag == "grad"
        ));
    }

    #[test]
    fn test_register_modules() {
        let mut registry = FilterRegistry::new();
        registry.register_module(&BuiltinModule).unwrap();
        let ids = registry.register_module(&ImageModule).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(!registry.lookup("fileout").unwrap().produces_output());
    }

    #[test]
    fn test_colliding_module_registers_nothing() {
        let mut registry = FilterRegistry::with_builtins();
        let before = registry.len();
        assert!(registry.register_module(&CollidingModule).is_err());
        assert_eq!(registry.len(), before);
        assert!(!registry.contains("shell"));
    }

    #[test]
    fn test_global_is_shared() {
        let a = FilterRegistry::global();
        let b = FilterRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.contains("sqrt"));
    }
}
