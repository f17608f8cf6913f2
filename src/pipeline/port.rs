//! Port descriptors for the filter system.
//!
//! Each filter type declares its input ports in order. The graph uses these
//! to validate `node:port` specs on connect, and the executor uses the order
//! to hand inputs to the operation.

use std::borrow::Cow;

/// Whether an unconnected port is an execution error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRequirement {
    Required,
    Optional,
}

/// Static descriptor for a filter's input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub name: Cow<'static, str>,
    pub requirement: PortRequirement,
}

impl PortDescriptor {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            requirement: PortRequirement::Required,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            requirement: PortRequirement::Optional,
        }
    }

    /// Required port with a runtime-built name (plugins).
    pub fn owned(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            requirement: PortRequirement::Required,
        }
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        self.requirement == PortRequirement::Required
    }
}

/// Split a `node:port` spec at its last colon.
///
/// Returns `None` when there is no colon or either side is empty.
pub fn split_port_spec(spec: &str) -> Option<(&str, &str)> {
    let (node, port) = spec.rsplit_once(':')?;
    if node.is_empty() || port.is_empty() {
        None
    } else {
        Some((node, port))
    }
}
