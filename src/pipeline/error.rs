//! Pipeline-specific error types.

use thiserror::Error;

/// Errors raised while registering types, mutating graphs, planning or executing.
#[derive(Error, Debug)]
pub enum GraphError {
    // Registry
    #[error("Filter type '{0}' is already registered")]
    DuplicateType(String),

    #[error("Unknown filter type '{0}'")]
    UnknownType(String),

    // Graph mutation
    #[error("Node '{0}' already exists")]
    DuplicateNode(String),

    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    #[error("Node '{node}' has no input port '{port}'")]
    UnknownPort { node: String, port: String },

    #[error("Input port '{node}:{port}' is already connected to '{source_name}'")]
    PortOccupied {
        node: String,
        port: String,
        source_name: String,
    },

    #[error("Node '{0}' does not produce an output")]
    NoOutput(String),

    #[error("Connecting '{from}' to '{node}:{port}' would create a cycle")]
    WouldCreateCycle {
        from: String,
        node: String,
        port: String,
    },

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Name '{0}' is used by both a root binding and a node")]
    NameConflict(String),

    #[error("Node '{node}' has no parameter '{param}'")]
    UnknownParameter { node: String, param: String },

    #[error("Parameter '{node}.{param}' expects {expected}, got {got}")]
    ParameterType {
        node: String,
        param: String,
        expected: &'static str,
        got: &'static str,
    },

    // Planning
    #[error("Graph contains a cycle through: {}", .0.join(", "))]
    CyclicGraph(Vec<String>),

    #[error("No traversal ends at terminal '{0}'")]
    UnreachableTerminal(String),

    #[error("Graph has no terminal node")]
    NoTerminal,

    #[error("Graph has several terminals ({}), pick one explicitly", .0.join(", "))]
    AmbiguousTerminal(Vec<String>),

    // Execution
    #[error("Required input port '{node}:{port}' is not connected")]
    UnboundPort { node: String, port: String },

    #[error("Root '{0}' has no value in the registry")]
    UnboundRoot(String),

    #[error("Node '{node}' failed: {source}")]
    OperationFailed {
        node: String,
        #[source]
        source: OperationError,
    },

    #[error("Node '{node}' cannot be emitted: {source}")]
    EmitFailed {
        node: String,
        #[source]
        source: OperationError,
    },

    // Workspace
    #[error("Unknown context '{0}'")]
    UnknownContext(String),

    #[error("Context '{0}' already exists")]
    DuplicateContext(String),
}

/// Errors reported by a filter operation itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("missing required input '{0}'")]
    MissingInput(&'static str),

    #[error("unsupported operand {0}")]
    UnsupportedOperand(String),

    #[error("operand shapes differ ({left} vs {right})")]
    ShapeMismatch { left: usize, right: usize },

    #[error("component {index} out of range for value with {len} components")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("missing parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("program emission is not supported by '{0}'")]
    EmitUnsupported(String),

    #[error("{0}")]
    Custom(String),
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
