//! # filtergraph-rs: Dataflow Filter-Graph Engine
//!
//! Numeric computations are described as directed acyclic graphs of filter
//! nodes, either built by hand or compiled from infix expression text, and
//! evaluated against named root values.
//!
//! ## Architecture
//!
//! - **Pipeline**: filter type registry, graph arena, Kahn planner and the
//!   eager executor / program emitter
//! - **Workspace**: named contexts, each owning a graph, its root bindings
//!   and a backend
//! - **Expression**: lexer, Pratt parser and lowering into graph nodes
//! - **Scripting**: Rhai runner for emitted programs
//! - **State space**: parameter-sweep enumeration over named axes
//!
//! ## Example
//!
//! ```
//! use filtergraph_rs::{Value, Workspace};
//!
//! let mut ws = Workspace::builder().build();
//! ws.registry_add(":a", 3.0).unwrap();
//! ws.registry_add(":b", 2.0).unwrap();
//! ws.compile("res = (a + b)^2 + (a - b)^2").unwrap();
//! assert_eq!(ws.execute().unwrap(), Value::Float(26.0));
//! ```

pub mod config;
pub mod error;
pub mod expression;
pub mod logging;
pub mod pipeline;
pub mod scripting;
pub mod state_space;
pub mod types;
pub mod workspace;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{FilterGraphError, Result, ResultExt};
pub use expression::{parse_network, ExpressionError, Generator};
pub use pipeline::{ExecutionPlan, FilterGraph, FilterRegistry, FilterType, GraphDict, GraphError};
pub use scripting::ScriptRunner;
pub use state_space::{StateSpace, StateVector, StateVectorGenerator, TraversalMode};
pub use types::{ParamMap, ParamValue, Value};
pub use workspace::{Backend, Context, ProgramRunner, RootRegistry, Workspace, WorkspaceBuilder};
