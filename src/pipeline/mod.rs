//! Filter-graph core: registry, graph, planner and executors.
//!
//! Values flow from root bindings through filter nodes to terminals:
//!
//! ```text
//! :a ──► [add sum] ──► [pow res] ◄── [const two]
//! :b ──┘
//! ```
//!
//! # Design
//!
//! - **Closed enum dispatch** for built-in filters (`BuiltinFilter`), with a
//!   `FilterOperation` trait object for plugin types.
//! - **Arena graph** with tombstoned slots; `NodeId` is a stable index.
//! - **Cached plans** keyed by the graph's generation counter.
//! - **Two backends**: eager per-node execution, or one emitted program per
//!   terminal handed to an external runner.

pub mod compiled_plan;
pub mod compiler;
pub mod dict;
pub mod emitter;
pub mod error;
pub mod executor;
pub mod filter_type;
pub mod graph;
pub mod id;
pub mod node;
pub mod nodes;
pub mod port;
pub mod registry;

pub use compiled_plan::{ExecutionPlan, PlanStats, Traversal, TraversalEntry};
pub use compiler::PlanCompiler;
pub use dict::{ConnectionSpec, GraphDict, NodeSpec};
pub use emitter::{EmittedProgram, ProgramEmitter, ProgramFragment, ProgramInput};
pub use error::{GraphError, GraphResult, OperationError};
pub use executor::{EagerExecutor, ExecutionStats};
pub use filter_type::FilterType;
pub use graph::{Edge, FilterGraph, NodeSlot, PortSource, DEFAULT_ROOT_PREFIX};
pub use id::{FilterTypeId, NodeId};
pub use node::{AnyFilter, BuiltinFilter, FilterInputs, FilterOperation};
pub use port::{PortDescriptor, PortRequirement};
pub use registry::{BuiltinModule, FilterModule, FilterRegistry};
