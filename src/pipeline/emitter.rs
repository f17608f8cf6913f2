//! Program emission for compiling backends.
//!
//! Instead of running operations, each node of a traversal contributes a
//! named fragment `let v_<node> = <expr>;` where `<expr>` reads earlier
//! fragment variables and root input variables. The fragments, in plan
//! order, form one program whose last line yields the terminal's value.
//! The program text targets the Rhai dialect understood by
//! [`crate::scripting::ScriptRunner`]; hosts with another compile step
//! consume the fragments directly.

use crate::pipeline::compiled_plan::Traversal;
use crate::pipeline::error::{GraphError, GraphResult, OperationError};
use crate::pipeline::graph::{FilterGraph, PortSource};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

/// Format a float so it parses back as a float literal (`2` → `2.0`).
pub fn float_literal(value: f64) -> Result<String, OperationError> {
    if !value.is_finite() {
        return Err(OperationError::UnsupportedOperand(format!(
            "non-finite literal {}",
            value
        )));
    }
    let text = value.to_string();
    if text.contains('.') || text.contains('e') {
        Ok(text)
    } else {
        Ok(format!("{}.0", text))
    }
}

/// Identifier-safe form of a node or root name.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// One node's contribution to the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramFragment {
    /// Node name
    pub name: String,
    /// Program variable holding the node's value
    pub var: String,
    /// Expression computing the value
    pub code: String,
}

/// A root the program reads, and the variable it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInput {
    pub root: String,
    pub var: String,
}

/// A fused program computing one terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedProgram {
    pub fragments: Vec<ProgramFragment>,
    pub inputs: Vec<ProgramInput>,
    /// Terminal node name
    pub terminal: String,
    /// Variable holding the terminal's value
    pub terminal_var: String,
}

impl EmittedProgram {
    /// Program text: one `let` per fragment, then the terminal variable.
    pub fn source(&self) -> String {
        let mut out = String::new();
        for fragment in &self.fragments {
            let _ = writeln!(out, "let {} = {};", fragment.var, fragment.code);
        }
        out.push_str(&self.terminal_var);
        out.push('\n');
        out
    }
}

/// Assigns unique program variable names.
#[derive(Debug, Default)]
struct VarNames {
    used: HashSet<String>,
}

impl VarNames {
    fn fresh(&mut self, prefix: &str, name: &str) -> String {
        let base = format!("{}_{}", prefix, sanitize(name));
        let mut candidate = base.clone();
        let mut n = 1;
        while !self.used.insert(candidate.clone()) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        candidate
    }
}

/// Emits a traversal as program text.
pub struct ProgramEmitter;

impl ProgramEmitter {
    pub fn emit(graph: &FilterGraph, traversal: &Traversal) -> GraphResult<EmittedProgram> {
        let mut names = VarNames::default();
        let mut node_vars: BTreeMap<u32, String> = BTreeMap::new();
        let mut root_vars: BTreeMap<String, String> = BTreeMap::new();
        let mut inputs = Vec::new();
        let mut fragments = Vec::with_capacity(traversal.len());
        let prefix = graph.root_prefix();

        for entry in &traversal.entries {
            let slot = graph.node(entry.node);
            let ty = graph.filter_type(entry.node);

            let mut args = Vec::with_capacity(ty.ports().len());
            for (port, source) in ty.ports().iter().zip(&slot.inputs) {
                let arg = match source {
                    None if port.is_required() => {
                        return Err(GraphError::UnboundPort {
                            node: slot.name.clone(),
                            port: port.name.to_string(),
                        });
                    }
                    None => None,
                    Some(PortSource::Root(root)) => {
                        let var = root_vars
                            .entry(root.clone())
                            .or_insert_with(|| {
                                let var = names.fresh("r", root.trim_start_matches(prefix));
                                inputs.push(ProgramInput {
                                    root: root.clone(),
                                    var: var.clone(),
                                });
                                var
                            })
                            .clone();
                        Some(var)
                    }
                    Some(PortSource::Node(producer)) => node_vars.get(&producer.0).cloned(),
                };
                args.push(arg);
            }

            let code = ty
                .filter()
                .emit(&slot.params, &args)
                .map_err(|source| GraphError::EmitFailed {
                    node: slot.name.clone(),
                    source,
                })?;
            let var = names.fresh("v", &slot.name);
            node_vars.insert(entry.node.0, var.clone());
            fragments.push(ProgramFragment {
                name: slot.name.clone(),
                var,
                code,
            });
        }

        let terminal_var = node_vars
            .get(&traversal.terminal.0)
            .cloned()
            .unwrap_or_else(|| "()".to_string());
        tracing::debug!(
            "Emitted {} fragment(s) for terminal '{}'",
            fragments.len(),
            traversal.terminal_name()
        );

        Ok(EmittedProgram {
            fragments,
            inputs,
            terminal: traversal.terminal_name().to_string(),
            terminal_var,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::compiled_plan::ExecutionPlan;
    use crate::pipeline::registry::FilterRegistry;
    use std::sync::Arc;

    #[test]
    fn test_float_literal() {
        assert_eq!(float_literal(2.0).unwrap(), "2.0");
        assert_eq!(float_literal(-0.25).unwrap(), "-0.25");
        assert_eq!(float_literal(1e300).unwrap().parse::<f64>().unwrap(), 1e300);
        assert!(float_literal(f64::NAN).is_err());
    }

    #[test]
    fn test_emit_program_text() {
        let mut g = FilterGraph::new(Arc::new(FilterRegistry::with_builtins()));
        g.add_node("const", "two").unwrap();
        g.add_node("add", "sum").unwrap();
        g.add_node("pow", "res").unwrap();
        g.set_param("two", "value", 2.0).unwrap();
        g.connect(":a", "sum:in_a").unwrap();
        g.connect(":a", "sum:in_b").unwrap();
        g.connect("sum", "res:in_a").unwrap();
        g.connect("two", "res:in_b").unwrap();

        let plan = ExecutionPlan::build(&g).unwrap();
        let program = ProgramEmitter::emit(&g, &plan.traversals[0]).unwrap();

        assert_eq!(program.terminal, "res");
        assert_eq!(
            program.inputs,
            vec![ProgramInput {
                root: ":a".into(),
                var: "r_a".into()
            }]
        );
        assert_eq!(
            program.source(),
            "let v_two = 2.0;\nlet v_sum = fg_add(r_a, r_a);\nlet v_res = fg_pow(v_sum, v_two);\nv_res\n"
        );
    }

    #[test]
    fn test_sanitized_names_stay_unique() {
        let mut names = VarNames::default();
        assert_eq!(names.fresh("v", "a-b"), "v_a_b");
        assert_eq!(names.fresh("v", "a_b"), "v_a_b_1");
    }
}
