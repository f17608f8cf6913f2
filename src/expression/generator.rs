//! Lowering of parsed networks into filter-graph nodes.
//!
//! Each operator, call and literal becomes one node. Intermediate nodes are
//! auto-named `{tag}_{n}`; the outermost node of a statement takes the
//! statement's target name. When a statement's value is a bare identifier
//! or an index read, an `identity` node carries the target name instead.

use super::ast::{Expr, Network, Statement};
use super::parser::parse_network;
use super::token::Span;
use super::ExpressionError;
use crate::pipeline::nodes::{INDEX_PARAM, VALUE_PARAM};
use crate::workspace::context::Context;
use std::collections::{HashMap, HashSet};

type LowerResult<T> = Result<T, ExpressionError>;

/// Compiles expression text into a context's graph.
#[derive(Debug, Default)]
pub struct Generator {
    /// Targets assigned so far in the current text
    targets: HashSet<String>,
    /// `(source, index)` reads already backed by a decompose node
    reads: HashMap<(String, usize), String>,
    /// Nodes created by the current compile, in creation order
    created: Vec<String>,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` and extend `context`'s graph with it, returning the
    /// created node names. The last statement's target is marked terminal.
    ///
    /// On error every node created by this call is removed again.
    pub fn compile(&mut self, text: &str, context: &mut Context) -> LowerResult<Vec<String>> {
        let network = parse_network(text)?;
        self.targets.clear();
        self.reads.clear();
        self.created.clear();

        match self.lower_network(&network, context) {
            Ok(()) => {
                tracing::debug!(
                    "Compiled {} statement(s) into {} node(s) in context '{}'",
                    network.statements.len(),
                    self.created.len(),
                    context.name()
                );
                Ok(std::mem::take(&mut self.created))
            }
            Err(e) => {
                self.rollback(context);
                Err(e)
            }
        }
    }

    fn lower_network(&mut self, network: &Network, ctx: &mut Context) -> LowerResult<()> {
        for statement in &network.statements {
            self.lower_statement(statement, ctx)?;
        }
        if let Some(last) = network.statements.last() {
            ctx.mark_terminal(&last.target)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, statement: &Statement, ctx: &mut Context) -> LowerResult<()> {
        self.lower(&statement.value, Some(&statement.target), ctx)?;
        self.targets.insert(statement.target.clone());
        Ok(())
    }

    /// Lower `expr`, returning the name its value is read from: a node name
    /// or a root name. With `target` set, the result is a node of that name.
    fn lower(&mut self, expr: &Expr, target: Option<&str>, ctx: &mut Context) -> LowerResult<String> {
        match expr {
            Expr::Number(value, _) => {
                let name = self.add_node("const", target, &[], ctx)?;
                ctx.set_param(&name, VALUE_PARAM, *value)?;
                Ok(name)
            }
            Expr::Ident(ident, span) => {
                let source = self.resolve(ident, *span, ctx)?;
                self.carry(source, target, ctx)
            }
            Expr::Index { source, index, span } => {
                let source = self.index(source, *index, *span, ctx)?;
                self.carry(source, target, ctx)
            }
            Expr::Neg(inner, _) => {
                let x = self.lower(inner, None, ctx)?;
                self.add_node("neg", target, &[x], ctx)
            }
            Expr::Binary { op, left, right, .. } => {
                let a = self.lower(left, None, ctx)?;
                let b = self.lower(right, None, ctx)?;
                self.add_node(op.tag(), target, &[a, b], ctx)
            }
            Expr::Call { function, args, span } => {
                let (ports, required) = {
                    let ty = ctx.graph().registry().lookup(function)?;
                    let required = ty.ports().iter().filter(|p| p.is_required()).count();
                    (ty.ports().len(), required)
                };
                if args.len() > ports || args.len() < required {
                    return Err(ExpressionError::ArityMismatch {
                        function: function.clone(),
                        expected: if args.len() > ports { ports } else { required },
                        got: args.len(),
                        offset: span.offset,
                    });
                }

                let inputs = args
                    .iter()
                    .map(|arg| self.lower(arg, None, ctx))
                    .collect::<LowerResult<Vec<_>>>()?;
                self.add_node(function, target, &inputs, ctx)
            }
        }
    }

    /// Give an already-computed value the target's name, if there is one.
    fn carry(&mut self, source: String, target: Option<&str>, ctx: &mut Context) -> LowerResult<String> {
        match target {
            Some(_) => self.add_node("identity", target, &[source], ctx),
            None => Ok(source),
        }
    }

    /// Earlier target, else bound root, else existing node.
    fn resolve(&self, ident: &str, span: Span, ctx: &Context) -> LowerResult<String> {
        if self.targets.contains(ident) {
            return Ok(ident.to_string());
        }
        let root = ctx.roots().root_name(ident);
        if ctx.roots().contains(&root) {
            return Ok(root);
        }
        if ctx.has_node(ident) {
            return Ok(ident.to_string());
        }
        Err(ExpressionError::UnboundIdentifier {
            name: ident.to_string(),
            offset: span.offset,
        })
    }

    /// `source[index]`: read through the compose producer when possible,
    /// otherwise through a decompose node shared by identical reads.
    fn index(&mut self, source: &str, index: usize, span: Span, ctx: &mut Context) -> LowerResult<String> {
        let source = self.resolve(source, span, ctx)?;
        if let Some(producer) = self.fold_compose(&source, index, ctx) {
            return Ok(producer);
        }

        let key = (source, index);
        if let Some(existing) = self.reads.get(&key) {
            return Ok(existing.clone());
        }
        let name = self.add_node("decompose", None, std::slice::from_ref(&key.0), ctx)?;
        ctx.set_param(&name, INDEX_PARAM, index as i64)?;
        self.reads.insert(key, name.clone());
        Ok(name)
    }

    /// The producer bound on port `index` of a compose node assigned in
    /// this text.
    fn fold_compose(&self, source: &str, index: usize, ctx: &Context) -> Option<String> {
        if !self.targets.contains(source) {
            return None;
        }
        let graph = ctx.graph();
        let id = graph.node_id(source).ok()?;
        if graph.filter_type(id).tag() != "compose" {
            return None;
        }
        let producer = graph.node(id).inputs.get(index)?.as_ref()?;
        Some(graph.source_name(producer).to_string())
    }

    /// Add a `tag` node fed by `inputs` on its ports in declaration order.
    fn add_node(&mut self, tag: &str, target: Option<&str>, inputs: &[String], ctx: &mut Context) -> LowerResult<String> {
        let name = match target {
            Some(name) => name.to_string(),
            None => ctx.unique_name(tag),
        };
        ctx.add_node(tag, &name)?;
        self.created.push(name.clone());

        let ports: Vec<String> = ctx
            .graph()
            .registry()
            .lookup(tag)?
            .ports()
            .iter()
            .map(|p| p.name.to_string())
            .collect();
        for (port, from) in ports.iter().zip(inputs) {
            ctx.connect(from, &format!("{}:{}", name, port))?;
        }
        Ok(name)
    }

    fn rollback(&mut self, ctx: &mut Context) {
        for name in self.created.drain(..).rev() {
            if let Err(e) = ctx.remove_node(&name) {
                tracing::warn!("Failed to roll back node '{}': {}", name, e);
            }
        }
        ctx.compact();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::GraphError;
    use crate::pipeline::registry::FilterRegistry;
    use crate::types::Value;
    use crate::workspace::context::Backend;

    fn context() -> Context {
        let mut ctx = Context::new("main", FilterRegistry::global(), Backend::eager());
        ctx.registry_add(":a", 3.0).unwrap();
        ctx.registry_add(":b", 2.0).unwrap();
        ctx
    }

    #[test]
    fn test_sum_of_squares() {
        let mut ctx = context();
        let created = Generator::new()
            .compile("res = (a + b)^2 + (a - b)^2", &mut ctx)
            .unwrap();
        assert_eq!(created.len(), 7);
        assert_eq!(created.last().map(String::as_str), Some("res"));
        assert_eq!(ctx.execute().unwrap(), Value::Float(26.0));
    }

    #[test]
    fn test_auto_names() {
        let mut ctx = context();
        let created = Generator::new().compile("r = a * 2 + a * 3", &mut ctx).unwrap();
        assert_eq!(created, vec!["const_0", "mult_0", "const_1", "mult_1", "r"]);
        assert_eq!(ctx.graph().filter_type(ctx.graph().node_id("r").unwrap()).tag(), "add");
    }

    #[test]
    fn test_targets_and_identity() {
        let mut ctx = context();
        Generator::new()
            .compile("s = a + b\nt = s\nu = 4\nv = t * u", &mut ctx)
            .unwrap();
        let tag = |name: &str| ctx.graph().filter_type(ctx.graph().node_id(name).unwrap()).tag().to_string();
        assert_eq!(tag("t"), "identity");
        assert_eq!(tag("u"), "const");
        assert_eq!(ctx.execute().unwrap(), Value::Float(20.0));
    }

    #[test]
    fn test_unary_minus_and_calls() {
        let mut ctx = context();
        Generator::new().compile("r = -sqrt(a * 3) + abs(-b)", &mut ctx).unwrap();
        assert_eq!(ctx.execute().unwrap(), Value::Float(-1.0));
    }

    #[test]
    fn test_existing_node_resolves() {
        let mut ctx = context();
        ctx.add_node("const", "k").unwrap();
        ctx.set_param("k", "value", 10.0).unwrap();
        Generator::new().compile("r = k / b", &mut ctx).unwrap();
        assert_eq!(ctx.execute_terminal("r").unwrap(), Value::Float(5.0));
    }

    #[test]
    fn test_index_reads_are_shared() {
        let mut ctx = context();
        ctx.registry_add(":v", vec![1.0, 2.0, 3.0]).unwrap();
        let created = Generator::new()
            .compile("r = v[0] * v[0] + v[2]", &mut ctx)
            .unwrap();
        let decomposes = created.iter().filter(|n| n.starts_with("decompose_")).count();
        assert_eq!(decomposes, 2);
        assert_eq!(ctx.execute().unwrap(), Value::Float(4.0));
    }

    #[test]
    fn test_compose_folding() {
        let mut ctx = context();
        let created = Generator::new()
            .compile("p = compose(a, b)\nr = p[1] - p[0]", &mut ctx)
            .unwrap();
        assert!(created.iter().all(|n| !n.starts_with("decompose_")));
        assert_eq!(ctx.execute_terminal("r").unwrap(), Value::Float(-1.0));
    }

    #[test]
    fn test_unbound_identifier_rolls_back() {
        let mut ctx = context();
        let err = Generator::new()
            .compile("x = a + 1\ny = x * zeta", &mut ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            ExpressionError::UnboundIdentifier { ref name, offset: 18 } if name == "zeta"
        ));
        assert!(ctx.graph().is_empty());
        assert_eq!(ctx.graph().capacity(), 0);
    }

    #[test]
    fn test_repeated_failures_do_not_grow_graph() {
        let mut ctx = context();
        Generator::new().compile("s = a + b", &mut ctx).unwrap();
        for _ in 0..10 {
            assert!(Generator::new().compile("t = s * 2 + zeta", &mut ctx).is_err());
        }
        assert_eq!(ctx.graph().capacity(), 1);
        assert_eq!(ctx.execute_terminal("s").unwrap(), Value::Float(5.0));
    }

    #[test]
    fn test_arity_and_unknown_function() {
        let mut ctx = context();
        let err = Generator::new().compile("r = sqrt(a, b)", &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            ExpressionError::ArityMismatch { expected: 1, got: 2, offset: 4, .. }
        ));
        let err = Generator::new().compile("r = grad(a)", &mut ctx).unwrap_err();
        assert!(matches!(err, ExpressionError::Graph(GraphError::UnknownType(_))));
        assert!(ctx.graph().is_empty());
    }

    #[test]
    fn test_target_clashing_with_root() {
        let mut ctx = context();
        let err = Generator::new().compile("a = b * 2", &mut ctx).unwrap_err();
        assert!(matches!(err, ExpressionError::Graph(GraphError::NameConflict(_))));
    }
}
