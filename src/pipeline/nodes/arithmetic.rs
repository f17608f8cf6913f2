//! Arithmetic filters: binary operators and unary math functions.
//!
//! Scalars broadcast against arrays; arrays combine element-wise and must
//! have equal lengths. Composite values recurse into their components.

use crate::pipeline::error::OperationError;
use crate::pipeline::node::FilterInputs;
use crate::pipeline::port::PortDescriptor;
use crate::types::Value;

pub(crate) static BINARY_PORTS: &[PortDescriptor] = &[
    PortDescriptor::required("in_a"),
    PortDescriptor::required("in_b"),
];

pub(crate) static UNARY_PORTS: &[PortDescriptor] = &[PortDescriptor::required("in")];

/// Binary operators reachable from expression syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mult,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn all() -> &'static [BinaryOp] {
        &[
            BinaryOp::Add,
            BinaryOp::Sub,
            BinaryOp::Mult,
            BinaryOp::Div,
            BinaryOp::Pow,
        ]
    }

    /// Registry tag of the filter implementing this operator.
    pub fn tag(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mult => "mult",
            BinaryOp::Div => "div",
            BinaryOp::Pow => "pow",
        }
    }

    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mult => '*',
            BinaryOp::Div => '/',
            BinaryOp::Pow => '^',
        }
    }

    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mult => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
        }
    }
}

/// Unary math functions, callable as `f(x)` in expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Sqrt,
    Abs,
    Sin,
    Cos,
    Exp,
    Log,
}

impl UnaryOp {
    pub fn all() -> &'static [UnaryOp] {
        &[
            UnaryOp::Neg,
            UnaryOp::Sqrt,
            UnaryOp::Abs,
            UnaryOp::Sin,
            UnaryOp::Cos,
            UnaryOp::Exp,
            UnaryOp::Log,
        ]
    }

    pub fn tag(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Abs => "abs",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
        }
    }

    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryOp::Neg => -x,
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::Abs => x.abs(),
            UnaryOp::Sin => x.sin(),
            UnaryOp::Cos => x.cos(),
            UnaryOp::Exp => x.exp(),
            UnaryOp::Log => x.ln(),
        }
    }
}

/// Combine two values element-wise with scalar broadcasting.
pub fn broadcast(
    a: &Value,
    b: &Value,
    symbol: char,
    f: impl Fn(f64, f64) -> f64 + Copy,
) -> Result<Value, OperationError> {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(f(*x, *y))),
        (Value::Float(x), Value::Array(ys)) => Ok(Value::Array(ys.iter().map(|y| f(*x, *y)).collect())),
        (Value::Array(xs), Value::Float(y)) => Ok(Value::Array(xs.iter().map(|x| f(*x, *y)).collect())),
        (Value::Array(xs), Value::Array(ys)) => {
            if xs.len() != ys.len() {
                return Err(OperationError::ShapeMismatch {
                    left: xs.len(),
                    right: ys.len(),
                });
            }
            Ok(Value::Array(xs.iter().zip(ys).map(|(x, y)| f(*x, *y)).collect()))
        }
        (Value::Composite(xs), Value::Composite(ys)) => {
            if xs.len() != ys.len() {
                return Err(OperationError::ShapeMismatch {
                    left: xs.len(),
                    right: ys.len(),
                });
            }
            xs.iter()
                .zip(ys)
                .map(|(x, y)| broadcast(x, y, symbol, f))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Composite)
        }
        (Value::Composite(xs), other) => xs
            .iter()
            .map(|x| broadcast(x, other, symbol, f))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Composite),
        (other, Value::Composite(ys)) => ys
            .iter()
            .map(|y| broadcast(other, y, symbol, f))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Composite),
        _ => Err(OperationError::UnsupportedOperand(format!(
            "{} {} {}",
            a.kind_name(),
            symbol,
            b.kind_name()
        ))),
    }
}

/// Apply a scalar function to every number inside a value.
pub fn map_value(v: &Value, name: &str, f: impl Fn(f64) -> f64 + Copy) -> Result<Value, OperationError> {
    match v {
        Value::Float(x) => Ok(Value::Float(f(*x))),
        Value::Array(xs) => Ok(Value::Array(xs.iter().map(|x| f(*x)).collect())),
        Value::Composite(xs) => xs
            .iter()
            .map(|x| map_value(x, name, f))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Composite),
        other => Err(OperationError::UnsupportedOperand(format!(
            "{}({})",
            name,
            other.kind_name()
        ))),
    }
}

fn emitted_input<'a>(inputs: &'a [Option<String>], index: usize, port: &'static str) -> Result<&'a str, OperationError> {
    inputs
        .get(index)
        .and_then(|v| v.as_deref())
        .ok_or(OperationError::MissingInput(port))
}

/// Binary arithmetic filter (`add`, `sub`, `mult`, `div`, `pow`).
#[derive(Debug, Clone)]
pub struct BinaryFilter {
    op: BinaryOp,
}

impl BinaryFilter {
    pub fn new(op: BinaryOp) -> Self {
        Self { op }
    }

    pub fn op(&self) -> BinaryOp {
        self.op
    }

    pub fn name(&self) -> &str {
        self.op.tag()
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        BINARY_PORTS
    }

    pub fn execute(&self, inputs: &FilterInputs) -> Result<Value, OperationError> {
        let a = inputs.require(0, "in_a")?;
        let b = inputs.require(1, "in_b")?;
        let op = self.op;
        broadcast(a, b, op.symbol(), move |x, y| op.apply(x, y))
    }

    pub fn emit(&self, inputs: &[Option<String>]) -> Result<String, OperationError> {
        let a = emitted_input(inputs, 0, "in_a")?;
        let b = emitted_input(inputs, 1, "in_b")?;
        Ok(format!("fg_{}({}, {})", self.op.tag(), a, b))
    }
}

/// Unary math filter (`neg`, `sqrt`, `abs`, ...).
#[derive(Debug, Clone)]
pub struct UnaryFilter {
    op: UnaryOp,
}

impl UnaryFilter {
    pub fn new(op: UnaryOp) -> Self {
        Self { op }
    }

    pub fn name(&self) -> &str {
        self.op.tag()
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        UNARY_PORTS
    }

    pub fn execute(&self, inputs: &FilterInputs) -> Result<Value, OperationError> {
        let x = inputs.require(0, "in")?;
        let op = self.op;
        map_value(x, op.tag(), move |v| op.apply(v))
    }

    pub fn emit(&self, inputs: &[Option<String>]) -> Result<String, OperationError> {
        let x = emitted_input(inputs, 0, "in")?;
        Ok(format!("fg_{}({})", self.op.tag(), x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(values: Vec<Value>) -> FilterInputs {
        FilterInputs::new(values.into_iter().map(Some).collect())
    }

    #[test]
    fn test_scalar_ops() {
        let add = BinaryFilter::new(BinaryOp::Add);
        let pow = BinaryFilter::new(BinaryOp::Pow);
        assert_eq!(
            add.execute(&inputs(vec![2.0.into(), 3.0.into()])).unwrap(),
            Value::Float(5.0)
        );
        assert_eq!(
            pow.execute(&inputs(vec![3.0.into(), 2.0.into()])).unwrap(),
            Value::Float(9.0)
        );
    }

    #[test]
    fn test_broadcast_scalar_over_array() {
        let mult = BinaryFilter::new(BinaryOp::Mult);
        let out = mult
            .execute(&inputs(vec![Value::Array(vec![1.0, 2.0, 3.0]), 2.0.into()]))
            .unwrap();
        assert_eq!(out, Value::Array(vec![2.0, 4.0, 6.0]));
    }

    #[test]
    fn test_array_length_mismatch() {
        let sub = BinaryFilter::new(BinaryOp::Sub);
        let err = sub
            .execute(&inputs(vec![Value::Array(vec![1.0]), Value::Array(vec![1.0, 2.0])]))
            .unwrap_err();
        assert_eq!(err, OperationError::ShapeMismatch { left: 1, right: 2 });
    }

    #[test]
    fn test_text_operand_rejected() {
        let add = BinaryFilter::new(BinaryOp::Add);
        let err = add
            .execute(&inputs(vec![Value::Text("x".into()), 1.0.into()]))
            .unwrap_err();
        assert!(matches!(err, OperationError::UnsupportedOperand(_)));
    }

    #[test]
    fn test_missing_input() {
        let div = BinaryFilter::new(BinaryOp::Div);
        let err = div
            .execute(&FilterInputs::new(vec![Some(1.0.into()), None]))
            .unwrap_err();
        assert_eq!(err, OperationError::MissingInput("in_b"));
    }

    #[test]
    fn test_unary_over_composite() {
        let sqrt = UnaryFilter::new(UnaryOp::Sqrt);
        let out = sqrt
            .execute(&inputs(vec![Value::Composite(vec![
                Value::Float(4.0),
                Value::Array(vec![9.0, 16.0]),
            ])]))
            .unwrap();
        assert_eq!(
            out,
            Value::Composite(vec![Value::Float(2.0), Value::Array(vec![3.0, 4.0])])
        );
    }

    #[test]
    fn test_emit() {
        let add = BinaryFilter::new(BinaryOp::Add);
        assert_eq!(
            add.emit(&[Some("r_a".into()), Some("r_b".into())]).unwrap(),
            "fg_add(r_a, r_b)"
        );
        let neg = UnaryFilter::new(UnaryOp::Neg);
        assert_eq!(neg.emit(&[Some("v_x".into())]).unwrap(), "fg_neg(v_x)");
        assert!(neg.emit(&[None]).is_err());
    }
}
