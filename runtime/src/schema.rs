//! Operator names and schemas.
//!
//! Only the parts of an operator signature the cache looks at are modelled:
//! the formal argument types (to classify scalars and drive normalization),
//! keyword-only flags (to split compiler arguments) and the return types (to
//! decide cache eligibility).

use std::fmt;
use std::sync::Arc;

/// `namespace::name` operator identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperatorName {
    pub namespace: String,
    pub name: String,
}

impl OperatorName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }

    /// Split a qualified `ns::name`. A bare name gets an empty namespace.
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once("::") {
            Some((namespace, name)) => Self::new(namespace, name),
            None => Self::new("", qualified),
        }
    }
}

impl fmt::Display for OperatorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() { f.write_str(&self.name) } else { write!(f, "{}::{}", self.namespace, self.name) }
    }
}

/// Number-like formal types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NumberType {
    Scalar,
    Int,
    Float,
    Complex,
}

/// Formal argument or return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgType {
    Tensor,
    OptionalTensor,
    TensorList,
    OptionalTensorList,
    Number(NumberType),
    Bool,
    IntList,
    Str,
    /// Any type the cache never inspects (`Device`, `Layout`, ...).
    Other(String),
}

impl ArgType {
    /// Whether a value of this formal type is keyed by its literal.
    ///
    /// `bool` formals count: a bool literal is a number subtype.
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Bool)
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, Self::Tensor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub ty: ArgType,
    pub kwarg_only: bool,
}

impl Argument {
    pub fn new(name: impl Into<String>, ty: ArgType) -> Self {
        Self { name: name.into(), ty, kwarg_only: false }
    }

    pub fn keyword(name: impl Into<String>, ty: ArgType) -> Self {
        Self { kwarg_only: true, ..Self::new(name, ty) }
    }
}

/// Operator signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSchema {
    pub name: OperatorName,
    /// Empty for the default overload.
    pub overload: String,
    pub arguments: Vec<Argument>,
    pub returns: Vec<ArgType>,
}

impl FunctionSchema {
    pub fn new(
        name: OperatorName,
        overload: impl Into<String>,
        arguments: Vec<Argument>,
        returns: Vec<ArgType>,
    ) -> Self {
        Self { name, overload: overload.into(), arguments, returns }
    }

    /// Only operators returning exactly one tensor are served from the cache.
    pub fn returns_single_tensor(&self) -> bool {
        matches!(self.returns.as_slice(), [ret] if ret.is_tensor())
    }

    /// Overload name as handed to the compiler.
    pub fn overload_or_default(&self) -> &str {
        if self.overload.is_empty() { "default" } else { &self.overload }
    }
}

/// Shared handle to a registered operator.
#[derive(Debug, Clone)]
pub struct OperatorHandle(Arc<FunctionSchema>);

impl OperatorHandle {
    pub fn new(schema: FunctionSchema) -> Self {
        Self(Arc::new(schema))
    }

    pub fn schema(&self) -> &FunctionSchema {
        &self.0
    }

    pub fn name(&self) -> &OperatorName {
        &self.0.name
    }
}

impl fmt::Display for OperatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0.name, self.0.overload_or_default())
    }
}
