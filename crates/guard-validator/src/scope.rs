//! Names in scope for a sub-tree.
//!
//! A script may only refer to the always-allowed identifiers and to the
//! parameters of the function expressions that enclose the reference.
//! Entering a function expression adds its parameters on top of everything
//! already in scope; nothing is ever shadowed or removed. Each [`Scope`]
//! borrows its parent, so extending never touches the outer chain and
//! sibling sub-trees cannot see each other's parameters.

use crate::ast::Param;
use crate::policy;

/// A persistent chain of parameter frames.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    params: &'a [Param],
    parent: Option<&'a Scope<'a>>,
}

impl Default for Scope<'_> {
    fn default() -> Self {
        Self::root()
    }
}

impl<'a> Scope<'a> {
    /// The top-level scope: only the always-allowed identifiers.
    pub const fn root() -> Self {
        Scope {
            params: &[],
            parent: None,
        }
    }

    /// A scope holding everything in `self` plus the names bound by `params`.
    pub fn extend<'s>(&'s self, params: &'s [Param]) -> Scope<'s> {
        Scope {
            params,
            parent: Some(self),
        }
    }

    /// Whether `name` may be referenced as a bare identifier.
    pub fn is_bound(&self, name: &str) -> bool {
        policy::is_allowed_identifier(name) || self.binds_parameter(name)
    }

    /// Whether `name` is a parameter of any enclosing function expression.
    pub fn binds_parameter(&self, name: &str) -> bool {
        self.frames()
            .flat_map(|frame| frame.params.iter())
            .any(|param| matches!(param, Param::Name(ident) if ident.name == name))
    }

    fn frames(&self) -> impl Iterator<Item = &Scope<'a>> + '_ {
        std::iter::successors(Some(self), |scope| scope.parent)
    }
}
