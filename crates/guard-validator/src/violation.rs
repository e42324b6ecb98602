//! Located safety defects.

use serde::{Deserialize, Serialize};

use crate::ast::Span;
use crate::policy::Namespace;

/// One reported safety defect, located by source byte offsets.
///
/// Serializes as `{ "message": ..., "start": ..., "end": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    /// Human-readable description.
    pub message: String,
    /// Inclusive start offset of the offending node.
    pub start: u32,
    /// Exclusive end offset of the offending node.
    pub end: u32,
}

impl Violation {
    /// Create a violation for `reason` spanning `span`.
    pub fn new(reason: Reason<'_>, span: Span) -> Self {
        Self {
            message: reason.to_string(),
            start: span.start,
            end: span.end,
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.start, self.end)
    }
}

/// Why a construct was rejected.
///
/// The rendered text is the wire-visible `message` and is kept stable for
/// consumers that match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Reason<'a> {
    /// The source could not be parsed, or exceeded the configured limits.
    Unparseable,
    /// The program is not exactly one expression statement.
    NotSingleExpression,
    /// A function body opened with a directive prologue.
    Directives,
    /// No rule exists for this node kind.
    UnidentifiedNode(&'a str),
    /// A bare identifier that is neither always-allowed nor a parameter.
    NotDefined(&'a str),
    /// A getter, setter or method shorthand inside an object literal.
    NonInitProperty,
    /// `fn(...)` with a bare identifier callee.
    GlobalCall,
    /// A call whose callee is neither an identifier nor a member expression.
    NonMethodCall,
    /// `object[expression]`.
    ComputedMember,
    /// `Identifier.Identifier` that matched nothing.
    UnidentifiedMember {
        /// Object name.
        object: &'a str,
        /// Property name.
        property: &'a str,
    },
    /// `expression.property` that matched nothing.
    UnidentifiedMemberProperty,
    /// `value.method(...)` with a method outside the instance whitelist.
    UnidentifiedInstanceMethod(&'a str),
    /// `Namespace.property` outside the namespace's static properties.
    UnidentifiedStaticProperty {
        /// Namespace the property was looked up on.
        namespace: Namespace,
        /// Property name.
        property: &'a str,
    },
    /// `Namespace.method(...)` outside the namespace's static methods.
    UnidentifiedStaticMethod {
        /// Namespace the method was looked up on.
        namespace: Namespace,
        /// Method name.
        method: &'a str,
    },
    /// A unary operator outside the whitelist.
    UnaryOperator(&'a str),
    /// `new` on anything but a constructible built-in.
    New,
    /// An `if` statement.
    If,
    /// Any `for`, `while` or `do` loop.
    Loop,
    /// `var`, `let` or `const`.
    VariableDeclaration,
    /// `++` or `--`.
    Update,
    /// A named function declaration.
    FunctionDeclaration,
    /// Any assignment operator.
    Assignment,
}

impl std::fmt::Display for Reason<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unparseable => f.write_str("Fatal error - could not parse"),
            Self::NotSingleExpression => {
                f.write_str("This script must be a single ExpressionStatement")
            }
            Self::Directives => f.write_str("directives are not allowed"),
            Self::UnidentifiedNode(kind) => write!(f, "Unidentified node: {kind}"),
            Self::NotDefined(name) => write!(f, "{name} is not defined"),
            Self::NonInitProperty => f.write_str("only init properties are allowed within object"),
            Self::GlobalCall => f.write_str("global methods are not permitted"),
            Self::NonMethodCall => {
                f.write_str("functions are meant to be only invoked as instance methods")
            }
            Self::ComputedMember => f.write_str("Computed member expressions are not allowed"),
            Self::UnidentifiedMember { object, property } => {
                write!(f, "unIdentified: {object}.{property}")
            }
            Self::UnidentifiedMemberProperty => f.write_str("unIdentified member property"),
            Self::UnidentifiedInstanceMethod(name) => {
                write!(f, "Unidentified instance method: {name}")
            }
            Self::UnidentifiedStaticProperty {
                namespace,
                property,
            } => write!(f, "Unidentified propery name for {namespace}: {property}"),
            Self::UnidentifiedStaticMethod { namespace, method } => {
                write!(f, "Unidentified method name for {namespace}: {method}")
            }
            Self::UnaryOperator(op) => write!(f, "{op} operator is not allowed"),
            Self::New => f.write_str("New expressions are not allowed"),
            Self::If => f.write_str("If statements are not allowed"),
            Self::Loop => f.write_str("Loops are not allowed"),
            Self::VariableDeclaration => f.write_str("Variable Declarations are not allowed"),
            Self::Update => f.write_str("Update Expressions are not allowed"),
            Self::FunctionDeclaration => f.write_str("Function Declarations are not allowed"),
            Self::Assignment => f.write_str("Assignments are not allowed"),
        }
    }
}
