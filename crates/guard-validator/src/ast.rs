//! The closed syntax tree the validator judges.
//!
//! The parser's tree is lowered into [`Node`] before validation (see
//! [`crate::parse`]). Productions the validator has a rule for get their own
//! variant; everything else becomes [`Node::Unsupported`] carrying its ESTree
//! kind name, so no construct can reach the validator unclassified.

use serde::{Deserialize, Serialize};

/// Byte-offset range `[start, end)` into the original source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start offset.
    pub start: u32,
    /// Exclusive end offset.
    pub end: u32,
}

impl Span {
    /// Create a span.
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A span covering the whole of `source`.
    pub fn whole(source: &str) -> Self {
        Self::new(0, u32::try_from(source.len()).unwrap_or(u32::MAX))
    }
}

impl From<oxc_span::Span> for Span {
    fn from(span: oxc_span::Span) -> Self {
        Self::new(span.start, span.end)
    }
}

/// A bare name together with where it appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    /// The name as written.
    pub name: String,
    /// Where it appears.
    pub span: Span,
}

/// How a function expression was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// `function (a) { ... }`
    Expression,
    /// `(a) => ...`
    Arrow,
}

/// A formal parameter of a function expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A plain binding such as `x`.
    Name(Identifier),
    /// A destructuring, defaulted or rest parameter.
    Pattern {
        /// ESTree kind of the pattern, e.g. `ObjectPattern`.
        kind: &'static str,
        /// Source range of the whole parameter.
        span: Span,
    },
}

/// The kind of an object literal property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// `key: value`
    Init,
    /// `get key() {}`
    Get,
    /// `set key(v) {}`
    Set,
}

/// Loop statement flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum LoopKind {
    For,
    ForIn,
    ForOf,
    While,
    DoWhile,
}

impl LoopKind {
    /// ESTree node kind.
    pub fn kind(self) -> &'static str {
        match self {
            Self::For => "ForStatement",
            Self::ForIn => "ForInStatement",
            Self::ForOf => "ForOfStatement",
            Self::While => "WhileStatement",
            Self::DoWhile => "DoWhileStatement",
        }
    }
}

/// A syntax tree node.
///
/// Every variant carries its source [`Span`]; child fields are named after
/// their ESTree counterparts.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Node {
    /// The top-level statement list.
    Program {
        span: Span,
        body: Vec<Node>,
    },
    /// A statement block, including function bodies.
    Block {
        span: Span,
        /// Whether the block opened with a directive prologue (`"use strict"`).
        directives: bool,
        body: Vec<Node>,
    },
    /// An expression used as a statement.
    ExpressionStatement {
        span: Span,
        expression: Box<Node>,
    },
    /// Optional chaining wrapper around `a?.b` / `a?.b()`.
    Chain {
        span: Span,
        expression: Box<Node>,
    },
    /// A bare name.
    Identifier(Identifier),
    /// Number, string, boolean, null, bigint or regex literal.
    Literal {
        span: Span,
    },
    /// `[a, b]`.
    Array {
        span: Span,
        elements: Vec<Node>,
    },
    /// `{ key: value }`.
    Object {
        span: Span,
        properties: Vec<Node>,
    },
    /// One entry of an object literal.
    Property {
        span: Span,
        kind: PropertyKind,
        /// Written in method shorthand, `{ f() {} }`.
        method: bool,
        key: Box<Node>,
        value: Box<Node>,
    },
    /// `object.property` or, when `computed`, `object[property]`.
    Member {
        span: Span,
        object: Box<Node>,
        property: Box<Node>,
        computed: bool,
    },
    /// `callee(arguments)`.
    Call {
        span: Span,
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    /// `new callee(arguments)`.
    New {
        span: Span,
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    /// Prefix operator such as `!a` or `typeof a`.
    Unary {
        span: Span,
        operator: &'static str,
        argument: Box<Node>,
    },
    /// Arithmetic, comparison, `in` and `instanceof`.
    Binary {
        span: Span,
        operator: &'static str,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `&&`, `||` and `??`.
    Logical {
        span: Span,
        operator: &'static str,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `test ? consequent : alternate`.
    Conditional {
        span: Span,
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    /// A function or arrow function expression.
    Function {
        span: Span,
        kind: FunctionKind,
        params: Vec<Param>,
        /// A [`Node::Block`], or the bare expression of a concise arrow body.
        body: Box<Node>,
    },
    /// `return` inside a function body.
    Return {
        span: Span,
        argument: Option<Box<Node>>,
    },
    /// An `if` statement.
    If {
        span: Span,
    },
    /// Any loop statement.
    Loop {
        span: Span,
        kind: LoopKind,
    },
    /// `var`, `let` or `const`.
    VariableDeclaration {
        span: Span,
    },
    /// `++` or `--`.
    Update {
        span: Span,
    },
    /// `function name() {}` in statement position.
    FunctionDeclaration {
        span: Span,
    },
    /// `=` and the compound assignment operators.
    Assignment {
        span: Span,
    },
    /// Any production without a dedicated rule.
    Unsupported {
        kind: &'static str,
        span: Span,
    },
}

impl Node {
    /// Source range of this node.
    pub fn span(&self) -> Span {
        match self {
            Node::Identifier(ident) => ident.span,
            Node::Program { span, .. }
            | Node::Block { span, .. }
            | Node::ExpressionStatement { span, .. }
            | Node::Chain { span, .. }
            | Node::Literal { span }
            | Node::Array { span, .. }
            | Node::Object { span, .. }
            | Node::Property { span, .. }
            | Node::Member { span, .. }
            | Node::Call { span, .. }
            | Node::New { span, .. }
            | Node::Unary { span, .. }
            | Node::Binary { span, .. }
            | Node::Logical { span, .. }
            | Node::Conditional { span, .. }
            | Node::Function { span, .. }
            | Node::Return { span, .. }
            | Node::If { span }
            | Node::Loop { span, .. }
            | Node::VariableDeclaration { span }
            | Node::Update { span }
            | Node::FunctionDeclaration { span }
            | Node::Assignment { span }
            | Node::Unsupported { span, .. } => *span,
        }
    }

    /// ESTree kind name, as used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Program { .. } => "Program",
            Node::Block { .. } => "BlockStatement",
            Node::ExpressionStatement { .. } => "ExpressionStatement",
            Node::Chain { .. } => "ChainExpression",
            Node::Identifier(_) => "Identifier",
            Node::Literal { .. } => "Literal",
            Node::Array { .. } => "ArrayExpression",
            Node::Object { .. } => "ObjectExpression",
            Node::Property { .. } => "Property",
            Node::Member { .. } => "MemberExpression",
            Node::Call { .. } => "CallExpression",
            Node::New { .. } => "NewExpression",
            Node::Unary { .. } => "UnaryExpression",
            Node::Binary { .. } => "BinaryExpression",
            Node::Logical { .. } => "LogicalExpression",
            Node::Conditional { .. } => "ConditionalExpression",
            Node::Function {
                kind: FunctionKind::Expression,
                ..
            } => "FunctionExpression",
            Node::Function {
                kind: FunctionKind::Arrow,
                ..
            } => "ArrowFunctionExpression",
            Node::Return { .. } => "ReturnStatement",
            Node::If { .. } => "IfStatement",
            Node::Loop { kind, .. } => kind.kind(),
            Node::VariableDeclaration { .. } => "VariableDeclaration",
            Node::Update { .. } => "UpdateExpression",
            Node::FunctionDeclaration { .. } => "FunctionDeclaration",
            Node::Assignment { .. } => "AssignmentExpression",
            Node::Unsupported { kind, .. } => kind,
        }
    }

    /// The identifier, if this node is a bare identifier.
    pub fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Node::Identifier(ident) => Some(ident),
            _ => None,
        }
    }
}
