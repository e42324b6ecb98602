//! Parsing and lowering into the validator's syntax tree.
//!
//! Uses `oxc_parser` to parse a script and lowers the resulting AST into
//! [`Node`]. Scripts are parsed as classic (non-module) ECMAScript with
//! parentheses dropped from the tree, so `(a.b)(c)` has the same shape as
//! `a.b(c)`. Any syntax error fails the whole parse; a partial tree is never
//! judged.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::{ParseOptions, Parser};
use oxc_span::{GetSpan, SourceType};

use crate::ast::{FunctionKind, Identifier, LoopKind, Node, Param, PropertyKind, Span};
pub use crate::scan::check_nesting_depth;

/// Default cap on nesting, checked before parsing and again while lowering.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 256;

/// Default cap on script size in bytes.
pub const DEFAULT_MAX_SCRIPT_BYTES: usize = 64 * 1024;

/// Why a script could not be turned into a [`Node`] tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseFailure {
    /// The parser rejected the source.
    Syntax(String),
    /// The source is larger than the configured maximum.
    TooLarge {
        /// Maximum allowed size in bytes.
        max: usize,
        /// Actual size in bytes.
        actual: usize,
    },
    /// Nesting exceeds the configured maximum.
    NestingTooDeep {
        /// Maximum allowed nesting depth.
        max: usize,
        /// Actual detected nesting depth.
        actual: usize,
    },
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(msg) => write!(f, "parse error: {msg}"),
            Self::TooLarge { max, actual } => {
                write!(f, "script of {actual} bytes exceeds maximum {max}")
            }
            Self::NestingTooDeep { max, actual } => {
                write!(f, "nesting depth {actual} exceeds maximum {max}")
            }
        }
    }
}

/// Limits applied before a script reaches the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Largest accepted script, in bytes.
    pub max_script_bytes: usize,
    /// Deepest accepted nesting of brackets, prefix operators and
    /// syntax tree levels.
    pub max_nesting_depth: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_script_bytes: DEFAULT_MAX_SCRIPT_BYTES,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

/// Parse `source` and lower it into a [`Node::Program`].
///
/// The nesting limit is checked twice: lexically before parsing, and on the
/// tree while lowering, which catches long left-associative chains the
/// lexical estimate leaves flat.
pub fn parse_program(source: &str, limits: ParseLimits) -> Result<Node, ParseFailure> {
    if source.len() > limits.max_script_bytes {
        return Err(ParseFailure::TooLarge {
            max: limits.max_script_bytes,
            actual: source.len(),
        });
    }
    check_nesting_depth(source, limits.max_nesting_depth)?;

    let allocator = Allocator::default();
    let options = ParseOptions {
        preserve_parens: false,
        ..ParseOptions::default()
    };
    let ret = Parser::new(&allocator, source, SourceType::cjs())
        .with_options(options)
        .parse();

    if ret.panicked {
        return Err(ParseFailure::Syntax(
            "parser panicked on malformed input".into(),
        ));
    }
    if let Some(error) = ret.errors.first() {
        return Err(ParseFailure::Syntax(error.to_string()));
    }

    Lowerer::new(limits.max_nesting_depth).program(&ret.program)
}

/// Lowers oxc nodes into [`Node`]s, failing once statements and
/// expressions nest deeper than `max`.
struct Lowerer {
    depth: usize,
    max: usize,
}

type Lowered = Result<Node, ParseFailure>;

impl Lowerer {
    fn new(max: usize) -> Self {
        Self { depth: 0, max }
    }

    fn nested(&mut self, lower: impl FnOnce(&mut Self) -> Lowered) -> Lowered {
        self.depth += 1;
        if self.depth > self.max {
            return Err(ParseFailure::NestingTooDeep {
                max: self.max,
                actual: self.depth,
            });
        }
        let node = lower(self);
        self.depth -= 1;
        node
    }

    fn program(&mut self, program: &Program<'_>) -> Lowered {
        // A leading string statement is a directive to the parser; it is still
        // a statement of the program.
        let mut body: Vec<Node> = program
            .directives
            .iter()
            .map(|directive| Node::ExpressionStatement {
                span: directive.span.into(),
                expression: Box::new(Node::Literal {
                    span: directive.expression.span.into(),
                }),
            })
            .collect();
        for stmt in &program.body {
            body.push(self.statement(stmt)?);
        }
        Ok(Node::Program {
            span: program.span.into(),
            body,
        })
    }

    fn statements(&mut self, stmts: &[Statement<'_>]) -> Result<Vec<Node>, ParseFailure> {
        stmts.iter().map(|stmt| self.statement(stmt)).collect()
    }

    fn statement(&mut self, stmt: &Statement<'_>) -> Lowered {
        self.nested(|this| this.statement_inner(stmt))
    }

    fn statement_inner(&mut self, stmt: &Statement<'_>) -> Lowered {
        let span = Span::from(stmt.span());
        Ok(match stmt {
            Statement::ExpressionStatement(es) => Node::ExpressionStatement {
                span,
                expression: Box::new(self.expression(&es.expression)?),
            },
            Statement::BlockStatement(block) => Node::Block {
                span,
                directives: false,
                body: self.statements(&block.body)?,
            },
            Statement::ReturnStatement(ret) => Node::Return {
                span,
                argument: match &ret.argument {
                    Some(arg) => Some(Box::new(self.expression(arg)?)),
                    None => None,
                },
            },
            Statement::IfStatement(_) => Node::If { span },
            Statement::ForStatement(_) => Node::Loop {
                span,
                kind: LoopKind::For,
            },
            Statement::ForInStatement(_) => Node::Loop {
                span,
                kind: LoopKind::ForIn,
            },
            Statement::ForOfStatement(_) => Node::Loop {
                span,
                kind: LoopKind::ForOf,
            },
            Statement::WhileStatement(_) => Node::Loop {
                span,
                kind: LoopKind::While,
            },
            Statement::DoWhileStatement(_) => Node::Loop {
                span,
                kind: LoopKind::DoWhile,
            },
            Statement::VariableDeclaration(_) => Node::VariableDeclaration { span },
            Statement::FunctionDeclaration(_) => Node::FunctionDeclaration { span },
            other => Node::Unsupported {
                kind: statement_kind(other),
                span,
            },
        })
    }

    fn expression(&mut self, expr: &Expression<'_>) -> Lowered {
        self.nested(|this| this.expression_inner(expr))
    }

    fn boxed(&mut self, expr: &Expression<'_>) -> Result<Box<Node>, ParseFailure> {
        self.expression(expr).map(Box::new)
    }

    fn expression_inner(&mut self, expr: &Expression<'_>) -> Lowered {
        let span = Span::from(expr.span());
        Ok(match expr {
            Expression::BooleanLiteral(_)
            | Expression::NullLiteral(_)
            | Expression::NumericLiteral(_)
            | Expression::BigIntLiteral(_)
            | Expression::RegExpLiteral(_)
            | Expression::StringLiteral(_) => Node::Literal { span },
            Expression::Identifier(ident) => Node::Identifier(Identifier {
                name: ident.name.to_string(),
                span,
            }),
            Expression::ArrayExpression(array) => Node::Array {
                span,
                elements: array
                    .elements
                    .iter()
                    .map(|element| self.array_element(element))
                    .collect::<Result<_, _>>()?,
            },
            Expression::ObjectExpression(object) => Node::Object {
                span,
                properties: object
                    .properties
                    .iter()
                    .map(|prop| self.property(prop))
                    .collect::<Result<_, _>>()?,
            },
            Expression::StaticMemberExpression(member) => self.static_member(member)?,
            Expression::ComputedMemberExpression(member) => self.computed_member(member)?,
            Expression::CallExpression(call) => self.call(call)?,
            Expression::NewExpression(new_expr) => Node::New {
                span,
                callee: self.boxed(&new_expr.callee)?,
                arguments: self.arguments(&new_expr.arguments)?,
            },
            Expression::UnaryExpression(unary) => Node::Unary {
                span,
                operator: unary.operator.as_str(),
                argument: self.boxed(&unary.argument)?,
            },
            Expression::BinaryExpression(bin) => Node::Binary {
                span,
                operator: bin.operator.as_str(),
                left: self.boxed(&bin.left)?,
                right: self.boxed(&bin.right)?,
            },
            Expression::LogicalExpression(log) => Node::Logical {
                span,
                operator: log.operator.as_str(),
                left: self.boxed(&log.left)?,
                right: self.boxed(&log.right)?,
            },
            Expression::ConditionalExpression(cond) => Node::Conditional {
                span,
                test: self.boxed(&cond.test)?,
                consequent: self.boxed(&cond.consequent)?,
                alternate: self.boxed(&cond.alternate)?,
            },
            Expression::FunctionExpression(func) => Node::Function {
                span,
                kind: FunctionKind::Expression,
                params: lower_params(&func.params),
                body: Box::new(match &func.body {
                    Some(body) => self.body(body)?,
                    None => Node::Block {
                        span,
                        directives: false,
                        body: Vec::new(),
                    },
                }),
            },
            Expression::ArrowFunctionExpression(arrow) => Node::Function {
                span,
                kind: FunctionKind::Arrow,
                params: lower_params(&arrow.params),
                body: Box::new(self.arrow_body(arrow)?),
            },
            Expression::ChainExpression(chain) => Node::Chain {
                span,
                expression: Box::new(self.chain_element(&chain.expression)?),
            },
            // Only produced when parentheses are preserved; lowered away.
            Expression::ParenthesizedExpression(paren) => {
                return self.expression_inner(&paren.expression)
            }
            Expression::AssignmentExpression(_) => Node::Assignment { span },
            Expression::UpdateExpression(_) => Node::Update { span },
            other => Node::Unsupported {
                kind: expression_kind(other),
                span,
            },
        })
    }

    fn static_member(&mut self, member: &StaticMemberExpression<'_>) -> Lowered {
        Ok(Node::Member {
            span: member.span.into(),
            object: self.boxed(&member.object)?,
            property: Box::new(Node::Identifier(Identifier {
                name: member.property.name.to_string(),
                span: member.property.span.into(),
            })),
            computed: false,
        })
    }

    fn computed_member(&mut self, member: &ComputedMemberExpression<'_>) -> Lowered {
        Ok(Node::Member {
            span: member.span.into(),
            object: self.boxed(&member.object)?,
            property: self.boxed(&member.expression)?,
            computed: true,
        })
    }

    fn call(&mut self, call: &CallExpression<'_>) -> Lowered {
        Ok(Node::Call {
            span: call.span.into(),
            callee: self.boxed(&call.callee)?,
            arguments: self.arguments(&call.arguments)?,
        })
    }

    fn chain_element(&mut self, element: &ChainElement<'_>) -> Lowered {
        match element {
            ChainElement::CallExpression(call) => self.call(call),
            ChainElement::StaticMemberExpression(member) => self.static_member(member),
            ChainElement::ComputedMemberExpression(member) => self.computed_member(member),
            ChainElement::PrivateFieldExpression(field) => Ok(Node::Unsupported {
                kind: "PrivateFieldExpression",
                span: field.span.into(),
            }),
            other => Ok(Node::Unsupported {
                kind: "TSNonNullExpression",
                span: other.span().into(),
            }),
        }
    }

    fn arguments(&mut self, args: &[Argument<'_>]) -> Result<Vec<Node>, ParseFailure> {
        args.iter().map(|arg| self.argument(arg)).collect()
    }

    fn argument(&mut self, arg: &Argument<'_>) -> Lowered {
        match arg {
            Argument::SpreadElement(spread) => Ok(Node::Unsupported {
                kind: "SpreadElement",
                span: spread.span.into(),
            }),
            _ => match arg.as_expression() {
                Some(expr) => self.expression(expr),
                None => Ok(Node::Unsupported {
                    kind: "Argument",
                    span: arg.span().into(),
                }),
            },
        }
    }

    fn array_element(&mut self, element: &ArrayExpressionElement<'_>) -> Lowered {
        match element {
            ArrayExpressionElement::SpreadElement(spread) => Ok(Node::Unsupported {
                kind: "SpreadElement",
                span: spread.span.into(),
            }),
            ArrayExpressionElement::Elision(hole) => Ok(Node::Unsupported {
                kind: "Elision",
                span: hole.span.into(),
            }),
            _ => match element.as_expression() {
                Some(expr) => self.expression(expr),
                None => Ok(Node::Unsupported {
                    kind: "ArrayElement",
                    span: element.span().into(),
                }),
            },
        }
    }

    fn property(&mut self, prop: &ObjectPropertyKind<'_>) -> Lowered {
        match prop {
            ObjectPropertyKind::ObjectProperty(p) => Ok(Node::Property {
                span: p.span.into(),
                kind: match p.kind {
                    oxc_ast::ast::PropertyKind::Init => PropertyKind::Init,
                    oxc_ast::ast::PropertyKind::Get => PropertyKind::Get,
                    oxc_ast::ast::PropertyKind::Set => PropertyKind::Set,
                },
                method: p.method,
                key: Box::new(self.property_key(&p.key)?),
                value: self.boxed(&p.value)?,
            }),
            ObjectPropertyKind::SpreadProperty(spread) => Ok(Node::Unsupported {
                kind: "SpreadElement",
                span: spread.span.into(),
            }),
        }
    }

    fn property_key(&mut self, key: &PropertyKey<'_>) -> Lowered {
        match key {
            // `{ name: v }` keys are judged like any identifier.
            PropertyKey::StaticIdentifier(ident) => Ok(Node::Identifier(Identifier {
                name: ident.name.to_string(),
                span: ident.span.into(),
            })),
            PropertyKey::PrivateIdentifier(ident) => Ok(Node::Unsupported {
                kind: "PrivateIdentifier",
                span: ident.span.into(),
            }),
            _ => match key.as_expression() {
                Some(expr) => self.expression(expr),
                None => Ok(Node::Unsupported {
                    kind: "PropertyKey",
                    span: key.span().into(),
                }),
            },
        }
    }

    fn body(&mut self, body: &FunctionBody<'_>) -> Lowered {
        Ok(Node::Block {
            span: body.span.into(),
            directives: !body.directives.is_empty(),
            body: self.statements(&body.statements)?,
        })
    }

    /// A concise arrow body (`x => x + 1`) lowers to its bare expression.
    fn arrow_body(&mut self, arrow: &ArrowFunctionExpression<'_>) -> Lowered {
        if arrow.expression {
            if let Some(Statement::ExpressionStatement(es)) = arrow.body.statements.first() {
                return self.expression(&es.expression);
            }
        }
        self.body(&arrow.body)
    }
}

fn lower_params(params: &FormalParameters<'_>) -> Vec<Param> {
    let mut lowered: Vec<Param> = params
        .items
        .iter()
        .map(|param| match &param.pattern.kind {
            BindingPatternKind::BindingIdentifier(ident) => Param::Name(Identifier {
                name: ident.name.to_string(),
                span: ident.span.into(),
            }),
            BindingPatternKind::ObjectPattern(_) => Param::Pattern {
                kind: "ObjectPattern",
                span: param.span.into(),
            },
            BindingPatternKind::ArrayPattern(_) => Param::Pattern {
                kind: "ArrayPattern",
                span: param.span.into(),
            },
            BindingPatternKind::AssignmentPattern(_) => Param::Pattern {
                kind: "AssignmentPattern",
                span: param.span.into(),
            },
        })
        .collect();
    if let Some(rest) = &params.rest {
        lowered.push(Param::Pattern {
            kind: "RestElement",
            span: rest.span.into(),
        });
    }
    lowered
}

fn statement_kind(stmt: &Statement<'_>) -> &'static str {
    match stmt {
        Statement::BreakStatement(_) => "BreakStatement",
        Statement::ContinueStatement(_) => "ContinueStatement",
        Statement::DebuggerStatement(_) => "DebuggerStatement",
        Statement::EmptyStatement(_) => "EmptyStatement",
        Statement::LabeledStatement(_) => "LabeledStatement",
        Statement::SwitchStatement(_) => "SwitchStatement",
        Statement::ThrowStatement(_) => "ThrowStatement",
        Statement::TryStatement(_) => "TryStatement",
        Statement::WithStatement(_) => "WithStatement",
        Statement::ClassDeclaration(_) => "ClassDeclaration",
        Statement::ImportDeclaration(_) => "ImportDeclaration",
        Statement::ExportAllDeclaration(_) => "ExportAllDeclaration",
        Statement::ExportDefaultDeclaration(_) => "ExportDefaultDeclaration",
        Statement::ExportNamedDeclaration(_) => "ExportNamedDeclaration",
        _ => "Statement",
    }
}

fn expression_kind(expr: &Expression<'_>) -> &'static str {
    match expr {
        Expression::TemplateLiteral(_) => "TemplateLiteral",
        Expression::TaggedTemplateExpression(_) => "TaggedTemplateExpression",
        Expression::SequenceExpression(_) => "SequenceExpression",
        Expression::ThisExpression(_) => "ThisExpression",
        Expression::Super(_) => "Super",
        Expression::MetaProperty(_) => "MetaProperty",
        Expression::AwaitExpression(_) => "AwaitExpression",
        Expression::YieldExpression(_) => "YieldExpression",
        Expression::ClassExpression(_) => "ClassExpression",
        Expression::ImportExpression(_) => "ImportExpression",
        Expression::PrivateFieldExpression(_) => "PrivateFieldExpression",
        Expression::PrivateInExpression(_) => "PrivateInExpression",
        _ => "Expression",
    }
}
