//! Safety validator for survey expression scripts.
//!
//! A script is admitted only if it is a single expression statement whose
//! every node is on the whitelist in [`crate::policy`]. Rejections never stop
//! the walk: every defect in the tree is reported, in source traversal
//! order, each located at the offending node.

use crate::ast::{Identifier, Node, Param, PropertyKind, Span};
use crate::parse::{parse_program, ParseLimits};
use crate::policy;
use crate::scope::Scope;
use crate::statics::{self, Resolution};
use crate::violation::{Reason, Violation};

/// Configuration for a [`Validator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidatorConfig {
    /// Size and nesting limits; exceeding them is a parse failure.
    pub limits: ParseLimits,
}

/// Validates scripts against the whitelist.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    /// Create a validator with the given configuration.
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate one script.
    ///
    /// `allowed_variables` lists the dotted dependency paths (`"Q1.value"`)
    /// the script may read. Returns every violation found; an empty list
    /// means the script is accepted.
    pub fn validate_script<S: AsRef<str>>(
        &self,
        source: &str,
        allowed_variables: &[S],
    ) -> Vec<Violation> {
        let whole = Span::whole(source);
        let program = match parse_program(source, self.config.limits) {
            Ok(program) => program,
            Err(failure) => {
                tracing::warn!(error = %failure, script_len = source.len(), "script rejected: could not parse");
                return vec![Violation::new(Reason::Unparseable, whole)];
            }
        };

        if !is_single_expression_statement(&program) {
            tracing::debug!(script_len = source.len(), "script rejected: not a single expression");
            return vec![Violation::new(Reason::NotSingleExpression, whole)];
        }

        let violations = validate(&program, allowed_variables, &Scope::root());
        tracing::debug!(
            script_len = source.len(),
            violations = violations.len(),
            "script validated"
        );
        violations
    }
}

/// Validate one script with the default configuration.
pub fn validate_script<S: AsRef<str>>(source: &str, allowed_variables: &[S]) -> Vec<Violation> {
    Validator::default().validate_script(source, allowed_variables)
}

/// Validate an already-lowered tree in the given scope.
///
/// Unlike [`Validator::validate_script`], no program-shape check is made;
/// `node` may be any sub-tree.
pub fn validate<S: AsRef<str>>(
    node: &Node,
    allowed_variables: &[S],
    scope: &Scope<'_>,
) -> Vec<Violation> {
    let mut walker = Walker {
        allowed_variables,
        violations: Vec::new(),
    };
    walker.walk(node, scope);
    walker.violations
}

fn is_single_expression_statement(program: &Node) -> bool {
    matches!(
        program,
        Node::Program { body, .. } if matches!(body.as_slice(), [Node::ExpressionStatement { .. }])
    )
}

/// Recursive walker that collects violations in traversal order.
struct Walker<'v, S> {
    allowed_variables: &'v [S],
    violations: Vec<Violation>,
}

impl<S: AsRef<str>> Walker<'_, S> {
    fn report(&mut self, reason: Reason<'_>, span: Span) {
        self.violations.push(Violation::new(reason, span));
    }

    fn walk(&mut self, node: &Node, scope: &Scope<'_>) {
        match node {
            Node::Program { body, .. } => self.walk_all(body, scope),
            Node::Block {
                span,
                directives,
                body,
            } => {
                if *directives {
                    self.report(Reason::Directives, *span);
                }
                self.walk_all(body, scope);
            }
            Node::ExpressionStatement { expression, .. } | Node::Chain { expression, .. } => {
                self.walk(expression, scope)
            }
            Node::Identifier(ident) => self.check_identifier(ident, scope),
            Node::Literal { .. } => {}
            Node::Array { elements, .. } => self.walk_all(elements, scope),
            Node::Object { properties, .. } => self.walk_all(properties, scope),
            Node::Property {
                span,
                kind,
                method,
                key,
                value,
            } => {
                if *kind != PropertyKind::Init || *method {
                    self.report(Reason::NonInitProperty, *span);
                    return;
                }
                self.walk(key, scope);
                self.walk(value, scope);
            }
            Node::Function { params, body, .. } => self.walk_function(params, body, scope),
            Node::Unary {
                span,
                operator,
                argument,
            } => {
                if !policy::is_allowed_unary_operator(operator) {
                    self.report(Reason::UnaryOperator(operator), *span);
                }
                self.walk(argument, scope);
            }
            Node::Binary { left, right, .. } | Node::Logical { left, right, .. } => {
                self.walk(left, scope);
                self.walk(right, scope);
            }
            Node::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.walk(test, scope);
                self.walk(consequent, scope);
                self.walk(alternate, scope);
            }
            Node::Return { argument, .. } => {
                if let Some(argument) = argument {
                    self.walk(argument, scope);
                }
            }
            Node::Member {
                span,
                object,
                property,
                computed,
            } => self.walk_member(*span, object, property, *computed, scope),
            Node::Call {
                span,
                callee,
                arguments,
            } => self.walk_call(*span, callee, arguments, scope),
            Node::New {
                span,
                callee,
                arguments,
            } => match callee.as_identifier() {
                Some(ident) if policy::is_constructible(&ident.name) => {
                    self.walk_all(arguments, scope);
                }
                _ => self.report(Reason::New, *span),
            },
            Node::If { span } => self.report(Reason::If, *span),
            Node::Loop { span, .. } => self.report(Reason::Loop, *span),
            Node::VariableDeclaration { span } => self.report(Reason::VariableDeclaration, *span),
            Node::Update { span } => self.report(Reason::Update, *span),
            Node::FunctionDeclaration { span } => self.report(Reason::FunctionDeclaration, *span),
            Node::Assignment { span } => self.report(Reason::Assignment, *span),
            Node::Unsupported { kind, span } => self.report(Reason::UnidentifiedNode(kind), *span),
        }
    }

    fn walk_all(&mut self, nodes: &[Node], scope: &Scope<'_>) {
        for node in nodes {
            self.walk(node, scope);
        }
    }

    fn check_identifier(&mut self, ident: &Identifier, scope: &Scope<'_>) {
        if !scope.is_bound(&ident.name) {
            self.report(Reason::NotDefined(&ident.name), ident.span);
        }
    }

    fn walk_function(&mut self, params: &[Param], body: &Node, scope: &Scope<'_>) {
        // Defaults and destructuring would carry unchecked expressions.
        for param in params {
            if let Param::Pattern { kind, span } = param {
                self.report(Reason::UnidentifiedNode(kind), *span);
            }
        }
        let inner = scope.extend(params);
        self.walk(body, &inner);
    }

    fn is_dependency(&self, object: &Identifier, property: &Identifier) -> bool {
        self.allowed_variables.iter().any(|path| {
            path.as_ref().split_once('.')
                == Some((object.name.as_str(), property.name.as_str()))
        })
    }

    fn walk_member(
        &mut self,
        span: Span,
        object: &Node,
        property: &Node,
        computed: bool,
        scope: &Scope<'_>,
    ) {
        if computed {
            self.report(Reason::ComputedMember, span);
            return;
        }
        let Some(prop) = property.as_identifier() else {
            self.report(Reason::UnidentifiedMemberProperty, property.span());
            return;
        };

        if let Some(obj) = object.as_identifier() {
            match statics::resolve_property(obj, prop) {
                Resolution::Recognized => return,
                Resolution::Unrecognized(violation) => {
                    self.violations.push(violation);
                    return;
                }
                Resolution::NotStatic => {}
            }
            if self.is_dependency(obj, prop) {
                return;
            }
        }

        if policy::is_instance_property(&prop.name) {
            self.walk(object, scope);
            return;
        }

        match object.as_identifier() {
            Some(obj) => self.report(
                Reason::UnidentifiedMember {
                    object: &obj.name,
                    property: &prop.name,
                },
                span,
            ),
            None => self.report(Reason::UnidentifiedMemberProperty, prop.span),
        }
    }

    fn walk_call(&mut self, span: Span, callee: &Node, arguments: &[Node], scope: &Scope<'_>) {
        match callee {
            Node::Identifier(_) => {
                self.report(Reason::GlobalCall, span);
                return;
            }
            Node::Member { computed: true, .. } => self.walk(callee, scope),
            Node::Member {
                object, property, ..
            } => self.walk_method_callee(object, property, scope),
            _ => {
                self.report(Reason::NonMethodCall, span);
                return;
            }
        }
        self.walk_all(arguments, scope);
    }

    fn walk_method_callee(&mut self, object: &Node, property: &Node, scope: &Scope<'_>) {
        let Some(method) = property.as_identifier() else {
            self.report(Reason::UnidentifiedMemberProperty, property.span());
            return;
        };

        if let Some(obj) = object.as_identifier() {
            match statics::resolve_method(obj, method) {
                Resolution::Recognized => return,
                Resolution::Unrecognized(violation) => {
                    self.violations.push(violation);
                    return;
                }
                Resolution::NotStatic => {}
            }
        }

        self.walk(object, scope);
        if !policy::is_instance_method(&method.name) {
            self.report(Reason::UnidentifiedInstanceMethod(&method.name), method.span);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FunctionKind;

    const NONE: &[&str] = &[];

    fn check(source: &str) -> Vec<Violation> {
        validate_script(source, NONE)
    }

    fn messages(violations: &[Violation]) -> Vec<&str> {
        violations.iter().map(|v| v.message.as_str()).collect()
    }

    fn one(source: &str, allowed: &[&str]) -> Violation {
        let mut violations = validate_script(source, allowed);
        assert_eq!(violations.len(), 1, "expected one violation for {source:?}, got {violations:?}");
        violations.remove(0)
    }

    // --- Literals and identifiers ---

    #[test]
    fn literals_are_accepted() {
        for source in ["1", "'String'", "true", "null", "/d+/", "\"\"", "10n"] {
            assert_eq!(check(source), vec![], "{source}");
        }
    }

    #[test]
    fn builtin_identifiers_are_accepted() {
        for source in ["NaN", "undefined", "Infinity", "-Infinity"] {
            assert_eq!(check(source), vec![], "{source}");
        }
    }

    #[test]
    fn free_identifiers_are_not_defined() {
        let v = one("1/x", NONE);
        assert_eq!(v.message, "x is not defined");
        assert_eq!((v.start, v.end), (2, 3));

        let v = one("-x", NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("x is not defined", 1, 2));
    }

    // --- Objects and arrays ---

    #[test]
    fn object_and_array_members_are_validated() {
        assert_eq!(check(r#"undefined == {"name":"John"}"#), vec![]);
        assert_eq!(check("[1,2,3,4,5]"), vec![]);

        let v = one(r#"undefined == {"name":x}"#, NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("x is not defined", 21, 22));

        let v = one("[1,2,3,4,x]", NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("x is not defined", 9, 10));
    }

    #[test]
    fn identifier_keys_are_judged_as_identifiers() {
        let v = one("undefined == {name: 1}", NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("name is not defined", 14, 18));
        assert_eq!(check("[1].map(name => ({name: name}))"), vec![]);
    }

    #[test]
    fn accessor_and_method_properties_are_rejected() {
        let v = one("undefined == {get a() { return 1 }}", NONE);
        assert_eq!(v.message, "only init properties are allowed within object");
        assert_eq!((v.start, v.end), (14, 34));

        let v = one("undefined == {\"f\"() { return 1 }}", NONE);
        assert_eq!(v.message, "only init properties are allowed within object");
    }

    #[test]
    fn spreads_and_holes_are_unidentified() {
        let v = one("[1, , 2]", NONE);
        assert_eq!(v.message, "Unidentified node: Elision");

        let v = one("[...[1]]", NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("Unidentified node: SpreadElement", 1, 7));
    }

    // --- Calls ---

    #[test]
    fn global_calls_are_rejected_whole() {
        let v = one(r#"1 + eval("2")"#, NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("global methods are not permitted", 4, 13));

        let v = one(r#"1 + parseInt("2")"#, NONE);
        assert_eq!((v.start, v.end), (4, 17));

        let v = one("Number()", NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("global methods are not permitted", 0, 8));
    }

    #[test]
    fn global_call_arguments_are_not_visited() {
        assert_eq!(messages(&check("eval(x, y)")), vec!["global methods are not permitted"]);
    }

    #[test]
    fn non_member_callees_are_rejected() {
        let v = one("(x => x)(1)", NONE);
        assert_eq!(v.message, "functions are meant to be only invoked as instance methods");
        assert_eq!((v.start, v.end), (0, 11));

        let v = one("[1].map(x => x)(2)", NONE);
        assert_eq!(v.message, "functions are meant to be only invoked as instance methods");
    }

    #[test]
    fn function_expressions_bind_their_parameters() {
        assert_eq!(check("[1, 2, 3].filter(function(x) { return x % 2 === 0; });"), vec![]);
        assert_eq!(check("[1,2,3,4,5].filter(function(x){return x%2==0})"), vec![]);
        assert_eq!(check("[1,2,3,4,5].filter(x => x%2==0)"), vec![]);
    }

    #[test]
    fn nested_functions_see_outer_parameters() {
        assert_eq!(
            check("[[1]].map(row => row.map(cell => cell + row.length))"),
            vec![]
        );
        let v = one("[[1]].map(row => row.length).map(n => row)", NONE);
        assert_eq!(v.message, "row is not defined");
    }

    #[test]
    fn patterned_parameters_are_unidentified() {
        let violations = check("[1].map((a = eval('x')) => 1)");
        assert_eq!(messages(&violations), vec!["Unidentified node: AssignmentPattern"]);
        assert_eq!((violations[0].start, violations[0].end), (9, 22));

        assert_eq!(
            messages(&check("[1].map(({a}) => a)")),
            vec!["Unidentified node: ObjectPattern", "a is not defined"]
        );
    }

    #[test]
    fn static_methods_are_accepted() {
        for source in [
            "Number.isFinite(1/0)",
            "Math.abs(-1)",
            "Date.now()",
            r#"Object.keys({"name":"Bob", "age": 23 + 1})"#,
        ] {
            assert_eq!(check(source), vec![], "{source}");
        }
        assert_eq!(
            validate_script("QlarrScripts.isVoid(Q1.value)", &["Q1.value"]),
            vec![]
        );
        assert_eq!(
            validate_script(r#"QlarrScripts.safeAccess(Q1.value,"length")"#, &["Q1.value"]),
            vec![]
        );
    }

    #[test]
    fn unknown_static_methods_point_at_method_name() {
        let v = one("Math.abs2(1)", NONE);
        assert_eq!(
            (v.message.as_str(), v.start, v.end),
            ("Unidentified method name for Math: abs2", 5, 9)
        );
        let v = one("QlarrScripts.eval('1')", NONE);
        assert_eq!(v.message, "Unidentified method name for QlarrScripts: eval");
    }

    #[test]
    fn static_method_arguments_are_validated() {
        let v = one("Math.max(1, y)", NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("y is not defined", 12, 13));
    }

    #[test]
    fn optional_calls_and_logical_guards() {
        assert_eq!(
            validate_script(r#"((Q3.value && Q3.value.contains("1")))"#, &["Q3.value"]),
            vec![]
        );
        assert_eq!(validate_script(r#"Q3.value?.contains("1")"#, &["Q3.value"]), vec![]);
    }

    #[test]
    fn instance_methods_are_checked_by_name() {
        assert_eq!(validate_script("Q1.value.length()", &["Q1.value"]), vec![]);
        assert_eq!(check("[1,2,3,4,5].length()"), vec![]);
        assert_eq!(check(r#""kabaka".charAt(20)"#), vec![]);
        // name-only: a string receiver may call an array method
        assert_eq!(check(r#""abc".push(1)"#), vec![]);

        let v = one("kabaka.charAt(20)", NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("kabaka is not defined", 0, 6));

        let v = one(r#""abc".constructor("x")"#, NONE);
        assert_eq!(
            (v.message.as_str(), v.start, v.end),
            ("Unidentified instance method: constructor", 6, 17)
        );
    }

    #[test]
    fn callee_violations_precede_argument_violations() {
        assert_eq!(
            messages(&check("a.call(b)")),
            vec![
                "a is not defined",
                "Unidentified instance method: call",
                "b is not defined"
            ]
        );
    }

    #[test]
    fn computed_callee_is_a_computed_member() {
        let violations = check(r#"Math["abs"](x)"#);
        assert_eq!(
            messages(&violations),
            vec!["Computed member expressions are not allowed", "x is not defined"]
        );
        assert_eq!((violations[0].start, violations[0].end), (0, 11));
    }

    // --- Members ---

    #[test]
    fn static_properties_are_accepted() {
        for source in ["Math.E", "Math.LOG2E", "Number.EPSILON", "Number.MAX_VALUE"] {
            assert_eq!(check(source), vec![], "{source}");
        }
        let v = one("Math.TAU", NONE);
        assert_eq!(
            (v.message.as_str(), v.start, v.end),
            ("Unidentified propery name for Math: TAU", 5, 8)
        );
    }

    #[test]
    fn length_is_the_only_instance_property() {
        assert_eq!(validate_script("Q1.value.length", &["Q1.value"]), vec![]);
        assert_eq!(check("[1,2,3,4,5].length"), vec![]);

        let v = one("Q1.value.constructor", &["Q1.value"]);
        assert_eq!(
            (v.message.as_str(), v.start, v.end),
            ("unIdentified member property", 9, 20)
        );
    }

    #[test]
    fn undeclared_dependency_is_unidentified_pair() {
        let v = one("Q2.value", &["Q1.value"]);
        assert_eq!((v.message.as_str(), v.start, v.end), ("unIdentified: Q2.value", 0, 8));

        let v = one("Date.now", NONE);
        assert_eq!(v.message, "unIdentified: Date.now");
    }

    #[test]
    fn dependencies_match_exactly() {
        let v = one("Q1.val", &["Q1.value"]);
        assert_eq!(v.message, "unIdentified: Q1.val");
        let v = one("Q1.value", &["Q1.value.extra"]);
        assert_eq!(v.message, "unIdentified: Q1.value");
        assert_eq!(validate_script("x.relevance ? 'OK' : 'NOT OK'", &["x.relevance"]), vec![]);
    }

    #[test]
    fn computed_members_are_rejected() {
        let v = one(r#"Q1.value["length"]"#, &["Q1.value"]);
        assert_eq!(
            (v.message.as_str(), v.start, v.end),
            ("Computed member expressions are not allowed", 0, 18)
        );
    }

    // --- Operators ---

    #[test]
    fn unary_operators() {
        for source in ["-1", "!true", "+1", "~1"] {
            assert_eq!(check(source), vec![], "{source}");
        }
        assert_eq!(validate_script("typeof Q1.value", &["Q1.value"]), vec![]);
    }

    #[test]
    fn disallowed_unary_operator_still_visits_operand() {
        let violations = check("void x");
        assert_eq!(messages(&violations), vec!["void operator is not allowed", "x is not defined"]);
        assert_eq!((violations[0].start, violations[0].end), (0, 6));
        assert_eq!(messages(&validate_script("delete Q1.value", &["Q1.value"])), vec![
            "delete operator is not allowed"
        ]);
    }

    #[test]
    fn binary_and_conditional_expressions() {
        assert_eq!(check("1 + 2"), vec![]);
        assert_eq!(check("(true && false) || true"), vec![]);
        assert_eq!(check(" 8 / 2"), vec![]);
        assert_eq!(check("1 in [1] ? 1 ?? 2 : 3 instanceof 4"), vec![]);
        assert_eq!(
            messages(&check("a ? b : c")),
            vec!["a is not defined", "b is not defined", "c is not defined"]
        );
    }

    #[test]
    fn new_is_limited_to_date_and_regexp() {
        assert_eq!(check("new Date(2020, 1, 1)"), vec![]);
        assert_eq!(check("new RegExp('a+')"), vec![]);
        let v = one("new Function('return 1')", NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("New expressions are not allowed", 0, 24));
        let v = one("new Date(x)", NONE);
        assert_eq!(v.message, "x is not defined");
    }

    // --- Statement shapes ---

    #[test]
    fn if_statements_are_rejected_in_bodies() {
        let v = one(
            "[1,2,3,4].filter(function(x){if(x%2==0){return true} else {return false}})",
            NONE,
        );
        assert_eq!((v.message.as_str(), v.start, v.end), ("If statements are not allowed", 29, 72));
    }

    #[test]
    fn loops_never_pass_the_shape_gate() {
        let v = one("while(true){1}", NONE);
        assert_eq!(
            (v.message.as_str(), v.start, v.end),
            ("This script must be a single ExpressionStatement", 0, 14)
        );
        let v = one("for (let i = 0; i < 9; i++) {  str = str + i;}", NONE);
        assert_eq!((v.start, v.end), (0, 46));
        let v = one("for (const element of array1) {console.log(element);}", NONE);
        assert_eq!((v.start, v.end), (0, 53));
    }

    #[test]
    fn loops_inside_function_bodies() {
        let v = one("[1].map(x => { while (x) {} return x })", NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("Loops are not allowed", 15, 27));
    }

    #[test]
    fn declarations_updates_and_assignments() {
        let violations = validate_script(
            "Q1.value.map((value) => {let x = 3; return value * x})",
            &["Q1.value"],
        );
        assert_eq!(
            violations,
            vec![
                Violation {
                    message: "Variable Declarations are not allowed".into(),
                    start: 25,
                    end: 35
                },
                Violation {
                    message: "x is not defined".into(),
                    start: 51,
                    end: 52
                },
            ]
        );

        let v = one("x++", NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("Update Expressions are not allowed", 0, 3));

        let violations = validate_script(
            "Q2.value.map(x=>{function get(){}return get();})",
            &["Q2.value"],
        );
        assert_eq!(
            violations,
            vec![
                Violation {
                    message: "Function Declarations are not allowed".into(),
                    start: 17,
                    end: 33
                },
                Violation {
                    message: "global methods are not permitted".into(),
                    start: 40,
                    end: 45
                },
            ]
        );

        let v = one("Q1.value = 3", &["Q1.value"]);
        assert_eq!((v.message.as_str(), v.start, v.end), ("Assignments are not allowed", 0, 12));
    }

    #[test]
    fn program_shape_gate() {
        for source in ["", "1; 2", "'use strict'; 1", "var a = 1", ";"] {
            let v = one(source, NONE);
            assert_eq!(v.message, "This script must be a single ExpressionStatement", "{source:?}");
            assert_eq!((v.start as usize, v.end as usize), (0, source.len()));
        }
    }

    #[test]
    fn function_body_directives_are_flagged() {
        let violations = check("[1].map(function (x) { 'use strict'; return x })");
        assert_eq!(messages(&violations), vec!["directives are not allowed"]);
        assert_eq!((violations[0].start, violations[0].end), (21, 47));
    }

    #[test]
    fn bare_return_in_body_is_accepted() {
        assert_eq!(check("[1].map(function () { return })"), vec![]);
    }

    #[test]
    fn unparseable_scripts_span_whole_source() {
        let v = one("1 +", NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("Fatal error - could not parse", 0, 3));
    }

    #[test]
    fn limits_are_fatal() {
        let validator = Validator::new(ValidatorConfig {
            limits: ParseLimits {
                max_script_bytes: 1024,
                max_nesting_depth: 4,
            },
        });
        let deep = "[[[[[1]]]]]";
        let violations = validator.validate_script(deep, NONE);
        assert_eq!(messages(&violations), vec!["Fatal error - could not parse"]);
        assert_eq!(violations[0].end as usize, deep.len());

        let big = format!("'{}'", "a".repeat(2048));
        assert_eq!(
            messages(&validator.validate_script(&big, NONE)),
            vec!["Fatal error - could not parse"]
        );
    }

    #[test]
    fn bracket_free_nesting_is_fatal() {
        let validator = Validator::new(ValidatorConfig {
            limits: ParseLimits {
                max_script_bytes: 1024,
                max_nesting_depth: 4,
            },
        });
        for deep in [
            "!!!!!1",
            "1 + 1 + 1 + 1 + 1",
            "1 ? 1 : 1 ? 1 : 1 ? 1 : 1",
            "'x'.length.length.length.length",
        ] {
            let violations = validator.validate_script(deep, NONE);
            assert_eq!(messages(&violations), vec!["Fatal error - could not parse"], "{deep}");
            assert_eq!(violations[0].end as usize, deep.len());
        }
    }

    #[test]
    fn brackets_in_literals_do_not_count() {
        let validator = Validator::new(ValidatorConfig {
            limits: ParseLimits {
                max_script_bytes: 1024,
                max_nesting_depth: 4,
            },
        });
        assert_eq!(validator.validate_script("'[[[[[(((((('.length", NONE), vec![]);
        assert_eq!(validator.validate_script("/[[[[[{{{{{]/.test('a')", NONE), vec![]);
    }

    #[test]
    fn unsupported_constructs_are_unidentified() {
        let v = one("`a${1}`", NONE);
        assert_eq!((v.message.as_str(), v.start, v.end), ("Unidentified node: TemplateLiteral", 0, 7));
        assert_eq!(one("this", NONE).message, "Unidentified node: ThisExpression");
        assert_eq!(one("(1, 2)", NONE).message, "Unidentified node: SequenceExpression");
    }

    // --- Direct tree validation ---

    #[test]
    fn validate_accepts_scope_from_caller() {
        let params = vec![Param::Name(Identifier {
            name: "outer".into(),
            span: Span::default(),
        })];
        let root = Scope::root();
        let scope = root.extend(&params);
        let node = Node::Identifier(Identifier {
            name: "outer".into(),
            span: Span::new(0, 5),
        });
        assert_eq!(validate(&node, NONE, &scope), vec![]);
        assert_eq!(messages(&validate(&node, NONE, &root)), vec!["outer is not defined"]);
    }

    #[test]
    fn function_nodes_extend_scope_for_body_only() {
        let ident = |name: &str| Identifier {
            name: name.into(),
            span: Span::default(),
        };
        let node = Node::Array {
            span: Span::default(),
            elements: vec![
                Node::Function {
                    span: Span::default(),
                    kind: FunctionKind::Arrow,
                    params: vec![Param::Name(ident("p"))],
                    body: Box::new(Node::Identifier(ident("p"))),
                },
                Node::Identifier(ident("p")),
            ],
        };
        assert_eq!(messages(&validate(&node, NONE, &Scope::root())), vec!["p is not defined"]);
    }

    #[test]
    fn validation_is_idempotent() {
        let source = "a.b(c, d ? e : [f, g.h])";
        assert_eq!(check(source), check(source));
    }
}
