//! Whitelisted capability tables.
//!
//! Everything a script may touch is listed here: the bare identifiers that
//! are always in scope, the unary operators, the constructible built-ins, the
//! static surface of each built-in namespace, and the instance members that
//! may be reached off arbitrary values. The tables are `'static` and never
//! change after compilation.

/// Identifiers that are always in scope.
pub const ALLOWED_IDENTIFIERS: &[&str] = &["undefined", "NaN", "Infinity", "-Infinity"];

/// Unary operators a script may use.
pub const UNARY_OPERATORS: &[&str] = &["+", "-", "!", "~", "typeof"];

/// Built-ins that may appear as the callee of `new`.
pub const IDENTIFIERS_WITH_NEW: &[&str] = &["Date", "RegExp"];

/// Name of the survey engine's helper namespace.
pub const EXTENSION_NAMESPACE: &str = "QlarrScripts";

const DATE_STATIC_METHODS: &[&str] = &["now", "parse", "UTC", "RegExp"];

const MATH_STATIC_METHODS: &[&str] = &[
    "abs", "acos", "acosh", "asin", "asinh", "atan", "atan2", "atanh", "cbrt", "ceil", "clz32",
    "cos", "cosh", "exp", "expm1", "f16round", "floor", "fround", "hypot", "imul", "log", "log10",
    "log1p", "log2", "max", "min", "pow", "random", "round", "sign", "sin", "sinh", "sqrt", "tan",
    "tanh", "trunc",
];

const NUMBER_STATIC_METHODS: &[&str] = &[
    "isFinite",
    "isInteger",
    "isNaN",
    "isSafeInteger",
    "parseFloat",
    "parseInt",
];

const OBJECT_STATIC_METHODS: &[&str] = &["entries", "keys"];

const EXTENSION_STATIC_METHODS: &[&str] = &[
    "separator",
    "safeAccess",
    "and",
    "isValidSqlDateTime",
    "listStrings",
    "isValidTime",
    "isValidDay",
    "sqlDateTimeToDate",
    "formatSqlDate",
    "formatTime",
    "dateStringToDate",
    "toSqlDateTimeIgnoreTime",
    "toSqlDateTime",
    "toSqlDateTimeIgnoreDate",
    "isVoid",
    "isNotVoid",
    "wordCount",
    "hasDuplicates",
];

const MATH_STATIC_PROPERTIES: &[&str] =
    &["E", "LN10", "LN2", "LOG10E", "LOG2E", "PI", "SQRT1_2", "SQRT2"];

const NUMBER_STATIC_PROPERTIES: &[&str] = &[
    "EPSILON",
    "MAX_SAFE_INTEGER",
    "MAX_VALUE",
    "MIN_SAFE_INTEGER",
    "MIN_VALUE",
    "NaN",
    "NEGATIVE_INFINITY",
    "POSITIVE_INFINITY",
];

/// Properties that may be read off any value.
pub const ALLOWED_INSTANCE_PROPERTIES: &[&str] = &["length"];

/// Methods that may be invoked on any value.
///
/// Matched by name only; the receiver's runtime type is the evaluator's
/// concern.
pub const ALLOWED_INSTANCE_METHODS: &[&str] = &[
    // generic
    "toString",
    "toLocaleString",
    // numeric
    "toExponential",
    "toFixed",
    "toPrecision",
    // pattern
    "exec",
    "test",
    // sequence
    "at",
    "contains",
    "filter",
    "find",
    "findIndex",
    "findLast",
    "findLastIndex",
    "includes",
    "indexOf",
    "keys",
    "lastIndexOf",
    "length",
    "map",
    "pop",
    "push",
    "reduce",
    "reduceRight",
    "reverse",
    "shift",
    "slice",
    "some",
    "sort",
    "splice",
    "toReversed",
    "toSorted",
    "toSpliced",
    // text
    "charAt",
    "concat",
    "endsWith",
    "match",
    "matchAll",
    "padEnd",
    "padStart",
    "replace",
    "replaceAll",
    "search",
    "split",
    "startsWith",
    "substring",
    "toLowerCase",
    "toUpperCase",
    "trim",
    "trimEnd",
    "trimStart",
    // calendar
    "getDate",
    "getDay",
    "getFullYear",
    "getHours",
    "getMilliseconds",
    "getMinutes",
    "getMonth",
    "getSeconds",
    "getTime",
    "getTimezoneOffset",
    "getUTCDate",
    "getUTCDay",
    "getUTCFullYear",
    "getUTCHours",
    "getUTCMilliseconds",
    "getUTCMinutes",
    "getUTCMonth",
    "getUTCSeconds",
    "setDate",
    "setFullYear",
    "setHours",
    "setMilliseconds",
    "setMinutes",
    "setMonth",
    "setSeconds",
    "setTime",
    "setUTCDate",
    "setUTCFullYear",
    "setUTCHours",
    "setUTCMilliseconds",
    "setUTCMinutes",
    "setUTCMonth",
    "setUTCSeconds",
    "toDateString",
    "toISOString",
    "toJSON",
    "toLocaleDateString",
    "toLocaleTimeString",
    "toTimeString",
    "toUTCString",
];

/// A built-in namespace with a static surface.
///
/// Every namespace takes part in static-method resolution; only some also
/// expose static properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// `Date`
    Date,
    /// `Number`
    Number,
    /// `Math`
    Math,
    /// `Object`
    Object,
    /// The survey engine's helper namespace, see [`EXTENSION_NAMESPACE`].
    Extension,
}

impl Namespace {
    /// Every namespace, in table order.
    pub const ALL: [Namespace; 5] = [
        Namespace::Date,
        Namespace::Number,
        Namespace::Math,
        Namespace::Object,
        Namespace::Extension,
    ];

    /// Look up a namespace by the identifier a script uses for it.
    pub fn from_identifier(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.name() == name)
    }

    /// The identifier a script uses for this namespace.
    pub fn name(self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::Number => "Number",
            Self::Math => "Math",
            Self::Object => "Object",
            Self::Extension => EXTENSION_NAMESPACE,
        }
    }

    /// Whether `Namespace.property` reads are resolved against this
    /// namespace's static properties.
    pub fn has_static_properties(self) -> bool {
        matches!(self, Self::Number | Self::Math)
    }

    /// Static methods callable on this namespace.
    ///
    /// `None` means the namespace takes part in static-method resolution but
    /// carries no table, in which case every method name is accepted.
    pub fn static_methods(self) -> Option<&'static [&'static str]> {
        match self {
            Self::Date => Some(DATE_STATIC_METHODS),
            Self::Number => Some(NUMBER_STATIC_METHODS),
            Self::Math => Some(MATH_STATIC_METHODS),
            Self::Object => Some(OBJECT_STATIC_METHODS),
            Self::Extension => Some(EXTENSION_STATIC_METHODS),
        }
    }

    /// Static properties readable on this namespace, with the same `None`
    /// convention as [`Namespace::static_methods`].
    pub fn static_properties(self) -> Option<&'static [&'static str]> {
        match self {
            Self::Number => Some(NUMBER_STATIC_PROPERTIES),
            Self::Math => Some(MATH_STATIC_PROPERTIES),
            Self::Date | Self::Object | Self::Extension => None,
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether `name` is always in scope.
pub fn is_allowed_identifier(name: &str) -> bool {
    ALLOWED_IDENTIFIERS.contains(&name)
}

/// Whether `operator` may be used as a unary operator.
pub fn is_allowed_unary_operator(operator: &str) -> bool {
    UNARY_OPERATORS.contains(&operator)
}

/// Whether `new <name>(...)` is permitted.
pub fn is_constructible(name: &str) -> bool {
    IDENTIFIERS_WITH_NEW.contains(&name)
}

/// Whether `value.<name>` may be read.
pub fn is_instance_property(name: &str) -> bool {
    ALLOWED_INSTANCE_PROPERTIES.contains(&name)
}

/// Whether `value.<name>(...)` may be called.
pub fn is_instance_method(name: &str) -> bool {
    ALLOWED_INSTANCE_METHODS.contains(&name)
}
