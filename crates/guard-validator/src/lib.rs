#![warn(missing_docs)]

//! # guard-validator
//!
//! Static safety validator for survey expression scripts.
//!
//! A survey engine evaluates author-written ECMAScript expressions such as
//! `Q1.value > 3 && QlarrScripts.isNotVoid(Q2.value)`. This crate decides,
//! without running anything, whether a script stays inside a small
//! whitelisted subset of the language, and reports every violation with the
//! byte range of the offending node.
//!
//! ## Accepted subset
//!
//! - **One expression**: the program is a single expression statement
//! - **Closed identifiers**: only `undefined`, `NaN`, `Infinity`, function
//!   parameters in scope, and the declared `object.property` dependencies
//! - **No effects**: no assignments, updates, declarations, loops or `if`
//! - **Whitelisted calls**: instance methods by name, static methods of
//!   `Date`, `Number`, `Math`, `Object` and `QlarrScripts`, and `new` only
//!   for `Date` and `RegExp`
//! - **No dynamic access**: computed members are rejected
//!
//! ```
//! use guard_validator::validate_script;
//!
//! assert!(validate_script("Q1.value.length > 2", &["Q1.value"]).is_empty());
//!
//! let violations = validate_script("eval('1')", &[] as &[&str]);
//! assert_eq!(violations[0].message, "global methods are not permitted");
//! ```

pub mod ast;
pub mod audit;
pub mod batch;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod parse;
pub mod policy;
mod scan;
pub mod scope;
pub mod statics;
pub mod validator;
pub mod violation;

pub use batch::{validate_code, BatchRunner, Instruction, ValidationResult};
pub use parse::ParseLimits;
pub use scope::Scope;
pub use validator::{validate, validate_script, Validator, ValidatorConfig};
pub use violation::Violation;
