//! Static member resolution for built-in namespaces.
//!
//! `Math.PI` and `Date.now()` are judged against the namespace's own
//! tables rather than the instance whitelist. Both patterns only apply when
//! the object is a bare identifier naming a namespace; anything nested
//! deeper is an instance access.

use crate::ast::Identifier;
use crate::policy::Namespace;
use crate::violation::{Reason, Violation};

/// Outcome of trying to resolve a member access as a static one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The object is not a namespace with a static surface of this kind.
    NotStatic,
    /// A recognized static member.
    Recognized,
    /// The namespace matched but the member is not on its table.
    Unrecognized(Violation),
}

/// Resolve `object.property` as a static property read.
pub fn resolve_property(object: &Identifier, property: &Identifier) -> Resolution {
    let Some(namespace) =
        Namespace::from_identifier(&object.name).filter(|ns| ns.has_static_properties())
    else {
        return Resolution::NotStatic;
    };
    match namespace.static_properties() {
        Some(table) if !table.contains(&property.name.as_str()) => {
            Resolution::Unrecognized(Violation::new(
                Reason::UnidentifiedStaticProperty {
                    namespace,
                    property: &property.name,
                },
                property.span,
            ))
        }
        _ => Resolution::Recognized,
    }
}

/// Resolve the callee `object.method` of a call as a static method.
pub fn resolve_method(object: &Identifier, method: &Identifier) -> Resolution {
    let Some(namespace) = Namespace::from_identifier(&object.name) else {
        return Resolution::NotStatic;
    };
    match namespace.static_methods() {
        Some(table) if !table.contains(&method.name.as_str()) => {
            Resolution::Unrecognized(Violation::new(
                Reason::UnidentifiedStaticMethod {
                    namespace,
                    method: &method.name,
                },
                method.span,
            ))
        }
        _ => Resolution::Recognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn ident(name: &str, start: u32) -> Identifier {
        Identifier {
            name: name.to_string(),
            span: Span::new(start, start + name.len() as u32),
        }
    }

    #[test]
    fn math_constants_resolve() {
        assert_eq!(
            resolve_property(&ident("Math", 0), &ident("PI", 5)),
            Resolution::Recognized
        );
        assert_eq!(
            resolve_property(&ident("Number", 0), &ident("EPSILON", 7)),
            Resolution::Recognized
        );
    }

    #[test]
    fn unknown_static_property_points_at_property() {
        let res = resolve_property(&ident("Math", 0), &ident("TAU", 5));
        let Resolution::Unrecognized(v) = res else {
            panic!("expected rejection, got {res:?}");
        };
        assert_eq!(v.message, "Unidentified propery name for Math: TAU");
        assert_eq!((v.start, v.end), (5, 8));
    }

    #[test]
    fn namespaces_without_properties_are_not_static_reads() {
        assert_eq!(
            resolve_property(&ident("Date", 0), &ident("now", 5)),
            Resolution::NotStatic
        );
        assert_eq!(
            resolve_property(&ident("Q1", 0), &ident("value", 3)),
            Resolution::NotStatic
        );
    }

    #[test]
    fn static_methods_resolve_per_namespace() {
        assert_eq!(
            resolve_method(&ident("Date", 0), &ident("now", 5)),
            Resolution::Recognized
        );
        assert_eq!(
            resolve_method(&ident("Object", 0), &ident("keys", 7)),
            Resolution::Recognized
        );
        assert_eq!(
            resolve_method(&ident("QlarrScripts", 0), &ident("isVoid", 13)),
            Resolution::Recognized
        );
        assert_eq!(
            resolve_method(&ident("Array", 0), &ident("from", 6)),
            Resolution::NotStatic
        );
    }

    #[test]
    fn unknown_static_method_is_namespace_qualified() {
        let res = resolve_method(&ident("Object", 0), &ident("assign", 7));
        let Resolution::Unrecognized(v) = res else {
            panic!("expected rejection, got {res:?}");
        };
        assert_eq!(v.message, "Unidentified method name for Object: assign");
        assert_eq!((v.start, v.end), (7, 13));

        let Resolution::Unrecognized(v) =
            resolve_method(&ident("QlarrScripts", 0), &ident("constructor", 13))
        else {
            panic!("constructor must not resolve on the helper namespace");
        };
        assert_eq!(
            v.message,
            "Unidentified method name for QlarrScripts: constructor"
        );
    }
}
