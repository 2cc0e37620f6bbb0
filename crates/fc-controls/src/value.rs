//! Component parameters: literal constants or live property references.

use std::fmt;

use fc_core::{PropertyId, ensure_finite};
use fc_props::PropertyManager;

use crate::error::{ControlError, ControlResult};

/// True if `token` reads as a numeric literal.
///
/// Property paths never start with a digit or sign, so `-fcs/elevator` is a
/// negated reference, not a number.
pub fn is_number(token: &str) -> bool {
    let token = token.trim();
    let leading_ok = token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
    leading_ok && token.parse::<f64>().is_ok()
}

/// Resolved handle to a property, optionally sign-inverted.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRef {
    id: PropertyId,
    negated: bool,
    path: String,
}

impl PropertyRef {
    /// Resolve `token` (`path` or `-path`) against the store.
    pub fn resolve(token: &str, props: &PropertyManager) -> ControlResult<Self> {
        let token = token.trim();
        let (negated, path) = match token.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, token),
        };
        let id = props
            .lookup(path)
            .ok_or_else(|| ControlError::UnresolvedProperty {
                name: path.to_string(),
            })?;
        Ok(Self {
            id,
            negated,
            path: path.trim_start_matches('/').to_string(),
        })
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self, props: &PropertyManager) -> f64 {
        let v = props.get(self.id);
        if self.negated { -v } else { v }
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "-{}", self.path)
        } else {
            f.write_str(&self.path)
        }
    }
}

/// A value that is either fixed at load time or read each frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Constant(f64),
    Property(PropertyRef),
}

impl Parameter {
    /// Numeric literal or property reference, decided by [`is_number`].
    pub fn resolve(token: &str, props: &PropertyManager) -> ControlResult<Self> {
        let token = token.trim();
        if is_number(token) {
            let v = token.parse().unwrap_or(f64::NAN);
            Ok(Self::Constant(ensure_finite(v, "numeric literal")?))
        } else {
            Ok(Self::Property(PropertyRef::resolve(token, props)?))
        }
    }

    pub fn value(&self, props: &PropertyManager) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Property(p) => p.value(props),
        }
    }

    /// True if the value can change between frames.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Property(_))
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Self::Constant(v) => Some(*v),
            Self::Property(_) => None,
        }
    }
}

impl From<f64> for Parameter {
    fn from(v: f64) -> Self {
        Self::Constant(v)
    }
}

impl From<PropertyRef> for Parameter {
    fn from(p: PropertyRef) -> Self {
        Self::Property(p)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(v) => write!(f, "{v}"),
            Self::Property(p) => write!(f, "{p}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PropertyManager {
        let mut props = PropertyManager::new();
        props.set_value("fcs/elevator-cmd-norm", 0.25).unwrap();
        props
    }

    #[test]
    fn numbers_are_detected() {
        assert!(is_number("1.5"));
        assert!(is_number("-0.5"));
        assert!(is_number(".5"));
        assert!(is_number("1e3"));
        assert!(!is_number("fcs/elevator"));
        assert!(!is_number("-fcs/elevator"));
        assert!(!is_number("inf"));
        assert!(!is_number(""));
    }

    #[test]
    fn negated_reference_inverts_value() {
        let props = store();
        let p = Parameter::resolve("-fcs/elevator-cmd-norm", &props).unwrap();
        assert_eq!(p.value(&props), -0.25);
        assert!(p.is_dynamic());
        assert_eq!(p.to_string(), "-fcs/elevator-cmd-norm");
    }

    #[test]
    fn literal_resolves_to_constant() {
        let props = store();
        let p = Parameter::resolve(" 2.5 ", &props).unwrap();
        assert_eq!(p, Parameter::Constant(2.5));
        assert_eq!(p.as_constant(), Some(2.5));
    }

    #[test]
    fn infinite_literal_is_rejected() {
        let props = store();
        let err = Parameter::resolve("-inf", &props).unwrap_err();
        assert!(matches!(err, ControlError::NonFinite(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn unknown_property_is_an_error() {
        let props = store();
        let err = Parameter::resolve("fcs/nowhere", &props).unwrap_err();
        assert_eq!(
            err,
            ControlError::UnresolvedProperty {
                name: "fcs/nowhere".into()
            }
        );
    }

    #[test]
    fn leading_slash_is_accepted() {
        let props = store();
        let r = PropertyRef::resolve("/fcs/elevator-cmd-norm", &props).unwrap();
        assert_eq!(r.path(), "fcs/elevator-cmd-norm");
        assert_eq!(r.value(&props), 0.25);
    }
}
