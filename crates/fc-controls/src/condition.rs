//! Boolean test trees evaluated against live property values.
//!
//! A [`Condition`] is either a single comparison (`"qbar gt 100"`) or a group
//! of nested conditions joined by AND/OR. Topology is fixed at load time; every
//! property name is resolved then, so evaluation cannot fail.

use std::fmt;
use std::str::FromStr;

use fc_props::PropertyManager;

use crate::error::{ControlError, ControlResult};
use crate::value::{Parameter, PropertyRef};

/// One of the six comparison kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparator {
    pub fn apply(self, a: f64, b: f64) -> bool {
        match self {
            Self::Eq => a == b,
            Self::Ne => a != b,
            Self::Gt => a > b,
            Self::Ge => a >= b,
            Self::Lt => a < b,
            Self::Le => a <= b,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

impl FromStr for Comparator {
    type Err = ControlError;

    /// Accepts `== != > >= < <=` and `EQ NE GT GE LT LE` in any case.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let c = match token.to_ascii_uppercase().as_str() {
            "==" | "EQ" => Self::Eq,
            "!=" | "NE" => Self::Ne,
            ">" | "GT" => Self::Gt,
            ">=" | "GE" => Self::Ge,
            "<" | "LT" => Self::Lt,
            "<=" | "LE" => Self::Le,
            _ => {
                return Err(ControlError::UnknownComparator {
                    token: token.to_string(),
                });
            }
        };
        Ok(c)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Group combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    /// Parse an optional logic attribute. Absent means AND.
    pub fn parse(token: Option<&str>) -> ControlResult<Self> {
        match token.map(str::trim) {
            None | Some("") => Ok(Self::And),
            Some(t) => t.parse(),
        }
    }
}

impl FromStr for Logic {
    type Err = ControlError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            _ => Err(ControlError::UnknownLogic {
                token: token.to_string(),
            }),
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Test {
        lhs: PropertyRef,
        comparator: Comparator,
        rhs: Parameter,
    },
    Group {
        logic: Logic,
        children: Vec<Condition>,
    },
}

impl Condition {
    /// Build a leaf from a `"operand operator operand"` string.
    ///
    /// Exactly three whitespace-separated tokens are required. The right operand
    /// is a literal if it parses as a number, otherwise a property.
    pub fn parse(text: &str, props: &PropertyManager) -> ControlResult<Self> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let [lhs, op, rhs] = tokens.as_slice() else {
            return Err(ControlError::MalformedCondition {
                text: text.trim().to_string(),
                tokens: tokens.len(),
            });
        };
        let comparator = op.parse()?;
        let lhs = PropertyRef::resolve(lhs, props)?;
        let rhs = Parameter::resolve(rhs, props)?;
        Ok(Self::Test {
            lhs,
            comparator,
            rhs,
        })
    }

    pub fn group(logic: Logic, children: Vec<Condition>) -> Self {
        Self::Group { logic, children }
    }

    /// Pure evaluation. Every child of a group is evaluated.
    pub fn evaluate(&self, props: &PropertyManager) -> bool {
        match self {
            Self::Test {
                lhs,
                comparator,
                rhs,
            } => comparator.apply(lhs.value(props), rhs.value(props)),
            Self::Group { logic, children } => {
                let results = children.iter().map(|c| c.evaluate(props));
                match logic {
                    Logic::And => results.fold(true, |acc, r| acc & r),
                    Logic::Or => results.fold(false, |acc, r| acc | r),
                }
            }
        }
    }

    /// Number of leaf tests in the tree.
    pub fn test_count(&self) -> usize {
        match self {
            Self::Test { .. } => 1,
            Self::Group { children, .. } => children.iter().map(Self::test_count).sum(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test {
                lhs,
                comparator,
                rhs,
            } => write!(f, "{lhs} {comparator} {rhs}"),
            Self::Group { logic, children } => {
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {logic} ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    }
}
