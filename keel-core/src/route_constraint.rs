//! Route constraints for placeholder values
//!
//! A placeholder written as `{name:constraint}` only matches path text
//! accepted by its constraint. Constraints are applied by the compiled
//! matcher itself, so a value that violates one simply does not match the
//! route and the scan moves on to the next definition.
//!
//! | tag            | accepts                                  |
//! |----------------|------------------------------------------|
//! | `any`          | one or more non-`/` characters (default) |
//! | `alpha`        | ASCII letters                            |
//! | `numeric`      | ASCII digits                             |
//! | `alphanumeric` | ASCII letters and digits                 |
//! | `slug`         | lowercase words joined by single hyphens |

use std::fmt;

/// A placeholder value constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Constraint {
    #[default]
    Any,
    Alpha,
    Numeric,
    AlphaNumeric,
    Slug,
}

impl Constraint {
    /// Look up a constraint by its pattern tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "any" => Some(Constraint::Any),
            "alpha" => Some(Constraint::Alpha),
            "numeric" => Some(Constraint::Numeric),
            "alphanumeric" => Some(Constraint::AlphaNumeric),
            "slug" => Some(Constraint::Slug),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Constraint::Any => "any",
            Constraint::Alpha => "alpha",
            Constraint::Numeric => "numeric",
            Constraint::AlphaNumeric => "alphanumeric",
            Constraint::Slug => "slug",
        }
    }

    /// Regex fragment for this constraint. Fragments contain no capture
    /// groups, so the compiled matcher has exactly one group per placeholder.
    pub fn fragment(&self) -> &'static str {
        match self {
            Constraint::Any => "[^/]+",
            Constraint::Alpha => "[A-Za-z]+",
            Constraint::Numeric => "[0-9]+",
            Constraint::AlphaNumeric => "[A-Za-z0-9]+",
            Constraint::Slug => "[a-z0-9]+(?:-[a-z0-9]+)*",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
