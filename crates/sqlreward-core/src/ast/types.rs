//! Type names appearing in CAST expressions.

use std::fmt;

/// A target type of a CAST, kept as written (`VARCHAR(20)`, `DECIMAL(10, 2)`).
///
/// Type names are not interpreted; equality is on the upper-cased name and
/// its numeric parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    /// Type name words, upper-cased and space-separated (`DOUBLE PRECISION`).
    pub name: String,
    /// Numeric parameters, e.g. length or precision/scale.
    pub params: Vec<i64>,
}

impl TypeName {
    /// Creates a type name without parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
            write!(f, "({})", params.join(", "))?;
        }
        Ok(())
    }
}
