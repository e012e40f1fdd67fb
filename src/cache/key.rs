//! Program requests and their canonical cache keys.

use std::fmt::{self, Display, Write as _};

use crate::shader::Substitutions;

/// Everything that identifies a program: its stage files, the
/// transform-feedback outputs and the token substitutions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramRequest {
    filenames: Vec<String>,
    feedback: Vec<String>,
    substitutions: Substitutions,
}

impl ProgramRequest {
    /// Request for the given stage files. Order does not matter.
    #[must_use]
    pub fn new<I, S>(filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filenames: Vec<String> =
            filenames.into_iter().map(Into::into).collect();
        filenames.sort_unstable();
        filenames.dedup();
        Self {
            filenames,
            ..Self::default()
        }
    }

    /// Capture `names` into one interleaved transform-feedback buffer, in
    /// the given order.
    #[must_use]
    pub fn with_feedback<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feedback = names.into_iter().map(Into::into).collect();
        self
    }

    /// Add one `{name}` substitution.
    #[must_use]
    pub fn with_substitution(
        mut self,
        name: impl Into<String>,
        value: impl Display,
    ) -> Self {
        self.substitutions = self.substitutions.with(name, value);
        self
    }

    /// Replace all substitutions.
    #[must_use]
    pub fn with_substitutions(mut self, substitutions: Substitutions) -> Self {
        self.substitutions = substitutions;
        self
    }

    /// Stage files, sorted.
    #[must_use]
    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    /// Transform-feedback outputs in capture order.
    #[must_use]
    pub fn feedback(&self) -> &[String] {
        &self.feedback
    }

    /// Token substitutions.
    #[must_use]
    pub const fn substitutions(&self) -> &Substitutions {
        &self.substitutions
    }

    /// Canonical key of this request.
    #[must_use]
    pub fn key(&self) -> ProgramKey {
        let mut key = String::new();
        push_list(&mut key, self.filenames.iter().map(String::as_str), '+');
        if !self.feedback.is_empty() {
            key.push_str("|tf:");
            push_list(&mut key, self.feedback.iter().map(String::as_str), ',');
        }
        if !self.substitutions.is_empty() {
            key.push('|');
            for (i, (name, value)) in self.substitutions.iter().enumerate() {
                if i > 0 {
                    key.push(',');
                }
                escape_into(&mut key, name);
                key.push('=');
                escape_into(&mut key, value);
            }
        }
        ProgramKey(key)
    }
}

/// Unambiguous string form of a [`ProgramRequest`], e.g.
/// `mesh.frag+mesh.vert|tf:pos,id|ORDER=2`. Never contains `/`, so it can
/// prefix settings entries like `<key>/hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramKey(String);

impl ProgramKey {
    /// Key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn push_list<'a>(out: &mut String, items: impl Iterator<Item = &'a str>, sep: char) {
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push(sep);
        }
        escape_into(out, item);
    }
}

/// Percent-escape the separators so distinct requests never share a key.
fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '%' | '+' | '|' | ',' | '=' | ':' | '/' | '\\' => {
                let _ = write!(out, "%{:02X}", u32::from(c));
            }
            c if c.is_control() => {
                let _ = write!(out, "%{:02X}", u32::from(c));
            }
            c => out.push(c),
        }
    }
}
