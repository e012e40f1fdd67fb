//! `{include name}` and `{token}` expansion for shader sources.
//!
//! Expansion is literal text replacement in two phases: includes first,
//! then caller tokens, so tokens used inside include files are substituted
//! too. Each phase is one left-to-right scan and never looks at text it has
//! just inserted. Placeholders that resolve to nothing stay in the output
//! verbatim; the GLSL compiler reports them.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::{ShaderSource, ShaderStage};
use crate::error::GlError;
use crate::options::ShaderOptions;

const INCLUDE_PREFIX: &str = "include ";

/// Named token values for `{token}` placeholders, kept sorted by name so
/// they hash and key identically regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Substitutions(BTreeMap<String, String>);

impl Substitutions {
    /// No substitutions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Substitutions::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Display) -> Self {
        let _ = self.insert(name, value);
        self
    }

    /// Set `name` to the string form of `value`, returning the old value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Display,
    ) -> Option<String> {
        self.0.insert(name.into(), value.to_string())
    }

    /// Value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no tokens are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for Substitutions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut subs = Self::new();
        for (name, value) in iter {
            let _ = subs.insert(name, value);
        }
        subs
    }
}

/// Include name to include contents.
///
/// Holds two layers: files scanned from the include directory (rebuilt on
/// every scan) and generated code registered by the application. A scanned
/// file shadows a generated include of the same name.
#[derive(Debug, Clone, Default)]
pub struct IncludeTable {
    scanned: FxHashMap<String, String>,
    generated: FxHashMap<String, String>,
}

impl IncludeTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.scanned
            .get(name)
            .or_else(|| self.generated.get(name))
            .map(String::as_str)
    }

    /// Register generated code under `name`, returning the previous code.
    pub fn insert_generated(
        &mut self,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> Option<String> {
        self.generated.insert(name.into(), code.into())
    }

    /// Drop a generated include.
    pub fn remove_generated(&mut self, name: &str) -> Option<String> {
        self.generated.remove(name)
    }

    /// Replace the scanned layer with every `*.<extension>` file in `dir`,
    /// keyed by file name. A missing directory leaves the layer empty.
    ///
    /// # Errors
    ///
    /// [`GlError::Io`] if the directory or an include file cannot be read.
    pub fn rescan(&mut self, dir: &Path, extension: &str) -> Result<usize, GlError> {
        self.scanned.clear();

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(GlError::io(dir, e)),
        };

        for entry in entries {
            let path = entry.map_err(|e| GlError::io(dir, e))?.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(extension)
            {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let code =
                fs::read_to_string(&path).map_err(|e| GlError::io(&path, e))?;
            let _ = self.scanned.insert(name.to_owned(), code);
        }

        Ok(self.scanned.len())
    }

    /// Number of distinct include names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scanned.len()
            + self
                .generated
                .keys()
                .filter(|k| !self.scanned.contains_key(*k))
                .count()
    }

    /// Whether no includes are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scanned.is_empty() && self.generated.is_empty()
    }

    /// All include names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .scanned
            .keys()
            .chain(self.generated.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Reads shader files from a shader directory and expands their
/// placeholders.
#[derive(Debug, Clone)]
pub struct ShaderPreprocessor {
    shader_dir: PathBuf,
    include_dir: PathBuf,
    include_extension: String,
    includes: IncludeTable,
}

impl ShaderPreprocessor {
    /// Preprocessor reading shaders and `*.inc` includes from `shader_dir`.
    #[must_use]
    pub fn new(shader_dir: impl Into<PathBuf>) -> Self {
        let shader_dir = shader_dir.into();
        Self {
            include_dir: shader_dir.clone(),
            shader_dir,
            include_extension: "inc".to_owned(),
            includes: IncludeTable::new(),
        }
    }

    /// Preprocessor configured from the `[shaders]` options section.
    #[must_use]
    pub fn from_options(options: &ShaderOptions) -> Self {
        let mut pre = Self::new(&options.shader_dir)
            .with_include_extension(&options.include_extension);
        if let Some(dir) = &options.include_dir {
            pre = pre.with_include_dir(dir);
        }
        pre
    }

    /// Look for include files in `dir` instead of the shader directory.
    #[must_use]
    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dir = dir.into();
        self
    }

    /// Treat files with `extension` (no dot) as includes.
    #[must_use]
    pub fn with_include_extension(mut self, extension: impl Into<String>) -> Self {
        self.include_extension = extension.into();
        self
    }

    /// Directory shader file names are resolved against.
    #[must_use]
    pub fn shader_dir(&self) -> &Path {
        &self.shader_dir
    }

    /// Directory scanned for include files.
    #[must_use]
    pub fn include_dir(&self) -> &Path {
        &self.include_dir
    }

    /// The include table as of the last scan.
    #[must_use]
    pub const fn includes(&self) -> &IncludeTable {
        &self.includes
    }

    /// Make generated code available as `{include <name>}`.
    pub fn register_include(&mut self, name: impl Into<String>, code: impl Into<String>) {
        let name = name.into();
        if self.includes.insert_generated(name.clone(), code).is_some() {
            log::debug!("replaced generated include '{name}'");
        }
    }

    /// Forget a generated include. Returns whether it existed.
    pub fn remove_include(&mut self, name: &str) -> bool {
        self.includes.remove_generated(name).is_some()
    }

    /// Read `filename` from the shader directory and expand it.
    ///
    /// The include directory is rescanned first, so include files added or
    /// edited since the last call are picked up.
    ///
    /// # Errors
    ///
    /// [`GlError::Io`] if the shader file, the include directory or an
    /// include file cannot be read.
    pub fn read_source(
        &mut self,
        filename: &str,
        substitutions: &Substitutions,
    ) -> Result<String, GlError> {
        let path = self.shader_dir.join(filename);
        let code = fs::read_to_string(&path).map_err(|e| GlError::io(&path, e))?;

        let found = self
            .includes
            .rescan(&self.include_dir, &self.include_extension)?;
        log::debug!(
            "scanned {found} include files in {}",
            self.include_dir.display()
        );

        Ok(self.preprocess_str(&code, substitutions))
    }

    /// Read and expand `filename`, tagging it with its pipeline stage.
    ///
    /// # Errors
    ///
    /// [`GlError::UnknownShaderExtension`] before any file is touched if the
    /// extension names no stage; otherwise as [`Self::read_source`].
    pub fn load(
        &mut self,
        filename: &str,
        substitutions: &Substitutions,
    ) -> Result<ShaderSource, GlError> {
        let stage = ShaderStage::from_filename(filename)?;
        let code = self.read_source(filename, substitutions)?;
        Ok(ShaderSource {
            filename: filename.to_owned(),
            stage,
            code,
        })
    }

    /// Expand in-memory `code` against the current include table.
    #[must_use]
    pub fn preprocess_str(&self, code: &str, substitutions: &Substitutions) -> String {
        let included = expand(code, |inner| {
            inner
                .strip_prefix(INCLUDE_PREFIX)
                .and_then(|name| self.includes.get(name))
        });
        if substitutions.is_empty() {
            return included;
        }
        expand(&included, |inner| substitutions.get(inner))
    }
}

/// Replace every `{inner}` for which `resolve` yields text. Inserted text is
/// copied through without being scanned again.
fn expand<'t>(code: &str, resolve: impl Fn(&str) -> Option<&'t str>) -> String {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replacement = after
            .find(['{', '}'])
            .filter(|&end| after.as_bytes()[end] == b'}')
            .and_then(|end| resolve(&after[..end]).map(|text| (text, end)));

        match replacement {
            Some((text, end)) => {
                out.push_str(text);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
