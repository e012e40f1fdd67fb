//! Content hashes of preprocessed program sources.

use sha2::{Digest, Sha256};

use crate::error::GlError;
use crate::shader::{ShaderPreprocessor, ShaderSource, Substitutions};

/// SHA-256 over each source's file name followed by its text, in file name
/// order, then over `fingerprint` if given. Lowercase hex.
#[must_use]
pub fn hash_sources(sources: &[ShaderSource], fingerprint: Option<&str>) -> String {
    let mut ordered: Vec<&ShaderSource> = sources.iter().collect();
    ordered.sort_by(|a, b| a.filename.cmp(&b.filename));

    let mut hasher = Sha256::new();
    for source in ordered {
        hasher.update(source.filename.as_bytes());
        hasher.update(source.code.as_bytes());
    }
    if let Some(fingerprint) = fingerprint {
        hasher.update(fingerprint.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Preprocess every file in `filenames` and hash the result.
///
/// # Errors
///
/// Any error of [`ShaderPreprocessor::load`].
pub fn program_hash(
    preprocessor: &mut ShaderPreprocessor,
    filenames: &[String],
    substitutions: &Substitutions,
    fingerprint: Option<&str>,
) -> Result<String, GlError> {
    let sources = filenames
        .iter()
        .map(|name| preprocessor.load(name, substitutions))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(hash_sources(&sources, fingerprint))
}
