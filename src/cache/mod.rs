//! Two-tier program cache.
//!
//! Programs are looked up by [`ProgramKey`] in memory first. On a miss the
//! sources are preprocessed and hashed; a persisted binary whose stored
//! hash matches is loaded directly, anything else is compiled from source
//! and written back to the store.

mod codec;
mod hash;
mod key;
mod store;

use std::collections::hash_map::Entry;

pub use codec::{decode_binary, encode_binary};
pub use hash::{hash_sources, program_hash};
pub use key::{ProgramKey, ProgramRequest};
use rustc_hash::FxHashMap;
pub use store::{
    stored_keys, CompiledProgramRecord, MemoryStore, ProgramStore,
    SettingsStore,
};

use crate::error::GlError;
use crate::gpu::Driver;
use crate::options::Options;
use crate::program::Program;
use crate::shader::{Shader, ShaderPreprocessor, ShaderSource};

/// Compiled programs of one context, backed by an optional persisted store.
#[derive(Debug)]
pub struct ProgramCache {
    preprocessor: ShaderPreprocessor,
    programs: FxHashMap<ProgramKey, Program>,
    store: Option<Box<dyn ProgramStore>>,
    permissive: bool,
    driver_fingerprint: bool,
}

impl ProgramCache {
    /// Cache over `preprocessor`. Without a store only the memory tier is
    /// used. Setters are permissive and hashes include the driver
    /// fingerprint until configured otherwise.
    #[must_use]
    pub fn new(
        preprocessor: ShaderPreprocessor,
        store: Option<Box<dyn ProgramStore>>,
    ) -> Self {
        Self {
            preprocessor,
            programs: FxHashMap::default(),
            store,
            permissive: true,
            driver_fingerprint: true,
        }
    }

    /// Cache configured from [`Options`]. If the settings store cannot be
    /// opened the cache falls back to a volatile store.
    #[must_use]
    pub fn from_options(options: &Options) -> Self {
        let cache = &options.cache;
        let store: Option<Box<dyn ProgramStore>> = if cache.persist {
            let opened = match &cache.store_path {
                Some(path) => SettingsStore::open(path),
                None => SettingsStore::for_application(
                    &cache.organization,
                    &cache.application,
                ),
            };
            Some(match opened {
                Ok(store) => Box::new(store),
                Err(e) => {
                    log::warn!("program store unavailable, not persisting: {e}");
                    Box::new(MemoryStore::new())
                }
            })
        } else {
            None
        };

        Self::new(ShaderPreprocessor::from_options(&options.shaders), store)
            .with_permissive(options.bindings.permissive)
            .with_driver_fingerprint(cache.driver_fingerprint)
    }

    /// Ignore unknown uniform and attribute names in programs created from
    /// now on.
    #[must_use]
    pub const fn with_permissive(mut self, permissive: bool) -> Self {
        self.permissive = permissive;
        self
    }

    /// Mix the driver identification into program hashes.
    #[must_use]
    pub const fn with_driver_fingerprint(mut self, enabled: bool) -> Self {
        self.driver_fingerprint = enabled;
        self
    }

    /// Whether setters ignore unknown names.
    #[must_use]
    pub const fn permissive(&self) -> bool {
        self.permissive
    }

    /// Source preprocessor.
    #[must_use]
    pub const fn preprocessor(&self) -> &ShaderPreprocessor {
        &self.preprocessor
    }

    /// Mutable preprocessor, to register generated includes.
    pub fn preprocessor_mut(&mut self) -> &mut ShaderPreprocessor {
        &mut self.preprocessor
    }

    /// Persisted store, if any.
    #[must_use]
    pub fn store(&self) -> Option<&dyn ProgramStore> {
        self.store.as_deref()
    }

    /// Program for `request`, made the active program.
    ///
    /// # Errors
    ///
    /// Preprocessing errors ([`GlError::Io`],
    /// [`GlError::UnknownShaderExtension`]) and compile, link or validation
    /// errors. A corrupt or rejected stored binary is not an error; the
    /// program is recompiled and the record replaced.
    pub fn get_program(
        &mut self,
        gl: &dyn Driver,
        request: &ProgramRequest,
    ) -> Result<&Program, GlError> {
        let Self {
            preprocessor,
            programs,
            store,
            permissive,
            driver_fingerprint,
        } = self;

        let program = match programs.entry(request.key()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let sources = load_sources(preprocessor, request)?;
                let program = match store.as_deref_mut() {
                    Some(store) => {
                        let fingerprint = driver_fingerprint
                            .then(|| gl.driver_info().fingerprint());
                        let hash = hash_sources(&sources, fingerprint.as_deref());
                        load_or_compile(
                            gl,
                            store,
                            entry.key(),
                            &hash,
                            &sources,
                            request,
                            *permissive,
                        )?
                    }
                    None => compile(gl, &sources, request, *permissive)?,
                };
                entry.insert(program)
            }
        };

        program.bind(gl);
        Ok(program)
    }

    /// Compile `request` from source, bypassing both tiers. The caller owns
    /// the returned program.
    ///
    /// # Errors
    ///
    /// As [`ProgramCache::get_program`].
    pub fn compile_program(
        &mut self,
        gl: &dyn Driver,
        request: &ProgramRequest,
    ) -> Result<Program, GlError> {
        let sources = load_sources(&mut self.preprocessor, request)?;
        compile(gl, &sources, request, self.permissive)
    }

    /// Hash that a persisted record for `request` must carry.
    ///
    /// # Errors
    ///
    /// Preprocessing errors.
    pub fn program_hash(
        &mut self,
        gl: &dyn Driver,
        request: &ProgramRequest,
    ) -> Result<String, GlError> {
        let fingerprint =
            self.driver_fingerprint.then(|| gl.driver_info().fingerprint());
        program_hash(
            &mut self.preprocessor,
            request.filenames(),
            request.substitutions(),
            fingerprint.as_deref(),
        )
    }

    /// Whether `request` is in the memory tier.
    #[must_use]
    pub fn contains(&self, request: &ProgramRequest) -> bool {
        self.programs.contains_key(&request.key())
    }

    /// Number of programs in the memory tier.
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether the memory tier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Delete every program in the memory tier. Persisted records stay.
    pub fn clear_memory(&mut self, gl: &dyn Driver) {
        for (_, program) in self.programs.drain() {
            program.destroy(gl);
        }
    }

    /// Delete every program and drop the cache.
    pub fn destroy(mut self, gl: &dyn Driver) {
        self.clear_memory(gl);
    }
}

fn load_sources(
    preprocessor: &mut ShaderPreprocessor,
    request: &ProgramRequest,
) -> Result<Vec<ShaderSource>, GlError> {
    request
        .filenames()
        .iter()
        .map(|name| preprocessor.load(name, request.substitutions()))
        .collect()
}

fn load_or_compile(
    gl: &dyn Driver,
    store: &mut dyn ProgramStore,
    key: &ProgramKey,
    hash: &str,
    sources: &[ShaderSource],
    request: &ProgramRequest,
    permissive: bool,
) -> Result<Program, GlError> {
    match CompiledProgramRecord::load(store, key) {
        Some(record) if record.hash == hash => {
            let loaded = record
                .decode()
                .and_then(|binary| Program::from_binary(gl, &binary, permissive));
            match loaded {
                Ok(program) => {
                    log::debug!("loaded program {key} from store");
                    return Ok(program);
                }
                Err(e) => log::warn!("discarding stored program {key}: {e}"),
            }
        }
        Some(_) => log::debug!("stored program {key} is stale"),
        None => {}
    }

    let program = compile(gl, sources, request, permissive)?;
    match program.binary(gl) {
        Some(binary) => {
            let saved = CompiledProgramRecord::encode(hash.to_owned(), &binary)
                .and_then(|record| record.save(store, key));
            if let Err(e) = saved {
                log::warn!("could not persist program {key}: {e}");
            }
        }
        None => log::debug!("driver returned no binary for {key}"),
    }
    Ok(program)
}

fn compile(
    gl: &dyn Driver,
    sources: &[ShaderSource],
    request: &ProgramRequest,
    permissive: bool,
) -> Result<Program, GlError> {
    log::info!(
        "compiling {:?} feedback={:?} substitutions={:?}",
        request.filenames(),
        request.feedback(),
        request.substitutions().iter().collect::<Vec<_>>(),
    );

    let mut shaders = Vec::with_capacity(sources.len());
    for source in sources {
        match Shader::from_source(gl, source) {
            Ok(shader) => shaders.push(shader),
            Err(e) => {
                for shader in shaders {
                    shader.destroy(gl);
                }
                return Err(e);
            }
        }
    }
    Program::link(gl, shaders, request.feedback(), permissive)
}
