//! Headless front end for shader development.
//!
//! Expands shader sources, prints program hashes and inspects or clears the
//! persisted program store. None of the commands need a GL context.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use feviz_gl::cache::{program_hash, stored_keys, ProgramStore, SettingsStore};
use feviz_gl::options::{CacheOptions, Options};
use feviz_gl::shader::{ShaderPreprocessor, Substitutions};

#[derive(Parser, Debug)]
#[command(name = "feviz-gl")]
#[command(about = "Shader preprocessing and program cache tools")]
struct Args {
    /// Options file (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Shader directory, overriding the options file
    #[arg(long, global = true)]
    shader_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a shader file after include and token expansion
    Preprocess {
        /// Shader file relative to the shader directory
        file: String,
        /// Token substitution, NAME=VALUE
        #[arg(short = 'D', value_name = "NAME=VALUE")]
        define: Vec<String>,
    },
    /// Print the content hash of a set of shader files
    Hash {
        /// Shader files relative to the shader directory
        #[arg(required = true)]
        files: Vec<String>,
        /// Token substitution, NAME=VALUE
        #[arg(short = 'D', value_name = "NAME=VALUE")]
        define: Vec<String>,
    },
    /// Inspect the persisted program store
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Print the JSON schema of the options file
    Schema,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// List stored program keys
    List,
    /// Remove all stored programs
    Clear,
    /// Print the location of the settings file
    Path,
}

fn parse_defines(define: &[String]) -> anyhow::Result<Substitutions> {
    define
        .iter()
        .map(|d| match d.split_once('=') {
            Some((name, value)) if !name.is_empty() => Ok((name, value)),
            _ => bail!("expected NAME=VALUE, got {d:?}"),
        })
        .collect()
}

fn store_path(cache: &CacheOptions) -> anyhow::Result<PathBuf> {
    match &cache.store_path {
        Some(path) => Ok(path.clone()),
        None => SettingsStore::default_path(&cache.organization, &cache.application)
            .context("no user config directory on this platform"),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut options = match &args.config {
        Some(path) => Options::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Options::default(),
    };
    if let Some(dir) = args.shader_dir {
        options.shaders.shader_dir = dir;
    }

    let mut out = io::stdout().lock();
    match args.command {
        Command::Preprocess { file, define } => {
            let substitutions = parse_defines(&define)?;
            let mut preprocessor = ShaderPreprocessor::from_options(&options.shaders);
            let code = preprocessor.read_source(&file, &substitutions)?;
            out.write_all(code.as_bytes())?;
        }
        Command::Hash { files, define } => {
            let substitutions = parse_defines(&define)?;
            let mut preprocessor = ShaderPreprocessor::from_options(&options.shaders);
            // No context here, so no driver fingerprint either.
            let hash = program_hash(&mut preprocessor, &files, &substitutions, None)?;
            writeln!(out, "{hash}")?;
        }
        Command::Cache { action } => {
            let path = store_path(&options.cache)?;
            match action {
                CacheAction::Path => writeln!(out, "{}", path.display())?,
                CacheAction::List => {
                    let store = SettingsStore::open(&path)?;
                    for key in stored_keys(&store) {
                        writeln!(out, "{key}")?;
                    }
                }
                CacheAction::Clear => {
                    let mut store = SettingsStore::open(&path)?;
                    let count = stored_keys(&store).len();
                    store.clear()?;
                    log::info!("removed {count} programs from {}", path.display());
                }
            }
        }
        Command::Schema => {
            let schema = serde_json::to_string_pretty(&Options::json_schema())?;
            writeln!(out, "{schema}")?;
        }
    }
    Ok(())
}
