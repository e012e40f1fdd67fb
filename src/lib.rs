// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! OpenGL binding layer for the finite-element visualization GUI.
//!
//! Wraps driver handles (shaders, programs, vertex arrays, buffers,
//! textures, timer queries) in small typed objects and keeps a two-tier
//! cache of linked shader programs: in process memory, and persisted as
//! driver program binaries in a settings store so that a cold start can
//! skip source compilation.
//!
//! # Key entry points
//!
//! - [`cache::ProgramCache`] - compile-or-load programs by shader file set
//! - [`shader::ShaderPreprocessor`] - `{include name}` / `{token}`
//!   expansion
//! - [`program::Program`] - linked program with type-checked uniform and
//!   attribute setters
//! - [`gpu::Driver`] - the driver seam; [`gpu::GlowDriver`] implements it
//!   over a `glow` context
//! - [`options::Options`] - runtime configuration (shader directories,
//!   cache location, binding strictness)
//!
//! # Threading
//!
//! Everything here runs on the thread that owns the GL context. Nothing is
//! `Sync`; the cache and preprocessor are plain owned values.

pub mod cache;
pub mod error;
pub mod gpu;
pub mod options;
pub mod program;
pub mod shader;

pub use error::GlError;
