use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for kiln operations
#[derive(Error, Diagnostic, Debug)]
pub enum KilnError {
    #[error("IO error: {0}")]
    #[diagnostic(code(kiln::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(kiln::io))]
    Io { path: PathBuf, message: String },

    #[error("Parse error: {message}")]
    #[diagnostic(code(kiln::parse))]
    Parse {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Plugin dependency graph contains a cycle. Reported before any
    /// plugin lifecycle phase runs.
    #[error("Circular plugin dependency: {cycle}")]
    #[diagnostic(code(kiln::plugin::cycle))]
    CyclicDependency { cycle: String },

    /// A plugin declared a dependency on a name nobody registered.
    #[error("Plugin '{plugin}' depends on unknown plugin '{dependency}'")]
    #[diagnostic(code(kiln::plugin::unknown_dependency))]
    UnknownDependency { plugin: String, dependency: String },

    /// A sprite strip whose pixel dimensions disagree with its filename.
    #[error("Invalid dimensions for {path}: {message}")]
    #[diagnostic(code(kiln::sprite::dimensions))]
    InvalidDimensions { path: PathBuf, message: String },

    /// A layered document frame with no diffuse cel.
    #[error("Missing diffuse layer in {path}: {message}")]
    #[diagnostic(code(kiln::sprite::missing_diffuse))]
    MissingDiffuseLayer { path: PathBuf, message: String },

    /// A file in a sheet directory that is neither a static strip nor a
    /// layered document.
    #[error("Unrecognized sprite source: {path}")]
    #[diagnostic(
        code(kiln::sprite::format),
        help("static strips are named <name>-<W>x<H>.png; layered documents end in .sprite.json")
    )]
    UnknownSpriteFormat { path: PathBuf },

    #[error("Build error: {message}")]
    #[diagnostic(code(kiln::build))]
    Build {
        message: String,
        #[help]
        help: Option<String>,
    },
}

pub type Result<T> = std::result::Result<T, KilnError>;
