//! CLI failure modes.

use crossbind_api::manifest::ManifestError;
use crossbind_linker::LinkErrors;
use thiserror::Error;

/// A failure in a build step; any variant exits with status 1.
#[derive(Debug, Error)]
pub enum CliError {
    /// A manifest could not be read, parsed, or written.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The fragments conflict; no merged manifest was produced.
    #[error(transparent)]
    Link(#[from] LinkErrors),

    /// A directory could not be read or created.
    #[error("cannot access `{path}`: {source}")]
    Io {
        /// The offending path.
        path: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The intermediate directories held no fragment manifests.
    #[error("no fragment manifests found in the intermediate directories")]
    NoFragments,
}
