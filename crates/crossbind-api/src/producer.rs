//! The reflector boundary.
//!
//! Native-source reflection is an external collaborator: something
//! that reads one platform's sources (or build output) and produces a
//! [`Fragment`]. The core never depends on a specific native parser;
//! it depends on this trait, the way the transport seam abstracts the
//! network elsewhere.
//!
//! Reflectors own the naming conventions of their platform. In
//! particular, nested native types must be flattened into a single
//! qualified name (see [`flatten_nested_name`]) before the fragment is
//! constructed; the schema model has no notion of nesting.

use std::path::{Path, PathBuf};

use crate::fragment::Fragment;
use crate::manifest::{self, ManifestError};
use crate::platform::Platform;

/// Produces one platform's schema fragment.
pub trait FragmentProducer {
    /// Error raised when the platform's sources cannot be reflected.
    type Error: std::error::Error + Send + 'static;

    /// Produce the fragment for `platform`.
    fn produce(&self, platform: Platform) -> Result<Fragment, Self::Error>;
}

/// Join a declaring type's short name and a nested type's name into
/// the flattened name used in fragments.
///
/// `TestOuter` + `TestInner` becomes `TestOuter_TestInner`. Applied by
/// reflectors before fragment construction.
#[must_use]
pub fn flatten_nested_name(outer: &str, inner: &str) -> String {
    format!("{outer}_{inner}")
}

/// A producer backed by a previously written manifest file.
///
/// The common case for the `link` step: each platform's compile step
/// has already reflected its sources and written
/// `<dir>/<platform>-api.xml`; linking only needs to load them back.
#[derive(Debug, Clone)]
pub struct ManifestProducer {
    dir: PathBuf,
}

impl ManifestProducer {
    /// A producer reading fragments from `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The manifest file name for `platform`.
    #[must_use]
    pub fn manifest_name(platform: Platform) -> String {
        format!("{platform}-api.xml")
    }

    /// The manifest path this producer reads for `platform`.
    #[must_use]
    pub fn manifest_path(&self, platform: Platform) -> PathBuf {
        self.dir.join(Self::manifest_name(platform))
    }
}

impl FragmentProducer for ManifestProducer {
    type Error = ManifestError;

    fn produce(&self, platform: Platform) -> Result<Fragment, Self::Error> {
        let path = self.manifest_path(platform);
        let fragment = manifest::load_fragment(&path)?;
        if fragment.platform != platform {
            return Err(ManifestError::PlatformMismatch {
                path: path.display().to_string(),
                expected: platform,
                found: fragment.platform,
            });
        }
        Ok(fragment)
    }
}

/// Find every fragment manifest (`*-api.xml`) in a directory.
///
/// Used by the CLI to discover the fragments an intermediate directory
/// holds without knowing which platforms were compiled into it.
pub fn find_fragment_manifests(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_manifest = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("-api.xml"));
        if is_manifest {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
