//! The compile and link build steps.

use std::fs;
use std::path::{Path, PathBuf};

use crossbind_api::producer::find_fragment_manifests;
use crossbind_api::{FragmentProducer, ManifestProducer, manifest};
use tracing::{debug, info};

use crate::args::{CompileArgs, LinkArgs};
use crate::error::CliError;

/// Produce one platform's fragment manifest into the intermediate
/// directory. Returns the path written.
pub fn compile(args: &CompileArgs) -> Result<PathBuf, CliError> {
    let producer = ManifestProducer::new(&args.source);
    let fragment = producer.produce(args.platform)?;
    info!(
        platform = %args.platform,
        configuration = %args.configuration(),
        types = fragment.type_count(),
        "compiled fragment"
    );

    let path = match &args.output {
        Some(path) => path.clone(),
        None => {
            ensure_dir(&args.intermediate)?;
            args.intermediate.join(ManifestProducer::manifest_name(args.platform))
        },
    };
    manifest::save_fragment(&fragment, &path)?;
    info!(path = %path.display(), "wrote fragment manifest");
    Ok(path)
}

/// Link the fragments found in the intermediate directories and write
/// the merged manifest for the target. Returns the path written.
pub fn link(args: &LinkArgs) -> Result<PathBuf, CliError> {
    let mut fragments = Vec::new();
    for dir in &args.intermediates {
        for path in manifests_in(dir)? {
            let fragment = manifest::load_fragment(&path)?;
            debug!(path = %path.display(), platform = %fragment.platform, "loaded fragment");
            fragments.push(fragment);
        }
    }
    if fragments.is_empty() {
        return Err(CliError::NoFragments);
    }

    let linked = crossbind_linker::link(fragments)?;
    info!(
        target = %args.target,
        configuration = %args.configuration(),
        platforms = %linked.platforms.names(),
        types = linked.types.len(),
        "linked fragments"
    );

    let path = match &args.output {
        Some(path) => path.clone(),
        None => PathBuf::from(format!("{}-api.xml", args.target)),
    };
    manifest::save_linked(&linked, &path)?;
    info!(path = %path.display(), "wrote merged manifest");
    Ok(path)
}

fn manifests_in(dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    find_fragment_manifests(dir)
        .map_err(|source| CliError::Io { path: dir.display().to_string(), source })
}

fn ensure_dir(dir: &Path) -> Result<(), CliError> {
    fs::create_dir_all(dir)
        .map_err(|source| CliError::Io { path: dir.display().to_string(), source })
}
