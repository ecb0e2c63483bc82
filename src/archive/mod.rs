use flate2::read::GzDecoder;
use log::debug;
use std::io::Read;
use tar::{Archive, EntryType};

use crate::error::InstallError;

/// Pull the single executable named `name` out of a `.tar.gz` archive.
///
/// The entry may sit at any depth (`mitt` or `mitt-linux-x86_64/mitt`).
/// Zero matches, more than one match, or a match that is not a regular
/// file are all `ExtractionError`s.
#[tracing::instrument(skip(archive))]
pub fn extract_executable(archive: &[u8], name: &str) -> Result<Vec<u8>, InstallError> {
    let fail = |msg: String| InstallError::ExtractionError(msg);

    let mut tar = Archive::new(GzDecoder::new(archive));
    let entries = tar
        .entries()
        .map_err(|e| fail(format!("failed to read archive: {}", e)))?;

    let mut found: Option<Vec<u8>> = None;
    let mut seen = 0usize;

    for entry in entries {
        let mut entry = entry.map_err(|e| fail(format!("failed to read archive entry: {}", e)))?;
        let path = entry
            .path()
            .map_err(|e| fail(format!("invalid entry path: {}", e)))?
            .into_owned();

        seen += 1;
        if path.file_name().and_then(|f| f.to_str()) != Some(name) {
            debug!("Skipping archive entry {:?}", path);
            continue;
        }

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            debug!("Skipping directory entry {:?}", path);
            continue;
        }
        if !matches!(entry_type, EntryType::Regular | EntryType::Continuous) {
            return Err(fail(format!("{:?} is not a regular file", path)));
        }
        if found.is_some() {
            return Err(fail(format!(
                "archive contains more than one '{}' entry",
                name
            )));
        }

        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut contents)
            .map_err(|e| fail(format!("failed to read {:?}: {}", path, e)))?;
        debug!("Found {:?} ({} bytes)", path, contents.len());
        found = Some(contents);
    }

    found.ok_or_else(|| {
        if seen == 0 {
            fail("archive is empty".to_string())
        } else {
            fail(format!("archive does not contain '{}'", name))
        }
    })
}
