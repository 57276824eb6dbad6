//! Archive extraction capabilities

use crate::errors::ExtractionError;
use jbup_config::ExtractorKind;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::Command;

pub trait ArchiveExtractor {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    /// Unpack `archive` into the existing directory `into`
    fn extract(&self, archive: &Path, into: &Path) -> Result<(), ExtractionError>;
}

/// In-process extraction with the `zip` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn extract(&self, archive: &Path, into: &Path) -> Result<(), ExtractionError> {
        let file = File::open(archive)?;
        let mut zip = zip::ZipArchive::new(BufReader::new(file))?;
        tracing::debug!("extracting {} entries from {}", zip.len(), archive.display());
        zip.extract(into)?;
        Ok(())
    }
}

/// Shells out to `unzip -qq -o <archive> -d <into>`
#[derive(Debug, Default, Clone, Copy)]
pub struct UnzipCommand;

const UNZIP: &str = "unzip";

impl ArchiveExtractor for UnzipCommand {
    fn name(&self) -> &'static str {
        UNZIP
    }

    fn extract(&self, archive: &Path, into: &Path) -> Result<(), ExtractionError> {
        let unzip = which::which(UNZIP).map_err(|_| ExtractionError::Unavailable { tool: UNZIP })?;
        tracing::debug!("running {} on {}", unzip.display(), archive.display());

        let output = Command::new(&unzip)
            .arg("-qq")
            .arg("-o")
            .arg(archive)
            .arg("-d")
            .arg(into)
            .output()?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ExtractionError::Failed {
                tool: UNZIP,
                archive: archive.to_path_buf(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

pub fn extractor_for(kind: ExtractorKind) -> Box<dyn ArchiveExtractor> {
    match kind {
        ExtractorKind::Builtin => Box::new(ZipExtractor),
        ExtractorKind::Unzip => Box::new(UnzipCommand),
    }
}
