use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::VirtualFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArchive {
    pub path: PathBuf,
    pub sha256: String,
    pub entries: Vec<String>,
}

pub fn write_zip_archive(path: &Path, files: &[VirtualFile]) -> HarnessResult<BuiltArchive> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| HarnessError::fixture_io(parent, source))?;
    }
    let file = File::create(path).map_err(|source| HarnessError::fixture_io(path, source))?;
    let mut writer = ZipWriter::new(file);
    let mut entries = Vec::with_capacity(files.len());

    for entry in files {
        let mode = if entry.executable { 0o755 } else { 0o644 };
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(mode);
        writer.start_file(entry.path.as_str(), options)?;
        writer
            .write_all(entry.body.as_bytes())
            .map_err(|source| HarnessError::fixture_io(path, source))?;
        entries.push(entry.path.clone());
    }
    writer.finish()?;

    let bytes = fs::read(path).map_err(|source| HarnessError::fixture_io(path, source))?;
    Ok(BuiltArchive {
        path: path.to_path_buf(),
        sha256: sha256_hex(bytes.as_slice()),
        entries,
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}
