use crate::error::{Error, Result};
use std::io::{BufWriter, Write};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Writes a ZIP archive out of whole directories
pub struct ZipPacker;

impl ZipPacker {
    /// Create (or replace) `archive_path` holding the regular files found
    /// directly inside each of `dirs`, directory by directory in the order
    /// given
    ///
    /// Entries are named `<dir name><separator><file name>`; files within a
    /// directory are written in name order and subdirectories are skipped.
    /// The archive is written to a `.part` sibling and renamed into place, so
    /// a failure leaves any previous archive untouched.
    /// Returns the entry names written.
    pub fn pack_directories(archive_path: &Path, dirs: &[&Path]) -> Result<Vec<String>> {
        let part_path = part_path(archive_path);
        let result = Self::write_archive(archive_path, &part_path, dirs).and_then(|entries| {
            std::fs::rename(&part_path, archive_path)?;
            Ok(entries)
        });

        match result {
            Ok(entries) => {
                info!(?archive_path, entry_count = entries.len(), "ZIP archive written");
                Ok(entries)
            }
            Err(e) => {
                if let Err(remove_err) = std::fs::remove_file(&part_path)
                    && remove_err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(path = ?part_path, error = %remove_err, "failed to remove partial archive");
                }
                Err(e)
            }
        }
    }

    fn write_archive(archive_path: &Path, part_path: &Path, dirs: &[&Path]) -> Result<Vec<String>> {
        let file = std::fs::File::create(part_path)?;
        let mut writer = ZipWriter::new(BufWriter::new(file));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut entries = Vec::new();

        for dir in dirs {
            let dir_name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::archive(
                        archive_path,
                        format!("cannot name entries after {}", dir.display()),
                    )
                })?;
            info!(?archive_path, dir = %dir.display(), "adding directory to archive");

            for file_path in regular_files(dir)? {
                let file_name = file_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let entry_name = format!("{}{}{}", dir_name, MAIN_SEPARATOR, file_name);

                writer
                    .start_file(entry_name.as_str(), options)
                    .map_err(|e| Error::archive(archive_path, e))?;
                let mut source = std::fs::File::open(&file_path)?;
                std::io::copy(&mut source, &mut writer)?;

                debug!(entry = %entry_name, "added archive entry");
                entries.push(entry_name);
            }
        }

        writer
            .finish()
            .map_err(|e| Error::archive(archive_path, e))?
            .flush()?;
        Ok(entries)
    }
}

/// `<archive>.part`, the name an archive is written under until complete
fn part_path(archive_path: &Path) -> PathBuf {
    let mut name = archive_path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn regular_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
