//! Office container opening.
//!
//! Legacy documents (.doc, .xls, .ppt) are compound files directly.
//! Macro-enabled OOXML documents (.docm, .xlsm, .pptm) are zip archives
//! carrying the compound file as a `vbaProject.bin` entry; when the
//! compound-file probe rejects the input, the zip path is tried before
//! giving up.

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use crate::cfb::file::CompoundFile;
use crate::cfb::tree::ContainerTree;
use crate::common::error::{Error, Result};
use crate::vba::VbaProject;

/// An opened Office container, fully materialized as a tree.
#[derive(Debug, Clone)]
pub struct OfficeContainer {
    tree: ContainerTree,
}

impl OfficeContainer {
    /// Open a container file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Open a container from any seekable reader. Direct compound files
    /// and zip archives wrapping a `vbaProject.bin` entry both work;
    /// anything else is [`Error::NotOfficeContainer`].
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self> {
        match CompoundFile::open(&mut reader) {
            Ok(cfb) => {
                return Ok(Self {
                    tree: cfb.into_tree()?,
                });
            }
            Err(Error::NotCompoundFile) => {}
            Err(err) => return Err(err),
        }

        reader.seek(SeekFrom::Start(0))?;
        let payload = vba_project_from_zip(reader)?;
        let cfb = CompoundFile::open(Cursor::new(payload))?;
        Ok(Self {
            tree: cfb.into_tree()?,
        })
    }

    pub fn tree(&self) -> &ContainerTree {
        &self.tree
    }

    /// Locate and parse the embedded VBA project. `None` when the
    /// container holds no macros at all.
    pub fn vba_project(&self) -> Option<VbaProject<'_>> {
        VbaProject::from_tree(&self.tree)
    }
}

/// Pull the `vbaProject.bin` entry out of a zip archive.
fn vba_project_from_zip<R: Read + Seek>(reader: R) -> Result<Vec<u8>> {
    let mut archive =
        zip::ZipArchive::new(reader).map_err(|_| Error::NotOfficeContainer)?;

    let entry_index = (0..archive.len()).find(|&i| {
        archive
            .by_index(i)
            .map(|entry| entry.name().to_lowercase().ends_with("vbaproject.bin"))
            .unwrap_or(false)
    });
    let Some(index) = entry_index else {
        return Err(Error::NotOfficeContainer);
    };

    let mut entry = archive
        .by_index(index)
        .map_err(|e| Error::Zip(e.to_string()))?;
    log::debug!("extracting zip entry {:?}", entry.name());
    let mut payload = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut payload)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::write::SimpleFileOptions;

    fn zip_with(entries: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            std::io::Write::write_all(&mut writer, data).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_not_cfb_not_zip() {
        let err = OfficeContainer::from_reader(Cursor::new(vec![0u8; 64])).unwrap_err();
        assert!(matches!(err, Error::NotOfficeContainer));
    }

    #[test]
    fn test_zip_without_vba_project_entry() {
        let mut zip = zip_with(&[("word/document.xml", b"<w:document/>")]);
        zip.set_position(0);
        let err = OfficeContainer::from_reader(zip).unwrap_err();
        assert!(matches!(err, Error::NotOfficeContainer));
    }

    #[test]
    fn test_zip_entry_found_but_not_compound() {
        // The fallback reaches the entry; its payload then fails the
        // compound-file probe
        let mut zip = zip_with(&[
            ("[Content_Types].xml", b"<Types/>"),
            ("xl/vbaProject.bin", b"this is not a compound file at all"),
        ]);
        zip.set_position(0);
        let err = OfficeContainer::from_reader(zip).unwrap_err();
        assert!(matches!(err, Error::NotCompoundFile));
    }

    #[test]
    fn test_zip_entry_name_is_case_insensitive() {
        let mut zip = zip_with(&[("XL/VBAProject.BIN", b"still not a compound file")]);
        zip.set_position(0);
        let err = OfficeContainer::from_reader(zip).unwrap_err();
        assert!(matches!(err, Error::NotCompoundFile));
    }

    #[test]
    fn test_open_missing_file() {
        let err = OfficeContainer::open("/nonexistent/no-such-file.doc").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
