use std::collections::HashSet;
use std::io::{Cursor, Write};

use sha2::{Digest, Sha256};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use super::model::DocumentError;

/// Builds ZIP archives entry by entry. Repeated names get a numeric suffix
/// so two learners sharing a name both end up in the archive.
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    names: HashSet<String>,
    entries: usize,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            names: HashSet::new(),
            entries: 0,
        }
    }

    fn unique_name(&mut self, file_name: &str) -> String {
        if self.names.insert(file_name.to_string()) {
            return file_name.to_string();
        }

        let (stem, extension) = match file_name.rsplit_once('.') {
            Some((stem, ext)) => (stem, format!(".{ext}")),
            None => (file_name, String::new()),
        };

        let mut n = 2;
        loop {
            let candidate = format!("{stem}_{n}{extension}");
            if self.names.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn add(&mut self, file_name: &str, content: &[u8]) -> Result<String, DocumentError> {
        let name = self.unique_name(file_name);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer.start_file(name.as_str(), options)?;
        self.writer.write_all(content)?;
        self.entries += 1;
        Ok(name)
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn finish(self) -> Result<Vec<u8>, DocumentError> {
        Ok(self.writer.finish()?.into_inner())
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn test_archive_keeps_entries_in_order() {
        let mut builder = ArchiveBuilder::new();
        builder.add("convention_generale.pdf", b"%PDF-a").unwrap();
        builder.add("contrat_dupont_marie.pdf", b"%PDF-b").unwrap();
        assert_eq!(builder.len(), 2);

        let bytes = builder.finish().unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.by_index(0).unwrap().name(), "convention_generale.pdf");

        let mut content = Vec::new();
        archive
            .by_name("contrat_dupont_marie.pdf")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"%PDF-b");
    }

    #[test]
    fn test_duplicate_names_are_suffixed() {
        let mut builder = ArchiveBuilder::new();
        assert_eq!(builder.add("convocation_kone_awa.pdf", b"1").unwrap(), "convocation_kone_awa.pdf");
        assert_eq!(builder.add("convocation_kone_awa.pdf", b"2").unwrap(), "convocation_kone_awa_2.pdf");
        assert_eq!(builder.add("convocation_kone_awa.pdf", b"3").unwrap(), "convocation_kone_awa_3.pdf");
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
