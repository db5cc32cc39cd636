//! Named-blob storage (spec.md §1 non-goals: "no filesystem semantics
//! beyond open/read/write/unlink a named blob"). The real backing store
//! (SPIFFS/LittleFS on the board) is an external collaborator; only this
//! narrow contract is fixed, expressed as the [`BlobStore`] trait.

use crate::error::TransientError;
use crate::util::crc32;

#[derive(Debug, Clone, PartialEq)]
pub struct BlobInfo {
    pub name: String,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FsUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

pub trait BlobStore: Send {
    fn read(&self, name: &str, offset: usize, length: usize) -> Result<Vec<u8>, TransientError>;
    fn write(&mut self, name: &str, offset: usize, bytes: &[u8]) -> Result<(), TransientError>;
    fn erase(&mut self, name: &str) -> Result<(), TransientError>;
    fn list(&self) -> Vec<BlobInfo>;
    fn checksum(&self, name: &str) -> Result<u32, TransientError>;
    fn format(&mut self);
    fn usage(&self) -> FsUsage;
}

/// In-memory `BlobStore` for host tests and as the pre-NVS/SPIFFS default.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: std::collections::BTreeMap<String, Vec<u8>>,
    capacity_bytes: u64,
}

impl MemoryBlobStore {
    pub fn new(capacity_bytes: u64) -> Self {
        Self { blobs: std::collections::BTreeMap::new(), capacity_bytes }
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, name: &str, offset: usize, length: usize) -> Result<Vec<u8>, TransientError> {
        let blob = self.blobs.get(name).ok_or(TransientError::BlobNotFound)?;
        let start = offset.min(blob.len());
        let end = (start + length).min(blob.len());
        Ok(blob[start..end].to_vec())
    }

    fn write(&mut self, name: &str, offset: usize, bytes: &[u8]) -> Result<(), TransientError> {
        let blob = self.blobs.entry(name.to_string()).or_default();
        let end = offset + bytes.len();
        if blob.len() < end {
            blob.resize(end, 0);
        }
        blob[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    fn erase(&mut self, name: &str) -> Result<(), TransientError> {
        self.blobs.remove(name).ok_or(TransientError::BlobNotFound)?;
        Ok(())
    }

    fn list(&self) -> Vec<BlobInfo> {
        self.blobs.iter().map(|(name, bytes)| BlobInfo { name: name.clone(), size: bytes.len() }).collect()
    }

    fn checksum(&self, name: &str) -> Result<u32, TransientError> {
        let blob = self.blobs.get(name).ok_or(TransientError::BlobNotFound)?;
        Ok(crc32(0, blob))
    }

    fn format(&mut self) {
        self.blobs.clear();
    }

    fn usage(&self) -> FsUsage {
        let used: u64 = self.blobs.values().map(|b| b.len() as u64).sum();
        FsUsage { total_bytes: self.capacity_bytes, used_bytes: used }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_roundtrips() {
        let mut store = MemoryBlobStore::new(65536);
        store.write("cal.json", 0, b"{\"k\":1}").unwrap();
        assert_eq!(store.read("cal.json", 0, 7).unwrap(), b"{\"k\":1}");
    }

    #[test]
    fn read_zero_length_succeeds_and_is_empty() {
        let mut store = MemoryBlobStore::new(65536);
        store.write("a", 0, b"hello").unwrap();
        assert_eq!(store.read("a", 0, 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn missing_blob_is_not_found() {
        let store = MemoryBlobStore::new(65536);
        assert_eq!(store.read("nope", 0, 1), Err(TransientError::BlobNotFound));
        assert_eq!(store.checksum("nope"), Err(TransientError::BlobNotFound));
    }

    #[test]
    fn erase_removes_blob_from_listing() {
        let mut store = MemoryBlobStore::new(65536);
        store.write("a", 0, b"1").unwrap();
        store.write("b", 0, b"22").unwrap();
        store.erase("a").unwrap();
        let listed = store.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "b");
    }

    #[test]
    fn format_clears_everything() {
        let mut store = MemoryBlobStore::new(65536);
        store.write("a", 0, b"1").unwrap();
        store.format();
        assert!(store.list().is_empty());
    }

    #[test]
    fn write_at_offset_extends_blob() {
        let mut store = MemoryBlobStore::new(65536);
        store.write("a", 0, b"hello").unwrap();
        store.write("a", 5, b" world").unwrap();
        assert_eq!(store.read("a", 0, 11).unwrap(), b"hello world");
    }
}
