//! OTA update session state machine (spec.md §4.9). The flash writer and
//! partition table are external collaborators (spec.md §1); this module
//! owns the `ota-start`/`ota-write`/`ota-finish`/`ota-commit`/`ota-confirm`
//! protocol and the running SHA-256 hash.

use crate::error::TransientError;
use sha2::{Digest, Sha256};

/// The out-of-scope flash writer's control surface.
pub trait FlashWriter: Send {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransientError>;
    fn finalize(&mut self) -> Result<(), TransientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionInfo {
    pub label: &'static str,
    pub address: u32,
    pub size: u32,
    pub bootable: bool,
}

/// The out-of-scope partition table's control surface: which partition is
/// the next OTA target, and how to flip/verify/confirm the boot pointer.
pub trait PartitionTable: Send {
    fn next_update_partition(&self) -> PartitionInfo;
    fn stored_image_sha256(&self, partition: PartitionInfo) -> Result<[u8; 32], TransientError>;
    fn mark_boot_partition(&mut self, partition: PartitionInfo) -> Result<(), TransientError>;
    fn verify_image_metadata(&self, partition: PartitionInfo) -> Result<(), TransientError>;
    fn cancel_rollback(&mut self) -> Result<(), TransientError>;
    fn all_partitions(&self) -> Vec<PartitionInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaState {
    Idle,
    Writing,
    Finished,
    Committed,
    Confirmed,
}

#[derive(Debug, thiserror::Error)]
pub enum OtaError {
    #[error("image too large for partition")]
    TooLarge,
    #[error("a session is already active")]
    AlreadyActive,
    #[error("no active session")]
    NoActiveSession,
    #[error("command invalid in current state")]
    WrongState,
    #[error("chunk length does not match oob length")]
    LengthMismatch,
    #[error("checksum chunk must be exactly 32 bytes")]
    BadChecksumChunkLength,
    #[error("write would exceed the length announced by ota-start")]
    ExceedsAnnouncedLength,
    #[error("hash mismatch")]
    HashMismatch,
    #[error(transparent)]
    Flash(#[from] TransientError),
}

pub struct OtaSession {
    state: OtaState,
    partition: Option<PartitionInfo>,
    expected_length: u64,
    written_length: u64,
    hasher: Option<Sha256>,
    finished_hash: Option<[u8; 32]>,
}

impl OtaSession {
    pub fn new() -> Self {
        Self {
            state: OtaState::Idle,
            partition: None,
            expected_length: 0,
            written_length: 0,
            hasher: None,
            finished_hash: None,
        }
    }

    pub fn state(&self) -> OtaState {
        self.state
    }

    fn abort(&mut self) {
        self.state = OtaState::Idle;
        self.partition = None;
        self.expected_length = 0;
        self.written_length = 0;
        self.hasher = None;
        self.finished_hash = None;
    }

    /// `ota-start <length>`. If a session is already active it is aborted
    /// first (spec.md §4.9 step 1).
    pub fn start(
        &mut self,
        length: u64,
        table: &dyn PartitionTable,
    ) -> Result<(), OtaError> {
        if self.state != OtaState::Idle {
            self.abort();
        }
        let partition = table.next_update_partition();
        if length > partition.size as u64 {
            return Err(OtaError::TooLarge);
        }
        self.partition = Some(partition);
        self.expected_length = length;
        self.written_length = 0;
        self.hasher = Some(Sha256::new());
        self.finished_hash = None;
        self.state = OtaState::Writing;
        Ok(())
    }

    /// `ota-write <length> <checksum-flag>`. `oob` is the chunk payload.
    /// If `checksum_flag`, `oob` must be exactly 32 bytes and is written to
    /// flash but excluded from the running hash.
    pub fn write_chunk(
        &mut self,
        length: u64,
        checksum_flag: bool,
        oob: &[u8],
        writer: &mut dyn FlashWriter,
    ) -> Result<(), OtaError> {
        if self.state != OtaState::Writing {
            return Err(OtaError::WrongState);
        }
        if length as usize != oob.len() {
            return Err(OtaError::LengthMismatch);
        }
        if checksum_flag && oob.len() != 32 {
            return Err(OtaError::BadChecksumChunkLength);
        }
        if self.written_length + oob.len() as u64 > self.expected_length {
            self.abort();
            return Err(OtaError::ExceedsAnnouncedLength);
        }
        if let Err(e) = writer.write(oob) {
            self.abort();
            return Err(e.into());
        }
        if !checksum_flag {
            if let Some(hasher) = &mut self.hasher {
                hasher.update(oob);
            }
        }
        self.written_length += oob.len() as u64;
        Ok(())
    }

    /// `ota-finish`. Finalizes the writer and the hash, returning the
    /// 32-byte digest.
    pub fn finish(&mut self, writer: &mut dyn FlashWriter) -> Result<[u8; 32], OtaError> {
        if self.state != OtaState::Writing {
            return Err(OtaError::WrongState);
        }
        if let Err(e) = writer.finalize() {
            self.abort();
            return Err(e.into());
        }
        let hasher = self.hasher.take().ok_or(OtaError::NoActiveSession)?;
        let digest: [u8; 32] = hasher.finalize().into();
        self.finished_hash = Some(digest);
        self.state = OtaState::Finished;
        Ok(digest)
    }

    /// `ota-commit <expected-hash>`. Recomputes the stored image's SHA-256
    /// through `table` and compares against `expected_hash`.
    pub fn commit(
        &mut self,
        expected_hash: &[u8; 32],
        table: &mut dyn PartitionTable,
    ) -> Result<(), OtaError> {
        if self.state != OtaState::Finished {
            return Err(OtaError::WrongState);
        }
        let partition = self.partition.ok_or(OtaError::NoActiveSession)?;
        let stored = table.stored_image_sha256(partition).map_err(|e| {
            self.abort();
            OtaError::Flash(e)
        })?;
        if &stored != expected_hash {
            self.abort();
            return Err(OtaError::HashMismatch);
        }
        if let Err(e) = table.mark_boot_partition(partition) {
            self.abort();
            return Err(e.into());
        }
        if let Err(e) = table.verify_image_metadata(partition) {
            self.abort();
            return Err(e.into());
        }
        self.state = OtaState::Committed;
        Ok(())
    }

    /// `ota-confirm`, called by the host after rebooting into the new image.
    pub fn confirm(&mut self, table: &mut dyn PartitionTable) -> Result<(), OtaError> {
        if self.state != OtaState::Committed {
            return Err(OtaError::WrongState);
        }
        table.cancel_rollback()?;
        self.state = OtaState::Confirmed;
        Ok(())
    }
}

impl Default for OtaSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub mod fakes {
    use super::*;

    #[derive(Default)]
    pub struct FakeFlashWriter {
        pub written: Vec<u8>,
        pub fail_next_write: bool,
    }

    impl FlashWriter for FakeFlashWriter {
        fn write(&mut self, bytes: &[u8]) -> Result<(), TransientError> {
            if self.fail_next_write {
                return Err(TransientError::PeripheralTimeout);
            }
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn finalize(&mut self) -> Result<(), TransientError> {
            Ok(())
        }
    }

    pub struct FakePartitionTable {
        pub next: PartitionInfo,
        pub stored_hash: [u8; 32],
        pub booted: Option<PartitionInfo>,
        pub confirmed: bool,
    }

    impl Default for FakePartitionTable {
        fn default() -> Self {
            Self {
                next: PartitionInfo { label: "ota_1", address: 0x1_0000, size: 1_048_576, bootable: true },
                stored_hash: [0u8; 32],
                booted: None,
                confirmed: false,
            }
        }
    }

    impl PartitionTable for FakePartitionTable {
        fn next_update_partition(&self) -> PartitionInfo {
            self.next
        }

        fn stored_image_sha256(&self, _partition: PartitionInfo) -> Result<[u8; 32], TransientError> {
            Ok(self.stored_hash)
        }

        fn mark_boot_partition(&mut self, partition: PartitionInfo) -> Result<(), TransientError> {
            self.booted = Some(partition);
            Ok(())
        }

        fn verify_image_metadata(&self, _partition: PartitionInfo) -> Result<(), TransientError> {
            Ok(())
        }

        fn cancel_rollback(&mut self) -> Result<(), TransientError> {
            self.confirmed = true;
            Ok(())
        }

        fn all_partitions(&self) -> Vec<PartitionInfo> {
            vec![self.next]
        }
    }
}
