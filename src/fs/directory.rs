use std::borrow::Cow;

use bincode::{Decode, Encode};

use super::{
    AccessRights, FileKind, FsError, Result, BLOCK_SIZE, CURRENT_NAME, DIR_ENTRIES_PER_BLOCK,
    DIR_ENTRY_SIZE, MAX_NAME_LEN, NAME_FIELD_LEN, PARENT_NAME,
};
use crate::utils::traits::BlockCodec;

/// one 64 byte directory record as it sits on disk
#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    name: [u8; NAME_FIELD_LEN],
    /// bytes for a file, record count for a directory
    pub size: u32,
    pub first_block: u16,
    kind: u8,
    access: u8,
}

/// reject names the namespace can't hold
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == CURRENT_NAME
        || name == PARENT_NAME
        || name.contains(&['/', '\0'][..])
    {
        return Err(FsError::InvalidName(name.to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(FsError::NameTooLong(name.to_string()));
    }
    Ok(())
}

impl DirEntry {
    pub const EMPTY: DirEntry = DirEntry {
        name: [0; NAME_FIELD_LEN],
        size: 0,
        first_block: 0,
        kind: 0,
        access: 0,
    };

    fn with_name(name: &str, size: u32, first_block: u16, kind: FileKind) -> Result<Self> {
        let mut entry = DirEntry {
            size,
            first_block,
            kind: kind.into(),
            access: AccessRights::default_new().bits(),
            ..DirEntry::EMPTY
        };
        entry.set_name(name)?;
        Ok(entry)
    }

    pub fn new_file(name: &str, size: u32, first_block: u16) -> Result<Self> {
        Self::with_name(name, size, first_block, FileKind::RegularFile)
    }

    /// a fresh directory only holds its `..` link
    pub fn new_dir(name: &str, first_block: u16) -> Result<Self> {
        Self::with_name(name, 1, first_block, FileKind::Directory)
    }

    /// the `..` record heading every non-root directory
    pub fn parent_link(parent_block: u16) -> Self {
        let mut name = [0; NAME_FIELD_LEN];
        name[..PARENT_NAME.len()].copy_from_slice(PARENT_NAME.as_bytes());
        DirEntry {
            name,
            size: 0,
            first_block: parent_block,
            kind: FileKind::Directory.into(),
            access: AccessRights::default_new().bits(),
        }
    }

    pub fn name(&self) -> Cow<'_, str> {
        let len = self
            .name
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(NAME_FIELD_LEN);
        String::from_utf8_lossy(&self.name[..len])
    }

    /// only the `..` record may carry a reserved name, use [DirEntry::parent_link] for it
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.name = [0; NAME_FIELD_LEN];
        self.name[..name.len()].copy_from_slice(name.as_bytes());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name[0] == 0 && self.first_block == 0
    }

    pub fn is_parent_link(&self) -> bool {
        self.kind == u8::from(FileKind::Directory) && self.name() == PARENT_NAME
    }

    /// unknown type bytes read as regular files
    pub fn kind(&self) -> FileKind {
        FileKind::try_from(self.kind).unwrap_or_default()
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == FileKind::Directory
    }

    pub fn rights(&self) -> AccessRights {
        AccessRights::from_bits_truncate(self.access)
    }

    pub fn set_rights(&mut self, rights: AccessRights) {
        self.access = rights.bits();
    }
}

/// a directory block, a fixed array of records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    records: Vec<DirEntry>,
}

/// for serialize and deserialize
impl Directory {
    pub fn decode(block: &[u8]) -> Result<Self> {
        if block.len() != BLOCK_SIZE {
            return Err(FsError::BadBufferLength(block.len()));
        }
        let records = block
            .chunks_exact(DIR_ENTRY_SIZE)
            .map(|raw| DirEntry::decode_from(raw).map(|(entry, _)| entry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { records })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut block = vec![0u8; BLOCK_SIZE];
        for (record, raw) in self.records.iter().zip(block.chunks_exact_mut(DIR_ENTRY_SIZE)) {
            record.encode_into(raw)?;
        }
        Ok(block)
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self {
            records: vec![DirEntry::EMPTY; DIR_ENTRIES_PER_BLOCK],
        }
    }
}

impl Directory {
    /// a new sub-directory of `parent_block`
    pub fn with_parent(parent_block: u16) -> Self {
        let mut dir = Self::default();
        dir.records[0] = DirEntry::parent_link(parent_block);
        dir
    }

    /// slot of the live record called `name`
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| !r.is_empty() && r.name() == name)
    }

    /// block of the sub-directory called `name`, `..` included
    pub fn lookup_dir(&self, name: &str) -> Option<u16> {
        self.lookup(name)
            .map(|slot| &self.records[slot])
            .filter(|r| r.is_dir())
            .map(|r| r.first_block)
    }

    pub fn get(&self, slot: usize) -> Option<&DirEntry> {
        self.records.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut DirEntry> {
        self.records.get_mut(slot)
    }

    /// block this directory's `..` points at, none for root
    pub fn parent(&self) -> Option<u16> {
        self.records
            .iter()
            .find(|r| r.is_parent_link())
            .map(|r| r.first_block)
    }

    pub fn has_free_slot(&self) -> bool {
        self.records.iter().any(DirEntry::is_empty)
    }

    /// store `entry` in the first empty slot
    pub fn insert(&mut self, entry: DirEntry) -> Result<usize> {
        let slot = self
            .records
            .iter()
            .position(DirEntry::is_empty)
            .ok_or(FsError::DirectoryFull)?;
        self.records[slot] = entry;
        Ok(slot)
    }

    pub fn clear(&mut self, slot: usize) {
        if let Some(record) = self.records.get_mut(slot) {
            *record = DirEntry::EMPTY;
        }
    }

    /// every non-empty record, `..` included
    pub fn live(&self) -> impl Iterator<Item = &DirEntry> {
        self.records.iter().filter(|r| !r.is_empty())
    }

    pub fn is_empty_except_parent(&self) -> bool {
        self.live().all(DirEntry::is_parent_link)
    }

    /// the record that names the sub-directory stored at `block`
    pub fn naming_record_of(&self, block: u16) -> Option<&DirEntry> {
        self.live()
            .find(|r| r.is_dir() && !r.is_parent_link() && r.first_block == block)
    }
}
