//! what does our filesystem look like on the block store

use log::debug;

use super::{
    path, AccessRights, BlockStore, Directory, FatTable, FsError, Result, Session, BLOCK_SIZE,
    CURRENT_NAME, FAT_BLOCK, FIRST_DATA_BLOCK, PARENT_NAME, ROOT_BLOCK,
};
use crate::utils::fs_size_calculator;

/// it has the following layout:
/// - block 0: root directory
/// - block 1: allocation table
/// - the rest: file payloads and sub-directories
///
/// nothing is cached, every call goes back to the device
#[derive(Debug)]
pub struct FatFs<D: BlockStore> {
    /// the "device" holding the volume
    device: D,
}

impl<D: BlockStore> FatFs<D> {
    /// wrap a device, it does not have to be formatted yet
    pub fn new(device: D) -> Result<Self> {
        let blocks = device.block_count();
        if blocks <= FIRST_DATA_BLOCK as usize {
            return Err(FsError::DeviceTooSmall(blocks));
        }
        Ok(Self { device })
    }

    /// blocks the allocation table can hand out
    #[inline]
    pub fn capacity(&self) -> usize {
        fs_size_calculator::addressable_blocks(self.device.block_count())
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub(crate) fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn flush(&mut self) -> Result<()> {
        self.device.flush()
    }

    pub fn is_formatted(&self) -> Result<bool> {
        let block = self.read_block(FAT_BLOCK)?;
        Ok(FatTable::decode(&block, self.capacity())?.is_formatted())
    }
}

/// raw block and chain access
impl<D: BlockStore> FatFs<D> {
    pub(crate) fn read_block(&self, index: u16) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; BLOCK_SIZE];
        self.device.read_block(index as usize, &mut buf)?;
        Ok(buf)
    }

    pub(crate) fn write_block(&mut self, index: u16, buf: &[u8]) -> Result<()> {
        self.device.write_block(index as usize, buf)
    }

    /// `size` bytes of the chain starting at `first`
    pub(crate) fn read_chain(&self, fat: &FatTable, first: u16, size: usize) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(size);
        for block in fat.chain(first)? {
            if data.len() >= size {
                break;
            }
            let buf = self.read_block(block)?;
            let take = (size - data.len()).min(BLOCK_SIZE);
            data.extend_from_slice(&buf[..take]);
        }
        if data.len() < size {
            return Err(FsError::Corrupted(format!(
                "chain at {first} holds {} of {size} bytes",
                data.len()
            )));
        }
        Ok(data)
    }

    /// fill the chain starting at `first` with `data`, the tail of the last block is zeroed
    pub(crate) fn write_chain(&mut self, fat: &FatTable, first: u16, data: &[u8]) -> Result<()> {
        let blocks = fat.chain(first)?;
        if data.is_empty() {
            return self.write_block(first, &[0u8; BLOCK_SIZE]);
        }
        if blocks.len() < fs_size_calculator::blocks_for(data.len()) {
            return Err(FsError::Corrupted(format!(
                "chain at {first} is too short for {} bytes",
                data.len()
            )));
        }
        for (block, chunk) in blocks.into_iter().zip(data.chunks(BLOCK_SIZE)) {
            let mut buf = vec![0u8; BLOCK_SIZE];
            buf[..chunk.len()].copy_from_slice(chunk);
            self.write_block(block, &buf)?;
        }
        Ok(())
    }

    /// write `data` into the chain starting at `first`, beginning at byte `offset`
    pub(crate) fn write_at(
        &mut self,
        fat: &FatTable,
        first: u16,
        offset: usize,
        data: &[u8],
    ) -> Result<()> {
        let blocks = fat.chain(first)?;
        let mut pos = offset;
        let mut remaining = data;
        while !remaining.is_empty() {
            let block = *blocks.get(pos / BLOCK_SIZE).ok_or_else(|| {
                FsError::Corrupted(format!("chain at {first} ends before byte {pos}"))
            })?;
            let within = pos % BLOCK_SIZE;
            let n = (BLOCK_SIZE - within).min(remaining.len());
            // only a fully overwritten block skips the read
            let mut buf = if n == BLOCK_SIZE {
                vec![0u8; BLOCK_SIZE]
            } else {
                self.read_block(block)?
            };
            buf[within..within + n].copy_from_slice(&remaining[..n]);
            self.write_block(block, &buf)?;
            pos += n;
            remaining = &remaining[n..];
        }
        Ok(())
    }
}

/// allocation table and directory blocks
impl<D: BlockStore> FatFs<D> {
    /// the allocation table, an unformatted volume is an error
    pub(crate) fn load_fat(&self) -> Result<FatTable> {
        let block = self.read_block(FAT_BLOCK)?;
        let fat = FatTable::decode(&block, self.capacity())?;
        if !fat.is_formatted() {
            return Err(FsError::Unformatted);
        }
        Ok(fat)
    }

    pub(crate) fn save_fat(&mut self, fat: &FatTable) -> Result<()> {
        let block = fat.encode()?;
        self.write_block(FAT_BLOCK, &block)
    }

    pub(crate) fn load_dir(&self, index: u16) -> Result<Directory> {
        Directory::decode(&self.read_block(index)?)
    }

    pub(crate) fn save_dir(&mut self, index: u16, dir: &Directory) -> Result<()> {
        let block = dir.encode()?;
        self.write_block(index, &block)
    }

    /// rights of the directory stored at `index`,
    /// kept in the record naming it inside its parent
    pub fn permission_of(&self, index: u16) -> Result<AccessRights> {
        if index == ROOT_BLOCK {
            return Ok(AccessRights::all());
        }
        let parent = self
            .load_dir(index)?
            .parent()
            .ok_or(FsError::ParentNotFound(index))?;
        let rights = self
            .load_dir(parent)?
            .naming_record_of(index)
            .map(|record| record.rights())
            .unwrap_or_else(AccessRights::empty);
        Ok(rights)
    }

    /// the directory block `path` leads to,
    /// it is also remembered as the session's last resolved directory
    pub fn resolve(&self, session: &mut Session, path: &str) -> Result<u16> {
        let mut current = if path::is_absolute(path) {
            ROOT_BLOCK
        } else {
            session.working_block()
        };
        for token in path::tokens(path) {
            if token == CURRENT_NAME {
                continue;
            }
            let dir = self.load_dir(current)?;
            current = match dir.lookup_dir(token) {
                Some(next) => next,
                None if token == PARENT_NAME => return Err(FsError::NotFound(path.to_string())),
                None => return Err(FsError::DirectoryNotFound(path.to_string())),
            };
            debug!("resolve({path}): {token} -> block {current}");
        }
        session.set_last_resolved(current);
        Ok(current)
    }
}
