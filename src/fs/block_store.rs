//! the raw "device" the volume lives on, addressed only by whole blocks
use std::{fs::OpenOptions, ops::Range, path::Path};

use log::debug;
use memmap2::MmapMut;

use super::{FsError, Result, BLOCK_SIZE};

pub trait BlockStore {
    /// number of blocks on the device
    fn block_count(&self) -> usize;

    /// read block `index` into `buf`, `buf.len()` must be [BLOCK_SIZE]
    fn read_block(&self, index: usize, buf: &mut [u8]) -> Result<()>;

    /// write `buf` to block `index`, `buf.len()` must be [BLOCK_SIZE]
    fn write_block(&mut self, index: usize, buf: &[u8]) -> Result<()>;

    /// persist pending writes
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

fn block_range(index: usize, block_count: usize, buf_len: usize) -> Result<Range<usize>> {
    if index >= block_count {
        return Err(FsError::BlockOutOfRange(index));
    }
    if buf_len != BLOCK_SIZE {
        return Err(FsError::BadBufferLength(buf_len));
    }
    let start = index * BLOCK_SIZE;
    Ok(start..start + BLOCK_SIZE)
}

/// a volume kept entirely in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamDisk {
    data: Vec<u8>,
    block_count: usize,
}

impl RamDisk {
    pub fn new(block_count: usize) -> Self {
        Self {
            data: vec![0u8; block_count * BLOCK_SIZE],
            block_count,
        }
    }
}

impl BlockStore for RamDisk {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&self, index: usize, buf: &mut [u8]) -> Result<()> {
        let range = block_range(index, self.block_count, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write_block(&mut self, index: usize, buf: &[u8]) -> Result<()> {
        let range = block_range(index, self.block_count, buf.len())?;
        self.data[range].copy_from_slice(buf);
        Ok(())
    }
}

/// a volume backed by an image file, mapped into memory
#[derive(Debug)]
pub struct ImageDisk {
    mmap: MmapMut,
    block_count: usize,
}

impl ImageDisk {
    /// create a zero filled image of `block_count` blocks,
    /// an existing file is never overwritten
    pub fn create<P>(image_path: P, block_count: usize) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(image_path.as_ref())?;
        // all bytes are zero after `set_len`
        file.set_len((block_count * BLOCK_SIZE) as u64)?;
        debug!(
            "created image {:?} with {} blocks",
            image_path.as_ref(),
            block_count
        );
        Self::map(&file, block_count)
    }

    /// open an existing image, its length decides the block count
    pub fn open<P>(image_path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(image_path.as_ref())?;
        let len = file.metadata()?.len() as usize;
        if len == 0 || len % BLOCK_SIZE != 0 {
            return Err(FsError::Corrupted(format!(
                "image length {len} is not a whole number of {BLOCK_SIZE} byte blocks"
            )));
        }
        Self::map(&file, len / BLOCK_SIZE)
    }

    fn map(file: &std::fs::File, block_count: usize) -> Result<Self> {
        // Safety
        // the mapping is only accessed through this struct, and the image file
        // is not expected to be resized by anyone else while it is open
        let mmap = unsafe { MmapMut::map_mut(file)? };
        Ok(Self { mmap, block_count })
    }
}

impl BlockStore for ImageDisk {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&self, index: usize, buf: &mut [u8]) -> Result<()> {
        let range = block_range(index, self.block_count, buf.len())?;
        buf.copy_from_slice(&self.mmap[range]);
        Ok(())
    }

    fn write_block(&mut self, index: usize, buf: &[u8]) -> Result<()> {
        let range = block_range(index, self.block_count, buf.len())?;
        self.mmap[range].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.mmap.flush()?)
    }
}
