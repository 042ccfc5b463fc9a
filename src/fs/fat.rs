use log::{debug, warn};

use super::{FsError, Result, BLOCK_SIZE, FAT_ENTRIES, FAT_EOF, FAT_FREE, FIRST_DATA_BLOCK};
use crate::utils::{fs_size_calculator, traits::BlockCodec};

/// the allocation table, one slot per block,
/// each slot is [FAT_FREE], [FAT_EOF] or the index of the next block in the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatTable {
    entries: [u16; FAT_ENTRIES],
    /// blocks the allocator may hand out, never more than the device has
    capacity: usize,
}

/// for serialize and deserialize
impl FatTable {
    pub fn decode(block: &[u8], capacity: usize) -> Result<Self> {
        let (entries, _) = <[u16; FAT_ENTRIES]>::decode_from(block)?;
        Ok(Self {
            entries,
            capacity: fs_size_calculator::addressable_blocks(capacity),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut block = vec![0u8; BLOCK_SIZE];
        self.entries.encode_into(&mut block)?;
        Ok(block)
    }
}

impl FatTable {
    /// a fresh table, only the root and the table itself are taken
    pub fn formatted(capacity: usize) -> Self {
        let mut entries = [FAT_FREE; FAT_ENTRIES];
        entries[0] = FAT_EOF;
        entries[1] = FAT_EOF;
        Self {
            entries,
            capacity: fs_size_calculator::addressable_blocks(capacity),
        }
    }

    pub fn is_formatted(&self) -> bool {
        self.entries[0] == FAT_EOF && self.entries[1] == FAT_EOF
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// raw slot value of `block`
    pub fn entry(&self, block: u16) -> u16 {
        self.entries
            .get(block as usize)
            .copied()
            .unwrap_or(FAT_FREE)
    }

    pub fn is_free(&self, block: u16) -> bool {
        self.entry(block) == FAT_FREE
    }

    pub fn free_count(&self) -> usize {
        (FIRST_DATA_BLOCK as usize..self.capacity)
            .filter(|idx| self.entries[*idx] == FAT_FREE)
            .count()
    }

    /// first-fit scan for `count` free blocks, nothing is claimed
    fn find_free(&self, count: usize) -> Result<Vec<u16>> {
        let found: Vec<u16> = (FIRST_DATA_BLOCK as usize..self.capacity)
            .filter(|idx| self.entries[*idx] == FAT_FREE)
            .take(count)
            .map(|idx| idx as u16)
            .collect();
        if found.len() < count {
            return Err(FsError::NoFreeBlocks);
        }
        Ok(found)
    }

    /// link `blocks` in order, the last one ends the chain
    fn link(&mut self, blocks: &[u16]) {
        for pair in blocks.windows(2) {
            self.entries[pair[0] as usize] = pair[1];
        }
        if let Some(last) = blocks.last() {
            self.entries[*last as usize] = FAT_EOF;
        }
    }

    /// claim a chain large enough for `byte_len` bytes,
    /// an empty payload still owns one block
    /// # Returns
    /// the first block of the new chain
    pub fn allocate_chain(&mut self, byte_len: usize) -> Result<u16> {
        let count = fs_size_calculator::blocks_for(byte_len);
        let mut claimed = Vec::with_capacity(count);
        for _ in 0..count {
            match self.find_free(1) {
                Ok(found) => {
                    // mark it taken so the next scan moves on
                    self.entries[found[0] as usize] = FAT_EOF;
                    claimed.push(found[0]);
                }
                Err(e) => {
                    warn!(
                        "allocation of {} blocks failed after {}, rolling back",
                        count,
                        claimed.len()
                    );
                    for block in claimed {
                        self.entries[block as usize] = FAT_FREE;
                    }
                    return Err(e);
                }
            }
        }
        self.link(&claimed);
        debug!("allocated chain {:?} for {} bytes", claimed, byte_len);
        Ok(claimed[0])
    }

    /// append `additional` blocks to the chain starting at `first`,
    /// a `first` of [FAT_FREE] means the owner has no block yet
    /// # Returns
    /// the first block of the (possibly new) chain
    pub fn extend_chain(&mut self, first: u16, additional: usize) -> Result<u16> {
        if additional == 0 {
            return Ok(first);
        }
        if first == FAT_FREE {
            return self.allocate_chain((additional - 1) * BLOCK_SIZE + 1);
        }
        let tail = *self
            .chain(first)?
            .last()
            .ok_or_else(|| FsError::Corrupted(format!("empty chain at block {first}")))?;
        let fresh = self.find_free(additional).map_err(|e| {
            warn!("extending chain at {} by {} blocks failed", first, additional);
            e
        })?;
        self.entries[tail as usize] = fresh[0];
        self.link(&fresh);
        debug!("extended chain at {} with {:?}", first, fresh);
        Ok(first)
    }

    /// mark every block of the chain starting at `first` free,
    /// stops at the end of the chain or at a block that is already free
    pub fn release_chain(&mut self, first: u16) {
        let mut current = first;
        // bounded walk, a damaged cyclic chain can't loop forever
        for _ in 0..self.capacity {
            let idx = current as usize;
            if idx < FIRST_DATA_BLOCK as usize || idx >= self.capacity {
                break;
            }
            let next = self.entries[idx];
            if next == FAT_FREE {
                break;
            }
            self.entries[idx] = FAT_FREE;
            if next == FAT_EOF {
                break;
            }
            current = next;
        }
        debug!("released chain at {}", first);
    }

    /// blocks of the chain starting at `first`, in order
    pub fn chain(&self, first: u16) -> Result<Vec<u16>> {
        let mut blocks = Vec::new();
        let mut current = first;
        loop {
            let idx = current as usize;
            if idx >= self.capacity {
                return Err(FsError::Corrupted(format!(
                    "chain at {first} leaves the volume at block {idx}"
                )));
            }
            if blocks.len() >= self.capacity {
                return Err(FsError::Corrupted(format!("chain at {first} has a cycle")));
            }
            blocks.push(current);
            match self.entries[idx] {
                FAT_EOF => return Ok(blocks),
                FAT_FREE => {
                    return Err(FsError::Corrupted(format!(
                        "chain at {first} runs into free block {idx}"
                    )))
                }
                next => current = next,
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn set(&mut self, block: u16, value: u16) {
        self.entries[block as usize] = value;
    }
}
