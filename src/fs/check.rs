//! consistency check of a volume, the `fsck` of our filesystem
use std::fmt;

use bitvec::prelude::*;
use byte_unit::Byte;
use log::{debug, info};

use super::{BlockStore, FatFs, Result, BLOCK_SIZE, FAT_EOF, FAT_FREE, FIRST_DATA_BLOCK, ROOT_BLOCK};
use crate::utils::fs_size_calculator;

/// something wrong found on the volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// a chain points past the end of the volume
    OutOfRange { owner: String, block: u16 },
    /// a chain comes back to one of its own blocks
    Cycle { owner: String, block: u16 },
    /// a block belongs to two chains
    SharedBlock { owner: String, block: u16 },
    /// a chain runs into a free slot before its end
    FreeInChain { owner: String, block: u16 },
    /// the chain is longer or shorter than the recorded size needs
    SizeMismatch {
        owner: String,
        blocks: usize,
        expected: usize,
    },
    /// taken in the table but owned by nobody
    Leaked { block: u16 },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::OutOfRange { owner, block } => {
                write!(f, "{owner}: block {block} is outside the volume")
            }
            Problem::Cycle { owner, block } => write!(f, "{owner}: chain loops at block {block}"),
            Problem::SharedBlock { owner, block } => {
                write!(f, "{owner}: block {block} already belongs to another chain")
            }
            Problem::FreeInChain { owner, block } => {
                write!(f, "{owner}: chain runs into free block {block}")
            }
            Problem::SizeMismatch {
                owner,
                blocks,
                expected,
            } => write!(f, "{owner}: chain has {blocks} blocks, {expected} expected"),
            Problem::Leaked { block } => write!(f, "block {block} is taken but owned by nobody"),
        }
    }
}

/// what [FatFs::check] found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeReport {
    pub free_blocks: usize,
    pub used_blocks: usize,
    pub files: usize,
    pub directories: usize,
    pub problems: Vec<Problem>,
}

impl VolumeReport {
    pub fn is_consistent(&self) -> bool {
        self.problems.is_empty()
    }

    /// `df` like one-liner
    pub fn summary(&self) -> String {
        let bytes = |blocks: usize| {
            Byte::from_bytes((blocks * BLOCK_SIZE) as _).get_appropriate_unit(true)
        };
        format!(
            "{} files, {} directories, {} blocks used ({}), {} blocks free ({})",
            self.files,
            self.directories,
            self.used_blocks,
            bytes(self.used_blocks),
            self.free_blocks,
            bytes(self.free_blocks)
        )
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

impl<D: BlockStore> FatFs<D> {
    /// walk every directory from root and account for every taken block
    pub fn check(&self) -> Result<VolumeReport> {
        info!("check() called");
        let fat = self.load_fat()?;
        let capacity = fat.capacity();
        let mut claimed = bitvec![u8, Lsb0; 0; capacity];
        // root and the table itself
        claimed.set(0, true);
        claimed.set(1, true);
        let mut report = VolumeReport::default();

        // directories still to visit, keyed by block
        let mut pending = vec![(ROOT_BLOCK, "/".to_string())];
        while let Some((block, dir_path)) = pending.pop() {
            debug!("check(): visiting {dir_path} at block {block}");
            let dir = self.load_dir(block)?;
            for record in dir.live().filter(|r| !r.is_parent_link()) {
                let owner = join(&dir_path, &record.name());
                let mut chain = Vec::new();
                let mut current = record.first_block;
                let intact = loop {
                    let idx = current as usize;
                    if idx < FIRST_DATA_BLOCK as usize || idx >= capacity {
                        report.problems.push(Problem::OutOfRange {
                            owner: owner.clone(),
                            block: current,
                        });
                        break false;
                    }
                    if chain.contains(&current) {
                        report.problems.push(Problem::Cycle {
                            owner: owner.clone(),
                            block: current,
                        });
                        break false;
                    }
                    if claimed[idx] {
                        report.problems.push(Problem::SharedBlock {
                            owner: owner.clone(),
                            block: current,
                        });
                        break false;
                    }
                    claimed.set(idx, true);
                    chain.push(current);
                    match fat.entry(current) {
                        FAT_EOF => break true,
                        FAT_FREE => {
                            report.problems.push(Problem::FreeInChain {
                                owner: owner.clone(),
                                block: current,
                            });
                            break false;
                        }
                        next => current = next,
                    }
                };

                let expected = if record.is_dir() {
                    report.directories += 1;
                    1
                } else {
                    report.files += 1;
                    fs_size_calculator::blocks_for(record.size as usize)
                };
                if intact && chain.len() != expected {
                    report.problems.push(Problem::SizeMismatch {
                        owner: owner.clone(),
                        blocks: chain.len(),
                        expected,
                    });
                }
                if intact && record.is_dir() {
                    pending.push((record.first_block, owner));
                }
            }
        }

        for idx in FIRST_DATA_BLOCK as usize..capacity {
            let block = idx as u16;
            if fat.is_free(block) {
                report.free_blocks += 1;
            } else {
                report.used_blocks += 1;
                if !claimed[idx] {
                    report.problems.push(Problem::Leaked { block });
                }
            }
        }
        Ok(report)
    }
}
