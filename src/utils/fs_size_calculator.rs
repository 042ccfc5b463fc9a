//! This module contains functions to calculate the size of different fs components

use crate::fs::{BLOCK_SIZE, FAT_ENTRIES};

/// calculate how many blocks a payload occupies
/// # Arguments
/// - `byte_len`: the payload length in bytes
/// # Return
/// the number of blocks, an empty payload still takes one
/// # Example
/// ```
/// use fatfs::utils::fs_size_calculator::blocks_for;
/// assert_eq!(blocks_for(0), 1);
/// assert_eq!(blocks_for(4096), 1);
/// assert_eq!(blocks_for(4097), 2);
/// ```
pub const fn blocks_for(byte_len: usize) -> usize {
    if byte_len == 0 {
        1
    } else {
        byte_len.div_ceil(BLOCK_SIZE)
    }
}

/// calculate the image size of a volume
/// # Arguments
/// - `block_count`: the number of blocks
/// # Return
/// the size of the image in bytes
/// # Example
/// ```
/// use fatfs::utils::fs_size_calculator::image_size;
/// assert_eq!(image_size(2048), 8 << 20);
/// ```
pub const fn image_size(block_count: usize) -> u64 {
    (block_count * BLOCK_SIZE) as u64
}

/// calculate how many blocks the allocation table can address on a device
/// # Arguments
/// - `block_count`: the number of blocks on the device
/// # Return
/// the smaller of the device size and the table size
/// # Example
/// ```
/// use fatfs::utils::fs_size_calculator::addressable_blocks;
/// assert_eq!(addressable_blocks(16), 16);
/// assert_eq!(addressable_blocks(100_000), 2048);
/// ```
pub const fn addressable_blocks(block_count: usize) -> usize {
    if block_count < FAT_ENTRIES {
        block_count
    } else {
        FAT_ENTRIES
    }
}
