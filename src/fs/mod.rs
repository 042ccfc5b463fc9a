//! our FAT filesystem
pub mod access;
pub mod block_store;
pub mod check;
pub mod directory;
pub mod error;
pub mod fat;
pub mod filekind;
pub mod fs_layout;
pub mod path;
pub mod session;
mod fs_api_impl;
pub use access::*;
pub use block_store::*;
pub use check::*;
pub use directory::*;
pub use error::*;
pub use fat::*;
pub use filekind::*;
pub use fs_api_impl::read_payload;
pub use fs_layout::*;
pub use session::*;

/// size of every block on the volume, in bytes
pub const BLOCK_SIZE: usize = 4096;
/// block holding the root directory
pub const ROOT_BLOCK: u16 = 0;
/// block holding the allocation table
pub const FAT_BLOCK: u16 = 1;
/// first block that may carry payload or a sub-directory
pub const FIRST_DATA_BLOCK: u16 = 2;
/// one 16-bit slot per block, so the table addresses this many blocks
pub const FAT_ENTRIES: usize = BLOCK_SIZE / 2;
pub const FAT_FREE: u16 = 0x0000;
pub const FAT_EOF: u16 = 0xFFFF;

pub const DIR_ENTRY_SIZE: usize = 64;
pub const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;
/// bytes of the name field, the last one is always a NUL
pub const NAME_FIELD_LEN: usize = 56;
pub const MAX_NAME_LEN: usize = NAME_FIELD_LEN - 1;
pub const PARENT_NAME: &str = "..";
pub const CURRENT_NAME: &str = ".";
pub const SEPARATOR: char = '/';
