//! create our filesystem
use crate::{
    fs::{FatFs, ImageDisk, Session, FAT_ENTRIES, FIRST_DATA_BLOCK},
    utils::fs_size_calculator,
};
use anyhow::anyhow;
use byte_unit::Byte;
use log::info;
use std::path::Path;

/// create a new filesystem, given the path of the image file and its block count
/// # Params
/// - `image_file_path`: the path of the image file, it must not exist yet
/// - `blocks`: the number of blocks of the volume
///
/// # Return
/// an [anyhow::Result] type to indicate whether the operation is successful
pub fn mkfs<P>(image_file_path: P, blocks: usize) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    // root, table and at least one block of data
    let min_blocks = FIRST_DATA_BLOCK as usize + 1;
    if blocks < min_blocks {
        return Err(anyhow!(
            "a volume needs at least {} blocks ({})",
            min_blocks,
            Byte::from_bytes(fs_size_calculator::image_size(min_blocks) as _)
                .get_appropriate_unit(true)
        ));
    }
    // the table can't address more
    if blocks > FAT_ENTRIES {
        return Err(anyhow!(
            "a volume has at most {} blocks ({})",
            FAT_ENTRIES,
            Byte::from_bytes(fs_size_calculator::image_size(FAT_ENTRIES) as _)
                .get_appropriate_unit(true)
        ));
    }

    let image_file_path = image_file_path.as_ref();
    let disk = ImageDisk::create(image_file_path, blocks)?;
    let mut fs = FatFs::new(disk)?;
    fs.format(&mut Session::root())?;
    info!(
        "created {:?}: {} blocks, {}",
        image_file_path,
        blocks,
        Byte::from_bytes(fs_size_calculator::image_size(blocks) as _).get_appropriate_unit(true)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::BlockStore;

    #[test]
    fn test_mkfs() {
        let image = Path::new("/tmp/fatfs_mkfs_test.img");
        if image.exists() {
            std::fs::remove_file(image).unwrap();
        }
        mkfs(image, 64).unwrap();
        assert_eq!(
            std::fs::metadata(image).unwrap().len(),
            fs_size_calculator::image_size(64)
        );
        let fs = FatFs::new(ImageDisk::open(image).unwrap()).unwrap();
        assert!(fs.is_formatted().unwrap());
        assert_eq!(fs.device().block_count(), 64);
        assert_eq!(fs.check().unwrap().free_blocks, 62);

        // never overwrites an existing image
        assert!(mkfs(image, 64).is_err());
        std::fs::remove_file(image).unwrap();
    }

    #[test]
    fn test_mkfs_rejects_sizes() {
        let image = Path::new("/tmp/fatfs_mkfs_size_test.img");
        if image.exists() {
            std::fs::remove_file(image).unwrap();
        }
        assert!(mkfs(image, 2).is_err());
        assert!(mkfs(image, FAT_ENTRIES + 1).is_err());
        assert!(!image.exists());
    }
}
