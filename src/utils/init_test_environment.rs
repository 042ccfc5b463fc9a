use crate::fs::{FatFs, RamDisk, Session};

/// a freshly formatted in-memory volume of `blocks` blocks and a session sitting in root
pub fn formatted_volume(blocks: usize) -> (FatFs<RamDisk>, Session) {
    let mut fs = FatFs::new(RamDisk::new(blocks)).expect("Failed to wrap ram disk");
    let mut session = Session::root();
    fs.format(&mut session).expect("Failed to format volume");
    (fs, session)
}
