use std::io::BufRead;

use log::{info, warn};

use super::{
    directory::validate_name, path, AccessRights, BlockStore, DirEntry, Directory, FatFs,
    FatTable, FsError, Result, Session, BLOCK_SIZE, CURRENT_NAME, FAT_FREE, PARENT_NAME,
    ROOT_BLOCK,
};
use crate::utils::fs_size_calculator;

/// a free name inside a directory, checked and ready to receive a record
struct Placement {
    block: u16,
    dir: Directory,
    name: String,
}

/// read a `create` payload: everything up to an empty line that follows a newline,
/// or up to the end of input
pub fn read_payload<R: BufRead>(input: &mut R) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line == b"\n" && data.last() == Some(&b'\n') {
            break;
        }
        data.extend_from_slice(&line);
    }
    Ok(data)
}

/// how a directory part of a path is shown in diagnostics
fn dir_label(session: &Session, path: &str) -> String {
    match path::split(path).0 {
        "" => session.working_path().to_string(),
        dir => dir.to_string(),
    }
}

fn access_word(needed: AccessRights) -> &'static str {
    if needed.contains(AccessRights::WRITE) {
        "write"
    } else if needed.contains(AccessRights::READ) {
        "read"
    } else {
        "execute"
    }
}

fn require_record(record: &DirEntry, needed: AccessRights) -> Result<()> {
    if !record.rights().contains(needed) {
        return Err(FsError::PermissionDenied(
            record.name().into_owned(),
            access_word(needed),
        ));
    }
    Ok(())
}

/// lookups shared by the operations
impl<D: BlockStore> FatFs<D> {
    /// directory block and leaf name of `path`
    fn locate<'p>(&self, session: &mut Session, path: &'p str) -> Result<(u16, &'p str)> {
        let (dir, leaf) = path::split(path);
        Ok((self.resolve(session, dir)?, leaf))
    }

    fn require_dir(&self, block: u16, needed: AccessRights, label: &str) -> Result<()> {
        if !self.permission_of(block)?.contains(needed) {
            return Err(FsError::PermissionDenied(
                label.to_string(),
                access_word(needed),
            ));
        }
        Ok(())
    }

    /// the record `path` names, with the directory holding it
    fn find_record(&self, session: &mut Session, path: &str) -> Result<(u16, Directory, usize)> {
        let (block, leaf) = self.locate(session, path)?;
        let dir = self.load_dir(block)?;
        let slot = dir
            .lookup(leaf)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        Ok((block, dir, slot))
    }

    /// like [FatFs::find_record] but the record must be a regular file
    fn find_file(
        &self,
        session: &mut Session,
        path: &str,
    ) -> Result<(u16, Directory, usize, DirEntry)> {
        let (block, dir, slot) = self.find_record(session, path)?;
        let record = *dir
            .get(slot)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        if record.is_dir() {
            return Err(FsError::NotAFile(path.to_string()));
        }
        Ok((block, dir, slot, record))
    }

    /// a new, writable name at `path`
    fn new_name_at(&self, session: &mut Session, path: &str) -> Result<Placement> {
        let (block, leaf) = self.locate(session, path)?;
        validate_name(leaf)?;
        let dir = self.load_dir(block)?;
        if dir.lookup(leaf).is_some() {
            return Err(FsError::AlreadyExists(leaf.to_string()));
        }
        self.require_dir(block, AccessRights::WRITE, &dir_label(session, path))?;
        if !dir.has_free_slot() {
            return Err(FsError::DirectoryFull);
        }
        Ok(Placement {
            block,
            dir,
            name: leaf.to_string(),
        })
    }

    /// where `cp`/`mv` put `source_name` when asked for `dst`,
    /// an existing directory at `dst` receives it under its own name
    fn destination(
        &self,
        session: &mut Session,
        dst: &str,
        source_name: &str,
    ) -> Result<Placement> {
        let (block, leaf) = self.locate(session, dst)?;
        let dir = self.load_dir(block)?;
        let (block, dir, name) = if leaf.is_empty() || leaf == CURRENT_NAME {
            (block, dir, source_name)
        } else if let Some(sub) = dir.lookup_dir(leaf) {
            (sub, self.load_dir(sub)?, source_name)
        } else {
            (block, dir, leaf)
        };
        validate_name(name)?;
        if dir.lookup(name).is_some() {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        self.require_dir(block, AccessRights::WRITE, dst)?;
        if !dir.has_free_slot() {
            return Err(FsError::DirectoryFull);
        }
        Ok(Placement {
            block,
            dir,
            name: name.to_string(),
        })
    }

    /// table first, then directory records in the given order
    fn persist(&mut self, fat: Option<&FatTable>, dirs: &[(u16, &Directory)]) -> Result<()> {
        if let Some(fat) = fat {
            self.save_fat(fat)?;
        }
        for (block, dir) in dirs {
            self.save_dir(*block, dir)?;
        }
        self.flush()
    }

    /// allocate, write the payload and link the record into `placement`
    fn commit_new_file(&mut self, placement: Placement, data: &[u8]) -> Result<()> {
        let Placement {
            block,
            mut dir,
            name,
        } = placement;
        let mut fat = self.load_fat()?;
        let first = fat.allocate_chain(data.len())?;
        dir.insert(DirEntry::new_file(&name, data.len() as u32, first)?)?;
        self.write_chain(&fat, first, data)?;
        self.persist(Some(&fat), &[(block, &dir)])
    }
}

/// the operations of the volume
impl<D: BlockStore> FatFs<D> {
    /// wipe the volume and lay down an empty root and a fresh table
    pub fn format(&mut self, session: &mut Session) -> Result<()> {
        info!("format() called on {} blocks", self.device().block_count());
        let zeroed = vec![0u8; BLOCK_SIZE];
        for index in 0..self.device().block_count() {
            self.device_mut().write_block(index, &zeroed)?;
        }
        let fat = FatTable::formatted(self.capacity());
        self.persist(Some(&fat), &[(ROOT_BLOCK, &Directory::default())])?;
        session.reset();
        Ok(())
    }

    /// create a file at `path` holding the payload read from `input`,
    /// nothing is read when the name can't be used
    pub fn create<R: BufRead>(
        &mut self,
        session: &mut Session,
        path: &str,
        input: &mut R,
    ) -> Result<()> {
        info!("create() called with path: {path:?}");
        self.load_fat()?;
        let placement = self.new_name_at(session, path)?;
        let data = read_payload(input)?;
        self.commit_new_file(placement, &data)
    }

    /// create a file at `path` holding `data`
    pub fn create_with(&mut self, session: &mut Session, path: &str, data: &[u8]) -> Result<()> {
        info!("create_with() called with path: {path:?} and {} bytes", data.len());
        self.load_fat()?;
        let placement = self.new_name_at(session, path)?;
        self.commit_new_file(placement, data)
    }

    pub fn cat(&self, session: &mut Session, path: &str) -> Result<Vec<u8>> {
        info!("cat() called with path: {path:?}");
        let fat = self.load_fat()?;
        let (_, _, _, record) = self.find_file(session, path)?;
        require_record(&record, AccessRights::READ)?;
        self.read_chain(&fat, record.first_block, record.size as usize)
    }

    /// live records of the working directory, or of the directory `path` leads to
    pub fn ls(&self, session: &mut Session, path: Option<&str>) -> Result<Vec<DirEntry>> {
        info!("ls() called with path: {path:?}");
        self.load_fat()?;
        let path = path.unwrap_or("");
        let block = self.resolve(session, path)?;
        let label = if path.is_empty() {
            session.working_path().to_string()
        } else {
            path.to_string()
        };
        self.require_dir(block, AccessRights::READ, &label)?;
        Ok(self.load_dir(block)?.live().copied().collect())
    }

    pub fn cp(&mut self, session: &mut Session, src: &str, dst: &str) -> Result<()> {
        info!("cp() called with source: {src:?} and destination: {dst:?}");
        let fat = self.load_fat()?;
        let (_, _, _, source) = self.find_file(session, src)?;
        require_record(&source, AccessRights::READ)?;
        let placement = self.destination(session, dst, &source.name())?;
        let data = self.read_chain(&fat, source.first_block, source.size as usize)?;
        self.commit_new_file(placement, &data)
    }

    /// rename in place, or hand the record over to another directory,
    /// the chain itself never moves
    pub fn mv(&mut self, session: &mut Session, src: &str, dst: &str) -> Result<()> {
        info!("mv() called with source: {src:?} and destination: {dst:?}");
        self.load_fat()?;
        let (src_block, mut src_dir, slot, source) = self.find_file(session, src)?;
        require_record(&source, AccessRights::READ)?;
        if src_block != ROOT_BLOCK {
            self.require_dir(src_block, AccessRights::WRITE, &dir_label(session, src))?;
        }
        let Placement {
            block: dst_block,
            dir: mut dst_dir,
            name,
        } = self.destination(session, dst, &source.name())?;

        if dst_block == src_block {
            if let Some(record) = src_dir.get_mut(slot) {
                record.set_name(&name)?;
            }
            return self.persist(None, &[(src_block, &src_dir)]);
        }
        let mut moved = source;
        moved.set_name(&name)?;
        dst_dir.insert(moved)?;
        src_dir.clear(slot);
        self.persist(None, &[(dst_block, &dst_dir), (src_block, &src_dir)])
    }

    /// remove a file, or a directory holding nothing but its `..` link
    pub fn rm(&mut self, session: &mut Session, path: &str) -> Result<()> {
        info!("rm() called with path: {path:?}");
        let mut fat = self.load_fat()?;
        let (_, leaf) = path::split(path);
        if leaf.is_empty() || leaf == CURRENT_NAME || leaf == PARENT_NAME {
            return Err(FsError::InvalidName(leaf.to_string()));
        }
        let (block, mut dir, slot) = self.find_record(session, path)?;
        let record = *dir
            .get(slot)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        if record.is_dir() {
            if !self.load_dir(record.first_block)?.is_empty_except_parent() {
                return Err(FsError::DirectoryNotEmpty(path.to_string()));
            }
            if record.first_block == session.working_block() {
                return Err(FsError::DirectoryBusy(path.to_string()));
            }
        }
        fat.release_chain(record.first_block);
        dir.clear(slot);
        self.persist(Some(&fat), &[(block, &dir)])
    }

    /// append the content of `src` to the end of `dst`, `src` is left as is
    pub fn append(&mut self, session: &mut Session, src: &str, dst: &str) -> Result<()> {
        info!("append() called with source: {src:?} and destination: {dst:?}");
        let mut fat = self.load_fat()?;
        let (_, _, _, source) = self.find_file(session, src)?;
        require_record(&source, AccessRights::READ)?;
        let (dst_block, mut dst_dir, slot, target) = self.find_file(session, dst)?;
        require_record(&target, AccessRights::WRITE)?;

        let data = self.read_chain(&fat, source.first_block, source.size as usize)?;
        if data.is_empty() {
            return Ok(());
        }
        let old_size = target.size as usize;
        let new_size = old_size + data.len();
        let owned = if target.first_block == FAT_FREE {
            0
        } else {
            fs_size_calculator::blocks_for(old_size)
        };
        let additional = fs_size_calculator::blocks_for(new_size).saturating_sub(owned);
        let first = fat.extend_chain(target.first_block, additional).map_err(|e| {
            warn!("append() to {dst:?} needs {additional} more blocks: {e}");
            e
        })?;
        self.write_at(&fat, first, old_size, &data)?;
        if let Some(record) = dst_dir.get_mut(slot) {
            record.first_block = first;
            record.size = new_size as u32;
        }
        self.persist(Some(&fat), &[(dst_block, &dst_dir)])
    }

    pub fn mkdir(&mut self, session: &mut Session, path: &str) -> Result<()> {
        info!("mkdir() called with path: {path:?}");
        let mut fat = self.load_fat()?;
        let Placement {
            block,
            mut dir,
            name,
        } = self.new_name_at(session, path)?;
        let new_block = fat.allocate_chain(0)?;
        dir.insert(DirEntry::new_dir(&name, new_block)?)?;
        self.save_dir(new_block, &Directory::with_parent(block))?;
        self.persist(Some(&fat), &[(block, &dir)])
    }

    /// change the working directory, an empty path stays put
    pub fn cd(&self, session: &mut Session, path: &str) -> Result<()> {
        info!("cd() called with path: {path:?}");
        self.load_fat()?;
        if path.is_empty() {
            return Ok(());
        }
        let block = self.resolve(session, path)?;
        let shown = path::normalize(session.working_path(), path);
        session.enter(block, shown);
        Ok(())
    }

    pub fn pwd(&self, session: &Session) -> String {
        info!("pwd() called");
        session.working_path().to_string()
    }

    /// overwrite the access rights of the record at `path`
    pub fn chmod(&mut self, session: &mut Session, rights: &str, path: &str) -> Result<()> {
        info!("chmod() called with rights: {rights:?} and path: {path:?}");
        self.load_fat()?;
        let (_, leaf) = path::split(path);
        if leaf == CURRENT_NAME || leaf == PARENT_NAME {
            return Err(FsError::InvalidName(leaf.to_string()));
        }
        let rights: AccessRights = rights.parse()?;
        let (block, mut dir, slot) = self.find_record(session, path)?;
        if let Some(record) = dir.get_mut(slot) {
            record.set_rights(rights);
        }
        self.persist(None, &[(block, &dir)])
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::fs::{ErrorKind, RamDisk, DIR_ENTRIES_PER_BLOCK};
    use crate::utils::init_test_environment::formatted_volume;

    fn record<D: BlockStore>(fs: &FatFs<D>, session: &mut Session, path: &str) -> DirEntry {
        let (_, dir, slot) = fs.find_record(session, path).unwrap();
        *dir.get(slot).unwrap()
    }

    fn assert_consistent<D: BlockStore>(fs: &FatFs<D>) {
        let report = fs.check().unwrap();
        assert!(report.is_consistent(), "{:?}", report.problems);
    }

    #[test]
    fn test_read_payload() {
        let mut input = Cursor::new(b"hello\nworld\n\nls\n".to_vec());
        assert_eq!(read_payload(&mut input).unwrap(), b"hello\nworld\n");
        // the rest is left for the next reader
        let mut rest = String::new();
        input.read_line(&mut rest).unwrap();
        assert_eq!(rest, "ls\n");

        let mut input = Cursor::new(b"no newline at end".to_vec());
        assert_eq!(read_payload(&mut input).unwrap(), b"no newline at end");
        let mut input = Cursor::new(Vec::<u8>::new());
        assert!(read_payload(&mut input).unwrap().is_empty());
        // a leading empty line is content
        let mut input = Cursor::new(b"\n\n".to_vec());
        assert_eq!(read_payload(&mut input).unwrap(), b"\n");
    }

    #[test]
    fn test_create_and_cat() {
        let (mut fs, mut session) = formatted_volume(16);
        let mut input = Cursor::new(b"hello\nworld\n\n".to_vec());
        fs.create(&mut session, "a.txt", &mut input).unwrap();
        assert_eq!(fs.cat(&mut session, "a.txt").unwrap(), b"hello\nworld\n");
        assert_eq!(fs.cat(&mut session, "/a.txt").unwrap(), b"hello\nworld\n");

        let a = record(&fs, &mut session, "a.txt");
        assert_eq!(a.size, 12);
        assert_eq!(a.rights(), AccessRights::READ | AccessRights::WRITE);
        assert_consistent(&fs);
    }

    #[test]
    fn test_create_failures_leave_volume_untouched() {
        let (mut fs, mut session) = formatted_volume(16);
        fs.create_with(&mut session, "a.txt", b"x").unwrap();
        let before = fs.device().clone();

        // the payload is not consumed when the name is taken
        let mut input = Cursor::new(b"payload\n\n".to_vec());
        let err = fs.create(&mut session, "a.txt", &mut input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameCollision);
        assert_eq!(input.position(), 0);

        let long = "n".repeat(56);
        assert!(matches!(
            fs.create_with(&mut session, &long, b""),
            Err(FsError::NameTooLong(_))
        ));
        assert!(matches!(
            fs.create_with(&mut session, "nodir/a.txt", b""),
            Err(FsError::DirectoryNotFound(_))
        ));
        // 14 data blocks, 1 taken
        assert!(matches!(
            fs.create_with(&mut session, "big", &vec![1u8; 14 * BLOCK_SIZE]),
            Err(FsError::NoFreeBlocks)
        ));
        assert!(fs.device() == &before);

        // two data blocks, both taken
        let (mut fs, mut session) = formatted_volume(4);
        fs.create_with(&mut session, "a", b"a").unwrap();
        fs.create_with(&mut session, "b", b"b").unwrap();
        let before = fs.device().clone();
        assert!(matches!(
            fs.cp(&mut session, "a", "c"),
            Err(FsError::NoFreeBlocks)
        ));
        assert!(matches!(
            fs.mkdir(&mut session, "d"),
            Err(FsError::NoFreeBlocks)
        ));
        assert!(fs.device() == &before);
        assert_consistent(&fs);
    }

    #[test]
    fn test_directory_full() {
        let (mut fs, mut session) = formatted_volume(80);
        for idx in 0..DIR_ENTRIES_PER_BLOCK {
            fs.create_with(&mut session, &format!("f{idx}"), b"").unwrap();
        }
        let before = fs.device().clone();

        let mut input = Cursor::new(b"payload\n\n".to_vec());
        let err = fs.create(&mut session, "one-more", &mut input).unwrap_err();
        assert!(matches!(err, FsError::DirectoryFull));
        assert_eq!(err.kind(), ErrorKind::CapacityExhausted);
        assert_eq!(input.position(), 0);
        assert!(matches!(
            fs.mkdir(&mut session, "d"),
            Err(FsError::DirectoryFull)
        ));
        assert!(matches!(
            fs.cp(&mut session, "f0", "copy"),
            Err(FsError::DirectoryFull)
        ));
        assert!(fs.device() == &before);
        assert_consistent(&fs);
    }

    #[test]
    fn test_names_with_nul_are_refused() {
        let (mut fs, mut session) = formatted_volume(16);
        fs.create_with(&mut session, "a", b"one").unwrap();
        let before = fs.device().clone();

        assert!(matches!(
            fs.create_with(&mut session, "a\0x", b"two"),
            Err(FsError::InvalidName(_))
        ));
        assert!(matches!(
            fs.mkdir(&mut session, "b\0y"),
            Err(FsError::InvalidName(_))
        ));
        assert!(matches!(
            fs.cp(&mut session, "a", "a\0x"),
            Err(FsError::InvalidName(_))
        ));
        assert!(matches!(
            fs.mv(&mut session, "a", "c\0"),
            Err(FsError::InvalidName(_))
        ));
        assert!(fs.device() == &before);

        let names: Vec<_> = fs
            .ls(&mut session, None)
            .unwrap()
            .iter()
            .map(|r| r.name().into_owned())
            .collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_block_boundaries() {
        let (mut fs, mut session) = formatted_volume(16);
        fs.create_with(&mut session, "empty", b"").unwrap();
        fs.create_with(&mut session, "one", &vec![1u8; BLOCK_SIZE])
            .unwrap();
        fs.create_with(&mut session, "two", &vec![2u8; BLOCK_SIZE + 1])
            .unwrap();
        let fat = fs.load_fat().unwrap();
        for (name, blocks) in [("empty", 1), ("one", 1), ("two", 2)] {
            let first = record(&fs, &mut session, name).first_block;
            assert_eq!(fat.chain(first).unwrap().len(), blocks, "{name}");
        }
        assert_eq!(fat.free_count(), 14 - 4);
        assert!(fs.cat(&mut session, "empty").unwrap().is_empty());
        assert_eq!(fs.cat(&mut session, "two").unwrap(), vec![2u8; BLOCK_SIZE + 1]);
    }

    #[test]
    fn test_create_rm_never_leaks() {
        let (mut fs, mut session) = formatted_volume(32);
        for round in 0..3 {
            for idx in 0..5 {
                let data = vec![idx as u8; idx * 3000 + round];
                fs.create_with(&mut session, &format!("f{idx}"), &data)
                    .unwrap();
            }
            fs.rm(&mut session, "f1").unwrap();
            fs.rm(&mut session, "f3").unwrap();
            assert_consistent(&fs);
            for idx in [0, 2, 4] {
                fs.rm(&mut session, &format!("f{idx}")).unwrap();
            }
            assert_consistent(&fs);
            assert_eq!(fs.load_fat().unwrap().free_count(), 30);
        }
    }

    #[test]
    fn test_cp() {
        let (mut fs, mut session) = formatted_volume(16);
        let data = vec![9u8; BLOCK_SIZE + 7];
        fs.create_with(&mut session, "a", &data).unwrap();
        fs.cp(&mut session, "a", "b").unwrap();
        fs.rm(&mut session, "a").unwrap();
        assert_eq!(fs.cat(&mut session, "b").unwrap(), data);

        // no overwrite
        fs.create_with(&mut session, "c", b"c").unwrap();
        assert!(matches!(
            fs.cp(&mut session, "b", "c"),
            Err(FsError::AlreadyExists(_))
        ));
        // into a directory, under the source name
        fs.mkdir(&mut session, "d").unwrap();
        fs.cp(&mut session, "c", "d").unwrap();
        fs.cp(&mut session, "b", "d/").unwrap();
        assert_eq!(fs.cat(&mut session, "d/c").unwrap(), b"c");
        assert_eq!(fs.cat(&mut session, "d/b").unwrap(), data);
        assert!(matches!(
            fs.cp(&mut session, "d", "e"),
            Err(FsError::NotAFile(_))
        ));
        assert_consistent(&fs);
    }

    #[test]
    fn test_cp_missing_source_allocates_nothing() {
        let (mut fs, mut session) = formatted_volume(16);
        fs.create_with(&mut session, "a", b"a").unwrap();
        let before = fs.load_fat().unwrap();
        let err = fs.cp(&mut session, "missing.txt", "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(fs.load_fat().unwrap(), before);
    }

    #[test]
    fn test_cp_needs_read() {
        let (mut fs, mut session) = formatted_volume(16);
        fs.create_with(&mut session, "a", b"a").unwrap();
        fs.chmod(&mut session, "2", "a").unwrap();
        assert!(matches!(
            fs.cp(&mut session, "a", "b"),
            Err(FsError::PermissionDenied(_, "read"))
        ));
        assert!(matches!(
            fs.cat(&mut session, "a"),
            Err(FsError::PermissionDenied(_, "read"))
        ));
    }

    #[test]
    fn test_mv() {
        let (mut fs, mut session) = formatted_volume(16);
        fs.create_with(&mut session, "a", b"content").unwrap();
        let first = record(&fs, &mut session, "a").first_block;
        let fat_before = fs.load_fat().unwrap();

        fs.mv(&mut session, "a", "b").unwrap();
        assert!(matches!(
            fs.cat(&mut session, "a"),
            Err(FsError::NotFound(_))
        ));
        assert_eq!(record(&fs, &mut session, "b").first_block, first);

        fs.mkdir(&mut session, "d").unwrap();
        let fat_with_dir = fs.load_fat().unwrap();
        fs.mv(&mut session, "b", "d").unwrap();
        assert_eq!(fs.cat(&mut session, "/d/b").unwrap(), b"content");
        assert!(fs.cat(&mut session, "b").is_err());
        // no chain is ever allocated
        assert_eq!(fs.load_fat().unwrap(), fat_with_dir);
        assert_ne!(fat_with_dir, fat_before);

        // back up and renamed on the way
        fs.mv(&mut session, "d/b", "/c").unwrap();
        assert_eq!(fs.cat(&mut session, "c").unwrap(), b"content");
        fs.create_with(&mut session, "x", b"x").unwrap();
        assert!(matches!(
            fs.mv(&mut session, "x", "c"),
            Err(FsError::AlreadyExists(_))
        ));
        assert_consistent(&fs);
    }

    #[test]
    fn test_rm_directory() {
        let (mut fs, mut session) = formatted_volume(16);
        fs.mkdir(&mut session, "d").unwrap();
        fs.create_with(&mut session, "d/f", b"f").unwrap();
        assert!(matches!(
            fs.rm(&mut session, "d"),
            Err(FsError::DirectoryNotEmpty(_))
        ));
        fs.rm(&mut session, "d/f").unwrap();

        fs.cd(&mut session, "d").unwrap();
        assert!(matches!(
            fs.rm(&mut session, "/d"),
            Err(FsError::DirectoryBusy(_))
        ));
        assert!(matches!(
            fs.rm(&mut session, ".."),
            Err(FsError::InvalidName(_))
        ));
        fs.cd(&mut session, "..").unwrap();
        fs.rm(&mut session, "d").unwrap();
        assert_eq!(fs.load_fat().unwrap().free_count(), 14);
        assert!(matches!(
            fs.rm(&mut session, "d"),
            Err(FsError::NotFound(_))
        ));
        assert_consistent(&fs);
    }

    #[test]
    fn test_append() {
        let (mut fs, mut session) = formatted_volume(16);
        let a = vec![b'a'; 100];
        let b = vec![b'b'; BLOCK_SIZE - 10];
        fs.create_with(&mut session, "a", &a).unwrap();
        fs.create_with(&mut session, "b", &b).unwrap();
        fs.append(&mut session, "a", "b").unwrap();

        let joined = fs.cat(&mut session, "b").unwrap();
        assert_eq!(joined.len(), a.len() + b.len());
        assert_eq!(&joined[..b.len()], &b[..]);
        assert_eq!(&joined[b.len()..], &a[..]);
        assert_eq!(fs.cat(&mut session, "a").unwrap(), a);
        let fat = fs.load_fat().unwrap();
        assert_eq!(fat.chain(record(&fs, &mut session, "b").first_block).unwrap().len(), 2);
        assert_consistent(&fs);
    }

    #[test]
    fn test_append_at_block_boundary() {
        let (mut fs, mut session) = formatted_volume(16);
        let full = vec![b'f'; BLOCK_SIZE];
        fs.create_with(&mut session, "full", &full).unwrap();
        fs.create_with(&mut session, "tail", b"xyz").unwrap();
        fs.append(&mut session, "tail", "full").unwrap();

        let joined = fs.cat(&mut session, "full").unwrap();
        assert_eq!(joined.len(), BLOCK_SIZE + 3);
        assert_eq!(&joined[BLOCK_SIZE..], b"xyz");
        let fat = fs.load_fat().unwrap();
        assert_eq!(fat.chain(record(&fs, &mut session, "full").first_block).unwrap().len(), 2);

        // an empty file owns one block and fills it first
        fs.create_with(&mut session, "empty", b"").unwrap();
        fs.append(&mut session, "tail", "empty").unwrap();
        assert_eq!(fs.cat(&mut session, "empty").unwrap(), b"xyz");
        let fat = fs.load_fat().unwrap();
        assert_eq!(fat.chain(record(&fs, &mut session, "empty").first_block).unwrap().len(), 1);
        assert_consistent(&fs);
    }

    #[test]
    fn test_append_failures() {
        let (mut fs, mut session) = formatted_volume(5);
        fs.create_with(&mut session, "a", &vec![1u8; BLOCK_SIZE]).unwrap();
        fs.create_with(&mut session, "b", &vec![2u8; BLOCK_SIZE]).unwrap();
        // one free block, two needed
        fs.append(&mut session, "a", "b").unwrap();
        let before = fs.device().clone();
        assert!(matches!(
            fs.append(&mut session, "b", "a"),
            Err(FsError::NoFreeBlocks)
        ));
        assert!(fs.device() == &before);

        fs.chmod(&mut session, "4", "a").unwrap();
        assert!(matches!(
            fs.append(&mut session, "b", "a"),
            Err(FsError::PermissionDenied(_, "write"))
        ));
        assert!(matches!(
            fs.append(&mut session, "nope", "a"),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_mkdir_and_cd() {
        let (mut fs, mut session) = formatted_volume(16);
        fs.mkdir(&mut session, "docs").unwrap();
        fs.mkdir(&mut session, "docs/sub").unwrap();
        let docs = record(&fs, &mut session, "docs");
        assert!(docs.is_dir());
        assert_eq!(docs.size, 1);

        fs.cd(&mut session, "docs/sub").unwrap();
        assert_eq!(fs.pwd(&session), "/docs/sub");
        fs.create_with(&mut session, "f", b"deep").unwrap();
        assert_eq!(fs.cat(&mut session, "/docs/sub/f").unwrap(), b"deep");
        fs.cd(&mut session, "../.").unwrap();
        assert_eq!(fs.pwd(&session), "/docs");
        fs.cd(&mut session, "").unwrap();
        assert_eq!(fs.pwd(&session), "/docs");
        fs.cd(&mut session, "/").unwrap();
        assert_eq!(fs.pwd(&session), "/");
        assert_eq!(session.working_block(), ROOT_BLOCK);

        assert!(fs.cd(&mut session, "..").is_err());
        assert!(fs.cd(&mut session, "nope").is_err());
        assert!(matches!(
            fs.mkdir(&mut session, "docs"),
            Err(FsError::AlreadyExists(_))
        ));
        assert_eq!(fs.pwd(&session), "/");
        assert_consistent(&fs);
    }

    #[test]
    fn test_ls() {
        let (mut fs, mut session) = formatted_volume(16);
        fs.create_with(&mut session, "a", b"abc").unwrap();
        fs.mkdir(&mut session, "d").unwrap();
        let names: Vec<_> = fs
            .ls(&mut session, None)
            .unwrap()
            .iter()
            .map(|r| r.name().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "d"]);

        let inside = fs.ls(&mut session, Some("d")).unwrap();
        assert_eq!(inside.len(), 1);
        assert!(inside[0].is_parent_link());
    }

    #[test]
    fn test_directory_permissions_live_in_parent() {
        let (mut fs, mut session) = formatted_volume(16);
        fs.mkdir(&mut session, "d").unwrap();
        fs.chmod(&mut session, "4", "d").unwrap();
        assert!(matches!(
            fs.create_with(&mut session, "d/f", b""),
            Err(FsError::PermissionDenied(_, "write"))
        ));
        assert!(fs.ls(&mut session, Some("d")).is_ok());

        fs.chmod(&mut session, "2", "d").unwrap();
        fs.cd(&mut session, "d").unwrap();
        assert!(matches!(
            fs.ls(&mut session, None),
            Err(FsError::PermissionDenied(_, "read"))
        ));
        fs.create_with(&mut session, "f", b"").unwrap();
    }

    #[test]
    fn test_chmod() {
        let (mut fs, mut session) = formatted_volume(16);
        fs.create_with(&mut session, "f", b"data").unwrap();
        fs.chmod(&mut session, "4", "f").unwrap();
        let once = record(&fs, &mut session, "f");
        fs.chmod(&mut session, "4", "f").unwrap();
        let twice = record(&fs, &mut session, "f");
        assert_eq!(once, twice);
        assert_eq!(twice.rights(), AccessRights::READ);
        assert_eq!(twice.size, 4);
        assert_eq!(fs.cat(&mut session, "f").unwrap(), b"data");

        assert!(matches!(
            fs.chmod(&mut session, "9", "f"),
            Err(FsError::InvalidRights('9'))
        ));
        assert!(matches!(
            fs.chmod(&mut session, "7", "missing"),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_format_resets() {
        let (mut fs, mut session) = formatted_volume(16);
        fs.mkdir(&mut session, "d").unwrap();
        fs.cd(&mut session, "d").unwrap();
        fs.format(&mut session).unwrap();
        assert_eq!(fs.pwd(&session), "/");
        assert!(fs.ls(&mut session, None).unwrap().is_empty());
        assert_eq!(fs.load_fat().unwrap().free_count(), 14);
    }

    #[test]
    fn test_unformatted_volume_refuses_work() {
        let mut fs = FatFs::new(RamDisk::new(8)).unwrap();
        let mut session = Session::root();
        assert!(matches!(
            fs.create_with(&mut session, "a", b""),
            Err(FsError::Unformatted)
        ));
        assert!(matches!(fs.ls(&mut session, None), Err(FsError::Unformatted)));
    }

    #[test]
    fn test_sessions_are_independent() {
        let (mut fs, mut first) = formatted_volume(16);
        let mut second = Session::root();
        fs.mkdir(&mut first, "d").unwrap();
        fs.cd(&mut first, "d").unwrap();
        fs.create_with(&mut first, "f", b"1").unwrap();
        fs.create_with(&mut second, "f", b"2").unwrap();
        assert_eq!(fs.cat(&mut first, "f").unwrap(), b"1");
        assert_eq!(fs.cat(&mut second, "f").unwrap(), b"2");
    }
}
