use super::ROOT_BLOCK;

/// per-caller view of the volume, several sessions may share one volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    working_block: u16,
    working_path: String,
    /// directory the most recent resolution ended in
    last_resolved: u16,
}

impl Default for Session {
    fn default() -> Self {
        Self::root()
    }
}

impl Session {
    /// a session sitting in the root directory
    pub fn root() -> Self {
        Self {
            working_block: ROOT_BLOCK,
            working_path: "/".to_string(),
            last_resolved: ROOT_BLOCK,
        }
    }

    pub fn working_block(&self) -> u16 {
        self.working_block
    }

    pub fn working_path(&self) -> &str {
        &self.working_path
    }

    pub fn last_resolved(&self) -> u16 {
        self.last_resolved
    }

    pub(crate) fn set_last_resolved(&mut self, block: u16) {
        self.last_resolved = block;
    }

    /// make `block` the working directory, displayed as `path`
    pub(crate) fn enter(&mut self, block: u16, path: String) {
        self.working_block = block;
        self.working_path = path;
        self.last_resolved = block;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::root();
    }
}
