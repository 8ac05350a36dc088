//! Dictionary sets.
//!
//! A `.multi` file names a group of compiled dictionaries, one
//! `add <file>` line each; members resolve relative to the set file and
//! may themselves be sets. Loading flattens the tree into read-only
//! dictionaries, so the speller only ever sees the members.

use crate::cache::DictCache;
use crate::error::{Error, Result};
use crate::readonly::ReadOnlyDict;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct MultiDict {
    name: String,
    members: Vec<Arc<ReadOnlyDict>>,
}

impl MultiDict {
    pub fn load(path: impl AsRef<Path>, data_dir: &Path, cache: &DictCache) -> Result<MultiDict> {
        let path = path.as_ref();
        let mut multi = MultiDict {
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            members: Vec::new(),
        };
        multi.load_into(path, data_dir, cache, 0)?;
        Ok(multi)
    }

    fn load_into(
        &mut self,
        path: &Path,
        data_dir: &Path,
        cache: &DictCache,
        depth: usize,
    ) -> Result<()> {
        if depth > 8 {
            return Err(Error::bad_format(
                path,
                0,
                "a dictionary set nested at most 8 deep",
                "a deeper nesting (cycle?)",
            ));
        }
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let dir = path.parent().unwrap_or(Path::new("."));
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some(entry) = line.strip_prefix("add ") else {
                return Err(Error::bad_format(
                    path,
                    lineno as u32 + 1,
                    "add <dictionary>",
                    line.to_string(),
                ));
            };
            let member = dir.join(entry.trim());
            if member.extension().map(|e| e == "multi").unwrap_or(false) {
                self.load_into(&member, data_dir, cache, depth + 1)?;
            } else {
                self.members.push(cache.get(&member, data_dir)?);
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The flattened members, in file order.
    pub fn members(&self) -> &[Arc<ReadOnlyDict>] {
        &self.members
    }

    pub fn into_members(self) -> Vec<Arc<ReadOnlyDict>> {
        self.members
    }
}
