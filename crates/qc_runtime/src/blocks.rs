//! Registry of named blocks.
//!
//! Named blocks outlive the values that mention them: a value holds only
//! the id, so growth through one alias is seen through every other.

use std::fmt::Write;

use qc_core::{ByteBlock, FastHashMap, NamedBlockId, Subtype};

use crate::errors::BlockError;

#[derive(Debug)]
pub struct NamedBlock {
    name: String,
    id: NamedBlockId,
    pub subtype: Subtype,
    block: Option<ByteBlock>,
}

impl NamedBlock {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> NamedBlockId {
        self.id
    }

    /// Storage, or `None` once freed.
    pub fn block(&self) -> Option<&ByteBlock> {
        self.block.as_ref()
    }

    pub fn block_mut(&mut self) -> Option<&mut ByteBlock> {
        self.block.as_mut()
    }

    pub fn is_freed(&self) -> bool {
        self.block.is_none()
    }

    pub fn can_grow(&self) -> bool {
        self.subtype.can_grow()
    }
}

pub struct NamedBlocks {
    blocks: Vec<NamedBlock>,
    by_name: FastHashMap<String, NamedBlockId>,
}

impl NamedBlocks {
    pub fn new() -> Self {
        Self { blocks: Vec::new(), by_name: FastHashMap::default() }
    }

    pub fn create(&mut self, name: &str, len: i64, chunk: i64) -> Result<NamedBlockId, BlockError> {
        if self.by_name.contains_key(name) {
            return Err(BlockError::NameExists(name.to_owned()));
        }
        let len = usize::try_from(len).map_err(|_| BlockError::BadLength(len))?;
        let chunk = usize::try_from(chunk).map_err(|_| BlockError::BadChunk(chunk))?;
        let id = NamedBlockId(self.blocks.len() as u32);
        self.blocks.push(NamedBlock {
            name: name.to_owned(),
            id,
            subtype: Subtype::empty(),
            block: Some(ByteBlock::alloc(len, chunk)),
        });
        self.by_name.insert(name.to_owned(), id);
        tracing::debug!(name, id = id.0, len, "named block created");
        Ok(id)
    }

    pub fn find_id(&self, name: &str) -> Option<NamedBlockId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: NamedBlockId) -> Option<&NamedBlock> {
        self.blocks.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NamedBlockId) -> Option<&mut NamedBlock> {
        self.blocks.get_mut(id.0 as usize)
    }

    /// Resizes the block, reallocating storage for a freed block. Negative
    /// `len` or `chunk` keep the current setting; chunk zero is the default.
    /// A NO_REALLOC block only accepts a request that keeps both settings.
    pub fn realloc(&mut self, id: NamedBlockId, len: i64, chunk: i64) -> Result<(), BlockError> {
        let nblk = self.get_mut(id).ok_or(BlockError::NoSuchId(id))?;
        if !nblk.can_grow() {
            if len < 0 && chunk < 0 && nblk.block.is_some() {
                return Ok(());
            }
            return Err(BlockError::Protected(id));
        }
        match nblk.block.as_mut() {
            Some(block) => block.realloc(len, chunk),
            None => {
                let mut block = ByteBlock::alloc(0, chunk.max(0) as usize);
                block.realloc(len.max(0), chunk);
                nblk.block = Some(block);
            }
        }
        tracing::debug!(id = id.0, len, chunk, "named block reallocated");
        Ok(())
    }

    /// Frees the storage. The id and name stay reserved; freeing a freed
    /// block succeeds.
    pub fn remove(&mut self, id: NamedBlockId) -> Result<(), BlockError> {
        let nblk = self.get_mut(id).ok_or(BlockError::NoSuchId(id))?;
        if nblk.block.is_none() {
            return Ok(());
        }
        if !nblk.can_grow() {
            return Err(BlockError::Protected(id));
        }
        nblk.block = None;
        tracing::debug!(id = id.0, "named block freed");
        Ok(())
    }

    pub fn remove_by_name(&mut self, name: &str) -> Result<(), BlockError> {
        let id = self.find_id(name).ok_or_else(|| BlockError::NoSuchName(name.to_owned()))?;
        self.remove(id)
    }

    pub fn protect(&mut self, id: NamedBlockId, bits: Subtype) -> Result<(), BlockError> {
        let nblk = self.get_mut(id).ok_or(BlockError::NoSuchId(id))?;
        nblk.subtype.insert(bits);
        Ok(())
    }

    /// Number of ids handed out, freed blocks included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn count_live(&self) -> usize {
        self.blocks.iter().filter(|b| !b.is_freed()).count()
    }

    pub fn show(&self) -> String {
        if self.count_live() == 0 {
            return String::from("No unfreed named blocks\n\n");
        }
        let mut out = String::from(" id   name\n----  -----\n");
        for nblk in self.blocks.iter().filter(|b| !b.is_freed()) {
            let _ = writeln!(out, "{:3}   {}", nblk.id.0, nblk.name);
        }
        out.push('\n');
        out
    }

    pub fn describe(&self, id: NamedBlockId) -> String {
        match self.get(id) {
            Some(nblk) => match nblk.block() {
                Some(block) => format!("block {}: {}\n\t{block}", nblk.id.0, nblk.name),
                None => format!("block {}: {}\n\t(freed)", nblk.id.0, nblk.name),
            },
            None => format!("block {}: (unknown)", id.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_find_by_name() {
        let mut blocks = NamedBlocks::new();
        let a = blocks.create("alpha", 10, 0).unwrap();
        let b = blocks.create("beta", 0, 16).unwrap();
        assert_eq!(blocks.find_id("alpha"), Some(a));
        assert_eq!(blocks.find_id("beta"), Some(b));
        assert_eq!(blocks.get(b).unwrap().block().unwrap().capacity(), 16);
        assert!(matches!(blocks.create("alpha", 1, 0), Err(BlockError::NameExists(_))));
    }

    #[test]
    fn remove_keeps_id_reserved() {
        let mut blocks = NamedBlocks::new();
        let a = blocks.create("a", 4, 0).unwrap();
        blocks.remove(a).unwrap();
        assert!(blocks.get(a).unwrap().is_freed());
        assert_eq!(blocks.count_live(), 0);
        assert_eq!(blocks.len(), 1);
        blocks.remove(a).unwrap();
        blocks.realloc(a, 8, -1).unwrap();
        assert_eq!(blocks.get(a).unwrap().block().unwrap().len(), 8);
    }

    #[test]
    fn no_realloc_blocks_cannot_be_freed() {
        let mut blocks = NamedBlocks::new();
        let a = blocks.create("fixed", 4, 0).unwrap();
        blocks.protect(a, Subtype::NO_REALLOC).unwrap();
        let err = blocks.remove_by_name("fixed").unwrap_err();
        assert_eq!(err.code().get(), 10210);
    }

    #[test]
    fn no_realloc_blocks_keep_their_size() {
        let mut blocks = NamedBlocks::new();
        let a = blocks.create("pinned", 4, 8).unwrap();
        blocks.protect(a, Subtype::NO_REALLOC).unwrap();
        assert!(matches!(blocks.realloc(a, 16, -1), Err(BlockError::Protected(_))));
        assert!(matches!(blocks.realloc(a, -1, 32), Err(BlockError::Protected(_))));
        blocks.realloc(a, -1, -1).unwrap();
        let block = blocks.get(a).unwrap().block().unwrap();
        assert_eq!((block.len(), block.capacity()), (4, 8));
    }

    #[test]
    fn show_lists_unfreed_only() {
        let mut blocks = NamedBlocks::new();
        assert!(blocks.show().starts_with("No unfreed"));
        let a = blocks.create("kept", 1, 0).unwrap();
        let b = blocks.create("gone", 1, 0).unwrap();
        blocks.remove(b).unwrap();
        let listing = blocks.show();
        assert!(listing.contains("kept"));
        assert!(!listing.contains("gone"));
        assert!(blocks.describe(a).contains("datalen = 1"));
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut blocks = NamedBlocks::new();
        assert!(matches!(blocks.remove(NamedBlockId(3)), Err(BlockError::NoSuchId(_))));
        assert!(matches!(blocks.create("neg", -1, 0), Err(BlockError::BadLength(-1))));
    }
}
