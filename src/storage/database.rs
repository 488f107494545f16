use crate::core::Block;
use crate::crypto::hash::Hash256;
use crate::{LedgerError, Result};
use sled::transaction::{abort, ConflictableTransactionResult, TransactionError};
use sled::{Db, Tree};
use std::path::Path;

const TREE_BLOCKS: &str = "blocks";
const TREE_META: &str = "meta";

/// Reserved key holding the hash of the chain tip.
pub const TIP_KEY: &[u8] = b"l";

const DIFFICULTY_KEY: &[u8] = b"difficulty_bits";

/// Block store: `hash -> bincode(block)` plus the tip pointer, in one sled
/// tree. Chain parameters fixed at creation live in a separate `meta` tree.
#[derive(Debug, Clone)]
pub struct Database {
    db: Db,
    blocks: Tree,
    meta: Tree,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| LedgerError::Storage(format!("Failed to open database: {}", e)))?;
        Self::from_db(db)
    }

    /// Opens a store that must already exist on disk.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !Self::exists(&path) {
            return Err(LedgerError::NotFound);
        }
        Self::open(path)
    }

    /// Throwaway in-memory store.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| LedgerError::Storage(format!("Failed to open temporary database: {}", e)))?;
        Self::from_db(db)
    }

    pub fn exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists()
    }

    fn from_db(db: Db) -> Result<Self> {
        let blocks = Self::open_tree(&db, TREE_BLOCKS)?;
        let meta = Self::open_tree(&db, TREE_META)?;
        Ok(Self { db, blocks, meta })
    }

    fn open_tree(db: &Db, name: &str) -> Result<Tree> {
        db.open_tree(name)
            .map_err(|e| LedgerError::Storage(format!("Failed to open tree {}: {}", name, e)))
    }

    pub fn get_tip(&self) -> Result<Option<Hash256>> {
        match self.blocks.get(TIP_KEY)? {
            Some(bytes) => Hash256::from_slice(&bytes)
                .map(Some)
                .ok_or_else(|| LedgerError::CorruptRecord("Invalid tip hash length".to_string())),
            None => Ok(None),
        }
    }

    pub fn has_chain(&self) -> Result<bool> {
        Ok(self.blocks.contains_key(TIP_KEY)?)
    }

    pub fn get_block(&self, hash: &Hash256) -> Result<Option<Block>> {
        match self.blocks.get(hash.as_bytes())? {
            Some(data) => Ok(Some(Block::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    /// Writes the block under its hash and moves the tip to it in one sled
    /// transaction, then flushes. The write happens only while the stored tip
    /// still equals `expected_tip` (`None` for a store without a chain).
    /// Existing block keys are never overwritten.
    pub fn commit_block(&self, block: &Block, expected_tip: Option<Hash256>) -> Result<()> {
        let block_data = block.serialize()?;
        let key = block.hash.as_bytes();
        let expected = expected_tip.as_ref().map(|hash| &hash.as_bytes()[..]);

        self.blocks
            .transaction(|tree| -> ConflictableTransactionResult<(), LedgerError> {
                if tree.get(&key[..])?.is_some() {
                    return abort(LedgerError::Storage(format!("Block {} already stored", block.hash)));
                }

                let current = tree.get(TIP_KEY)?;
                if current.as_deref() != expected {
                    let error = match (&expected_tip, current) {
                        (None, Some(_)) => LedgerError::AlreadyExists,
                        (_, found) => LedgerError::StaleTip {
                            expected: describe_tip(expected),
                            found: describe_tip(found.as_deref()),
                        },
                    };
                    return abort(error);
                }

                tree.insert(&key[..], block_data.as_slice())?;
                tree.insert(TIP_KEY, &key[..])?;
                Ok(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => LedgerError::Storage(format!("Failed to commit block: {}", e)),
            })?;
        self.flush()?;

        log::debug!("💾 Saved block {} and advanced tip", block.hash);
        Ok(())
    }

    /// Difficulty the chain was created with, if recorded.
    pub fn get_difficulty(&self) -> Result<Option<u32>> {
        match self.meta.get(DIFFICULTY_KEY)? {
            Some(bytes) => {
                let bytes: [u8; 4] = bytes
                    .as_ref()
                    .try_into()
                    .map_err(|_| LedgerError::CorruptRecord("Invalid difficulty record".to_string()))?;
                Ok(Some(u32::from_be_bytes(bytes)))
            }
            None => Ok(None),
        }
    }

    pub fn set_difficulty(&self, bits: u32) -> Result<()> {
        self.meta.insert(DIFFICULTY_KEY, &bits.to_be_bytes()[..])?;
        self.flush()
    }

    /// Number of stored blocks, excluding the tip pointer.
    pub fn block_count(&self) -> usize {
        self.blocks
            .iter()
            .keys()
            .filter_map(|key| key.ok())
            .filter(|key| key.as_ref() != TIP_KEY)
            .count()
    }

    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| LedgerError::Storage(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.blocks.insert(key, value)?;
        Ok(())
    }
}

fn describe_tip(tip: Option<&[u8]>) -> String {
    match tip.and_then(Hash256::from_slice) {
        Some(hash) => hash.to_hex(),
        None => "none".to_string(),
    }
}
