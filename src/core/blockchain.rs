use crate::config::Config;
use crate::core::utxo::{scan_unspent, select_spendable, total_value, UtxoProvider};
use crate::core::{Block, Transaction, TxOutput};
use crate::crypto::hash::Hash256;
use crate::mining::ProofOfWork;
use crate::storage::Database;
use crate::{LedgerError, Result};

/// Handle on a persisted chain. `tip` moves only inside a block commit, and a
/// commit succeeds only while the stored tip still equals it.
#[derive(Debug)]
pub struct Blockchain {
    tip: Hash256,
    db: Database,
    pow: ProofOfWork,
}

impl Blockchain {
    /// Bootstraps a new chain whose genesis coinbase pays `address`. An empty
    /// memo falls back to the configured genesis message.
    pub fn create(db: Database, config: &Config, address: &str, memo: &str) -> Result<Self> {
        if db.has_chain()? {
            log::warn!("Refusing to create a blockchain over existing chain data");
            return Err(LedgerError::AlreadyExists);
        }

        let pow = ProofOfWork::from_config(&config.mining)?;
        let memo = if memo.is_empty() {
            config.consensus.genesis_message.as_str()
        } else {
            memo
        };

        let coinbase = Transaction::new_coinbase(address, config.consensus.subsidy, memo);
        let genesis = Block::new_genesis(coinbase, &pow)?;
        Self::ensure_valid(&pow, &genesis)?;
        db.commit_block(&genesis, None)?;
        db.set_difficulty(pow.bits())?;

        log::info!("🌱 Created blockchain with genesis block {}", genesis.hash);
        Ok(Self {
            tip: genesis.hash,
            db,
            pow,
        })
    }

    /// Opens an existing chain. Only the tip is read; no blocks are walked.
    /// The difficulty recorded at creation wins over the configured one.
    pub fn open(db: Database, config: &Config) -> Result<Self> {
        let tip = db.get_tip()?.ok_or(LedgerError::NotFound)?;

        let bits = match db.get_difficulty()? {
            Some(bits) => {
                if bits != config.mining.difficulty_bits {
                    log::warn!(
                        "Configured difficulty {} ignored; chain was created at difficulty {}",
                        config.mining.difficulty_bits,
                        bits
                    );
                }
                bits
            }
            None => config.mining.difficulty_bits,
        };
        let pow = ProofOfWork::new(bits, config.mining.max_nonce)?;

        log::debug!("Opened blockchain at tip {}", tip);
        Ok(Self { tip, db, pow })
    }

    pub fn tip(&self) -> Hash256 {
        self.tip
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    /// Mines `transactions` on top of this handle's tip and commits the block
    /// and the new tip together. Fails with `StaleTip` when another writer has
    /// moved the stored tip since this handle last saw it.
    pub fn mine_block(&mut self, transactions: Vec<Transaction>) -> Result<Block> {
        self.ensure_current()?;

        let block = Block::new(transactions, Some(self.tip), &self.pow)?;
        Self::ensure_valid(&self.pow, &block)?;
        self.db.commit_block(&block, Some(self.tip))?;
        self.tip = block.hash;

        log::info!(
            "✅ Block {} added to blockchain ({} transactions)",
            block.hash,
            block.transaction_count()
        );
        Ok(block)
    }

    /// Transfers `amount` from `from` to `to` in a freshly mined block.
    pub fn send(&mut self, from: &str, to: &str, amount: u64) -> Result<Block> {
        if amount == 0 {
            return Err(LedgerError::InvalidInput("Amount must be greater than zero".to_string()));
        }

        let tx = Transaction::new_utxo(from, to, amount, &*self)?;
        self.mine_block(vec![tx])
    }

    /// Newest-first traversal from the tip as of this call.
    pub fn iter(&self) -> BlockchainIterator<'_> {
        BlockchainIterator {
            current_hash: Some(self.tip),
            db: &self.db,
            pow: &self.pow,
        }
    }

    /// Transactions holding at least one unspent output locked to `address`.
    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<Transaction>> {
        Ok(scan_unspent(self.iter(), address)?
            .into_iter()
            .map(|unspent| unspent.transaction)
            .collect())
    }

    pub fn find_utxo(&self, address: &str) -> Result<Vec<TxOutput>> {
        Ok(scan_unspent(self.iter(), address)?
            .iter()
            .flat_map(|unspent| unspent.entries())
            .map(|entry| entry.output)
            .collect())
    }

    pub fn get_balance(&self, address: &str) -> Result<u64> {
        total_value(&self.find_utxo(address)?)
    }

    /// Walks the whole chain and returns its length. Every block must pass
    /// proof-of-work validation and the walk must end at a single genesis.
    pub fn verify(&self) -> Result<usize> {
        let mut count = 0;
        let mut reached_genesis = false;

        for block in self.iter() {
            let block = block?;
            count += 1;
            reached_genesis = block.is_genesis();
        }

        if !reached_genesis {
            return Err(LedgerError::CorruptRecord("Chain does not end at a genesis block".to_string()));
        }

        log::info!("Verified {} blocks from tip {}", count, self.tip);
        Ok(count)
    }

    fn ensure_current(&self) -> Result<()> {
        let stored = self.db.get_tip()?;
        if stored == Some(self.tip) {
            return Ok(());
        }

        log::warn!("Refusing to mine on stale tip {}", self.tip);
        Err(LedgerError::StaleTip {
            expected: self.tip.to_hex(),
            found: stored.map(|hash| hash.to_hex()).unwrap_or_else(|| "none".to_string()),
        })
    }

    fn ensure_valid(pow: &ProofOfWork, block: &Block) -> Result<()> {
        if pow.validate(block) {
            Ok(())
        } else {
            Err(LedgerError::CorruptRecord(format!("Block {} failed proof-of-work validation", block.hash)))
        }
    }
}

impl UtxoProvider for Blockchain {
    fn find_spendable_outputs(&self, address: &str, amount: u64) -> Result<(u64, Vec<(Hash256, usize)>)> {
        let unspent = scan_unspent(self.iter(), address)?;
        select_spendable(&unspent, amount)
    }
}

/// Reads one block per step and rewinds to its predecessor. Iteration ends
/// after the genesis block, or after the first error.
pub struct BlockchainIterator<'a> {
    current_hash: Option<Hash256>,
    db: &'a Database,
    pow: &'a ProofOfWork,
}

impl<'a> BlockchainIterator<'a> {
    fn read(&self, hash: &Hash256) -> Result<Block> {
        let block = self
            .db
            .get_block(hash)?
            .ok_or_else(|| LedgerError::CorruptRecord(format!("Block {} missing from store", hash)))?;

        if block.hash != *hash || !self.pow.validate(&block) {
            return Err(LedgerError::CorruptRecord(format!("Block {} failed validation", hash)));
        }

        Ok(block)
    }
}

impl<'a> Iterator for BlockchainIterator<'a> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.current_hash.take()?;

        match self.read(&hash) {
            Ok(block) => {
                self.current_hash = block.prev_hash;
                Some(Ok(block))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
