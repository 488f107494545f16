use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Blockchain already exists")]
    AlreadyExists,

    #[error("No existing blockchain found, create one first")]
    NotFound,

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Proof of work exhausted the nonce space below {ceiling}")]
    ExhaustedSearchSpace { ceiling: u64 },

    #[error("Chain tip moved from {expected} to {found}; reopen the blockchain and retry")]
    StaleTip { expected: String, found: String },

    #[error("Output values overflow a 64-bit amount")]
    ValueOverflow,

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
