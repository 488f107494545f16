use crate::config::Config;
use crate::core::{Block, Blockchain};
use crate::storage::Database;
use crate::Result;
use clap::{Parser, Subcommand};
use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

static PICKAXE: Emoji<'_, '_> = Emoji("⛏️  ", "");
static CHAIN: Emoji<'_, '_> = Emoji("⛓️  ", "");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "");
static COIN: Emoji<'_, '_> = Emoji("💰 ", "");

#[derive(Parser, Debug)]
#[command(name = "minicoin")]
#[command(about = "Minicoin - a single-node proof-of-work ledger with UTXO accounting")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Data directory")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable debug logging")]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a blockchain and send the genesis reward to ADDRESS
    #[command(name = "createblockchain")]
    CreateBlockchain {
        #[arg(long, help = "Address receiving the genesis reward")]
        address: String,
        #[arg(long, help = "Genesis coinbase memo")]
        memo: Option<String>,
    },

    /// Get the balance of ADDRESS
    #[command(name = "getbalance")]
    GetBalance {
        #[arg(long, help = "Address to query")]
        address: String,
    },

    /// Send AMOUNT of coins from FROM to TO
    Send {
        #[arg(long, help = "Sender address")]
        from: String,
        #[arg(long, help = "Recipient address")]
        to: String,
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..), help = "Amount to send")]
        amount: u64,
    },

    /// Print all the blocks of the blockchain
    #[command(name = "printchain")]
    PrintChain,

    /// Re-validate every block from the tip down to genesis
    #[command(name = "verifychain")]
    VerifyChain,
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging once
    let level = if cli.debug { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).try_init();

    let mut config = Config::load_or_default();
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    let db_path = config.storage.db_path();

    match cli.command {
        Commands::CreateBlockchain { address, memo } => {
            create_blockchain(&config, db_path, &address, memo.as_deref().unwrap_or(""))
        }

        Commands::GetBalance { address } => {
            let blockchain = open_blockchain(&config, db_path)?;
            let balance = blockchain.get_balance(&address)?;
            println!("{}Balance of '{}': {}", COIN, address, style(balance).bold().green());
            Ok(())
        }

        Commands::Send { from, to, amount } => {
            let mut blockchain = open_blockchain(&config, db_path)?;
            let block = with_spinner("Mining block...", || blockchain.send(&from, &to, amount))?;
            println!("{}Success! Block {}", CHECK, style(block.hash).cyan());
            Ok(())
        }

        Commands::PrintChain => {
            let blockchain = open_blockchain(&config, db_path)?;
            print_chain(&blockchain)
        }

        Commands::VerifyChain => {
            let blockchain = open_blockchain(&config, db_path)?;
            let count = blockchain.verify()?;
            println!("{}Chain valid: {} blocks", CHECK, style(count).bold());
            Ok(())
        }
    }
}

fn create_blockchain(config: &Config, db_path: PathBuf, address: &str, memo: &str) -> Result<()> {
    std::fs::create_dir_all(&config.storage.data_dir)?;

    let db = Database::open(&db_path)?;
    let blockchain = with_spinner("Mining genesis block...", || {
        Blockchain::create(db, config, address, memo)
    })?;

    println!("{}Done! Genesis block {}", CHECK, style(blockchain.tip()).cyan());
    println!("Database: {}", db_path.display());
    Ok(())
}

fn open_blockchain(config: &Config, db_path: PathBuf) -> Result<Blockchain> {
    let db = Database::open_existing(&db_path)?;
    Blockchain::open(db, config)
}

fn print_chain(blockchain: &Blockchain) -> Result<()> {
    println!("{}{}", CHAIN, style("Blockchain").bold().cyan());

    for block in blockchain.iter() {
        print_block(blockchain, &block?);
        println!();
    }

    Ok(())
}

fn print_block(blockchain: &Blockchain, block: &Block) {
    let prev_hash = block
        .prev_hash
        .map(|hash| hash.to_hex())
        .unwrap_or_default();
    let timestamp = chrono::DateTime::from_timestamp(block.timestamp, 0)
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| block.timestamp.to_string());

    println!("============ Block {} ============", style(block.hash).bold());
    println!("Prev. hash: {}", prev_hash);
    println!("Timestamp: {}", timestamp);
    println!("Nonce: {}", block.nonce);
    println!("PoW: {}", blockchain.proof_of_work().validate(block));

    for tx in &block.transactions {
        let kind = if tx.is_coinbase() { " (coinbase)" } else { "" };
        println!("--- Transaction {}{}", tx.id, kind);
        for (index, input) in tx.inputs.iter().enumerate() {
            let source = input.txid.map(|txid| txid.to_hex()).unwrap_or_default();
            println!("     Input {}: {}:{} unlocked by '{}'", index, source, input.vout, input.script_sig);
        }
        for (index, output) in tx.outputs.iter().enumerate() {
            println!("     Output {}: {} to '{}'", index, output.value, output.script_pubkey);
        }
    }
}

fn with_spinner<T>(message: &'static str, work: impl FnOnce() -> Result<T>) -> Result<T> {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(spinner_style);
    }
    pb.set_message(format!("{}{}", PICKAXE, message));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = work();
    pb.finish_and_clear();
    result
}
