//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `transactions` - Append-mostly transaction rows (key: transaction id)
//! - `deposits` - Manual deposit submissions (key: deposit id)
//! - `refs` - Reference uniqueness anchor (key: reference, value: transaction id)
//! - `indices` - Secondary indices for account and status scans
//!
//! Multi-row postings commit through a single `WriteBatch`: either every leg
//! of a transfer (and its index rows) becomes visible, or none does. Status
//! transitions rewrite the row and move its status index entry in the same
//! batch.

use crate::{
    error::{Error, Result},
    types::{
        AccountId, DepositStatus, ManualDeposit, Transaction, TransactionReference,
        TransactionStatus,
    },
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_TRANSACTIONS: &str = "transactions";
const CF_DEPOSITS: &str = "deposits";
const CF_REFS: &str = "refs";
const CF_INDICES: &str = "indices";

/// Empty index value
const EMPTY: &[u8] = &[];

/// Index key tags (first byte of every `indices` key)
const IDX_ACCOUNT_TXN: u8 = b'a';
const IDX_STATUS_TXN: u8 = b's';
const IDX_ACCOUNT_DEPOSIT: u8 = b'd';
const IDX_STATUS_DEPOSIT: u8 = b'q';

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_rows()),
            ColumnFamilyDescriptor::new(CF_DEPOSITS, Self::cf_options_rows()),
            ColumnFamilyDescriptor::new(CF_REFS, Self::cf_options_lookup()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_lookup()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    fn cf_options_rows() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_lookup() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Index key helpers

    fn index_key_account(tag: u8, account: &AccountId, id: Uuid) -> Vec<u8> {
        let mut key = vec![tag];
        key.extend_from_slice(account.as_str().as_bytes());
        key.push(0);
        key.extend_from_slice(id.as_bytes());
        key
    }

    fn index_prefix_account(tag: u8, account: &AccountId) -> Vec<u8> {
        let mut key = vec![tag];
        key.extend_from_slice(account.as_str().as_bytes());
        key.push(0);
        key
    }

    fn index_key_status(tag: u8, status: u8, id: Uuid) -> Vec<u8> {
        let mut key = vec![tag, status];
        key.extend_from_slice(id.as_bytes());
        key
    }

    /// Scan index keys with the given prefix, extracting the trailing row id.
    ///
    /// UUIDv7 row ids sort by creation time, so results come back oldest
    /// first.
    fn scan_index_ids(&self, prefix: &[u8]) -> Result<Vec<Uuid>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let iter = self.db.prefix_iterator_cf(cf, prefix);

        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            if key.len() >= prefix.len() + 16 {
                let id_bytes: [u8; 16] = key[key.len() - 16..].try_into().map_err(|_| {
                    Error::Storage("Malformed index key".to_string())
                })?;
                ids.push(Uuid::from_bytes(id_bytes));
            }
        }

        Ok(ids)
    }

    // Transaction operations

    /// Append a group of transaction rows atomically.
    ///
    /// Every row, its reference entry and its index entries commit in one
    /// `WriteBatch`. Fails with `DuplicateReference` (writing nothing) if any
    /// reference already exists or repeats within the group.
    pub fn append_transactions(&self, txns: &[Transaction]) -> Result<()> {
        let cf_txns = self.cf_handle(CF_TRANSACTIONS)?;
        let cf_refs = self.cf_handle(CF_REFS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        // Uniqueness check up front; the single-writer actor makes
        // check-then-write safe.
        let mut seen = HashSet::new();
        for txn in txns {
            if !seen.insert(txn.reference.as_str().to_string())
                || self.db.get_cf(cf_refs, txn.reference.as_str().as_bytes())?.is_some()
            {
                return Err(Error::DuplicateReference(txn.reference.to_string()));
            }
        }

        let mut batch = WriteBatch::default();
        for txn in txns {
            let value = bincode::serialize(txn)?;
            batch.put_cf(cf_txns, txn.id.as_bytes(), &value);
            batch.put_cf(cf_refs, txn.reference.as_str().as_bytes(), txn.id.as_bytes());
            batch.put_cf(
                cf_indices,
                Self::index_key_account(IDX_ACCOUNT_TXN, &txn.owner, txn.id),
                EMPTY,
            );
            batch.put_cf(
                cf_indices,
                Self::index_key_status(IDX_STATUS_TXN, txn.status as u8, txn.id),
                EMPTY,
            );
        }
        self.db.write(batch)?;

        for txn in txns {
            tracing::debug!(
                id = %txn.id,
                reference = %txn.reference,
                kind = %txn.kind,
                "Transaction appended"
            );
        }

        Ok(())
    }

    /// Rewrite a transitioned row, moving its status index entry in the same
    /// batch.
    pub fn update_transaction(
        &self,
        previous_status: TransactionStatus,
        txn: &Transaction,
    ) -> Result<()> {
        let cf_txns = self.cf_handle(CF_TRANSACTIONS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let mut batch = WriteBatch::default();
        let value = bincode::serialize(txn)?;
        batch.put_cf(cf_txns, txn.id.as_bytes(), &value);
        if previous_status != txn.status {
            batch.delete_cf(
                cf_indices,
                Self::index_key_status(IDX_STATUS_TXN, previous_status as u8, txn.id),
            );
            batch.put_cf(
                cf_indices,
                Self::index_key_status(IDX_STATUS_TXN, txn.status as u8, txn.id),
                EMPTY,
            );
        }
        self.db.write(batch)?;

        Ok(())
    }

    /// Get transaction by ID
    pub fn transaction(&self, id: Uuid) -> Result<Transaction> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let value = self
            .db
            .get_cf(cf, id.as_bytes())?
            .ok_or_else(|| Error::TransactionNotFound(id.to_string()))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Check whether a reference is already taken
    pub fn reference_exists(&self, reference: &TransactionReference) -> Result<bool> {
        let cf = self.cf_handle(CF_REFS)?;
        Ok(self.db.get_cf(cf, reference.as_str().as_bytes())?.is_some())
    }

    /// Look a transaction up by its reference
    pub fn find_by_reference(&self, reference: &TransactionReference) -> Result<Transaction> {
        let cf = self.cf_handle(CF_REFS)?;
        let value = self
            .db
            .get_cf(cf, reference.as_str().as_bytes())?
            .ok_or_else(|| Error::TransactionNotFound(reference.to_string()))?;
        let id_bytes: [u8; 16] = value[..]
            .try_into()
            .map_err(|_| Error::Storage("Malformed reference entry".to_string()))?;
        self.transaction(Uuid::from_bytes(id_bytes))
    }

    /// All transaction rows for an account, oldest first
    pub fn transactions_of(&self, account: &AccountId) -> Result<Vec<Transaction>> {
        let prefix = Self::index_prefix_account(IDX_ACCOUNT_TXN, account);
        self.scan_index_ids(&prefix)?
            .into_iter()
            .map(|id| self.transaction(id))
            .collect()
    }

    /// All transaction rows with the given status, oldest first
    pub fn transactions_with_status(&self, status: TransactionStatus) -> Result<Vec<Transaction>> {
        let prefix = [IDX_STATUS_TXN, status as u8];
        self.scan_index_ids(&prefix)?
            .into_iter()
            .map(|id| self.transaction(id))
            .collect()
    }

    /// Full transaction scan (platform balance)
    pub fn all_transactions(&self) -> Result<Vec<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let iter = self.db.iterator_cf(cf, IteratorMode::Start);

        let mut txns = Vec::new();
        for item in iter {
            let (_, value) = item?;
            txns.push(bincode::deserialize(&value)?);
        }
        Ok(txns)
    }

    // Manual deposit operations

    /// Store a new deposit submission with its index entries
    pub fn put_deposit(&self, deposit: &ManualDeposit) -> Result<()> {
        let cf_deposits = self.cf_handle(CF_DEPOSITS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let mut batch = WriteBatch::default();
        let value = bincode::serialize(deposit)?;
        batch.put_cf(cf_deposits, deposit.id.as_bytes(), &value);
        batch.put_cf(
            cf_indices,
            Self::index_key_account(IDX_ACCOUNT_DEPOSIT, &deposit.owner, deposit.id),
            EMPTY,
        );
        batch.put_cf(
            cf_indices,
            Self::index_key_status(IDX_STATUS_DEPOSIT, deposit.status as u8, deposit.id),
            EMPTY,
        );
        self.db.write(batch)?;

        tracing::debug!(id = %deposit.id, owner = %deposit.owner, "Manual deposit stored");

        Ok(())
    }

    /// Rewrite a transitioned deposit, moving its status index entry
    pub fn update_deposit(
        &self,
        previous_status: DepositStatus,
        deposit: &ManualDeposit,
    ) -> Result<()> {
        let cf_deposits = self.cf_handle(CF_DEPOSITS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let mut batch = WriteBatch::default();
        let value = bincode::serialize(deposit)?;
        batch.put_cf(cf_deposits, deposit.id.as_bytes(), &value);
        if previous_status != deposit.status {
            batch.delete_cf(
                cf_indices,
                Self::index_key_status(IDX_STATUS_DEPOSIT, previous_status as u8, deposit.id),
            );
            batch.put_cf(
                cf_indices,
                Self::index_key_status(IDX_STATUS_DEPOSIT, deposit.status as u8, deposit.id),
                EMPTY,
            );
        }
        self.db.write(batch)?;

        Ok(())
    }

    /// Commit a deposit approval and its wallet credit in one batch.
    ///
    /// Either the approved deposit and the `AddMoney` transaction both become
    /// visible, or neither does.
    pub fn approve_deposit_atomic(
        &self,
        deposit: &ManualDeposit,
        credit: &Transaction,
    ) -> Result<()> {
        let cf_deposits = self.cf_handle(CF_DEPOSITS)?;
        let cf_txns = self.cf_handle(CF_TRANSACTIONS)?;
        let cf_refs = self.cf_handle(CF_REFS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        if self
            .db
            .get_cf(cf_refs, credit.reference.as_str().as_bytes())?
            .is_some()
        {
            return Err(Error::DuplicateReference(credit.reference.to_string()));
        }

        let mut batch = WriteBatch::default();

        let deposit_value = bincode::serialize(deposit)?;
        batch.put_cf(cf_deposits, deposit.id.as_bytes(), &deposit_value);
        batch.delete_cf(
            cf_indices,
            Self::index_key_status(IDX_STATUS_DEPOSIT, DepositStatus::Pending as u8, deposit.id),
        );
        batch.put_cf(
            cf_indices,
            Self::index_key_status(IDX_STATUS_DEPOSIT, deposit.status as u8, deposit.id),
            EMPTY,
        );

        let credit_value = bincode::serialize(credit)?;
        batch.put_cf(cf_txns, credit.id.as_bytes(), &credit_value);
        batch.put_cf(cf_refs, credit.reference.as_str().as_bytes(), credit.id.as_bytes());
        batch.put_cf(
            cf_indices,
            Self::index_key_account(IDX_ACCOUNT_TXN, &credit.owner, credit.id),
            EMPTY,
        );
        batch.put_cf(
            cf_indices,
            Self::index_key_status(IDX_STATUS_TXN, credit.status as u8, credit.id),
            EMPTY,
        );

        self.db.write(batch)?;

        tracing::info!(
            deposit_id = %deposit.id,
            transaction_id = %credit.id,
            amount = %credit.amount,
            "Manual deposit approved and credited"
        );

        Ok(())
    }

    /// Get deposit by ID
    pub fn deposit(&self, id: Uuid) -> Result<ManualDeposit> {
        let cf = self.cf_handle(CF_DEPOSITS)?;
        let value = self
            .db
            .get_cf(cf, id.as_bytes())?
            .ok_or_else(|| Error::DepositNotFound(id.to_string()))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// All deposit submissions for an account, oldest first
    pub fn deposits_of(&self, account: &AccountId) -> Result<Vec<ManualDeposit>> {
        let prefix = Self::index_prefix_account(IDX_ACCOUNT_DEPOSIT, account);
        self.scan_index_ids(&prefix)?
            .into_iter()
            .map(|id| self.deposit(id))
            .collect()
    }

    /// All deposit submissions with the given status, oldest first
    pub fn deposits_with_status(&self, status: DepositStatus) -> Result<Vec<ManualDeposit>> {
        let prefix = [IDX_STATUS_DEPOSIT, status as u8];
        self.scan_index_ids(&prefix)?
            .into_iter()
            .map(|id| self.deposit(id))
            .collect()
    }
}
