//! SilentPool over EVM JSON-RPC.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::{
    prelude::*,
    types::{Address, H256, U256},
    utils::to_checksum,
};
use tracing::{debug, info};

use super::{LogEntry, PoolLedger, RequestCall, TxHash, TxReceipt, WithdrawalRequest};
use crate::error::LedgerError;
use crate::note::Bytes32;

abigen!(
    SilentPoolContract,
    r#"[
        function requestWithdrawal(address token, uint256 poolId, bytes32 commitment, bytes32 nullifier, bytes32 secret, address recipient, bytes32[] merkleProof) external returns (uint256)
        function fulfillWithdrawal(uint256 requestId) external
        function getWithdrawalRequest(uint256 requestId) external view returns (bytes32, address, uint256, bool, uint256)
        function commitmentExists(bytes32 commitment) external view returns (bool)
        function isNullifierUsed(bytes32 nullifier) external view returns (bool)
    ]"#
);

type Client = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Pool ledger backed by an HTTP RPC endpoint and a local signing key
pub struct EvmLedger {
    client: Arc<Client>,
    contract: SilentPoolContract<Client>,
    pool_address: Address,
    chain_id: u64,
}

impl EvmLedger {
    /// Connect to `rpc_url` and bind the pool at `pool_address`
    ///
    /// Without a wallet a throwaway key is used, which is enough for the
    /// read-only calls.
    pub async fn connect(
        rpc_url: &str,
        pool_address: &str,
        wallet: Option<LocalWallet>,
    ) -> Result<Self, LedgerError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| LedgerError::Rpc(format!("invalid RPC URL {rpc_url}: {e}")))?;

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?
            .as_u64();

        let wallet = wallet
            .unwrap_or_else(|| LocalWallet::new(&mut rand::thread_rng()))
            .with_chain_id(chain_id);

        let pool_address = parse_address(pool_address)?;
        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        let contract = SilentPoolContract::new(pool_address, client.clone());

        debug!(%rpc_url, chain_id, pool = ?pool_address, "connected to pool");

        Ok(Self {
            client,
            contract,
            pool_address,
            chain_id,
        })
    }

    /// Address that signs and pays for submitted transactions
    pub fn signer_address(&self) -> String {
        to_checksum(&self.client.signer().address(), None)
    }
}

#[async_trait]
impl PoolLedger for EvmLedger {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        Ok(self.chain_id)
    }

    async fn commitment_exists(&self, commitment: &Bytes32) -> Result<bool, LedgerError> {
        self.contract
            .commitment_exists(commitment.0)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn is_nullifier_used(&self, nullifier: &Bytes32) -> Result<bool, LedgerError> {
        self.contract
            .is_nullifier_used(nullifier.0)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn get_withdrawal_request(&self, request_id: u64) -> Result<WithdrawalRequest, LedgerError> {
        let (commitment, recipient, request_timestamp, fulfilled, time_until_withdrawal) = self
            .contract
            .get_withdrawal_request(U256::from(request_id))
            .call()
            .await
            .map_err(contract_error)?;

        Ok(WithdrawalRequest {
            commitment: Bytes32(commitment),
            recipient: to_checksum(&recipient, None),
            request_timestamp: saturating_u64(request_timestamp),
            fulfilled,
            time_until_withdrawal: saturating_u64(time_until_withdrawal),
        })
    }

    async fn submit_request(&self, request: &RequestCall) -> Result<TxHash, LedgerError> {
        let token = parse_address(&request.token)?;
        let recipient = parse_address(&request.recipient)?;
        let proof: Vec<[u8; 32]> = request.merkle_proof.iter().map(|p| p.0).collect();

        let call = self.contract.request_withdrawal(
            token,
            U256::from(request.pool_id),
            request.commitment.0,
            request.nullifier.0,
            request.secret.0,
            recipient,
            proof,
        );

        let pending = call.send().await.map_err(contract_error)?;
        let tx_hash = Bytes32(pending.tx_hash().0);

        info!(%tx_hash, pool_id = request.pool_id, "withdrawal request broadcast");
        Ok(tx_hash)
    }

    async fn submit_fulfill(&self, request_id: u64) -> Result<TxHash, LedgerError> {
        let call = self.contract.fulfill_withdrawal(U256::from(request_id));

        let pending = call.send().await.map_err(contract_error)?;
        let tx_hash = Bytes32(pending.tx_hash().0);

        info!(%tx_hash, request_id, "withdrawal claim broadcast");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: &TxHash,
        confirmations: usize,
    ) -> Result<TxReceipt, LedgerError> {
        let receipt = PendingTransaction::new(H256::from(tx_hash.0), self.client.provider())
            .confirmations(confirmations)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?
            .ok_or_else(|| LedgerError::Dropped(tx_hash.to_hex()))?;

        // Only the pool's own events can carry the request id
        let logs = receipt
            .logs
            .iter()
            .filter(|log| log.address == self.pool_address)
            .map(|log| LogEntry {
                topics: log.topics.iter().map(|t| Bytes32(t.0)).collect(),
                data: log.data.to_vec(),
            })
            .collect();

        Ok(TxReceipt {
            tx_hash: *tx_hash,
            success: receipt.status.map_or(true, |status| status.as_u64() == 1),
            block_number: receipt.block_number.map(|n| n.as_u64()),
            logs,
        })
    }
}

fn parse_address(input: &str) -> Result<Address, LedgerError> {
    input
        .parse::<Address>()
        .map_err(|_| LedgerError::InvalidAddress(input.to_string()))
}

fn contract_error<M: Middleware>(err: ContractError<M>) -> LedgerError {
    LedgerError::Contract(err.to_string())
}

fn saturating_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.as_u64()
    }
}
