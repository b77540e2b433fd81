//! Ethereum JSON-RPC verifier
//!
//! Native ETH transfers only. Amounts are read in wei and scaled by 10^18.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{amount_matches, TransactionData, TransactionVerifier, Verdict, VerificationError};
use crate::models::AssetSymbol;

const WEI_DECIMALS: u32 = 18;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    hash: String,
    from: String,
    to: Option<String>,
    value: String,
    block_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcReceipt {
    status: Option<String>,
}

pub struct EthereumVerifier {
    client: Client,
    rpc_url: String,
    min_confirmations: u64,
}

impl EthereumVerifier {
    pub fn new(rpc_url: String, min_confirmations: u64) -> Result<Self, VerificationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| VerificationError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            rpc_url,
            min_confirmations,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, VerificationError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, "Calling Ethereum node");

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| VerificationError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VerificationError::Unreachable(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| VerificationError::Malformed(e.to_string()))?;

        if let Some(err) = body.get("error") {
            return Err(VerificationError::Rpc(format!("{}: {}", method, err)));
        }

        match body.get("result") {
            None | Some(Value::Null) => Ok(None),
            Some(result) => serde_json::from_value(result.clone())
                .map(Some)
                .map_err(|e| VerificationError::Malformed(format!("{}: {}", method, e))),
        }
    }
}

#[async_trait]
impl TransactionVerifier for EthereumVerifier {
    async fn verify_transaction(
        &self,
        tx_hash: &str,
        asset: AssetSymbol,
        expected_amount: Decimal,
    ) -> Result<Verdict, VerificationError> {
        if asset != AssetSymbol::Eth {
            return Ok(Verdict::invalid(format!(
                "{} deposits cannot be verified on Ethereum",
                asset
            )));
        }
        if !is_tx_hash(tx_hash) {
            return Ok(Verdict::invalid("malformed transaction hash"));
        }

        let Some(tx) = self
            .call::<RpcTransaction>("eth_getTransactionByHash", json!([tx_hash]))
            .await?
        else {
            return Ok(Verdict::invalid("transaction not found"));
        };

        let Some(block_hex) = tx.block_number.as_deref() else {
            return Ok(Verdict::invalid("transaction is still pending"));
        };
        let tx_block = parse_hex_u64(block_hex)?;

        if let Some(receipt) = self
            .call::<RpcReceipt>("eth_getTransactionReceipt", json!([tx_hash]))
            .await?
        {
            if receipt.status.as_deref() == Some("0x0") {
                return Ok(Verdict::invalid("transaction reverted"));
            }
        }

        let latest_hex = self
            .call::<String>("eth_blockNumber", json!([]))
            .await?
            .ok_or_else(|| VerificationError::Malformed("eth_blockNumber: empty".into()))?;
        let confirmations = parse_hex_u64(&latest_hex)?.saturating_sub(tx_block);

        if confirmations < self.min_confirmations {
            return Ok(Verdict::invalid(format!(
                "{} confirmations, {} required",
                confirmations, self.min_confirmations
            )));
        }

        let amount = wei_to_eth(&tx.value)?;
        if !amount_matches(amount, expected_amount) {
            return Ok(Verdict::invalid(format!(
                "transferred {} ETH, expected {}",
                amount, expected_amount
            )));
        }

        tracing::info!(tx_hash, confirmations, %amount, "Transaction verified");

        Ok(Verdict::Valid(TransactionData {
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            amount,
            confirmations,
        }))
    }
}

fn is_tx_hash(hash: &str) -> bool {
    hash.len() == 66
        && hash.starts_with("0x")
        && hash[2..].chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_hex_u64(raw: &str) -> Result<u64, VerificationError> {
    let digits = raw.trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .map_err(|_| VerificationError::Malformed(format!("bad quantity '{}'", raw)))
}

/// Convert a hex wei quantity into ETH
pub(crate) fn wei_to_eth(raw: &str) -> Result<Decimal, VerificationError> {
    let digits = raw.trim_start_matches("0x");
    let digits = if digits.is_empty() { "0" } else { digits };
    let wei = u128::from_str_radix(digits, 16)
        .map_err(|_| VerificationError::Malformed(format!("bad value '{}'", raw)))?;
    let wei = i128::try_from(wei)
        .map_err(|_| VerificationError::Malformed(format!("value '{}' out of range", raw)))?;

    Decimal::try_from_i128_with_scale(wei, WEI_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|_| VerificationError::Malformed(format!("value '{}' out of range", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wei_conversion() {
        // 0.5 ETH
        assert_eq!(wei_to_eth("0x6f05b59d3b20000").unwrap(), Decimal::new(5, 1));
        assert_eq!(wei_to_eth("0x0").unwrap(), Decimal::ZERO);
        assert_eq!(wei_to_eth("0x").unwrap(), Decimal::ZERO);
        assert!(wei_to_eth("0xzz").is_err());
    }

    #[test]
    fn test_tx_hash_shape() {
        let good = format!("0x{}", "ab".repeat(32));
        assert!(is_tx_hash(&good));
        assert!(!is_tx_hash("0x1234"));
        assert!(!is_tx_hash(&format!("0x{}", "zz".repeat(32))));
    }

    #[tokio::test]
    async fn test_non_eth_asset_is_invalid() {
        let verifier = EthereumVerifier::new("http://127.0.0.1:9".into(), 12).unwrap();
        let verdict = verifier
            .verify_transaction(&format!("0x{}", "ab".repeat(32)), AssetSymbol::Btc, Decimal::ONE)
            .await
            .unwrap();
        assert!(!verdict.is_valid());
    }
}
