//! `LogClassifier` implementations for the position-tracking subsystems.
//!
//! Each classifier owns one contract's indexed-topic layout and knows how
//! to turn a raw log into a `SubscriptionBatch` member key and a
//! publishable envelope. Keeping classifiers small and contract-scoped
//! means a `SubscriptionBatch` never mixes event shapes whose indexed
//! topic positions disagree (NFPM `Transfer`'s `tokenId` sits at topic
//! index 3; `IncreaseLiquidity`/`DecreaseLiquidity`/`Collect`'s sits at
//! index 1), which would otherwise make server-side topic filtering
//! impossible to express.

use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use chain_rpc::LogFilter;
use chrono::{DateTime, Utc};

use crate::abi::uniswap_v3::{Collect, DecreaseLiquidity, IncreaseLiquidity, Swap, Transfer};
use crate::error::{AppError, InfraError, Result};
use crate::indexer::LogClassifier;
use crate::messagebus::{
    nfpm_transfer_routing_key, pool_price_routing_key, position_liquidity_routing_key,
    EXCHANGE_NFPM_TRANSFER_EVENTS, EXCHANGE_POOL_PRICES, EXCHANGE_POSITION_LIQUIDITY_EVENTS,
};
use crate::types::enums::NfpmTransferKind;
use crate::types::events::{
    CollectEvent, DecreaseLiquidityEvent, EventMetadata, IncreaseLiquidityEvent, NfpmTransferEvent,
    SwapEvent,
};
use crate::types::primitives::{ChainId, EthAddress};

fn decode_event<Ev: SolEvent>(log: &Log) -> Result<Ev> {
    let decoded = Ev::decode_log(&log.inner).map_err(|e| {
        AppError::Infra(InfraError::EventDecoding(format!(
            "failed to decode {}: {e}",
            Ev::SIGNATURE
        )))
    })?;
    Ok(decoded.data)
}

fn metadata_of(log: &Log) -> EventMetadata {
    EventMetadata {
        block_number: log.block_number.unwrap_or_default(),
        block_hash: log.block_hash.unwrap_or_default(),
        tx_hash: log.transaction_hash.unwrap_or_default(),
        tx_index: log.transaction_index.unwrap_or_default(),
        log_index: log.log_index.unwrap_or_default(),
        timestamp: log
            .block_timestamp
            .and_then(|secs| DateTime::<Utc>::from_timestamp(i64::try_from(secs).ok()?, 0)),
        contract: log.inner.address,
    }
}

fn token_id_at(log: &Log, position: usize) -> Option<String> {
    let topic = log.topics().get(position)?;
    Some(U256::from_be_bytes(topic.0).to_string())
}

fn topics_from_token_ids(members: &[String]) -> Vec<B256> {
    members
        .iter()
        .filter_map(|m| m.parse::<U256>().ok())
        .map(|id| B256::from(id.to_be_bytes()))
        .collect()
}

/// Id-keyed classifier over the NFT Position Manager's liquidity events:
/// `IncreaseLiquidity`, `DecreaseLiquidity`, `Collect`. `tokenId` sits at
/// topic index 1 for all three.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionLiquidityClassifier;

impl LogClassifier for PositionLiquidityClassifier {
    fn member_key(&self, log: &Log) -> Option<String> {
        token_id_at(log, 1)
    }

    fn envelope(&self, chain_id: ChainId, log: &Log) -> Result<(String, String, Vec<u8>)> {
        let Some(nft_id) = token_id_at(log, 1) else {
            return Err(AppError::Infra(InfraError::EventDecoding(
                "position-liquidity log missing indexed tokenId".into(),
            )));
        };
        let routing_key = position_liquidity_routing_key(chain_id, nft_id.parse().unwrap_or(0));
        let meta = metadata_of(log);

        let Some(topic0) = log.topics().first() else {
            return Err(AppError::Infra(InfraError::EventDecoding(
                "log has no topics".into(),
            )));
        };

        let payload = if *topic0 == IncreaseLiquidity::SIGNATURE_HASH {
            let event = decode_event::<IncreaseLiquidity>(log)?;
            serde_json::to_vec(&IncreaseLiquidityEvent {
                meta,
                token_id: event.tokenId,
                liquidity: U256::from(event.liquidity),
                amount0: event.amount0,
                amount1: event.amount1,
            })
        } else if *topic0 == DecreaseLiquidity::SIGNATURE_HASH {
            let event = decode_event::<DecreaseLiquidity>(log)?;
            serde_json::to_vec(&DecreaseLiquidityEvent {
                meta,
                token_id: event.tokenId,
                liquidity: U256::from(event.liquidity),
                amount0: event.amount0,
                amount1: event.amount1,
            })
        } else if *topic0 == Collect::SIGNATURE_HASH {
            let event = decode_event::<Collect>(log)?;
            serde_json::to_vec(&CollectEvent {
                meta,
                token_id: event.tokenId,
                recipient: event.recipient,
                amount0: event.amount0,
                amount1: event.amount1,
            })
        } else {
            return Err(AppError::Infra(InfraError::EventDecoding(format!(
                "unrecognised position-liquidity event signature: {topic0}"
            ))));
        }
        .map_err(InfraError::from)?;

        Ok((
            EXCHANGE_POSITION_LIQUIDITY_EVENTS.to_string(),
            routing_key,
            payload,
        ))
    }

    fn event_signatures(&self) -> Vec<B256> {
        vec![
            IncreaseLiquidity::SIGNATURE_HASH,
            DecreaseLiquidity::SIGNATURE_HASH,
            Collect::SIGNATURE_HASH,
        ]
    }

    fn apply_members(&self, filter: LogFilter, members: &[String]) -> LogFilter {
        let topics = topics_from_token_ids(members);
        if topics.is_empty() {
            filter
        } else {
            filter.with_topic(1, topics)
        }
    }
}

/// Address-keyed classifier over a pool's `Swap` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolPriceClassifier;

impl LogClassifier for PoolPriceClassifier {
    fn member_key(&self, log: &Log) -> Option<String> {
        Some(EthAddress::from(log.inner.address).to_hex())
    }

    fn envelope(&self, chain_id: ChainId, log: &Log) -> Result<(String, String, Vec<u8>)> {
        let pool_address = EthAddress::from(log.inner.address).to_hex();
        let routing_key = pool_price_routing_key(chain_id, &pool_address);
        let meta = metadata_of(log);

        let event = decode_event::<Swap>(log)?;
        let payload = serde_json::to_vec(&SwapEvent {
            meta,
            sender: event.sender,
            recipient: event.recipient,
            amount0: event.amount0,
            amount1: event.amount1,
            sqrt_price_x96: U256::from(event.sqrtPriceX96),
            liquidity: U256::from(event.liquidity),
            tick: event.tick.as_i32(),
        })
        .map_err(InfraError::from)?;

        Ok((EXCHANGE_POOL_PRICES.to_string(), routing_key, payload))
    }

    fn event_signatures(&self) -> Vec<B256> {
        vec![Swap::SIGNATURE_HASH]
    }

    fn apply_members(&self, filter: LogFilter, members: &[String]) -> LogFilter {
        let addresses: Vec<Address> = members
            .iter()
            .filter_map(|m| EthAddress::from_hex(m).ok())
            .map(Address::from)
            .collect();
        if addresses.is_empty() {
            filter
        } else {
            filter.with_addresses(addresses)
        }
    }
}

/// Id-keyed classifier over the NFT Position Manager's ERC-721 `Transfer`.
/// `tokenId` sits at topic index 3 (`from`, `to` are the first two indexed
/// topics), so this cannot share a batch with
/// [`PositionLiquidityClassifier`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NfpmTransferClassifier;

impl LogClassifier for NfpmTransferClassifier {
    fn member_key(&self, log: &Log) -> Option<String> {
        token_id_at(log, 3)
    }

    fn envelope(&self, chain_id: ChainId, log: &Log) -> Result<(String, String, Vec<u8>)> {
        let event = decode_event::<Transfer>(log)?;
        let nft_id: String = event.tokenId.to_string();
        let kind = NfpmTransferKind::classify(event.from.is_zero(), event.to.is_zero());
        let routing_key =
            nfpm_transfer_routing_key(chain_id, kind, nft_id.parse().unwrap_or(0));
        let meta = metadata_of(log);

        let payload = serde_json::to_vec(&NfpmTransferEvent {
            meta,
            from: event.from,
            to: event.to,
            token_id: event.tokenId,
        })
        .map_err(InfraError::from)?;

        Ok((
            EXCHANGE_NFPM_TRANSFER_EVENTS.to_string(),
            routing_key,
            payload,
        ))
    }

    fn event_signatures(&self) -> Vec<B256> {
        vec![Transfer::SIGNATURE_HASH]
    }

    fn apply_members(&self, filter: LogFilter, members: &[String]) -> LogFilter {
        let topics = topics_from_token_ids(members);
        if topics.is_empty() {
            filter
        } else {
            filter.with_topic(3, topics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::LogData;

    fn log_with_topics(address: Address, topics: Vec<B256>) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address,
                data: LogData::new(topics, alloy::primitives::Bytes::new()).unwrap(),
            },
            block_hash: None,
            block_number: Some(10),
            block_timestamp: None,
            transaction_hash: Some(B256::repeat_byte(1)),
            transaction_index: Some(0),
            log_index: Some(0),
            removed: false,
        }
    }

    #[test]
    fn position_liquidity_member_key_reads_topic1() {
        let classifier = PositionLiquidityClassifier;
        let token_id = U256::from(42u64);
        let log = log_with_topics(
            Address::ZERO,
            vec![
                IncreaseLiquidity::SIGNATURE_HASH,
                B256::from(token_id.to_be_bytes()),
            ],
        );
        assert_eq!(classifier.member_key(&log), Some("42".to_string()));
    }

    #[test]
    fn pool_price_member_key_is_contract_address() {
        let classifier = PoolPriceClassifier;
        let address: Address = "0x1234567890123456789012345678901234567890"
            .parse()
            .unwrap();
        let log = log_with_topics(address, vec![Swap::SIGNATURE_HASH]);
        assert_eq!(
            classifier.member_key(&log),
            Some("0x1234567890123456789012345678901234567890".to_string())
        );
    }

    #[test]
    fn nfpm_transfer_member_key_reads_topic3() {
        let classifier = NfpmTransferClassifier;
        let token_id = U256::from(7u64);
        let log = log_with_topics(
            Address::ZERO,
            vec![
                Transfer::SIGNATURE_HASH,
                B256::ZERO,
                B256::repeat_byte(0xaa),
                B256::from(token_id.to_be_bytes()),
            ],
        );
        assert_eq!(classifier.member_key(&log), Some("7".to_string()));
    }

    #[test]
    fn apply_members_builds_token_id_topics() {
        let classifier = PositionLiquidityClassifier;
        let filter = classifier.apply_members(LogFilter::unbounded(), &["1".into(), "2".into()]);
        assert_eq!(filter.topics.len(), 2);
        assert_eq!(filter.topics[1].as_ref().unwrap().len(), 2);
    }
}
