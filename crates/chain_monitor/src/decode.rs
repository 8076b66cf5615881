//! ABI decoding of Signal contract logs.

use sha3::{Digest, Keccak256};

use bridge_types::{SignalEvent, SignalId};

use crate::error::MonitorError;
use crate::rpc::{LogEntry, parse_quantity};

pub const SIGNAL_SENT_SIGNATURE: &str =
    "SignalSent(bytes32,uint32,uint32,address,address,uint32,bytes,uint256)";
pub const SIGNAL_RECEIVED_SIGNATURE: &str = "SignalReceived(bytes32,uint32,address,bytes,uint256)";

/// `0x`-prefixed Keccak-256 topic hash of an event signature.
pub fn topic_hash(signature: &str) -> String {
    format!("0x{}", hex::encode(Keccak256::digest(signature.as_bytes())))
}

fn strip_hex(raw: &str) -> Result<Vec<u8>, MonitorError> {
    hex::decode(raw.trim_start_matches("0x")).map_err(|e| MonitorError::Decode(e.to_string()))
}

fn topic_bytes32(topics: &[String], index: usize) -> Result<[u8; 32], MonitorError> {
    let raw = strip_hex(
        topics
            .get(index)
            .ok_or_else(|| MonitorError::Decode(format!("missing topic {index}")))?,
    )?;
    raw.try_into()
        .map_err(|v: Vec<u8>| MonitorError::Decode(format!("topic {index} has {} bytes", v.len())))
}

fn topic_u32(topics: &[String], index: usize) -> Result<u32, MonitorError> {
    let word = topic_bytes32(topics, index)?;
    Ok(u32::from_be_bytes(word[28..32].try_into().expect("4 bytes")))
}

fn word(data: &[u8], index: usize) -> Result<&[u8], MonitorError> {
    data.get(index * 32..(index + 1) * 32)
        .ok_or_else(|| MonitorError::Decode(format!("data truncated at word {index}")))
}

fn word_address(data: &[u8], index: usize) -> Result<[u8; 20], MonitorError> {
    Ok(word(data, index)?[12..32].try_into().expect("20 bytes"))
}

fn word_u64(data: &[u8], index: usize) -> Result<u64, MonitorError> {
    let w = word(data, index)?;
    if w[..24].iter().any(|b| *b != 0) {
        return Err(MonitorError::Decode(format!("word {index} overflows u64")));
    }
    Ok(u64::from_be_bytes(w[24..32].try_into().expect("8 bytes")))
}

fn word_u32(data: &[u8], index: usize) -> Result<u32, MonitorError> {
    let value = word_u64(data, index)?;
    u32::try_from(value).map_err(|_| MonitorError::Decode(format!("word {index} overflows u32")))
}

fn dynamic_bytes(data: &[u8], offset: u64) -> Result<Vec<u8>, MonitorError> {
    let offset = offset as usize;
    let length_word = data
        .get(offset..offset + 32)
        .ok_or_else(|| MonitorError::Decode("payload offset out of range".into()))?;
    if length_word[..24].iter().any(|b| *b != 0) {
        return Err(MonitorError::Decode("payload length overflows".into()));
    }
    let length = u64::from_be_bytes(length_word[24..32].try_into().expect("8 bytes")) as usize;
    data.get(offset + 32..offset + 32 + length)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| MonitorError::Decode("payload truncated".into()))
}

/// Decodes one `SignalSent` log into a [`SignalEvent`].
///
/// Indexed: signalId, srcChainId, dstChainId.
/// Data: srcAddress, dstAddress, nonce, payload, timestamp.
pub fn decode_signal_sent(chain_id: u32, log: &LogEntry) -> Result<SignalEvent, MonitorError> {
    let data = strip_hex(&log.data)?;

    let signal_id = SignalId(topic_bytes32(&log.topics, 1)?);
    let src_chain_id = topic_u32(&log.topics, 2)?;
    let dst_chain_id = topic_u32(&log.topics, 3)?;

    let src_address = word_address(&data, 0)?;
    let dst_address = word_address(&data, 1)?;
    let nonce = word_u32(&data, 2)?;
    let payload_offset = word_u64(&data, 3)?;
    let timestamp = word_u64(&data, 4)?;
    let payload = dynamic_bytes(&data, payload_offset)?;

    let observed_tx_hash: [u8; 32] = strip_hex(&log.transaction_hash)?
        .try_into()
        .map_err(|v: Vec<u8>| MonitorError::Decode(format!("tx hash has {} bytes", v.len())))?;

    Ok(SignalEvent {
        chain_id,
        signal_id,
        src_chain_id,
        dst_chain_id,
        src_address,
        dst_address,
        nonce,
        payload,
        observed_tx_hash,
        block_number: parse_quantity(&log.block_number)?,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ABI-encodes a SignalSent log body the way the contract would.
    fn encode_log(payload: &[u8]) -> LogEntry {
        let mut data = Vec::new();
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[0xaa; 20]);
        data.extend_from_slice(&word); // srcAddress
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[0xbb; 20]);
        data.extend_from_slice(&word); // dstAddress
        let mut word = [0u8; 32];
        word[28..].copy_from_slice(&7u32.to_be_bytes());
        data.extend_from_slice(&word); // nonce
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&(5u64 * 32).to_be_bytes());
        data.extend_from_slice(&word); // payload offset
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&1_700_000_000u64.to_be_bytes());
        data.extend_from_slice(&word); // timestamp
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&(payload.len() as u64).to_be_bytes());
        data.extend_from_slice(&word); // payload length
        let mut tail = payload.to_vec();
        while tail.len() % 32 != 0 {
            tail.push(0);
        }
        data.extend_from_slice(&tail);

        LogEntry {
            address: "0x1111111111111111111111111111111111111111".into(),
            topics: vec![
                topic_hash(SIGNAL_SENT_SIGNATURE),
                format!("0x{}", hex::encode([0x01; 32])),
                format!("0x{}", hex::encode({
                    let mut w = [0u8; 32];
                    w[28..].copy_from_slice(&1u32.to_be_bytes());
                    w
                })),
                format!("0x{}", hex::encode({
                    let mut w = [0u8; 32];
                    w[28..].copy_from_slice(&56u32.to_be_bytes());
                    w
                })),
            ],
            data: format!("0x{}", hex::encode(data)),
            block_number: "0x64".into(),
            transaction_hash: format!("0x{}", hex::encode([0x02; 32])),
            removed: false,
        }
    }

    #[test]
    fn decodes_a_well_formed_log() {
        let log = encode_log(&[0xde, 0xad]);
        let event = decode_signal_sent(1, &log).unwrap();
        assert_eq!(event.signal_id, SignalId([0x01; 32]));
        assert_eq!(event.src_chain_id, 1);
        assert_eq!(event.dst_chain_id, 56);
        assert_eq!(event.src_address, [0xaa; 20]);
        assert_eq!(event.dst_address, [0xbb; 20]);
        assert_eq!(event.nonce, 7);
        assert_eq!(event.payload, vec![0xde, 0xad]);
        assert_eq!(event.block_number, 100);
        assert_eq!(event.timestamp, 1_700_000_000);
    }

    #[test]
    fn decodes_empty_payload() {
        let log = encode_log(&[]);
        let event = decode_signal_sent(1, &log).unwrap();
        assert!(event.payload.is_empty());
    }

    #[test]
    fn truncated_data_is_rejected() {
        let mut log = encode_log(&[0xde, 0xad]);
        log.data = log.data[..log.data.len() - 80].to_string();
        assert!(decode_signal_sent(1, &log).is_err());
    }

    #[test]
    fn topic_hash_is_stable() {
        let a = topic_hash(SIGNAL_SENT_SIGNATURE);
        let b = topic_hash(SIGNAL_SENT_SIGNATURE);
        assert_eq!(a, b);
        assert_eq!(a.len(), 66);
        assert_ne!(a, topic_hash(SIGNAL_RECEIVED_SIGNATURE));
    }
}
