//! Keyserver search-response decoding
//!
//! The search endpoint wraps key material in an elasticsearch-style
//! envelope. Only tag 2 (signature) packets that carry sub-packets
//! matter here; everything else is skipped during decoding.

use serde::Deserialize;

pub const SIGNATURE_PACKET_TAG: u32 = 2;
pub const ISSUER_SUBPACKET_TYPE: u32 = 16;
pub const CREATION_TIME_SUBPACKET_TYPE: u32 = 2;

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: SearchHits,
}

#[derive(Debug, Deserialize)]
pub struct SearchHits {
    pub total: i64,
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_source")]
    pub source: KeySource,
}

#[derive(Debug, Deserialize)]
pub struct KeySource {
    #[serde(default)]
    pub packets: Vec<Packet>,
}

/// One raw packet as the directory reports it.
#[derive(Clone, Debug, Deserialize)]
pub struct Packet {
    pub tag_id: Option<u32>,
    pub subpackets: Option<Vec<Subpacket>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Subpacket {
    pub type_id: Option<u32>,
    pub key_id: Option<String>,
    pub creation_time: Option<i64>,
}

impl Subpacket {
    /// Issuer sub-packet (type 16) naming `key_id`.
    pub fn issuer(key_id: impl Into<String>) -> Self {
        Self {
            type_id: Some(ISSUER_SUBPACKET_TYPE),
            key_id: Some(key_id.into()),
            creation_time: None,
        }
    }

    /// Creation-time sub-packet (type 2).
    pub fn creation_time(epoch_secs: i64) -> Self {
        Self {
            type_id: Some(CREATION_TIME_SUBPACKET_TYPE),
            key_id: None,
            creation_time: Some(epoch_secs),
        }
    }
}

/// A signature packet: tag 2 with sub-packets present.
#[derive(Clone, Debug)]
pub struct SignaturePacket {
    subpackets: Vec<Subpacket>,
}

impl SignaturePacket {
    pub fn new(subpackets: Vec<Subpacket>) -> Self {
        Self { subpackets }
    }

    /// Issuer key of this signature. Issuer sub-packets usually sit at
    /// the end of the list and a later entry overrides an earlier one,
    /// so the scan runs in reverse.
    pub fn issuer(&self) -> Option<&str> {
        self.subpackets
            .iter()
            .rev()
            .filter(|sp| sp.type_id == Some(ISSUER_SUBPACKET_TYPE))
            .find_map(|sp| sp.key_id.as_deref())
    }

    /// Creation time of this signature; the first creation-time
    /// sub-packet wins.
    pub fn creation_time(&self) -> Option<i64> {
        self.subpackets
            .iter()
            .filter(|sp| sp.type_id == Some(CREATION_TIME_SUBPACKET_TYPE))
            .find_map(|sp| sp.creation_time)
    }
}

impl KeySource {
    /// Keep only well-formed signature packets.
    pub fn signature_packets(self) -> Vec<SignaturePacket> {
        self.packets
            .into_iter()
            .filter_map(|packet| {
                if packet.tag_id != Some(SIGNATURE_PACKET_TAG) {
                    return None;
                }
                packet.subpackets.map(SignaturePacket::new)
            })
            .collect()
    }
}
