//! Directory client for wotcrawl - resolves a key id to its signature packets

pub mod keyserver;
pub mod mock;
pub mod packets;
pub mod provider;

pub use keyserver::KeyserverDirectory;
pub use mock::{signature_packet, MockBehavior, MockDirectory};
pub use packets::{Packet, SignaturePacket, Subpacket};
pub use provider::{Directory, DirectoryError, DirectoryResult, FetchOutcome};
