//! Peer message kinds and payloads

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use volt_primitives::Address;
use volt_types::ChannelStateMsg;

/// Wire discriminant of a peer message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgKind {
    /// A newly funded channel the recipient participates in
    NotifyChannel = 0,
    /// A signed balance update moving funds to the recipient
    ReceiveFunds = 1,
    /// The recipient's prior update, countersigned by the peer
    AckTransfer = 2,
}

impl TryFrom<u8> for MsgKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(Self::NotifyChannel),
            1 => Ok(Self::ReceiveFunds),
            2 => Ok(Self::AckTransfer),
            other => Err(other),
        }
    }
}

/// Payload of a channel notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyChannelMsg {
    /// Address of the freshly deployed channel contract
    pub channel: Address,
    /// Where the funding node can be reached
    pub sender_location: SocketAddr,
}

/// A message between two channel nodes
#[derive(Clone, Debug, PartialEq)]
pub enum PeerMessage {
    /// Channel notification from the funder to the second party
    NotifyChannel(NotifyChannelMsg),
    /// Funds transfer carrying the sender-signed next state
    ReceiveFunds(ChannelStateMsg),
    /// Acknowledgment carrying the countersigned state
    AckTransfer(ChannelStateMsg),
}

impl PeerMessage {
    /// Wire discriminant of this message
    pub fn kind(&self) -> MsgKind {
        match self {
            PeerMessage::NotifyChannel(_) => MsgKind::NotifyChannel,
            PeerMessage::ReceiveFunds(_) => MsgKind::ReceiveFunds,
            PeerMessage::AckTransfer(_) => MsgKind::AckTransfer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_conversion() {
        assert_eq!(MsgKind::try_from(0u8), Ok(MsgKind::NotifyChannel));
        assert_eq!(MsgKind::try_from(1u8), Ok(MsgKind::ReceiveFunds));
        assert_eq!(MsgKind::try_from(2u8), Ok(MsgKind::AckTransfer));
        assert_eq!(MsgKind::try_from(3u8), Err(3));
        assert_eq!(MsgKind::try_from(255u8), Err(255));
    }

    #[test]
    fn test_notify_payload_json() {
        let msg = NotifyChannelMsg {
            channel: Address::from_bytes([0x11; 20]),
            sender_location: "127.0.0.1:9735".parse().unwrap(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let decoded: NotifyChannelMsg = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, msg);
    }
}
