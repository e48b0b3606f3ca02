//! Wire framing for peer messages
//!
//! Format: `[length: u32 BE][kind: u8][payload: JSON]`, where length
//! counts the kind byte plus the payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{NetError, NetResult};
use crate::message::{MsgKind, NotifyChannelMsg, PeerMessage};

/// Largest accepted frame (1 MiB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// A raw wire frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Message kind
    pub kind: MsgKind,
    /// JSON-encoded payload
    pub payload: Bytes,
}

impl Frame {
    /// Encode to wire bytes
    pub fn encode(&self) -> Bytes {
        let len = 1 + self.payload.len();
        let mut buf = BytesMut::with_capacity(4 + len);
        buf.put_u32(len as u32);
        buf.put_u8(self.kind as u8);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Decode from wire bytes
    pub fn decode(mut data: Bytes) -> NetResult<Self> {
        if data.len() < 5 {
            return Err(NetError::MalformedFrame(format!(
                "{} bytes is below the minimum frame",
                data.len()
            )));
        }
        let len = data.get_u32() as usize;
        if len > MAX_FRAME_SIZE {
            return Err(NetError::FrameTooLarge(len));
        }
        if len < 1 || data.len() < len {
            return Err(NetError::MalformedFrame("length prefix mismatch".into()));
        }
        let kind = MsgKind::try_from(data.get_u8()).map_err(NetError::UnknownKind)?;
        let payload = data.split_to(len - 1);
        Ok(Frame { kind, payload })
    }
}

impl PeerMessage {
    /// Encode as a wire frame
    pub fn encode(&self) -> NetResult<Bytes> {
        let payload = match self {
            PeerMessage::NotifyChannel(notify) => serde_json::to_vec(notify),
            PeerMessage::ReceiveFunds(state) | PeerMessage::AckTransfer(state) => {
                serde_json::to_vec(state)
            }
        }
        .map_err(|e| NetError::InvalidPayload(e.to_string()))?;

        Ok(Frame {
            kind: self.kind(),
            payload: payload.into(),
        }
        .encode())
    }

    /// Decode from a wire frame
    pub fn from_frame(frame: Frame) -> NetResult<Self> {
        let msg = match frame.kind {
            MsgKind::NotifyChannel => {
                let notify: NotifyChannelMsg = serde_json::from_slice(&frame.payload)
                    .map_err(|e| NetError::InvalidPayload(e.to_string()))?;
                PeerMessage::NotifyChannel(notify)
            }
            MsgKind::ReceiveFunds => PeerMessage::ReceiveFunds(
                serde_json::from_slice(&frame.payload)
                    .map_err(|e| NetError::InvalidPayload(e.to_string()))?,
            ),
            MsgKind::AckTransfer => PeerMessage::AckTransfer(
                serde_json::from_slice(&frame.payload)
                    .map_err(|e| NetError::InvalidPayload(e.to_string()))?,
            ),
        };
        Ok(msg)
    }

    /// Decode from wire bytes
    pub fn decode(data: Bytes) -> NetResult<Self> {
        Self::from_frame(Frame::decode(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use volt_crypto::PrivateKey;
    use volt_primitives::Address;
    use volt_types::ChannelStateMsg;

    fn sample_state() -> ChannelStateMsg {
        let key = PrivateKey::random(&mut OsRng);
        ChannelStateMsg::initial(Address::from_bytes([0x42; 20]), 10, &key).unwrap()
    }

    #[test]
    fn test_notify_roundtrip() {
        let msg = PeerMessage::NotifyChannel(crate::NotifyChannelMsg {
            channel: Address::from_bytes([0x42; 20]),
            sender_location: "10.0.0.1:9735".parse().unwrap(),
        });
        let decoded = PeerMessage::decode(msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_state_message_roundtrip() {
        for msg in [
            PeerMessage::ReceiveFunds(sample_state()),
            PeerMessage::AckTransfer(sample_state()),
        ] {
            let decoded = PeerMessage::decode(msg.encode().unwrap()).unwrap();
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            Frame::decode(Bytes::from_static(&[0, 0, 0, 1])),
            Err(NetError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_decode_length_mismatch() {
        let mut buf = BytesMut::new();
        buf.put_u32(100);
        buf.put_u8(0);
        assert!(matches!(
            Frame::decode(buf.freeze()),
            Err(NetError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_decode_unknown_kind() {
        let mut buf = BytesMut::new();
        buf.put_u32(1);
        buf.put_u8(77);
        assert!(matches!(
            Frame::decode(buf.freeze()),
            Err(NetError::UnknownKind(77))
        ));
    }

    #[test]
    fn test_decode_oversized_frame() {
        let mut buf = BytesMut::new();
        buf.put_u32((MAX_FRAME_SIZE + 1) as u32);
        buf.put_u8(0);
        assert!(matches!(
            Frame::decode(buf.freeze()),
            Err(NetError::FrameTooLarge(_))
        ));
    }

    #[test]
    fn test_decode_garbage_payload() {
        let frame = Frame {
            kind: MsgKind::ReceiveFunds,
            payload: Bytes::from_static(b"not json"),
        };
        assert!(matches!(
            PeerMessage::decode(frame.encode()),
            Err(NetError::InvalidPayload(_))
        ));
    }
}
