//! Length-prefixed message framing codec.
//!
//! Messages are framed as:
//! - 4 bytes: network magic
//! - 4 bytes: big-endian message length
//! - N bytes: bincode-serialized Message

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::{MAX_MESSAGE_SIZE, NETWORK_MAGIC};
use crate::error::{DiffusionError, DiffusionResult};
use crate::protocol::Message;

/// Header size: 4 bytes magic + 4 bytes length.
const HEADER_SIZE: usize = 8;

/// Codec for length-prefixed message framing.
#[derive(Debug)]
pub struct MessageCodec {
    magic: [u8; 4],
    max_size: usize,
    /// Expected length of the current message (if header has been read).
    current_length: Option<usize>,
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(NETWORK_MAGIC, MAX_MESSAGE_SIZE)
    }
}

impl MessageCodec {
    /// Create a codec for the given network magic and frame limit.
    pub fn new(magic: [u8; 4], max_size: usize) -> Self {
        Self {
            magic,
            max_size,
            current_length: None,
        }
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = DiffusionError;

    fn decode(&mut self, src: &mut BytesMut) -> DiffusionResult<Option<Self::Item>> {
        let length = match self.current_length {
            Some(length) => length,
            None => {
                if src.len() < HEADER_SIZE {
                    return Ok(None);
                }

                let mut magic = [0u8; 4];
                magic.copy_from_slice(&src[0..4]);
                if magic != self.magic {
                    return Err(DiffusionError::InvalidMagic {
                        expected: self.magic,
                        actual: magic,
                    });
                }

                let mut len_bytes = [0u8; 4];
                len_bytes.copy_from_slice(&src[4..8]);
                let length = u32::from_be_bytes(len_bytes) as usize;

                if length > self.max_size {
                    return Err(DiffusionError::MessageTooLarge {
                        size: length,
                        max: self.max_size,
                    });
                }

                self.current_length = Some(length);
                length
            }
        };

        if src.len() < HEADER_SIZE + length {
            // Reserve space for the full message to avoid reallocations
            src.reserve(HEADER_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let message_bytes = src.split_to(length);
        self.current_length = None;

        let message: Message = strand_core::serialization::deserialize(&message_bytes)?;
        Ok(Some(message))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = DiffusionError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> DiffusionResult<()> {
        let message_bytes = strand_core::serialization::serialize(&message)?;
        let length = message_bytes.len();

        if length > self.max_size {
            return Err(DiffusionError::MessageTooLarge {
                size: length,
                max: self.max_size,
            });
        }

        dst.reserve(HEADER_SIZE + length);
        dst.put_slice(&self.magic);
        dst.put_u32(length as u32);
        dst.put_slice(&message_bytes);

        Ok(())
    }
}
