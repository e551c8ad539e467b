//! Byte-stream encoder and decoder.
//!
//! Messages travel as bare JSON documents concatenated on the stream with
//! no framing or delimiter, so decoding is incremental JSON parsing:
//! buffer inbound bytes, split a document off the front each time one is
//! complete.

use crate::error::ProtocolError;
use crate::message::{Request, Response};
use crate::MAX_MESSAGE_SIZE;
use bytes::{Buf, Bytes, BytesMut};
use serde::Serialize;
use serde_json::Value as Json;

/// Encodes outbound messages.
pub struct Encoder;

impl Encoder {
    /// Serializes one message into its compact wire bytes.
    pub fn encode<T: Serialize>(message: &T) -> Result<Bytes, ProtocolError> {
        let bytes = serde_json::to_vec(message)?;
        Ok(Bytes::from(bytes))
    }

    pub fn encode_request(request: &Request) -> Result<Bytes, ProtocolError> {
        Self::encode(request)
    }

    pub fn encode_response(response: &Response) -> Result<Bytes, ProtocolError> {
        Self::encode(response)
    }
}

/// Splits a byte stream into complete JSON documents.
#[derive(Debug, Default)]
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
        }
    }

    /// Appends raw bytes from the stream.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Splits the next complete document off the front of the buffer.
    ///
    /// `Ok(None)` means the buffered bytes are a (possibly empty) prefix of
    /// a valid document. Malformed bytes poison the stream: with no
    /// delimiters there is no point to resynchronize at, so the caller
    /// must drop the connection.
    pub fn decode_message(&mut self) -> Result<Option<Json>, ProtocolError> {
        let mut stream =
            serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Json>();
        let next = stream.next();
        let consumed = stream.byte_offset();
        drop(stream);
        match next {
            None => {
                // nothing buffered but whitespace
                self.buffer.clear();
                Ok(None)
            }
            Some(Ok(message)) => {
                self.buffer.advance(consumed);
                Ok(Some(message))
            }
            Some(Err(e)) if e.is_eof() => {
                if self.buffer.len() > MAX_MESSAGE_SIZE {
                    return Err(ProtocolError::MessageTooLarge {
                        size: self.buffer.len(),
                        max: MAX_MESSAGE_SIZE,
                    });
                }
                Ok(None)
            }
            Some(Err(e)) => Err(ProtocolError::Json(e)),
        }
    }

    /// Bytes currently buffered and not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
