//! Stream framing and the JSON wire codec
//!
//! A frame is the bytes between two `\n` delimiters with ASCII whitespace
//! trimmed. Blank frames are keep-alives and are skipped. Framing itself
//! never fails: it only yields zero or more complete frames and keeps the
//! unterminated tail buffered. Frames stay raw bytes until `decode`, which
//! rejects anything that is not a UTF-8 JSON object.
//!
//! `LineCodec` plugs the same framing into `tokio_util::codec::Framed`, so a
//! connection reads `Result<Message, DecodeError>` items and writes `Message`s.

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::{Map, Value};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{AppError, DecodeError};
use crate::message::Message;

/// Byte separating frames on the wire
pub const FRAME_DELIMITER: u8 = b'\n';

/// Serialize a message into one frame (without the delimiter)
///
/// JSON escapes control characters inside strings, so the output never
/// contains a raw newline.
pub fn encode(message: &Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Parse one frame into a message
///
/// Pure function of the frame bytes. Invalid UTF-8, and any JSON value
/// other than an object, is an error.
pub fn decode(frame: &[u8]) -> Result<Message, DecodeError> {
    let object: Map<String, Value> = serde_json::from_slice(frame)?;
    Ok(serde_json::from_value(Value::Object(object))?)
}

/// Take the next non-blank frame out of `buf`
///
/// `next_index` is how far `buf` has already been searched for a delimiter;
/// it lets a long unterminated line be scanned only once across reads and is
/// reset whenever a frame is taken. Returns `None` once only an unterminated
/// fragment (possibly empty) remains.
pub fn next_frame(buf: &mut BytesMut, next_index: &mut usize) -> Option<Bytes> {
    loop {
        let start = (*next_index).min(buf.len());
        let Some(offset) = buf[start..].iter().position(|b| *b == FRAME_DELIMITER) else {
            *next_index = buf.len();
            return None;
        };
        let end = start + offset;
        *next_index = 0;

        let line = buf.split_to(end + 1).freeze();
        let frame = line[..end].trim_ascii();
        if !frame.is_empty() {
            return Some(line.slice_ref(frame));
        }
    }
}

/// Incremental frame extractor over a byte stream
///
/// Feed it chunks as they arrive; each call returns a lazy iterator over the
/// frames completed so far.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    next_index: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and iterate over the frames it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Frames<'_> {
        self.buffer.extend_from_slice(chunk);
        Frames {
            buffer: &mut self.buffer,
            next_index: &mut self.next_index,
        }
    }

    /// Bytes received after the last frame boundary
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}

/// Frames completed by the last `FrameDecoder::feed`
#[derive(Debug)]
pub struct Frames<'a> {
    buffer: &'a mut BytesMut,
    next_index: &'a mut usize,
}

impl Iterator for Frames<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        next_frame(self.buffer, self.next_index)
    }
}

/// Newline-delimited JSON codec for `Framed` transports
#[derive(Debug, Default, Clone)]
pub struct LineCodec {
    /// Bytes of the read buffer already searched for a delimiter
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LineCodec {
    type Item = Result<Message, DecodeError>;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(next_frame(src, &mut self.next_index).map(|frame| decode(&frame)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        // Peer closed without a final newline: the tail is the last frame.
        let tail = src.split();
        self.next_index = 0;
        let frame = tail.trim_ascii();
        if frame.is_empty() {
            Ok(None)
        } else {
            Ok(Some(decode(frame)))
        }
    }
}

impl Encoder<Message> for LineCodec {
    type Error = AppError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = encode(&item)?;
        dst.reserve(frame.len() + 1);
        dst.extend_from_slice(frame.as_bytes());
        dst.put_u8(FRAME_DELIMITER);
        Ok(())
    }
}
