//! # Stream Framing
//!
//! `tokio_util` codecs that cut call and reply envelopes out of a byte stream.
//!
//! Hessian messages carry no outer length prefix, so a frame ends where the
//! grammar says it ends. Each parse attempt starts at the front of the buffer:
//! running out of bytes means "wait for more" and any other failure is a
//! protocol error. The shortest buffer that could hold the frame is remembered
//! from the EOF, and no new attempt is made until that many bytes are buffered.
//! Frames that need more than the configured message size are rejected before
//! they can grow without bound.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder as FrameDecoder, Encoder as FrameEncoder};

use crate::config::CodecConfig;
use crate::core::decoder::Decoder;
use crate::core::encoder::Encoder;
use crate::error::{DecodeError, HessianError};
use crate::protocol::envelope::{read_call, read_reply, write_reply, Call, Reply};

/// Progress on the frame at the front of the buffer.
#[derive(Debug, Clone, Copy, Default)]
struct Partial {
    /// Buffer length below which the frame cannot be complete.
    needed: usize,
    #[cfg(test)]
    parses: usize,
}

impl Partial {
    /// Parse one frame from the front of `src`, or report that more bytes are needed.
    fn try_frame<T>(
        &mut self,
        src: &BytesMut,
        config: &CodecConfig,
        read: impl FnOnce(&mut Decoder<'_>) -> Result<T, DecodeError>,
    ) -> Result<Option<(T, usize)>, HessianError> {
        if src.is_empty() || src.len() < self.needed {
            return Ok(None);
        }
        #[cfg(test)]
        {
            self.parses += 1;
        }

        let mut decoder = Decoder::with_config(src, config);
        let result = read(&mut decoder);
        self.needed = 0;
        match result {
            Ok(item) => Ok(Some((item, decoder.position()))),
            Err(DecodeError::UnexpectedEof { offset, need, .. }) => {
                let needed = offset.saturating_add(need);
                if needed > config.max_message_size {
                    return Err(DecodeError::MessageTooLarge {
                        size: needed,
                        limit: config.max_message_size,
                    }
                    .into());
                }
                self.needed = needed;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Serving side: reads calls, writes replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallCodec {
    config: CodecConfig,
    partial: Partial,
}

impl CallCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            partial: Partial::default(),
        }
    }
}

impl FrameDecoder for CallCodec {
    type Item = Call;
    type Error = HessianError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.partial.try_frame(src, &self.config, read_call)? {
            Some((call, consumed)) => {
                src.advance(consumed);
                Ok(Some(call))
            }
            None => Ok(None),
        }
    }
}

impl FrameEncoder<Reply> for CallCodec {
    type Error = HessianError;

    fn encode(&mut self, reply: Reply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut encoder = Encoder::new();
        write_reply(&mut encoder, &reply)?;
        dst.extend_from_slice(&encoder.into_inner());
        Ok(())
    }
}

/// Calling side: writes pre-built call envelopes, reads raw reply frames.
///
/// Replies are handed back undecoded so the caller parses them with its own
/// limits and observer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplyCodec {
    config: CodecConfig,
    partial: Partial,
}

impl ReplyCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            partial: Partial::default(),
        }
    }
}

impl FrameDecoder for ReplyCodec {
    type Item = BytesMut;
    type Error = HessianError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.partial.try_frame(src, &self.config, read_reply)? {
            Some((_, consumed)) => Ok(Some(src.split_to(consumed))),
            None => Ok(None),
        }
    }
}

impl FrameEncoder<Vec<u8>> for ReplyCodec {
    type Error = HessianError;

    fn encode(&mut self, body: Vec<u8>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if body.len() > self.config.max_message_size {
            return Err(DecodeError::MessageTooLarge {
                size: body.len(),
                limit: self.config.max_message_size,
            }
            .into());
        }
        dst.extend_from_slice(&body);
        Ok(())
    }
}
