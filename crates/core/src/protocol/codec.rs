//! Length-prefixed framing codec for chat messages
//!
//! Wire format: `[prefix_width ASCII decimal digits, zero-padded][UTF-8
//! payload of that many bytes]`. No delimiters or escaping; the prefix alone
//! determines the frame boundary. The fixed decimal prefix caps a payload at
//! `10^prefix_width - 1` bytes (9999 with the default width) in exchange for
//! staying human-readable in a packet capture.

use crate::error::{ChatError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default width of the decimal length prefix, in digits.
pub const DEFAULT_PREFIX_WIDTH: usize = 4;

/// Frame codec for length-prefixed text messages
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a payload into a single frame.
    ///
    /// Fails with [`ChatError::MessageTooLarge`] when the payload's UTF-8
    /// byte length cannot be represented in `prefix_width` decimal digits.
    pub fn encode(payload: &str, prefix_width: usize) -> Result<Bytes> {
        let len = payload.len();
        let max = 10usize.pow(prefix_width as u32) - 1;
        if len > max {
            return Err(ChatError::MessageTooLarge { len, max });
        }

        let mut buf = BytesMut::with_capacity(prefix_width + len);
        buf.put_slice(format!("{len:0prefix_width$}").as_bytes());
        buf.put_slice(payload.as_bytes());
        Ok(buf.freeze())
    }

    /// Read one frame with the default prefix width.
    pub async fn read<R>(reader: &mut R) -> Result<String>
    where
        R: AsyncRead + Unpin,
    {
        Self::read_with_width(reader, DEFAULT_PREFIX_WIDTH).await
    }

    /// Read one frame, blocking until the full frame has arrived.
    ///
    /// Every failure mode on this path collapses into
    /// [`ChatError::ConnectionLost`]: stream closed mid-frame, a non-digit
    /// length prefix, a payload that is not valid UTF-8, or any transport
    /// error. Callers must not need to tell those apart.
    pub async fn read_with_width<R>(reader: &mut R, prefix_width: usize) -> Result<String>
    where
        R: AsyncRead + Unpin,
    {
        let mut prefix = vec![0u8; prefix_width];
        reader
            .read_exact(&mut prefix)
            .await
            .map_err(|_| ChatError::ConnectionLost)?;

        // Strictly ASCII digits; anything else is indistinguishable from a
        // desynchronized stream.
        if !prefix.iter().all(|b| b.is_ascii_digit()) {
            return Err(ChatError::ConnectionLost);
        }
        let len = prefix
            .iter()
            .fold(0usize, |n, b| n * 10 + usize::from(b - b'0'));

        let mut payload = vec![0u8; len];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(|_| ChatError::ConnectionLost)?;

        String::from_utf8(payload).map_err(|_| ChatError::ConnectionLost)
    }

    /// Encode and write one frame with the default prefix width.
    pub async fn write<W>(writer: &mut W, payload: &str) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let frame = Self::encode(payload, DEFAULT_PREFIX_WIDTH)?;
        writer.write_all(&frame).await?;
        Ok(())
    }
}
