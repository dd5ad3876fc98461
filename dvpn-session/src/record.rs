//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// Record framing over one secure connection: a big-endian u16 length prefix
// `L`, then `L` bytes of payload. `L == 0` is a keepalive. Otherwise the
// payload's first byte is a record-type tag, distinguishing a tunnel frame
// from a routing-plane LSA.
//

use bytes::{Buf, BufMut, Bytes, BytesMut};
use dvpn_net::SecureConn;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Error;

const READ_CHUNK: usize = 4096;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RecordType {
    Tunnel = 1,
    Lsa = 2,
}

impl RecordType {
    fn from_byte(b: u8) -> Result<RecordType, Error> {
        match b {
            1 => Ok(RecordType::Tunnel),
            2 => Ok(RecordType::Lsa),
            _ => Err(Error::Malformed("unknown record type byte")),
        }
    }
}

#[derive(Debug)]
pub enum Record {
    Keepalive,
    Tunnel(Bytes),
    Lsa(Bytes),
}

pub fn encode_keepalive() -> Vec<u8> {
    vec![0, 0]
}

pub fn encode_tunnel_frame(frame: &[u8]) -> Vec<u8> {
    encode(RecordType::Tunnel, frame)
}

pub fn encode_lsa(wire_bytes: &[u8]) -> Vec<u8> {
    encode(RecordType::Lsa, wire_bytes)
}

fn encode(record_type: RecordType, body: &[u8]) -> Vec<u8> {
    let len = body.len() + 1;
    let mut out = BytesMut::with_capacity(2 + len);
    out.put_u16(len as u16);
    out.put_u8(record_type as u8);
    out.extend_from_slice(body);
    out.to_vec()
}

/// Buffers partial reads across calls, so `next_record` can be polled
/// repeatedly against a stream that delivers arbitrary byte chunks.
pub struct RecordReader {
    buf: BytesMut,
}

impl RecordReader {
    pub fn new() -> RecordReader {
        RecordReader { buf: BytesMut::new() }
    }

    /// Blocks until one full record is buffered, then returns it. A clean
    /// close mid-record, a length that doesn't fit in `u16`'s range once
    /// decoded, or an unrecognised record-type byte all surface as an
    /// `Err`, which the caller treats as tearing the session down.
    pub async fn next_record<S>(
        &mut self,
        conn: &mut SecureConn<S>,
    ) -> Result<Record, Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        while self.buf.len() < 2 {
            self.fill(conn).await?;
        }
        let len = u16::from_be_bytes([self.buf[0], self.buf[1]]) as usize;
        while self.buf.len() < 2 + len {
            self.fill(conn).await?;
        }

        let mut record = self.buf.split_to(2 + len);
        record.advance(2);
        if len == 0 {
            return Ok(Record::Keepalive);
        }

        let record_type = RecordType::from_byte(record[0])?;
        record.advance(1);
        let payload = record.freeze();
        match record_type {
            RecordType::Tunnel => Ok(Record::Tunnel(payload)),
            RecordType::Lsa => Ok(Record::Lsa(payload)),
        }
    }

    async fn fill<S>(&mut self, conn: &mut SecureConn<S>) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut chunk = [0u8; READ_CHUNK];
        let n = conn.record_recv(&mut chunk).await?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(())
    }
}

impl Default for RecordReader {
    fn default() -> RecordReader {
        RecordReader::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keepalive_is_two_zero_bytes() {
        assert_eq!(encode_keepalive(), vec![0, 0]);
    }

    #[test]
    fn tunnel_frame_is_prefixed_with_length_and_type() {
        let encoded = encode_tunnel_frame(&[0xaa, 0xbb]);
        assert_eq!(encoded, vec![0, 3, 1, 0xaa, 0xbb]);
    }

    #[test]
    fn lsa_record_is_prefixed_with_length_and_type() {
        let encoded = encode_lsa(&[1, 2, 3]);
        assert_eq!(encoded, vec![0, 4, 2, 1, 2, 3]);
    }
}
