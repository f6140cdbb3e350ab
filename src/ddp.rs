//! Distributed Display Protocol framing.
//!
//! A frame of pixels is split into packets of at most `max_datalen` payload
//! bytes. Each packet carries a 10 byte header: flags, sequence, data type,
//! source, 32 bit byte offset and 16 bit payload length, both big-endian.
//! The last packet of a frame has the push flag set, which tells the
//! controller to display what it has received so far.

use std::io::{self, Write};
#[cfg(test)]
use std::io::Cursor;

#[cfg(test)]
use byteorder::ReadBytesExt;
use byteorder::{BigEndian, WriteBytesExt};

#[cfg(test)]
use crate::error::Error;
use crate::pixels::PixelBuffer;

pub const PORT: u16 = 4048;
pub const HEADER_LEN: usize = 0x0A;

pub const MAX_PIXELS: usize = 480;
/// Fits nicely in an ethernet packet.
pub const MAX_DATALEN: usize = MAX_PIXELS * 3;

#[cfg(test)]
pub const VER_MASK: u8 = 0xC0;
pub const VER1: u8 = 0x40;
pub const PUSH: u8 = 0x01;
pub const DATATYPE: u8 = 0x00;
pub const SOURCE: u8 = 0x01;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub flags: u8,
    pub sequence: u8,
    pub data_type: u8,
    pub source: u8,
    pub offset: u32,
    pub length: u16,
}

impl Header {
    fn new(offset: u32, length: u16, push: bool) -> Header {
        Header {
            flags: if push { VER1 | PUSH } else { VER1 },
            sequence: 0,
            data_type: DATATYPE,
            source: SOURCE,
            offset,
            length,
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(self.flags)?;
        w.write_u8(self.sequence)?;
        w.write_u8(self.data_type)?;
        w.write_u8(self.source)?;
        w.write_u32::<BigEndian>(self.offset)?;
        w.write_u16::<BigEndian>(self.length)
    }
}

/// Decoding is only needed to check what goes out on the wire.
#[cfg(test)]
impl Header {
    pub fn is_push(&self) -> bool {
        self.flags & PUSH != 0
    }

    pub fn decode(bytes: &[u8]) -> Result<Header, Error> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::MalformedPacket(format!(
                "{} bytes is shorter than the {} byte header",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let mut reader = Cursor::new(&bytes[..HEADER_LEN]);
        let truncated = |_| Error::MalformedPacket("truncated header".to_string());
        let header = Header {
            flags: reader.read_u8().map_err(truncated)?,
            sequence: reader.read_u8().map_err(truncated)?,
            data_type: reader.read_u8().map_err(truncated)?,
            source: reader.read_u8().map_err(truncated)?,
            offset: reader.read_u32::<BigEndian>().map_err(truncated)?,
            length: reader.read_u16::<BigEndian>().map_err(truncated)?,
        };

        if header.flags & VER_MASK != VER1 {
            return Err(Error::MalformedPacket(format!(
                "unsupported protocol version in flags {:#04x}",
                header.flags
            )));
        }

        Ok(header)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.header.write_to(w)?;
        w.write_all(&self.payload)
    }
}

#[cfg(test)]
impl Packet {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        self.write_to(&mut buf).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Packet, Error> {
        let header = Header::decode(bytes)?;
        let payload = &bytes[HEADER_LEN..];
        if payload.len() != header.length as usize {
            return Err(Error::MalformedPacket(format!(
                "header announces {} payload bytes, got {}",
                header.length,
                payload.len()
            )));
        }

        Ok(Packet {
            header,
            payload: payload.to_vec(),
        })
    }
}

/// Splits a frame into DDP packets.
///
/// Offsets advance in fixed `max_datalen` strides. The remainder chunk is
/// always emitted, even when empty, because it carries the push flag. An
/// empty frame yields no packets at all.
pub fn encode(pixels: &PixelBuffer, max_datalen: usize) -> Vec<Packet> {
    if pixels.is_empty() || max_datalen == 0 {
        return Vec::new();
    }

    let data = pixels.to_bytes();
    let full_chunks = data.len() / max_datalen;
    let mut packets = Vec::with_capacity(full_chunks + 1);

    for (i, chunk) in data.chunks_exact(max_datalen).enumerate() {
        packets.push(Packet {
            header: Header::new((i * max_datalen) as u32, chunk.len() as u16, false),
            payload: chunk.to_vec(),
        });
    }

    let remainder = &data[full_chunks * max_datalen..];
    packets.push(Packet {
        header: Header::new((full_chunks * max_datalen) as u32, remainder.len() as u16, true),
        payload: remainder.to_vec(),
    });

    packets
}
