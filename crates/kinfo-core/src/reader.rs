//! # Byte Reader
//!
//! Endian-aware fixed-width integer extraction from note buffers.
//!
//! Every decoder in this crate goes through these functions. Each call checks
//! `offset + width <= buf.len()` (with overflow-checked arithmetic) and returns
//! [`KinfoError::OutOfRange`] instead of panicking. Nothing is silently
//! truncated or zero-filled.
//!
//! The byte order is [`object::Endianness`], the same type the ELF container
//! reports, so a foreign-endian core decodes without any conversion step.
//!
//! ```rust
//! use kinfo_core::reader::{read_u32, ByteReader};
//! use object::Endianness;
//!
//! let buf = [0x78, 0x56, 0x34, 0x12, 0xff];
//! assert_eq!(read_u32(&buf, 0, Endianness::Little).unwrap(), 0x1234_5678);
//! assert!(read_u32(&buf, 2, Endianness::Little).is_err());
//!
//! let reader = ByteReader::new(&buf, Endianness::Big);
//! assert_eq!(reader.u16(0).unwrap(), 0x7856);
//! ```

use object::endian::{Endian, Endianness};

use crate::error::{KinfoError, KinfoResult};

/// Borrow `len` bytes starting at `offset`.
pub fn read_bytes(buf: &[u8], offset: usize, len: usize) -> KinfoResult<&[u8]>
{
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or(KinfoError::OutOfRange {
            offset,
            width: len,
            len: buf.len(),
        })
}

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> KinfoResult<[u8; N]>
{
    let bytes = read_bytes(buf, offset, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

pub fn read_u8(buf: &[u8], offset: usize) -> KinfoResult<u8>
{
    Ok(read_array::<1>(buf, offset)?[0])
}

pub fn read_i8(buf: &[u8], offset: usize) -> KinfoResult<i8>
{
    Ok(i8::from_ne_bytes(read_array::<1>(buf, offset)?))
}

pub fn read_u16(buf: &[u8], offset: usize, endian: Endianness) -> KinfoResult<u16>
{
    Ok(endian.read_u16_bytes(read_array(buf, offset)?))
}

pub fn read_u32(buf: &[u8], offset: usize, endian: Endianness) -> KinfoResult<u32>
{
    Ok(endian.read_u32_bytes(read_array(buf, offset)?))
}

pub fn read_i32(buf: &[u8], offset: usize, endian: Endianness) -> KinfoResult<i32>
{
    Ok(endian.read_i32_bytes(read_array(buf, offset)?))
}

pub fn read_u64(buf: &[u8], offset: usize, endian: Endianness) -> KinfoResult<u64>
{
    Ok(endian.read_u64_bytes(read_array(buf, offset)?))
}

pub fn read_i64(buf: &[u8], offset: usize, endian: Endianness) -> KinfoResult<i64>
{
    Ok(endian.read_i64_bytes(read_array(buf, offset)?))
}

/// Read an unsigned integer whose width (4 or 8 bytes) is only known at runtime.
///
/// Used for `long` and address-sized kernel fields.
pub fn read_uint(buf: &[u8], offset: usize, width: usize, endian: Endianness) -> KinfoResult<u64>
{
    match width {
        4 => read_u32(buf, offset, endian).map(u64::from),
        8 => read_u64(buf, offset, endian),
        _ => Err(KinfoError::InvalidArgument(format!("unsupported integer width {width}"))),
    }
}

/// Read a NUL-terminated string of at most `limit` bytes.
///
/// The string ends at the first NUL, at `limit`, or at the end of the buffer,
/// whichever comes first. An `offset` past the end of the buffer is an error;
/// a missing terminator is not. Invalid UTF-8 is replaced, not rejected.
pub fn read_cstr(buf: &[u8], offset: usize, limit: usize) -> KinfoResult<String>
{
    if offset > buf.len() {
        return Err(KinfoError::OutOfRange {
            offset,
            width: 1,
            len: buf.len(),
        });
    }
    let end = offset.saturating_add(limit).min(buf.len());
    let bytes = &buf[offset..end];
    let bytes = bytes.iter().position(|&b| b == 0).map_or(bytes, |nul| &bytes[..nul]);
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// A note buffer paired with its byte order.
///
/// Thin convenience wrapper so decoders don't have to thread the byte order
/// through every call. All methods delegate to the free functions above.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a>
{
    data: &'a [u8],
    endian: Endianness,
}

impl<'a> ByteReader<'a>
{
    pub fn new(data: &'a [u8], endian: Endianness) -> Self
    {
        Self { data, endian }
    }

    pub fn len(&self) -> usize
    {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.data.is_empty()
    }

    pub fn endian(&self) -> Endianness
    {
        self.endian
    }

    pub fn data(&self) -> &'a [u8]
    {
        self.data
    }

    pub fn bytes(&self, offset: usize, len: usize) -> KinfoResult<&'a [u8]>
    {
        read_bytes(self.data, offset, len)
    }

    pub fn u8(&self, offset: usize) -> KinfoResult<u8>
    {
        read_u8(self.data, offset)
    }

    pub fn i8(&self, offset: usize) -> KinfoResult<i8>
    {
        read_i8(self.data, offset)
    }

    pub fn u16(&self, offset: usize) -> KinfoResult<u16>
    {
        read_u16(self.data, offset, self.endian)
    }

    pub fn u32(&self, offset: usize) -> KinfoResult<u32>
    {
        read_u32(self.data, offset, self.endian)
    }

    pub fn i32(&self, offset: usize) -> KinfoResult<i32>
    {
        read_i32(self.data, offset, self.endian)
    }

    pub fn u64(&self, offset: usize) -> KinfoResult<u64>
    {
        read_u64(self.data, offset, self.endian)
    }

    pub fn i64(&self, offset: usize) -> KinfoResult<i64>
    {
        read_i64(self.data, offset, self.endian)
    }

    pub fn uint(&self, offset: usize, width: usize) -> KinfoResult<u64>
    {
        read_uint(self.data, offset, width, self.endian)
    }

    pub fn cstr(&self, offset: usize, limit: usize) -> KinfoResult<String>
    {
        read_cstr(self.data, offset, limit)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_read_respects_byte_order()
    {
        let buf = [1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(read_u16(&buf, 0, Endianness::Little).unwrap(), 0x0201);
        assert_eq!(read_u16(&buf, 0, Endianness::Big).unwrap(), 0x0102);
        assert_eq!(read_u64(&buf, 0, Endianness::Big).unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(read_i32(&[0xff, 0xff, 0xff, 0xfb], 0, Endianness::Big).unwrap(), -5);
    }

    #[test]
    fn test_read_at_exact_end_is_ok()
    {
        let buf = [0u8; 8];
        assert!(read_u64(&buf, 0, Endianness::Little).is_ok());
        assert!(read_u32(&buf, 4, Endianness::Little).is_ok());
        assert!(read_bytes(&buf, 8, 0).is_ok());
    }

    #[test]
    fn test_read_past_end_is_out_of_range()
    {
        let buf = [0u8; 8];
        match read_u32(&buf, 5, Endianness::Little) {
            Err(KinfoError::OutOfRange { offset, width, len }) => {
                assert_eq!((offset, width, len), (5, 4, 8));
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
        assert!(read_u8(&buf, 8).is_err());
    }

    #[test]
    fn test_read_offset_overflow_does_not_panic()
    {
        let buf = [0u8; 8];
        assert!(read_bytes(&buf, usize::MAX, 2).is_err());
        assert!(read_u64(&buf, usize::MAX - 3, Endianness::Little).is_err());
    }

    #[test]
    fn test_read_uint_widths()
    {
        let buf = [0x10, 0, 0, 0, 0x20, 0, 0, 0];
        assert_eq!(read_uint(&buf, 0, 4, Endianness::Little).unwrap(), 0x10);
        assert_eq!(read_uint(&buf, 0, 8, Endianness::Little).unwrap(), 0x20_0000_0010);
        assert!(read_uint(&buf, 0, 2, Endianness::Little).is_err());
    }

    #[test]
    fn test_read_cstr_stops_at_nul_or_limit()
    {
        let buf = b"hello\0world";
        assert_eq!(read_cstr(buf, 0, 64).unwrap(), "hello");
        assert_eq!(read_cstr(buf, 6, 64).unwrap(), "world");
        assert_eq!(read_cstr(buf, 0, 3).unwrap(), "hel");
        assert_eq!(read_cstr(buf, buf.len(), 4).unwrap(), "");
        assert!(read_cstr(buf, buf.len() + 1, 4).is_err());
    }
}
