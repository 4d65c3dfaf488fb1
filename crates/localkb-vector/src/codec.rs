//! Blob layout, all little-endian:
//!
//! ```text
//! magic   8 bytes  "LKBFLAT1"
//! dim     u32
//! count   u64
//! data    count * dim f32
//! ```

use std::io::{self, Read, Write};

use localkb_core::{KbError, Result};

use crate::flat::FlatIpIndex;

pub const MAGIC: &[u8; 8] = b"LKBFLAT1";
const HEADER_LEN: usize = 8 + 4 + 8;

fn encoded_dim(index: &FlatIpIndex) -> io::Result<u32> {
    u32::try_from(index.dim()).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "dimension exceeds u32"))
}

pub fn write_to<W: Write>(index: &FlatIpIndex, w: &mut W) -> io::Result<()> {
    let dim = encoded_dim(index)?;
    w.write_all(MAGIC)?;
    w.write_all(&dim.to_le_bytes())?;
    w.write_all(&(index.len() as u64).to_le_bytes())?;
    for x in index.raw() {
        w.write_all(&x.to_le_bytes())?;
    }
    Ok(())
}

pub fn read_from<R: Read>(r: &mut R) -> io::Result<FlatIpIndex> {
    let mut header = [0u8; HEADER_LEN];
    r.read_exact(&mut header)?;
    let (dim, count) = parse_header(&header)?;
    let floats = dim
        .checked_mul(count)
        .ok_or_else(|| invalid("row count overflows"))?;
    let mut data = Vec::with_capacity(floats.min(1 << 24));
    let mut buf = [0u8; 4];
    for _ in 0..floats {
        r.read_exact(&mut buf)?;
        data.push(f32::from_le_bytes(buf));
    }
    if r.read(&mut buf)? != 0 {
        return Err(invalid("trailing bytes after vector data"));
    }
    FlatIpIndex::from_raw(dim, data).map_err(|e| invalid(&e.to_string()))
}

pub fn to_bytes(index: &FlatIpIndex) -> Result<Vec<u8>> {
    let dim = encoded_dim(index).map_err(|e| KbError::Operation(format!("cannot encode vector index: {e}")))?;
    let mut out = Vec::with_capacity(HEADER_LEN + index.raw().len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&dim.to_le_bytes());
    out.extend_from_slice(&(index.len() as u64).to_le_bytes());
    for x in index.raw() {
        out.extend_from_slice(&x.to_le_bytes());
    }
    Ok(out)
}

pub fn from_bytes(bytes: &[u8]) -> Result<FlatIpIndex> {
    let header: &[u8; HEADER_LEN] = bytes
        .get(..HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(|| KbError::CorruptIndex(format!("blob is {} bytes, shorter than the header", bytes.len())))?;
    let (dim, count) = parse_header(header).map_err(|e| KbError::CorruptIndex(e.to_string()))?;
    let body = &bytes[HEADER_LEN..];
    let expected = dim.checked_mul(count).and_then(|n| n.checked_mul(4));
    if expected != Some(body.len()) {
        return Err(KbError::CorruptIndex(format!(
            "expected {count} rows of dim {dim}, found {} data bytes",
            body.len()
        )));
    }
    let data = body
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    FlatIpIndex::from_raw(dim, data)
}

fn parse_header(header: &[u8; HEADER_LEN]) -> io::Result<(usize, usize)> {
    if &header[..8] != MAGIC {
        return Err(invalid("bad magic"));
    }
    let dim = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
    let mut count = [0u8; 8];
    count.copy_from_slice(&header[12..20]);
    let count = usize::try_from(u64::from_le_bytes(count)).map_err(|_| invalid("row count overflows"))?;
    Ok((dim, count))
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatIpIndex {
        FlatIpIndex::from_rows(3, &[vec![0.6, 0.8, 0.0], vec![0.0, 0.0, 1.0]]).unwrap()
    }

    #[test]
    fn streamed_and_buffered_encodings_agree() {
        let index = sample();
        let mut streamed = Vec::new();
        write_to(&index, &mut streamed).unwrap();
        assert_eq!(streamed, to_bytes(&index).unwrap());
        assert_eq!(read_from(&mut streamed.as_slice()).unwrap(), index);
    }

    #[test]
    fn truncated_blob_is_corrupt() {
        let bytes = to_bytes(&sample()).unwrap();
        assert!(matches!(from_bytes(&bytes[..bytes.len() - 2]), Err(KbError::CorruptIndex(_))));
        assert!(matches!(from_bytes(&bytes[..5]), Err(KbError::CorruptIndex(_))));
        assert!(read_from(&mut &bytes[..bytes.len() - 2]).is_err());
    }

    #[test]
    fn wrong_magic_is_corrupt() {
        let mut bytes = to_bytes(&sample()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(from_bytes(&bytes), Err(KbError::CorruptIndex(_))));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_dimension_is_rejected_by_both_encoders() {
        let index = FlatIpIndex::new(u32::MAX as usize + 1);
        assert!(write_to(&index, &mut Vec::new()).is_err());
        assert!(matches!(to_bytes(&index), Err(KbError::Operation(_))));
    }
}
