//! Street graph file formats

pub mod binary;
pub mod osrm;
pub mod text;

use std::io::{ErrorKind, Read};

use crate::Error;

/// Little-endian fixed-width field reader over a byte stream
pub(crate) struct RecordReader<R> {
    inner: R,
    section: &'static str,
}

impl<R: Read> RecordReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            section: "header",
        }
    }

    /// Name the part of the file being read, for error messages
    pub(crate) fn section(&mut self, section: &'static str) {
        self.section = section;
    }

    fn bytes<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(|err| {
            if err.kind() == ErrorKind::UnexpectedEof {
                Error::InvalidData(format!("Truncated {}", self.section))
            } else {
                Error::IoError(err)
            }
        })?;
        Ok(buf)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.bytes::<1>()?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, Error> {
        Ok(u16::from_le_bytes(self.bytes()?))
    }

    pub(crate) fn i32(&mut self) -> Result<i32, Error> {
        Ok(i32::from_le_bytes(self.bytes()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_le_bytes(self.bytes()?))
    }

    pub(crate) fn f32(&mut self) -> Result<f32, Error> {
        Ok(f32::from_le_bytes(self.bytes()?))
    }

    pub(crate) fn f64(&mut self) -> Result<f64, Error> {
        Ok(f64::from_le_bytes(self.bytes()?))
    }
}

/// Convert a record count from a header, rejecting negative values
pub(crate) fn count(value: i64, what: &str) -> Result<usize, Error> {
    usize::try_from(value).map_err(|_| Error::InvalidData(format!("Negative {what} count: {value}")))
}

/// Fail early when the file cannot hold the records its header announces
pub(crate) fn ensure_len(actual: u64, expected: u64, what: &str) -> Result<(), Error> {
    if actual < expected {
        return Err(Error::InvalidData(format!(
            "Truncated {what}: {actual} bytes, expected at least {expected}"
        )));
    }
    if actual > expected {
        log::warn!("Ignoring {} trailing bytes after {what}", actual - expected);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_little_endian() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(-2i32).to_le_bytes());
        bytes.extend_from_slice(&7u16.to_le_bytes());
        bytes.extend_from_slice(&1.5f64.to_le_bytes());
        bytes.push(9);
        let mut reader = RecordReader::new(bytes.as_slice());
        assert_eq!(reader.i32().unwrap(), -2);
        assert_eq!(reader.u16().unwrap(), 7);
        assert_eq!(reader.f64().unwrap(), 1.5);
        assert_eq!(reader.u8().unwrap(), 9);
    }

    #[test]
    fn short_reads_name_the_section() {
        let mut reader = RecordReader::new([1u8, 2].as_slice());
        reader.section("edge records");
        match reader.u32() {
            Err(Error::InvalidData(message)) => assert_eq!(message, "Truncated edge records"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
