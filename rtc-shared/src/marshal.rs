use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};

/// Reports how many bytes a value occupies once marshaled.
pub trait MarshalSize {
    fn marshal_size(&self) -> usize;
}

/// Serializes a value into a caller-provided buffer.
pub trait Marshal: MarshalSize {
    /// Writes the value into `buf` and returns the number of bytes used.
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize>;

    fn marshal(&self) -> Result<Bytes> {
        let l = self.marshal_size();
        let mut buf = BytesMut::with_capacity(l);
        buf.resize(l, 0);
        let n = self.marshal_to(&mut buf)?;
        if n != l {
            Err(Error::Other(format!(
                "marshal_to output size {n}, but expect {l}"
            )))
        } else {
            Ok(buf.freeze())
        }
    }
}
