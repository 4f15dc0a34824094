
use shared::error::{Error, Result};

/// BitWriter appends bits MSB-first into a byte region, or only counts them.
///
/// A bound writer ORs bits into `buf`, so the target region must be zeroed
/// beforehand. A null writer has unbounded capacity and is used to size an
/// encoding before the real buffer exists.
#[derive(Debug)]
pub struct BitWriter<'a> {
    buf: Option<&'a mut [u8]>,
    initial_offset: usize,
    offset: usize,
    size: usize,
}

impl<'a> BitWriter<'a> {
    /// Binds a writer to `buf`, starting at bit `offset_bits` with room for
    /// `size_bits` bits.
    pub fn from_size_bits(
        buf: &'a mut [u8],
        offset_bits: usize,
        size_bits: usize,
    ) -> Result<Self> {
        let needed = (offset_bits + size_bits).div_ceil(8);
        if buf.len() < needed {
            return Err(Error::ErrBufferTooSmall);
        }

        Ok(BitWriter {
            buf: Some(buf),
            initial_offset: offset_bits,
            offset: offset_bits,
            size: size_bits,
        })
    }

    pub fn from_null() -> Self {
        BitWriter {
            buf: None,
            initial_offset: 0,
            offset: 0,
            size: usize::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.buf.is_none()
    }

    /// Number of bits written since construction.
    pub fn written_bits(&self) -> usize {
        self.offset - self.initial_offset
    }

    pub fn remaining_bits(&self) -> usize {
        self.size - self.written_bits()
    }

    /// Writes the low `bits` bits of `v`, most significant first.
    pub fn write(&mut self, v: u64, bits: usize) -> Result<()> {
        if bits > 64 || (bits < 64 && v >> bits != 0) {
            return Err(Error::BitWriterValueTooLarge(v, bits));
        }
        if bits > self.remaining_bits() {
            return Err(Error::BitWriterOverflow(bits, self.remaining_bits()));
        }

        let mut remaining = bits;
        while remaining > 0 {
            remaining -= self.write_partial_byte(v, remaining);
        }

        Ok(())
    }

    /// Writes `v` in `[0, n)` with the non-symmetric unsigned code `ns(n)`.
    /// <https://aomediacodec.github.io/av1-rtp-spec/#a82-syntax>
    pub fn write_non_symmetric(&mut self, v: u64, n: u64) -> Result<()> {
        if v >= n {
            return Err(Error::NonSymmetricValueOutOfRange(v, n));
        }

        let w = (u64::BITS - n.leading_zeros()) as usize;
        // 2^w - n, wrapping when w == 64
        let x = 1u64.checked_shl(w as u32).unwrap_or(0).wrapping_sub(n);
        if v < x {
            self.write(v, w - 1)
        } else {
            self.write(v + x, w)
        }
    }

    /// Emits the leading bits of the `bits`-wide field `v` that fit into the
    /// current byte, returning how many were consumed.
    fn write_partial_byte(&mut self, v: u64, bits: usize) -> usize {
        let bit_in_byte = self.offset % 8;
        let n = bits.min(8 - bit_in_byte);

        if let Some(buf) = self.buf.as_deref_mut() {
            let chunk = ((v >> (bits - n)) & ((1u64 << n) - 1)) as u8;
            buf[self.offset / 8] |= chunk << (8 - bit_in_byte - n);
        }

        self.offset += n;
        n
    }
}
