use bitvec_helpers::bitstream_io_reader::BsIoSliceReader;

use crate::error::{HevcError, Result};

/// An Exp-Golomb code never has more leading zero bits than this.
/// 32 is needed to represent `i32::MIN` as a signed code.
const MAX_EXP_GOLOMB_LEADING_ZEROS: u32 = 32;

/// Source of bits for the syntax parsers.
///
/// Only `read_bits` and the cursor accessors need to be implemented,
/// the flag and Exp-Golomb reads are derived from them.
pub trait BitSource {
    /// Reads the next `n` bits, `n` must be at most 32
    fn read_bits(&mut self, n: u32) -> Result<u32>;

    /// Number of bits consumed so far
    fn position(&self) -> u64;

    /// Number of bits left before the end of the buffer
    fn bits_left(&self) -> u64;

    fn read_flag(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    fn skip_bits(&mut self, mut n: u64) -> Result<()> {
        let available = self.bits_left();
        if n > available {
            return Err(HevcError::BitstreamExhausted {
                needed: n,
                available,
            });
        }

        while n > 0 {
            let chunk = n.min(32) as u32;
            self.read_bits(chunk)?;
            n -= chunk as u64;
        }

        Ok(())
    }

    fn is_byte_aligned(&self) -> bool {
        self.position() % 8 == 0
    }

    /// Unsigned Exp-Golomb, ue(v)
    fn read_uev(&mut self) -> Result<u32> {
        let code = read_exp_golomb_code(self)?;

        u32::try_from(code).map_err(|_| HevcError::InvalidHeader("ue(v) value exceeds 32 bits"))
    }

    /// Signed Exp-Golomb, se(v)
    fn read_sev(&mut self) -> Result<i32> {
        let code = read_exp_golomb_code(self)? as i64;

        let value = if code % 2 == 1 {
            (code + 1) / 2
        } else {
            -(code / 2)
        };

        i32::try_from(value).map_err(|_| HevcError::InvalidHeader("se(v) value exceeds 32 bits"))
    }
}

fn read_exp_golomb_code<B: BitSource + ?Sized>(bs: &mut B) -> Result<u64> {
    let mut leading_zeros = 0;

    while !bs.read_flag()? {
        leading_zeros += 1;

        if leading_zeros > MAX_EXP_GOLOMB_LEADING_ZEROS {
            return Err(HevcError::InvalidHeader("Exp-Golomb prefix too long"));
        }
    }

    if leading_zeros == 0 {
        return Ok(0);
    }

    let suffix = bs.read_bits(leading_zeros)? as u64;

    Ok((1_u64 << leading_zeros) - 1 + suffix)
}

/// Cursor over a de-escaped RBSP
pub struct BitReader<'a> {
    bs: BsIoSliceReader<'a>,
    position: u64,
    len: u64,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            bs: BsIoSliceReader::from_slice(data),
            position: 0,
            len: data.len() as u64 * 8,
        }
    }
}

impl BitSource for BitReader<'_> {
    fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(HevcError::InvalidHeader("fixed length read wider than 32 bits"));
        }

        let available = self.bits_left();
        if n as u64 > available {
            return Err(HevcError::BitstreamExhausted {
                needed: n as u64,
                available,
            });
        }

        if n == 0 {
            return Ok(0);
        }

        let value = self
            .bs
            .read_var::<u32>(n)
            .map_err(|_| HevcError::BitstreamExhausted {
                needed: n as u64,
                available,
            })?;
        self.position += n as u64;

        Ok(value)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn bits_left(&self) -> u64 {
        self.len - self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_reads() {
        let data = [0b1010_1100, 0xFF, 0x00, 0x01, 0x80];
        let mut bs = BitReader::new(&data);

        assert!(bs.read_flag().unwrap());
        assert_eq!(bs.read_bits(3).unwrap(), 0b010);
        assert_eq!(bs.read_bits(4).unwrap(), 0b1100);
        assert!(bs.is_byte_aligned());
        assert_eq!(bs.read_bits(32).unwrap(), 0xFF00_0180);
        assert_eq!(bs.bits_left(), 0);
    }

    #[test]
    fn unsigned_exp_golomb() {
        // 1 | 010 | 011 | 00100 | 00111
        let data = [0b1010_0110, 0b0100_0011, 0b1000_0000];
        let mut bs = BitReader::new(&data);

        assert_eq!(bs.read_uev().unwrap(), 0);
        assert_eq!(bs.read_uev().unwrap(), 1);
        assert_eq!(bs.read_uev().unwrap(), 2);
        assert_eq!(bs.read_uev().unwrap(), 3);
        assert_eq!(bs.read_uev().unwrap(), 6);
    }

    #[test]
    fn signed_exp_golomb() {
        // codes 1, 2, 3, 4 map to 1, -1, 2, -2
        let data = [0b0100_1100, 0b1000_0101, 0b0000_0000];
        let mut bs = BitReader::new(&data);

        assert_eq!(bs.read_sev().unwrap(), 1);
        assert_eq!(bs.read_sev().unwrap(), -1);
        assert_eq!(bs.read_sev().unwrap(), 2);
        assert_eq!(bs.read_sev().unwrap(), -2);
    }

    #[test]
    fn exhaustion_is_reported() {
        let data = [0xAB];
        let mut bs = BitReader::new(&data);

        bs.read_bits(6).unwrap();
        assert_eq!(
            bs.read_bits(3),
            Err(HevcError::BitstreamExhausted {
                needed: 3,
                available: 2
            })
        );
        // Cursor untouched by the failed read
        assert_eq!(bs.read_bits(2).unwrap(), 0b11);
    }

    #[test]
    fn all_zero_prefix_fails() {
        let data = [0_u8; 16];
        let mut bs = BitReader::new(&data);

        assert_eq!(
            bs.read_uev(),
            Err(HevcError::InvalidHeader("Exp-Golomb prefix too long"))
        );
    }

    #[test]
    fn truncated_exp_golomb() {
        let data = [0b0000_0001];
        let mut bs = BitReader::new(&data);

        assert!(matches!(
            bs.read_uev(),
            Err(HevcError::BitstreamExhausted { .. })
        ));
    }

    #[test]
    fn skip_past_end() {
        let data = [0, 0];
        let mut bs = BitReader::new(&data);

        assert!(bs.skip_bits(17).is_err());
        bs.skip_bits(16).unwrap();
        assert_eq!(bs.bits_left(), 0);
    }
}
