//! Unsigned LEB128 varints, as used by multihashes and the pack container.

use crate::error::TypeError;

/// Encode a u64 as a variable-length integer.
pub fn encode(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a variable-length integer. Returns (value, bytes_consumed).
pub fn decode(data: &[u8]) -> Result<(u64, usize), TypeError> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        if shift >= 64 {
            return Err(TypeError::InvalidVarint("overflow"));
        }
    }
    Err(TypeError::InvalidVarint("truncated"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_is_one_byte() {
        let mut buf = Vec::new();
        encode(&mut buf, 0);
        assert_eq!(buf, vec![0]);
        assert_eq!(decode(&buf).unwrap(), (0, 1));
    }

    #[test]
    fn multi_byte_value() {
        let mut buf = Vec::new();
        encode(&mut buf, 300);
        assert_eq!(buf, vec![0xAC, 0x02]);
    }

    #[test]
    fn truncated_input() {
        assert_eq!(
            decode(&[0x80]).unwrap_err(),
            TypeError::InvalidVarint("truncated")
        );
    }

    #[test]
    fn empty_input() {
        assert!(decode(&[]).is_err());
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(value: u64, trailer in proptest::collection::vec(any::<u8>(), 0..4)) {
            let mut buf = Vec::new();
            encode(&mut buf, value);
            let len = buf.len();
            buf.extend_from_slice(&trailer);
            prop_assert_eq!(decode(&buf).unwrap(), (value, len));
        }
    }
}
