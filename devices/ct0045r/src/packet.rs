//! Bit packing for coordinate packets and the tilt response.

use wctablet_core::PointerSample;

use crate::abi::{PACKET_LEN, POINTER_HEADER, TILT_HEADER};

/// Top bits of a coordinate, above the two 7 bit groups
#[inline(always)]
pub const fn high2(n: u16) -> u8 {
    (n >> 14) as u8
}

/// Middle 7 bits of a coordinate
#[inline(always)]
pub const fn mid7(n: u16) -> u8 {
    ((n >> 7) & 0x7f) as u8
}

/// Low 7 bits of a coordinate
#[inline(always)]
pub const fn low7(n: u16) -> u8 {
    (n & 0x7f) as u8
}

/// Reassemble a coordinate from its three groups
#[inline(always)]
pub const fn join(high: u8, mid: u8, low: u8) -> u16 {
    ((high as u16 & 0x3) << 14) | ((mid as u16 & 0x7f) << 7) | (low as u16 & 0x7f)
}

/// Encode a pointer sample as a coordinate packet.
///
/// Buttons and wheel are not encoded: byte 3 carries no button bits and the
/// trailing byte is reserved as zero.
pub fn encode_pointer(sample: &PointerSample) -> [u8; PACKET_LEN] {
    let PointerSample { x, y, .. } = *sample;
    [
        POINTER_HEADER | high2(x),
        mid7(x),
        low7(x),
        high2(y),
        mid7(y),
        low7(y),
        0x00,
    ]
}

/// Decode the coordinates of a packet produced by [`encode_pointer`].
/// Returns `None` if the header bits are missing.
pub fn decode_coordinates(packet: &[u8; PACKET_LEN]) -> Option<(u16, u16)> {
    let [b0, b1, b2, b3, b4, b5, _] = *packet;
    (b0 & POINTER_HEADER == POINTER_HEADER).then(|| (join(b0, b1, b2), join(b3, b4, b5)))
}

/// Compute the two variable bytes of a tilt response for parameter `p`.
///
/// The first byte reflects the top bit of `p`. The second byte flips bits of
/// each nibble, dropping the top bit of the high nibble.
#[inline(always)]
pub const fn tilt_bytes(p: u8) -> (u8, u8) {
    let flag = if p & 0x80 == 0 { 0x7e } else { 0x7f };
    let high = ((p >> 4) & 0x7) ^ 0x5;
    let low = (p & 0xf) ^ 0x7;
    (flag, (high << 4) | low)
}

/// Full tilt response packet for parameter `p`
pub fn tilt_response(p: u8) -> [u8; PACKET_LEN] {
    let (flag, value) = tilt_bytes(p);
    [TILT_HEADER, flag, value, 0x03, 0x7f, 0x7f, 0x00]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_roundtrip() {
        for x in 0..=16383u16 {
            let joined =
                (u16::from(high2(x)) << 14) | (u16::from(mid7(x)) << 7) | u16::from(low7(x));
            assert_eq!(joined, x);
            assert_eq!(high2(x), 0, "14 bit coordinates never use the top group");
        }
    }

    #[test]
    fn packet_roundtrip() {
        for x in (0..=u16::MAX).step_by(97) {
            let y = u16::MAX - x;
            let packet = encode_pointer(&PointerSample::new(x, y));
            assert_eq!(decode_coordinates(&packet), Some((x, y)));
        }
    }

    #[test]
    fn packet_layout() {
        let sample = PointerSample {
            x: 0x2abc,
            y: 0x1234,
            z: -3,
            buttons: 0b101,
        };
        assert_eq!(
            encode_pointer(&sample),
            [0xe0, 0x55, 0x3c, 0x00, 0x24, 0x34, 0x00]
        );
    }

    #[test]
    fn decode_rejects_missing_header() {
        assert_eq!(decode_coordinates(&[0xa3, 0x7e, 0x08, 0x03, 0x7f, 0x7f, 0x00]), None);
    }

    #[test]
    fn legacy_tilt_pairs() {
        let cases = [
            (0x5f, (0x7e, 0x08)),
            (0x95, (0x7f, 0x42)),
            (0xcc, (0x7f, 0x1b)),
            (0xf1, (0x7f, 0x26)),
            (0x28, (0x7e, 0x7f)),
        ];
        for (input, expected) in cases {
            assert_eq!(tilt_bytes(input), expected, "input {input:#04x}");
        }
    }

    #[test]
    fn tilt_packet() {
        assert_eq!(
            tilt_response(0x5f),
            [0xa3, 0x7e, 0x08, 0x03, 0x7f, 0x7f, 0x00]
        );
    }
}
