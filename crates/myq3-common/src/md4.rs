// md4.rs — block checksums for loaded assets

use md4::{Digest, Md4 as Md4Hasher};

/// Fold an MD4 digest into a single word by XORing the four digest
/// words together. Used to fingerprint BSP and QVM images.
pub fn com_block_checksum(data: &[u8]) -> u32 {
    let mut hasher = Md4Hasher::new();
    hasher.update(data);
    let digest = hasher.finalize();

    let d0 = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let d1 = u32::from_le_bytes([digest[4], digest[5], digest[6], digest[7]]);
    let d2 = u32::from_le_bytes([digest[8], digest[9], digest[10], digest[11]]);
    let d3 = u32::from_le_bytes([digest[12], digest[13], digest[14], digest[15]]);

    d0 ^ d1 ^ d2 ^ d3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_checksum_stable() {
        let a = com_block_checksum(b"maps/q3dm17.bsp");
        assert_eq!(a, com_block_checksum(b"maps/q3dm17.bsp"));
        assert_ne!(a, com_block_checksum(b"maps/q3dm18.bsp"));
    }

    #[test]
    fn test_block_checksum_empty() {
        // MD4("") = 31d6cfe0 d16ae931 b73c59d7 e0c089c0, folded
        let expected = 0xe0cfd631u32 ^ 0x31e96ad1 ^ 0xd7593cb7 ^ 0xc089c0e0;
        assert_eq!(com_block_checksum(b""), expected);
    }
}
