// qvm.rs — bytecode image headers
//
// Two image variants exist; the second appends a jump-table-range word
// to the header. Everything is little-endian.

use myq3_common::qfiles::{read_i32_le, read_u32_le, VmHeader, VM_HEADER_SIZE, VM_HEADER_SIZE_VER2,
    VM_MAGIC, VM_MAGIC_VER2};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmLoadError {
    #[error("{0}: file too small for a qvm header")]
    TooSmall(String),
    #[error("{0}: bad magic {1:#x}")]
    BadMagic(String, u32),
    #[error("{0}: negative header field ({1})")]
    NegativeField(String, &'static str),
    #[error("{0}: {1} segment out of range")]
    SegmentOutOfRange(String, &'static str),
    #[error("{0}: image has no instructions")]
    NoInstructions(String),
    #[error("{0}: image has no data space")]
    NoData(String),
    #[error("{0}: truncated instruction stream at {1}")]
    TruncatedCode(String, usize),
    #[error("{0}: illegal opcode {1} at instruction {2}")]
    IllegalOpcode(String, u8, usize),
}

/// Parse and validate an image header against the file size.
pub fn parse_header(name: &str, image: &[u8]) -> Result<VmHeader, VmLoadError> {
    if image.len() < VM_HEADER_SIZE {
        return Err(VmLoadError::TooSmall(name.to_string()));
    }

    let magic = read_u32_le(image, 0);
    if magic != VM_MAGIC && magic != VM_MAGIC_VER2 {
        return Err(VmLoadError::BadMagic(name.to_string(), magic));
    }
    if magic == VM_MAGIC_VER2 && image.len() < VM_HEADER_SIZE_VER2 {
        return Err(VmLoadError::TooSmall(name.to_string()));
    }

    let header = VmHeader {
        vm_magic: magic,
        instruction_count: read_i32_le(image, 4),
        code_offset: read_i32_le(image, 8),
        code_length: read_i32_le(image, 12),
        data_offset: read_i32_le(image, 16),
        data_length: read_i32_le(image, 20),
        lit_length: read_i32_le(image, 24),
        bss_length: read_i32_le(image, 28),
        jtrg_length: if magic == VM_MAGIC_VER2 {
            read_i32_le(image, 32)
        } else {
            0
        },
    };

    for (value, field) in [
        (header.instruction_count, "instructionCount"),
        (header.code_offset, "codeOffset"),
        (header.code_length, "codeLength"),
        (header.data_offset, "dataOffset"),
        (header.data_length, "dataLength"),
        (header.lit_length, "litLength"),
        (header.bss_length, "bssLength"),
        (header.jtrg_length, "jtrgLength"),
    ] {
        if value < 0 {
            return Err(VmLoadError::NegativeField(name.to_string(), field));
        }
    }

    if header.instruction_count == 0 {
        return Err(VmLoadError::NoInstructions(name.to_string()));
    }

    let code_end = header.code_offset as usize + header.code_length as usize;
    if code_end > image.len() {
        return Err(VmLoadError::SegmentOutOfRange(name.to_string(), "code"));
    }
    let data_end =
        header.data_offset as usize + header.data_length as usize + header.lit_length as usize;
    if data_end > image.len() {
        return Err(VmLoadError::SegmentOutOfRange(name.to_string(), "data"));
    }

    if header.data_length + header.lit_length + header.bss_length <= 0 {
        return Err(VmLoadError::NoData(name.to_string()));
    }

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(fields: &[i32; 8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&VM_MAGIC.to_le_bytes());
        for f in &fields[1..] {
            out.extend_from_slice(&f.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut image = header_bytes(&[0, 1, 32, 0, 32, 0, 0, 64]);
        image[0] = 0x99;
        assert!(matches!(
            parse_header("vm/qagame.qvm", &image),
            Err(VmLoadError::BadMagic(_, _))
        ));
    }

    #[test]
    fn test_rejects_short_file() {
        assert!(matches!(
            parse_header("vm/qagame.qvm", &[0u8; 8]),
            Err(VmLoadError::TooSmall(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_code() {
        let image = header_bytes(&[0, 1, 32, 4096, 32, 0, 0, 64]);
        assert!(matches!(
            parse_header("vm/qagame.qvm", &image),
            Err(VmLoadError::SegmentOutOfRange(_, "code"))
        ));
    }

    #[test]
    fn test_accepts_minimal_header() {
        let image = header_bytes(&[0, 1, 32, 0, 32, 0, 0, 64]);
        let h = parse_header("vm/qagame.qvm", &image).unwrap();
        assert_eq!(h.instruction_count, 1);
        assert_eq!(h.bss_length, 64);
    }
}
