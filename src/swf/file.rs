use binary_reader::{BinaryReader, Endian};
use flate2::read::ZlibDecoder;
use log::debug;
use std::io::Read;

use crate::io::{SwfBitReader, SwfRead};
use crate::swf::types::Rect;

/// Parsed container header plus the raw tag stream that follows it.
///
/// The first eight bytes (signature, version, declared length) are never
/// compressed; for a `CWS` file everything after them is one zlib stream.
pub struct SwfFile {
    pub version: u8,
    pub frame_size: Rect,
    pub frame_rate: f32,
    pub frame_count: u16,
    /// Tag stream, decompressed, starting at the first tag header.
    pub body: Vec<u8>,
}

impl SwfFile {
    pub fn read(data: &[u8]) -> Result<SwfFile, String> {
        if data.len() < 8 {
            return Err(format!("File too short for header: {} bytes", data.len()));
        }
        let compressed = match &data[0..3] {
            b"FWS" => false,
            b"CWS" => true,
            sig => return Err(format!("Invalid signature: {:?}", sig)),
        };
        let version = data[3];
        let declared_len =
            u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;

        let rest = if compressed {
            let mut decoder = ZlibDecoder::new(&data[8..]);
            let mut out = Vec::with_capacity(declared_len.saturating_sub(8));
            decoder
                .read_to_end(&mut out)
                .map_err(|e| format!("Failed to decompress body: {:?}", e))?;
            out
        } else {
            data[8..].to_vec()
        };
        // declared_len counts the 8-byte prefix plus the uncompressed rest
        if rest.len() + 8 < declared_len {
            debug!(
                "Body shorter than declared: {} < {}",
                rest.len() + 8,
                declared_len
            );
        }

        let mut bits = SwfBitReader::new(&rest);
        let frame_size = Rect::read(&mut bits);
        let header_end = bits.position();

        let mut reader = BinaryReader::from_u8(&rest[header_end..]);
        reader.set_endian(Endian::Little);
        let frame_rate = reader.read_fixed8()?;
        let frame_count = reader
            .read_u16()
            .map_err(|e| format!("Failed to read frame count: {:?}", e))?;
        let body = rest[header_end + reader.pos..].to_vec();

        debug!(
            "Container v{}: {}x{} twips, {} fps, {} frames declared",
            version,
            frame_size.width_twips(),
            frame_size.height_twips(),
            frame_rate,
            frame_count
        );

        Ok(SwfFile {
            version,
            frame_size,
            frame_rate,
            frame_count,
            body,
        })
    }

    /// Frame delay in milliseconds for the declared rate. A zero rate
    /// falls back to 12 fps.
    pub fn frame_delay_ms(&self) -> u32 {
        let rate = if self.frame_rate <= 0.0 {
            12.0
        } else {
            self.frame_rate
        };
        (1000.0 / rate) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn header_bytes(frame_rate_raw: u16, frame_count: u16) -> Vec<u8> {
        // RECT with nbits=0 packs into a single byte
        let mut out = vec![0u8];
        out.extend_from_slice(&frame_rate_raw.to_le_bytes());
        out.extend_from_slice(&frame_count.to_le_bytes());
        out
    }

    pub fn uncompressed_file(body: &[u8]) -> Vec<u8> {
        let mut rest = header_bytes(0x0C00, 1);
        rest.extend_from_slice(body);
        let mut out = Vec::new();
        out.extend_from_slice(b"FWS");
        out.push(6);
        out.extend_from_slice(&((rest.len() + 8) as u32).to_le_bytes());
        out.extend_from_slice(&rest);
        out
    }

    #[test]
    fn test_read_uncompressed() {
        let data = uncompressed_file(&[0x40, 0x00]); // ShowFrame, End
        let file = SwfFile::read(&data).unwrap();
        assert_eq!(file.version, 6);
        assert_eq!(file.frame_rate, 12.0);
        assert_eq!(file.frame_count, 1);
        assert_eq!(file.body, vec![0x40, 0x00]);
    }

    #[test]
    fn test_read_compressed() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut rest = header_bytes(0x1800, 2); // 24 fps
        rest.extend_from_slice(&[0x40, 0x00]);
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&rest).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut data = Vec::new();
        data.extend_from_slice(b"CWS");
        data.push(6);
        data.extend_from_slice(&((rest.len() + 8) as u32).to_le_bytes());
        data.extend_from_slice(&compressed);

        let file = SwfFile::read(&data).unwrap();
        assert_eq!(file.frame_rate, 24.0);
        assert_eq!(file.frame_count, 2);
        assert_eq!(file.body, vec![0x40, 0x00]);
    }

    #[test]
    fn test_bad_signature() {
        assert!(SwfFile::read(b"ZWS\x06\x08\x00\x00\x00").is_err());
    }

    #[test]
    fn test_frame_delay() {
        let data = uncompressed_file(&[0x00]);
        let file = SwfFile::read(&data).unwrap();
        assert_eq!(file.frame_delay_ms(), 83);
    }
}
