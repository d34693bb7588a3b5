use binary_reader::BinaryReader;

/// Little-endian helpers over [`BinaryReader`] for the container format.
///
/// The byte stream is little-endian throughout; callers must have set
/// `Endian::Little` on the reader before using these.
pub trait SwfRead {
    /// Reads a NUL-terminated string (the wire encoding for names/labels).
    fn read_string_z(&mut self) -> Result<String, String>;
    /// Reads an 8.8 fixed-point value (e.g. the frame rate field).
    fn read_fixed8(&mut self) -> Result<f32, String>;
    fn read_f32_le(&mut self) -> Result<f32, String>;
    /// Reads the action-record double encoding: two little-endian 32-bit
    /// words stored high-word first.
    fn read_f64_swapped(&mut self) -> Result<f64, String>;
}

impl SwfRead for BinaryReader {
    fn read_string_z(&mut self) -> Result<String, String> {
        let mut bytes = Vec::new();
        loop {
            let b = self
                .read_u8()
                .map_err(|e| format!("Failed to read string byte: {:?}", e))?;
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    fn read_fixed8(&mut self) -> Result<f32, String> {
        let raw = self
            .read_u16()
            .map_err(|e| format!("Failed to read fixed8: {:?}", e))? as i16;
        Ok(raw as f32 / 256.0)
    }

    fn read_f32_le(&mut self) -> Result<f32, String> {
        let bytes = self
            .read_bytes(4)
            .map_err(|e| format!("Failed to read f32: {:?}", e))?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(f32::from_le_bytes(buf))
    }

    fn read_f64_swapped(&mut self) -> Result<f64, String> {
        let bytes = self
            .read_bytes(8)
            .map_err(|e| format!("Failed to read f64: {:?}", e))?;
        let mut buf = [0u8; 8];
        buf[..4].copy_from_slice(&bytes[4..8]);
        buf[4..].copy_from_slice(&bytes[0..4]);
        Ok(f64::from_le_bytes(buf))
    }
}
