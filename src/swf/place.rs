use binary_reader::{BinaryReader, Endian};

use crate::io::{SwfBitReader, SwfRead};
use crate::swf::types::{ColorTransform, Matrix};

/// One place record from the tag stream, normalized across the three
/// encodings. Optional fields stay `None` when the record leaves the
/// existing value untouched (a modify without that flag).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlacementRecord {
    pub depth: u16,
    /// Modify the object already at `depth` instead of placing a new one.
    pub modify: bool,
    pub character_id: Option<u16>,
    pub matrix: Option<Matrix>,
    pub color_transform: Option<ColorTransform>,
    pub ratio: Option<u16>,
    pub name: Option<String>,
    pub clip_depth: Option<u16>,
}

impl PlacementRecord {
    /// Legacy encoding: id and depth are mandatory, matrix always
    /// present, color transform fills whatever payload remains.
    pub fn read_v1(payload: &[u8]) -> Result<PlacementRecord, String> {
        let mut r = BinaryReader::from_u8(payload);
        r.set_endian(Endian::Little);
        let character_id = r
            .read_u16()
            .map_err(|e| format!("Failed to read place id: {:?}", e))?;
        let depth = r
            .read_u16()
            .map_err(|e| format!("Failed to read place depth: {:?}", e))?;
        let mut bits = SwfBitReader::new(&payload[r.pos..]);
        let matrix = Matrix::read(&mut bits);
        let after_matrix = r.pos + bits.position();
        let color_transform = if after_matrix < payload.len() {
            let mut bits = SwfBitReader::new(&payload[after_matrix..]);
            Some(ColorTransform::read(&mut bits, false))
        } else {
            None
        };
        Ok(PlacementRecord {
            depth,
            modify: false,
            character_id: Some(character_id),
            matrix: Some(matrix),
            color_transform,
            ratio: None,
            name: None,
            clip_depth: None,
        })
    }

    /// Flag-driven encoding shared by the second and third forms. The
    /// third form's extra flag byte gates fields this runtime does not
    /// track (filters, blend modes); they are skipped, not kept.
    pub fn read_v2(payload: &[u8], extended: bool) -> Result<PlacementRecord, String> {
        let mut r = BinaryReader::from_u8(payload);
        r.set_endian(Endian::Little);
        let flags = r
            .read_u8()
            .map_err(|e| format!("Failed to read place flags: {:?}", e))?;
        let flags2 = if extended {
            r.read_u8()
                .map_err(|e| format!("Failed to read place flags2: {:?}", e))?
        } else {
            0
        };
        let depth = r
            .read_u16()
            .map_err(|e| format!("Failed to read place depth: {:?}", e))?;

        if extended && flags2 & 0x08 != 0 {
            // class name, unused here
            r.read_string_z()?;
        }

        let mut record = PlacementRecord {
            depth,
            modify: flags & 0x01 != 0,
            ..Default::default()
        };
        if flags & 0x02 != 0 {
            record.character_id = Some(
                r.read_u16()
                    .map_err(|e| format!("Failed to read place id: {:?}", e))?,
            );
        }
        if flags & 0x04 != 0 {
            let mut bits = SwfBitReader::new(&payload[r.pos..]);
            record.matrix = Some(Matrix::read(&mut bits));
            let next = r.pos + bits.position();
            r.jmp(next);
        }
        if flags & 0x08 != 0 {
            let mut bits = SwfBitReader::new(&payload[r.pos..]);
            record.color_transform = Some(ColorTransform::read(&mut bits, true));
            let next = r.pos + bits.position();
            r.jmp(next);
        }
        if flags & 0x10 != 0 {
            record.ratio = Some(
                r.read_u16()
                    .map_err(|e| format!("Failed to read place ratio: {:?}", e))?,
            );
        }
        if flags & 0x20 != 0 {
            record.name = Some(r.read_string_z()?);
        }
        if flags & 0x40 != 0 {
            record.clip_depth = Some(
                r.read_u16()
                    .map_err(|e| format!("Failed to read clip depth: {:?}", e))?,
            );
        }
        // flags & 0x80 (clip actions) and the remaining extended fields
        // sit past everything this runtime reads; per-tag isolation
        // discards them.
        Ok(record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveRecord {
    pub depth: u16,
}

impl RemoveRecord {
    /// `with_id` distinguishes the legacy form, which prefixes the depth
    /// with the character id being removed.
    pub fn read(payload: &[u8], with_id: bool) -> Result<RemoveRecord, String> {
        let mut r = BinaryReader::from_u8(payload);
        r.set_endian(Endian::Little);
        if with_id {
            r.read_u16()
                .map_err(|e| format!("Failed to read remove id: {:?}", e))?;
        }
        let depth = r
            .read_u16()
            .map_err(|e| format!("Failed to read remove depth: {:?}", e))?;
        Ok(RemoveRecord { depth })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_v2_place_new() {
        // flags: has id | has name; depth 3, id 7, name "box"
        let payload = [0x22, 0x03, 0x00, 0x07, 0x00, b'b', b'o', b'x', 0x00];
        let record = PlacementRecord::read_v2(&payload, false).unwrap();
        assert!(!record.modify);
        assert_eq!(record.depth, 3);
        assert_eq!(record.character_id, Some(7));
        assert_eq!(record.name.as_deref(), Some("box"));
        assert_eq!(record.matrix, None);
    }

    #[test]
    fn test_read_v2_modify_ratio() {
        // flags: modify | has ratio; depth 1, ratio 100
        let payload = [0x11, 0x01, 0x00, 0x64, 0x00];
        let record = PlacementRecord::read_v2(&payload, false).unwrap();
        assert!(record.modify);
        assert_eq!(record.ratio, Some(100));
        assert_eq!(record.character_id, None);
    }

    #[test]
    fn test_read_v2_clip_depth() {
        // flags: has id | has clip depth; depth 2, id 5, clip depth 9
        let payload = [0x42, 0x02, 0x00, 0x05, 0x00, 0x09, 0x00];
        let record = PlacementRecord::read_v2(&payload, false).unwrap();
        assert_eq!(record.clip_depth, Some(9));
    }

    #[test]
    fn test_read_remove() {
        let record = RemoveRecord::read(&[0x07, 0x00, 0x04, 0x00], true).unwrap();
        assert_eq!(record.depth, 4);
        let record = RemoveRecord::read(&[0x04, 0x00], false).unwrap();
        assert_eq!(record.depth, 4);
    }
}
