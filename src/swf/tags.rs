use binary_reader::{BinaryReader, Endian};
use log::debug;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::sync::Arc;

use crate::io::SwfRead;
use crate::swf::avm1::{decode_actions, ActionRecord};
use crate::swf::place::{PlacementRecord, RemoveRecord};
use crate::swf::types::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum TagCode {
    End = 0,
    ShowFrame = 1,
    DefineShape = 2,
    PlaceObject = 4,
    RemoveObject = 5,
    DefineBits = 6,
    DefineButton = 7,
    JpegTables = 8,
    SetBackgroundColor = 9,
    DefineFont = 10,
    DefineText = 11,
    DoAction = 12,
    DefineFontInfo = 13,
    DefineSound = 14,
    StartSound = 15,
    DefineButtonSound = 17,
    SoundStreamHead = 18,
    SoundStreamBlock = 19,
    DefineBitsLossless = 20,
    DefineBitsJpeg2 = 21,
    DefineShape2 = 22,
    Protect = 24,
    PlaceObject2 = 26,
    RemoveObject2 = 28,
    DefineShape3 = 32,
    DefineText2 = 33,
    DefineButton2 = 34,
    DefineBitsJpeg3 = 35,
    DefineBitsLossless2 = 36,
    DefineEditText = 37,
    DefineSprite = 39,
    FrameLabel = 43,
    SoundStreamHead2 = 45,
    DefineMorphShape = 46,
    DefineFont2 = 48,
    ExportAssets = 56,
    DoInitAction = 59,
    DefineVideoStream = 60,
    VideoFrame = 61,
    FileAttributes = 69,
    PlaceObject3 = 70,
    DefineFontAlignZones = 73,
    DefineCsmTextSettings = 74,
    DefineFont3 = 75,
    DefineScalingGrid = 78,
    DefineShape4 = 83,
    DefineMorphShape2 = 84,
    DefineSceneAndFrameLabelData = 86,
    DefineBinaryData = 87,
    DefineFontName = 88,
}

impl TagCode {
    /// Character definitions whose payload starts with the dictionary id.
    /// The runtime keeps them opaque; only the id matters for placement.
    pub fn is_definition(self) -> bool {
        matches!(
            self,
            TagCode::DefineShape
                | TagCode::DefineShape2
                | TagCode::DefineShape3
                | TagCode::DefineShape4
                | TagCode::DefineBits
                | TagCode::DefineBitsJpeg2
                | TagCode::DefineBitsJpeg3
                | TagCode::DefineBitsLossless
                | TagCode::DefineBitsLossless2
                | TagCode::DefineButton
                | TagCode::DefineButton2
                | TagCode::DefineFont
                | TagCode::DefineFont2
                | TagCode::DefineFont3
                | TagCode::DefineText
                | TagCode::DefineText2
                | TagCode::DefineEditText
                | TagCode::DefineSound
                | TagCode::DefineMorphShape
                | TagCode::DefineMorphShape2
                | TagCode::DefineVideoStream
                | TagCode::DefineBinaryData
        )
    }
}

/// A nested timeline definition. Its tag list is restricted to control
/// tags; definitions always live at top level.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDefinition {
    pub id: u16,
    pub frame_count: u16,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneAndLabelData {
    /// (first global frame, scene name), in file order.
    pub scenes: Vec<(u32, String)>,
    /// (global frame, label), in file order.
    pub frame_labels: Vec<(u32, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    ShowFrame,
    SetBackgroundColor(Rgb),
    Place(PlacementRecord),
    Remove(RemoveRecord),
    DoAction(Arc<Vec<ActionRecord>>),
    DoInitAction {
        sprite_id: u16,
        actions: Arc<Vec<ActionRecord>>,
    },
    FrameLabel(String),
    SceneData(SceneAndLabelData),
    DefineSprite(SpriteDefinition),
    DefineCharacter {
        id: u16,
        code: TagCode,
    },
    StartSound {
        sound_id: u16,
    },
    End,
}

/// Walks a tag stream, yielding raw (code, payload) pairs. Each payload
/// is the exact span the header declares; parsing a tag can never read
/// into its neighbor.
pub struct TagStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TagStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        TagStream { data, pos: 0 }
    }

    pub fn next_tag(&mut self) -> Result<Option<(u16, &'a [u8])>, String> {
        if self.pos + 2 > self.data.len() {
            return Ok(None);
        }
        let raw = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        let code = raw >> 6;
        let mut len = (raw & 0x3F) as usize;
        if len == 0x3F {
            if self.pos + 4 > self.data.len() {
                return Err("Truncated long tag header".to_string());
            }
            len = u32::from_le_bytes([
                self.data[self.pos],
                self.data[self.pos + 1],
                self.data[self.pos + 2],
                self.data[self.pos + 3],
            ]) as usize;
            self.pos += 4;
        }
        if self.pos + len > self.data.len() {
            return Err(format!(
                "Tag {} payload of {} bytes runs past end of stream",
                code, len
            ));
        }
        let payload = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(Some((code, payload)))
    }
}

/// Parses one raw tag. Returns `None` for tags the runtime ignores
/// (metadata, asset internals it keeps opaque elsewhere, stream sound
/// blocks).
pub fn parse_tag(code: u16, payload: &[u8]) -> Result<Option<Tag>, String> {
    let code = match TagCode::from_u16(code) {
        Some(c) => c,
        None => {
            debug!("Skipping unknown tag code {}", code);
            return Ok(None);
        }
    };

    if code.is_definition() {
        if payload.len() < 2 {
            return Err(format!("Definition tag {:?} shorter than its id", code));
        }
        let id = u16::from_le_bytes([payload[0], payload[1]]);
        return Ok(Some(Tag::DefineCharacter { id, code }));
    }

    let tag = match code {
        TagCode::End => Tag::End,
        TagCode::ShowFrame => Tag::ShowFrame,
        TagCode::SetBackgroundColor => {
            if payload.len() < 3 {
                return Err("Background color tag too short".to_string());
            }
            Tag::SetBackgroundColor(Rgb {
                r: payload[0],
                g: payload[1],
                b: payload[2],
            })
        }
        TagCode::PlaceObject => Tag::Place(PlacementRecord::read_v1(payload)?),
        TagCode::PlaceObject2 => Tag::Place(PlacementRecord::read_v2(payload, false)?),
        TagCode::PlaceObject3 => Tag::Place(PlacementRecord::read_v2(payload, true)?),
        TagCode::RemoveObject => Tag::Remove(RemoveRecord::read(payload, true)?),
        TagCode::RemoveObject2 => Tag::Remove(RemoveRecord::read(payload, false)?),
        TagCode::DoAction => Tag::DoAction(Arc::new(decode_actions(payload))),
        TagCode::DoInitAction => {
            if payload.len() < 2 {
                return Err("Init action tag shorter than its sprite id".to_string());
            }
            let sprite_id = u16::from_le_bytes([payload[0], payload[1]]);
            Tag::DoInitAction {
                sprite_id,
                actions: Arc::new(decode_actions(&payload[2..])),
            }
        }
        TagCode::FrameLabel => {
            let mut r = BinaryReader::from_u8(payload);
            r.set_endian(Endian::Little);
            Tag::FrameLabel(r.read_string_z()?)
        }
        TagCode::DefineSceneAndFrameLabelData => Tag::SceneData(read_scene_data(payload)?),
        TagCode::DefineSprite => Tag::DefineSprite(read_sprite(payload)?),
        TagCode::StartSound => {
            if payload.len() < 2 {
                return Err("Start sound tag shorter than its id".to_string());
            }
            Tag::StartSound {
                sound_id: u16::from_le_bytes([payload[0], payload[1]]),
            }
        }
        _ => {
            debug!("Ignoring tag {:?}", code);
            return Ok(None);
        }
    };
    Ok(Some(tag))
}

fn read_sprite(payload: &[u8]) -> Result<SpriteDefinition, String> {
    if payload.len() < 4 {
        return Err("Sprite definition header too short".to_string());
    }
    let id = u16::from_le_bytes([payload[0], payload[1]]);
    let frame_count = u16::from_le_bytes([payload[2], payload[3]]);
    let mut stream = TagStream::new(&payload[4..]);
    let mut tags = Vec::new();
    while let Some((code, body)) = stream.next_tag()? {
        match parse_tag(code, body)? {
            Some(Tag::End) => break,
            Some(Tag::DefineSprite(_)) | Some(Tag::DefineCharacter { .. }) => {
                return Err(format!(
                    "Definition tag nested inside sprite {} timeline",
                    id
                ));
            }
            Some(tag) => tags.push(tag),
            None => {}
        }
    }
    Ok(SpriteDefinition {
        id,
        frame_count,
        tags,
    })
}

fn read_scene_data(payload: &[u8]) -> Result<SceneAndLabelData, String> {
    let mut r = BinaryReader::from_u8(payload);
    r.set_endian(Endian::Little);
    let scene_count = read_encoded_u32(&mut r)?;
    let mut scenes = Vec::with_capacity(scene_count as usize);
    for _ in 0..scene_count {
        let offset = read_encoded_u32(&mut r)?;
        let name = r.read_string_z()?;
        scenes.push((offset, name));
    }
    let label_count = read_encoded_u32(&mut r)?;
    let mut frame_labels = Vec::with_capacity(label_count as usize);
    for _ in 0..label_count {
        let frame = read_encoded_u32(&mut r)?;
        let label = r.read_string_z()?;
        frame_labels.push((frame, label));
    }
    Ok(SceneAndLabelData {
        scenes,
        frame_labels,
    })
}

/// LEB128-style varint used only by the scene data tag.
fn read_encoded_u32(r: &mut BinaryReader) -> Result<u32, String> {
    let mut result: u32 = 0;
    let mut shift = 0;
    loop {
        let byte = r
            .read_u8()
            .map_err(|e| format!("Failed to read encoded u32: {:?}", e))?;
        result |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 35 {
            return Err("Encoded u32 longer than 5 bytes".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swf::avm1::Action;

    fn short_tag(code: u16, payload: &[u8]) -> Vec<u8> {
        assert!(payload.len() < 0x3F);
        let raw = (code << 6) | payload.len() as u16;
        let mut out = raw.to_le_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_stream_short_and_long_headers() {
        let mut data = short_tag(1, &[]);
        // long form: declared length 0x3F, explicit u32 length of 2
        let raw: u16 = (9 << 6) | 0x3F;
        data.extend_from_slice(&raw.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0x10, 0x20]);

        let mut stream = TagStream::new(&data);
        let (code, payload) = stream.next_tag().unwrap().unwrap();
        assert_eq!(code, 1);
        assert!(payload.is_empty());
        let (code, payload) = stream.next_tag().unwrap().unwrap();
        assert_eq!(code, 9);
        assert_eq!(payload, &[0x10, 0x20]);
        assert!(stream.next_tag().unwrap().is_none());
    }

    #[test]
    fn test_stream_truncated_payload() {
        let data = [0x44, 0x00]; // ShowFrame declaring 4 payload bytes it lacks
        let mut stream = TagStream::new(&data);
        assert!(stream.next_tag().is_err());
    }

    #[test]
    fn test_parse_do_action() {
        let tag = parse_tag(12, &[0x07, 0x00]).unwrap().unwrap();
        match tag {
            Tag::DoAction(actions) => {
                assert_eq!(actions.len(), 1);
                assert_eq!(actions[0].action, Action::Stop);
            }
            other => panic!("expected DoAction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_definition_is_opaque() {
        let tag = parse_tag(2, &[0x05, 0x00, 0xDE, 0xAD]).unwrap().unwrap();
        assert_eq!(
            tag,
            Tag::DefineCharacter {
                id: 5,
                code: TagCode::DefineShape
            }
        );
    }

    #[test]
    fn test_parse_unknown_tag_skipped() {
        assert_eq!(parse_tag(1023, &[1, 2, 3]).unwrap(), None);
    }

    #[test]
    fn test_parse_sprite_nested_frames() {
        // sprite id 4, 2 frames: [Place, ShowFrame, ShowFrame, End]
        let mut body = vec![0x04, 0x00, 0x02, 0x00];
        body.extend(short_tag(26, &[0x02, 0x01, 0x00, 0x09, 0x00])); // place id 9 at depth 1
        body.extend(short_tag(1, &[]));
        body.extend(short_tag(1, &[]));
        body.extend(short_tag(0, &[]));
        let tag = parse_tag(39, &body).unwrap().unwrap();
        match tag {
            Tag::DefineSprite(sprite) => {
                assert_eq!(sprite.id, 4);
                assert_eq!(sprite.frame_count, 2);
                assert_eq!(sprite.tags.len(), 3);
                assert!(matches!(sprite.tags[0], Tag::Place(_)));
            }
            other => panic!("expected DefineSprite, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_scene_data() {
        // 2 scenes at frames 0 and 10, one label at frame 3
        let payload = [
            0x02, // scene count
            0x00, b'i', b'n', b't', b'r', b'o', 0x00, // scene 0 "intro"
            0x0A, b'm', b'a', b'i', b'n', 0x00, // scene 10 "main"
            0x01, // label count
            0x03, b'g', b'o', 0x00, // frame 3 "go"
        ];
        let tag = parse_tag(86, &payload).unwrap().unwrap();
        match tag {
            Tag::SceneData(data) => {
                assert_eq!(
                    data.scenes,
                    vec![(0, "intro".to_string()), (10, "main".to_string())]
                );
                assert_eq!(data.frame_labels, vec![(3, "go".to_string())]);
            }
            other => panic!("expected SceneData, got {:?}", other),
        }
    }
}
