use fxhash::FxHashMap;

use crate::player::movie_clip::MovieClip;
use crate::player::value::Avm1Value;
use crate::player::DisplayObjectId;
use crate::swf::types::{ColorTransform, Matrix};

/// What sits behind a display object. Opaque assets only carry their
/// transform; timelines carry a full clip.
pub enum DisplayObjectKind {
    Graphic,
    Clip(MovieClip),
}

/// One object on some timeline's display list.
pub struct DisplayObject {
    pub parent: Option<DisplayObjectId>,
    pub character_id: Option<u16>,
    pub name: Option<String>,
    pub depth: u16,
    pub clip_depth: Option<u16>,
    pub matrix: Matrix,
    pub color_transform: ColorTransform,
    pub ratio: u16,
    /// Placed by a frame blueprint rather than by script; only these
    /// are subject to seek bookkeeping.
    pub placed_by_timeline: bool,
    /// Transient mark used while replaying frames during an explicit
    /// seek; survivors get unmarked, the rest are erased.
    pub seek_marked: bool,
    pub visible: bool,
    /// Script variables scoped to this timeline.
    pub variables: FxHashMap<String, Avm1Value>,
    pub kind: DisplayObjectKind,
}

impl DisplayObject {
    pub fn new_graphic(character_id: u16, depth: u16) -> DisplayObject {
        DisplayObject {
            parent: None,
            character_id: Some(character_id),
            name: None,
            depth,
            clip_depth: None,
            matrix: Matrix::default(),
            color_transform: ColorTransform::default(),
            ratio: 0,
            placed_by_timeline: false,
            seek_marked: false,
            visible: true,
            variables: FxHashMap::default(),
            kind: DisplayObjectKind::Graphic,
        }
    }

    pub fn new_clip(character_id: Option<u16>, depth: u16, clip: MovieClip) -> DisplayObject {
        DisplayObject {
            parent: None,
            character_id,
            name: None,
            depth,
            clip_depth: None,
            matrix: Matrix::default(),
            color_transform: ColorTransform::default(),
            ratio: 0,
            placed_by_timeline: false,
            seek_marked: false,
            visible: true,
            variables: FxHashMap::default(),
            kind: DisplayObjectKind::Clip(clip),
        }
    }

    pub fn as_clip(&self) -> Option<&MovieClip> {
        match &self.kind {
            DisplayObjectKind::Clip(clip) => Some(clip),
            DisplayObjectKind::Graphic => None,
        }
    }

    pub fn as_clip_mut(&mut self) -> Option<&mut MovieClip> {
        match &mut self.kind {
            DisplayObjectKind::Clip(clip) => Some(clip),
            DisplayObjectKind::Graphic => None,
        }
    }

    pub fn is_clip(&self) -> bool {
        matches!(self.kind, DisplayObjectKind::Clip(_))
    }
}
