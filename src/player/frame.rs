use std::sync::Arc;

use crate::swf::avm1::ActionRecord;
use crate::swf::place::PlacementRecord;
use crate::swf::tags::Tag;
use crate::swf::types::Rgb;

/// One display-list mutation from a frame's blueprint.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOp {
    Place(PlacementRecord),
    Remove(u16),
    StartSound(u16),
}

/// Everything one frame carries: the blueprint applied when the
/// playhead first reaches it, and the scripts that run afterwards.
/// Shared immutably between clip instances of the same definition;
/// per-instance progress lives on the clip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub label: Option<String>,
    pub ops: Arc<Vec<FrameOp>>,
    pub scripts: Vec<Arc<Vec<ActionRecord>>>,
    /// (sprite id, actions); run once globally before frame scripts.
    pub init_scripts: Vec<(u16, Arc<Vec<ActionRecord>>)>,
    pub background: Option<Rgb>,
}

/// Accumulates control tags until the frame-end marker seals them.
#[derive(Default)]
pub struct FrameBuilder {
    label: Option<String>,
    ops: Vec<FrameOp>,
    scripts: Vec<Arc<Vec<ActionRecord>>>,
    init_scripts: Vec<(u16, Arc<Vec<ActionRecord>>)>,
    background: Option<Rgb>,
}

impl FrameBuilder {
    pub fn new() -> FrameBuilder {
        FrameBuilder::default()
    }

    /// Folds a control tag into the frame under construction.
    /// Definition and structural tags are the caller's business.
    pub fn add(&mut self, tag: Tag) {
        match tag {
            Tag::Place(record) => self.ops.push(FrameOp::Place(record)),
            Tag::Remove(record) => self.ops.push(FrameOp::Remove(record.depth)),
            Tag::StartSound { sound_id } => self.ops.push(FrameOp::StartSound(sound_id)),
            Tag::DoAction(actions) => self.scripts.push(actions),
            Tag::DoInitAction { sprite_id, actions } => {
                self.init_scripts.push((sprite_id, actions))
            }
            Tag::FrameLabel(label) => self.label = Some(label),
            Tag::SetBackgroundColor(color) => self.background = Some(color),
            _ => {}
        }
    }

    pub fn finish(&mut self) -> Frame {
        Frame {
            label: self.label.take(),
            ops: Arc::new(std::mem::take(&mut self.ops)),
            scripts: std::mem::take(&mut self.scripts),
            init_scripts: std::mem::take(&mut self.init_scripts),
            background: self.background.take(),
        }
    }
}

/// Splits a sprite's control tags into sealed frames. A trailing run of
/// tags without a frame-end marker still forms a final frame.
pub fn frames_from_tags(tags: Vec<Tag>) -> Vec<Frame> {
    let mut builder = FrameBuilder::new();
    let mut frames = Vec::new();
    let mut pending = false;
    for tag in tags {
        match tag {
            Tag::ShowFrame => {
                frames.push(builder.finish());
                pending = false;
            }
            tag => {
                builder.add(tag);
                pending = true;
            }
        }
    }
    if pending {
        frames.push(builder.finish());
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swf::place::RemoveRecord;

    #[test]
    fn test_frames_from_tags() {
        let tags = vec![
            Tag::Place(PlacementRecord {
                depth: 1,
                character_id: Some(3),
                ..Default::default()
            }),
            Tag::FrameLabel("start".to_string()),
            Tag::ShowFrame,
            Tag::Remove(RemoveRecord { depth: 1 }),
            Tag::ShowFrame,
        ];
        let frames = frames_from_tags(tags);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].label.as_deref(), Some("start"));
        assert_eq!(frames[0].ops.len(), 1);
        assert_eq!(frames[1].ops[0], FrameOp::Remove(1));
        assert!(frames[1].label.is_none());
    }

    #[test]
    fn test_trailing_tags_form_final_frame() {
        let tags = vec![
            Tag::ShowFrame,
            Tag::Place(PlacementRecord {
                depth: 2,
                character_id: Some(1),
                ..Default::default()
            }),
        ];
        let frames = frames_from_tags(tags);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].ops.len(), 1);
    }
}
