use std::sync::Arc;

use log::{error, warn};

use crate::player::dictionary::Character;
use crate::player::display_list::DisplayList;
use crate::player::display_object::{DisplayObject, DisplayObjectKind};
use crate::player::frame::{Frame, FrameOp};
use crate::player::loader::FrameStream;
use crate::player::value::Avm1Value;
use crate::player::{DisplayObjectId, PlayerContext};
use crate::swf::avm1::ActionRecord;
use crate::swf::place::PlacementRecord;
use crate::swf::tags::SceneAndLabelData;
use crate::utils::name_eq;

/// Playhead state. `fp` is the current frame, 0-based. An explicit
/// seek sets `explicit_fp` so the next natural advance is swallowed
/// instead of moving the playhead again.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub fp: u32,
    pub stopped: bool,
    pub explicit_fp: bool,
    pub last_fp: Option<u32>,
}

/// A named span of frames. Labels are kept sorted by frame; a label
/// name already present in the scene is ignored, first one wins.
#[derive(Debug, Clone)]
pub struct Scene {
    pub start: u32,
    pub name: String,
    pub labels: Vec<(u32, String)>,
}

impl Scene {
    pub fn new(start: u32, name: String) -> Scene {
        Scene {
            start,
            name,
            labels: Vec::new(),
        }
    }

    pub fn add_label(&mut self, frame: u32, label: String, case_sensitive: bool) {
        if self
            .labels
            .iter()
            .any(|(_, existing)| name_eq(existing, &label, case_sensitive))
        {
            warn!("Duplicate frame label '{}' ignored", label);
            return;
        }
        let pos = self
            .labels
            .iter()
            .position(|(f, _)| *f > frame)
            .unwrap_or(self.labels.len());
        self.labels.insert(pos, (frame, label));
    }

    pub fn find_label(&self, label: &str, case_sensitive: bool) -> Option<u32> {
        self.labels
            .iter()
            .find(|(_, existing)| name_eq(existing, label, case_sensitive))
            .map(|(frame, _)| *frame)
    }
}

/// A timeline instance. Frames are a per-instance cache of the shared
/// definition (cheap clones, the heavy parts are behind `Arc`); the
/// root additionally pulls newly sealed frames from the parser thread.
pub struct MovieClip {
    pub frames: Vec<Frame>,
    /// Blueprint progress per frame, reset whenever the playhead seeks.
    pub constructed: Vec<bool>,
    pub total_frames: u16,
    pub stream: Option<Arc<FrameStream>>,
    pub state: RunState,
    pub scenes: Vec<Scene>,
    pub last_frame_script_executed: Option<u32>,
    pub display_list: DisplayList,
}

impl MovieClip {
    pub fn new_root(stream: Arc<FrameStream>, total_frames: u16) -> MovieClip {
        MovieClip {
            frames: Vec::new(),
            constructed: Vec::new(),
            total_frames,
            stream: Some(stream),
            state: RunState::default(),
            scenes: vec![Scene::new(0, "Scene 1".to_string())],
            last_frame_script_executed: None,
            display_list: DisplayList::new(),
        }
    }

    pub fn from_definition(
        frames: &Arc<Vec<Frame>>,
        frame_count: u16,
        case_sensitive: bool,
    ) -> MovieClip {
        let frames: Vec<Frame> = frames.as_ref().clone();
        let mut clip = MovieClip {
            constructed: vec![false; frames.len()],
            total_frames: frame_count,
            frames,
            stream: None,
            state: RunState::default(),
            scenes: vec![Scene::new(0, "Scene 1".to_string())],
            last_frame_script_executed: None,
            display_list: DisplayList::new(),
        };
        for index in 0..clip.frames.len() {
            if let Some(label) = clip.frames[index].label.clone() {
                clip.register_label(index as u32, label, case_sensitive);
            }
        }
        clip
    }

    pub fn frames_loaded(&self) -> usize {
        self.frames.len()
    }

    /// Declared frame count, or the loaded count when the declaration
    /// undershoots what the file actually contains.
    pub fn frames_total(&self) -> usize {
        (self.total_frames as usize).max(self.frames.len())
    }

    pub fn fully_loaded(&self) -> bool {
        match &self.stream {
            Some(stream) => stream.is_complete(),
            None => true,
        }
    }

    fn scene_index_for_frame(&self, frame: u32) -> usize {
        let mut index = 0;
        for (i, scene) in self.scenes.iter().enumerate() {
            if scene.start <= frame {
                index = i;
            } else {
                break;
            }
        }
        index
    }

    pub fn scene_for_frame(&self, frame: u32) -> &Scene {
        &self.scenes[self.scene_index_for_frame(frame)]
    }

    pub fn register_label(&mut self, frame: u32, label: String, case_sensitive: bool) {
        let index = self.scene_index_for_frame(frame);
        self.scenes[index].add_label(frame, label, case_sensitive);
    }

    /// Label lookup across every scene. Returns a global frame.
    pub fn frame_for_label(&self, label: &str, case_sensitive: bool) -> Option<u32> {
        self.scenes
            .iter()
            .find_map(|scene| scene.find_label(label, case_sensitive))
    }

    /// Replaces the default scene layout with authored scene data, then
    /// re-registers every known label into its owning scene.
    pub fn apply_scene_data(&mut self, data: SceneAndLabelData, case_sensitive: bool) {
        if !data.scenes.is_empty() {
            self.scenes = data
                .scenes
                .into_iter()
                .map(|(start, name)| Scene::new(start, name))
                .collect();
        }
        for (frame, label) in data.frame_labels {
            self.register_label(frame, label, case_sensitive);
        }
        for index in 0..self.frames.len() {
            if let Some(label) = self.frames[index].label.clone() {
                self.register_label(index as u32, label, case_sensitive);
            }
        }
    }
}

/// Pulls newly sealed frames, characters and scene data from the parser
/// thread into the root clip. Cheap when nothing new arrived.
pub fn sync_root_stream(ctx: &mut PlayerContext, id: DisplayObjectId) {
    let (stream, cached) = match ctx.get_clip(id) {
        Some(clip) => match &clip.stream {
            Some(stream) => (Arc::clone(stream), clip.frames.len()),
            None => return,
        },
        None => return,
    };
    ctx.dictionary.absorb(stream.take_dictionary());
    let scene_data = stream.take_scene_data();
    let new_frames = if stream.frames_loaded() > cached {
        stream.frames_since(cached)
    } else {
        Vec::new()
    };
    if let Some(error) = stream.take_error() {
        error!("Load error: {}", error);
    }
    let case_sensitive = ctx.case_sensitive();
    if let Some(clip) = ctx.get_clip_mut(id) {
        if let Some(data) = scene_data {
            clip.apply_scene_data(data, case_sensitive);
        }
        for frame in new_frames {
            let index = clip.frames.len() as u32;
            if let Some(label) = frame.label.clone() {
                clip.register_label(index, label, case_sensitive);
            }
            clip.frames.push(frame);
            clip.constructed.push(false);
        }
    }
}

/// Builds a detached display object for a character id. `None` when the
/// id is not (yet) in the dictionary.
pub fn instantiate_character(
    ctx: &mut PlayerContext,
    character_id: u16,
    depth: u16,
) -> Option<DisplayObjectId> {
    let case_sensitive = ctx.case_sensitive();
    let object = match ctx.dictionary.get(character_id) {
        Some(Character::Graphic { .. }) => DisplayObject::new_graphic(character_id, depth),
        Some(Character::Sprite {
            frame_count,
            frames,
        }) => {
            let clip = MovieClip::from_definition(frames, *frame_count, case_sensitive);
            DisplayObject::new_clip(Some(character_id), depth, clip)
        }
        None => {
            warn!("Placement references unknown character {}", character_id);
            return None;
        }
    };
    Some(ctx.display_objects.alloc(object))
}

/// Detaches a subtree and queues every handle in it for release at the
/// end of the tick.
pub fn release_subtree(ctx: &mut PlayerContext, id: DisplayObjectId) {
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        ctx.pending_release.push(current);
        if let Some(clip) = ctx.get_clip(current) {
            stack.extend(clip.display_list.ids());
        }
    }
}

pub fn drain_pending_release(ctx: &mut PlayerContext) {
    let pending = std::mem::take(&mut ctx.pending_release);
    for id in pending {
        ctx.display_objects.remove(id);
    }
}

/// Applies one place record to a timeline. `replay` marks the seek
/// rebuild path, where an object of the same character already at the
/// depth is kept and updated instead of recreated.
pub fn apply_place(
    ctx: &mut PlayerContext,
    owner: DisplayObjectId,
    record: &PlacementRecord,
    replay: bool,
) {
    let existing = match ctx.get_clip(owner) {
        Some(clip) => clip.display_list.get(record.depth),
        None => return,
    };

    let reuse = match existing {
        Some(existing_id) => {
            if record.modify {
                true
            } else if replay && record.character_id.is_some() {
                let same = ctx
                    .display_objects
                    .get(existing_id)
                    .map(|obj| obj.character_id == record.character_id)
                    .unwrap_or(false);
                same
            } else {
                false
            }
        }
        None => false,
    };

    if reuse {
        let existing_id = match existing {
            Some(id) => id,
            None => return,
        };
        let mut ratio_rewind = None;
        if let Some(object) = ctx.display_objects.get_mut(existing_id) {
            object.seek_marked = false;
            if let Some(matrix) = record.matrix {
                object.matrix = matrix;
            }
            if let Some(xform) = record.color_transform {
                object.color_transform = xform;
            }
            if let Some(name) = &record.name {
                object.name = Some(name.clone());
            }
            if let Some(clip_depth) = record.clip_depth {
                object.clip_depth = Some(clip_depth);
            }
            if let Some(ratio) = record.ratio {
                if ratio != object.ratio && ratio != 0 && object.is_clip() {
                    ratio_rewind = Some(existing_id);
                }
                object.ratio = ratio;
            }
        }
        // a ratio change on a clip restarts its timeline
        if let Some(child) = ratio_rewind {
            reset_clip(ctx, child);
        }
        return;
    }

    if record.modify {
        warn!("Modify record at empty depth {}", record.depth);
        return;
    }
    // a non-move record may displace a different character at the
    // depth, never overwrite the same one
    if let Some(existing_id) = existing {
        let same_character = ctx
            .display_objects
            .get(existing_id)
            .map(|obj| obj.character_id.is_some() && obj.character_id == record.character_id)
            .unwrap_or(false);
        if same_character {
            error!(
                "Placement overwrites depth {} without the move flag, keeping occupant",
                record.depth
            );
            return;
        }
    }
    let character_id = match record.character_id {
        Some(id) => id,
        None => {
            warn!("Place record at depth {} names no character", record.depth);
            return;
        }
    };
    let child = match instantiate_character(ctx, character_id, record.depth) {
        Some(child) => child,
        None => return,
    };
    if let Some(object) = ctx.display_objects.get_mut(child) {
        object.parent = Some(owner);
        object.placed_by_timeline = true;
        if let Some(matrix) = record.matrix {
            object.matrix = matrix;
        }
        if let Some(xform) = record.color_transform {
            object.color_transform = xform;
        }
        object.name = record.name.clone();
        object.clip_depth = record.clip_depth;
        object.ratio = record.ratio.unwrap_or(0);
    }
    let displaced = ctx
        .get_clip_mut(owner)
        .and_then(|clip| clip.display_list.place(record.depth, child));
    if let Some(displaced) = displaced {
        release_subtree(ctx, displaced);
    }
    // a freshly placed nested timeline shows its first frame right away
    if ctx.get_clip(child).is_some() {
        construct_frame(ctx, child, 0, false);
    }
}

pub fn apply_remove(ctx: &mut PlayerContext, owner: DisplayObjectId, depth: u16) {
    let removed = ctx
        .get_clip_mut(owner)
        .and_then(|clip| clip.display_list.remove(depth));
    match removed {
        Some(id) => release_subtree(ctx, id),
        None => warn!("Remove record at empty depth {}", depth),
    }
}

/// Runs a frame's blueprint exactly once per construction epoch.
pub fn construct_frame(
    ctx: &mut PlayerContext,
    id: DisplayObjectId,
    index: usize,
    replay: bool,
) {
    let ops = match ctx.get_clip_mut(id) {
        Some(clip) => {
            if index >= clip.frames.len() || clip.constructed[index] {
                return;
            }
            clip.constructed[index] = true;
            clip.frames[index].ops.clone()
        }
        None => return,
    };
    if let Some(background) = ctx
        .get_clip(id)
        .and_then(|clip| clip.frames[index].background)
    {
        ctx.background_color = Some(background);
    }
    for op in ops.iter() {
        match op {
            FrameOp::Place(record) => apply_place(ctx, id, record, replay),
            FrameOp::Remove(depth) => apply_remove(ctx, id, *depth),
            FrameOp::StartSound(sound_id) => ctx.sound_requests.push(*sound_id),
        }
    }
}

/// Moves the playhead for one tick. An explicit seek this tick already
/// positioned it, so the natural advance is consumed instead. A clip
/// that has never declared a frame stays on frame 0 so its first frame
/// is presented before any advance.
pub fn advance_frame(ctx: &mut PlayerContext, id: DisplayObjectId) {
    let (fp, stopped, explicit, entered, loaded, fully_loaded) = match ctx.get_clip(id) {
        Some(clip) => (
            clip.state.fp,
            clip.state.stopped,
            clip.state.explicit_fp,
            clip.state.last_fp.is_some(),
            clip.frames_loaded() as u32,
            clip.fully_loaded(),
        ),
        None => return,
    };
    if explicit {
        if let Some(clip) = ctx.get_clip_mut(id) {
            clip.state.explicit_fp = false;
        }
        return;
    }
    if !entered || stopped || loaded == 0 {
        return;
    }
    let candidate = fp + 1;
    let next = if candidate < loaded {
        candidate
    } else if fully_loaded {
        0
    } else {
        // hold while the tail is still streaming in
        fp
    };
    if let Some(clip) = ctx.get_clip_mut(id) {
        clip.state.fp = next;
    }
}

/// Brings the display list up to date with the playhead: sequential
/// moves construct the new frames in order, a backward move rebuilds
/// from frame 0.
pub fn declare_frame(ctx: &mut PlayerContext, id: DisplayObjectId) {
    let (fp, last) = match ctx.get_clip(id) {
        Some(clip) => (clip.state.fp, clip.state.last_fp),
        None => return,
    };
    match last {
        Some(last_fp) if fp < last_fp => {
            rebuild_from_start(ctx, id, fp);
        }
        Some(last_fp) if fp == last_fp => {}
        _ => {
            let from = last.map(|l| l + 1).unwrap_or(0);
            for index in from..=fp {
                construct_frame(ctx, id, index as usize, false);
            }
        }
    }
    if let Some(clip) = ctx.get_clip_mut(id) {
        clip.state.last_fp = Some(fp);
    }
}

/// Non-seek rewind (the natural loop): timeline children are dropped
/// outright and frames 0..=dest replayed fresh.
fn rebuild_from_start(ctx: &mut PlayerContext, id: DisplayObjectId, dest: u32) {
    purge_timeline_children(ctx, id);
    if let Some(clip) = ctx.get_clip_mut(id) {
        for flag in clip.constructed.iter_mut() {
            *flag = false;
        }
    }
    for index in 0..=dest {
        construct_frame(ctx, id, index as usize, false);
    }
}

fn purge_timeline_children(ctx: &mut PlayerContext, id: DisplayObjectId) {
    let children = match ctx.get_clip(id) {
        Some(clip) => clip.display_list.children(),
        None => return,
    };
    for (depth, child) in children {
        let timeline_placed = ctx
            .display_objects
            .get(child)
            .map(|obj| obj.placed_by_timeline)
            .unwrap_or(false);
        if timeline_placed {
            if let Some(clip) = ctx.get_clip_mut(id) {
                clip.display_list.remove(depth);
            }
            release_subtree(ctx, child);
        }
    }
}

/// Rewinds a clip to its first frame, dropping what its timeline built.
pub fn reset_clip(ctx: &mut PlayerContext, id: DisplayObjectId) {
    purge_timeline_children(ctx, id);
    if let Some(clip) = ctx.get_clip_mut(id) {
        for flag in clip.constructed.iter_mut() {
            *flag = false;
        }
        clip.state = RunState::default();
        clip.last_frame_script_executed = None;
    }
    construct_frame(ctx, id, 0, false);
    if let Some(clip) = ctx.get_clip_mut(id) {
        clip.state.last_fp = Some(0);
    }
}

/// Frame scripts for the current frame, at most once per visit.
pub fn take_frame_scripts(
    ctx: &mut PlayerContext,
    id: DisplayObjectId,
) -> Vec<Arc<Vec<ActionRecord>>> {
    let clip = match ctx.get_clip_mut(id) {
        Some(clip) => clip,
        None => return Vec::new(),
    };
    let fp = clip.state.fp;
    if clip.last_frame_script_executed == Some(fp) {
        return Vec::new();
    }
    clip.last_frame_script_executed = Some(fp);
    match clip.frames.get(fp as usize) {
        Some(frame) => frame.scripts.clone(),
        None => Vec::new(),
    }
}

/// Init scripts of the current frame that have not run yet. Each sprite
/// id's init actions run once for the whole player lifetime.
pub fn take_init_scripts(
    ctx: &mut PlayerContext,
    id: DisplayObjectId,
) -> Vec<(u16, Arc<Vec<ActionRecord>>)> {
    let fp = match ctx.get_clip(id) {
        Some(clip) => clip.state.fp,
        None => return Vec::new(),
    };
    let candidates = match ctx
        .get_clip(id)
        .and_then(|clip| clip.frames.get(fp as usize))
    {
        Some(frame) => frame.init_scripts.clone(),
        None => return Vec::new(),
    };
    let mut out = Vec::new();
    for (sprite_id, actions) in candidates {
        if ctx.init_actions_run.insert(sprite_id) {
            out.push((sprite_id, actions));
        }
    }
    out
}

/// Explicit seek. Blocks while the target frame is still streaming in;
/// once loading is done a target past the end clamps to the last frame.
pub fn goto_frame(ctx: &mut PlayerContext, id: DisplayObjectId, dest: u32, play: bool) {
    let stream = ctx
        .get_clip(id)
        .and_then(|clip| clip.stream.as_ref().map(Arc::clone));
    if let Some(stream) = stream {
        if (dest as usize) >= stream.frames_loaded() && !stream.is_complete() {
            stream.wait_for_frame(dest as usize);
        }
        sync_root_stream(ctx, id);
    }

    let (fp, loaded) = match ctx.get_clip(id) {
        Some(clip) => (clip.state.fp, clip.frames_loaded() as u32),
        None => return,
    };
    if loaded == 0 {
        return;
    }
    let dest = dest.min(loaded - 1);

    if let Some(clip) = ctx.get_clip_mut(id) {
        clip.state.stopped = !play;
    }
    if dest == fp {
        return;
    }

    // mark, replay, then erase whatever the replay did not reclaim
    let children = match ctx.get_clip(id) {
        Some(clip) => clip.display_list.ids(),
        None => return,
    };
    for child in children {
        if let Some(object) = ctx.display_objects.get_mut(child) {
            if object.placed_by_timeline {
                object.seek_marked = true;
            }
        }
    }
    if let Some(clip) = ctx.get_clip_mut(id) {
        for flag in clip.constructed.iter_mut() {
            *flag = false;
        }
    }
    for index in 0..=dest {
        construct_frame(ctx, id, index as usize, true);
    }
    let survivors = match ctx.get_clip(id) {
        Some(clip) => clip.display_list.children(),
        None => return,
    };
    for (depth, child) in survivors {
        let marked = ctx
            .display_objects
            .get(child)
            .map(|obj| obj.seek_marked)
            .unwrap_or(false);
        if marked {
            if let Some(clip) = ctx.get_clip_mut(id) {
                clip.display_list.remove(depth);
            }
            release_subtree(ctx, child);
        }
    }
    if let Some(clip) = ctx.get_clip_mut(id) {
        clip.state.fp = dest;
        clip.state.explicit_fp = true;
        clip.state.last_fp = Some(dest);
    }
}

/// Resolves a script-visible frame reference to a global 0-based frame.
/// Labels resolve across scenes; numbers are 1-based within the current
/// scene (or the given scene bias); an unresolvable reference logs and
/// lands on frame 0.
pub fn resolve_frame_target(
    ctx: &PlayerContext,
    id: DisplayObjectId,
    target: &Avm1Value,
    scene_bias: Option<u32>,
) -> u32 {
    let clip = match ctx.get_clip(id) {
        Some(clip) => clip,
        None => return 0,
    };
    let case_sensitive = ctx.case_sensitive();
    if let Avm1Value::Str(label) = target {
        if let Some(frame) = clip.frame_for_label(label, case_sensitive) {
            return frame;
        }
    }
    let number = target.to_number(ctx.swf_version);
    if number.is_nan() {
        error!(
            "Frame reference '{}' matches no label and is not a number",
            target.coerce_to_string()
        );
        return 0;
    }
    let number = number as i64;
    let base = scene_bias.unwrap_or_else(|| clip.scene_for_frame(clip.state.fp).start);
    if number < 1 {
        return base;
    }
    base + (number as u32 - 1)
}

/// Parent-first traversal of every clip under (and including) `root`.
pub fn clip_tree_ids(ctx: &PlayerContext, root: DisplayObjectId) -> Vec<DisplayObjectId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let object = match ctx.display_objects.get(id) {
            Some(object) => object,
            None => continue,
        };
        if let DisplayObjectKind::Clip(clip) = &object.kind {
            out.push(id);
            let mut children = clip.display_list.ids();
            children.reverse();
            stack.extend(children);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::frame::Frame;

    fn ctx_with_clip(frame_count: usize) -> (PlayerContext, DisplayObjectId) {
        let mut ctx = PlayerContext::new(6);
        let frames = Arc::new(vec![Frame::default(); frame_count]);
        let clip = MovieClip::from_definition(&frames, frame_count as u16, false);
        let id = ctx
            .display_objects
            .alloc(DisplayObject::new_clip(None, 0, clip));
        ctx.root = id;
        (ctx, id)
    }

    #[test]
    fn test_duplicate_label_first_wins() {
        let mut scene = Scene::new(0, "Scene 1".to_string());
        scene.add_label(2, "loop".to_string(), false);
        scene.add_label(7, "Loop".to_string(), false);
        assert_eq!(scene.find_label("loop", false), Some(2));
        assert_eq!(scene.labels.len(), 1);
    }

    #[test]
    fn test_labels_kept_sorted() {
        let mut scene = Scene::new(0, "Scene 1".to_string());
        scene.add_label(9, "end".to_string(), true);
        scene.add_label(3, "mid".to_string(), true);
        scene.add_label(0, "start".to_string(), true);
        let frames: Vec<u32> = scene.labels.iter().map(|(f, _)| *f).collect();
        assert_eq!(frames, vec![0, 3, 9]);
    }

    #[test]
    fn test_label_case_sensitivity() {
        let mut scene = Scene::new(0, "Scene 1".to_string());
        scene.add_label(4, "Outro".to_string(), true);
        assert_eq!(scene.find_label("outro", true), None);
        assert_eq!(scene.find_label("outro", false), Some(4));
    }

    #[test]
    fn test_resolve_number_is_one_based_within_scene() {
        let (mut ctx, id) = ctx_with_clip(10);
        {
            let clip = ctx.get_clip_mut(id).unwrap();
            clip.scenes = vec![
                Scene::new(0, "intro".to_string()),
                Scene::new(5, "main".to_string()),
            ];
            clip.state.fp = 6;
        }
        // frame "2" counts from the start of the scene the playhead is in
        assert_eq!(
            resolve_frame_target(&ctx, id, &Avm1Value::Int(2), None),
            6
        );
        assert_eq!(
            resolve_frame_target(&ctx, id, &Avm1Value::Int(2), Some(0)),
            1
        );
    }

    #[test]
    fn test_resolve_label_beats_number_fallback() {
        let (mut ctx, id) = ctx_with_clip(10);
        ctx.get_clip_mut(id)
            .unwrap()
            .register_label(7, "3".to_string(), false);
        assert_eq!(
            resolve_frame_target(&ctx, id, &Avm1Value::Str("3".to_string()), None),
            7
        );
    }

    #[test]
    fn test_resolve_unknown_label_lands_on_zero() {
        let (ctx, id) = ctx_with_clip(5);
        assert_eq!(
            resolve_frame_target(&ctx, id, &Avm1Value::Str("nope".to_string()), None),
            0
        );
    }

    #[test]
    fn test_advance_waits_for_first_declare() {
        let (mut ctx, id) = ctx_with_clip(3);
        advance_frame(&mut ctx, id);
        assert_eq!(ctx.get_clip(id).unwrap().state.fp, 0);
        declare_frame(&mut ctx, id);
        advance_frame(&mut ctx, id);
        assert_eq!(ctx.get_clip(id).unwrap().state.fp, 1);
    }

    #[test]
    fn test_advance_wraps_when_fully_loaded() {
        let (mut ctx, id) = ctx_with_clip(2);
        declare_frame(&mut ctx, id);
        advance_frame(&mut ctx, id);
        declare_frame(&mut ctx, id);
        advance_frame(&mut ctx, id);
        assert_eq!(ctx.get_clip(id).unwrap().state.fp, 0);
    }

    #[test]
    fn test_advance_holds_while_streaming() {
        let mut ctx = PlayerContext::new(6);
        let stream = Arc::new(FrameStream::new());
        stream.push_frame(Frame::default());
        stream.push_frame(Frame::default());
        let clip = MovieClip::new_root(Arc::clone(&stream), 5);
        let id = ctx
            .display_objects
            .alloc(DisplayObject::new_clip(None, 0, clip));
        sync_root_stream(&mut ctx, id);
        declare_frame(&mut ctx, id);
        advance_frame(&mut ctx, id);
        declare_frame(&mut ctx, id);
        assert_eq!(ctx.get_clip(id).unwrap().state.fp, 1);
        // frame 2 is not sealed yet, so the playhead holds
        advance_frame(&mut ctx, id);
        assert_eq!(ctx.get_clip(id).unwrap().state.fp, 1);
    }

    #[test]
    fn test_goto_clamps_past_loaded_end() {
        let (mut ctx, id) = ctx_with_clip(3);
        declare_frame(&mut ctx, id);
        goto_frame(&mut ctx, id, 10, true);
        assert_eq!(ctx.get_clip(id).unwrap().state.fp, 2);
    }

    #[test]
    fn test_explicit_seek_consumes_next_advance() {
        let (mut ctx, id) = ctx_with_clip(5);
        declare_frame(&mut ctx, id);
        goto_frame(&mut ctx, id, 2, true);
        let clip = ctx.get_clip(id).unwrap();
        assert_eq!(clip.state.fp, 2);
        assert!(clip.state.explicit_fp);
        advance_frame(&mut ctx, id);
        let clip = ctx.get_clip(id).unwrap();
        assert_eq!(clip.state.fp, 2);
        assert!(!clip.state.explicit_fp);
        advance_frame(&mut ctx, id);
        assert_eq!(ctx.get_clip(id).unwrap().state.fp, 3);
    }

    #[test]
    fn test_goto_same_frame_only_sets_play_state() {
        let (mut ctx, id) = ctx_with_clip(3);
        declare_frame(&mut ctx, id);
        goto_frame(&mut ctx, id, 0, false);
        let clip = ctx.get_clip(id).unwrap();
        assert!(clip.state.stopped);
        assert_eq!(clip.state.fp, 0);
        assert!(!clip.state.explicit_fp);
    }
}
