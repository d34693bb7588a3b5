pub mod allocator;
pub mod context;
pub mod dictionary;
pub mod display_list;
pub mod display_object;
pub mod events;
pub mod frame;
pub mod function;
pub mod interpreter;
pub mod loader;
pub mod movie;
pub mod movie_clip;
pub mod object;
pub mod stage;
pub mod value;

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Local};
use fxhash::FxHashMap;
use nohash_hasher::BuildNoHashHasher;

use crate::player::allocator::Arena;
use crate::player::dictionary::Dictionary;
use crate::player::display_object::DisplayObject;
use crate::player::function::Avm1Function;
use crate::player::movie_clip::MovieClip;
use crate::player::object::ScriptObject;
use crate::player::value::Avm1Value;
use crate::swf::types::Rgb;

pub use stage::Player;

/// Arena handles. 0 is the null handle in every arena.
pub type DisplayObjectId = usize;
pub type ObjectId = usize;
pub type FunctionId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptError {
    pub message: String,
}

impl ScriptError {
    pub fn new<S: Into<String>>(message: S) -> ScriptError {
        ScriptError {
            message: message.into(),
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<String> for ScriptError {
    fn from(message: String) -> ScriptError {
        ScriptError { message }
    }
}

/// All mutable player state. Timeline and interpreter operations are
/// free functions over this so borrows stay local to each step.
pub struct PlayerContext {
    pub swf_version: u8,
    pub display_objects: Arena<DisplayObject>,
    pub objects: Arena<ScriptObject>,
    pub functions: Arena<Avm1Function>,
    pub dictionary: Dictionary,
    pub globals: FxHashMap<String, Avm1Value>,
    pub root: DisplayObjectId,
    pub background_color: Option<Rgb>,
    /// Handles detached this tick; freed in one pass at tick end so
    /// scripts holding them see dead-but-stable handles, never a
    /// recycled slot.
    pub pending_release: Vec<DisplayObjectId>,
    /// Sprite ids whose init actions already ran. Once, ever.
    pub init_actions_run: HashSet<u16, BuildNoHashHasher<u16>>,
    pub trace_log: Vec<String>,
    pub start_time: DateTime<Local>,
    pub frame_delay_ms: u32,
    /// Sound start requests accumulated this tick, drained by the host.
    pub sound_requests: Vec<u16>,
    /// Linear-congruential state behind the random opcode.
    pub random_state: u32,
}

impl PlayerContext {
    pub fn new(swf_version: u8) -> PlayerContext {
        PlayerContext {
            swf_version,
            display_objects: Arena::new(),
            objects: Arena::new(),
            functions: Arena::new(),
            dictionary: Dictionary::new(),
            globals: FxHashMap::default(),
            root: 0,
            background_color: None,
            pending_release: Vec::new(),
            init_actions_run: HashSet::default(),
            trace_log: Vec::new(),
            start_time: Local::now(),
            frame_delay_ms: 83,
            sound_requests: Vec::new(),
            random_state: Local::now().timestamp_subsec_nanos() | 1,
        }
    }

    pub fn next_random(&mut self, max: i32) -> i32 {
        self.random_state = self
            .random_state
            .wrapping_mul(1_103_515_245)
            .wrapping_add(12_345);
        if max <= 0 {
            0
        } else {
            ((self.random_state >> 8) % max as u32) as i32
        }
    }

    /// Script identifier comparisons became case-sensitive in version 7.
    pub fn case_sensitive(&self) -> bool {
        self.swf_version >= 7
    }

    pub fn get_clip(&self, id: DisplayObjectId) -> Option<&MovieClip> {
        self.display_objects.get(id).and_then(|obj| obj.as_clip())
    }

    pub fn get_clip_mut(&mut self, id: DisplayObjectId) -> Option<&mut MovieClip> {
        self.display_objects
            .get_mut(id)
            .and_then(|obj| obj.as_clip_mut())
    }

    pub fn elapsed_ms(&self) -> u32 {
        let elapsed = Local::now().signed_duration_since(self.start_time);
        elapsed.num_milliseconds().max(0) as u32
    }
}
