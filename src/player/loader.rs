use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;

use log::{debug, error, info};

use crate::player::dictionary::Dictionary;
use crate::player::frame::{Frame, FrameBuilder};
use crate::swf::tags::{parse_tag, SceneAndLabelData, Tag, TagStream};

/// Shared hand-off between the parser thread and the timeline. Frames
/// are appended one sealed frame at a time; `frames_loaded` only counts
/// sealed frames, so readers never observe a half-built frame.
pub struct FrameStream {
    frames: Mutex<Vec<Frame>>,
    frames_loaded: AtomicUsize,
    complete: AtomicBool,
    abort: AtomicBool,
    cond: Condvar,
    dictionary: Mutex<Dictionary>,
    scene_data: Mutex<Option<SceneAndLabelData>>,
    error: Mutex<Option<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FrameStream {
    pub fn new() -> FrameStream {
        FrameStream {
            frames: Mutex::new(Vec::new()),
            frames_loaded: AtomicUsize::new(0),
            complete: AtomicBool::new(false),
            abort: AtomicBool::new(false),
            cond: Condvar::new(),
            dictionary: Mutex::new(Dictionary::new()),
            scene_data: Mutex::new(None),
            error: Mutex::new(None),
        }
    }

    pub fn frames_loaded(&self) -> usize {
        self.frames_loaded.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    pub fn push_frame(&self, frame: Frame) {
        let mut frames = lock(&self.frames);
        frames.push(frame);
        self.frames_loaded.store(frames.len(), Ordering::Release);
        self.cond.notify_all();
    }

    fn mark_complete(&self) {
        let _frames = lock(&self.frames);
        self.complete.store(true, Ordering::Release);
        self.cond.notify_all();
    }

    /// Blocks until frame `index` is sealed, loading finishes, or the
    /// load is aborted. Returns the sealed-frame count at wakeup.
    pub fn wait_for_frame(&self, index: usize) -> usize {
        let mut frames = lock(&self.frames);
        while frames.len() <= index
            && !self.complete.load(Ordering::Acquire)
            && !self.abort.load(Ordering::Acquire)
        {
            frames = self
                .cond
                .wait(frames)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        frames.len()
    }

    /// Copies frames sealed since `from`, for syncing a local cache.
    pub fn frames_since(&self, from: usize) -> Vec<Frame> {
        let frames = lock(&self.frames);
        frames[from.min(frames.len())..].to_vec()
    }

    /// Hands the accumulated character definitions to the caller.
    pub fn take_dictionary(&self) -> Dictionary {
        std::mem::take(&mut *lock(&self.dictionary))
    }

    pub fn take_scene_data(&self) -> Option<SceneAndLabelData> {
        lock(&self.scene_data).take()
    }

    /// Synchronous stop signal for the parser thread; also wakes any
    /// timeline blocked on an unloaded frame.
    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::Release);
        let _frames = lock(&self.frames);
        self.cond.notify_all();
    }

    pub fn aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    pub fn take_error(&self) -> Option<String> {
        lock(&self.error).take()
    }
}

/// Walks the tag stream, registering definitions and sealing frames as
/// frame-end markers arrive. Runs to the end marker, a parse error, or
/// an abort request.
pub fn parse_tag_stream(body: &[u8], stream: &FrameStream) {
    let mut tags = TagStream::new(body);
    let mut builder = FrameBuilder::new();
    let mut pending = false;

    loop {
        if stream.aborted() {
            info!("Tag parse aborted");
            return;
        }
        let (code, payload) = match tags.next_tag() {
            Ok(Some(pair)) => pair,
            Ok(None) => break,
            Err(e) => {
                error!("Tag stream error: {}", e);
                *lock(&stream.error) = Some(e);
                break;
            }
        };
        let tag = match parse_tag(code, payload) {
            Ok(Some(tag)) => tag,
            Ok(None) => continue,
            Err(e) => {
                error!("Tag {} parse error: {}", code, e);
                *lock(&stream.error) = Some(e);
                break;
            }
        };
        match tag {
            Tag::End => break,
            Tag::ShowFrame => {
                stream.push_frame(builder.finish());
                pending = false;
            }
            Tag::DefineSprite(sprite) => {
                lock(&stream.dictionary).register_sprite(sprite);
            }
            Tag::DefineCharacter { id, code } => {
                lock(&stream.dictionary).register_graphic(id, code);
            }
            Tag::SceneData(data) => {
                *lock(&stream.scene_data) = Some(data);
            }
            tag => {
                builder.add(tag);
                pending = true;
            }
        }
    }
    if pending {
        stream.push_frame(builder.finish());
    }
    debug!("Tag parse done, {} frames sealed", stream.frames_loaded());
    stream.mark_complete();
}

pub fn spawn_loader(body: Vec<u8>, stream: Arc<FrameStream>) -> JoinHandle<()> {
    std::thread::spawn(move || parse_tag_stream(&body, &stream))
}
