use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info};

use crate::player::display_object::DisplayObject;
use crate::player::events::{EventQueue, EventSender, PlayerEvent};
use crate::player::interpreter::run_actions;
use crate::player::loader::{parse_tag_stream, spawn_loader, FrameStream};
use crate::player::movie::Movie;
use crate::player::movie_clip::{
    advance_frame, clip_tree_ids, declare_frame, drain_pending_release, goto_frame,
    resolve_frame_target, sync_root_stream, take_frame_scripts, take_init_scripts, MovieClip,
};
use crate::player::PlayerContext;
use crate::swf::file::SwfFile;

/// The stage: owns all player state and drives the fixed-step tick.
/// Loading hands the tag stream to a parser thread; ticks run on the
/// single script thread that owns the event queue.
pub struct Player {
    pub ctx: PlayerContext,
    pub movie: Movie,
    pub events: EventQueue,
    stream: Option<Arc<FrameStream>>,
    loader: Option<JoinHandle<()>>,
}

impl Player {
    pub fn new() -> Player {
        Player {
            ctx: PlayerContext::new(6),
            movie: Movie::empty(),
            events: EventQueue::new(),
            stream: None,
            loader: None,
        }
    }

    /// Parses the header and starts streaming the body on a parser
    /// thread. Playback can begin before loading finishes.
    pub fn load(&mut self, data: &[u8]) -> Result<(), String> {
        let (file, stream) = self.begin_load(data)?;
        self.loader = Some(spawn_loader(file.body, stream));
        Ok(())
    }

    /// Parses the whole body before returning. For hosts (and tests)
    /// that want a fully loaded movie.
    pub fn load_sync(&mut self, data: &[u8]) -> Result<(), String> {
        let (file, stream) = self.begin_load(data)?;
        parse_tag_stream(&file.body, &stream);
        let root = self.ctx.root;
        sync_root_stream(&mut self.ctx, root);
        Ok(())
    }

    fn begin_load(&mut self, data: &[u8]) -> Result<(SwfFile, Arc<FrameStream>), String> {
        self.abort();
        let file = SwfFile::read(data)?;
        info!(
            "Loading movie: v{}, {} frames at {} fps",
            file.version, file.frame_count, file.frame_rate
        );
        self.movie = Movie::from_file(&file);
        let mut ctx = PlayerContext::new(file.version);
        ctx.frame_delay_ms = self.movie.frame_delay_ms();
        let stream = Arc::new(FrameStream::new());
        let root_clip = MovieClip::new_root(Arc::clone(&stream), file.frame_count);
        ctx.root = ctx
            .display_objects
            .alloc(DisplayObject::new_clip(None, 0, root_clip));
        self.ctx = ctx;
        self.stream = Some(Arc::clone(&stream));
        Ok((file, stream))
    }

    /// Stops any in-flight load and joins the parser thread.
    pub fn abort(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.request_abort();
        }
        if let Some(handle) = self.loader.take() {
            let _ = handle.join();
        }
    }

    pub fn sender(&self) -> EventSender {
        self.events.sender()
    }

    pub fn frame_delay_ms(&self) -> u32 {
        self.ctx.frame_delay_ms
    }

    /// One playhead step: advance every timeline, build the frames the
    /// playheads now sit on, run init and frame scripts, service queued
    /// events, then free what the tick detached.
    pub fn tick(&mut self) {
        let root = self.ctx.root;
        sync_root_stream(&mut self.ctx, root);

        for clip in clip_tree_ids(&self.ctx, root) {
            advance_frame(&mut self.ctx, clip);
        }
        for clip in clip_tree_ids(&self.ctx, root) {
            declare_frame(&mut self.ctx, clip);
        }
        for clip in clip_tree_ids(&self.ctx, root) {
            for (sprite_id, actions) in take_init_scripts(&mut self.ctx, clip) {
                if let Err(e) = run_actions(&mut self.ctx, clip, &actions) {
                    error!("Init script of sprite {} failed: {}", sprite_id, e);
                }
            }
        }
        for clip in clip_tree_ids(&self.ctx, root) {
            for actions in take_frame_scripts(&mut self.ctx, clip) {
                if let Err(e) = run_actions(&mut self.ctx, clip, &actions) {
                    error!("Frame script failed: {}", e);
                }
            }
        }
        for event in self.events.drain() {
            self.handle_event(event);
        }
        drain_pending_release(&mut self.ctx);
    }

    fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::RunActions { clip, actions } => {
                if let Err(e) = run_actions(&mut self.ctx, clip, &actions) {
                    error!("Queued script failed: {}", e);
                }
            }
            PlayerEvent::Goto { clip, target, play } => {
                let dest = resolve_frame_target(&self.ctx, clip, &target, None);
                goto_frame(&mut self.ctx, clip, dest, play);
            }
            PlayerEvent::Play(clip) => {
                if let Some(clip) = self.ctx.get_clip_mut(clip) {
                    clip.state.stopped = false;
                }
            }
            PlayerEvent::Stop(clip) => {
                if let Some(clip) = self.ctx.get_clip_mut(clip) {
                    clip.state.stopped = true;
                }
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.abort();
    }
}

impl Default for Player {
    fn default() -> Player {
        Player::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::value::Avm1Value;
    use crate::swf::types::Rgb;

    fn short_tag(code: u16, payload: &[u8]) -> Vec<u8> {
        assert!(payload.len() < 0x3F);
        let raw = (code << 6) | payload.len() as u16;
        let mut out = raw.to_le_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn movie(frame_count: u16, body: &[u8]) -> Vec<u8> {
        let mut rest = vec![0u8]; // RECT with nbits=0
        rest.extend_from_slice(&0x0C00u16.to_le_bytes()); // 12 fps
        rest.extend_from_slice(&frame_count.to_le_bytes());
        rest.extend_from_slice(body);
        let mut out = Vec::new();
        out.extend_from_slice(b"FWS");
        out.push(6);
        out.extend_from_slice(&((rest.len() + 8) as u32).to_le_bytes());
        out.extend_from_slice(&rest);
        out
    }

    fn shape(id: u16) -> Vec<u8> {
        let mut payload = id.to_le_bytes().to_vec();
        payload.push(0xAA);
        short_tag(2, &payload)
    }

    fn place(depth: u16, character_id: u16) -> Vec<u8> {
        let mut payload = vec![0x02];
        payload.extend_from_slice(&depth.to_le_bytes());
        payload.extend_from_slice(&character_id.to_le_bytes());
        short_tag(26, &payload)
    }

    fn trace_script(message: &str) -> Vec<u8> {
        let mut out = vec![0x96];
        out.extend_from_slice(&((message.len() + 2) as u16).to_le_bytes());
        out.push(0x00);
        out.extend_from_slice(message.as_bytes());
        out.push(0x00);
        out.push(0x26); // trace
        out
    }

    fn do_action(script: &[u8]) -> Vec<u8> {
        let mut payload = script.to_vec();
        payload.push(0x00); // end of actions
        short_tag(12, &payload)
    }

    fn show_frame() -> Vec<u8> {
        short_tag(1, &[])
    }

    fn end_tag() -> Vec<u8> {
        short_tag(0, &[])
    }

    fn loaded_player(frame_count: u16, body: &[u8]) -> Player {
        let mut player = Player::new();
        player.load_sync(&movie(frame_count, body)).unwrap();
        player
    }

    fn fp(player: &Player) -> u32 {
        player.ctx.get_clip(player.ctx.root).unwrap().state.fp
    }

    fn child_at(player: &Player, depth: u16) -> Option<u16> {
        let clip = player.ctx.get_clip(player.ctx.root).unwrap();
        let id = clip.display_list.get(depth)?;
        player.ctx.display_objects.get(id).and_then(|o| o.character_id)
    }

    #[test]
    fn test_first_tick_presents_frame_zero() {
        let mut body = shape(1);
        body.extend(place(1, 1));
        body.extend(do_action(&trace_script("first")));
        body.extend(show_frame());
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(2, &body);
        player.tick();
        assert_eq!(fp(&player), 0);
        assert_eq!(player.ctx.trace_log, vec!["first".to_string()]);
        assert_eq!(child_at(&player, 1), Some(1));
    }

    #[test]
    fn test_stop_holds_playhead_and_script_runs_once() {
        let mut body = do_action(&[0x07]); // stop
        body.extend(do_action(&trace_script("held")));
        body.extend(show_frame());
        body.extend(do_action(&trace_script("never")));
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(2, &body);
        player.tick();
        player.tick();
        player.tick();
        assert_eq!(fp(&player), 0);
        assert_eq!(player.ctx.trace_log, vec!["held".to_string()]);
    }

    #[test]
    fn test_loop_rebuilds_timeline_children() {
        let mut body = shape(1);
        body.extend(shape(2));
        body.extend(place(1, 1));
        body.extend(show_frame());
        body.extend(place(2, 2));
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(2, &body);
        player.tick();
        assert_eq!(fp(&player), 0);
        assert_eq!(child_at(&player, 2), None);
        player.tick();
        assert_eq!(fp(&player), 1);
        assert_eq!(child_at(&player, 2), Some(2));
        player.tick(); // wraps to frame 0
        assert_eq!(fp(&player), 0);
        assert_eq!(child_at(&player, 1), Some(1));
        assert_eq!(child_at(&player, 2), None);
    }

    #[test]
    fn test_place_at_occupied_depth_displaces() {
        let mut body = shape(1);
        body.extend(shape(2));
        body.extend(place(1, 1));
        body.extend(show_frame());
        body.extend(place(1, 2)); // no modify flag, same depth
        body.extend(do_action(&[0x07]));
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(2, &body);
        player.tick();
        let first = {
            let clip = player.ctx.get_clip(player.ctx.root).unwrap();
            clip.display_list.get(1).unwrap()
        };
        player.tick();
        assert_eq!(child_at(&player, 1), Some(2));
        // the displaced object was released at tick end
        assert!(player.ctx.display_objects.get(first).is_none());
    }

    #[test]
    fn test_repeated_non_move_placement_keeps_occupant() {
        let mut body = shape(1);
        body.extend(place(1, 1));
        body.extend(show_frame());
        body.extend(place(1, 1)); // same character again, no modify flag
        body.extend(do_action(&[0x07]));
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(2, &body);
        player.tick();
        let first = {
            let clip = player.ctx.get_clip(player.ctx.root).unwrap();
            clip.display_list.get(1).unwrap()
        };
        player.tick();
        let clip = player.ctx.get_clip(player.ctx.root).unwrap();
        assert_eq!(clip.display_list.get(1), Some(first));
        assert!(player.ctx.display_objects.get(first).is_some());
    }

    #[test]
    fn test_goto_rebuilds_display_list_for_destination() {
        let mut body = shape(1);
        body.extend(shape(2));
        body.extend(shape(3));
        body.extend(place(1, 1));
        body.extend(show_frame());
        body.extend(place(1, 2));
        body.extend(show_frame());
        body.extend(place(1, 3));
        body.extend(do_action(&[0x07]));
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(3, &body);
        player.tick();
        player.tick();
        player.tick();
        assert_eq!(fp(&player), 2);
        assert_eq!(child_at(&player, 1), Some(3));
        let root = player.ctx.root;
        player.sender().send(PlayerEvent::Goto {
            clip: root,
            target: Avm1Value::Int(1),
            play: false,
        });
        player.tick();
        assert_eq!(fp(&player), 0);
        // only the destination frame's object survives the rebuild
        assert_eq!(child_at(&player, 1), Some(1));
        assert_eq!(
            player.ctx.get_clip(root).unwrap().display_list.len(),
            1
        );
    }

    #[test]
    fn test_held_frame_constructs_its_children_once() {
        let mut body = shape(1);
        body.extend(place(1, 1));
        body.extend(do_action(&[0x07]));
        body.extend(show_frame());
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(2, &body);
        player.tick();
        let first = {
            let clip = player.ctx.get_clip(player.ctx.root).unwrap();
            clip.display_list.get(1).unwrap()
        };
        for _ in 0..3 {
            player.tick();
        }
        assert_eq!(fp(&player), 0);
        let clip = player.ctx.get_clip(player.ctx.root).unwrap();
        assert_eq!(clip.display_list.get(1), Some(first));
        assert!(player.ctx.display_objects.get(first).is_some());
    }

    #[test]
    fn test_goto_event_by_label() {
        let mut body = short_tag(43, b"start\0"); // FrameLabel
        body.extend(show_frame());
        body.extend(show_frame());
        body.extend(do_action(&[0x07]));
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(3, &body);
        player.tick();
        player.tick();
        player.tick();
        assert_eq!(fp(&player), 2);
        let root = player.ctx.root;
        player.sender().send(PlayerEvent::Goto {
            clip: root,
            target: Avm1Value::Str("start".to_string()),
            play: false,
        });
        player.tick();
        assert_eq!(fp(&player), 0);
    }

    #[test]
    fn test_goto_event_number_is_one_based() {
        let mut body = do_action(&[0x07]);
        body.extend(show_frame());
        body.extend(show_frame());
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(3, &body);
        player.tick();
        assert_eq!(fp(&player), 0);
        let root = player.ctx.root;
        player.sender().send(PlayerEvent::Goto {
            clip: root,
            target: Avm1Value::Int(2),
            play: false,
        });
        player.tick();
        assert_eq!(fp(&player), 1);
    }

    #[test]
    fn test_goto_action_preserves_play_state() {
        // frame 0 jumps ahead with GotoFrame while playing
        let mut body = do_action(&[0x81, 0x02, 0x00, 0x02, 0x00]); // goto frame 2
        body.extend(show_frame());
        body.extend(show_frame());
        body.extend(do_action(&trace_script("landed")));
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(3, &body);
        player.tick();
        assert_eq!(fp(&player), 2);
        assert!(!player.ctx.get_clip(player.ctx.root).unwrap().state.stopped);
        // the destination's frame script runs on the next tick
        player.tick();
        assert_eq!(player.ctx.trace_log, vec!["landed".to_string()]);
    }

    #[test]
    fn test_init_action_runs_once_ever() {
        // sprite 1: one empty frame
        let mut sprite = vec![0x01, 0x00, 0x01, 0x00];
        sprite.extend(show_frame());
        sprite.extend(end_tag());
        let mut init = vec![0x01, 0x00]; // sprite id
        init.extend(trace_script("init"));
        init.push(0x00);

        let mut body = short_tag(39, &sprite);
        body.extend(short_tag(59, &init));
        body.extend(place(1, 1));
        body.extend(show_frame());
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(2, &body);
        for _ in 0..5 {
            player.tick(); // loops through frame 0 repeatedly
        }
        assert_eq!(player.ctx.trace_log, vec!["init".to_string()]);
    }

    #[test]
    fn test_background_color_applied() {
        let mut body = short_tag(9, &[0x11, 0x22, 0x33]);
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(1, &body);
        player.tick();
        assert_eq!(
            player.ctx.background_color,
            Some(Rgb {
                r: 0x11,
                g: 0x22,
                b: 0x33
            })
        );
    }

    #[test]
    fn test_placement_of_unknown_character_skipped() {
        let mut body = place(1, 99);
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(1, &body);
        player.tick();
        assert_eq!(child_at(&player, 1), None);
    }

    #[test]
    fn test_play_and_stop_events() {
        let mut body = do_action(&[0x07]);
        body.extend(show_frame());
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = loaded_player(2, &body);
        player.tick();
        assert_eq!(fp(&player), 0);
        let root = player.ctx.root;
        player.sender().send(PlayerEvent::Play(root));
        player.tick(); // play lands at end of this tick
        player.tick();
        assert_eq!(fp(&player), 1);
    }

    #[test]
    fn test_async_load_and_abort() {
        let mut body = show_frame();
        body.extend(show_frame());
        body.extend(end_tag());
        let mut player = Player::new();
        player.load(&movie(2, &body)).unwrap();
        player.abort(); // joins the parser thread
        player.tick(); // ticking after abort must not panic
    }
}
