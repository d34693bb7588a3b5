use std::collections::HashMap;
use std::sync::Arc;

use log::warn;
use nohash_hasher::BuildNoHashHasher;

use crate::player::frame::{frames_from_tags, Frame};
use crate::swf::tags::{SpriteDefinition, TagCode};

type IntMap<K, V> = HashMap<K, V, BuildNoHashHasher<K>>;

/// A registered character. Non-timeline assets stay opaque; placement
/// only needs to know the id exists.
#[derive(Debug, Clone)]
pub enum Character {
    Graphic { code: TagCode },
    Sprite {
        frame_count: u16,
        frames: Arc<Vec<Frame>>,
    },
}

/// Id-keyed character registry filled by the tag parser. First
/// registration wins; a file redefining an id is malformed.
#[derive(Default)]
pub struct Dictionary {
    characters: IntMap<u16, Character>,
}

impl Dictionary {
    pub fn new() -> Dictionary {
        Dictionary::default()
    }

    pub fn register_graphic(&mut self, id: u16, code: TagCode) {
        if self.characters.contains_key(&id) {
            warn!("Character id {} already defined, keeping first", id);
            return;
        }
        self.characters.insert(id, Character::Graphic { code });
    }

    pub fn register_sprite(&mut self, sprite: SpriteDefinition) {
        if self.characters.contains_key(&sprite.id) {
            warn!("Character id {} already defined, keeping first", sprite.id);
            return;
        }
        let id = sprite.id;
        let frame_count = sprite.frame_count;
        let frames = Arc::new(frames_from_tags(sprite.tags));
        self.characters.insert(
            id,
            Character::Sprite {
                frame_count,
                frames,
            },
        );
    }

    pub fn get(&self, id: u16) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.characters.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Merges newly parsed characters in, used when the parser thread
    /// hands over a batch.
    pub fn absorb(&mut self, other: Dictionary) {
        for (id, character) in other.characters {
            if self.characters.contains_key(&id) {
                warn!("Character id {} already defined, keeping first", id);
                continue;
            }
            self.characters.insert(id, character);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_registration_wins() {
        let mut dict = Dictionary::new();
        dict.register_graphic(1, TagCode::DefineShape);
        dict.register_graphic(1, TagCode::DefineSound);
        match dict.get(1) {
            Some(Character::Graphic { code }) => assert_eq!(*code, TagCode::DefineShape),
            other => panic!("unexpected character {:?}", other),
        }
    }

    #[test]
    fn test_register_sprite() {
        let mut dict = Dictionary::new();
        dict.register_sprite(SpriteDefinition {
            id: 2,
            frame_count: 1,
            tags: vec![crate::swf::tags::Tag::ShowFrame],
        });
        match dict.get(2) {
            Some(Character::Sprite { frames, .. }) => assert_eq!(frames.len(), 1),
            other => panic!("unexpected character {:?}", other),
        }
    }
}
