use crate::player::value::Avm1Value;
use crate::player::ScriptError;
use crate::swf::file::SwfFile;
use crate::swf::types::Rect;
use crate::utils::twips_to_px;

/// Immutable facts about the loaded file, exposed to scripts as movie
/// properties.
pub struct Movie {
    pub version: u8,
    pub frame_size: Rect,
    pub frame_rate: f32,
    pub total_frames: u16,
}

impl Movie {
    pub fn empty() -> Movie {
        Movie {
            version: 6,
            frame_size: Rect::default(),
            frame_rate: 12.0,
            total_frames: 0,
        }
    }

    pub fn from_file(file: &SwfFile) -> Movie {
        Movie {
            version: file.version,
            frame_size: file.frame_size,
            frame_rate: file.frame_rate,
            total_frames: file.frame_count,
        }
    }

    pub fn frame_delay_ms(&self) -> u32 {
        let rate = if self.frame_rate <= 0.0 {
            12.0
        } else {
            self.frame_rate
        };
        (1000.0 / rate) as u32
    }

    pub fn width_px(&self) -> f64 {
        twips_to_px(self.frame_size.width_twips())
    }

    pub fn height_px(&self) -> f64 {
        twips_to_px(self.frame_size.height_twips())
    }

    pub fn get_prop(&self, prop: &str) -> Result<Avm1Value, ScriptError> {
        match prop {
            "version" => Ok(Avm1Value::Int(self.version as i32)),
            "frameRate" => Ok(Avm1Value::from_f64(self.frame_rate as f64)),
            "totalFrames" => Ok(Avm1Value::Int(self.total_frames as i32)),
            "width" => Ok(Avm1Value::from_f64(self.width_px())),
            "height" => Ok(Avm1Value::from_f64(self.height_px())),
            _ => Err(ScriptError::new(format!("Unknown movie property {}", prop))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_props() {
        let movie = Movie {
            version: 6,
            frame_size: Rect {
                x_min: 0,
                x_max: 11000,
                y_min: 0,
                y_max: 8000,
            },
            frame_rate: 24.0,
            total_frames: 10,
        };
        assert_eq!(movie.get_prop("width").unwrap(), Avm1Value::Int(550));
        assert_eq!(movie.get_prop("totalFrames").unwrap(), Avm1Value::Int(10));
        assert_eq!(movie.frame_delay_ms(), 41);
        assert!(movie.get_prop("nope").is_err());
    }
}
