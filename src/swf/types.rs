use crate::io::SwfBitReader;

/// Axis-aligned bounds in twips.
///
/// Wire form: a 5-bit field count, then four signed values of that width
/// (xmin, xmax, ymin, ymax).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl Rect {
    pub fn read(bits: &mut SwfBitReader) -> Rect {
        let nbits = bits.read_bits(5);
        let x_min = bits.read_bits_signed(nbits);
        let x_max = bits.read_bits_signed(nbits);
        let y_min = bits.read_bits_signed(nbits);
        let y_max = bits.read_bits_signed(nbits);
        bits.align_to_byte();
        Rect {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    pub fn width_twips(&self) -> i32 {
        self.x_max - self.x_min
    }

    pub fn height_twips(&self) -> i32 {
        self.y_max - self.y_min
    }
}

/// 2x3 affine transform. Scale and rotate-skew are 16.16 fixed point,
/// translate is in twips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotate_skew_0: f32,
    pub rotate_skew_1: f32,
    pub translate_x: i32,
    pub translate_y: i32,
}

impl Default for Matrix {
    fn default() -> Matrix {
        Matrix {
            scale_x: 1.0,
            scale_y: 1.0,
            rotate_skew_0: 0.0,
            rotate_skew_1: 0.0,
            translate_x: 0,
            translate_y: 0,
        }
    }
}

impl Matrix {
    pub fn read(bits: &mut SwfBitReader) -> Matrix {
        let mut matrix = Matrix::default();
        if bits.read_bit() {
            let nbits = bits.read_bits(5);
            matrix.scale_x = bits.read_fixed_bits(nbits);
            matrix.scale_y = bits.read_fixed_bits(nbits);
        }
        if bits.read_bit() {
            let nbits = bits.read_bits(5);
            matrix.rotate_skew_0 = bits.read_fixed_bits(nbits);
            matrix.rotate_skew_1 = bits.read_fixed_bits(nbits);
        }
        let nbits = bits.read_bits(5);
        matrix.translate_x = bits.read_bits_signed(nbits);
        matrix.translate_y = bits.read_bits_signed(nbits);
        bits.align_to_byte();
        matrix
    }
}

/// Per-channel multiply (8.8 fixed) and add terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTransform {
    pub mult: [f32; 4],
    pub add: [i32; 4],
}

impl Default for ColorTransform {
    fn default() -> ColorTransform {
        ColorTransform {
            mult: [1.0; 4],
            add: [0; 4],
        }
    }
}

impl ColorTransform {
    /// `with_alpha` selects the 4-channel encoding (PlaceObject2 onward).
    pub fn read(bits: &mut SwfBitReader, with_alpha: bool) -> ColorTransform {
        let has_add = bits.read_bit();
        let has_mult = bits.read_bit();
        let nbits = bits.read_bits(4);
        let channels = if with_alpha { 4 } else { 3 };
        let mut xform = ColorTransform::default();
        if has_mult {
            for i in 0..channels {
                xform.mult[i] = bits.read_bits_signed(nbits) as f32 / 256.0;
            }
        }
        if has_add {
            for i in 0..channels {
                xform.add[i] = bits.read_bits_signed(nbits);
            }
        }
        bits.align_to_byte();
        xform
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}
