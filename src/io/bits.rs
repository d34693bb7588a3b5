/// Bit-level reading for the bit-packed container fields.
///
/// RECT, MATRIX and color-transform records pack values at arbitrary bit
/// widths, MSB first within each byte. The byte stream around them stays
/// little-endian; callers align back to a byte boundary when done.

#[derive(Debug)]
pub struct SwfBitReader<'a> {
    data: &'a [u8],
    pos: usize,
    bit_buffer: u32,
    bits_left: u32,
}

impl<'a> SwfBitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            bit_buffer: 0,
            bits_left: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len() && self.bits_left == 0
    }

    /// Number of whole bytes consumed so far, counting a partially read
    /// byte as consumed.
    pub fn bytes_consumed(&self) -> usize {
        self.pos
    }

    pub fn align_to_byte(&mut self) {
        self.bit_buffer = 0;
        self.bits_left = 0;
    }

    /// Read N bits as unsigned value (MSB first)
    pub fn read_bits(&mut self, count: u32) -> u32 {
        if count == 0 {
            return 0;
        }

        let mut result: u32 = 0;
        let mut remaining = count;

        while remaining > 0 {
            if self.bits_left == 0 {
                if self.pos >= self.data.len() {
                    return result;
                }
                self.bit_buffer = self.data[self.pos] as u32;
                self.pos += 1;
                self.bits_left = 8;
            }

            let take = remaining.min(self.bits_left);
            let shift = self.bits_left - take;
            let mask = ((1u32 << take) - 1) << shift;
            let bits = (self.bit_buffer & mask) >> shift;

            result = (result << take) | bits;
            self.bits_left -= take;
            remaining -= take;
        }

        result
    }

    /// Read N bits as signed value (two's complement, MSB first)
    pub fn read_bits_signed(&mut self, count: u32) -> i32 {
        let val = self.read_bits(count);
        // Sign extend
        if count > 0 && count < 32 && val & (1 << (count - 1)) != 0 {
            let mask = !((1u32 << count) - 1);
            (val | mask) as i32
        } else {
            val as i32
        }
    }

    /// Read a single bit
    pub fn read_bit(&mut self) -> bool {
        self.read_bits(1) != 0
    }

    /// Read an N-bit signed 16.16 fixed-point value (MATRIX scale/rotate
    /// fields).
    pub fn read_fixed_bits(&mut self, count: u32) -> f32 {
        self.read_bits_signed(count) as f32 / 65536.0
    }
}
