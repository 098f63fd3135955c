//! Character set designation and mapping
//!
//! G0-G3 slots, locking shifts (SO/SI) and single shifts (SS2/SS3). Only the
//! 94-character sets actually seen in the wild are mapped.

use serde::{Deserialize, Serialize};

/// A designatable character set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Charset {
    /// US ASCII
    #[default]
    Ascii,
    /// DEC Special Graphics (line drawing)
    DecSpecialGraphics,
    /// United Kingdom: `#` is a pound sign
    Uk,
}

impl Charset {
    /// Decode the final byte of an SCS sequence (`ESC ( 0` etc.)
    pub fn from_designator(final_byte: u8) -> Charset {
        match final_byte {
            b'0' | b'2' => Charset::DecSpecialGraphics,
            b'A' => Charset::Uk,
            _ => Charset::Ascii,
        }
    }

    /// Map a character through this set
    pub fn map(self, c: char) -> char {
        match self {
            Charset::Ascii => c,
            Charset::Uk if c == '#' => '£',
            Charset::Uk => c,
            Charset::DecSpecialGraphics => dec_special_graphics(c),
        }
    }
}

/// Glyphs for 0x5F..=0x7E in the DEC Special Graphics set
const DEC_GRAPHICS: [char; 32] = [
    '\u{a0}', '◆', '▒', '␉', '␌', '␍', '␊', '°', '±', '␤', '␋', '┘', '┐', '┌', '└', '┼', '⎺',
    '⎻', '─', '⎼', '⎽', '├', '┤', '┴', '┬', '│', '≤', '≥', 'π', '≠', '£', '·',
];

fn dec_special_graphics(c: char) -> char {
    match c {
        '\x5f'..='\x7e' => DEC_GRAPHICS[c as usize - 0x5f],
        _ => c,
    }
}

/// G0-G3 designations plus shift state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharsetState {
    slots: [Charset; 4],
    /// Slot invoked into GL (0 after SI, 1 after SO)
    gl: usize,
    /// Slot used for the next character only (SS2/SS3)
    single_shift: Option<usize>,
}

impl CharsetState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Designate `charset` into slot `g` (0..=3)
    pub fn designate(&mut self, g: usize, charset: Charset) {
        if let Some(slot) = self.slots.get_mut(g) {
            *slot = charset;
        }
    }

    pub fn slot(&self, g: usize) -> Charset {
        self.slots.get(g).copied().unwrap_or_default()
    }

    /// SI
    pub fn shift_in(&mut self) {
        self.gl = 0;
    }

    /// SO
    pub fn shift_out(&mut self) {
        self.gl = 1;
    }

    /// LS2 / LS3: invoke G2 or G3 into GL
    pub fn invoke(&mut self, g: usize) {
        if g < 4 {
            self.gl = g;
        }
    }

    /// SS2 / SS3
    pub fn single_shift(&mut self, g: usize) {
        if g < 4 {
            self.single_shift = Some(g);
        }
    }

    /// Map one printed character, consuming any pending single shift
    pub fn map(&mut self, c: char) -> char {
        let g = self.single_shift.take().unwrap_or(self.gl);
        self.slots[g].map(c)
    }

    /// True when every character maps to itself, letting printing skip `map`
    pub fn is_identity(&self) -> bool {
        self.single_shift.is_none() && self.slots[self.gl] == Charset::Ascii
    }
}
