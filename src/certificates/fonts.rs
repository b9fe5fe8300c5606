//! The base-14 fonts the overlay can draw with, and their glyph widths.
//!
//! Text is drawn with WinAnsiEncoding, so every character is first mapped
//! to its WinAnsi code; anything without one is drawn (and measured) as `?`.
//! Widths are in 1/1000 text-space units, from the Adobe core font metrics.

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    Courier,
    CourierBold,
}

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// 0xA0..=0xFF, which WinAnsi shares with Latin-1
#[rustfmt::skip]
const HELVETICA_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

#[rustfmt::skip]
const HELVETICA_BOLD_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

/// 0x80..=0x9F, the WinAnsi-only block; 0 marks unused codes
#[rustfmt::skip]
const HELVETICA_WIN: [u16; 32] = [
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIN: [u16; 32] = [
    556, 0, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0, 500, 667,
];

const COURIER_WIDTH: u16 = 600;

/// WinAnsi code for `c`, if the encoding has one
pub fn win_ansi_code(c: char) -> Option<u8> {
    let code = match c {
        ' '..='~' | '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(code)
}

/// WinAnsi bytes for `text`, `?` where there is no code
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| win_ansi_code(c).unwrap_or(b'?')).collect()
}

impl StandardFont {
    /// Pick a font from the layout's family and weight. Families other than
    /// Helvetica and Courier fall back to Helvetica.
    pub fn resolve(family: &str, bold: bool) -> Self {
        let family = family.trim().to_ascii_lowercase();
        let courier = match family.as_str() {
            "courier" | "courier new" | "monospace" => true,
            "helvetica" | "arial" | "sans-serif" | "" => false,
            other => {
                warn!("Font family '{}' is not available, using Helvetica", other);
                false
            }
        };

        match (courier, bold) {
            (true, true) => StandardFont::CourierBold,
            (true, false) => StandardFont::Courier,
            (false, true) => StandardFont::HelveticaBold,
            (false, false) => StandardFont::Helvetica,
        }
    }

    /// PDF `/BaseFont` name
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
        }
    }

    /// Resource name used inside page content streams
    pub fn resource_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "CkHelv",
            StandardFont::HelveticaBold => "CkHelvB",
            StandardFont::Courier => "CkCour",
            StandardFont::CourierBold => "CkCourB",
        }
    }

    fn glyph_width(&self, c: char) -> u16 {
        let (ascii, latin1, win) = match self {
            StandardFont::Courier | StandardFont::CourierBold => return COURIER_WIDTH,
            StandardFont::Helvetica => (&HELVETICA, &HELVETICA_LATIN1, &HELVETICA_WIN),
            StandardFont::HelveticaBold => (&HELVETICA_BOLD, &HELVETICA_BOLD_LATIN1, &HELVETICA_BOLD_WIN),
        };

        let code = win_ansi_code(c).unwrap_or(b'?') as usize;
        match code {
            0x20..=0x7E => ascii[code - 0x20],
            0x80..=0x9F => win[code - 0x80],
            0xA0..=0xFF => latin1[code - 0xA0],
            _ => ascii[usize::from(b'?') - 0x20],
        }
    }

    /// Rendered width of `text` at `size` points
    pub fn string_width(&self, text: &str, size: f64) -> f64 {
        let units: u32 = text.chars().map(|c| self.glyph_width(c) as u32).sum();
        units as f64 * size / 1000.0
    }
}
