// Licensed under the Apache License, Version 2.0. See LICENSE.

//! Frame-delta encoding: an `SgrCode`-style enumeration of graphics modes plus a
//! lookup-table trick (`U8_STRINGS`) for turning a `u8` into its decimal digits
//! without going through `core::fmt`, since this runs once per changed cell on every
//! frame.

use crate::buffer::OptimizedBuffer;
use crate::cell::{Attrs, Cell, Rgba};
use crate::renderer::terminal::seq;

/// Pre-computed decimal strings for 0..=255, avoiding `write!`'s integer-formatting
/// machinery in the hot per-cell encoding path.
const U8_STRINGS: [&str; 256] = {
    const fn gen() -> [&'static str; 256] {
        // `const fn` can't build a `[&str; 256]` from runtime formatting, so this
        // table is spelled out; see `build_table` test below for a cross-check
        // against `format!`.
        [
            "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17", "18", "19", "20", "21", "22", "23", "24", "25", "26", "27", "28",
            "29", "30", "31", "32", "33", "34", "35", "36", "37", "38", "39", "40", "41", "42", "43", "44", "45", "46", "47", "48", "49", "50", "51", "52", "53", "54", "55",
            "56", "57", "58", "59", "60", "61", "62", "63", "64", "65", "66", "67", "68", "69", "70", "71", "72", "73", "74", "75", "76", "77", "78", "79", "80", "81", "82",
            "83", "84", "85", "86", "87", "88", "89", "90", "91", "92", "93", "94", "95", "96", "97", "98", "99", "100", "101", "102", "103", "104", "105", "106", "107",
            "108", "109", "110", "111", "112", "113", "114", "115", "116", "117", "118", "119", "120", "121", "122", "123", "124", "125", "126", "127", "128", "129", "130",
            "131", "132", "133", "134", "135", "136", "137", "138", "139", "140", "141", "142", "143", "144", "145", "146", "147", "148", "149", "150", "151", "152", "153",
            "154", "155", "156", "157", "158", "159", "160", "161", "162", "163", "164", "165", "166", "167", "168", "169", "170", "171", "172", "173", "174", "175", "176",
            "177", "178", "179", "180", "181", "182", "183", "184", "185", "186", "187", "188", "189", "190", "191", "192", "193", "194", "195", "196", "197", "198", "199",
            "200", "201", "202", "203", "204", "205", "206", "207", "208", "209", "210", "211", "212", "213", "214", "215", "216", "217", "218", "219", "220", "221", "222",
            "223", "224", "225", "226", "227", "228", "229", "230", "231", "232", "233", "234", "235", "236", "237", "238", "239", "240", "241", "242", "243", "244", "245",
            "246", "247", "248", "249", "250", "251", "252", "253", "254", "255",
        ]
    }
    gen()
};

fn push_u8(buf: &mut String, v: u8) {
    buf.push_str(U8_STRINGS[v as usize]);
}

fn push_sgr_rgb(buf: &mut String, prefix: &str, (r, g, b): (u8, u8, u8)) {
    buf.push_str("\x1b[");
    buf.push_str(prefix);
    push_u8(buf, r);
    buf.push(';');
    push_u8(buf, g);
    buf.push(';');
    push_u8(buf, b);
    buf.push('m');
}

/// SGR attribute codes, emitted once per style change.
fn push_attr_codes(buf: &mut String, attrs: Attrs) {
    const CODES: &[(Attrs, &str)] = &[
        (Attrs::BOLD, "1"),
        (Attrs::DIM, "2"),
        (Attrs::ITALIC, "3"),
        (Attrs::UNDERLINE, "4"),
        (Attrs::BLINK, "5"),
        (Attrs::INVERSE, "7"),
        (Attrs::STRIKETHROUGH, "9"),
    ];
    for (flag, code) in CODES {
        if attrs.contains(*flag) {
            buf.push_str("\x1b[");
            buf.push_str(code);
            buf.push('m');
        }
    }
}

/// Emits the SGR prefix for one style change: reset, then fg/bg truecolor, then
/// attribute codes.
fn emit_style(buf: &mut String, fg: Rgba, bg: Rgba, attrs: Attrs) {
    buf.push_str("\x1b[0m");
    push_sgr_rgb(buf, "38;2;", fg.to_rgb8());
    push_sgr_rgb(buf, "48;2;", bg.to_rgb8());
    push_attr_codes(buf, attrs);
}

/// Encodes the byte stream to bring the terminal from `front`'s on-screen state to
/// `back`'s contents. Row-major scan; runs of cells with identical
/// `(fg,bg,attrs)` share one SGR prefix; unchanged cells (equal to `front`) are
/// skipped, and a gap of unchanged cells within a row forces a fresh cursor-position
/// escape before the next run. Wraps the whole frame in the synchronous-update
/// protocol when `sync_available` is set.
#[must_use]
pub fn encode_frame_delta(front: &OptimizedBuffer, back: &OptimizedBuffer, sync_available: bool) -> Vec<u8> {
    let (width, height) = back.dimensions();
    let mut out = String::new();
    if sync_available {
        out.push_str(seq::SYNC_BEGIN);
    }

    let mut cursor_at: Option<(u32, u32)> = None;
    let mut run_style: Option<(Rgba, Rgba, Attrs)> = None;

    for y in 0..height {
        run_style = None;
        for x in 0..width {
            let back_cell = back.get_cell(x as i32, y as i32);
            let front_cell = front.get_cell(x as i32, y as i32);
            let Some(back_cell) = back_cell else { continue };
            if back_cell.is_continuation() {
                continue;
            }
            let unchanged = front_cell == Some(back_cell);
            if unchanged {
                run_style = None;
                continue;
            }

            let needs_cursor = cursor_at != Some((x, y));
            if needs_cursor {
                out.push_str(&seq::cursor_position(y, x));
                run_style = None;
            }

            let style = (back_cell.fg, back_cell.bg, back_cell.attrs);
            if run_style != Some(style) {
                emit_style(&mut out, back_cell.fg, back_cell.bg, back_cell.attrs);
                run_style = Some(style);
            }

            push_glyph(&mut out, back_cell);
            let advance = if matches!(back_cell.width, crate::cell::CellWidth::Wide) { 2 } else { 1 };
            cursor_at = Some((x + advance, y));
        }
    }

    if sync_available {
        out.push_str(seq::SYNC_END);
    }
    out.into_bytes()
}

fn push_glyph(buf: &mut String, cell: &Cell) {
    match char::from_u32(cell.codepoint) {
        Some(c) => buf.push(c),
        None => buf.push(' '),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::width::WidthPolicy;

    #[test]
    fn u8_table_matches_format() {
        for v in 0..=255u8 {
            assert_eq!(U8_STRINGS[v as usize], v.to_string());
        }
    }

    #[test]
    fn unchanged_cells_are_skipped() {
        let front = OptimizedBuffer::new(3, 1, WidthPolicy::Unicode);
        let back = OptimizedBuffer::new(3, 1, WidthPolicy::Unicode);
        let bytes = encode_frame_delta(&front, &back, false);
        assert!(bytes.is_empty());
    }

    #[test]
    fn changed_cell_emits_cursor_position_and_glyph() {
        let front = OptimizedBuffer::new(3, 1, WidthPolicy::Unicode);
        let mut back = OptimizedBuffer::new(3, 1, WidthPolicy::Unicode);
        back.set_cell(1, 0, u32::from('x'), Rgba::WHITE, Rgba::BLACK, Attrs::empty());
        let bytes = encode_frame_delta(&front, &back, false);
        let s = String::from_utf8(bytes).unwrap();
        assert!(s.contains("\x1b[1;2H"));
        assert!(s.contains('x'));
    }

    #[test]
    fn sync_protocol_wraps_frame_when_available() {
        let front = OptimizedBuffer::new(1, 1, WidthPolicy::Unicode);
        let mut back = OptimizedBuffer::new(1, 1, WidthPolicy::Unicode);
        back.set_cell(0, 0, u32::from('x'), Rgba::WHITE, Rgba::BLACK, Attrs::empty());
        let s = String::from_utf8(encode_frame_delta(&front, &back, true)).unwrap();
        assert!(s.starts_with(seq::SYNC_BEGIN));
        assert!(s.ends_with(seq::SYNC_END));
    }
}
