//! Decoding of the machine display.
//!
//! The display is mirrored into memory as single-byte characters, 16 per line.

/// Number of characters per display line.
pub const LINE_WIDTH: usize = 16;

/// Marks a number on the display as seconds, e.g. `25.3"`.
pub const SECONDS_MARKER: char = '"';

/// Decodes display memory into text, one line per 16 characters.
pub fn decode_text(data: &[u8]) -> String {
    let mut text = String::with_capacity(data.len() + data.len() / LINE_WIDTH);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 && i % LINE_WIDTH == 0 {
            text.push('\n');
        }
        text.push(char::from(*byte));
    }
    text
}

/// Extracts the running brew time from a display line.
///
/// Returns `None` if the line doesn't end with a seconds value, i.e. no
/// brew is running.
pub fn parse_brew_time(line: &str) -> Option<f32> {
    line.trim()
        .strip_suffix(SECONDS_MARKER)?
        .trim()
        .parse::<f32>()
        .ok()
}
