//! ASCII control message parser.
//!
//! A message is one newline-delimited line. A letter opens a "mode"; every
//! byte until the next letter is that mode's argument; repeating a letter
//! overwrites the prior value. A leading underscore marks a sync response.
//! Malformed numerics parse permissively to zero; a bad argument never
//! rejects the whole message.

use mm_ir::ControlEvent;

/// One decoded line.
#[derive(Clone, Debug)]
pub struct ParsedLine {
    pub event: ControlEvent,
    /// Leading `_`: short-circuits normal event processing.
    pub sync_response: bool,
}

/// Decode one line. Returns `None` for blank lines.
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (sync_response, rest) = match line.strip_prefix('_') {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    let mut event = ControlEvent::default();
    let mut mode: Option<char> = None;
    let mut arg_start = 0;

    for (pos, ch) in rest.char_indices() {
        if ch.is_ascii_alphabetic() {
            if let Some(m) = mode {
                assign(&mut event, m, &rest[arg_start..pos], sync_response);
            }
            mode = Some(ch);
            arg_start = pos + ch.len_utf8();
        }
    }
    if let Some(m) = mode {
        assign(&mut event, m, &rest[arg_start..], sync_response);
    }

    Some(ParsedLine { event, sync_response })
}

/// Permissive float parse: anything malformed is zero.
fn num(s: &str) -> f32 {
    s.trim().parse().unwrap_or(0.0)
}

/// Permissive integer parse for the wide time fields.
fn num64(s: &str) -> i64 {
    s.trim().parse().unwrap_or(0)
}

/// Fill a fixed slot array from a comma-separated argument.
fn csv<const N: usize>(out: &mut [f32; N], s: &str) {
    for (slot, part) in out.iter_mut().zip(s.split(',')) {
        *slot = num(part);
    }
}

/// The closed letter table. Unknown letters are ignored.
fn assign(event: &mut ControlEvent, letter: char, arg: &str, sync_response: bool) {
    match letter {
        't' => event.time = num64(arg),
        'c' => event.client = num(arg) as i32,
        'v' => event.osc = num(arg) as i32,
        'w' => event.wave = num(arg),
        'f' => event.freq = num(arg),
        'l' => event.trigger = num(arg),
        'a' => event.amp = num(arg),
        'd' => event.duty = num(arg),
        'b' => event.feedback = num(arg),
        'A' => csv(&mut event.adsr, arg),
        'T' => event.adsr_targets = num(arg),
        'F' => event.filter_freq = num(arg),
        'G' => event.filter_kind = num(arg),
        'R' => event.resonance = num(arg),
        'L' => event.mod_source = num(arg),
        'g' => event.mod_targets = num(arg),
        'o' => event.algorithm = num(arg),
        'O' => csv(&mut event.algo_sources, arg),
        'p' => event.patch = num(arg),
        'P' => event.phase = num(arg),
        'V' => event.master_volume = num(arg),
        'x' => event.eq_low = num(arg),
        // `y` doubles as the battery mask inside sync responses.
        'y' => {
            if sync_response {
                event.battery = num(arg) as i32;
            } else {
                event.eq_mid = num(arg);
            }
        }
        'z' => event.eq_high = num(arg),
        'n' => event.note = num(arg),
        'I' => event.ratio = num(arg),
        'S' => event.reset = num(arg),
        'D' => event.debug = num(arg),
        'i' => event.sync_index = num(arg) as i32,
        's' => event.sync_time = num64(arg),
        'r' => event.sender = num(arg) as i32,
        // message terminator on sync lines; carries no argument
        'Z' => {}
        _ => {}
    }
}
