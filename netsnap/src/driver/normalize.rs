//! Output cleanup.
//!
//! Raw device output carries CRLF line endings, carriage-return
//! overwrites, backspace erasures (pager markers being wiped) and the
//! echo of the command. Each page is cleaned on its own so that erasure
//! sequences at the start of a continuation never eat into the previous
//! page.

/// Resolve one line: keep the text after the last carriage return, apply
/// backspaces, drop other control characters.
fn clean_line(line: &str) -> String {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let line = line.rsplit('\r').find(|s| !s.is_empty()).unwrap_or("");

    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '\x08' => {
                out.pop();
            }
            '\t' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Clean a chunk of raw output.
pub fn clean(raw: &str) -> String {
    raw.split('\n').map(clean_line).collect::<Vec<_>>().join("\n")
}

/// Append one page to `output`.
///
/// The newline a device prints when the pager response is echoed is
/// dropped, so the joined pages read like a single unpaged output.
pub fn append_page(output: &mut String, raw: &str) {
    let page = clean(raw);
    let page = match page.strip_prefix('\n') {
        Some(rest) if output.ends_with('\n') => rest,
        _ => page.as_str(),
    };
    output.push_str(page);
}

/// Remove the echoed command from the head of `output`.
///
/// Only the first line of the command is considered: commands sent with
/// their own control keys echo up to the first carriage return.
pub fn strip_echo(output: &str, command: &str) -> String {
    let echo = command.split(['\r', '\n']).next().unwrap_or("").trim_end();
    if echo.is_empty() {
        return output.to_owned();
    }
    let Some(rest) = output.strip_prefix(echo) else {
        return output.to_owned();
    };
    let rest = rest.trim_start_matches(' ');
    if rest.is_empty() {
        return String::new();
    }
    match rest.strip_prefix('\n') {
        Some(rest) => rest.to_owned(),
        // "show ver" must not eat into "show version"
        None => output.to_owned(),
    }
}

/// Keep the first `max` lines.
pub fn truncate_lines(output: &str, max: usize) -> String {
    output
        .split_inclusive('\n')
        .take(max)
        .collect::<String>()
}
