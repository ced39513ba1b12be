use crate::dispatch::KeyPress;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Converts a terminal key event into the dispatcher's physical-key form.
pub fn key_press_from_event(key: &KeyEvent) -> KeyPress {
    let (code, implied_shift) = physical_code(key.code);
    KeyPress::new(
        code,
        key.modifiers.contains(KeyModifiers::CONTROL),
        key.modifiers.contains(KeyModifiers::SHIFT) || implied_shift,
        key.modifiers.contains(KeyModifiers::ALT),
    )
}

/// The printable character of a key event, for text input. Control and alt
/// chords never insert text.
pub fn text_char(key: &KeyEvent) -> Option<char> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }
    match key.code {
        KeyCode::Char(ch) => Some(ch),
        _ => None,
    }
}

fn physical_code(code: KeyCode) -> (String, bool) {
    let (name, implied_shift) = match code {
        KeyCode::Char(ch) => return char_code(ch),
        KeyCode::Enter => ("Enter", false),
        KeyCode::Esc => ("Escape", false),
        KeyCode::Tab => ("Tab", false),
        KeyCode::BackTab => ("Tab", true),
        KeyCode::Backspace => ("Backspace", false),
        KeyCode::Delete => ("Delete", false),
        KeyCode::Insert => ("Insert", false),
        KeyCode::Left => ("ArrowLeft", false),
        KeyCode::Right => ("ArrowRight", false),
        KeyCode::Up => ("ArrowUp", false),
        KeyCode::Down => ("ArrowDown", false),
        KeyCode::Home => ("Home", false),
        KeyCode::End => ("End", false),
        KeyCode::PageUp => ("PageUp", false),
        KeyCode::PageDown => ("PageDown", false),
        KeyCode::F(number) => return (format!("F{number}"), false),
        _ => ("", false),
    };
    (name.to_string(), implied_shift)
}

fn char_code(ch: char) -> (String, bool) {
    if ch.is_ascii_alphabetic() {
        return (
            format!("Key{}", ch.to_ascii_uppercase()),
            ch.is_ascii_uppercase(),
        );
    }
    if ch.is_ascii_digit() {
        return (format!("Digit{ch}"), false);
    }
    let (name, implied_shift) = match ch {
        ' ' => ("Space", false),
        '/' => ("Slash", false),
        '?' => ("Slash", true),
        ';' => ("Semicolon", false),
        ':' => ("Semicolon", true),
        ',' => ("Comma", false),
        '.' => ("Period", false),
        '-' => ("Minus", false),
        '_' => ("Minus", true),
        '=' => ("Equal", false),
        '+' => ("Equal", true),
        '\'' => ("Quote", false),
        '"' => ("Quote", true),
        _ => ("", false),
    };
    (name.to_string(), implied_shift)
}

/// Canonicalizes a config-supplied binding spec ("Ctrl + N", "shift+F5")
/// into the dispatcher's combo form, with modifiers in ctrl, shift, alt
/// order. Returns None for specs naming no usable key.
pub fn normalize_hotkey_spec(spec: &str) -> Option<String> {
    let mut ctrl = false;
    let mut shift = false;
    let mut alt = false;
    let mut key: Option<String> = None;

    for token in spec
        .split('+')
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
    {
        match token.as_str() {
            "ctrl" | "control" => ctrl = true,
            "shift" => shift = true,
            "alt" => alt = true,
            _ => {
                key = normalize_hotkey_key_token(&token);
            }
        }
    }

    let key = key?;
    let mut parts = Vec::new();
    if ctrl {
        parts.push("ctrl".to_string());
    }
    if shift {
        parts.push("shift".to_string());
    }
    if alt {
        parts.push("alt".to_string());
    }
    parts.push(key);
    Some(parts.join("+"))
}

fn normalize_hotkey_key_token(token: &str) -> Option<String> {
    match token {
        "esc" | "escape" => Some("escape".to_string()),
        "return" | "enter" => Some("enter".to_string()),
        "up" | "arrowup" => Some("arrowup".to_string()),
        "down" | "arrowdown" => Some("arrowdown".to_string()),
        "left" | "arrowleft" => Some("arrowleft".to_string()),
        "right" | "arrowright" => Some("arrowright".to_string()),
        "pgup" | "pageup" => Some("pageup".to_string()),
        "pgdn" | "pagedown" => Some("pagedown".to_string()),
        "del" | "delete" => Some("delete".to_string()),
        "ins" | "insert" => Some("insert".to_string()),
        "space" | "tab" | "backspace" | "home" | "end" | "slash" | "semicolon" | "comma"
        | "period" | "minus" | "equal" | "quote" => Some(token.to_string()),
        _ if token.len() == 1 && token.chars().all(|ch| ch.is_ascii_alphabetic()) => {
            Some(token.to_string())
        }
        _ if token.len() == 1 && token.chars().all(|ch| ch.is_ascii_digit()) => {
            Some(format!("digit{token}"))
        }
        _ if token.starts_with('f') => {
            let number = token.trim_start_matches('f').parse::<u8>().ok()?;
            if (1..=24).contains(&number) {
                Some(format!("f{number}"))
            } else {
                None
            }
        }
        _ => None,
    }
}
