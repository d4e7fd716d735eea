// src/platform/table.rs
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static ANSI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1B\[[0-9;]*[A-Za-z]").unwrap());

// Lines made of nothing but box-drawing, dashes, pipes and whitespace.
static BORDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s|\-=+─═│║╔╗╚╝╠╣╦╩╬]+$").unwrap());

static COLUMN_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[│|]").unwrap());

static ENV_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9_]+$").unwrap());

pub fn strip_ansi(text: &str) -> String {
    ANSI.replace_all(text, "").into_owned()
}

/// Extract KEY/value pairs from a box-drawn CLI table. Decoration lines are
/// dropped, the first two columns of each remaining line become key and
/// value, and only uppercase env-style keys are accepted.
pub fn parse_table(text: &str) -> HashMap<String, String> {
    let text = strip_ansi(text);
    let mut vars = HashMap::new();

    for line in text.lines() {
        if BORDER.is_match(line) {
            continue;
        }
        let mut line = line.trim();
        line = line.strip_prefix('║').unwrap_or(line);
        line = line.strip_suffix('║').unwrap_or(line);
        let line = line.trim();

        let parts: Vec<&str> = COLUMN_SEP
            .split(line)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() < 2 {
            continue;
        }
        if ENV_KEY.is_match(parts[0]) {
            vars.insert(parts[0].to_string(), parts[1].to_string());
        }
    }

    vars
}
