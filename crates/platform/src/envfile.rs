//! `KEY=value` environment files such as `os-release`

use imgkit_errors::Error;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;
use tracing::warn;

static ENV_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][A-Z_0-9]+)=(.*)$").expect("static regex is valid"));

/// One non-blank, non-comment line of an environment file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvEntry {
    Pair { key: String, value: String },
    Malformed { line_number: usize, line: String },
}

/// Lazily parse `reader` into entries, skipping blanks and `#` comments
pub fn parse_env_pairs<R: BufRead>(reader: R) -> impl Iterator<Item = std::io::Result<EnvEntry>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| match line {
            Ok(line) => parse_line(idx + 1, &line).map(Ok),
            Err(e) => Some(Err(e)),
        })
}

fn parse_line(line_number: usize, line: &str) -> Option<EnvEntry> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let malformed = || EnvEntry::Malformed {
        line_number,
        line: line.to_string(),
    };

    let Some(caps) = ENV_LINE.captures(line) else {
        return Some(malformed());
    };
    let key = caps[1].to_string();
    let raw = &caps[2];

    let value = if raw.starts_with(['"', '\'']) {
        match unquote(raw) {
            Some(value) => value,
            None => return Some(malformed()),
        }
    } else {
        raw.to_string()
    };

    Some(EnvEntry::Pair { key, value })
}

/// Decode a run of quoted literals (`"a" 'b'` is `ab`), optionally followed
/// by a `#` comment; `None` if anything else is left over
fn unquote(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    loop {
        let mut chars = rest.chars();
        match chars.next() {
            Some(quote @ ('"' | '\'')) => rest = unquote_one(chars, quote, &mut out)?,
            _ => return None,
        }

        rest = rest.trim_start();
        if rest.is_empty() || rest.starts_with('#') {
            return Some(out);
        }
    }
}

/// Decode one literal whose opening quote was already consumed, returning
/// the text after its closing quote
fn unquote_one<'a>(
    mut chars: std::str::Chars<'a>,
    quote: char,
    out: &mut String,
) -> Option<&'a str> {
    while let Some(c) = chars.next() {
        match c {
            c if c == quote => return Some(chars.as_str()),
            '\\' => decode_escape(&mut chars, out)?,
            c => out.push(c),
        }
    }

    // unterminated
    None
}

fn decode_escape(chars: &mut std::str::Chars<'_>, out: &mut String) -> Option<()> {
    let c = chars.next()?;
    match c {
        '\n' => {}
        '\\' | '\'' | '"' => out.push(c),
        'a' => out.push('\u{07}'),
        'b' => out.push('\u{08}'),
        'f' => out.push('\u{0c}'),
        'n' => out.push('\n'),
        'r' => out.push('\r'),
        't' => out.push('\t'),
        'v' => out.push('\u{0b}'),
        'x' => out.push(hex_char(chars, 2)?),
        'u' => out.push(hex_char(chars, 4)?),
        'U' => out.push(hex_char(chars, 8)?),
        '0'..='7' => {
            let mut value = c.to_digit(8)?;
            for _ in 0..2 {
                let Some(digit) = chars.clone().next().and_then(|d| d.to_digit(8)) else {
                    break;
                };
                chars.next();
                value = value * 8 + digit;
            }
            out.push(char::from_u32(value)?);
        }
        other => {
            out.push('\\');
            out.push(other);
        }
    }
    Some(())
}

fn hex_char(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let mut value = 0u32;
    for _ in 0..digits {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(value)
}

/// Read an environment file into a map
///
/// Malformed lines are logged and skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn read_env_file(path: impl AsRef<Path>) -> Result<HashMap<String, String>, Error> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io_with_path(&e, path))?;

    let mut vars = HashMap::new();
    for entry in parse_env_pairs(BufReader::new(file)) {
        match entry.map_err(|e| Error::io_with_path(&e, path))? {
            EnvEntry::Pair { key, value } => {
                vars.insert(key, value);
            }
            EnvEntry::Malformed { line_number, line } => {
                warn!("{}:{line_number}: bad line '{line}'", path.display());
            }
        }
    }
    Ok(vars)
}

/// Read `os-release` below `root`, preferring `etc/` over `usr/lib/`
///
/// # Errors
///
/// Returns an error if neither file can be read.
pub fn read_os_release(root: impl AsRef<Path>) -> Result<HashMap<String, String>, Error> {
    let root = root.as_ref();
    let mut path = root.join("etc/os-release");
    if !path.exists() {
        path = root.join("usr/lib/os-release");
    }
    read_env_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(input: &str) -> Vec<EnvEntry> {
        parse_env_pairs(input.as_bytes())
            .collect::<std::io::Result<Vec<_>>>()
            .unwrap()
    }

    fn pair(key: &str, value: &str) -> EnvEntry {
        EnvEntry::Pair {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_parse_mixed_input() {
        let parsed = entries("FOO=bar\n# comment\n\nBAZ=\"q z\"\nbadline\n");
        assert_eq!(
            parsed,
            vec![
                pair("FOO", "bar"),
                pair("BAZ", "q z"),
                EnvEntry::Malformed {
                    line_number: 5,
                    line: "badline".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_key_rules() {
        let parsed = entries("A=1\nlower=1\nAB_9=ok\n  INDENTED=1\n_X=1\n");
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[2], pair("AB_9", "ok"));
        for idx in [0, 1, 3, 4] {
            assert!(matches!(parsed[idx], EnvEntry::Malformed { .. }));
        }
    }

    #[test]
    fn test_unquoted_values_are_kept_verbatim() {
        let parsed = entries("URL=https://x.org/?a=b\nEMPTY=\nTRAIL=v   \n");
        assert_eq!(
            parsed,
            vec![pair("URL", "https://x.org/?a=b"), pair("EMPTY", ""), pair("TRAIL", "v")]
        );
    }

    #[test]
    fn test_quoted_value_escapes() {
        let parsed = entries(concat!(
            "A1='single \"inner\"'\n",
            "B1=\"tab\\there\"\n",
            "C1=\"\\x41\\u00e9\\101\"\n",
            "D1=\"keep \\q\"\n",
            "E1=\"it\\'s\"\n",
        ));
        assert_eq!(
            parsed,
            vec![
                pair("A1", "single \"inner\""),
                pair("B1", "tab\there"),
                pair("C1", "AéA"),
                pair("D1", "keep \\q"),
                pair("E1", "it's"),
            ]
        );
    }

    #[test]
    fn test_adjacent_literals_and_trailing_comment() {
        let parsed = entries(concat!(
            "NAME=\"Fedora\" # release name\n",
            "JOINED='hello' \"world\"\n",
            "TIGHT=\"a\"'b'#c\n",
            "HASH=\"#not a comment\"\n",
        ));
        assert_eq!(
            parsed,
            vec![
                pair("NAME", "Fedora"),
                pair("JOINED", "helloworld"),
                pair("TIGHT", "ab"),
                pair("HASH", "#not a comment"),
            ]
        );
    }

    #[test]
    fn test_broken_quoting_is_malformed() {
        let parsed = entries("A1=\"open\nB1=\"x\" trailing\nC1=\"\\xZZ\"\n");
        assert_eq!(parsed.len(), 3);
        assert!(parsed
            .iter()
            .all(|e| matches!(e, EnvEntry::Malformed { .. })));
    }
}
