//! Filename derivation, sanitization, and collision safety.
//!
//! Output filenames cross two hostile boundaries: arbitrary user-supplied
//! input names, and whatever filesystem the artifacts land on. Every name
//! a producer emits goes through [`sanitize`] (Windows-safe character set,
//! reserved device names, length cap) and, where several outputs can share
//! a stem, [`ensure_unique`].

use std::collections::HashSet;

/// Maximum length of a sanitized name (without extension).
const MAX_STEM_LEN: usize = 80;

/// Strip directory components and make `input` safe on every mainstream
/// filesystem: forbidden characters become `_`, runs of `_` collapse,
/// leading/trailing `_ .` and spaces are trimmed, overlong names are
/// truncated, and reserved Windows device names get a trailing `_`.
pub fn sanitize(input: &str) -> String {
    let base = input
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(input);

    let mut cleaned: String = base
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "untitled".to_string();
    }

    // Collapse runs of underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let mut final_name = compacted;
    if final_name.len() > MAX_STEM_LEN {
        let mut cut = MAX_STEM_LEN;
        while !final_name.is_char_boundary(cut) {
            cut -= 1;
        }
        final_name.truncate(cut);
    }
    if is_reserved_windows_name(stem(&final_name)) {
        final_name.push('_');
    }
    final_name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// The filename without its final extension (`photo.tar.gz` → `photo.tar`).
pub fn stem(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => &filename[..pos],
        _ => filename,
    }
}

/// The final extension, lowercased, without the dot. Empty if none.
pub fn extension(filename: &str) -> String {
    match filename.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < filename.len() => {
            filename[pos + 1..].to_ascii_lowercase()
        }
        _ => String::new(),
    }
}

/// Derive an output name from an input name and a new extension:
/// sanitized stem plus the extension (`jpg` is normalised to `jpeg`).
pub fn derive_output_name(input_name: &str, new_extension: &str) -> String {
    let ext = if new_extension.eq_ignore_ascii_case("jpg") {
        "jpeg"
    } else {
        new_extension
    };
    format!("{}.{}", sanitize(stem(input_name)), ext)
}

/// Make `candidate` unique against `used`, appending `-2`, `-3`, … before
/// the extension on collision, and record the final name in `used`.
pub fn ensure_unique(used: &mut HashSet<String>, candidate: &str) -> String {
    if used.insert(candidate.to_string()) {
        return candidate.to_string();
    }

    let stem = stem(candidate);
    let ext = extension(candidate);
    let mut n = 2u32;
    loop {
        let next = if ext.is_empty() {
            format!("{stem}-{n}")
        } else {
            format!("{stem}-{n}.{ext}")
        };
        if used.insert(next.clone()) {
            return next;
        }
        n += 1;
    }
}

/// Human-readable byte count (`1536` → `"1.5 KB"`).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exp = (bytes as f64).log(1024.0).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    if exp == 0 {
        format!("{bytes} B")
    } else {
        format!("{:.1} {}", (value * 10.0).round() / 10.0, UNITS[exp])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_forbidden_chars() {
        assert_eq!(sanitize("a/b\\c:d*e"), "a_b_c_d_e");
        assert_eq!(sanitize("  spaced  "), "spaced");
        assert_eq!(sanitize("***"), "untitled");
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("C:\\temp\\file.png"), "file.png");
    }

    #[test]
    fn sanitize_collapses_underscores() {
        assert_eq!(sanitize("a???b"), "a_b");
    }

    #[test]
    fn sanitize_guards_reserved_names() {
        assert_eq!(sanitize("CON"), "CON_");
        assert_eq!(sanitize("con.png"), "con.png_");
        assert_eq!(sanitize("console.png"), "console.png");
    }

    #[test]
    fn sanitize_truncates_on_char_boundary() {
        let long = "é".repeat(100);
        let out = sanitize(&long);
        assert!(out.len() <= MAX_STEM_LEN);
        assert!(out.chars().all(|c| c == 'é'));
    }

    #[test]
    fn stem_and_extension() {
        assert_eq!(stem("photo.PNG"), "photo");
        assert_eq!(extension("photo.PNG"), "png");
        assert_eq!(stem(".hidden"), ".hidden");
        assert_eq!(extension(".hidden"), "");
        assert_eq!(stem("noext"), "noext");
        assert_eq!(extension("noext"), "");
        assert_eq!(stem("a.tar.gz"), "a.tar");
        assert_eq!(extension("a.tar.gz"), "gz");
    }

    #[test]
    fn derive_normalises_jpg() {
        assert_eq!(derive_output_name("photo.png", "jpg"), "photo.jpeg");
        assert_eq!(derive_output_name("photo.png", "webp"), "photo.webp");
    }

    #[test]
    fn ensure_unique_appends_sequence() {
        let mut used = HashSet::new();
        assert_eq!(ensure_unique(&mut used, "a.png"), "a.png");
        assert_eq!(ensure_unique(&mut used, "a.png"), "a-2.png");
        assert_eq!(ensure_unique(&mut used, "a.png"), "a-3.png");
        assert_eq!(ensure_unique(&mut used, "b"), "b");
        assert_eq!(ensure_unique(&mut used, "b"), "b-2");
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
