use once_cell::sync::Lazy;
use regex::Regex;

/// Optional trailing title marker (" t00"); the lazy prefix leaves it to the group
static TITLE_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.*?)(\st\d+)?$").expect("title marker pattern is valid"));

/// Split a filename into stem and extension (extension keeps its dot).
///
/// Leading dots are part of the stem, so `.hidden` has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let body_start = name.len() - name.trim_start_matches('.').len();
    match name[body_start..].rfind('.') {
        Some(pos) => name.split_at(body_start + pos),
        None => (name, ""),
    }
}

/// Upper-case the first letter of every run of letters, lower-case the rest
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// Turn a raw ripped filename into a human-readable title, keeping the extension.
///
/// `THE_GREAT_MOVIE_t00.mkv` becomes `The Great Movie.mkv`.
pub fn normalize_rip_name(name: &str) -> String {
    let (stem, ext) = split_extension(name);
    let titled = title_case(&stem.replace('_', " "));

    let title = TITLE_MARKER_RE
        .captures(&titled)
        .and_then(|caps| caps.get(1))
        .map_or(titled.as_str(), |m| m.as_str());

    format!("{}{}", title, ext)
}
