use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// `s01e05`, `s01d02_t03`, optionally followed by `x2` for multi-episode titles
static RIP_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)s(?P<season>\d+)(?:e(?P<episode>\d+)|d(?P<disc>\d+)_t(?P<title>\d+))(?:x(?P<qty>\d+))?")
        .expect("rip name pattern is valid")
});

/// Which identity a rip filename carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenamePattern {
    /// Already numbered by episode (`s01e05`)
    Episode { season: u32, episode: u32 },
    /// Disc/title rip (`s01d02_t03`)
    DiscTitle { season: u32, disc: u32, title: u32 },
    /// Name does not follow the rip grammar
    Unrecognized,
}

/// Result of parsing a rip filename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFilename {
    pub pattern: FilenamePattern,
    /// Number of episodes the file spans (at least 1)
    pub qty: u32,
}

impl ParsedFilename {
    pub fn unrecognized() -> Self {
        Self { pattern: FilenamePattern::Unrecognized, qty: 1 }
    }

    pub fn is_recognized(&self) -> bool {
        self.pattern != FilenamePattern::Unrecognized
    }
}

/// Parse a filename against the rip naming grammar.
///
/// The marker may appear anywhere in the name. Numbers too large for `u32`
/// make the name unrecognized.
pub fn parse_filename(name: &str) -> ParsedFilename {
    RIP_NAME_RE
        .captures(name)
        .and_then(|caps| parse_captures(&caps))
        .unwrap_or_else(ParsedFilename::unrecognized)
}

fn parse_captures(caps: &Captures<'_>) -> Option<ParsedFilename> {
    let number = |group: &str| caps.name(group).map(|m| m.as_str().parse::<u32>());

    let season = number("season")?.ok()?;
    let pattern = match number("episode") {
        Some(episode) => FilenamePattern::Episode { season, episode: episode.ok()? },
        None => FilenamePattern::DiscTitle {
            season,
            disc: number("disc")?.ok()?,
            title: number("title")?.ok()?,
        },
    };
    // x0 means a single episode too
    let qty = match number("qty") {
        Some(qty) => qty.ok()?.max(1),
        None => 1,
    };

    Some(ParsedFilename { pattern, qty })
}
