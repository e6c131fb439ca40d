// Text splice of the `["weather"]` block, used by older tooling and kept as
// the `Textual` strategy. The rest of the document is never parsed.
//
// The match is greedy and spans lines: it runs from the first `["weather"]`
// to the last closing marker. A document whose later blocks also carry the
// closing phrase is cut too far; the marker count check after the splice
// catches the cases where that leaves more or fewer than one marker.
use std::borrow::Cow;

use fancy_regex::Regex;
use tracing::debug;

use crate::error::SubstitutionError;

pub const CLOSING_MARKER: &str = r#"end of ["weather"]"#;

const WEATHER_BLOCK: &str = r#"(?s)\["weather"\].*(?:end of \["weather"\])"#;

/// Replaces the weather block of `mission` with `template`, verbatim.
/// A template without its own closing marker gets ` -- end of ["weather"]`
/// appended so the document keeps exactly one.
pub fn replace_weather_block(mission: &str, template: &str) -> Result<String, SubstitutionError> {
    let re = Regex::new(WEATHER_BLOCK)?;
    let found = re.find(mission)?.ok_or(SubstitutionError::BlockNotFound)?;
    let span = found.start()..found.end();
    debug!(start = span.start, end = span.end, "weather block located");

    let replacement: Cow<'_, str> = if template.contains(CLOSING_MARKER) {
        Cow::Borrowed(template)
    } else {
        Cow::Owned(format!("{} -- {}", template.trim_end(), CLOSING_MARKER))
    };
    let mut out = mission.to_string();
    out.replace_range(span, &replacement);

    let count = out.matches(CLOSING_MARKER).count();
    if count != 1 {
        return Err(SubstitutionError::ClosingMarker { count });
    }
    // the spliced text must still read as a weather block
    if !re.is_match(&out)? {
        return Err(SubstitutionError::BlockNotFound);
    }
    Ok(out)
}
