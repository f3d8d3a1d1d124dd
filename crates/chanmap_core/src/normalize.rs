/// Strips a Hungarian sublative suffix from a spoken channel name ("rtl-re" becomes "rtl").
///
/// Speech engines sometimes drop the hyphen ("hbora"), so a bare `re`/`ra` ending is stripped
/// as well when something remains. Names that genuinely end in `re` or `ra` get truncated by the
/// second rule; only apply this to speech input.
pub fn normalize(raw: &str) -> String {
    let raw = raw.trim().to_lowercase();

    if let Some(stem) = raw.strip_suffix("-re").or_else(|| raw.strip_suffix("-ra")) {
        return stem.to_string();
    }

    if raw.chars().count() > 2 {
        if let Some(stem) = raw.strip_suffix("re").or_else(|| raw.strip_suffix("ra")) {
            return stem.to_string();
        }
    }

    raw
}
