// Player name normalization.
//
// Every equality and similarity comparison downstream runs on the output of
// `normalize_name`, so it must be deterministic, side-effect-free, and
// idempotent: normalize(normalize(x)) == normalize(x).

/// Generational suffixes stripped from the end of a name (case-insensitive).
const SUFFIXES: &[&str] = &["jr", "jr.", "sr", "sr.", "ii", "iii", "iv", "v"];

/// Normalize a player name for comparison.
///
/// - collapses internal whitespace runs and trims
/// - removes apostrophes ("D'Andre" and "DAndre" normalize identically)
/// - joins spaced two-letter initials into dotted form ("A J Brown" and
///   "A. J Brown" become "A.J. Brown"; an already-dotted "A.J." is untouched)
/// - strips a trailing generational suffix (Jr., Sr., II through V)
pub fn normalize_name(name: &str) -> String {
    let collapsed: String = name.split_whitespace().collect::<Vec<_>>().join(" ");
    let no_apostrophes: String = collapsed.chars().filter(|&c| c != '\'').collect();
    let joined = join_initials(&no_apostrophes);
    strip_suffix(&joined)
}

/// True for a token that is a single uppercase letter, optionally dotted
/// ("A" or "A.").
fn is_initial(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(first), None, _) => first.is_ascii_uppercase(),
        (Some(first), Some('.'), None) => first.is_ascii_uppercase(),
        _ => false,
    }
}

/// True for a bare single uppercase letter with no dot.
fn is_bare_initial(token: &str) -> bool {
    token.len() == 1 && token.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// Join consecutive spaced initials into one dotted token. Only fires when a
/// further token (the surname) follows, so a two-letter fragment on its own
/// is left alone.
fn join_initials(name: &str) -> String {
    let tokens: Vec<&str> = name.split(' ').filter(|t| !t.is_empty()).collect();
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if i + 2 < tokens.len() && is_initial(tokens[i]) && is_bare_initial(tokens[i + 1]) {
            if let (Some(first), Some(second)) =
                (tokens[i].chars().next(), tokens[i + 1].chars().next())
            {
                out.push(format!("{first}.{second}."));
                i += 2;
                continue;
            }
        }
        out.push(tokens[i].to_string());
        i += 1;
    }
    out.join(" ")
}

/// Strip one trailing generational suffix, anchored to the end of the name.
/// A name that consists of nothing but a suffix token is left untouched.
fn strip_suffix(name: &str) -> String {
    let tokens: Vec<&str> = name.split(' ').filter(|t| !t.is_empty()).collect();
    if tokens.len() > 1 {
        let last = tokens[tokens.len() - 1].to_lowercase();
        if SUFFIXES.contains(&last.as_str()) {
            return tokens[..tokens.len() - 1].join(" ");
        }
    }
    tokens.join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
