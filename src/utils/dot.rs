//! Graphviz helpers shared by the control graph and structural tree dumps.

/// Escapes a string for use inside a quoted DOT label.
///
/// Statement text contains operators such as `<` and quoted section names, both
/// of which carry meaning in DOT.
///
/// # Examples
///
/// ```rust
/// use shcore::utils::escape_dot;
///
/// assert_eq!(escape_dot("t0 := a < b"), "t0 := a \\< b");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
}

/// Joins label lines into one left-justified DOT label body.
///
/// Every line is escaped and terminated by `\l`, so multi-statement blocks
/// render as a left-aligned listing instead of centered text.
#[must_use]
pub fn dot_lines<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines.into_iter().fold(String::new(), |mut acc, line| {
        acc.push_str(&escape_dot(line.as_ref()));
        acc.push_str("\\l");
        acc
    })
}
