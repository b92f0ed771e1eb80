/// Turn a type-style name into a display name by inserting a space before
/// each capital that starts a new word.
///
/// `ComponentNode` becomes `Component Node`, `HTTPServer` becomes
/// `HTTP Server`. Blank input yields an empty string.
pub fn humanize(name: &str) -> String {
    if name.trim().is_empty() {
        return String::new();
    }

    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() * 2);
    out.push(chars[0]);

    for (index, &current) in chars.iter().enumerate().skip(1) {
        let previous = chars[index - 1];
        let next_is_lower = chars
            .get(index + 1)
            .is_some_and(|next| !next.is_uppercase());
        let after_lower = previous != ' ' && !previous.is_uppercase();
        let ends_acronym = previous.is_uppercase() && next_is_lower;

        if current.is_uppercase() && (after_lower || ends_acronym) {
            out.push(' ');
        }
        out.push(current);
    }

    out
}
