//! Identifier quoting
//! ------------------
//! Single source of truth for turning arbitrary strings into SQLite-safe quoted
//! identifiers. Everything that builds SQL text goes through here.

/// Quote an identifier for interpolation into SQL text.
/// The result is wrapped in double quotes and every embedded `"` is doubled,
/// so any input (including empty or quote-only strings) yields one identifier.
pub fn quote_ident(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 2);
    out.push('"');
    for ch in ident.chars() {
        if ch == '"' { out.push('"'); }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Quote each identifier and join with `, ` for column lists.
pub fn quote_idents<I, S>(idents: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    idents.into_iter().map(|s| quote_ident(s.as_ref())).collect::<Vec<_>>().join(", ")
}
