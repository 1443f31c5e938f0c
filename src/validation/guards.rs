//! Lexical guards applied before parsing

/// Finds the first SQL comment outside string literals and quoted identifiers.
pub(crate) fn find_comment(sql: &str) -> Option<&'static str> {
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            // A doubled quote inside a literal closes and reopens, which nets out the same.
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '-' if chars.peek() == Some(&'-') => return Some("line comment (--)"),
                '/' if chars.peek() == Some(&'*') => return Some("block comment (/* */)"),
                _ => {}
            },
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_comments_outside_literals() {
        assert_eq!(find_comment("SELECT 1 -- hi"), Some("line comment (--)"));
        assert_eq!(find_comment("SELECT /* x */ 1"), Some("block comment (/* */)"));
        assert_eq!(find_comment("SELECT '--not a comment' FROM t"), None);
        assert_eq!(find_comment("SELECT 'it''s -- fine'"), None);
        assert_eq!(find_comment("SELECT \"a--b\" FROM t"), None);
        assert_eq!(find_comment("SELECT 10 - -1"), None);
    }
}
