use std::borrow::Cow;

#[inline]
fn needs_escape(c: u8) -> bool {
    c == b'\\' || c == b'*' || c == b'(' || c == b')' || c == 0
}

fn push_escaped(output: &mut String, c: u8) {
    #[inline]
    fn xdigit(c: u8) -> char {
        (c + if c < 10 { b'0' } else { b'a' - 10 }) as char
    }

    output.push('\\');
    output.push(xdigit(c >> 4));
    output.push(xdigit(c & 0xF));
}

/// Escape a filter literal.
///
/// Literal values appearing in an LDAP filter can contain any character,
/// but some characters (parentheses, asterisk, backslash, NUL) must be
/// escaped in the filter's string representation. This function does the
/// escaping.
///
/// The argument, `lit`, can be owned or borrowed. The function doesn't
/// allocate the return value unless there's need to escape the input.
pub fn ldap_escape<'a, S: Into<Cow<'a, str>>>(lit: S) -> Cow<'a, str> {
    let lit = lit.into();
    if !lit.bytes().any(needs_escape) {
        return lit;
    }
    let mut output = String::with_capacity(lit.len() + 12);
    for c in lit.chars() {
        if c.is_ascii() && needs_escape(c as u8) {
            push_escaped(&mut output, c as u8);
        } else {
            output.push(c);
        }
    }
    Cow::Owned(output)
}

/// Escape an assertion value for the string form of a filter.
///
/// Values which aren't UTF-8 have all their non-ASCII bytes escaped.
pub(crate) fn escape_value(val: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(val) {
        Ok(s) => ldap_escape(s),
        Err(_) => {
            let mut output = String::with_capacity(val.len() * 3);
            for &c in val {
                if c.is_ascii() && !needs_escape(c) {
                    output.push(c as char);
                } else {
                    push_escaped(&mut output, c);
                }
            }
            Cow::Owned(output)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ldap_escape_none() {
        assert!(matches!(ldap_escape("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn ldap_escape_specials() {
        assert_eq!(ldap_escape("a*b(c)d\\e\0"), "a\\2ab\\28c\\29d\\5ce\\00");
    }

    #[test]
    fn ldap_escape_keeps_unicode() {
        assert_eq!(ldap_escape("\u{107}*"), "\u{107}\\2a");
    }

    #[test]
    fn escape_binary_value() {
        assert_eq!(escape_value(&[0x01, b'*', 0xC0]), "\u{1}\\2a\\c0");
    }
}
