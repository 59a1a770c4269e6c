//! Minimal RFC 4180 line handling for sensor exports.

/// Split one CSV line into fields. Quoted fields may contain commas and
/// doubled quotes; anything after a closing quote up to the next comma is
/// ignored.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;
    let mut closed = false;

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                    closed = true;
                }
            }
            '"' if field.is_empty() && !closed => quoted = true,
            ',' if !quoted => {
                fields.push(std::mem::take(&mut field));
                closed = false;
            }
            _ if closed => {}
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Join fields into one line, quoting those that need it.
pub fn join_fields<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::new();
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        let f = f.as_ref();
        if f.contains(',') || f.contains('"') || f.contains('\n') {
            line.push('"');
            line.push_str(&f.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(f);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_and_quoted() {
        assert_eq!(split_line("1,2.5,x"), vec!["1", "2.5", "x"]);
        assert_eq!(split_line(r#""a,b","say ""hi""",c"#), vec!["a,b", r#"say "hi""#, "c"]);
        assert_eq!(split_line("a,,"), vec!["a", "", ""]);
        assert_eq!(split_line(""), vec![""]);
    }

    #[test]
    fn test_join_quotes_when_needed() {
        assert_eq!(join_fields(&["1", "a,b", "q\""]), r#"1,"a,b","q""""#);
    }
}
