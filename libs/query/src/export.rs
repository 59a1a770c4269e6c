use std::io::Write;

use serde_json::Value;
use timestone_api::ResultTable;

const DELIMITER: char = ',';

/// Write `table` as CSV: a header of column names, then one line per row.
pub fn write_csv<W: Write>(table: &ResultTable, mut out: W) -> std::io::Result<()> {
    let header = table
        .columns
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(out, "{header}")?;

    for row in &table.rows {
        writeln!(out, "{}", csv_line(row))?;
    }
    out.flush()
}

/// One CSV line for a row of typed values, without the line break.
pub fn csv_line(values: &[Value]) -> String {
    let mut line = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            line.push(DELIMITER);
        }
        match value {
            Value::Null => {}
            Value::String(s) => line.push_str(&quote(s)),
            // arrays and objects go out as compact JSON
            other => line.push_str(&quote(&other.to_string())),
        }
    }
    line
}

fn quote(s: &str) -> String {
    if s.contains(DELIMITER) || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_and_nulls() {
        let table = ResultTable {
            columns: vec!["ppt_id".into(), "value".into(), "ok".into()],
            rows: vec![
                vec![json!("fc096"), json!(0.25), json!(true)],
                vec![json!("fc097"), Value::Null, json!(false)],
            ],
        };
        let mut buf = Vec::new();
        write_csv(&table, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "ppt_id,value,ok\nfc096,0.25,true\nfc097,,false\n"
        );
    }

    #[test]
    fn test_quoting() {
        assert_eq!(csv_line(&[json!("a,b"), json!("say \"hi\""), json!("x")]), r#""a,b","say ""hi""",x"#);
        assert_eq!(csv_line(&[json!("two\nlines")]), "\"two\nlines\"");
    }

    #[test]
    fn test_nested_values_are_json() {
        assert_eq!(csv_line(&[json!([1, 2])]), r#""[1,2]""#);
        assert_eq!(csv_line(&[json!({"a": 1})]), r#""{""a"":1}""#);
    }
}
