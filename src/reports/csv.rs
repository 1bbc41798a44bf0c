//! CSV export that opens cleanly in Excel: UTF-8 BOM, comma separator,
//! CRLF line endings and RFC 4180 quoting.

const BOM: &str = "\u{feff}";

#[derive(Debug)]
pub struct CsvWriter {
    buf: String,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
        || field.starts_with(' ')
        || field.ends_with(' ')
}

fn push_field(buf: &mut String, field: &str) {
    if needs_quotes(field) {
        buf.push('"');
        buf.push_str(&field.replace('"', "\"\""));
        buf.push('"');
    } else {
        buf.push_str(field);
    }
}

impl CsvWriter {
    pub fn new() -> Self {
        Self {
            buf: BOM.to_string(),
        }
    }

    pub fn row<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            push_field(&mut self.buf, field.as_ref());
        }
        self.buf.push_str("\r\n");
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(rows: &[&[&str]]) -> String {
        let mut w = CsvWriter::new();
        for r in rows {
            w.row(r.iter());
        }
        String::from_utf8(w.into_bytes()).unwrap()
    }

    #[test]
    fn starts_with_bom_and_uses_crlf() {
        let out = render(&[&["Kode", "Total"], &["INV-1", "1000"]]);
        assert!(out.starts_with('\u{feff}'));
        assert_eq!(&out[3..], "Kode,Total\r\nINV-1,1000\r\n");
    }

    #[test]
    fn quotes_special_fields() {
        let out = render(&[&["a,b", "say \"hi\"", "line\nbreak", " pad", "plain"]]);
        assert_eq!(
            &out[3..],
            "\"a,b\",\"say \"\"hi\"\"\",\"line\nbreak\",\" pad\",plain\r\n"
        );
    }

    #[test]
    fn empty_fields_stay_empty() {
        let out = render(&[&["", "x", ""]]);
        assert_eq!(&out[3..], ",x,\r\n");
    }
}
