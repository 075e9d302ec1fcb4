use sluice_core::SqlWriter;

#[derive(Debug, Default, Clone, Copy)]
pub struct MySQLSqlWriter {}

impl SqlWriter for MySQLSqlWriter {
    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('`');
        self.write_escaped(out, value, '`', "``");
        out.push('`');
    }

    /// Backslash is an escape character in MySQL string literals.
    fn write_value_string(&self, out: &mut String, value: &str) {
        out.reserve(value.len() + 2);
        out.push('\'');
        for c in value.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                '\0' => out.push_str("\\0"),
                c => out.push(c),
            }
        }
        out.push('\'');
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        out.push_str(&hex::encode_upper(value));
        out.push('\'');
    }

    fn write_default_values(&self, out: &mut String) {
        out.push_str(" () VALUES ()");
    }
}
