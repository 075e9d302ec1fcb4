use sluice_core::SqlWriter;

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresSqlWriter {}

impl SqlWriter for PostgresSqlWriter {
    fn write_parameter_marker(&self, out: &mut String, index: usize) {
        out.push('$');
        out.push_str(itoa::Buffer::new().format(index));
    }

    fn supports_returning(&self) -> bool {
        true
    }
}
