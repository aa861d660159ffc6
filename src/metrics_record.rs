use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsKind {
    Request,
    Response,
}

impl MetricsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricsKind::Request => "request",
            MetricsKind::Response => "response",
        }
    }
}

impl fmt::Display for MetricsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sizes are in bytes, times in milliseconds.
/// `None` means the value was never observed during the lifecycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MetricsRecord {
    pub host: Option<String>,
    pub header_size: Option<usize>,
    pub body_size: usize,
    pub first_chunk_size: Option<usize>,
    pub first_chunk_transfer_time: Option<u64>,
    pub connect_time: Option<u64>,
    pub total_transfer_time: Option<u64>,
    pub status_code: Option<u16>,
}

impl MetricsRecord {
    pub fn new() -> Self {
        Self::default()
    }
}

fn write_bytes(f: &mut fmt::Formatter<'_>, name: &str, value: Option<usize>) -> fmt::Result {
    match value {
        Some(value) => writeln!(f, "  {:<26}{:>10} bytes", name, value),
        None => writeln!(f, "  {:<26}N/A", name),
    }
}

fn write_ms(f: &mut fmt::Formatter<'_>, name: &str, value: Option<u64>) -> fmt::Result {
    match value {
        Some(value) => writeln!(f, "  {:<26}{:>10} ms", name, value),
        None => writeln!(f, "  {:<26}N/A", name),
    }
}

impl fmt::Display for MetricsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host.as_ref() {
            Some(host) => writeln!(f, "  {:<26}{}", "Host:", host)?,
            None => writeln!(f, "  {:<26}N/A", "Host:")?,
        }

        match self.status_code {
            Some(status_code) => writeln!(f, "  {:<26}{:>10}", "Status code:", status_code)?,
            None => writeln!(f, "  {:<26}N/A", "Status code:")?,
        }

        write_bytes(f, "Header size:", self.header_size)?;
        write_bytes(f, "Body size:", Some(self.body_size))?;
        write_bytes(f, "First chunk size:", self.first_chunk_size)?;
        write_ms(f, "Connect time:", self.connect_time)?;
        write_ms(f, "First chunk transfer time:", self.first_chunk_transfer_time)?;
        write_ms(f, "Total transfer time:", self.total_transfer_time)?;

        Ok(())
    }
}
