//! Parsers for `sadf -p` output.
//!
//! `sadf -p` prints one tab-separated record per line:
//!
//! ```text
//! hostname  interval  timestamp  device  field  value
//! ```
//!
//! These are pure functions so they can be tested with string inputs.

/// Number of tab-separated columns in every record.
pub const RECORD_FIELDS: usize = 6;

/// Device column value meaning "no device".
pub const NO_DEVICE: &str = "-";

/// Error type for record parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// One parsed extraction record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Device identifier, `None` when the record carries no device.
    pub device: Option<String>,
    /// Raw field name as printed by `sadf`.
    pub field: String,
    pub value: f64,
}

impl Record {
    /// Key used to group records of one device. Records without a device
    /// share the `"-"` key.
    pub fn device_key(&self) -> &str {
        self.device.as_deref().unwrap_or(NO_DEVICE)
    }

    /// The field name made safe for use as a measurement or field name.
    pub fn sanitized_field(&self) -> String {
        escape_field(&self.field)
    }
}

/// Replaces characters that are reserved in field names.
///
/// `%` becomes `pct_` and `/` becomes `_per_`, so `%util` turns into
/// `pct_util` and `rd_sec/s` into `rd_sec_per_s`.
pub fn escape_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '%' => out.push_str("pct_"),
            '/' => out.push_str("_per_"),
            c => out.push(c),
        }
    }
    out
}

/// Parses one line of `sadf -p` output.
///
/// The line must have exactly six tab-separated columns and a numeric value
/// column. Anything else is an error; callers stop at the first bad record.
pub fn parse_record(line: &str) -> Result<Record, ParseError> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() != RECORD_FIELDS {
        return Err(ParseError::new(format!(
            "wrong number of fields: expected {}, got {}",
            RECORD_FIELDS,
            columns.len()
        )));
    }

    let value: f64 = columns[5]
        .parse()
        .map_err(|_| ParseError::new(format!("invalid value {:?}", columns[5])))?;

    let device = match columns[3] {
        NO_DEVICE => None,
        dev => Some(dev.to_string()),
    };

    Ok(Record {
        device,
        field: columns[4].to_string(),
        value,
    })
}
