/// One position report for one tag, as decoded from the serial stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub tag_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

const RECORD_KIND: &str = "POS";
const MIN_FIELDS: usize = 6;

/// Parses a `POS,<index>,<tag>,<x>,<y>,<z>[,...]` line.
///
/// Anything else, including lines with unparsable or non-finite numbers,
/// yields `None`.
pub fn parse_line(line: &str) -> Option<Sample> {
    let mut fields = line.trim().split(',').map(str::trim);
    let fields: [&str; MIN_FIELDS] = std::array::from_fn(|_| fields.next().unwrap_or(""));
    let [kind, _index, tag_id, x, y, z] = fields;
    if kind != RECORD_KIND || tag_id.is_empty() {
        return None;
    }
    let coord = |s: &str| s.parse::<f64>().ok().filter(|v| v.is_finite());
    Some(Sample {
        tag_id: tag_id.to_string(),
        x: coord(x)?,
        y: coord(y)?,
        z: coord(z)?,
    })
}

/// Lossy ASCII-ish decode of a raw line, as received from the port.
pub fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .collect::<String>()
        .trim()
        .to_string()
}
