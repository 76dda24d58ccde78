//! Accept-Encoding parsing and "can the recorded encoding be served as-is" checks.

/// One coding from an Accept-Encoding header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptEncoding {
    /// Lower-cased coding name, or `*`.
    pub encoding: String,
    pub quality: f32,
    /// The quality was given explicitly and is zero ("not acceptable").
    pub explicit_zero: bool,
}

impl AcceptEncoding {
    fn acceptable(&self) -> bool {
        !self.explicit_zero && self.quality > 0.0
    }
}

/// Parse an Accept-Encoding header. Absent or empty headers give an empty list.
pub fn parse_accept_encoding(header: Option<&str>) -> Vec<AcceptEncoding> {
    let Some(header) = header else {
        return Vec::new();
    };
    header
        .split(',')
        .filter_map(|item| {
            let mut parts = item.split(';');
            let encoding = parts.next()?.trim().to_ascii_lowercase();
            if encoding.is_empty() {
                return None;
            }
            let mut quality = 1.0f32;
            let mut explicit_zero = false;
            for param in parts {
                let Some((name, value)) = param.split_once('=') else {
                    continue;
                };
                if name.trim().eq_ignore_ascii_case("q") {
                    // unparseable weights are treated as "not acceptable"
                    quality = value.trim().parse::<f32>().unwrap_or(0.0);
                    explicit_zero = quality <= 0.0;
                }
            }
            Some(AcceptEncoding {
                encoding,
                quality,
                explicit_zero,
            })
        })
        .collect()
}

/// Decide whether a response recorded with `original_encodings` may be sent
/// without re-encoding to a client that sent `accept_encoding`.
///
/// Every non-identity encoding must be acceptable. An exact coding entry
/// takes precedence over `*`; a coding with neither is rejected.
pub fn can_serve_original_encoding(original_encodings: &[String], accept_encoding: Option<&str>) -> bool {
    let required: Vec<String> = original_encodings
        .iter()
        .map(|e| e.trim().to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e != "identity")
        .collect();
    if required.is_empty() {
        return true;
    }
    let accepted = parse_accept_encoding(accept_encoding);
    required.iter().all(|encoding| {
        let exact = accepted.iter().find(|a| a.encoding == *encoding);
        match exact {
            Some(entry) => entry.acceptable(),
            None => accepted
                .iter()
                .find(|a| a.encoding == "*")
                .is_some_and(AcceptEncoding::acceptable),
        }
    })
}
