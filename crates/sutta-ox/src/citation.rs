use serde::{Deserialize, Serialize};

/// Sub-fields of a completed `<citation>` block.
///
/// Parsing never fails; a block missing required parts is reported through
/// [`CitationFields::is_valid`] so it can still be rendered on a best-effort
/// basis.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationFields {
    pub verse: Option<String>,
    pub pali: Option<String>,
    pub translation: Option<String>,
}

impl CitationFields {
    pub fn parse(raw: &str) -> Self {
        Self {
            verse: extract_tag(raw, "verse"),
            pali: extract_tag(raw, "pali"),
            translation: extract_tag(raw, "translation"),
        }
    }

    /// A verse reference plus at least one of the Pali text or translation.
    pub fn is_valid(&self) -> bool {
        self.verse.is_some() && (self.pali.is_some() || self.translation.is_some())
    }
}

/// Trimmed text between the first `<name>` and the following `</name>`.
/// Empty content counts as absent.
fn extract_tag(raw: &str, name: &str) -> Option<String> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");

    let start = raw.find(&open)? + open.len();
    let len = raw[start..].find(&close)?;
    let inner = raw[start..start + len].trim();
    (!inner.is_empty()).then(|| inner.to_string())
}
