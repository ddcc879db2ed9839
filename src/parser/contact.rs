use std::sync::LazyLock;

use fancy_regex::Regex;
use tracing::debug;

// A space not preceded by a colon. "Phone: 555-1234" stays one segment.
static SEGMENT_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?<!:) ").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Phone,
    Fax,
    Email,
}

impl Label {
    const ALL: [Label; 3] = [Label::Phone, Label::Fax, Label::Email];

    fn name(self) -> &'static str {
        match self {
            Label::Phone => "Phone",
            Label::Fax => "Fax",
            Label::Email => "Email",
        }
    }

    /// Recognise a label token: "Phone", "Phone:" or "Phone:555-1234".
    /// Returns the label and any value glued to it.
    fn parse(token: &str) -> Option<(Label, Option<&str>)> {
        Self::ALL.into_iter().find_map(|label| {
            let rest = token.strip_prefix(label.name())?;
            match rest.strip_prefix(':') {
                _ if rest.is_empty() => Some((label, None)),
                Some("") => Some((label, None)),
                Some(value) => Some((label, Some(value))),
                None => None,
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfo {
    pub phone: String,
    pub fax: String,
    pub email: String,
}

impl ContactInfo {
    fn slot(&mut self, label: Label) -> &mut String {
        match label {
            Label::Phone => &mut self.phone,
            Label::Fax => &mut self.fax,
            Label::Email => &mut self.email,
        }
    }
}

/// Pull phone, fax and email out of one normalized line of "Label Value" text.
///
/// Each value belongs to the label right before it. A label followed directly
/// by another label keeps its field empty. A bare label at the end of one
/// segment takes its value from the next segment ("Phone 555-1234").
pub fn extract_contact(text: &str) -> ContactInfo {
    let mut info = ContactInfo::default();
    let mut current: Option<Label> = None;

    for segment in split_segments(text) {
        let mut assigned = false;
        for token in segment.split_whitespace() {
            match Label::parse(token) {
                Some((label, glued)) => {
                    current = Some(label);
                    assigned = false;
                    if let Some(value) = glued {
                        *info.slot(label) = value.to_string();
                        assigned = true;
                    }
                }
                None => {
                    if let Some(label) = current {
                        *info.slot(label) = token.to_string();
                        assigned = true;
                    }
                }
            }
        }
        if assigned {
            current = None;
        }
    }

    if info == ContactInfo::default() && !text.is_empty() {
        debug!("No contact labels recognised in {:?}", text);
    }
    info
}

fn split_segments(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for m in SEGMENT_BREAK_RE.find_iter(text) {
        let Ok(m) = m else { break };
        segments.push(&text[start..m.start()]);
        start = m.end();
    }
    segments.push(&text[start..]);
    segments.retain(|s| !s.trim().is_empty());
    segments
}
