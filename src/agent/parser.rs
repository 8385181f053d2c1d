/// Reasoning fields recovered from one completion. Any field may be
/// absent; an empty set means the completion carried no protocol markers
/// at all and should be answered verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasoningFields {
    pub thought: Option<String>,
    pub action: Option<String>,
    pub observation: Option<String>,
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Thought,
    Action,
    Observation,
    Answer,
}

impl Marker {
    const ALL: [Marker; 4] = [
        Marker::Thought,
        Marker::Action,
        Marker::Observation,
        Marker::Answer,
    ];

    /// Extraction order: `Answer` anchors the parse, earlier fields are
    /// then read from the shrinking prefix.
    const PRIORITY: [Marker; 4] = [
        Marker::Answer,
        Marker::Observation,
        Marker::Action,
        Marker::Thought,
    ];

    fn token(self) -> &'static str {
        match self {
            Marker::Thought => "Thought:",
            Marker::Action => "Action:",
            Marker::Observation => "Observation:",
            Marker::Answer => "Answer:",
        }
    }
}

/// All marker occurrences in the text, ordered by position. Collected in
/// one pass so field extraction never re-scans mutated text.
fn scan_markers(text: &str) -> Vec<(Marker, usize)> {
    let mut occurrences = Vec::new();
    for marker in Marker::ALL {
        for (pos, _) in text.match_indices(marker.token()) {
            occurrences.push((marker, pos));
        }
    }
    occurrences.sort_by_key(|(_, pos)| *pos);
    occurrences
}

/// Recovers reasoning fields from free-form completion text.
///
/// The right-most `Answer:` anchors the parse; each earlier field is then
/// read from the right-most occurrence of its marker inside the remaining
/// prefix. Reading outermost-first means a marker keyword quoted inside a
/// field's value can never truncate an earlier field.
pub fn parse(text: &str) -> ReasoningFields {
    let occurrences = scan_markers(text);
    let mut fields = ReasoningFields::default();
    let mut prefix_end = text.len();

    for marker in Marker::PRIORITY {
        let found = occurrences
            .iter()
            .rev()
            .find(|(m, pos)| *m == marker && *pos < prefix_end);

        let Some((_, pos)) = found else {
            if marker == Marker::Answer {
                // no anchor: the completion carries no parsable fields
                return ReasoningFields::default();
            }
            continue;
        };

        let value_start = pos + marker.token().len();
        let raw = &text[value_start..prefix_end];
        let line = raw.split('\n').next().unwrap_or(raw).trim();
        if !line.is_empty() {
            let value = Some(line.to_string());
            match marker {
                Marker::Thought => fields.thought = value,
                Marker::Action => fields.action = value,
                Marker::Observation => fields.observation = value,
                Marker::Answer => fields.answer = value,
            }
        }

        prefix_end = *pos;
    }

    fields
}
