use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const EMPTY_QUERY_MESSAGE: &str = "Query is empty. Please enter a valid question.";
pub const EMPTY_POLICY_MESSAGE: &str = "Policy is empty. Please select a policy.";
pub const REFUSAL_MESSAGE: &str =
    "The question is not related to Data Governance. Please ask a relevant question.";
pub const ERROR_PREFIX: &str = "❌ Error:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceVerdict {
    InDomain,
    OutOfDomain,
}

impl RelevanceVerdict {
    pub const IN_DOMAIN_LABEL: &'static str = "yes";
    pub const OUT_OF_DOMAIN_LABEL: &'static str = "no";

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            Self::IN_DOMAIN_LABEL => Some(Self::InDomain),
            Self::OUT_OF_DOMAIN_LABEL => Some(Self::OutOfDomain),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::InDomain => Self::IN_DOMAIN_LABEL,
            Self::OutOfDomain => Self::OUT_OF_DOMAIN_LABEL,
        }
    }

    pub fn is_in_domain(&self) -> bool {
        matches!(self, Self::InDomain)
    }
}

/// The `verdict` field of a response. Requests without documents always report
/// `"no uploads"`, whatever the gate decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseVerdict {
    #[serde(rename = "yes")]
    Yes,
    #[serde(rename = "no")]
    No,
    #[serde(rename = "no uploads")]
    NoUploads,
}

impl ResponseVerdict {
    pub fn for_request(verdict: RelevanceVerdict, has_documents: bool) -> Self {
        match (has_documents, verdict) {
            (false, _) => Self::NoUploads,
            (true, RelevanceVerdict::InDomain) => Self::Yes,
            (true, RelevanceVerdict::OutOfDomain) => Self::No,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub text: String,
    pub filename: String,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filename: filename.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QnaRequest {
    pub query: String,
    #[serde(default)]
    pub policy: String,
    #[serde(default)]
    pub documents: Vec<UploadedDocument>,
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

impl QnaRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = policy.into();
        self
    }

    pub fn with_document(mut self, document: UploadedDocument) -> Self {
        self.documents.push(document);
        self
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn has_documents(&self) -> bool {
        !self.documents.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub query: String,
    pub answer: String,
    pub verdict: ResponseVerdict,
}

pub const MISSING_ALIGNMENT: &str = "unspecified";
pub const MISSING_RATIONALE: &str = "not stated by the model";
pub const MISSING_BODY: &str = "No answer was generated.";

/// Three-part answer produced in policy-only mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyAnswer {
    pub alignment: String,
    pub body: String,
    pub rationale: String,
}

impl PolicyAnswer {
    /// Splits raw model output into its alignment line, body and trailing
    /// `Policy alignment:` line. Only the first non-empty line may carry the
    /// alignment label; every other line the model wrote lands in the body.
    /// Sections the model omitted get placeholders, so [`PolicyAnswer::render`]
    /// always yields all three in order.
    pub fn parse(raw: &str) -> Self {
        let lines: Vec<&str> = raw.lines().collect();

        let alignment = lines
            .iter()
            .position(|line| !line.trim().is_empty())
            .and_then(|i| alignment_value(lines[i]).map(|value| (i, value)));
        let body_start = alignment.as_ref().map_or(0, |(i, _)| i + 1);

        let rationale = lines
            .iter()
            .enumerate()
            .skip(body_start)
            .rev()
            .find_map(|(i, line)| rationale_value(line).map(|value| (i, value)));

        let body = match &rationale {
            Some((at, _)) => lines[body_start..*at]
                .iter()
                .chain(&lines[at + 1..])
                .copied()
                .collect::<Vec<_>>()
                .join("\n"),
            None => lines[body_start..].join("\n"),
        };
        let body = body.trim().to_string();

        Self {
            alignment: alignment
                .map(|(_, value)| value)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| MISSING_ALIGNMENT.to_string()),
            body: if body.is_empty() {
                MISSING_BODY.to_string()
            } else {
                body
            },
            rationale: rationale
                .map(|(_, value)| value)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| MISSING_RATIONALE.to_string()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.alignment != MISSING_ALIGNMENT && self.rationale != MISSING_RATIONALE
    }

    pub fn render(&self) -> String {
        format!(
            "Alignment: {}\n\n{}\n\nPolicy alignment: {}",
            self.alignment, self.body, self.rationale
        )
    }
}

fn strip_list_marker(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, ')' | '.' | '-' | '*' | '#' | '•'))
        .trim_start()
}

fn clean_value(value: &str) -> String {
    value
        .trim_start_matches(|c: char| matches!(c, ':' | '*' | '"') || c.is_whitespace())
        .trim_end_matches(|c: char| matches!(c, '*' | '"') || c.is_whitespace())
        .to_string()
}

fn alignment_value(line: &str) -> Option<String> {
    let stripped = strip_list_marker(line);
    let keyword = "alignment";
    if !stripped
        .get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
    {
        return None;
    }
    // The label needs a separator: "Alignment: in scope" or "Alignment - in scope".
    let rest = stripped[keyword.len()..].trim_start_matches('*');
    let value = rest
        .trim_start()
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix(" -"))
        .or_else(|| rest.strip_prefix(" –"))?;
    Some(clean_value(value))
}

fn rationale_value(line: &str) -> Option<String> {
    let lower = line.to_ascii_lowercase();
    let at = lower.find("policy alignment")?;
    let rest = &line[at + "policy alignment".len()..];
    let colon = rest.find(':')?;
    Some(clean_value(&rest[colon + 1..]))
}
