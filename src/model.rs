use serde::{Deserialize, Deserializer, Serialize};

/// One money transfer between two clients, with optional compliance-issue data.
///
/// Field names on the wire follow the source dataset (`senderFullName`,
/// `issueSolved`, ...). Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    // ========================================================================
    // CORE FIELDS
    // ========================================================================
    /// Money transfer number, unique per transaction
    pub mtn: i64,

    pub amount: f64,

    pub sender_full_name: String,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_age: Option<u32>,

    pub beneficiary_full_name: String,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beneficiary_age: Option<u32>,

    // ========================================================================
    // COMPLIANCE ISSUE (absent issue_id = nothing flagged)
    // ========================================================================
    #[serde(default)]
    pub issue_id: Option<i64>,

    /// Only meaningful when `issue_id` is present
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub issue_solved: bool,

    #[serde(default)]
    pub issue_message: Option<String>,
}

impl Transaction {
    /// Build a transaction with no compliance issue attached
    pub fn new(mtn: i64, amount: f64, sender: &str, beneficiary: &str) -> Self {
        Transaction {
            mtn,
            amount,
            sender_full_name: sender.to_string(),
            sender_age: None,
            beneficiary_full_name: beneficiary.to_string(),
            beneficiary_age: None,
            issue_id: None,
            issue_solved: false,
            issue_message: None,
        }
    }

    /// Attach a compliance issue
    pub fn with_issue(mut self, issue_id: i64, solved: bool, message: Option<&str>) -> Self {
        self.issue_id = Some(issue_id);
        self.issue_solved = solved;
        self.issue_message = message.map(str::to_string);
        self
    }

    pub fn has_issue(&self) -> bool {
        self.issue_id.is_some()
    }

    /// Flagged and not yet solved
    pub fn has_open_issue(&self) -> bool {
        self.has_issue() && !self.issue_solved
    }

    pub fn has_solved_issue(&self) -> bool {
        self.has_issue() && self.issue_solved
    }

    /// Sender match, ignoring case
    pub fn is_sent_by(&self, sender: &str) -> bool {
        eq_ignore_case(&self.sender_full_name, sender)
    }

    /// Client appears as sender or beneficiary, ignoring case
    pub fn involves(&self, client: &str) -> bool {
        self.is_sent_by(client) || eq_ignore_case(&self.beneficiary_full_name, client)
    }
}

// null in JSON and an empty CSV cell both read as false
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

/// Unicode-aware case-insensitive name comparison
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Lowercased key such that `fold_case(a) == fold_case(b)` iff `eq_ignore_case(a, b)`
pub fn fold_case(name: &str) -> String {
    name.chars().flat_map(char::to_lowercase).collect()
}

// ============================================================================
// TESTS
// ============================================================================
