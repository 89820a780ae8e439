use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default, deserialize_with = "question_ref")]
    pub question_id: Option<String>,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub feedback_text: Option<String>,
    #[serde(default)]
    pub is_helpful: Option<bool>,
}

/// Clients send the question reference either as a number or as a string
/// such as `"12"` or `"q1"`; both are kept as text.
fn question_ref<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    Ok(Option::<Raw>::deserialize(d)?.map(|raw| match raw {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    }))
}

#[derive(Debug, Serialize)]
pub struct SubmittedResponse {
    pub id: i64,
    pub message: &'static str,
}
