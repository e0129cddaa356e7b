use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::config::Settings;

/// Per-question input shipped to the external grading collaborator.
#[derive(Debug, Clone)]
pub(crate) struct QuestionForGrading {
    pub(crate) question_id: String,
    pub(crate) question_number: i32,
    pub(crate) question_text: String,
    pub(crate) max_marks: f64,
    pub(crate) answer_key_text: Option<String>,
}

/// Per-question verdict coming back from the collaborator.
#[derive(Debug, Clone)]
pub(crate) struct AiQuestionGrade {
    pub(crate) question_id: String,
    pub(crate) score: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) confidence: Option<f64>,
}

#[derive(Debug, Clone)]
pub(crate) struct GraderService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl GraderService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.grader().request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build grader HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.grader().api_key.clone(),
            base_url: settings.grader().base_url.trim_end_matches('/').to_string(),
            model: settings.grader().model.clone(),
            max_tokens: settings.grader().max_tokens,
        })
    }

    /// Sends the OCR text plus the answer keys and returns one grade per
    /// question. Scores are clamped by the caller before persisting.
    pub(crate) async fn grade_submission(
        &self,
        exam_title: &str,
        ocr_text: &str,
        questions: &[QuestionForGrading],
    ) -> Result<Vec<AiQuestionGrade>> {
        let questions_payload: Vec<Value> = questions
            .iter()
            .map(|question| {
                json!({
                    "question_id": question.question_id,
                    "question_number": question.question_number,
                    "question_text": question.question_text,
                    "max_marks": question.max_marks,
                    "answer_key": question.answer_key_text,
                })
            })
            .collect();

        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "exam_title": exam_title,
            "student_text": ocr_text,
            "questions": questions_payload,
        });

        let endpoint = format!("{}/grade", self.base_url);
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to call grading service")?;

        let status = response.status();
        let raw_body = response.text().await.context("Failed to read grading response")?;
        let parsed = serde_json::from_str::<Value>(&raw_body).map_err(|err| {
            anyhow::anyhow!(
                "Grading service returned non-JSON body (status {}): {}: {}",
                status,
                err,
                raw_body
            )
        })?;

        if !status.is_success() {
            anyhow::bail!(
                "Grading service request failed (status {}): {}",
                status,
                parsed.get("error").and_then(Value::as_str).unwrap_or("unknown error")
            );
        }

        parse_grades(&parsed, questions)
    }
}

/// Accepts grades keyed either by question_id or by question_number; unknown
/// questions are rejected so a malformed answer never lands in the database.
fn parse_grades(payload: &Value, questions: &[QuestionForGrading]) -> Result<Vec<AiQuestionGrade>> {
    let items = payload
        .get("grades")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("Grading response missing grades array: {payload}"))?;

    let mut grades = Vec::with_capacity(items.len());

    for item in items {
        let question_id = match item.get("question_id").and_then(Value::as_str) {
            Some(id) => {
                if !questions.iter().any(|question| question.question_id == id) {
                    anyhow::bail!("Grading response references unknown question_id {id}");
                }
                id.to_string()
            }
            None => {
                let number = item
                    .get("question_number")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| anyhow::anyhow!("Grade entry missing question reference"))?;
                questions
                    .iter()
                    .find(|question| i64::from(question.question_number) == number)
                    .map(|question| question.question_id.clone())
                    .ok_or_else(|| {
                        anyhow::anyhow!("Grading response references unknown question {number}")
                    })?
            }
        };

        let score = item
            .get("score")
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow::anyhow!("Grade entry missing numeric score"))?;

        grades.push(AiQuestionGrade {
            question_id,
            score,
            feedback: item.get("feedback").and_then(Value::as_str).map(str::to_string),
            confidence: item.get("confidence").and_then(Value::as_f64),
        });
    }

    Ok(grades)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn questions() -> Vec<QuestionForGrading> {
        vec![
            QuestionForGrading {
                question_id: "q-1".to_string(),
                question_number: 1,
                question_text: "Define osmosis".to_string(),
                max_marks: 5.0,
                answer_key_text: Some("Movement of water across a membrane".to_string()),
            },
            QuestionForGrading {
                question_id: "q-2".to_string(),
                question_number: 2,
                question_text: "State Ohm's law".to_string(),
                max_marks: 5.0,
                answer_key_text: None,
            },
        ]
    }

    #[test]
    fn parse_grades_by_question_id() {
        let payload = json!({
            "grades": [
                {"question_id": "q-1", "score": 4.0, "feedback": "good", "confidence": 0.9},
                {"question_id": "q-2", "score": 2.5}
            ]
        });
        let grades = parse_grades(&payload, &questions()).expect("grades");
        assert_eq!(grades.len(), 2);
        assert_eq!(grades[0].question_id, "q-1");
        assert_eq!(grades[0].feedback.as_deref(), Some("good"));
        assert!(grades[1].confidence.is_none());
    }

    #[test]
    fn parse_grades_by_question_number() {
        let payload = json!({
            "grades": [{"question_number": 2, "score": 3.0}]
        });
        let grades = parse_grades(&payload, &questions()).expect("grades");
        assert_eq!(grades[0].question_id, "q-2");
    }

    #[test]
    fn parse_grades_rejects_unknown_question() {
        let payload = json!({
            "grades": [{"question_id": "q-404", "score": 3.0}]
        });
        assert!(parse_grades(&payload, &questions()).is_err());
    }

    #[test]
    fn parse_grades_rejects_missing_score() {
        let payload = json!({
            "grades": [{"question_id": "q-1"}]
        });
        assert!(parse_grades(&payload, &questions()).is_err());
    }
}
