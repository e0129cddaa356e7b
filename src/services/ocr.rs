use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::core::config::Settings;

/// Result contract of the external OCR collaborator:
/// `{success, text, confidence, processing_time}` or `{success: false, error}`.
#[derive(Debug, Clone)]
pub(crate) struct OcrExtraction {
    pub(crate) text: String,
    pub(crate) confidence: f64,
    pub(crate) processing_time: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct OcrService {
    client: Client,
    api_key: String,
    base_url: String,
    max_submit_retries: u32,
}

impl OcrService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ocr().timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(timeout)
            .build()
            .context("Failed to build OCR HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ocr().api_key.clone(),
            base_url: settings.ocr().base_url.trim_end_matches('/').to_string(),
            max_submit_retries: settings.ocr().max_submit_retries,
        })
    }

    /// Extracts text from one uploaded answer-sheet scan, addressed by a
    /// presigned URL. Transport errors are retried with backoff; a
    /// `success: false` answer is returned as an error with the collaborator's
    /// message.
    pub(crate) async fn extract_from_file_url(&self, file_url: &str) -> Result<OcrExtraction> {
        let endpoint = format!("{}/extract", self.base_url);

        let mut last_error = None;

        for attempt in 0..=self.max_submit_retries {
            let response = self
                .client
                .post(&endpoint)
                .header("X-Api-Key", &self.api_key)
                .json(&serde_json::json!({ "file_url": file_url }))
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let raw_body = resp.text().await.context("Failed to read OCR response")?;

                    let parsed = serde_json::from_str::<Value>(&raw_body).map_err(|err| {
                        anyhow::anyhow!(
                            "OCR service returned non-JSON body (status {}): {}: {}",
                            status,
                            err,
                            raw_body
                        )
                    })?;

                    if !status.is_success() {
                        last_error = Some(anyhow::anyhow!(
                            "OCR submit failed (status {}): {}",
                            status,
                            extract_error_message(&parsed)
                        ));
                    } else if parsed
                        .get("success")
                        .and_then(Value::as_bool)
                        .is_some_and(|value| !value)
                    {
                        // A definitive failure from the collaborator; its own
                        // retry loop has already run, do not retry here.
                        return Err(anyhow::anyhow!(
                            "OCR extraction failed: {}",
                            extract_error_message(&parsed)
                        ));
                    } else if let Some(extraction) = parse_extraction(&parsed) {
                        return Ok(extraction);
                    } else {
                        last_error =
                            Some(anyhow::anyhow!("OCR response missing text payload: {parsed}"));
                    }
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call OCR service"));
                }
            }

            if attempt < self.max_submit_retries {
                let backoff = Duration::from_secs(2_u64.pow(attempt));
                tokio::time::sleep(backoff).await;
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown OCR submit error")))
    }
}

fn parse_extraction(payload: &Value) -> Option<OcrExtraction> {
    let text = payload.get("text").and_then(Value::as_str)?.to_string();
    let confidence = payload.get("confidence").and_then(Value::as_f64).unwrap_or(0.0);
    let processing_time = payload.get("processing_time").and_then(Value::as_f64).unwrap_or(0.0);
    Some(OcrExtraction { text, confidence, processing_time })
}

fn extract_error_message(payload: &Value) -> String {
    payload
        .get("error")
        .and_then(Value::as_str)
        .or_else(|| payload.get("detail").and_then(Value::as_str))
        .unwrap_or("unknown error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_extraction_reads_contract_fields() {
        let payload = json!({
            "success": true,
            "text": "Q1: photosynthesis",
            "confidence": 0.93,
            "processing_time": 1.8
        });
        let extraction = parse_extraction(&payload).expect("extraction");
        assert_eq!(extraction.text, "Q1: photosynthesis");
        assert!((extraction.confidence - 0.93).abs() < f64::EPSILON);
        assert!((extraction.processing_time - 1.8).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_extraction_requires_text() {
        assert!(parse_extraction(&json!({"success": true})).is_none());
    }

    #[test]
    fn extract_error_message_prefers_error_field() {
        assert_eq!(extract_error_message(&json!({"error": "blurry scan"})), "blurry scan");
        assert_eq!(extract_error_message(&json!({"detail": "no file"})), "no file");
        assert_eq!(extract_error_message(&json!({})), "unknown error");
    }
}
