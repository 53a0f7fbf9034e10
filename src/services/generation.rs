// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout plan generation through the Gemini text API.
//!
//! Handles:
//! - Deterministic prompt construction from the user's request
//! - A single `generateContent` call (no retry)
//! - Fence stripping and JSON parsing when a structured plan is requested

use crate::error::AppError;
use crate::models::{WorkoutPlan, WEEKDAYS};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

const PLAN_REQUIREMENTS: &str = "Please provide a detailed workout plan that includes:\n\
1. A weekly schedule\n\
2. Specific exercises with sets and reps\n\
3. Rest periods\n\
4. Progression guidelines\n\
5. Brief nutrition tips related to the goal";

/// What the caller asked for.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub fitness_level: Option<String>,
    pub workout_goal: Option<String>,
    /// Ask for a JSON plan instead of free text.
    pub structured: bool,
}

/// Generated plan; the variant follows `GenerationRequest::structured`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerationOutput {
    FreeText(String),
    StructuredPlan(WorkoutPlan),
}

/// Build the outbound prompt.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let mut prompt = request.prompt.trim().to_string();

    if let Some(level) = non_blank(request.fitness_level.as_deref()) {
        prompt.push_str(&format!("\nFitness Level: {}", level));
    }
    if let Some(goal) = non_blank(request.workout_goal.as_deref()) {
        prompt.push_str(&format!("\nPrimary Goal: {}", goal));
    }

    prompt.push_str("\n\n");
    prompt.push_str(PLAN_REQUIREMENTS);

    if request.structured {
        prompt.push_str(&format!(
            "\n\nRespond with only a JSON object and no other text, using exactly this shape:\n\
             {{\"title\": string, \"overview\": string, \
             \"weeklySchedule\": {{\"<Weekday>\": {{\"focus\": string, \
             \"exercises\": [{{\"name\": string, \"sets\": number, \"reps\": string, \"rest\": string}}], \
             \"notes\": string}}}}, \"nutritionTips\": [string]}}\n\
             weeklySchedule must have one entry for each of: {}. \
             Use \"Rest\" as the focus and an empty exercises list on rest days.",
            WEEKDAYS.join(", ")
        ));
    }

    prompt
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Remove a surrounding markdown code fence (```` ``` ```` or ```` ```json ````).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. "json") on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse model output into a plan that covers the whole week.
pub fn parse_structured_plan(text: &str) -> Result<WorkoutPlan, AppError> {
    let mut plan: WorkoutPlan = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| AppError::MalformedGenerationOutput(format!("Invalid plan JSON: {}", e)))?;

    let missing = plan.missing_weekdays();
    if !missing.is_empty() {
        return Err(AppError::MalformedGenerationOutput(format!(
            "weeklySchedule is missing: {}",
            missing.join(", ")
        )));
    }

    plan.normalize_weekdays();
    Ok(plan)
}

// ─── Gemini wire types ───────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn first_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Clone)]
enum GatewayMode {
    Gemini {
        http: reqwest::Client,
        api_key: String,
        model: String,
        base_url: String,
    },
    /// Canned reply; prompts are recorded.
    Static {
        reply: String,
        prompts: Arc<Mutex<Vec<String>>>,
    },
}

/// Text-in/text-out generation client.
#[derive(Clone)]
pub struct GenerationGateway {
    mode: GatewayMode,
}

impl GenerationGateway {
    /// Gateway backed by the Gemini API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building generation HTTP client")?;

        Ok(Self {
            mode: GatewayMode::Gemini {
                http,
                api_key: api_key.into(),
                model: model.into(),
                base_url: GEMINI_API_URL.to_string(),
            },
        })
    }

    /// Gateway that always answers with `reply`.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_static(reply: impl Into<String>) -> Self {
        Self {
            mode: GatewayMode::Static {
                reply: reply.into(),
                prompts: Arc::new(Mutex::new(Vec::new())),
            },
        }
    }

    /// Prompts seen by a static gateway (empty for Gemini).
    pub async fn recorded_prompts(&self) -> Vec<String> {
        match &self.mode {
            GatewayMode::Static { prompts, .. } => prompts.lock().await.clone(),
            GatewayMode::Gemini { .. } => Vec::new(),
        }
    }

    /// Generate a plan for `request`.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, AppError> {
        if request.prompt.trim().is_empty() {
            return Err(AppError::Validation("Prompt is required".to_string()));
        }

        let prompt = build_prompt(request);
        tracing::info!(
            structured = request.structured,
            prompt_len = prompt.len(),
            "Requesting workout generation"
        );

        let text = self.complete(&prompt, request.structured).await?;

        if request.structured {
            let plan = parse_structured_plan(&text)?;
            tracing::debug!(title = %plan.title, "Parsed structured plan");
            Ok(GenerationOutput::StructuredPlan(plan))
        } else {
            Ok(GenerationOutput::FreeText(text))
        }
    }

    /// Single completion call.
    async fn complete(&self, prompt: &str, want_json: bool) -> Result<String, AppError> {
        match &self.mode {
            GatewayMode::Static { reply, prompts } => {
                prompts.lock().await.push(prompt.to_string());
                Ok(reply.clone())
            }
            GatewayMode::Gemini {
                http,
                api_key,
                model,
                base_url,
            } => {
                let url = format!("{}/models/{}:generateContent", base_url, model);
                let body = GenerateContentRequest {
                    contents: [Content {
                        parts: [Part { text: prompt }],
                    }],
                    generation_config: want_json.then_some(GenerationConfig {
                        response_mime_type: "application/json",
                    }),
                };

                let response = http
                    .post(&url)
                    .header("x-goog-api-key", api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| AppError::Upstream(format!("Generation request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::Upstream(format!(
                        "Generation API HTTP {}: {}",
                        status, body
                    )));
                }

                let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
                    AppError::Upstream(format!("Generation API JSON parse error: {}", e))
                })?;

                parsed.first_text().ok_or_else(|| {
                    AppError::MalformedGenerationOutput("Empty generation response".to_string())
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_week_json() -> String {
        let days: Vec<String> = WEEKDAYS
            .iter()
            .map(|d| {
                format!(
                    r#""{d}": {{"focus": "Full body", "exercises": [{{"name": "Squat", "sets": 3, "reps": "10", "rest": "90s"}}], "notes": ""}}"#
                )
            })
            .collect();
        format!(
            r#"{{"title": "Beginner Home Plan", "overview": "Bodyweight basics", "weeklySchedule": {{{}}}, "nutritionTips": ["Hydrate"]}}"#,
            days.join(", ")
        )
    }

    #[test]
    fn test_build_prompt_includes_hints() {
        let prompt = build_prompt(&GenerationRequest {
            prompt: "beginner home workout".to_string(),
            fitness_level: Some("beginner".to_string()),
            workout_goal: Some("strength".to_string()),
            structured: false,
        });

        assert!(prompt.starts_with(
            "beginner home workout\nFitness Level: beginner\nPrimary Goal: strength\n\n"
        ));
        assert!(prompt.ends_with("5. Brief nutrition tips related to the goal"));
    }

    #[test]
    fn test_build_prompt_skips_blank_hints() {
        let prompt = build_prompt(&GenerationRequest {
            prompt: "run a 10k".to_string(),
            fitness_level: Some("  ".to_string()),
            workout_goal: None,
            structured: false,
        });

        assert!(!prompt.contains("Fitness Level"));
        assert!(!prompt.contains("Primary Goal"));
    }

    #[test]
    fn test_build_prompt_is_deterministic() {
        let request = GenerationRequest {
            prompt: "gym 5 days".to_string(),
            fitness_level: None,
            workout_goal: Some("muscle".to_string()),
            structured: true,
        };
        assert_eq!(build_prompt(&request), build_prompt(&request));
        assert!(build_prompt(&request).contains("Monday, Tuesday, Wednesday"));
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_parse_structured_plan_with_fence() {
        let text = format!("```json\n{}\n```", full_week_json());
        let plan = parse_structured_plan(&text).unwrap();
        assert_eq!(plan.title, "Beginner Home Plan");
        assert_eq!(plan.weekly_schedule.len(), 7);
    }

    #[test]
    fn test_parse_structured_plan_canonicalizes_weekday_keys() {
        let text = full_week_json()
            .replace("\"Monday\"", "\"monday\"")
            .replace("\"Friday\"", "\" FRIDAY\"");
        let plan = parse_structured_plan(&text).unwrap();

        let keys: Vec<&str> = plan.weekly_schedule.keys().map(String::as_str).collect();
        let mut expected = WEEKDAYS.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_parse_structured_plan_rejects_non_json() {
        let err = parse_structured_plan("Here is your plan: do squats.").unwrap_err();
        assert!(matches!(err, AppError::MalformedGenerationOutput(_)));
    }

    #[test]
    fn test_parse_structured_plan_rejects_partial_week() {
        let text = r#"{"title": "t", "overview": "o", "weeklySchedule": {"Monday": {"focus": "Legs"}}, "nutritionTips": []}"#;
        let err = parse_structured_plan(text).unwrap_err();
        match err {
            AppError::MalformedGenerationOutput(msg) => assert!(msg.contains("Sunday")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_first_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "Day 1"}, {"text": ": squats"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.first_text().as_deref(), Some("Day 1: squats"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(empty.first_text(), None);
    }

    #[tokio::test]
    async fn test_generate_free_text_and_structured() {
        let gateway = GenerationGateway::new_static(full_week_json());

        let text = gateway
            .generate(&GenerationRequest {
                prompt: "beginner home workout".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(matches!(text, GenerationOutput::FreeText(_)));

        let plan = gateway
            .generate(&GenerationRequest {
                prompt: "beginner home workout".to_string(),
                structured: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(matches!(plan, GenerationOutput::StructuredPlan(_)));
        assert_eq!(gateway.recorded_prompts().await.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_requires_prompt() {
        let gateway = GenerationGateway::new_static("unused");
        let err = gateway
            .generate(&GenerationRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(gateway.recorded_prompts().await.is_empty());
    }
}
