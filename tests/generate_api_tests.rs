// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout generation API tests against a canned generator.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;
use workout_io::models::WEEKDAYS;

mod common;
use common::{body_json, create_test_app, create_test_app_with_reply, json_request};

fn week_plan_json() -> String {
    let schedule: serde_json::Map<String, serde_json::Value> = WEEKDAYS
        .iter()
        .map(|day| {
            (
                day.to_string(),
                json!({
                    "focus": "Strength",
                    "exercises": [{"name": "Push-up", "sets": 3, "reps": "12", "rest": "60s"}],
                    "notes": ""
                }),
            )
        })
        .collect();

    json!({
        "title": "Four Week Strength",
        "overview": "Progressive full body plan",
        "weeklySchedule": schedule,
        "nutritionTips": ["Eat enough protein"]
    })
    .to_string()
}

#[tokio::test]
async fn test_free_text_generation() {
    let app = create_test_app_with_reply("Day 1: run 5k");

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/generate-workout",
            None,
            json!({"prompt": "Plan for a runner", "fitnessLevel": "beginner", "workoutGoal": "endurance"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["workout"], "Day 1: run 5k");

    let prompts = app.generator.recorded_prompts().await;
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("Plan for a runner\nFitness Level: beginner\nPrimary Goal: endurance"));
    assert!(prompts[0].contains("5. Brief nutrition tips related to the goal"));
}

#[tokio::test]
async fn test_structured_generation_returns_plan_object() {
    let reply = format!("```json\n{}\n```", week_plan_json());
    let app = create_test_app_with_reply(&reply);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/generate-workout",
            None,
            json!({"prompt": "Strength plan", "structured": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let plan = &body["workout"];
    assert_eq!(plan["title"], "Four Week Strength");
    for day in WEEKDAYS {
        assert_eq!(plan["weeklySchedule"][day]["focus"], "Strength");
    }

    let prompts = app.generator.recorded_prompts().await;
    assert!(prompts[0].contains("weeklySchedule"));
}

#[tokio::test]
async fn test_structured_generation_uses_canonical_weekday_keys() {
    let reply = week_plan_json()
        .replace("\"Monday\"", "\"monday\"")
        .replace("\"Saturday\"", "\"SATURDAY\"");
    let app = create_test_app_with_reply(&reply);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/generate-workout",
            None,
            json!({"prompt": "Strength plan", "structured": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let schedule = body["workout"]["weeklySchedule"].as_object().unwrap();
    assert_eq!(schedule.len(), 7);
    for day in WEEKDAYS {
        assert_eq!(schedule[day]["focus"], "Strength");
    }
    assert!(!schedule.contains_key("monday"));
    assert!(!schedule.contains_key("SATURDAY"));
}

#[tokio::test]
async fn test_structured_generation_with_bad_json_is_500() {
    let app = create_test_app_with_reply("Sorry, here is a plan in prose.");

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/generate-workout",
            None,
            json!({"prompt": "Strength plan", "structured": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "malformed_generation_output");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_blank_prompt_rejected() {
    let app = create_test_app();

    for body in [json!({"prompt": "   "}), json!({})] {
        let response = app
            .router
            .clone()
            .oneshot(json_request("POST", "/generate-workout", None, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["details"], "Prompt is required");
    }

    assert!(app.generator.recorded_prompts().await.is_empty());
}
