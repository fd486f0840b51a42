mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::TestApp;
use devcamper_api::models::{BOOTCAMP_SCHEMA, COURSE_SCHEMA};

/// 30 courses with weeks 1..=30 and increasing createdAt
async fn thirty_courses(app: &TestApp) -> Result<()> {
    for n in 1..=30u32 {
        app.insert(
            &COURSE_SCHEMA,
            json!({
                "title": format!("Course {:02}", n),
                "description": "Course description",
                "weeks": n,
                "tuition": 1000 * n,
                "minimumSkill": if n % 2 == 0 { "beginner" } else { "advanced" },
                "scholarshipAvailable": n % 3 == 0,
                "createdAt": format!("2024-01-01T00:00:{:02}.000Z", n),
            }),
        )
        .await?;
    }
    Ok(())
}

/// Percent-encode operator brackets so the URI parses
fn q(uri: &str) -> String {
    uri.replace('[', "%5B").replace(']', "%5D")
}

fn weeks(body: &Value) -> Vec<u64> {
    body["data"]
        .as_array()
        .map(|items| items.iter().filter_map(|c| c["weeks"].as_u64()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn pages_through_thirty_records() -> Result<()> {
    let app = TestApp::new();
    thirty_courses(&app).await?;

    let (status, first) = app.get("/api/v1/courses?page=1&limit=25").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["count"], 25);
    assert_eq!(first["totalCount"], 30);
    assert_eq!(first["pagination"], json!({ "next": { "page": 2, "limit": 25 } }));

    let (_, second) = app.get("/api/v1/courses?page=2&limit=25").await?;
    assert_eq!(second["count"], 5);
    assert_eq!(second["pagination"], json!({ "prev": { "page": 1, "limit": 25 } }));

    let (_, middle) = app.get("/api/v1/courses?page=2&limit=10").await?;
    assert_eq!(middle["pagination"]["next"], json!({ "page": 3, "limit": 10 }));
    assert_eq!(middle["pagination"]["prev"], json!({ "page": 1, "limit": 10 }));

    let (_, beyond) = app.get("/api/v1/courses?page=9&limit=10").await?;
    assert_eq!(beyond["count"], 0);
    assert_eq!(beyond["totalCount"], 30);
    assert!(beyond["pagination"].get("next").is_none());
    Ok(())
}

#[tokio::test]
async fn default_sort_is_newest_first() -> Result<()> {
    let app = TestApp::new();
    thirty_courses(&app).await?;

    let (_, body) = app.get("/api/v1/courses?limit=3").await?;
    assert_eq!(weeks(&body), vec![30, 29, 28]);
    Ok(())
}

#[tokio::test]
async fn explicit_sort_replaces_the_default() -> Result<()> {
    let app = TestApp::new();
    thirty_courses(&app).await?;

    let (_, asc) = app.get("/api/v1/courses?sort=weeks&limit=3").await?;
    assert_eq!(weeks(&asc), vec![1, 2, 3]);

    let (_, desc) = app.get("/api/v1/courses?sort=-tuition&limit=2").await?;
    assert_eq!(weeks(&desc), vec![30, 29]);

    // Secondary key breaks ties on the first
    let (_, multi) = app.get("/api/v1/courses?sort=minimumSkill,-weeks&limit=2").await?;
    assert_eq!(weeks(&multi), vec![29, 27]);
    Ok(())
}

#[tokio::test]
async fn comparison_filters_narrow_results_and_total() -> Result<()> {
    let app = TestApp::new();
    thirty_courses(&app).await?;

    let (status, body) = app.get(&q("/api/v1/courses?weeks[gt]=20&limit=5")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 10);
    assert_eq!(body["count"], 5);
    assert!(weeks(&body).iter().all(|w| *w > 20));
    assert_eq!(body["pagination"]["next"], json!({ "page": 2, "limit": 5 }));

    let (_, range) = app.get(&q("/api/v1/courses?weeks[gte]=5&weeks[lte]=8&sort=weeks")).await?;
    assert_eq!(weeks(&range), vec![5, 6, 7, 8]);

    let (_, exact) = app.get("/api/v1/courses?minimumSkill=beginner&scholarshipAvailable=true").await?;
    assert_eq!(exact["totalCount"], 5);
    Ok(())
}

#[tokio::test]
async fn select_projects_fields_but_keeps_id() -> Result<()> {
    let app = TestApp::new();
    thirty_courses(&app).await?;

    let (_, body) = app.get("/api/v1/courses?select=title,weeks&sort=weeks&page=2&limit=2").await?;
    assert_eq!(body["count"], 2);
    let first = body["data"][0].as_object().unwrap();
    assert_eq!(first["title"], "Course 03");
    assert!(first.contains_key("_id"));
    assert!(first.contains_key("weeks"));
    assert!(!first.contains_key("tuition"));
    Ok(())
}

#[tokio::test]
async fn in_operator_matches_any_listed_value() -> Result<()> {
    let app = TestApp::new();
    for (name, careers) in [
        ("Devworks", vec!["Web Development", "UI/UX"]),
        ("ModernTech", vec!["Mobile Development", "Business"]),
        ("Codemasters", vec!["Data Science"]),
    ] {
        app.insert(
            &BOOTCAMP_SCHEMA,
            json!({ "name": name, "description": "d", "address": "a", "careers": careers }),
        )
        .await?;
    }

    let (_, body) = app.get(&q("/api/v1/bootcamps?careers[in]=Business,Data%20Science&sort=name")).await?;
    let names: Vec<&str> = body["data"].as_array().unwrap().iter().filter_map(|b| b["name"].as_str()).collect();
    assert_eq!(names, vec!["Codemasters", "ModernTech"]);

    let (_, contains) = app.get("/api/v1/bootcamps?careers=UI%2FUX").await?;
    assert_eq!(contains["totalCount"], 1);
    Ok(())
}

#[tokio::test]
async fn unknown_fields_and_operators_are_rejected() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.get("/api/v1/courses?colour=blue").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown field: colour");

    let (status, _) = app.get(&q("/api/v1/courses?weeks[ne]=3")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get(&q("/api/v1/courses?weeks[gt]=many")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/v1/courses?sort=-colour").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn invalid_page_and_limit_fall_back_to_defaults() -> Result<()> {
    let app = TestApp::new();
    thirty_courses(&app).await?;

    for query in ["page=0&limit=-4", "page=abc&limit=ten", "page=-1"] {
        let (status, body) = app.get(&format!("/api/v1/courses?{}", query)).await?;
        assert_eq!(status, StatusCode::OK, "{}", query);
        assert_eq!(body["count"], 25, "{}", query);
        assert_eq!(body["pagination"], json!({ "next": { "page": 2, "limit": 25 } }), "{}", query);
    }
    Ok(())
}

#[tokio::test]
async fn enormous_page_is_an_empty_page() -> Result<()> {
    let app = TestApp::new();
    thirty_courses(&app).await?;

    let (status, body) = app.get(&format!("/api/v1/courses?page={}", i64::MAX)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["totalCount"], 30);
    assert!(body["pagination"].get("next").is_none());
    Ok(())
}

#[tokio::test]
async fn nested_listing_is_scoped_to_the_bootcamp() -> Result<()> {
    let app = TestApp::new();
    let ours = app
        .insert(&BOOTCAMP_SCHEMA, json!({ "name": "Ours", "description": "d", "address": "a", "careers": ["Other"] }))
        .await?;
    let ours = ours["_id"].as_str().unwrap().to_string();

    for (bootcamp, weeks) in [(ours.as_str(), 4), (ours.as_str(), 12), ("elsewhere", 8)] {
        app.insert(
            &COURSE_SCHEMA,
            json!({ "title": "t", "description": "d", "weeks": weeks, "tuition": 100, "minimumSkill": "beginner", "bootcamp": bootcamp }),
        )
        .await?;
    }

    let (_, all) = app.get(&format!("/api/v1/bootcamps/{}/courses", ours)).await?;
    assert_eq!(all["totalCount"], 2);

    let (_, filtered) = app.get(&q(&format!("/api/v1/bootcamps/{}/courses?weeks[gt]=6", ours))).await?;
    assert_eq!(filtered["totalCount"], 1);
    assert_eq!(weeks(&filtered), vec![12]);
    Ok(())
}
