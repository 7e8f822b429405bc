//! A small end-to-end pipeline running against the scripted mock backend.
//!
//! This demo shows:
//! - Seeding the state bag with a user request
//! - Fanning out over a dynamic list of story details with `Fork`
//! - Building a story paragraph by paragraph with a bounded `Loop`
//! - Caching an expensive step and falling back on failure with `Catch`
//!
//! Run with `cargo run --example story_pipeline`.

use std::sync::Arc;

use funai::prelude::*;
use funai::{ExecutionError, Runner};
use serde_json::json;

/// Stands in for a real model: answers by recognizing the prompt's shape.
fn scripted_model(prompt: &str, _runner: &Runner) -> std::result::Result<String, ExecutionError> {
    if prompt.starts_with("List three details") {
        Ok("a lighthouse,a storm,a lost cat".to_string())
    } else if let Some(detail) = prompt.strip_prefix("Describe ") {
        Ok(format!("[{}]", detail))
    } else if prompt.starts_with("Write paragraph") {
        Ok(format!("<{}>", prompt.len()))
    } else if prompt.starts_with("Polish") {
        Err(ExecutionError::Escalated("polishing model unavailable".to_string()))
    } else {
        Ok(prompt.to_string())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> funai::Result<()> {
    let backend = Arc::new(MockBackend::new(scripted_model));
    backend.create_session().await?;

    // ------------------------------------------------------------------
    // Step 1: collect world details concurrently
    // ------------------------------------------------------------------
    let details_backend = backend.clone();
    let setting = Fork::new(
        Arc::new(
            Infer::builder(
                backend.clone(),
                Template::func(["request"], |args| {
                    Ok(json!(format!("List three details for: {}", args.text("request")?)))
                }),
            )
            .key("details")
            .build(),
        ),
        move |details| {
            Ok(details
                .as_str()
                .unwrap_or_default()
                .split(',')
                .map(|detail| {
                    Arc::new(Infer::new(details_backend.clone(), format!("Describe {}", detail.trim())))
                        as UnitRef
                })
                .collect())
        },
        |reports| {
            let reports: Vec<String> = reports
                .into_iter()
                .filter_map(|r| r.as_str().map(str::to_string))
                .collect();
            Ok(json!(reports.join(" ")))
        },
    )
    .with_key("setting");
    let setting: UnitRef = Arc::new(Cache::new(Arc::new(setting)));

    // ------------------------------------------------------------------
    // Step 2: write the story paragraph by paragraph
    // ------------------------------------------------------------------
    let paragraph = Infer::builder(
        backend.clone(),
        Template::func(["setting", INDEX_KEY, "story"], |args| {
            let so_far = args.get("story").and_then(Value::as_str).unwrap_or("");
            Ok(json!(format!(
                "Write paragraph {} set in {} continuing: {}",
                args.index(INDEX_KEY)?,
                args.text("setting")?,
                so_far
            )))
        }),
    )
    .key("story")
    .build();
    let story = Loop::times(
        Arc::new(paragraph),
        3,
        Arc::new(Eval::new(Template::func(["story"], |args| {
            Ok(args.get("story").cloned().unwrap_or(Value::Null))
        }))),
    )
    .with_key("story");

    // ------------------------------------------------------------------
    // Step 3: polish, or keep the draft when polishing fails
    // ------------------------------------------------------------------
    let polish = Catch::new(
        Arc::new(Infer::new(
            backend.clone(),
            Template::func(["story"], |args| Ok(json!(format!("Polish: {}", args.text("story")?)))),
        )),
        Arc::new(Eval::new(Template::func(["story", ERROR_KEY], |args| {
            println!("[polish] fallback after: {}", args.text(ERROR_KEY)?);
            Ok(args.require("story")?.clone())
        }))),
    );

    let pipeline = Sequential::new(
        vec![setting.clone(), Arc::new(story)],
        Arc::new(polish),
    )?;

    let request = StateBag::new().with("request", "a story for a child who loves the sea");
    let first = pipeline.run(request.clone()).await?;
    println!("[pipeline] result: {}", first);

    // The setting is cached, so the second run only re-runs the story.
    let calls_before = backend.prompts().len();
    pipeline.run(request).await?;
    println!(
        "[pipeline] second run made {} backend calls",
        backend.prompts().len() - calls_before
    );

    Ok(())
}
