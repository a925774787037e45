//! Pipeline integration tests.
//!
//! These run the whole generation pipeline (lopdf extraction, map-reduce,
//! formatting, printpdf rendering, publishing) against fixture PDFs built in
//! memory and a scripted completion model, so they need no network access
//! and always run.

mod common;

use common::*;
use pdf_report::{
    generate_report, generate_report_from_bytes, ErrorKind, FormattedBlock, ProgressCallback,
    ReportConfig, ReportError, ReportGenerator, ReportProgressCallback, ReportStore, StyleTag,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn config_for(dir: &std::path::Path, model: Arc<ScriptedModel>) -> ReportConfig {
    ReportConfig::builder()
        .output_dir(dir)
        .completion_model(model)
        .prompts(Arc::new(MarkerPrompts))
        .concurrency(4)
        .max_retries(0)
        .build()
        .unwrap()
}

fn expected_content() -> Vec<FormattedBlock> {
    vec![
        FormattedBlock::new("Overview", StyleTag::Subsection),
        FormattedBlock::new("Total revenue increased.", StyleTag::Body),
        FormattedBlock::new("• Revenue: $5M", StyleTag::Bullet),
        FormattedBlock::new("• Costs: $2M", StyleTag::Bullet),
    ]
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn sales_report_from_one_pdf() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pdf = write_pdf(
        input.path(),
        "q3.pdf",
        &["ALPHA revenue grew in Q3", "BRAVO costs fell slightly"],
    );

    let model = Arc::new(ScriptedModel::new());
    let renderer = Arc::new(RecordingRenderer::new());
    let report = ReportGenerator::new(config_for(out.path(), model.clone()))
        .with_renderer(renderer.clone())
        .generate(&[&pdf], "sales")
        .await
        .unwrap();

    assert_eq!(report.title, "Sales Analysis");
    assert_eq!(report.stats.segments, 2);
    assert_eq!(report.stats.llm_calls, 3);
    assert_eq!(model.call_count(), 3);
    assert_eq!(report.stats.total_input_tokens, 80);

    let bytes = std::fs::read(&report.path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(report.path, out.path().join(format!("{}.pdf", report.id)));

    let document = renderer.last();
    assert_eq!(document.blocks()[0], FormattedBlock::new("Sales Analysis", StyleTag::Title));
    assert_eq!(&document.blocks()[1..], expected_content().as_slice());
}

#[tokio::test]
async fn news_report_keeps_file_order_under_concurrency() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    // ALPHA chunks answer slowest, so completion order is not source order.
    let paths = vec![
        write_pdf(input.path(), "1.pdf", &["ALPHA first story"]),
        write_pdf(input.path(), "2.pdf", &["BRAVO second story"]),
        write_pdf(input.path(), "3.pdf", &["CHARLIE third story", "DELTA continued"]),
    ];

    let model = Arc::new(ScriptedModel::new());
    let renderer = Arc::new(RecordingRenderer::new());
    let report = ReportGenerator::new(config_for(out.path(), model.clone()))
        .with_renderer(renderer.clone())
        .generate(&paths, "news")
        .await
        .unwrap();

    assert_eq!(report.stats.source_files, 3);
    assert_eq!(report.stats.segments, 4);

    let combine = model.combine_prompts();
    assert_eq!(combine.len(), 1);
    assert_eq!(
        combine[0],
        "COMBINE:- ALPHA\n\n- BRAVO\n\n- CHARLIE\n\n- DELTA"
    );

    let document = renderer.last();
    assert_eq!(document.title, "News Summary");
    assert_eq!(document.blocks()[0].text, "News Summary");
    assert_eq!(document.blocks()[0].style, StyleTag::Title);
}

#[tokio::test]
async fn builtin_prompts_carry_page_text() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pdf = write_pdf(input.path(), "notes.pdf", &["ALPHA quarterly memo"]);

    let model = Arc::new(ScriptedModel::new());
    let config = ReportConfig::builder()
        .output_dir(out.path())
        .completion_model(model.clone())
        .build()
        .unwrap();
    let report = generate_report(&[&pdf], "content", &config).await.unwrap();

    assert_eq!(report.title, "Content Summary");
    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("ALPHA quarterly memo"));
    assert!(!prompts[0].contains("{text}"));
}

#[tokio::test]
async fn long_partial_summaries_are_collapsed_first() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let long_page = "ALPHA ".repeat(60);
    let pages: Vec<&str> = vec![long_page.as_str(); 6];
    let pdf = write_pdf(input.path(), "long.pdf", &pages);

    // Padded map answers: six of them overflow the combine budget.
    struct Verbose(ScriptedModel);

    #[async_trait::async_trait]
    impl pdf_report::CompletionModel for Verbose {
        async fn complete(
            &self,
            prompt: &str,
            settings: &pdf_report::CompletionSettings,
        ) -> Result<pdf_report::Completion, pdf_report::ModelError> {
            let mut c = self.0.complete(prompt, settings).await?;
            if prompt.starts_with("MAP:") {
                c.text = format!("{} {}", c.text, "detail ".repeat(15));
            }
            Ok(c)
        }
    }

    let model = Arc::new(Verbose(ScriptedModel::new()));
    let config = ReportConfig::builder()
        .output_dir(out.path())
        .completion_model(model.clone())
        .prompts(Arc::new(MarkerPrompts))
        .chunk_chars(400)
        .max_combine_chars(400)
        .build()
        .unwrap();

    let report = generate_report(&[&pdf], "sales", &config).await.unwrap();
    assert!(report.stats.collapse_rounds >= 1);
    assert!(report.stats.llm_calls > report.stats.segments + 1);
    assert_eq!(model.0.combine_prompts().len(), report.stats.llm_calls - report.stats.segments);
}

#[tokio::test]
async fn report_from_bytes() {
    let out = tempfile::tempdir().unwrap();
    let model = Arc::new(ScriptedModel::new());
    let documents = vec![make_pdf(&["ALPHA in memory"]), make_pdf(&["BRAVO also"])];

    let report = generate_report_from_bytes(&documents, "SALES", &config_for(out.path(), model.clone()))
        .await
        .unwrap();

    assert_eq!(report.stats.source_files, 2);
    assert!(report.path.exists());
    assert_eq!(
        model.combine_prompts(),
        vec!["COMBINE:- ALPHA\n\n- BRAVO".to_string()]
    );
}

#[tokio::test]
async fn progress_events_follow_the_pipeline() {
    #[derive(Default)]
    struct Recorder {
        extraction: Mutex<Option<(usize, usize)>>,
        chunks: AtomicUsize,
        completed: Mutex<Vec<String>>,
    }

    impl ReportProgressCallback for Recorder {
        fn on_extraction_complete(&self, files: usize, segments: usize) {
            *self.extraction.lock().unwrap() = Some((files, segments));
        }
        fn on_chunk_complete(&self, _index: usize, _total: usize, _len: usize) {
            self.chunks.fetch_add(1, Ordering::SeqCst);
        }
        fn on_report_complete(&self, report_id: String, _bytes: usize) {
            self.completed.lock().unwrap().push(report_id);
        }
    }

    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pdf = write_pdf(input.path(), "a.pdf", &["ALPHA one", "BRAVO two", "CHARLIE three"]);

    let recorder = Arc::new(Recorder::default());
    let mut config = config_for(out.path(), Arc::new(ScriptedModel::new()));
    config.progress_callback = Some(recorder.clone() as ProgressCallback);

    let report = generate_report(&[&pdf], "news", &config).await.unwrap();

    assert_eq!(*recorder.extraction.lock().unwrap(), Some((1, 3)));
    assert_eq!(recorder.chunks.load(Ordering::SeqCst), 3);
    assert_eq!(*recorder.completed.lock().unwrap(), vec![report.id.to_string()]);
}

#[tokio::test]
async fn generated_report_can_be_located_and_removed() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pdf = write_pdf(input.path(), "a.pdf", &["ALPHA"]);

    let report = generate_report(&[&pdf], "content", &config_for(out.path(), Arc::new(ScriptedModel::new())))
        .await
        .unwrap();

    let store = ReportStore::new(out.path());
    let id = report.id.to_string();
    assert_eq!(store.locate(&id).unwrap(), report.path);
    assert_eq!(store.list().unwrap(), vec![report.id]);

    store.remove(&id).unwrap();
    assert!(!report.path.exists());
    assert!(matches!(store.locate(&id), Err(ReportError::ReportNotFound { .. })));
}

// ── Failure paths ───────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_input_fails_before_any_llm_call() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let good = write_pdf(input.path(), "good.pdf", &["ALPHA"]);
    let missing = input.path().join("missing.pdf");

    let model = Arc::new(ScriptedModel::new());
    let err = generate_report(&[good, missing], "sales", &config_for(out.path(), model.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::UnreadableDocument { .. }));
    assert_eq!(model.call_count(), 0);
    assert_eq!(files_in(out.path()), 0);
}

#[tokio::test]
async fn unknown_report_type_is_rejected_up_front() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pdf = write_pdf(input.path(), "a.pdf", &["ALPHA"]);

    let model = Arc::new(ScriptedModel::new());
    let err = generate_report(&[&pdf], "weather", &config_for(out.path(), model.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::InvalidReportType { ref value } if value == "weather"));
    assert!(err.is_client_error());
    assert_eq!(model.call_count(), 0);
    assert_eq!(files_in(out.path()), 0);
}

#[tokio::test]
async fn pdf_without_text_is_unreadable() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pdf = write_pdf(input.path(), "scan.pdf", &["", ""]);

    let model = Arc::new(ScriptedModel::new());
    let err = generate_report(&[&pdf], "content", &config_for(out.path(), model.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::UnreadableDocument { .. }));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn non_pdf_input_is_unreadable() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let txt = input.path().join("notes.pdf");
    std::fs::write(&txt, "just some text").unwrap();

    let err = generate_report(&[&txt], "content", &config_for(out.path(), Arc::new(ScriptedModel::new())))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not a PDF"), "got: {err}");
}

#[tokio::test]
async fn map_failure_publishes_nothing() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pdf = write_pdf(input.path(), "a.pdf", &["ALPHA fine", "BRAVO breaks"]);

    let model = Arc::new(ScriptedModel::failing_on("BRAVO"));
    let err = generate_report(&[&pdf], "sales", &config_for(out.path(), model))
        .await
        .unwrap_err();

    match err {
        ReportError::LlmInvocation { stage, message } => {
            assert_eq!(stage, "map");
            assert!(message.contains("quota"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(files_in(out.path()), 0);
}

#[tokio::test]
async fn reduce_failure_publishes_nothing() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pdf = write_pdf(input.path(), "a.pdf", &["ALPHA fine", "BRAVO fine too"]);

    let model = Arc::new(ScriptedModel::failing_combine());
    let err = generate_report(&[&pdf], "news", &config_for(out.path(), model.clone()))
        .await
        .unwrap_err();

    match err {
        ReportError::LlmInvocation { ref stage, ref message } => {
            assert_eq!(stage, "reduce");
            assert!(message.contains("overloaded"));
        }
        ref other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::LlmInvocation);
    assert!(!err.is_client_error());
    // Both map calls ran, then the single reduce call failed.
    assert_eq!(model.call_count(), 3);
    assert_eq!(files_in(out.path()), 0);
}

#[tokio::test]
async fn unwritable_output_dir_is_a_render_failure() {
    let input = tempfile::tempdir().unwrap();
    let pdf = write_pdf(input.path(), "a.pdf", &["ALPHA"]);
    // A regular file where the report folder should be.
    let blocker = input.path().join("generated");
    std::fs::write(&blocker, "not a directory").unwrap();

    let err = generate_report(&[&pdf], "sales", &config_for(&blocker, Arc::new(ScriptedModel::new())))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RenderFailure, "got: {err}");
    assert!(!err.is_client_error());
    assert!(matches!(err, ReportError::RenderFailure { ref detail } if detail.contains("generated")));
}

#[tokio::test]
async fn timeout_during_rendering_never_publishes_later() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pdf = write_pdf(input.path(), "a.pdf", &["ALPHA"]);

    let mut config = config_for(out.path(), Arc::new(ScriptedModel::new()));
    config.pipeline_timeout_secs = 1;
    let generator = ReportGenerator::new(config).with_renderer(Arc::new(SlowRenderer {
        delay: Duration::from_millis(1500),
    }));

    let err = generator.generate(&[&pdf], "sales").await.unwrap_err();
    assert!(matches!(err, ReportError::Timeout { ref stage, .. } if stage == "pipeline"));

    // Let the abandoned render finish; it must not leave a report behind.
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(files_in(out.path()), 0);
}

#[tokio::test(start_paused = true)]
async fn pipeline_timeout_aborts_generation() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pdf = write_pdf(input.path(), "a.pdf", &["ALPHA"]);

    let model = Arc::new(ScriptedModel::sleeping(Duration::from_secs(3600)));
    let mut config = config_for(out.path(), model);
    config.pipeline_timeout_secs = 5;
    config.api_timeout_secs = 600;

    let err = generate_report(&[&pdf], "sales", &config).await.unwrap_err();
    assert!(matches!(err, ReportError::Timeout { ref stage, secs: 5 } if stage == "pipeline"));
    assert_eq!(files_in(out.path()), 0);
}
