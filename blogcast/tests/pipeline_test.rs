mod support;

use blogcast::pipeline::{PipelineState, SkipReason, Stage, StageOutcome};
use blogcast::PipelineError;
use support::{file_count, pipeline, FakeLlm, FakeScraper, FakeTts};

#[tokio::test]
async fn test_full_pipeline_writes_streamed_audio() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = FakeScraper::returning("# Title\nBody text.");
    let llm = FakeLlm::replying("A short script.");
    let tts = FakeTts::streaming(vec![vec![0x01], vec![0x02, 0x03]]);

    let run = pipeline(scraper.clone(), llm.clone(), tts.clone(), dir.path())
        .run("https://example.com/post")
        .await;

    assert!(run.failure().is_none());
    let state = &run.state;
    assert_eq!(state.url(), "https://example.com/post");
    assert_eq!(state.blog_content(), "# Title\nBody text.");
    assert_eq!(state.podcast_script(), "A short script.");
    assert!(!state.audio_file_path().is_empty());
    assert!(state.audio_file_path().ends_with(".mp3"));
    assert_eq!(std::fs::read(state.audio_file_path()).unwrap(), vec![0x01, 0x02, 0x03]);
    assert_eq!(file_count(dir.path()), 1);

    // The script, not the blog content, is what gets voiced
    let speech = tts.last_request();
    assert_eq!(speech.text, "A short script.");
    assert_eq!(speech.voice.voice_id, "pNInz6obpgDQGcFmaJgB");
    assert_eq!(speech.voice.output_format, "mp3_22050_32");

    let prompt = &llm.request(0).messages[0].content;
    assert!(prompt.starts_with("Summarize the following blog content"));
    assert!(prompt.ends_with("# Title\nBody text."));

    let stages: Vec<Stage> = run.reports.iter().map(|r| r.stage).collect();
    assert_eq!(stages, vec![Stage::Scrape, Stage::Summarize, Stage::Synthesize]);
    assert!(run
        .reports
        .iter()
        .all(|r| matches!(r.outcome, StageOutcome::Completed)));
}

#[tokio::test]
async fn test_empty_url_never_scrapes() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = FakeScraper::returning("unused");
    let llm = FakeLlm::replying("unused");
    let tts = FakeTts::streaming(vec![vec![0x01]]);

    let run = pipeline(scraper.clone(), llm.clone(), tts.clone(), dir.path())
        .run("")
        .await;

    assert_eq!(scraper.calls(), 0);
    assert_eq!(llm.calls(), 0);
    assert_eq!(tts.calls(), 0);
    assert_eq!(run.state, PipelineState::new(""));
    assert!(matches!(
        run.outcome(Stage::Scrape),
        Some(StageOutcome::Skipped(SkipReason::MissingInput))
    ));
    assert!(run.into_result().is_ok());
}

#[tokio::test]
async fn test_empty_blog_content_skips_summarization() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = FakeScraper::returning("");
    let llm = FakeLlm::replying("unused");
    let tts = FakeTts::streaming(vec![vec![0x01]]);

    let run = pipeline(scraper.clone(), llm.clone(), tts.clone(), dir.path())
        .run("https://example.com/empty")
        .await;

    assert_eq!(scraper.calls(), 1);
    assert_eq!(llm.calls(), 0);
    assert_eq!(tts.calls(), 0);
    assert!(matches!(
        run.outcome(Stage::Summarize),
        Some(StageOutcome::Skipped(SkipReason::MissingInput))
    ));
}

#[tokio::test]
async fn test_empty_script_writes_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = FakeScraper::returning("# Title\nBody text.");
    let llm = FakeLlm::replying("  \n  ");
    let tts = FakeTts::streaming(vec![vec![0x01]]);

    let run = pipeline(scraper, llm.clone(), tts.clone(), dir.path())
        .run("https://example.com/post")
        .await;

    assert_eq!(llm.calls(), 1);
    assert_eq!(tts.calls(), 0);
    assert_eq!(file_count(dir.path()), 0);
    assert_eq!(run.state.podcast_script(), "");
    assert_eq!(run.state.audio_file_path(), "");
    assert!(matches!(
        run.outcome(Stage::Synthesize),
        Some(StageOutcome::Skipped(SkipReason::MissingInput))
    ));
}

#[tokio::test]
async fn test_repeated_runs_share_text_but_not_files() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(
        FakeScraper::returning("# Title\nBody text."),
        FakeLlm::replying("A short script."),
        FakeTts::streaming(vec![vec![0x01, 0x02, 0x03]]),
        dir.path(),
    );

    let first = pipeline.run("https://example.com/post").await.into_result().unwrap();
    let second = pipeline.run("https://example.com/post").await.into_result().unwrap();

    assert_eq!(first.blog_content(), second.blog_content());
    assert_eq!(first.podcast_script(), second.podcast_script());
    assert_ne!(first.audio_file_path(), second.audio_file_path());
    assert_eq!(file_count(dir.path()), 2);
}

#[tokio::test]
async fn test_scrape_failure_halts_later_stages() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeLlm::replying("unused");
    let tts = FakeTts::streaming(vec![vec![0x01]]);

    let run = pipeline(
        FakeScraper::failing("403 Forbidden"),
        llm.clone(),
        tts.clone(),
        dir.path(),
    )
    .run("https://example.com/private")
    .await;

    assert_eq!(llm.calls(), 0);
    assert_eq!(tts.calls(), 0);
    assert_eq!(run.state.blog_content(), "");
    assert!(matches!(
        run.outcome(Stage::Summarize),
        Some(StageOutcome::Skipped(SkipReason::Halted))
    ));
    assert!(matches!(
        run.outcome(Stage::Synthesize),
        Some(StageOutcome::Skipped(SkipReason::Halted))
    ));

    let err = run.into_result().unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Scrape));
    let text = err.to_string();
    assert!(text.contains("https://example.com/private"));
    assert!(text.contains("403 Forbidden"));
}

#[tokio::test]
async fn test_summarization_failure_keeps_scraped_content() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeLlm::scripted(vec![Err(anyhow::anyhow!("429 rate limited"))], "unused");
    let tts = FakeTts::streaming(vec![vec![0x01]]);

    let run = pipeline(
        FakeScraper::returning("# Title\nBody text."),
        llm.clone(),
        tts.clone(),
        dir.path(),
    )
    .run("https://example.com/post")
    .await;

    assert_eq!(run.state.blog_content(), "# Title\nBody text.");
    assert_eq!(run.state.podcast_script(), "");
    assert_eq!(tts.calls(), 0);
    match run.failure() {
        Some(PipelineError::Summarize { message }) => assert!(message.contains("429")),
        other => panic!("expected summarize failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_broken_audio_stream_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();

    let run = pipeline(
        FakeScraper::returning("# Title\nBody text."),
        FakeLlm::replying("A short script."),
        FakeTts::breaking(vec![vec![0x01, 0x02]]),
        dir.path(),
    )
    .run("https://example.com/post")
    .await;

    assert_eq!(run.state.podcast_script(), "A short script.");
    assert_eq!(run.state.audio_file_path(), "");
    assert_eq!(file_count(dir.path()), 0);
    assert!(matches!(run.failure(), Some(PipelineError::Synthesis { .. })));
}
