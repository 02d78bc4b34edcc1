//! End-to-end tests for the training pipeline against in-memory backends.

use async_trait::async_trait;
use image::RgbImage;
use kontext_training::{
    Archive, ImageGenerator, LogProgressSink, ModelRef, NewModel, Pipeline, PipelineOptions, ProgressEvent,
    ProgressSink, RemoteModel, TrainingBackend, TrainingConfig, TrainingError, TrainingJob, TrainingJobId,
    TrainingLayout, TrainingRequest, TrainingResult, TrainingSnapshot, TrainingStatus,
};
use std::collections::VecDeque;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

#[derive(Default)]
struct Calls {
    find_model: usize,
    create_model: Vec<NewModel>,
    upload: usize,
    create_training: Vec<TrainingRequest>,
    status: usize,
}

struct FakeBackend {
    model_exists: bool,
    snapshots: Mutex<VecDeque<TrainingSnapshot>>,
    calls: Mutex<Calls>,
}

impl FakeBackend {
    fn new(model_exists: bool, snapshots: Vec<TrainingSnapshot>) -> Self {
        Self { model_exists, snapshots: Mutex::new(snapshots.into()), calls: Mutex::new(Calls::default()) }
    }

    fn succeeding(model_exists: bool) -> Self {
        Self::new(
            model_exists,
            vec![
                snapshot(TrainingStatus::Starting, None),
                snapshot(TrainingStatus::Processing, Some("flux_train: 30%|███ | 300/1000 [01:00<02:20]")),
                TrainingSnapshot {
                    model_version: Some("daniel-carreon/daniel-flux-kontext-v2:abc123".to_string()),
                    ..snapshot(TrainingStatus::Succeeded, Some("| 1000/1000 [03:20<00:00]"))
                },
            ],
        )
    }
}

fn snapshot(status: TrainingStatus, logs: Option<&str>) -> TrainingSnapshot {
    TrainingSnapshot { status, logs: logs.map(String::from), model_version: None, error: None }
}

#[async_trait]
impl TrainingBackend for FakeBackend {
    fn id(&self) -> &'static str {
        "fake"
    }

    async fn find_model(&self, model: &ModelRef) -> TrainingResult<Option<RemoteModel>> {
        self.calls.lock().unwrap().find_model += 1;
        Ok(self.model_exists.then(|| RemoteModel { model: model.clone(), latest_version: None }))
    }

    async fn create_model(&self, model: &NewModel) -> TrainingResult<RemoteModel> {
        self.calls.lock().unwrap().create_model.push(model.clone());
        Ok(RemoteModel { model: model.model.clone(), latest_version: None })
    }

    async fn upload_archive(&self, archive: &Archive) -> TrainingResult<String> {
        self.calls.lock().unwrap().upload += 1;
        Ok(format!("https://files.example/{}", archive.sha256))
    }

    async fn create_training(&self, request: &TrainingRequest) -> TrainingResult<TrainingJob> {
        self.calls.lock().unwrap().create_training.push(request.clone());
        Ok(TrainingJob {
            id: TrainingJobId("train-1".to_string()),
            status: TrainingStatus::Starting,
            destination: request.destination.to_string(),
        })
    }

    async fn training_status(&self, _job_id: &TrainingJobId) -> TrainingResult<TrainingSnapshot> {
        self.calls.lock().unwrap().status += 1;
        let mut queue = self.snapshots.lock().unwrap();
        let next = if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() };
        Ok(next.unwrap_or_else(|| snapshot(TrainingStatus::Processing, None)))
    }
}

#[derive(Default)]
struct FakeGenerator {
    prompts: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn generate(&self, model: &str, prompt: &str) -> TrainingResult<Vec<String>> {
        self.prompts.lock().unwrap().push((model.to_string(), prompt.to_string()));
        Ok(vec!["https://replicate.delivery/out.webp".to_string()])
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<ProgressEvent>>);

impl ProgressSink for Recorder {
    fn on_event(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}

fn write_images(dir: &Path, prefix: &str, count: usize, width: u32, height: u32) {
    for i in 0..count {
        RgbImage::new(width, height).save(dir.join(format!("{prefix}_{i:02}.png"))).unwrap();
    }
}

fn fast_options() -> PipelineOptions {
    PipelineOptions { poll_interval_secs: 1, timeout_secs: 30, ..Default::default() }
}

#[tokio::test]
async fn test_seven_valid_three_small_produces_dense_archive() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_images(source.path(), "big", 7, 1024, 1024);
    write_images(source.path(), "small", 3, 256, 256);

    let backend = FakeBackend::succeeding(true);
    let generator = FakeGenerator::default();
    let recorder = Recorder::default();
    let pipeline = Pipeline {
        config: TrainingConfig::default(),
        options: fast_options(),
        source_dir: source.path().to_path_buf(),
        layout: TrainingLayout::new(output.path().to_path_buf()),
        backend: &backend,
        generator: &generator,
        progress: &recorder,
    };

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.collected, 10);
    assert_eq!(report.accepted, 7);
    assert_eq!(report.rejected.len(), 3);
    assert_eq!(report.archive.image_count, 7);

    let mut zip = zip::ZipArchive::new(std::fs::File::open(&report.archive.path).unwrap()).unwrap();
    let names: Vec<String> = zip.file_names().map(String::from).collect();
    for i in 0..7 {
        assert!(names.contains(&format!("image_{i:03}.png")), "missing image {i}");
        assert!(names.contains(&format!("image_{i:03}.txt")), "missing caption {i}");
    }
    assert!(!names.contains(&"image_007.png".to_string()));
    assert_eq!(names.iter().filter(|n| n.ends_with(".txt")).count(), 7);
    assert_eq!(names.len(), 15);

    let mut manifest = String::new();
    zip.by_name("config.json").unwrap().read_to_string(&mut manifest).unwrap();
    assert!(manifest.contains("\"total_images\": 7"));

    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls.upload, 1);
    assert_eq!(calls.create_training.len(), 1);
    assert!(calls.create_model.is_empty());
    assert_eq!(calls.create_training[0].input.input_images, format!("https://files.example/{}", report.archive.sha256));

    let generated = generator.prompts.lock().unwrap();
    assert_eq!(generated.len(), 4);
    assert!(generated.iter().all(|(model, _)| model == "daniel-carreon/daniel-flux-kontext-v2:abc123"));

    let events = recorder.0.lock().unwrap();
    let checkpoints: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Checkpoint { step, .. } => Some(*step),
            _ => None,
        })
        .collect();
    assert_eq!(checkpoints, vec![250, 500, 750, 1000]);

    assert!(output.path().join("pipeline_report.json").exists());
}

#[tokio::test]
async fn test_insufficient_data_stops_before_packaging() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_images(source.path(), "big", 3, 1024, 1024);

    let backend = FakeBackend::succeeding(true);
    let generator = FakeGenerator::default();
    let layout = TrainingLayout::new(output.path().join("run"));
    let pipeline = Pipeline {
        config: TrainingConfig::default(),
        options: fast_options(),
        source_dir: source.path().to_path_buf(),
        layout: layout.clone(),
        backend: &backend,
        generator: &generator,
        progress: &LogProgressSink,
    };

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, TrainingError::InsufficientData { found: 3, required: 5 }));
    assert!(!layout.archive_path().exists());

    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls.find_model, 0);
    assert_eq!(calls.upload, 0);
    assert!(calls.create_training.is_empty());
}

#[tokio::test]
async fn test_missing_destination_model_is_created() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_images(source.path(), "big", 5, 600, 800);

    let backend = FakeBackend::succeeding(false);
    let generator = FakeGenerator::default();
    let pipeline = Pipeline {
        config: TrainingConfig { trigger_word: "DANIELC".to_string(), ..Default::default() },
        options: fast_options(),
        source_dir: source.path().to_path_buf(),
        layout: TrainingLayout::new(output.path().to_path_buf()),
        backend: &backend,
        generator: &generator,
        progress: &LogProgressSink,
    };

    let report = pipeline.run().await.unwrap();
    assert!(report.submission.destination_created);

    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls.create_model.len(), 1);
    assert_eq!(calls.create_model[0].model.to_string(), "daniel-carreon/daniel-flux-kontext-v2");
    assert!(calls.create_model[0].description.contains("DANIELC"));
    assert_eq!(calls.create_training.len(), 1);
}

#[tokio::test]
async fn test_missing_source_directory() {
    let output = TempDir::new().unwrap();
    let backend = FakeBackend::succeeding(true);
    let generator = FakeGenerator::default();
    let pipeline = Pipeline {
        config: TrainingConfig::default(),
        options: fast_options(),
        source_dir: output.path().join("does-not-exist"),
        layout: TrainingLayout::new(output.path().to_path_buf()),
        backend: &backend,
        generator: &generator,
        progress: &LogProgressSink,
    };

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, TrainingError::DirectoryNotFound(_)));
}

#[tokio::test]
async fn test_failed_training_aborts_before_verification() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_images(source.path(), "big", 5, 512, 512);

    let backend = FakeBackend::new(
        true,
        vec![
            snapshot(TrainingStatus::Processing, None),
            TrainingSnapshot { error: Some("CUDA out of memory".to_string()), ..snapshot(TrainingStatus::Failed, None) },
        ],
    );
    let generator = FakeGenerator::default();
    let pipeline = Pipeline {
        config: TrainingConfig::default(),
        options: fast_options(),
        source_dir: source.path().to_path_buf(),
        layout: TrainingLayout::new(output.path().to_path_buf()),
        backend: &backend,
        generator: &generator,
        progress: &LogProgressSink,
    };

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, TrainingError::TrainingFailed { ref status, .. } if status == "failed"));
    assert!(generator.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_monitor_times_out_stuck_job() {
    let backend = FakeBackend::new(true, vec![snapshot(TrainingStatus::Processing, Some("| 10/1000 ["))]);
    let job = TrainingJob {
        id: TrainingJobId("stuck".to_string()),
        status: TrainingStatus::Starting,
        destination: "o/m".to_string(),
    };
    let options = kontext_training::MonitorOptions {
        poll_interval: std::time::Duration::from_millis(5),
        timeout: std::time::Duration::from_millis(40),
        progress_every_steps: 50,
        save_steps: 250,
        max_train_steps: 1000,
    };

    let err = kontext_training::monitor_training(&backend, &job, &options, &LogProgressSink)
        .await
        .unwrap_err();
    assert!(matches!(err, TrainingError::Timeout { ref job_id, .. } if job_id == "stuck"));
    assert!(backend.calls.lock().unwrap().status >= 2);
}

#[tokio::test]
async fn test_monitor_ignores_non_training_progress_bars() {
    let backend = FakeBackend::new(
        true,
        vec![
            snapshot(TrainingStatus::Processing, Some("Caching latents: 100%|██████████| 1200/1200 [00:40<00:00]")),
            snapshot(TrainingStatus::Processing, Some("flux_train: 10%|█ | 100/1000 [00:20<03:00]")),
            snapshot(
                TrainingStatus::Succeeded,
                Some("flux_train: 100%|██████████| 1000/1000 [03:20<00:00]\nUploading weights: 100%|███| 3/3 [00:02<00:00]"),
            ),
        ],
    );
    let job = TrainingJob {
        id: TrainingJobId("mixed".to_string()),
        status: TrainingStatus::Starting,
        destination: "o/m".to_string(),
    };
    let options = kontext_training::MonitorOptions {
        poll_interval: std::time::Duration::from_millis(1),
        timeout: std::time::Duration::from_secs(30),
        progress_every_steps: 50,
        save_steps: 250,
        max_train_steps: 1000,
    };
    let recorder = Recorder::default();

    let outcome = kontext_training::monitor_training(&backend, &job, &options, &recorder).await.unwrap();
    assert_eq!(outcome.final_step, Some(1000));
    assert_eq!(outcome.polls, 3);

    let events = recorder.0.into_inner().unwrap();
    let observed: Vec<(&str, u64)> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Step { step, .. } => Some(("step", *step)),
            ProgressEvent::Checkpoint { step, .. } => Some(("checkpoint", *step)),
            _ => None,
        })
        .collect();
    assert_eq!(
        observed,
        vec![
            ("step", 100),
            ("step", 1000),
            ("checkpoint", 250),
            ("checkpoint", 500),
            ("checkpoint", 750),
            ("checkpoint", 1000),
        ]
    );
}

#[tokio::test]
async fn test_unwritable_output_fails_as_packaging_before_submission() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_images(source.path(), "big", 6, 1024, 1024);
    let blocker = output.path().join("occupied");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let backend = FakeBackend::succeeding(true);
    let generator = FakeGenerator::default();
    let pipeline = Pipeline {
        config: TrainingConfig::default(),
        options: fast_options(),
        source_dir: source.path().to_path_buf(),
        layout: TrainingLayout::new(blocker.join("run")),
        backend: &backend,
        generator: &generator,
        progress: &LogProgressSink,
    };

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, TrainingError::Packaging(_)), "unexpected error: {err:?}");

    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls.find_model, 0);
    assert_eq!(calls.upload, 0);
    assert!(calls.create_training.is_empty());
}
