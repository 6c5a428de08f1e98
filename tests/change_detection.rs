//! End-to-end change detection over real image files and the monitor thread.

use frame_fingerprint::capture::{
    CaptureConfig, FileConfig, FrameSource, ImageDirSource, SnapshotWriter, SyntheticSource,
};
use frame_fingerprint::detection::{
    spawn_monitor, ChangeDetector, ChangeMonitor, RecorderStateMachine, Verdict,
};
use frame_fingerprint::fingerprint::Extractor;
use image::{GrayImage, Luma};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn write_gray(dir: &Path, name: &str, value: u8) {
    GrayImage::from_pixel(32, 24, Luma([value]))
        .save(dir.join(name))
        .unwrap();
}

#[test]
fn black_and_white_files() {
    let dir = tempfile::tempdir().unwrap();
    write_gray(dir.path(), "black.png", 0);
    write_gray(dir.path(), "white.png", 255);

    let extractor = Extractor::new();
    let black = extractor.extract_path(dir.path().join("black.png")).unwrap();
    let white = extractor.extract_path(dir.path().join("white.png")).unwrap();

    assert_eq!(black.dark_cells(), 256);
    assert_eq!(white.dark_cells(), 0);
    assert_eq!(black.matching_cells(&white), 0);
}

#[test]
fn history_keeps_only_the_latest_pair() {
    let extractor = Extractor::new();
    let mut detector = ChangeDetector::default();

    let frames = [0u8, 255, 255];
    let verdicts: Vec<Verdict> = frames
        .iter()
        .map(|&v| {
            let image = image::DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 30, Luma([v])));
            detector.observe(extractor.extract(&image).unwrap())
        })
        .collect();

    assert_eq!(verdicts[0], Verdict::Priming);
    assert!(verdicts[1].is_changed());
    assert!(matches!(verdicts[2], Verdict::Unchanged(c) if c.matching == 256));

    let (older, newer) = detector.history().pair().unwrap();
    assert_eq!(older.dark_cells(), 0);
    assert_eq!(newer.dark_cells(), 0);
}

#[test]
fn directory_source_drives_monitor() {
    let dir = tempfile::tempdir().unwrap();
    write_gray(dir.path(), "01.png", 20);
    write_gray(dir.path(), "02.png", 22);
    write_gray(dir.path(), "03.png", 240);

    let mut source = ImageDirSource::new(dir.path());
    source.open(&CaptureConfig::default()).unwrap();

    let snapshots = SnapshotWriter::new(dir.path().join("changed")).unwrap();
    let mut monitor = ChangeMonitor::new(
        source,
        Extractor::new(),
        ChangeDetector::default(),
        Duration::from_millis(1),
    )
    .with_snapshots(snapshots);

    assert_eq!(monitor.tick().unwrap().verdict, Verdict::Priming);
    let same = monitor.tick().unwrap();
    assert!(matches!(same.verdict, Verdict::Unchanged(_)));
    assert!(same.snapshot.is_none());

    let changed = monitor.tick().unwrap();
    assert!(changed.verdict.is_changed());
    let saved = changed.snapshot.expect("changed frame should be saved");
    assert!(saved.starts_with(dir.path().join("changed")));
    assert!(saved.exists());
}

#[test]
fn monitor_thread_runs_while_recording() {
    let mut config = FileConfig::default();
    config.capture = CaptureConfig::with_dimensions(64, 48);
    config.monitor.interval_ms = 2;

    let mut recorder = RecorderStateMachine::new();
    let events = recorder.subscribe();
    let shutdown = Arc::new(AtomicBool::new(false));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let handle = {
        let seen = Arc::clone(&seen);
        spawn_monitor(
            || SyntheticSource::new().change_every(3),
            config,
            None,
            Some(6),
            events,
            Arc::clone(&shutdown),
            move |report| seen.lock().unwrap().push(report.verdict),
        )
        .unwrap()
    };

    recorder.start_preview();
    recorder.toggle_recording().unwrap();

    let summary = handle.join().unwrap().unwrap();
    assert_eq!(summary.ticks, 6);
    assert_eq!(summary.failed_ticks, 0);

    // scenes: frames 1-3 normal, 4-6 inverted
    let verdicts = seen.lock().unwrap().clone();
    assert_eq!(verdicts.len(), 6);
    assert_eq!(verdicts[0], Verdict::Priming);
    let changed: Vec<bool> = verdicts.iter().map(Verdict::is_changed).collect();
    assert_eq!(changed, vec![false, false, false, true, false, false]);
    assert_eq!(summary.changes, 1);
}
