use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use signmerge::{
    ReconcileConfig, Reconciler, SplitLabel, detect_overlaps, load_msasl_records,
    load_wlasl_records, write_discards, write_metadata,
};

const WLASL_JSON: &str = r#"[
    {
        "gloss": "book",
        "instances": [
            {
                "video_id": "1001",
                "url": "www.youtube.com/watch?v=shared",
                "fps": 25.0,
                "frame_start": 1,
                "frame_end": 125,
                "split": "train"
            },
            {
                "video_id": "1002",
                "url": "https://host/only_wlasl.mp4",
                "fps": 25.0,
                "frame_start": 1,
                "frame_end": -1,
                "split": "val"
            }
        ]
    },
    {
        "gloss": "cat",
        "instances": [
            {
                "video_id": "1003",
                "url": "https://host/conflict.mp4",
                "fps": 25.0,
                "frame_start": 1,
                "frame_end": -1,
                "split": "train"
            }
        ]
    }
]"#;

const MSASL_TRAIN: &str = r#"[
    {
        "url": "www.youtube.com/watch?v=shared",
        "clean_text": "Book",
        "start_time": 0.0,
        "end_time": 5.0,
        "fps": 25.0
    }
]"#;

const MSASL_VAL: &str = "[]";

const MSASL_TEST: &str = r#"[
    {
        "url": "https://host/conflict.mp4",
        "clean_text": "cat",
        "start_time": 1.0,
        "end_time": 2.0,
        "fps": 25.0
    }
]"#;

fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf, PathBuf, PathBuf) {
    let wlasl = dir.join("wlasl.json");
    let train = dir.join("msasl_train.json");
    let val = dir.join("msasl_val.json");
    let test = dir.join("msasl_test.json");
    fs::write(&wlasl, WLASL_JSON).unwrap();
    fs::write(&train, MSASL_TRAIN).unwrap();
    fs::write(&val, MSASL_VAL).unwrap();
    fs::write(&test, MSASL_TEST).unwrap();
    (wlasl, train, val, test)
}

#[test]
fn corpora_flow_from_json_to_metadata_table() {
    let dir = tempdir().unwrap();
    let (wlasl_path, train, val, test) = write_fixtures(dir.path());

    let wlasl = load_wlasl_records(&wlasl_path, None).unwrap();
    let msasl = load_msasl_records(&train, &val, &test).unwrap();
    assert_eq!(wlasl.len(), 3);
    assert_eq!(msasl.len(), 2);

    let entries = detect_overlaps(&wlasl, &msasl);
    assert_eq!(entries.len(), 2);

    let engine = Reconciler::new(ReconcileConfig::default()).unwrap();
    let output = engine.run(&wlasl, &msasl, &entries).unwrap();

    // The shared-url msasl record duplicates wlasl 1001 exactly (same label,
    // full interval) and is discarded; the conflict-url pair survives locked
    // to test.
    assert_eq!(output.diagnostics.discarded_duplicates, 1);
    assert_eq!(output.rows.len(), 4);

    let conflict_splits: Vec<SplitLabel> = output
        .rows
        .iter()
        .filter(|row| {
            row.url
                .as_deref()
                .map(|url| url.contains("conflict"))
                .unwrap_or(false)
        })
        .map(|row| row.final_split)
        .collect();
    assert_eq!(conflict_splits, vec![SplitLabel::Test, SplitLabel::Test]);

    let metadata_path = dir.path().join("metadata.csv");
    let discards_path = dir.path().join("discards.csv");
    write_metadata(&metadata_path, &output.rows).unwrap();
    write_discards(&discards_path, &output.discards).unwrap();

    let metadata = fs::read_to_string(&metadata_path).unwrap();
    assert!(metadata.starts_with(
        "instance_id,source_dataset,label_text,video_filename,final_split,url"
    ));
    assert_eq!(metadata.lines().count(), 5);
    assert!(!metadata.contains("msasl::train_000000"));

    let discards = fs::read_to_string(&discards_path).unwrap();
    assert!(discards.contains("msasl::train_000000"));
    assert!(discards.contains("exact duplicate of wlasl::1001"));
}

#[test]
fn repeated_runs_write_byte_identical_tables() {
    let dir = tempdir().unwrap();
    let (wlasl_path, train, val, test) = write_fixtures(dir.path());

    let mut tables = Vec::new();
    for run in 0..2 {
        let wlasl = load_wlasl_records(&wlasl_path, None).unwrap();
        let msasl = load_msasl_records(&train, &val, &test).unwrap();
        let entries = detect_overlaps(&wlasl, &msasl);
        let engine = Reconciler::new(ReconcileConfig::default()).unwrap();
        let output = engine.run(&wlasl, &msasl, &entries).unwrap();

        let path = dir.path().join(format!("metadata_{run}.csv"));
        write_metadata(&path, &output.rows).unwrap();
        tables.push(fs::read(&path).unwrap());
    }
    assert_eq!(tables[0], tables[1]);
}
