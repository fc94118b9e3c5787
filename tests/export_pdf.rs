//! 导出 PDF 的端到端流程：临时文件、渲染表面、保存对话框与 lastSavePath

mod support;

use serde_json::{json, Map, Value};
use std::fs;
use std::sync::Arc;

use patientcare::config::{default_documents_dir, PrintConfig};
use patientcare::print_pipeline::render::SurfaceKind;
use patientcare::store::LAST_SAVE_PATH_KEY;
use patientcare::{ConfigStore, ExportRequest, JsonFileStore, MemoryStore, PrintService, SaveResult};
use support::{Behavior, FakeEngine, Harness, ScriptedDialog, FAKE_PDF};

fn request(template: &str) -> ExportRequest {
    ExportRequest {
        template_html: Some(template.to_string()),
        pdf_options: Map::new(),
    }
}

fn options(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn saves_pdf_and_remembers_directory() {
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("out.pdf");
    let h = Harness::new(Behavior::default(), ScriptedDialog::choosing(&target));

    let result = h.service.export_pdf(request("<p>hi</p>")).await;

    assert_eq!(
        result,
        SaveResult {
            success: true,
            canceled: None,
            path: Some(target.to_string_lossy().to_string()),
            error: None,
        }
    );
    assert_eq!(fs::read(&target).unwrap(), FAKE_PDF);
    assert_eq!(
        h.store.get(LAST_SAVE_PATH_KEY),
        Some(out.path().to_string_lossy().to_string())
    );

    {
        let journal = h.engine.journal();
        assert_eq!(journal.spawned, vec![SurfaceKind::Offscreen]);
        assert_eq!(journal.loaded_html, vec!["<p>hi</p>"]);
        assert_eq!(journal.navigations[0].scheme(), "file");
        assert!(journal.pdf_requests[0].print_background);
        assert_eq!(journal.double_closes, 0);
    }
    assert_eq!(h.engine.live_surfaces(), 0);
    assert_eq!(h.leftover_artifacts(), 0);
}

#[tokio::test]
async fn response_serializes_without_empty_fields() {
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("out.pdf");
    let h = Harness::new(Behavior::default(), ScriptedDialog::choosing(&target));

    let result = h.service.export_pdf(request("<p>hi</p>")).await;
    let wire = serde_json::to_value(&result).unwrap();
    assert_eq!(
        wire,
        json!({ "success": true, "path": target.to_string_lossy() })
    );

    let canceled = serde_json::to_value(SaveResult::canceled()).unwrap();
    assert_eq!(canceled, json!({ "success": false, "canceled": true }));
}

#[tokio::test]
async fn cancel_writes_nothing() {
    let store = MemoryStore::new();
    store.set(LAST_SAVE_PATH_KEY, "/previous/dir").unwrap();
    let h = Harness::with_store(Behavior::default(), ScriptedDialog::canceling(), store);

    let result = h.service.export_pdf(request("<p>hi</p>")).await;

    assert_eq!(result, SaveResult::canceled());
    assert_eq!(h.dialog.shown(), 1);
    assert_eq!(
        h.store.get(LAST_SAVE_PATH_KEY).as_deref(),
        Some("/previous/dir")
    );
    assert_eq!(h.engine.live_surfaces(), 0);
    assert_eq!(h.leftover_artifacts(), 0);
    assert!(!h.workdir.path().join("Prescription - Patient Care.pdf").exists());
}

#[tokio::test]
async fn dialog_is_seeded_from_last_save_path() {
    let store = MemoryStore::new();
    store.set(LAST_SAVE_PATH_KEY, "/srv/prescriptions").unwrap();
    let h = Harness::with_store(Behavior::default(), ScriptedDialog::canceling(), store);

    h.service.export_pdf(request("<p>hi</p>")).await;

    let requests = h.dialog.requests.lock().unwrap();
    let seeded = &requests[0];
    assert_eq!(seeded.directory, std::path::PathBuf::from("/srv/prescriptions"));
    assert_eq!(seeded.file_name, "Prescription - Patient Care.pdf");
    assert_eq!(seeded.extension, "pdf");
    assert!(seeded.can_create_directories);
    assert_eq!(
        seeded.default_path(),
        std::path::PathBuf::from("/srv/prescriptions/Prescription - Patient Care.pdf")
    );
}

#[tokio::test]
async fn dialog_falls_back_to_documents_dir() {
    let h = Harness::new(Behavior::default(), ScriptedDialog::canceling());

    h.service.export_pdf(request("<p>hi</p>")).await;

    let requests = h.dialog.requests.lock().unwrap();
    assert_eq!(requests[0].directory, default_documents_dir());
}

#[tokio::test]
async fn caller_options_reach_converter() {
    let out = tempfile::tempdir().unwrap();
    let h = Harness::new(
        Behavior::default(),
        ScriptedDialog::choosing(out.path().join("rx.pdf")),
    );

    let result = h
        .service
        .export_pdf(ExportRequest {
            template_html: Some("<p>hi</p>".to_string()),
            pdf_options: options(json!({
                "printBackground": false,
                "landscape": true,
                "pageSize": "A4"
            })),
        })
        .await;

    assert!(result.success);
    let journal = h.engine.journal();
    let sent = &journal.pdf_requests[0];
    assert!(!sent.print_background);
    assert!(sent.landscape);
}

#[tokio::test]
async fn navigation_failure_still_cleans_up() {
    let behavior = Behavior {
        fail_navigation: true,
        ..Behavior::default()
    };
    let h = Harness::new(behavior, ScriptedDialog::choosing("/tmp/never.pdf"));

    let result = h.service.export_pdf(request("<p>hi</p>")).await;

    assert!(!result.success);
    assert_eq!(result.canceled, None);
    assert!(result.error.unwrap().contains("ERR_FILE_NOT_FOUND"));
    assert_eq!(h.dialog.shown(), 0);
    {
        let journal = h.engine.journal();
        assert_eq!(journal.spawned.len(), 1);
        assert_eq!(journal.closed, 1);
        assert_eq!(journal.double_closes, 0);
    }
    assert_eq!(h.leftover_artifacts(), 0);
}

#[tokio::test]
async fn conversion_failure_is_reported_and_cleaned_up() {
    let behavior = Behavior {
        fail_pdf: true,
        ..Behavior::default()
    };
    let h = Harness::new(behavior, ScriptedDialog::choosing("/tmp/never.pdf"));

    let result = h.service.export_pdf(request("<p>hi</p>")).await;

    let error = result.error.unwrap();
    assert!(error.starts_with("PDF conversion failed"), "{error}");
    assert_eq!(h.dialog.shown(), 0);
    assert_eq!(h.engine.live_surfaces(), 0);
    assert_eq!(h.leftover_artifacts(), 0);
}

#[tokio::test]
async fn stalled_render_host_times_out() {
    let behavior = Behavior {
        hang_settle: true,
        ..Behavior::default()
    };
    let h = Harness::new(behavior, ScriptedDialog::choosing("/tmp/never.pdf"));

    let result = h.service.export_pdf(request("<p>hi</p>")).await;

    let error = result.error.unwrap();
    assert!(error.contains("timed out during settle"), "{error}");
    assert!(h.engine.journal().pdf_requests.is_empty());
    assert_eq!(h.engine.live_surfaces(), 0);
    assert_eq!(h.leftover_artifacts(), 0);
}

#[tokio::test]
async fn launch_failure_leaves_no_artifact() {
    let behavior = Behavior {
        fail_spawn: true,
        ..Behavior::default()
    };
    let h = Harness::new(behavior, ScriptedDialog::choosing("/tmp/never.pdf"));

    let result = h.service.export_pdf(request("<p>hi</p>")).await;

    assert!(result.error.unwrap().contains("browser failed to launch"));
    assert_eq!(h.leftover_artifacts(), 0);
}

#[tokio::test]
async fn invalid_options_fail_before_any_work() {
    let h = Harness::new(Behavior::default(), ScriptedDialog::choosing("/tmp/never.pdf"));

    let result = h
        .service
        .export_pdf(ExportRequest {
            template_html: Some("<p>hi</p>".to_string()),
            pdf_options: options(json!({ "scale": 9 })),
        })
        .await;

    assert!(result.error.unwrap().starts_with("Invalid options"));
    assert!(h.engine.journal().spawned.is_empty());
    assert!(!h.service.config().export_temp_dir.exists());
}

#[tokio::test]
async fn missing_template_is_an_input_error() {
    let h = Harness::new(Behavior::default(), ScriptedDialog::choosing("/tmp/never.pdf"));

    let result = h.service.export_pdf(ExportRequest::default()).await;

    assert_eq!(result.error.as_deref(), Some("Missing input: template"));
    assert!(h.engine.journal().spawned.is_empty());
}

#[tokio::test]
async fn unwritable_destination_keeps_last_save_path() {
    let store = MemoryStore::new();
    store.set(LAST_SAVE_PATH_KEY, "/previous/dir").unwrap();
    let missing = tempfile::tempdir().unwrap().path().join("gone").join("out.pdf");
    let h = Harness::with_store(Behavior::default(), ScriptedDialog::choosing(&missing), store);

    let result = h.service.export_pdf(request("<p>hi</p>")).await;

    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("Failed to write"));
    assert_eq!(
        h.store.get(LAST_SAVE_PATH_KEY).as_deref(),
        Some("/previous/dir")
    );
    assert_eq!(h.engine.live_surfaces(), 0);
    assert_eq!(h.leftover_artifacts(), 0);
}

#[tokio::test]
async fn concurrent_exports_use_separate_surfaces() {
    let out = tempfile::tempdir().unwrap();
    let h = Harness::new(
        Behavior::default(),
        ScriptedDialog::choosing(out.path().join("out.pdf")),
    );

    let (a, b) = tokio::join!(
        h.service.export_pdf(request("<p>a</p>")),
        h.service.export_pdf(request("<p>b</p>")),
    );

    assert!(a.success && b.success);
    {
        let journal = h.engine.journal();
        assert_eq!(journal.spawned.len(), 2);
        assert_eq!(journal.closed, 2);
        assert_ne!(journal.navigations[0], journal.navigations[1]);
        let mut html = journal.loaded_html.clone();
        html.sort();
        assert_eq!(html, vec!["<p>a</p>", "<p>b</p>"]);
    }
    assert_eq!(h.leftover_artifacts(), 0);
}

#[tokio::test]
async fn last_save_path_is_persisted_to_disk() {
    let workdir = tempfile::tempdir().unwrap();
    let out = workdir.path().join("saved");
    fs::create_dir(&out).unwrap();
    let config_file = workdir.path().join("config").join("config.json");

    let service = PrintService::new(
        Arc::new(FakeEngine::new(Behavior::default())),
        Arc::new(JsonFileStore::open(&config_file).unwrap()),
        Arc::new(ScriptedDialog::choosing(out.join("rx.pdf"))),
        PrintConfig {
            export_temp_dir: workdir.path().join("export"),
            ..PrintConfig::default()
        },
    );

    let result = service.export_pdf(request("<p>hi</p>")).await;
    assert!(result.success);

    let reopened = JsonFileStore::open(&config_file).unwrap();
    assert_eq!(
        reopened.get(LAST_SAVE_PATH_KEY),
        Some(out.to_string_lossy().to_string())
    );
}
