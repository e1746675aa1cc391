//! Integration tests for the resume analysis pipeline.
//!
//! Every test here runs offline. The model is either a recording mock or a
//! real [`GeminiClient`] pointed at a one-shot local HTTP server.
//!
//! Tests that need the pdfium shared library print `SKIP` and return when it
//! cannot be bound. Point `PDFIUM_LIB_PATH` at libpdfium to run them:
//!   PDFIUM_LIB_PATH=/opt/pdfium/lib cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use resume_ats::pipeline::render::bind_pdfium;
use resume_ats::{
    run_inference, AnalysisProgressCallback, AtsError, ContentPart, CycleState, DocumentBytes,
    EncodedImagePart,
    GeminiClient, GenerativeModel, Generation, InferenceConfig, InferenceError,
    InstructionTemplate, RenderConfig, ResumeAnalyzer, TemplateSelector, Triggers,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const JOB_DESCRIPTION: &str = "Senior backend engineer, Go and distributed systems";

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("resume_ats=debug")
        .try_init();
}

/// Records a description of every part of every call.
#[derive(Default)]
struct RecordingModel {
    calls: Mutex<Vec<Vec<String>>>,
    count: AtomicUsize,
    reply: String,
}

impl RecordingModel {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            ..Default::default()
        })
    }

    fn call_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for RecordingModel {
    fn model_id(&self) -> &str {
        "recording-mock"
    }

    async fn generate(&self, parts: &[ContentPart<'_>]) -> Result<Generation, InferenceError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        let described = parts
            .iter()
            .map(|p| match p {
                ContentPart::Text(t) => format!("text:{t}"),
                ContentPart::InlineImage(img) => format!("image:{}", img.mime_type),
            })
            .collect();
        self.calls.lock().unwrap().push(described);
        Ok(Generation {
            text: self.reply.clone(),
            prompt_tokens: Some(1200),
            output_tokens: Some(42),
        })
    }
}

/// Always fails with an API error.
struct FailingModel {
    count: AtomicUsize,
}

#[async_trait]
impl GenerativeModel for FailingModel {
    fn model_id(&self) -> &str {
        "failing-mock"
    }

    async fn generate(&self, _parts: &[ContentPart<'_>]) -> Result<Generation, InferenceError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Err(InferenceError::Api {
            status: 503,
            detail: "UNAVAILABLE: model overloaded".into(),
        })
    }
}

/// Records progress events as short strings.
#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl EventLog {
    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }
}

impl AnalysisProgressCallback for EventLog {
    fn on_render_start(&self, page_index: usize) {
        self.push(format!("render_start:{page_index}"));
    }

    fn on_render_complete(&self, encoded_len: usize) {
        assert!(encoded_len > 0);
        self.push("render_complete".into());
    }

    fn on_inference_start(&self, template: InstructionTemplate, model: &str) {
        self.push(format!("inference_start:{template:?}:{model}"));
    }

    fn on_inference_complete(&self, response_len: usize) {
        self.push(format!("inference_complete:{response_len}"));
    }

    fn on_error(&self, _error: &str) {
        self.push("error".into());
    }
}

/// Smallest valid JPEG: SOI + EOI.
fn tiny_image() -> EncodedImagePart {
    EncodedImagePart::from_jpeg_bytes(&[0xFF, 0xD8, 0xFF, 0xD9])
}

/// A one-page US Letter PDF with a single line of text.
fn minimal_pdf() -> Vec<u8> {
    pdf_with_pages(&[(612, 792)])
}

/// A PDF with one page per `(width, height)` MediaBox and a correct xref.
/// An empty slice gives a document whose page tree has no kids.
fn pdf_with_pages(sizes: &[(u32, u32)]) -> Vec<u8> {
    let stream = b"BT /F1 24 Tf 72 700 Td (Jane Doe - Backend Engineer) Tj ET";
    let page_obj = |i: usize| 4 + 2 * i;
    let kids = (0..sizes.len())
        .map(|i| format!("{} 0 R", page_obj(i)))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", sizes.len()).into_bytes(),
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec(),
    ];
    for (i, (w, h)) in sizes.iter().enumerate() {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}] \
/Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                page_obj(i) + 1
            )
            .into_bytes(),
        );
        objects.push(
            [
                format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes(),
                stream.to_vec(),
                b"\nendstream".to_vec(),
            ]
            .concat(),
        );
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        pdf.extend_from_slice(body);
        pdf.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for off in offsets {
        pdf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    pdf
}

fn decoded_size(part: &EncodedImagePart) -> (u32, u32) {
    let jpeg = part.decode().unwrap();
    let img = image::load_from_memory(&jpeg).unwrap();
    (img.width(), img.height())
}

fn render_config() -> RenderConfig {
    let mut builder = RenderConfig::builder();
    if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        builder = builder.pdfium_library(PathBuf::from(path));
    }
    builder.build().unwrap()
}

/// Skip the current test when pdfium cannot be loaded.
macro_rules! skip_unless_pdfium {
    ($config:expr) => {{
        if let Err(e) = bind_pdfium($config) {
            println!("SKIP — pdfium not available: {e}");
            return;
        }
    }};
}

// ── Inference ordering ───────────────────────────────────────────────────────

#[tokio::test]
async fn parts_are_job_description_image_instruction() {
    init_tracing();
    let model = RecordingModel::replying("ok");
    let image = [tiny_image()];

    let response = run_inference(
        model.as_ref(),
        JOB_DESCRIPTION,
        &image,
        InstructionTemplate::SkillImprovement,
    )
    .await
    .unwrap();

    assert_eq!(response.text, "ok");
    assert_eq!(response.model, "recording-mock");
    assert_eq!(response.prompt_tokens, Some(1200));
    assert_eq!(model.call_count(), 1);

    let calls = model.calls();
    assert_eq!(
        calls[0],
        vec![
            format!("text:{JOB_DESCRIPTION}"),
            "image:image/jpeg".to_string(),
            format!("text:{}", InstructionTemplate::SkillImprovement.text()),
        ]
    );
}

#[tokio::test]
async fn empty_job_description_is_sent_as_is() {
    let model = RecordingModel::replying("fine");
    let image = [tiny_image()];

    run_inference(model.as_ref(), "", &image, InstructionTemplate::ResumeSummary)
        .await
        .unwrap();

    assert_eq!(model.calls()[0][0], "text:");
}

#[tokio::test]
async fn wrong_image_count_never_reaches_the_model() {
    let model = RecordingModel::replying("unused");

    let err = run_inference(model.as_ref(), JOB_DESCRIPTION, &[], InstructionTemplate::PercentageMatch)
        .await
        .unwrap_err();
    assert!(matches!(err, AtsError::InvalidRequest(_)), "got {err:?}");

    let two = [tiny_image(), tiny_image()];
    let err = run_inference(model.as_ref(), JOB_DESCRIPTION, &two, InstructionTemplate::PercentageMatch)
        .await
        .unwrap_err();
    assert!(matches!(err, AtsError::InvalidRequest(_)), "got {err:?}");

    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn inference_failure_propagates() {
    let model = FailingModel {
        count: AtomicUsize::new(0),
    };
    let image = [tiny_image()];

    let err = run_inference(&model, JOB_DESCRIPTION, &image, InstructionTemplate::ResumeSummary)
        .await
        .unwrap_err();

    match err {
        AtsError::InferenceService(InferenceError::Api { status, .. }) => assert_eq!(status, 503),
        ref other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_pre_inference());
    // No retries.
    assert_eq!(model.count.load(Ordering::SeqCst), 1);
}

// ── Guard conditions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn trigger_without_document_reports_missing_and_skips_model() {
    let model = RecordingModel::replying("unused");
    let analyzer = ResumeAnalyzer::with_model(model.clone(), RenderConfig::default());
    let mut selector = TemplateSelector::new();

    for template in InstructionTemplate::ALL {
        let err = selector
            .run(&analyzer, Triggers::only(template), None, JOB_DESCRIPTION)
            .await
            .unwrap_err();
        assert!(matches!(err, AtsError::MissingDocument), "got {err:?}");
        assert_eq!(selector.state(), CycleState::Idle);
    }

    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn missing_document_reports_render_start_then_error() {
    let model = RecordingModel::replying("unused");
    let log = Arc::new(EventLog::default());
    let analyzer = ResumeAnalyzer::with_model(model.clone(), RenderConfig::default())
        .with_progress(log.clone());

    let err = analyzer
        .analyze(None, JOB_DESCRIPTION, InstructionTemplate::ResumeSummary)
        .await
        .unwrap_err();

    assert!(matches!(err, AtsError::MissingDocument));
    assert_eq!(log.events(), vec!["render_start:0", "error"]);
    assert_eq!(model.call_count(), 0);
}

#[test]
fn no_trigger_is_a_no_op() {
    let model = RecordingModel::replying("unused");
    let analyzer = ResumeAnalyzer::with_model(model.clone(), RenderConfig::default());
    let mut selector = TemplateSelector::new();

    let outcome = tokio_test::block_on(selector.run(
        &analyzer,
        Triggers::default(),
        Some(DocumentBytes::from_vec(minimal_pdf())),
        JOB_DESCRIPTION,
    ))
    .unwrap();

    assert!(outcome.is_none());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn malformed_bytes_fail_before_inference() {
    let model = RecordingModel::replying("unused");
    let analyzer = ResumeAnalyzer::with_model(model.clone(), RenderConfig::default());

    let err = analyzer
        .analyze(
            Some(DocumentBytes::from(&b"this is not a pdf at all"[..])),
            JOB_DESCRIPTION,
            InstructionTemplate::PercentageMatch,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AtsError::DocumentProcessing { .. }), "got {err:?}");
    assert!(err.is_pre_inference());
    assert_eq!(model.call_count(), 0);
}

// ── Rendering (needs pdfium) ─────────────────────────────────────────────────

#[tokio::test]
async fn first_page_renders_to_a_single_jpeg() {
    init_tracing();
    let config = render_config();
    skip_unless_pdfium!(&config);

    let parts = resume_ats::rasterize_first_page(Some(DocumentBytes::from_vec(minimal_pdf())), &config)
        .await
        .unwrap();

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].mime_type, "image/jpeg");
    assert_eq!(&parts[0].decode().unwrap()[..2], &[0xFF, 0xD8]);
    assert_eq!(decoded_size(&parts[0]), (612, 792));
}

#[tokio::test]
async fn multi_page_document_renders_only_the_first_page() {
    let config = render_config();
    skip_unless_pdfium!(&config);

    let pdf = pdf_with_pages(&[(612, 792), (300, 300), (842, 595)]);
    let parts = resume_ats::rasterize_first_page(Some(DocumentBytes::from_vec(pdf)), &config)
        .await
        .unwrap();

    assert_eq!(parts.len(), 1);
    assert_eq!(decoded_size(&parts[0]), (612, 792));
}

#[tokio::test]
async fn header_after_leading_newline_still_renders() {
    let config = render_config();
    skip_unless_pdfium!(&config);

    let mut pdf = b"\r\n".to_vec();
    pdf.extend_from_slice(&minimal_pdf());
    let parts = resume_ats::rasterize_first_page(Some(DocumentBytes::from_vec(pdf)), &config)
        .await
        .unwrap();

    assert_eq!(parts.len(), 1);
}

#[tokio::test]
async fn corrupt_body_after_valid_header_fails_before_inference() {
    let config = render_config();
    skip_unless_pdfium!(&config);

    let model = RecordingModel::replying("unused");
    let analyzer = ResumeAnalyzer::with_model(model.clone(), config);

    let err = analyzer
        .analyze(
            Some(DocumentBytes::from(&b"%PDF-1.4\n garbage"[..])),
            JOB_DESCRIPTION,
            InstructionTemplate::ResumeSummary,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AtsError::DocumentProcessing { .. }), "got {err:?}");
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn zero_page_document_is_a_processing_error() {
    let config = render_config();
    skip_unless_pdfium!(&config);

    let err = resume_ats::rasterize_first_page(Some(DocumentBytes::from_vec(pdf_with_pages(&[]))), &config)
        .await
        .unwrap_err();

    match err {
        AtsError::DocumentProcessing { detail } => {
            assert!(detail.contains("no pages"), "got {detail}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn progress_events_follow_the_pipeline() {
    let config = render_config();
    skip_unless_pdfium!(&config);

    let model = RecordingModel::replying("Strong Go background.");
    let log = Arc::new(EventLog::default());
    let analyzer = ResumeAnalyzer::with_model(model.clone(), config).with_progress(log.clone());

    analyzer
        .analyze(
            Some(DocumentBytes::from_vec(minimal_pdf())),
            JOB_DESCRIPTION,
            InstructionTemplate::SkillImprovement,
        )
        .await
        .unwrap();

    assert_eq!(
        log.events(),
        vec![
            "render_start:0".to_string(),
            "render_complete".to_string(),
            "inference_start:SkillImprovement:recording-mock".to_string(),
            format!("inference_complete:{}", "Strong Go background.".len()),
        ]
    );
}

#[tokio::test]
async fn out_of_range_page_is_a_processing_error() {
    let config = RenderConfig {
        page_index: 3,
        ..render_config()
    };
    skip_unless_pdfium!(&config);

    let err = resume_ats::rasterize_first_page(Some(DocumentBytes::from_vec(minimal_pdf())), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, AtsError::DocumentProcessing { .. }), "got {err:?}");
}

#[tokio::test]
async fn each_trigger_sends_its_own_template_once() {
    let config = render_config();
    skip_unless_pdfium!(&config);

    for template in InstructionTemplate::ALL {
        let model = RecordingModel::replying("Percentage match: 62%");
        let analyzer = ResumeAnalyzer::with_model(model.clone(), config.clone());
        let mut selector = TemplateSelector::new();

        let response = selector
            .run(
                &analyzer,
                Triggers::only(template),
                Some(DocumentBytes::from_vec(minimal_pdf())),
                JOB_DESCRIPTION,
            )
            .await
            .unwrap()
            .expect("a single trigger must produce a response");

        assert_eq!(response.template, template);
        assert_eq!(response.text, "Percentage match: 62%");
        assert_eq!(model.call_count(), 1);
        assert_eq!(model.calls()[0][2], format!("text:{}", template.text()));
        assert_eq!(selector.state(), CycleState::Idle);
    }
}

// ── Gemini client over a local HTTP server ───────────────────────────────────

/// Accept one request, hand its raw headers and body to the test, answer
/// with `status` and `body`.
async fn one_shot_server(
    status: u16,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<(String, String)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = headers
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body = String::from_utf8_lossy(&buf[header_end..]).to_string();

        let reason = if status == 200 { "OK" } else { "Error" };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        (headers, request_body)
    });

    (format!("http://{addr}/v1beta"), handle)
}

fn client_for(base_url: &str) -> GeminiClient {
    let config = InferenceConfig::builder()
        .api_key("test-key-123")
        .model("gemini-1.5-flash")
        .base_url(base_url)
        .api_timeout_secs(5)
        .build()
        .unwrap();
    GeminiClient::new(config).unwrap()
}

#[tokio::test]
async fn gemini_client_sends_ordered_parts_and_reads_text() {
    init_tracing();
    let (base, server) = one_shot_server(
        200,
        r#"{
          "candidates": [{
            "content": {"role": "model", "parts": [{"text": "Percentage match: "}, {"text": "71%"}]},
            "finishReason": "STOP"
          }],
          "usageMetadata": {"promptTokenCount": 1290, "candidatesTokenCount": 7}
        }"#,
    )
    .await;

    let client = client_for(&base);
    let image = [tiny_image()];
    let response = run_inference(&client, JOB_DESCRIPTION, &image, InstructionTemplate::PercentageMatch)
        .await
        .unwrap();

    assert_eq!(response.text, "Percentage match: 71%");
    assert_eq!(response.prompt_tokens, Some(1290));
    assert_eq!(response.output_tokens, Some(7));

    let (headers, body) = server.await.unwrap();
    let request_line = headers.lines().next().unwrap();
    assert!(
        request_line.starts_with("POST /v1beta/models/gemini-1.5-flash:generateContent "),
        "got {request_line}"
    );
    assert!(
        headers
            .lines()
            .any(|l| l.to_ascii_lowercase() == "x-goog-api-key: test-key-123"),
        "api key header missing:\n{headers}"
    );

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let parts = json["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0]["text"], JOB_DESCRIPTION);
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(parts[1]["inlineData"]["data"], "/9j/2Q==");
    assert_eq!(parts[2]["text"], InstructionTemplate::PercentageMatch.text());
}

#[tokio::test]
async fn gemini_client_maps_rejected_key_to_auth_error() {
    let (base, server) = one_shot_server(
        403,
        r#"{"error": {"code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED"}}"#,
    )
    .await;

    let client = client_for(&base);
    let image = [tiny_image()];
    let err = run_inference(&client, JOB_DESCRIPTION, &image, InstructionTemplate::ResumeSummary)
        .await
        .unwrap_err();

    match err {
        AtsError::InferenceService(InferenceError::Auth { status, detail }) => {
            assert_eq!(status, 403);
            assert!(detail.contains("API key not valid"), "got {detail}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    server.await.unwrap();
}
