use std::sync::Arc;

use axum::{
    extract::{Form, Query, State},
    http::header,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{
    error::ClipError,
    models::{ClipForm, ClipRequest},
    preview::Preview,
    progress::TracingProgress,
    video_processor::ClipProcessor,
};

#[derive(Clone)]
pub struct AppState {
    processor: ClipProcessor,
    // Held for the whole pipeline so clip requests never overlap.
    busy: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(processor: ClipProcessor) -> Self {
        Self {
            processor,
            busy: Arc::new(Mutex::new(())),
        }
    }
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/manifest.json", get(manifest))
        .route("/preview", get(preview))
        .route("/clip", post(create_clip))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn manifest() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "YT Clipper",
        "short_name": "Clipper",
        "start_url": "/",
        "display": "standalone",
        "background_color": "#ffffff",
        "theme_color": "#111827"
    }))
}

#[derive(Deserialize, Debug)]
struct PreviewQuery {
    #[serde(default)]
    url: String,
}

async fn preview(Query(query): Query<PreviewQuery>) -> Html<String> {
    Html(Preview::for_url(&query.url).to_html())
}

async fn create_clip(
    State(state): State<AppState>,
    Form(form): Form<ClipForm>,
) -> Result<Response, ClipError> {
    let request = ClipRequest::try_from(form).map_err(|e| {
        tracing::warn!("rejected clip request: {e}");
        e
    })?;

    tracing::info!(
        url = %request.source_url,
        start = request.start_seconds,
        end = request.end_seconds,
        height = request.quality.height(),
        "creating clip"
    );
    // Detached from the connection: a client hanging up must not cut the pipeline
    // short and skip cleanup.
    let task = tokio::spawn(async move {
        let _busy = state.busy.lock().await;
        let mut progress = TracingProgress;
        state.processor.process(&request, &mut progress).await
    });
    let clip = task.await??;

    let headers = [
        (header::CONTENT_TYPE, clip.mime_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", clip.file_name),
        ),
    ];
    Ok((headers, clip.bytes).into_response())
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>YT Clipper</title>
    <meta name="mobile-web-app-capable" content="yes">
    <meta name="apple-mobile-web-app-capable" content="yes">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <link rel="manifest" href="/manifest.json">
    <style>
      body { font-family: system-ui, sans-serif; max-width: 40rem; margin: 0 auto; padding: 1rem; }
      video, iframe {
        width: 100%;
        max-width: 100% !important;
        border: 0;
        border-radius: 12px;
        box-shadow: 0 0 8px rgba(0,0,0,0.2);
      }
      iframe { aspect-ratio: 16 / 9; height: auto; }
      label { display: block; font-weight: 600; margin-top: .5rem; }
      input, select { width: 100%; padding: .25rem; box-sizing: border-box; }
      .columns { display: flex; gap: 1rem; }
      .columns > div { flex: 1; }
      button { margin-top: 1rem; padding: .5rem 1rem; }
      progress { width: 100%; }
      .error { color: #b91c1c; }
      .success { color: #15803d; }
      [hidden] { display: none !important; }
    </style>
  </head>
  <body>
    <h1>&#127916; Mobile YouTube Clipper</h1>
    <form id="clipForm">
      <label for="source_url">Paste YouTube video URL</label>
      <input type="text" id="source_url" name="source_url" />
      <div id="sourcePreview"></div>

      <div class="columns">
        <div>
          <label>Start Minute</label>
          <input type="number" name="start_minute" min="0" value="0" />
          <label>Start Second</label>
          <input type="number" name="start_second" min="0" max="59" value="0" />
        </div>
        <div>
          <label>End Minute</label>
          <input type="number" name="end_minute" min="0" value="0" />
          <label>End Second</label>
          <input type="number" name="end_second" min="1" max="59" value="10" />
        </div>
      </div>

      <label for="quality">Download Quality</label>
      <select id="quality" name="quality">
        <option>720p</option>
        <option>1080p</option>
        <option>1440p</option>
      </select>

      <button type="submit">&#127902;&#65039; Create Clip</button>
    </form>

    <div id="status" hidden>
      <p id="statusText">Downloading and clipping...</p>
      <progress id="bar" max="100" value="0"></progress>
    </div>
    <p id="message"></p>
    <div id="result" hidden>
      <video id="clip" controls></video>
      <p><a id="download" download="short_clip.mp4">&#128229; Download Clip</a></p>
    </div>

    <script>
      const form = document.getElementById('clipForm');
      const source = document.getElementById('source_url');
      const statusBox = document.getElementById('status');
      const statusText = document.getElementById('statusText');
      const bar = document.getElementById('bar');
      const message = document.getElementById('message');
      const result = document.getElementById('result');
      let clipUrl = null;

      source.addEventListener('change', async () => {
        const res = await fetch('/preview?url=' + encodeURIComponent(source.value));
        const html = res.ok ? await res.text() : '';
        document.getElementById('sourcePreview').innerHTML =
          html ? '<h3>Preview:</h3>' + html : '';
      });

      form.addEventListener('submit', async (e) => {
        e.preventDefault();
        message.textContent = '';
        message.className = '';
        result.hidden = true;
        statusBox.hidden = false;
        statusText.textContent = 'Downloading and clipping...';
        bar.value = 0;

        let pct = 0;
        const ticker = setInterval(() => {
          if (pct < 80) { pct += 8; bar.value = pct; }
        }, 120);

        try {
          const res = await fetch('/clip', {
            method: 'POST',
            headers: {'Content-Type': 'application/x-www-form-urlencoded'},
            body: new URLSearchParams(new FormData(form))
          });
          if (!res.ok) {
            throw new Error(await res.text());
          }
          const blob = await res.blob();
          if (clipUrl) URL.revokeObjectURL(clipUrl);
          clipUrl = URL.createObjectURL(blob);
          document.getElementById('clip').src = clipUrl;
          document.getElementById('download').href = clipUrl;
          bar.value = 100;
          statusText.textContent = '✅ Done!';
          message.textContent = 'Clip created successfully!';
          message.className = 'success';
          result.hidden = false;
        } catch (err) {
          statusBox.hidden = true;
          message.textContent = err.message;
          message.className = 'error';
        } finally {
          clearInterval(ticker);
        }
      });
    </script>
  </body>
</html>
"#;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::progress::ProgressAnimation;
    use crate::video_processor::tests::{FakeDownloader, FakeTrimmer};

    struct Harness {
        app: Router,
        downloader: Arc<FakeDownloader>,
        trimmer: Arc<FakeTrimmer>,
        scratch: tempfile::TempDir,
    }

    fn harness(downloader: FakeDownloader, trimmer: FakeTrimmer) -> Harness {
        let scratch = tempfile::tempdir().unwrap();
        let downloader = Arc::new(downloader);
        let trimmer = Arc::new(trimmer);
        let processor = ClipProcessor::new(downloader.clone(), trimmer.clone())
            .with_animation(ProgressAnimation::default().with_frame_delay(Duration::ZERO))
            .with_scratch_root(Some(scratch.path().to_path_buf()));
        Harness {
            app: create_routes(AppState::new(processor)),
            downloader,
            trimmer,
            scratch,
        }
    }

    fn post_clip(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/clip")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn is_empty(dir: &std::path::Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    async fn body_text(response: Response) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn index_serves_the_form() {
        let h = harness(FakeDownloader::default(), FakeTrimmer::default());
        let response = h
            .app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("name=\"source_url\""));
        assert!(html.contains("Create Clip"));
        assert!(html.contains("<option>1440p</option>"));
    }

    #[tokio::test]
    async fn manifest_is_json() {
        let h = harness(FakeDownloader::default(), FakeTrimmer::default());
        let response = h
            .app
            .oneshot(Request::get("/manifest.json").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let manifest: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(manifest["start_url"], "/");
    }

    #[tokio::test]
    async fn preview_embeds_youtube() {
        let h = harness(FakeDownloader::default(), FakeTrimmer::default());
        let uri = "/preview?url=https%3A%2F%2Fyoutu.be%2FdQw4w9WgXcQ";
        let response = h
            .app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response)
            .await
            .contains("https://www.youtube.com/embed/dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn clip_is_delivered_as_mp4_attachment() {
        let h = harness(FakeDownloader::default(), FakeTrimmer::default());
        let response = h
            .app
            .oneshot(post_clip(
                "source_url=https%3A%2F%2Fyoutu.be%2Fabc&start_minute=0&start_second=0&end_minute=0&end_second=10&quality=720p",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"short_clip.mp4\""
        );
        assert_eq!(body_text(response).await, "clip bytes");

        let downloads = h.downloader.calls();
        assert_eq!(downloads[0].1.format, "bestvideo[height<=720]+bestaudio/best");
        let clips = h.trimmer.calls();
        assert_eq!((clips[0].start_seconds, clips[0].duration_seconds), (0, 10));
    }

    #[tokio::test]
    async fn reversed_range_makes_no_external_calls() {
        let h = harness(FakeDownloader::default(), FakeTrimmer::default());
        let response = h
            .app
            .oneshot(post_clip(
                "source_url=https%3A%2F%2Fyoutu.be%2Fabc&start_minute=1&start_second=5&end_minute=1&end_second=0&quality=1080p",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "End time must be after start time.");
        assert!(h.downloader.calls().is_empty());
        assert!(h.trimmer.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_url_is_rejected() {
        let h = harness(FakeDownloader::default(), FakeTrimmer::default());
        let response = h
            .app
            .oneshot(post_clip("source_url=&end_second=10&quality=720p"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Please enter a video URL");
        assert!(h.downloader.calls().is_empty());
    }

    #[tokio::test]
    async fn download_failure_is_reported_verbatim() {
        let h = harness(
            FakeDownloader::failing("ERROR: [youtube] abc: Video unavailable"),
            FakeTrimmer::default(),
        );
        let response = h
            .app
            .oneshot(post_clip(
                "source_url=https%3A%2F%2Fyoutu.be%2Fabc&end_second=10&quality=720p",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_text(response).await,
            "Download failed: ERROR: [youtube] abc: Video unavailable"
        );
        assert!(h.trimmer.calls().is_empty());
        assert!(is_empty(h.scratch.path()));
    }

    #[tokio::test]
    async fn clip_failure_is_a_gateway_error() {
        let h = harness(FakeDownloader::default(), FakeTrimmer::failing());
        let response = h
            .app
            .oneshot(post_clip(
                "source_url=https%3A%2F%2Fyoutu.be%2Fabc&end_second=10&quality=1440p",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_text(response)
            .await
            .starts_with("Failed to create clip: "));
        assert!(is_empty(h.scratch.path()));
    }

    #[tokio::test]
    async fn abandoned_request_still_finishes_and_cleans_up() {
        let h = harness(
            FakeDownloader::slow(Duration::from_millis(100)),
            FakeTrimmer::default(),
        );
        let request = post_clip("source_url=https%3A%2F%2Fyoutu.be%2Fabc&end_second=10&quality=720p");

        let dropped = tokio::time::timeout(Duration::from_millis(20), h.app.oneshot(request)).await;
        assert!(dropped.is_err());

        for _ in 0..50 {
            if h.trimmer.calls().len() == 1 && is_empty(h.scratch.path()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(h.downloader.calls().len(), 1);
        assert_eq!(h.trimmer.calls().len(), 1);
        assert!(is_empty(h.scratch.path()));
    }

    #[tokio::test]
    async fn missing_url_field_gets_the_friendly_message() {
        let h = harness(FakeDownloader::default(), FakeTrimmer::default());
        let response = h
            .app
            .oneshot(post_clip("start_minute=&start_second=&end_second=10&quality=720p"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Please enter a video URL");
        assert!(h.downloader.calls().is_empty());
    }
}
