//! Session controller: binds upload / capture / analyze to the vision plugin.
//!
//! The only state that outlives a command is the canonical image file and the
//! current query text. Every collaborator error ends up as one message on the
//! presenter; nothing here terminates the process.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};

use crate::commands::Command;
use crate::plugins::vision::{
    is_supported_extension, normalize, render_legacy, save_canonical, ImageSource,
    QueryClient, ScreenCapturer, VisionError, VisionModel,
};
use crate::services::config::PublicConfig;
use crate::services::prompts;

/// Where results and errors are shown.
pub trait Presenter {
    fn header(&mut self);
    fn image(&mut self, image: &DynamicImage, origin: &str);
    fn success(&mut self, message: &str);
    fn error(&mut self, message: &str);
    fn info(&mut self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    HasImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Assistant<M, V> {
    capturer: ScreenCapturer,
    query_client: QueryClient<M>,
    view: V,
    image_path: PathBuf,
    query: String,
    public_config: Option<PublicConfig>,
}

impl<M: VisionModel, V: Presenter> Assistant<M, V> {
    pub fn new(capturer: ScreenCapturer, model: M, view: V, image_path: PathBuf) -> Self {
        Self {
            capturer,
            query_client: QueryClient::new(model),
            view,
            image_path,
            query: String::new(),
            public_config: None,
        }
    }

    pub fn with_public_config(mut self, config: PublicConfig) -> Self {
        self.public_config = Some(config);
        self
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn model(&self) -> &M {
        self.query_client.model()
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// `HasImage` once a capture or upload has written the canonical file.
    pub fn state(&self) -> SessionState {
        if self.image_path.is_file() {
            SessionState::HasImage
        } else {
            SessionState::Empty
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Upload a file picked by the user.
    pub fn upload(&mut self, path: &Path) -> bool {
        let name = path.display().to_string();
        if !is_supported_extension(path) {
            self.view.error(&prompts::upload_rejected(&name));
            return false;
        }

        match std::fs::read(path) {
            Ok(bytes) => self.upload_bytes(&name, bytes),
            Err(err) => {
                self.view.error(&prompts::image_load_failed(&err.to_string()));
                false
            }
        }
    }

    /// Normalize an upload buffer, show it, and make it the canonical image.
    pub fn upload_bytes(&mut self, name: &str, bytes: Vec<u8>) -> bool {
        let Some(image) = normalize(&ImageSource::Bytes(bytes)) else {
            self.view.error(prompts::MSG_IMAGE_UNPROCESSABLE);
            return false;
        };

        self.view.image(&image, name);

        if let Err(err) = save_canonical(&image, &self.image_path) {
            log::warn!("Upload of '{}' not saved: {}", name, err);
            self.view.error(&err.to_string());
            return false;
        }

        let (w, h) = image.dimensions();
        log::info!("Uploaded '{}' ({}x{}) -> {}", name, w, h, self.image_path.display());
        true
    }

    /// Capture the next window; on success reload and show the canonical image.
    pub fn capture(&mut self) -> bool {
        match self.capturer.capture_to(&self.image_path) {
            Ok(report) => {
                self.view.success(prompts::MSG_CAPTURE_SUCCESS);
                if let Some(image) = self.reload() {
                    self.view.image(&image, &report.window.title);
                }
                true
            }
            Err(VisionError::NoForegroundWindow) => {
                log::warn!("Capture failed: no foreground window");
                self.view.error(&VisionError::NoForegroundWindow.to_string());
                false
            }
            Err(err) => {
                log::warn!("Capture failed: {}", err);
                self.view.error(&prompts::capture_failed(&err.to_string()));
                false
            }
        }
    }

    /// Ask the model about the canonical image with the current query.
    ///
    /// Returns `None` when no request was made (no image, or it could not be
    /// loaded), otherwise the displayed text: `Ok` for an answer, `Err` for a
    /// rendered failure.
    pub async fn analyze(&mut self) -> Option<Result<String, String>> {
        if self.state() == SessionState::Empty {
            self.view.error(prompts::MSG_NO_IMAGE);
            return None;
        }

        let image = self.reload()?;
        self.view.image(&image, &self.image_path.display().to_string());

        let result = self.query_client.ask(&self.query, &self.image_path).await;
        let text = render_legacy(&result);
        match result {
            Ok(_) => {
                self.view.success(&prompts::results(&text));
                Some(Ok(text))
            }
            Err(_) => {
                self.view.error(&text);
                Some(Err(text))
            }
        }
    }

    fn reload(&mut self) -> Option<DynamicImage> {
        let image = normalize(&ImageSource::Path(self.image_path.clone()));
        if image.is_none() {
            self.view.error(prompts::MSG_IMAGE_UNPROCESSABLE);
        }
        image
    }

    fn report_status(&mut self) {
        let image = match self.state() {
            SessionState::HasImage => format!("image: {}", self.image_path.display()),
            SessionState::Empty => "image: none".to_string(),
        };
        let query = if self.query.is_empty() {
            "query: (empty)".to_string()
        } else {
            format!("query: {}", self.query)
        };
        self.view.info(&format!("{}\n{}", image, query));
    }

    fn report_config(&mut self) {
        let text = match &self.public_config {
            Some(config) => serde_json::to_string_pretty(config)
                .unwrap_or_else(|e| format!("Failed to render config: {}", e)),
            None => "No configuration loaded".to_string(),
        };
        self.view.info(&text);
    }

    /// Run one command to completion.
    pub async fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Upload(path) => {
                self.upload(&path);
            }
            Command::Capture => {
                self.capture();
            }
            Command::Query(text) => {
                self.set_query(text);
                self.report_status();
            }
            Command::Analyze(text) => {
                if let Some(text) = text {
                    self.set_query(text);
                }
                self.analyze().await;
            }
            Command::Status => self.report_status(),
            Command::Config => self.report_config(),
            Command::Help => self.view.info(prompts::HELP_TEXT),
            Command::Quit => return Flow::Quit,
            Command::Nothing => {}
        }
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::vision::test_support::{png_bytes, sample_image, FakeModel};
    use crate::plugins::vision::{FocusSwitcher, KeepFocus, WindowRect, WindowSource};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Shown {
        Image(u32, u32),
        Success(String),
        Error(String),
        Info(String),
    }

    #[derive(Default)]
    struct RecordingView {
        shown: Vec<Shown>,
    }

    impl RecordingView {
        fn errors(&self) -> Vec<&str> {
            self.shown
                .iter()
                .filter_map(|s| match s {
                    Shown::Error(m) => Some(m.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl Presenter for RecordingView {
        fn header(&mut self) {}
        fn image(&mut self, image: &DynamicImage, _origin: &str) {
            let (w, h) = image.dimensions();
            self.shown.push(Shown::Image(w, h));
        }
        fn success(&mut self, message: &str) {
            self.shown.push(Shown::Success(message.to_string()));
        }
        fn error(&mut self, message: &str) {
            self.shown.push(Shown::Error(message.to_string()));
        }
        fn info(&mut self, message: &str) {
            self.shown.push(Shown::Info(message.to_string()));
        }
    }

    struct FixedWindow(Option<WindowRect>);

    impl WindowSource for FixedWindow {
        fn foreground_window(&self) -> Result<Option<WindowRect>, VisionError> {
            Ok(self.0.clone())
        }

        fn capture_region(&self, rect: &WindowRect) -> Result<DynamicImage, VisionError> {
            Ok(sample_image(rect.width, rect.height))
        }
    }

    struct BrokenFocus;

    impl FocusSwitcher for BrokenFocus {
        fn switch_focus(&self) -> Result<(), VisionError> {
            Err(VisionError::FocusSwitch("no input device".to_string()))
        }
    }

    fn window(w: u32, h: u32) -> WindowRect {
        WindowRect {
            title: "Spreadsheet".to_string(),
            left: 0,
            top: 0,
            width: w,
            height: h,
        }
    }

    fn assistant(
        dir: &Path,
        windows: FixedWindow,
        model: FakeModel,
    ) -> Assistant<FakeModel, RecordingView> {
        let capturer = ScreenCapturer::new(Box::new(KeepFocus), Box::new(windows));
        Assistant::new(
            capturer,
            model,
            RecordingView::default(),
            dir.join("picture.png"),
        )
    }

    #[tokio::test]
    async fn test_analyze_without_image_never_calls_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = assistant(dir.path(), FixedWindow(None), FakeModel::replying("unused"));
        app.set_query("Describe this");

        assert_eq!(app.state(), SessionState::Empty);
        assert_eq!(app.analyze().await, None);
        assert_eq!(app.view().errors(), vec![prompts::MSG_NO_IMAGE]);
        assert_eq!(app.model().call_count(), 0);
    }

    #[tokio::test]
    async fn test_capture_then_analyze_shows_model_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = assistant(
            dir.path(),
            FixedWindow(Some(window(40, 30))),
            FakeModel::replying("A budget spreadsheet."),
        );

        assert!(app.capture());
        assert_eq!(app.state(), SessionState::HasImage);

        app.set_query("Describe this");
        let shown = app.analyze().await;

        assert_eq!(shown, Some(Ok("A budget spreadsheet.".to_string())));
        assert_eq!(app.model().call_count(), 1);
        assert_eq!(
            app.model().calls.lock().unwrap()[0],
            ("Describe this".to_string(), (40, 30))
        );
        assert_eq!(
            app.view().shown.last(),
            Some(&Shown::Success("Results: A budget spreadsheet.".to_string()))
        );
    }

    #[tokio::test]
    async fn test_repeated_analyze_stays_in_has_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = assistant(dir.path(), FixedWindow(None), FakeModel::replying("ok"));

        assert!(app.upload_bytes("chart.png", png_bytes(16, 8)));
        app.analyze().await;
        app.analyze().await;

        assert_eq!(app.state(), SessionState::HasImage);
        assert_eq!(app.model().call_count(), 2);
    }

    #[tokio::test]
    async fn test_model_failure_is_shown_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = assistant(
            dir.path(),
            FixedWindow(None),
            FakeModel::failing("connection reset"),
        );
        assert!(app.upload_bytes("chart.png", png_bytes(5, 5)));

        let shown = app.analyze().await.unwrap().unwrap_err();
        assert!(shown.starts_with("Error generating response:"));
        assert!(shown.contains("connection reset"));
        assert_eq!(app.view().errors(), vec![shown.as_str()]);
    }

    #[test]
    fn test_capture_without_window_keeps_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = assistant(dir.path(), FixedWindow(None), FakeModel::replying("unused"));
        assert!(app.upload_bytes("first.png", png_bytes(7, 7)));
        let before = std::fs::read(app.image_path()).unwrap();

        assert!(!app.capture());
        assert_eq!(std::fs::read(app.image_path()).unwrap(), before);
        assert_eq!(
            app.view().errors(),
            vec!["Could not capture the active window."]
        );
    }

    #[test]
    fn test_focus_failure_is_reported_as_screenshot_failure() {
        let dir = tempfile::tempdir().unwrap();
        let capturer = ScreenCapturer::new(
            Box::new(BrokenFocus),
            Box::new(FixedWindow(Some(window(10, 10)))),
        );
        let mut app = Assistant::new(
            capturer,
            FakeModel::replying("unused"),
            RecordingView::default(),
            dir.path().join("picture.png"),
        );

        assert!(!app.capture());
        let errors = app.view().errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Screenshot failed:"));
        assert!(errors[0].contains("no input device"));
        assert_eq!(app.state(), SessionState::Empty);
    }

    #[test]
    fn test_upload_rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let gif = dir.path().join("anim.gif");
        std::fs::write(&gif, b"GIF89a").unwrap();

        let mut app = assistant(dir.path(), FixedWindow(None), FakeModel::replying("unused"));
        assert!(!app.upload(&gif));
        assert_eq!(app.state(), SessionState::Empty);
        assert!(app.view().errors()[0].contains("anim.gif"));
    }

    #[test]
    fn test_upload_corrupt_file_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("broken.png");
        std::fs::write(&bad, b"\x89PNG not really").unwrap();

        let mut app = assistant(dir.path(), FixedWindow(None), FakeModel::replying("unused"));
        assert!(!app.upload(&bad));
        assert_eq!(app.state(), SessionState::Empty);
        assert_eq!(app.view().errors(), vec![prompts::MSG_IMAGE_UNPROCESSABLE]);
    }

    #[test]
    fn test_capture_shows_canonical_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = assistant(
            dir.path(),
            FixedWindow(Some(window(40, 30))),
            FakeModel::replying("unused"),
        );

        assert!(app.capture());
        assert_eq!(
            app.view().shown,
            vec![
                Shown::Success(prompts::MSG_CAPTURE_SUCCESS.to_string()),
                Shown::Image(40, 30),
            ]
        );
    }

    #[tokio::test]
    async fn test_analyze_undecodable_canonical_file_never_calls_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = assistant(dir.path(), FixedWindow(None), FakeModel::replying("unused"));
        std::fs::write(app.image_path(), b"\x89PNG truncated").unwrap();
        app.set_query("Describe this");

        assert_eq!(app.state(), SessionState::HasImage);
        assert_eq!(app.analyze().await, None);
        assert_eq!(app.view().errors(), vec![prompts::MSG_IMAGE_UNPROCESSABLE]);
        assert_eq!(app.model().call_count(), 0);
    }

    #[tokio::test]
    async fn test_directory_at_canonical_path_counts_as_no_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = assistant(dir.path(), FixedWindow(None), FakeModel::replying("unused"));
        std::fs::create_dir(app.image_path()).unwrap();

        assert_eq!(app.state(), SessionState::Empty);
        assert_eq!(app.analyze().await, None);
        assert_eq!(app.view().errors(), vec![prompts::MSG_NO_IMAGE]);
        assert_eq!(app.model().call_count(), 0);
    }

    #[test]
    fn test_upload_from_disk_displays_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("photo.png");
        std::fs::write(&src, png_bytes(11, 6)).unwrap();

        let mut app = assistant(dir.path(), FixedWindow(None), FakeModel::replying("unused"));
        assert!(app.upload(&src));
        assert_eq!(app.view().shown, vec![Shown::Image(11, 6)]);

        let saved = image::open(app.image_path()).unwrap();
        assert_eq!(saved.dimensions(), (11, 6));
    }

    #[tokio::test]
    async fn test_handle_commands() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = assistant(dir.path(), FixedWindow(None), FakeModel::replying("Two cats."));
        assert!(app.upload_bytes("cats.png", png_bytes(4, 4)));

        assert_eq!(
            app.handle(Command::Analyze(Some("How many cats?".to_string()))).await,
            Flow::Continue
        );
        assert_eq!(app.query(), "How many cats?");
        assert_eq!(app.model().calls.lock().unwrap()[0].0, "How many cats?");

        app.handle(Command::Status).await;
        match app.view().shown.last() {
            Some(Shown::Info(text)) => assert!(text.contains("query: How many cats?")),
            other => panic!("unexpected: {other:?}"),
        }

        assert_eq!(app.handle(Command::Quit).await, Flow::Quit);
    }
}
