// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front-end for a capture session
//!
//! Renders the live preview, the captured photo or the swapped results with Unicode
//! half-block characters. The viewer only reads session snapshots; every key press is
//! forwarded to the [`SessionController`] as a task on the runtime.

use crate::backends::camera::types::CameraFrame;
use crate::errors::{RecoveryAction, SessionError};
use crate::pipelines::photo::capture::frame_to_rgb;
use crate::session::{Phase, SessionController, SessionSnapshot};
use crate::storage;
use crate::submission::SubmissionResult;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use image::RgbImage;
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Run the terminal viewer until the user quits. The session is torn down on exit.
pub fn run(
    controller: SessionController,
    runtime: Handle,
    save_dir: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &controller, &runtime, save_dir);

    controller.teardown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// What the picture area currently shows
#[derive(Debug, Clone, PartialEq)]
enum PictureSource {
    None,
    Preview(Instant),
    Artifact(usize),
    Result(usize),
}

struct Viewer {
    controller: SessionController,
    runtime: Handle,
    save_dir: PathBuf,
    picture: PictureWidget,
    source: PictureSource,
    result_index: usize,
    notice: Option<String>,
    notices_tx: mpsc::UnboundedSender<String>,
    notices_rx: mpsc::UnboundedReceiver<String>,
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &SessionController,
    runtime: &Handle,
    save_dir: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let (notices_tx, notices_rx) = mpsc::unbounded_channel();
    let mut viewer = Viewer {
        controller: controller.clone(),
        runtime: runtime.clone(),
        save_dir,
        picture: PictureWidget::default(),
        source: PictureSource::None,
        result_index: 0,
        notice: None,
        notices_tx,
        notices_rx,
    };

    info!(session = %controller.id(), "Starting terminal session");
    viewer.spawn(|c| async move { c.start().await });

    loop {
        let snapshot = controller.snapshot();
        while let Ok(notice) = viewer.notices_rx.try_recv() {
            viewer.notice = Some(notice);
        }
        viewer.refresh_picture(&snapshot);

        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let picture_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };
            f.render_widget(&viewer.picture, picture_area);

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            let message = viewer.status_message(&snapshot);
            f.render_widget(StatusBar { message: &message }, status_area);
        })?;

        // Handle input with timeout for frame updates
        if event::poll(Duration::from_millis(16))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
            match key.code {
                KeyCode::Char('c') if ctrl => break,
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Char(' ') | KeyCode::Enter => {
                    viewer.spawn(|c| async move { c.capture().await })
                }
                KeyCode::Char('r') => viewer.spawn(|c| async move { c.retake().await }),
                KeyCode::Char('c') => viewer.spawn(|c| async move { c.clear().await }),
                KeyCode::Char('s') if snapshot.phase == Phase::Error => {
                    viewer.spawn(|c| async move { c.resubmit().await })
                }
                KeyCode::Char('s') => viewer.spawn(|c| async move { c.submit().await }),
                KeyCode::Char('t') => viewer.spawn(|c| async move { c.try_again().await }),
                KeyCode::Char('n') => {
                    viewer.result_index = 0;
                    viewer.spawn(|c| async move { c.try_another().await })
                }
                KeyCode::Char('w') => viewer.save(&snapshot),
                KeyCode::Left => viewer.browse(&snapshot, -1),
                KeyCode::Right => viewer.browse(&snapshot, 1),
                _ => {}
            }
        }
    }

    Ok(())
}

impl Viewer {
    /// Run a session trigger on the runtime
    fn spawn<F, Fut>(&mut self, trigger: F)
    where
        F: FnOnce(SessionController) -> Fut,
        Fut: std::future::Future<Output = crate::session::Transition> + Send + 'static,
    {
        self.notice = None;
        self.runtime.spawn(trigger(self.controller.clone()));
    }

    fn browse(&mut self, snapshot: &SessionSnapshot, step: isize) {
        let Some(SubmissionResult::Success(success)) = &snapshot.result else {
            return;
        };
        let count = success.images.len();
        if count == 0 {
            return;
        }
        self.result_index =
            (self.result_index as isize + step).rem_euclid(count as isize) as usize;
    }

    fn save(&mut self, snapshot: &SessionSnapshot) {
        let dir = self.save_dir.clone();
        let tx = self.notices_tx.clone();

        match (&snapshot.phase, &snapshot.result, &snapshot.artifact) {
            (Phase::Results, Some(SubmissionResult::Success(success)), _) => {
                let success = success.clone();
                self.runtime.spawn(async move {
                    let notice = match storage::save_results(&success, &dir).await {
                        Ok(paths) => format!("Saved {} image(s) to {}", paths.len(), dir.display()),
                        Err(e) => {
                            error!(error = %e, "Failed to save results");
                            format!("Error: {}", e)
                        }
                    };
                    let _ = tx.send(notice);
                });
            }
            (_, _, Some(artifact)) => {
                let artifact = Arc::clone(artifact);
                self.runtime.spawn(async move {
                    let notice = match storage::save_artifact(&artifact, &dir).await {
                        Ok(path) => format!("Saved: {}", path.display()),
                        Err(e) => {
                            error!(error = %e, "Failed to save photo");
                            format!("Error: {}", e)
                        }
                    };
                    let _ = tx.send(notice);
                });
            }
            _ => {}
        }
    }

    fn refresh_picture(&mut self, snapshot: &SessionSnapshot) {
        match snapshot.phase {
            Phase::Ready => {
                match self.controller.preview_frame() {
                    Some(frame) => self.show_frame(&frame),
                    None if !matches!(self.source, PictureSource::Preview(_)) => {
                        self.picture.image = None;
                        self.source = PictureSource::None;
                    }
                    None => {}
                }
            }
            Phase::Results => self.show_result(snapshot),
            _ => match &snapshot.artifact {
                Some(artifact) => {
                    let key = PictureSource::Artifact(Arc::as_ptr(artifact) as usize);
                    if self.source != key {
                        self.picture.image = artifact.decode().ok();
                        self.source = key;
                    }
                }
                None => {
                    self.picture.image = None;
                    self.source = PictureSource::None;
                }
            },
        }
        self.picture.placeholder = placeholder(snapshot);
    }

    fn show_frame(&mut self, frame: &CameraFrame) {
        let key = PictureSource::Preview(frame.captured_at);
        if self.source == key {
            return;
        }
        self.picture.image = frame_to_rgb(frame).ok();
        self.source = key;
    }

    fn show_result(&mut self, snapshot: &SessionSnapshot) {
        let Some(SubmissionResult::Success(success)) = &snapshot.result else {
            return;
        };
        let Some(image) = success.images.get(self.result_index) else {
            self.picture.image = None;
            return;
        };
        let key = PictureSource::Result(self.result_index);
        if self.source == key {
            return;
        }
        self.picture.image = image
            .decode()
            .ok()
            .and_then(|bytes| image::load_from_memory(&bytes).ok())
            .map(|img| img.to_rgb8());
        self.source = key;
    }

    fn status_message(&self, snapshot: &SessionSnapshot) -> String {
        if let Some(notice) = &self.notice {
            return notice.clone();
        }

        match snapshot.phase {
            Phase::Idle => "Idle | 'q' quit".to_string(),
            Phase::Initializing => "Starting camera... | 'q' quit".to_string(),
            Phase::Ready => "'space' capture | 'q' quit".to_string(),
            Phase::Captured => {
                "'s' swap faces | 'r' retake | 'c' clear | 'w' save | 'q' quit".to_string()
            }
            Phase::Processing => "Swapping faces... | 'q' quit".to_string(),
            Phase::Results => {
                let (message, count) = match &snapshot.result {
                    Some(SubmissionResult::Success(success)) => {
                        (success.message.as_str(), success.images.len())
                    }
                    _ => ("", 0),
                };
                format!(
                    "{} [{}/{}] | '←/→' browse | 'w' save | 'n' try another | 'q' quit",
                    message,
                    (self.result_index + 1).min(count),
                    count
                )
            }
            Phase::Error => error_status(snapshot),
        }
    }
}

fn error_status(snapshot: &SessionSnapshot) -> String {
    let mut message = snapshot.error_message().unwrap_or_default();
    if let Some(detail) = snapshot.error.as_ref().and_then(SessionError::detail) {
        message = format!("{} ({})", message, detail);
    }
    let actions = match snapshot.recovery() {
        Some(RecoveryAction::Resubmit) => "'s' resubmit | 'r' retake",
        _ => "'t' try again",
    };
    format!("Error: {} | {} | 'q' quit", message, actions)
}

fn placeholder(snapshot: &SessionSnapshot) -> String {
    match snapshot.phase {
        Phase::Idle | Phase::Initializing => "Waiting for camera...".to_string(),
        Phase::Ready => "Waiting for first frame...".to_string(),
        Phase::Results => "No swapped images".to_string(),
        Phase::Error => snapshot.error_message().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Widget that renders a picture using half-block characters
#[derive(Default)]
struct PictureWidget {
    image: Option<RgbImage>,
    placeholder: String,
}

impl Widget for &PictureWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(image) = self.image.as_ref().filter(|i| i.width() > 0 && i.height() > 0) else {
            let msg = self.placeholder.as_str();
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };

        // Each terminal cell displays 2 vertical pixels
        let aspect = image.width() as f64 / image.height() as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > aspect {
            let h = term_height;
            ((h * aspect) as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            (w as u16, (w / aspect / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = image.width() as f64 / display_width as f64;
        let y_scale = image.height() as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(image, src_x, src_y_top));
                    cell.set_bg(sample_pixel(image, src_x, src_y_bottom));
                }
            }
        }
    }
}

fn sample_pixel(image: &RgbImage, x: u32, y: u32) -> Color {
    let x = x.min(image.width() - 1);
    let y = y.min(image.height() - 1);
    let [r, g, b] = image.get_pixel(x, y).0;
    Color::Rgb(r, g, b)
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();

        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picture_renders_half_blocks() {
        let widget = PictureWidget {
            image: Some(RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]))),
            placeholder: String::new(),
        };
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);

        let cell = &buf[(0, 0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(10, 20, 30));
    }

    #[test]
    fn test_placeholder_without_picture() {
        let widget = PictureWidget {
            image: None,
            placeholder: "Waiting".to_string(),
        };
        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);

        let row: String = (0..20).map(|x| buf[(x, 1)].symbol().to_string()).collect();
        assert!(row.contains("Waiting"));
    }

    #[test]
    fn test_error_status_shows_detail() {
        let snapshot = SessionSnapshot {
            phase: Phase::Error,
            error: Some(SessionError::Submission {
                message: "Face swap failed".to_string(),
                detail: Some("No face detected".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(
            error_status(&snapshot),
            "Error: Face swap failed (No face detected) | 's' resubmit | 'r' retake | 'q' quit"
        );

        let snapshot = SessionSnapshot {
            phase: Phase::Error,
            error: Some(SessionError::UnsupportedPlatform),
            ..Default::default()
        };
        assert!(error_status(&snapshot).ends_with("| 't' try again | 'q' quit"));
    }

    #[test]
    fn test_status_bar_truncates() {
        let area = Rect::new(0, 0, 5, 1);
        let mut buf = Buffer::empty(area);
        StatusBar {
            message: "abcdefgh",
        }
        .render(area, &mut buf);
        let row: String = (0..5).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert_eq!(row, "abcde");
    }
}
