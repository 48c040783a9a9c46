//! The interactive analysis page: sidebar, image preview, one explicit
//! analyze action, and the rendered result.

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use radscan_core::imaging::{resized_dimensions, UploadedImage};
use radscan_core::logging::InteractionLogger;
use radscan_core::prompt::ANALYSIS_PROMPT;
use radscan_core::session::Session;
use radscan_core::Error;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::{MISSING_KEY_MESSAGE, RATE_LIMIT_MESSAGE};

const INFO_TEXT: &str =
    "This tool provides AI-assisted analysis of medical images using radiology knowledge and web research.";
const DISCLAIMER: &str = "DISCLAIMER: For educational and informational purposes only. All analyses must be reviewed by qualified healthcare professionals. Do not make medical decisions based solely on this output.";

/// Where one interaction currently stands. `Analyzing` is entered only on an
/// explicit key press, and loading a new image returns to `Idle`, discarding
/// any previous result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Analyzing,
    Succeeded(String),
    RateLimited(String),
    Failed(String),
}

/// Metadata of the currently loaded image, shown in the preview block.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub path: PathBuf,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub preview_width: u32,
    pub preview_height: u32,
}

pub fn load_image(path: &Path) -> radscan_core::Result<LoadedImage> {
    let uploaded = UploadedImage::from_path(path)?;
    let (width, height) = uploaded.dimensions();
    let (preview_width, preview_height) = resized_dimensions(width, height);
    Ok(LoadedImage {
        path: path.to_path_buf(),
        name: uploaded.name().to_string(),
        width,
        height,
        preview_width,
        preview_height,
    })
}

struct App {
    session: Session,
    image: Option<LoadedImage>,
    phase: Phase,
    input: Option<String>,
    notice: Option<String>,
    quit: bool,
}

impl App {
    fn new(session: Session, image: Option<LoadedImage>) -> Self {
        App {
            session,
            image,
            phase: Phase::Idle,
            input: None,
            notice: None,
            quit: false,
        }
    }

    /// Replaces the current image. Any prior result is discarded.
    fn set_image(&mut self, image: LoadedImage) {
        self.image = Some(image);
        self.phase = Phase::Idle;
        self.notice = None;
    }

    /// The analyze action is available only with an image, a configured
    /// agent, and no analysis already in flight.
    fn can_analyze(&self) -> bool {
        self.image.is_some() && self.session.agent().is_some() && self.phase != Phase::Analyzing
    }

    fn apply_result(&mut self, result: radscan_core::Result<String>) {
        self.phase = match result {
            Ok(content) => Phase::Succeeded(content),
            Err(Error::RateLimited(_)) => Phase::RateLimited(RATE_LIMIT_MESSAGE.to_string()),
            Err(e) => Phase::Failed(format!("Error analyzing the image: {}", e)),
        };
    }
}

pub fn run(
    session: Session,
    image_path: Option<&Path>,
    logger: Option<InteractionLogger>,
) -> io::Result<()> {
    let mut app = App::new(session, None);
    if let Some(path) = image_path {
        match load_image(path) {
            Ok(image) => app.set_image(image),
            Err(e) => app.notice = Some(format!("Could not load image - {}", e)),
        }
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let tick_rate = Duration::from_millis(250);
    let res = run_app(&mut terminal, app, tick_rate, logger);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn spawn_analysis(
    session: Session,
    path: PathBuf,
) -> mpsc::Receiver<radscan_core::Result<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(run_interaction(&session, &path));
    });
    rx
}

/// One full interaction: decode, resize, persist, invoke. The artifact is
/// dropped (and its temp file removed) when this returns.
fn run_interaction(session: &Session, path: &Path) -> radscan_core::Result<String> {
    let uploaded = UploadedImage::from_path(path)?;
    let artifact = uploaded.resize_to_target().persist()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(session.analyze(ANALYSIS_PROMPT, &artifact))
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tick_rate: Duration,
    mut logger: Option<InteractionLogger>,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    let mut pending: Option<mpsc::Receiver<radscan_core::Result<String>>> = None;

    loop {
        terminal.draw(|f| ui(f, &app))?;

        let finished = pending
            .as_ref()
            .and_then(|receiver| receiver.try_recv().ok());
        if let Some(result) = finished {
            if let Some(logger) = logger.as_mut() {
                match &result {
                    Ok(_) => logger.log("analysis succeeded"),
                    Err(e) => logger.log(&format!("analysis failed: {}", e)),
                }
            }
            app.apply_result(result);
            pending = None;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if app.input.is_some() {
                    match key.code {
                        KeyCode::Esc => app.input = None,
                        KeyCode::Backspace => {
                            if let Some(input) = app.input.as_mut() {
                                input.pop();
                            }
                        }
                        KeyCode::Char(c) => {
                            if let Some(input) = app.input.as_mut() {
                                input.push(c);
                            }
                        }
                        KeyCode::Enter => {
                            let path = app.input.take().unwrap_or_default();
                            if !path.trim().is_empty() {
                                match load_image(Path::new(path.trim())) {
                                    Ok(image) => {
                                        if let Some(logger) = logger.as_mut() {
                                            logger.log(&format!(
                                                "loaded image '{}' ({}x{})",
                                                image.name, image.width, image.height
                                            ));
                                        }
                                        app.set_image(image);
                                        // An in-flight result belongs to the
                                        // previous image; drop it.
                                        pending = None;
                                    }
                                    Err(e) => {
                                        app.notice =
                                            Some(format!("Could not load image - {}", e));
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                } else {
                    match key.code {
                        KeyCode::Char('q') => app.quit = true,
                        KeyCode::Char('o') => app.input = Some(String::new()),
                        KeyCode::Char('a') => {
                            if app.can_analyze() {
                                if let Some(image) = &app.image {
                                    if let Some(logger) = logger.as_mut() {
                                        logger.log("analysis started");
                                    }
                                    app.phase = Phase::Analyzing;
                                    pending = Some(spawn_analysis(
                                        app.session.clone(),
                                        image.path.clone(),
                                    ));
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.quit {
            return Ok(());
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(0)].as_ref())
        .split(f.size());

    f.render_widget(sidebar(app), columns[0]);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3), // Title
                Constraint::Length(7), // Image preview
                Constraint::Min(0),    // Output
                Constraint::Length(3), // Footer
            ]
            .as_ref(),
        )
        .split(columns[1]);

    let title = Paragraph::new("Medical Imaging Diagnosis Agent")
        .style(Style::default().fg(Color::Magenta).bold())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, main[0]);

    f.render_widget(preview(app), main[1]);
    f.render_widget(output(app), main[2]);

    let footer_text = match (&app.input, &app.phase) {
        (Some(_), _) => "Type a path, Enter to load, Esc to cancel.",
        (None, Phase::Analyzing) => "Analyzing... press 'q' to quit.",
        _ => "'a' analyze | 'o' open image | 'q' quit",
    };
    let footer = Paragraph::new(footer_text)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(footer, main[3]);
}

fn sidebar(app: &App) -> Paragraph<'_> {
    let mut lines: Vec<Line> = Vec::new();

    if app.session.agent().is_some() {
        lines.push(Line::styled(
            "API key is configured",
            Style::default().fg(Color::Green),
        ));
    } else {
        lines.push(Line::styled(
            MISSING_KEY_MESSAGE,
            Style::default().fg(Color::Red),
        ));
    }
    lines.push(Line::raw(""));
    lines.push(Line::raw(INFO_TEXT));
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        DISCLAIMER,
        Style::default().fg(Color::Yellow),
    ));
    if let Some(notice) = &app.notice {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            notice.clone(),
            Style::default().fg(Color::Red),
        ));
    }

    Paragraph::new(lines)
        .block(Block::default().title("Configuration").borders(Borders::ALL))
        .wrap(Wrap { trim: true })
}

fn preview(app: &App) -> Paragraph<'_> {
    let text = if let Some(input) = &app.input {
        format!("Path: {}_", input)
    } else if let Some(image) = &app.image {
        format!(
            "{}\nOriginal: {}x{}\nPreview:  {}x{}",
            image.name, image.width, image.height, image.preview_width, image.preview_height
        )
    } else {
        "No image loaded. Press 'o' to open a medical image (jpg, jpeg, png, dicom).".to_string()
    };

    Paragraph::new(text)
        .block(Block::default().title("Image").borders(Borders::ALL))
        .wrap(Wrap { trim: true })
}

fn output(app: &App) -> Paragraph<'_> {
    let (text, style) = match &app.phase {
        Phase::Idle => {
            if app.image.is_none() {
                (
                    "Upload a medical image to begin the analysis.".to_string(),
                    Style::default().fg(Color::Gray),
                )
            } else if app.session.agent().is_none() {
                (
                    format!("{} The analyze action is unavailable.", MISSING_KEY_MESSAGE),
                    Style::default().fg(Color::Red),
                )
            } else {
                (
                    "Press 'a' to analyze the image.".to_string(),
                    Style::default().fg(Color::Gray),
                )
            }
        }
        Phase::Analyzing => (
            "Analyzing image... please wait.".to_string(),
            Style::default().fg(Color::Cyan),
        ),
        Phase::Succeeded(content) => (crate::framed_result(content), Style::default()),
        Phase::RateLimited(message) => (message.clone(), Style::default().fg(Color::Red)),
        Phase::Failed(message) => (message.clone(), Style::default().fg(Color::Red)),
    };

    Paragraph::new(text)
        .style(style)
        .block(Block::default().title("Analysis").borders(Borders::ALL))
        .wrap(Wrap { trim: true })
}
