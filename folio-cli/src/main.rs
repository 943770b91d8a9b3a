use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::cursor;
use crossterm::event;
use crossterm::terminal::{self, Clear, ClearType};
use directories::ProjectDirs;
use folio_core::{
    Command, ContainerSize, DocumentSource, FileThemeStore, FitMode, RasterSurface, RenderImage,
    RenderStatus, Session, SessionState, Theme, ThemeStore, ViewerConfig,
};
use folio_render::{apply_theme, PdfiumEngine};
use folio_tty::{write_status_line, DrawParams, EventMapper, KittyRenderer, UiEvent};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Cell size assumed when the terminal does not report its pixel size.
const FALLBACK_CELL: (f32, f32) = (8.0, 16.0);

#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Terminal document viewer with search")]
struct Args {
    /// Page to open on (1-based)
    #[arg(short = 'p', long = "page")]
    page: Option<usize>,

    /// Initial fit mode: width, page, actual or custom
    #[arg(short = 'f', long = "fit")]
    fit: Option<FitMode>,

    /// Colour theme: normal, dark, sepia or high-contrast
    #[arg(short = 't', long = "theme")]
    theme: Option<Theme>,

    /// Match search queries case-sensitively
    #[arg(short = 'c', long = "case-sensitive")]
    case_sensitive: bool,

    /// Config file, defaults to config.toml in the platform config directory
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Path or URL of the document to open
    source: String,
}

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(stdout, cursor::Show);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("net", "folio", "folio")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| project_dirs.config_dir().join("config.toml"));
    let mut config = ViewerConfig::load(&config_path)?;
    if let Some(fit) = args.fit {
        config.default_fit_mode = fit;
    }
    if args.case_sensitive {
        config.search.case_sensitive = true;
    }

    let themes: Arc<dyn ThemeStore> = Arc::new(FileThemeStore::new(
        project_dirs.data_local_dir().join("state"),
    )?);
    let engine = PdfiumEngine::new()?;
    let mut session = Session::new(Arc::new(engine), themes, config);
    if let Some(theme) = args.theme {
        if let Err(err) = session.set_theme(theme) {
            warn!(%err, "theme applied for this session only");
        }
    }

    let pages = session
        .load(DocumentSource::parse(&args.source))
        .await
        .with_context(|| format!("failed to open {}", args.source))?;
    info!(pages, source = %args.source, "document ready");
    if let Some(page) = args.page {
        session.apply(Command::GotoPage { page });
    }

    let label = source_label(&args.source);
    let _raw = RawModeGuard::new()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, cursor::Hide)?;
    let mut renderer = KittyRenderer::new(stdout);
    let mut event_mapper = EventMapper::new().with_zoom_step(session.config().zoom_step);
    let mut surface = RasterSurface::new(
        ContainerSize {
            width: 0.0,
            height: 0.0,
        },
        session.config().device_pixel_ratio,
    );
    let mut render_error: Option<String> = None;
    let mut dirty = true;

    loop {
        if dirty {
            render_error = redraw(&mut renderer, &mut session, &mut surface).await?;
            dirty = false;
            let status = format_status(
                session.state(),
                &label,
                event_mapper.pending_input().as_deref(),
                render_error.as_deref(),
            );
            draw_status_line(&mut renderer, &status)?;
        }

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let ui_event = event_mapper.map_event(event::read()?);
        match ui_event {
            UiEvent::Command(Command::ToggleCaseSensitive) => {
                dirty = session.apply(Command::ToggleCaseSensitive);
                let query = session.state().search.query.clone();
                if !query.is_empty() {
                    if let Err(err) = session.perform_search(&query).await {
                        warn!(%err, %query, "search failed");
                    }
                    dirty = true;
                }
            }
            UiEvent::Command(command) => dirty = session.apply(command),
            UiEvent::BeginSearch => session.set_search_active(true),
            UiEvent::SearchQueryChanged { .. } => {}
            UiEvent::SearchSubmit { query } => {
                if let Err(err) = session.perform_search(&query).await {
                    warn!(%err, %query, "search failed");
                }
                dirty = true;
            }
            UiEvent::SearchCancel => session.set_search_active(false),
            UiEvent::Resize => dirty = true,
            UiEvent::Quit => break,
            UiEvent::None => {}
        }

        if !dirty {
            let status = format_status(
                session.state(),
                &label,
                event_mapper.pending_input().as_deref(),
                render_error.as_deref(),
            );
            draw_status_line(&mut renderer, &status)?;
        }
    }

    renderer.delete_images()?;
    renderer.clear_all()?;
    Ok(())
}

/// Renders the current page into `surface` and presents it. Returns the
/// render error, if any; the previous frame stays on screen in that case.
async fn redraw(
    renderer: &mut KittyRenderer<io::Stdout>,
    session: &mut Session,
    surface: &mut RasterSurface,
) -> Result<Option<String>> {
    let layout = TerminalLayout::measure()?;
    surface.set_container_size(layout.container(session.config().device_pixel_ratio));

    let render_error = match session.render(surface).await {
        Ok(RenderStatus::Completed(viewport)) => {
            debug!(?viewport, "page rendered");
            None
        }
        Ok(RenderStatus::Superseded) => None,
        Err(err) => {
            warn!(%err, "render failed");
            Some(err.to_string())
        }
    };

    renderer.begin_sync_update()?;
    renderer.clear_all()?;
    if let Some(frame) = surface.frame() {
        let mut image = frame.clone();
        apply_theme(&mut image, session.state().theme);
        let (columns, rows) = layout.cells_for(&image);
        let start_col = layout.columns.saturating_sub(columns) / 2;
        let start_row = layout.image_rows().saturating_sub(rows) / 2;
        crossterm::execute!(
            renderer.writer(),
            cursor::MoveTo(start_col as u16, start_row as u16)
        )?;
        renderer.draw(&image, DrawParams::clamped(columns, rows))?;
    }
    renderer.end_sync_update()?;
    Ok(render_error)
}

/// Terminal geometry in cells and pixels, with the last row kept for status.
#[derive(Debug, Clone, Copy)]
struct TerminalLayout {
    columns: u32,
    rows: u32,
    cell_width: f32,
    cell_height: f32,
}

impl TerminalLayout {
    fn measure() -> Result<Self> {
        let window = terminal::window_size()?;
        Ok(Self::from_window(
            u32::from(window.columns),
            u32::from(window.rows),
            u32::from(window.width),
            u32::from(window.height),
        ))
    }

    fn from_window(columns: u32, rows: u32, pixel_width: u32, pixel_height: u32) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let (cell_width, cell_height) = if pixel_width > 0 && pixel_height > 0 {
            (
                pixel_width as f32 / columns as f32,
                pixel_height as f32 / rows as f32,
            )
        } else {
            FALLBACK_CELL
        };
        Self {
            columns,
            rows,
            cell_width,
            cell_height,
        }
    }

    fn image_rows(&self) -> u32 {
        self.rows.saturating_sub(1).max(1)
    }

    /// Drawable area in layout units, i.e. device pixels over the ratio.
    fn container(&self, device_pixel_ratio: f32) -> ContainerSize {
        let ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        ContainerSize {
            width: self.columns as f32 * self.cell_width / ratio,
            height: self.image_rows() as f32 * self.cell_height / ratio,
        }
    }

    /// Cells covered by `image`, shrunk to fit with its aspect ratio kept.
    fn cells_for(&self, image: &RenderImage) -> (u32, u32) {
        let available = (
            self.columns as f32 * self.cell_width,
            self.image_rows() as f32 * self.cell_height,
        );
        if image.width == 0 || image.height == 0 {
            return (self.columns, self.image_rows());
        }
        let shrink = (available.0 / image.width as f32)
            .min(available.1 / image.height as f32)
            .min(1.0);
        let columns = (image.width as f32 * shrink / self.cell_width).round() as u32;
        let rows = (image.height as f32 * shrink / self.cell_height).round() as u32;
        (
            columns.clamp(1, self.columns),
            rows.clamp(1, self.image_rows()),
        )
    }
}

fn source_label(source: &str) -> String {
    source
        .rsplit(|c| c == '/' || c == '\\')
        .find(|segment| !segment.is_empty())
        .unwrap_or(source)
        .to_owned()
}

fn format_status(
    state: &SessionState,
    label: &str,
    pending_input: Option<&str>,
    render_error: Option<&str>,
) -> String {
    let mut parts = vec![label.to_owned()];
    if state.loading {
        parts.push("loading".to_owned());
    } else {
        parts.push(format!("page {}/{}", state.current_page, state.total_pages));
    }
    let zoom = if state.fit_mode == FitMode::Custom {
        format!("{:.0}%", state.zoom_level * 100.0)
    } else {
        state.fit_mode.to_string()
    };
    parts.push(zoom);
    if state.rotation.degrees() != 0 {
        parts.push(state.rotation.to_string());
    }
    if state.theme != Theme::Normal {
        parts.push(state.theme.to_string());
    }

    if state.search.searching {
        parts.push(format!("/{} searching", state.search.query));
    } else if let Some(summary) = state.search.summary() {
        if summary.total == 0 {
            parts.push(format!("/{} (no matches)", summary.query));
        } else {
            parts.push(format!(
                "/{} ({}/{})",
                summary.query,
                summary.current + 1,
                summary.total
            ));
        }
    }
    if state.search.case_sensitive {
        parts.push("Aa".to_owned());
    }
    if let Some(badge) = &state.highlight {
        parts.push(badge.label());
    }
    if let Some(error) = render_error.or(state.error.as_deref()) {
        parts.push(format!("error: {error}"));
    }
    if let Some(pending) = pending_input.filter(|s| !s.is_empty()) {
        parts.push(pending.to_owned());
    }
    parts.join(" | ")
}

fn draw_status_line(renderer: &mut KittyRenderer<io::Stdout>, status: &str) -> Result<()> {
    let window = terminal::window_size()?;
    let status_row = window.rows.saturating_sub(1);
    let width = usize::from(window.columns);
    let writer = renderer.writer();
    crossterm::execute!(
        writer,
        cursor::MoveTo(0, status_row),
        Clear(ClearType::CurrentLine)
    )?;
    write_status_line(writer, status, width)?;
    Ok(())
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "folio.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
