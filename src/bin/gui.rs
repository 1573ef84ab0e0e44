//! brisque-score desktop window - pick an image, see its BRISQUE score.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use eframe::egui;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use brisque_score::service::RequestId;
use brisque_score::{report, Config, Outcome, QualityScorer, ScoringService};

/// Longest edge of the preview thumbnail.
const THUMBNAIL_SIZE: u32 = 250;

/// Extensions offered by the file picker.
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

enum Status {
    Idle,
    Calculating(RequestId),
    Done(String),
}

/// Window state. Everything the widgets read or write lives here.
struct App {
    service: ScoringService,
    path_input: String,
    preview: Option<egui::TextureHandle>,
    status: Status,
}

impl App {
    fn new(service: ScoringService) -> Self {
        Self {
            service,
            path_input: String::new(),
            preview: None,
            status: Status::Idle,
        }
    }

    fn select(&mut self, ctx: &egui::Context, path: &Path) {
        self.path_input = path.display().to_string();

        self.preview = match load_thumbnail(path) {
            Ok(image) => Some(ctx.load_texture("preview", image, egui::TextureOptions::LINEAR)),
            Err(err) => {
                tracing::warn!("No preview for {}: {err:#}", path.display());
                None
            }
        };

        let id = self.service.submit(path);
        self.status = Status::Calculating(id);
    }

    fn poll(&mut self) {
        while let Some(event) = self.service.try_next() {
            if !matches!(self.status, Status::Calculating(id) if id == event.id) {
                continue;
            }

            self.status = match event.outcome {
                Outcome::Scored(score) => Status::Done(report::format_report(score)),
                Outcome::Failed(err) => Status::Done(format!("Assessment failed: {err}")),
                Outcome::Superseded => continue,
            };
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll();

        let dropped: Option<PathBuf> =
            ctx.input(|i| i.raw.dropped_files.iter().find_map(|f| f.path.clone()));
        if let Some(path) = dropped {
            self.select(ctx, &path);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(10.0);
                ui.heading("Upload an Image to Assess Quality");
                ui.label("Choose an image, drop one on this window or enter its path.");
                ui.add_space(10.0);

                if ui.button("Choose Image").clicked() {
                    if let Some(path) = pick_image() {
                        self.select(ctx, &path);
                    }
                }
                ui.add_space(5.0);

                ui.horizontal(|ui| {
                    ui.text_edit_singleline(&mut self.path_input);
                    if ui.button("Assess").clicked() && !self.path_input.trim().is_empty() {
                        let path = PathBuf::from(self.path_input.trim());
                        self.select(ctx, &path);
                    }
                });

                if let Some(texture) = &self.preview {
                    ui.add_space(10.0);
                    ui.image(egui::load::SizedTexture::from_handle(texture));
                }

                ui.add_space(10.0);
                match &self.status {
                    Status::Idle => {}
                    Status::Calculating(_) => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Calculating...");
                        });
                    }
                    Status::Done(text) => {
                        ui.label(egui::RichText::new(text).monospace());
                    }
                }
            });
        });

        if matches!(self.status, Status::Calculating(_)) {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Select Image")
        .add_filter("Image files", &IMAGE_EXTENSIONS)
        .pick_file()
}

fn load_thumbnail(path: &Path) -> Result<egui::ColorImage> {
    let image = image::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
        .to_rgba8();

    let size = [image.width() as usize, image.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brisque_score=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let scorer =
        QualityScorer::with_brisque(Config::default()).context("Failed to initialize scorer")?;
    let service = ScoringService::spawn(scorer).context("Failed to start scoring worker")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Image Quality Assessment")
            .with_inner_size([600.0, 600.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Image Quality Assessment",
        options,
        Box::new(|_cc| Ok(Box::new(App::new(service)))),
    )
    .map_err(|err| anyhow!("Window failed: {err}"))
}
