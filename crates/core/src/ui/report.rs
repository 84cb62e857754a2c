//! Two-pane style report: captured look and analysis on the left,
//! recommendation cards with generated product photos on the right.

use crate::gemini::{AnalysisResult, Gender, Occasion};
use crate::session;
use eframe::egui;

pub struct ReportView<'a> {
    pub gender: Gender,
    pub occasion: Occasion,
    pub analysis: &'a AnalysisResult,
    pub captured: Option<&'a egui::TextureHandle>,
    /// Index-aligned with `analysis.recommendations`; `None` when a
    /// generated image failed to decode locally.
    pub item_textures: &'a [Option<egui::TextureHandle>],
}

/// Renders the report. Returns true when "Try Again" was pressed.
pub fn show(ui: &mut egui::Ui, view: &ReportView) -> bool {
    let mut reset = false;

    ui.horizontal(|ui| {
        ui.heading("Your Style Report");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Try Again").clicked() {
                reset = true;
            }
        });
    });
    ui.separator();
    ui.add_space(6.0);

    ui.columns(2, |columns| {
        show_look_pane(&mut columns[0], view);
        show_recommendation_pane(&mut columns[1], view);
    });

    reset
}

fn show_look_pane(ui: &mut egui::Ui, view: &ReportView) {
    ui.label(egui::RichText::new("Your Look").strong().size(16.0));
    ui.add_space(4.0);

    if let Some(texture) = view.captured {
        ui.add(
            egui::Image::new(texture)
                .max_size(egui::vec2(ui.available_width(), ui.available_height() * 0.5)),
        );
    }

    ui.add_space(12.0);
    ui.label(egui::RichText::new("Style Analysis").strong().size(16.0));
    ui.add_space(4.0);
    ui.label(format!("For: {} / {}", view.gender, view.occasion));
    ui.add_space(4.0);
    egui::ScrollArea::vertical()
        .id_salt("style-analysis")
        .show(ui, |ui| {
            ui.label(format!("Our Take: {}", view.analysis.style_analysis));
        });
}

fn show_recommendation_pane(ui: &mut egui::Ui, view: &ReportView) {
    ui.label(egui::RichText::new("Our Recommendations").strong().size(16.0));
    ui.add_space(4.0);

    if view.analysis.recommendations.is_empty() {
        ui.label("No recommendations were returned for this look.");
        return;
    }

    egui::ScrollArea::vertical()
        .id_salt("recommendations")
        .show(ui, |ui| {
            for (index, item) in view.analysis.recommendations.iter().enumerate() {
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.horizontal_top(|ui| {
                        if let Some(Some(texture)) = view.item_textures.get(index) {
                            ui.add(
                                egui::Image::new(texture)
                                    .max_size(egui::vec2(140.0, 140.0)),
                            );
                        }
                        ui.vertical(|ui| {
                            ui.label(egui::RichText::new(&item.item_name).strong());
                            ui.label(
                                egui::RichText::new(&item.category)
                                    .small()
                                    .color(egui::Color32::GRAY),
                            );
                            ui.add_space(2.0);
                            ui.label(&item.reason);
                            ui.add_space(4.0);
                            ui.hyperlink_to(
                                "Find on Amazon",
                                session::marketplace_search_url(view.gender, &item.item_name),
                            );
                        });
                    });
                });
                ui.add_space(8.0);
            }
        });
}
