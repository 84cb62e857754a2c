//! Idle screen: gender/occasion selection.
//!
//! The start affordance stays disabled until both fields are chosen, which
//! is what makes CameraActive unreachable with an incomplete selection.

use crate::gemini::{Gender, Occasion};
use crate::session::Session;
use eframe::egui;

/// Renders the selection screen. Returns true when the user pressed the
/// (enabled) start button.
pub fn show(ui: &mut egui::Ui, session: &mut Session) -> bool {
    let mut start = false;

    ui.vertical_centered(|ui| {
        ui.add_space(32.0);
        ui.heading(egui::RichText::new("AI Fashion Stylist").size(36.0));
        ui.add_space(4.0);
        ui.label("Select your gender and an occasion for personalized style recommendations.");
        ui.add_space(28.0);

        let selection = session.selection();

        ui.label(egui::RichText::new("Gender").strong().size(18.0));
        ui.add_space(6.0);
        ui.horizontal_top(|ui| {
            ui.add_space((ui.available_width() / 2.0 - 110.0).max(0.0));
            for gender in [Gender::Male, Gender::Female] {
                let selected = selection.gender == Some(gender);
                if ui
                    .add_sized(
                        [100.0, 40.0],
                        egui::SelectableLabel::new(selected, gender.to_string()),
                    )
                    .clicked()
                {
                    session.set_gender(gender);
                }
            }
        });

        ui.add_space(20.0);
        ui.label(egui::RichText::new("Occasion").strong().size(18.0));
        ui.add_space(6.0);
        ui.horizontal_top(|ui| {
            ui.add_space((ui.available_width() / 2.0 - 220.0).max(0.0));
            for occasion in Occasion::ALL {
                let selected = selection.occasion == Some(occasion);
                if ui
                    .add_sized(
                        [100.0, 40.0],
                        egui::SelectableLabel::new(selected, occasion.to_string()),
                    )
                    .clicked()
                {
                    session.set_occasion(occasion);
                }
            }
        });

        ui.add_space(36.0);
        let button = egui::Button::new(
            egui::RichText::new("Start Your Style Analysis").size(18.0),
        )
        .min_size(egui::vec2(280.0, 48.0));

        if ui.add_enabled(session.can_start(), button).clicked() {
            start = true;
        }
    });

    start
}
