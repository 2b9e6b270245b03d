use egui::Context as EguiContext;
use giftbox_input::Action;
use giftbox_kernel::TextureSlot;
use giftbox_runtime::{AppState, AssetStatus};
use giftbox_tools::WorldInspector;

/// Draw the debug panel. Button presses are queued as actions and applied
/// after the frame.
pub fn draw_debug_panel(ctx: &EguiContext, state: &AppState, actions: &mut Vec<Action>) {
    if !state.show_debug_panel {
        return;
    }

    let summary = WorldInspector::summary(&state.scene);
    let eye = state.camera.position();

    egui::SidePanel::left("debug")
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.heading("Giftbox");
            ui.separator();
            ui.label(format!("Sim time: {:.2}s", summary.simulated_time));
            ui.label(format!(
                "Substeps: {} (last frame {})",
                summary.substeps, summary.last_substeps
            ));
            ui.label(format!(
                "Entities: {}  Spawned: {}/{}",
                summary.entity_count, summary.spawned_count, summary.spawn_cap
            ));
            ui.label(format!(
                "Sun: ({:.1}, {:.1}, {:.1})",
                summary.light_position.x, summary.light_position.y, summary.light_position.z
            ));
            ui.label(format!("Camera: ({:.1}, {:.1}, {:.1})", eye.x, eye.y, eye.z));
            ui.label(status_line("Model", state.model_status()));
            for slot in TextureSlot::ALL {
                ui.label(status_line(&format!("{} texture", slot.name()), state.texture_status(slot)));
            }
            ui.separator();

            ui.horizontal(|ui| {
                if ui.button("Jump (J)").clicked() {
                    actions.push(Action::Jump);
                }
                if ui.button("Spawn (Space)").clicked() {
                    actions.push(Action::Spawn);
                }
            });

            ui.separator();
            ui.heading("Entities");
            egui::ScrollArea::vertical().show(ui, |ui| {
                for id in WorldInspector::list_entities(&state.scene.world) {
                    if let Some(info) = WorldInspector::inspect_entity(&state.scene.world, id) {
                        ui.monospace(info.to_string());
                    }
                }
            });

            ui.separator();
            ui.small("F1: Toggle Panel | LMB drag: Orbit | Wheel: Zoom");
        });
}

fn status_line(label: &str, status: &AssetStatus) -> String {
    match status {
        AssetStatus::None => format!("{label}: none"),
        AssetStatus::Pending(path) => format!("{label}: loading {}", path.display()),
        AssetStatus::Ready { name, .. } => format!("{label}: {name}"),
        AssetStatus::Failed(reason) => format!("{label}: failed ({reason})"),
    }
}
