//! Patient-facing wording for each verdict

use crate::types::RhythmLabel;
use rand::seq::SliceRandom;

/// Encouragement shown with a Normal verdict, one picked at random
pub const NORMAL_MESSAGES: [&str; 4] = [
    "Tu corazón es fuerte y saludable ❤️",
    "No se detectaron anomalías, ¡bien hecho!",
    "Latidos estables: tu corazón trabaja perfectamente",
    "¡Genial! Tu corazón late con normalidad",
];

/// Message and recommended action for a final verdict
pub fn message_and_action(
    predicted: RhythmLabel,
    final_label: RhythmLabel,
    inconsistent: bool,
    bpm: Option<f64>,
) -> (String, String) {
    if inconsistent {
        let measured = bpm
            .map(|b| format!("{:.1} lpm", b))
            .unwrap_or_else(|| "sin medición".to_string());
        return (
            format!(
                "El modelo sugirió {} pero la frecuencia medida ({}) está dentro del rango normal.",
                predicted.display_name().to_lowercase(),
                measured
            ),
            "Repite la grabación en un lugar silencioso para confirmar el resultado.".to_string(),
        );
    }

    let (message, action) = match final_label {
        RhythmLabel::Normal => (
            "Ritmo cardíaco normal.",
            "Continúa con tus hábitos saludables y tus controles habituales.",
        ),
        RhythmLabel::Bradycardia => (
            "Se detectó un ritmo cardíaco lento (bradicardia).",
            "Consulta a tu médico, sobre todo si presentas mareos, fatiga o desmayos.",
        ),
        RhythmLabel::Tachycardia => (
            "Se detectó un ritmo cardíaco acelerado (taquicardia).",
            "Descansa, evita la cafeína y consulta a tu médico si persiste.",
        ),
        RhythmLabel::Unknown => (
            "No se pudo determinar el tipo de ritmo.",
            "Repite la grabación acercando el micrófono al pecho.",
        ),
    };
    (message.to_string(), action.to_string())
}

/// Random encouragement for a Normal verdict, `None` otherwise
pub fn encouragement(final_label: RhythmLabel) -> Option<&'static str> {
    if final_label != RhythmLabel::Normal {
        return None;
    }
    NORMAL_MESSAGES.choose(&mut rand::thread_rng()).copied()
}
