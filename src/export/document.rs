//! Flat output document for one analysed clip
//!
//! Successful analyses carry every analytic key. Error-shaped documents
//! carry only `waveform_png: null` and a non-empty `error`.

use crate::pipeline::AnalysisResult;
use serde::{Deserialize, Serialize};

/// Keys present only when the analysis succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticFields {
    /// Class id of the final (possibly overridden) label
    pub resultado: i64,
    pub anomaly_type: String,
    pub mensaje: String,
    pub accion: String,
    pub bpm: Option<f64>,
    pub inconsistente: bool,
    /// Only non-empty for a Normal verdict
    pub encouragement: String,
    pub glucosa_mg_dl: f64,
}

/// Document returned for every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDocument {
    #[serde(flatten)]
    pub analysis: Option<AnalyticFields>,
    pub waveform_png: Option<String>,
    pub error: String,
}

impl AnalysisDocument {
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

impl From<&AnalysisResult> for AnalysisDocument {
    fn from(result: &AnalysisResult) -> Self {
        match result {
            AnalysisResult::Completed(verdict) => {
                let final_label = verdict.resolution.final_label;
                AnalysisDocument {
                    analysis: Some(AnalyticFields {
                        resultado: final_label
                            .class_id()
                            .unwrap_or(verdict.classification.class_id),
                        anomaly_type: final_label.display_name().to_string(),
                        mensaje: verdict.message.clone(),
                        accion: verdict.action.clone(),
                        bpm: verdict.beats.bpm,
                        inconsistente: verdict.resolution.inconsistent,
                        encouragement: verdict.encouragement.unwrap_or_default().to_string(),
                        glucosa_mg_dl: verdict.glucose_mg_dl,
                    }),
                    waveform_png: Some(verdict.waveform_png.clone()),
                    error: String::new(),
                }
            }
            AnalysisResult::Failed { error } => AnalysisDocument {
                analysis: None,
                waveform_png: None,
                error: error.clone(),
            },
        }
    }
}
