use serde::Serialize;

pub const WELCOME_MESSAGE: &str = "Welcome to Breast Cancer Image Classifier API";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: u32,
}

/// Held-out evaluation of the shipped weights. Fixed at build time; nothing
/// here is recomputed while serving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub benign: ClassMetrics,
    pub malignant: ClassMetrics,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

pub const EVALUATION: EvaluationReport = EvaluationReport {
    accuracy: 0.85,
    benign: ClassMetrics {
        precision: 0.78,
        recall: 0.74,
        f1_score: 0.76,
        support: 176,
    },
    malignant: ClassMetrics {
        precision: 0.88,
        recall: 0.90,
        f1_score: 0.89,
        support: 369,
    },
    macro_avg: ClassMetrics {
        precision: 0.83,
        recall: 0.82,
        f1_score: 0.83,
        support: 545,
    },
    weighted_avg: ClassMetrics {
        precision: 0.85,
        recall: 0.85,
        f1_score: 0.85,
        support: 545,
    },
};

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: &'static str,
    pub metrics: EvaluationReport,
}

impl WelcomeResponse {
    pub fn new() -> Self {
        Self {
            message: WELCOME_MESSAGE,
            metrics: EVALUATION,
        }
    }
}

impl Default for WelcomeResponse {
    fn default() -> Self {
        Self::new()
    }
}
