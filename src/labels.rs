use serde::Serialize;

/// Class names in the index order used when the weights were trained.
/// Changing this order without retraining silently flips every prediction.
pub const CLASS_NAMES: [&str; 2] = ["benign", "malignant"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Benign,
    Malignant,
}

impl Label {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Label::Benign),
            1 => Some(Label::Malignant),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Label::Benign => 0,
            Label::Malignant => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        CLASS_NAMES[self.index()]
    }

    /// Argmax over raw network scores. The first maximum wins on ties and
    /// NaN scores are never selected.
    pub fn from_scores(scores: &[f32]) -> Option<Self> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &score) in scores.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((i, score)),
            }
        }
        best.and_then(|(i, _)| Self::from_index(i))
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
