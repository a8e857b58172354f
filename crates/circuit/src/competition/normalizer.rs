use super::domain::{ParticipatingPenya, PenyaId};

/// Entry reduced to what the ranker compares. `comparable_value` is `None` for
/// non-participants and for entries without a usable measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry {
    pub penya_id: PenyaId,
    pub name: String,
    pub comparable_value: Option<f64>,
}

pub fn normalize(entry: &ParticipatingPenya) -> NormalizedEntry {
    let comparable_value = if entry.participates {
        entry.result.filter(|value| is_measurement(*value))
    } else {
        None
    };

    NormalizedEntry {
        penya_id: entry.penya_id.clone(),
        name: entry.name.clone(),
        comparable_value,
    }
}

// -1 (and anything below it) is the stored "not entered" sentinel.
fn is_measurement(value: f64) -> bool {
    value.is_finite() && value > -1.0
}
