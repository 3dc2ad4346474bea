//! Recorded move datasets and the `dataset||move` selector used by block menus.

use tracing::{info, warn};

pub const RECORDED_MOVE_SEPARATOR: &str = "||";
pub const DANCES_DATASET: &str = "pollen-robotics/reachy-mini-dances-library";
pub const EMOTIONS_DATASET: &str = "pollen-robotics/reachy-mini-emotions-library";
/// Dataset assumed for selectors that only name a move
pub const DEFAULT_DATASET: &str = DANCES_DATASET;

pub const DANCE_MOVES: [&str; 20] = [
    "groovy_sway_and_roll",
    "headbanger_combo",
    "uh_huh_tilt",
    "side_to_side_sway",
    "dizzy_spin",
    "neck_recoil",
    "jackson_square",
    "side_peekaboo",
    "sharp_side_tilt",
    "chin_lead",
    "stumble_and_recover",
    "head_tilt_roll",
    "yeah_nod",
    "interwoven_spirals",
    "chicken_peck",
    "simple_nod",
    "polyrhythm_combo",
    "grid_snap",
    "side_glance_flick",
    "pendulum_swing",
];

pub const EMOTION_MOVES: [&str; 81] = [
    "dance3",
    "displeased1",
    "welcoming1",
    "surprised1",
    "reprimand3",
    "dance1",
    "disgusted1",
    "curious1",
    "contempt1",
    "sad2",
    "thoughtful2",
    "enthusiastic2",
    "understanding1",
    "amazed1",
    "impatient2",
    "success2",
    "grateful1",
    "scared1",
    "inquiring2",
    "success1",
    "indifferent1",
    "displeased2",
    "thoughtful1",
    "reprimand2",
    "fear1",
    "no1",
    "cheerful1",
    "shy1",
    "downcast1",
    "boredom1",
    "laughing1",
    "irritated1",
    "lost1",
    "frustrated1",
    "exhausted1",
    "irritated2",
    "dance2",
    "dying1",
    "confused1",
    "inquiring1",
    "proud3",
    "relief1",
    "enthusiastic1",
    "attentive1",
    "calming1",
    "reprimand1",
    "attentive2",
    "uncertain1",
    "oops1",
    "boredom2",
    "surprised2",
    "uncomfortable1",
    "sleep1",
    "furious1",
    "resigned1",
    "helpful1",
    "proud1",
    "come1",
    "go_away1",
    "lonely1",
    "yes_sad1",
    "inquiring3",
    "incomprehensible2",
    "electric1",
    "welcoming2",
    "rage1",
    "oops2",
    "anxiety1",
    "understanding2",
    "laughing2",
    "no_excited1",
    "helpful2",
    "relief2",
    "yes1",
    "proud2",
    "sad1",
    "loving1",
    "impatient1",
    "tired1",
    "serenity1",
    "no_sad1",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMoveSelection {
    pub dataset: String,
    pub move_name: String,
}

impl Default for RecordedMoveSelection {
    fn default() -> Self {
        RecordedMoveSelection::new(DEFAULT_DATASET, DANCE_MOVES[0])
    }
}

impl RecordedMoveSelection {
    pub fn new(dataset: &str, move_name: &str) -> Self {
        RecordedMoveSelection {
            dataset: dataset.to_owned(),
            move_name: move_name.to_owned(),
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{}{}{}",
            self.dataset, RECORDED_MOVE_SEPARATOR, self.move_name
        )
    }

    /// Never fails, anything unusable falls back to the first default dance
    pub fn decode(value: Option<&str>) -> RecordedMoveSelection {
        let value = match value {
            Some(value) if !value.trim().is_empty() => value,
            _ => return RecordedMoveSelection::default(),
        };

        if value.contains(RECORDED_MOVE_SEPARATOR) {
            let mut parts = value.split(RECORDED_MOVE_SEPARATOR);
            let dataset = parts.next().unwrap_or_default();
            let move_name = parts.next().unwrap_or_default();
            if !dataset.is_empty() && !move_name.is_empty() {
                return RecordedMoveSelection::new(dataset, move_name);
            }
            warn!(value, "Malformed recorded move selector, using default move");
            return RecordedMoveSelection::default();
        }

        info!(
            value,
            dataset = DEFAULT_DATASET,
            "Recorded move is not dataset qualified"
        );
        RecordedMoveSelection::new(DEFAULT_DATASET, value.trim())
    }
}

/// Every known selection, dances first
pub fn catalog() -> Vec<RecordedMoveSelection> {
    DANCE_MOVES
        .iter()
        .map(|name| RecordedMoveSelection::new(DANCES_DATASET, name))
        .chain(
            EMOTION_MOVES
                .iter()
                .map(|name| RecordedMoveSelection::new(EMOTIONS_DATASET, name)),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_selector_round_trips() {
        for (dataset, move_name) in [
            ("setA", "danceX"),
            (EMOTIONS_DATASET, "go_away1"),
            (" spaced ", " name "),
            ("a|b", "c|"),
        ] {
            let selection = RecordedMoveSelection::new(dataset, move_name);
            let decoded = RecordedMoveSelection::decode(Some(&selection.encode()));
            assert_eq!(decoded, selection);
        }
    }

    #[test]
    fn bare_move_uses_default_dataset() {
        let decoded = RecordedMoveSelection::decode(Some("  dizzy_spin "));
        assert_eq!(decoded, RecordedMoveSelection::new(DEFAULT_DATASET, "dizzy_spin"));
    }

    #[test]
    fn empty_input_uses_default_move() {
        let expected = RecordedMoveSelection::new(DEFAULT_DATASET, "groovy_sway_and_roll");
        assert_eq!(RecordedMoveSelection::decode(None), expected);
        assert_eq!(RecordedMoveSelection::decode(Some("")), expected);
        assert_eq!(RecordedMoveSelection::decode(Some("   ")), expected);
    }

    #[test]
    fn half_empty_selector_uses_default_move() {
        assert_eq!(
            RecordedMoveSelection::decode(Some("||dizzy_spin")),
            RecordedMoveSelection::default()
        );
        assert_eq!(
            RecordedMoveSelection::decode(Some("setA||")),
            RecordedMoveSelection::default()
        );
    }

    #[test]
    fn catalog_covers_both_datasets() {
        let catalog = catalog();
        assert_eq!(catalog.len(), DANCE_MOVES.len() + EMOTION_MOVES.len());
        assert_eq!(catalog[0], RecordedMoveSelection::default());
        assert_eq!(catalog.last().unwrap().dataset, EMOTIONS_DATASET);
    }
}
