//! Spoken feedback produced after scoring operations.
//!
//! Only the text is produced here; playback is up to the connected UI, which
//! receives it through the `announcement` SSE event.

use rand::seq::IndexedRandom;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::AnnouncerPhrases,
    state::{
        match_state::PointScored,
        model::{PointsToWin, Side},
        settings::Settings,
    },
};

/// Text to speak together with the configured volume.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Announcement {
    /// Sentence to read out.
    pub text: String,
    /// Volume between 0 and 1.
    pub volume: f64,
}

/// Names needed to describe a scored point.
#[derive(Debug, Clone)]
pub struct ScoreLine<'a> {
    /// Point that was just played.
    pub scored: &'a PointScored,
    /// Target score of the tournament.
    pub points_to_win: PointsToWin,
    /// Side and name of the next server.
    pub server: Option<(Side, &'a str)>,
    /// Label of the winning side once the match is decided.
    pub winner_label: Option<String>,
}

/// Builds announcement texts from the configured phrases.
#[derive(Debug, Clone)]
pub struct Announcer {
    phrases: AnnouncerPhrases,
}

impl Announcer {
    /// Wrap the configured phrases.
    pub fn new(phrases: AnnouncerPhrases) -> Self {
        Self { phrases }
    }

    /// Announcement after a point: the final result, or the server with its score first.
    pub fn point(&self, settings: &Settings, line: &ScoreLine<'_>) -> Option<Announcement> {
        if !settings.announcements_enabled() {
            return None;
        }
        let scored = line.scored;

        if let (Some(_), Some(label)) = (scored.winner, &line.winner_label) {
            let high = scored.score1.max(scored.score2);
            let low = scored.score1.min(scored.score2);
            let mut text = self
                .phrases
                .match_over
                .replace("{winner}", label)
                .replace("{high}", &high.to_string())
                .replace("{low}", &low.to_string());
            if let Some(remark) = self.pick(settings, &self.phrases.winning) {
                text = format!("{text}, {remark}");
            }
            return Some(self.with_volume(settings, text));
        }

        let (server_side, server_name) = line.server?;
        let own = match server_side {
            Side::One => scored.score1,
            Side::Two => scored.score2,
        };
        let other = match server_side {
            Side::One => scored.score2,
            Side::Two => scored.score1,
        };
        let mut text = format!("{server_name}, {own} : {other}");

        let points_needed = line.points_to_win.value().saturating_sub(own.max(other));
        let pool = if (1..=2).contains(&points_needed) {
            &self.phrases.near_end
        } else {
            &self.phrases.general
        };
        if let Some(phrase) = self.pick(settings, pool) {
            text = format!("{text}, {phrase}");
        }
        Some(self.with_volume(settings, text))
    }

    /// Name of the player serving first, read out once the server is chosen.
    pub fn first_server(&self, settings: &Settings, server_name: &str) -> Option<Announcement> {
        settings
            .announcements_enabled()
            .then(|| self.with_volume(settings, server_name.to_owned()))
    }

    /// Acknowledgement of a voice undo.
    pub fn undo_ack(&self, settings: &Settings) -> Option<Announcement> {
        self.ack(settings, &self.phrases.undo_ack)
    }

    /// Acknowledgement of a voice side swap.
    pub fn swap_ack(&self, settings: &Settings) -> Option<Announcement> {
        self.ack(settings, &self.phrases.swap_ack)
    }

    fn ack(&self, settings: &Settings, text: &str) -> Option<Announcement> {
        (settings.voice_assist_enabled && !text.is_empty())
            .then(|| self.with_volume(settings, text.to_owned()))
    }

    fn pick<'a>(&self, settings: &Settings, pool: &'a [String]) -> Option<&'a String> {
        if !settings.motivational_phrases_enabled {
            return None;
        }
        pool.choose(&mut rand::rng())
    }

    fn with_volume(&self, settings: &Settings, text: String) -> Announcement {
        Announcement {
            text,
            volume: settings.voice_volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(score1: u32, score2: u32, winner: Option<Side>) -> PointScored {
        PointScored {
            match_id: 1,
            side: Side::One,
            score1,
            score2,
            serving_player: Some(10),
            winner,
        }
    }

    fn voice_on() -> Settings {
        Settings {
            voice_assist_enabled: true,
            ..Settings::default()
        }
    }

    fn quiet_phrases() -> Settings {
        Settings {
            motivational_phrases_enabled: false,
            ..voice_on()
        }
    }

    #[test]
    fn nothing_is_announced_without_voice_features() {
        let announcer = Announcer::new(AnnouncerPhrases::default());
        let point = scored(1, 0, None);
        let line = ScoreLine {
            scored: &point,
            points_to_win: PointsToWin::Eleven,
            server: Some((Side::One, "Jan")),
            winner_label: None,
        };
        assert_eq!(announcer.point(&Settings::default(), &line), None);
        assert_eq!(announcer.first_server(&Settings::default(), "Jan"), None);
    }

    #[test]
    fn score_is_read_from_the_server_perspective() {
        let announcer = Announcer::new(AnnouncerPhrases::default());
        let point = scored(3, 5, None);
        let line = ScoreLine {
            scored: &point,
            points_to_win: PointsToWin::Eleven,
            server: Some((Side::Two, "Petr")),
            winner_label: None,
        };
        let announcement = announcer.point(&quiet_phrases(), &line).unwrap();
        assert_eq!(announcement.text, "Petr, 5 : 3");
        assert_eq!(announcement.volume, 1.0);
    }

    #[test]
    fn near_end_phrases_are_used_close_to_the_target() {
        let phrases = AnnouncerPhrases::default();
        let announcer = Announcer::new(phrases.clone());
        let point = scored(9, 4, None);
        let line = ScoreLine {
            scored: &point,
            points_to_win: PointsToWin::Eleven,
            server: Some((Side::One, "Jan")),
            winner_label: None,
        };
        let text = announcer.point(&voice_on(), &line).unwrap().text;
        let suffix = text.strip_prefix("Jan, 9 : 4, ").unwrap();
        assert!(phrases.near_end.iter().any(|phrase| phrase == suffix));
    }

    #[test]
    fn winner_is_announced_with_high_score_first() {
        let announcer = Announcer::new(AnnouncerPhrases::default());
        let point = scored(6, 11, Some(Side::Two));
        let line = ScoreLine {
            scored: &point,
            points_to_win: PointsToWin::Eleven,
            server: Some((Side::One, "Jan")),
            winner_label: Some("Petr".into()),
        };
        let text = announcer.point(&quiet_phrases(), &line).unwrap().text;
        assert_eq!(text, "Konec zápasu. Vítěz Petr. 11 : 6");
    }

    #[test]
    fn acknowledgements_need_the_voice_assistant() {
        let announcer = Announcer::new(AnnouncerPhrases::default());
        let input_only = Settings {
            voice_input_enabled: true,
            ..Settings::default()
        };
        assert_eq!(announcer.undo_ack(&input_only), None);
        assert_eq!(announcer.swap_ack(&voice_on()).unwrap().text, "Měním strany");
    }
}
