//! Translate raw scoring input (pointer, arrow keys, speech transcripts) into match commands.
//!
//! The dispatcher never mutates a match: it only decides which operation an
//! input stands for. Whether the operation is legal is left to the match
//! state machine.

use indexmap::{IndexMap, map::Entry};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::{CommandPhrase, VoiceConfig},
    state::{
        match_state::check_win_condition,
        model::{Match, Player, PlayerId, PointsToWin, Side},
    },
};

/// Shortest name part usable as a standalone voice keyword.
const MIN_NAME_PART_LEN: usize = 3;

/// Arrow keys used by the scoring screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrowKey {
    /// Left half of the screen.
    Left,
    /// Right half of the screen.
    Right,
}

/// Raw input received from a scoring device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Tap or click on a side's score.
    Pointer {
        /// Logical side that was tapped.
        side: Side,
    },
    /// Correction gesture taking a point away.
    PointerSubtract {
        /// Logical side to take the point from.
        side: Side,
    },
    /// Keyboard arrow, interpreted against the displayed sides.
    Key(ArrowKey),
    /// Final speech recognition result.
    Speech {
        /// Raw transcript.
        transcript: String,
    },
}

/// Spoken commands that do not name a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceCommand {
    /// Revert the last awarded point.
    Undo,
    /// Flip the displayed sides.
    SwapSides,
    /// Park the match.
    Suspend,
}

/// Vocabulary in effect, derived from the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceContext {
    /// First server not chosen yet: player names select the server.
    Setup,
    /// Match running: player names award points.
    Game,
}

impl VoiceContext {
    /// Context for the given match.
    pub fn for_match(current: &Match) -> Self {
        if current.first_server.is_none() {
            VoiceContext::Setup
        } else {
            VoiceContext::Game
        }
    }
}

/// Operation requested by an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "side", rename_all = "snake_case")]
pub enum MatchCommand {
    /// Pick the side serving first.
    SetFirstServer(Side),
    /// Award a point.
    AddPoint(Side),
    /// Take a point away.
    SubtractPoint(Side),
    /// Revert the last awarded point.
    Undo,
    /// Flip the displayed sides.
    SwapSides,
    /// Save the result.
    Finalize,
    /// Park the match.
    Suspend,
}

impl From<VoiceCommand> for MatchCommand {
    fn from(value: VoiceCommand) -> Self {
        match value {
            VoiceCommand::Undo => MatchCommand::Undo,
            VoiceCommand::SwapSides => MatchCommand::SwapSides,
            VoiceCommand::Suspend => MatchCommand::Suspend,
        }
    }
}

/// Outcome of dispatching one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The input maps to a command.
    Command(MatchCommand),
    /// The input was understood but has no effect.
    Ignored(&'static str),
}

/// What the dispatcher needs to know about the match being played.
#[derive(Debug, Clone)]
pub struct DispatchContext<'a> {
    /// Match receiving the input.
    pub current: &'a Match,
    /// Target score of the tournament.
    pub points_to_win: PointsToWin,
    /// Every player of the match with the side they play on.
    pub competitors: Vec<(Side, &'a Player)>,
    /// Whether speech input is accepted.
    pub voice_enabled: bool,
}

/// Stateless input translator configured with the voice vocabulary.
#[derive(Debug, Clone)]
pub struct InputDispatcher {
    voice: VoiceConfig,
}

impl InputDispatcher {
    /// Build a dispatcher around the configured vocabulary.
    pub fn new(voice: VoiceConfig) -> Self {
        Self { voice }
    }

    /// Map one input to a command.
    pub fn dispatch(&self, ctx: &DispatchContext<'_>, event: &InputEvent) -> Dispatch {
        match event {
            InputEvent::Pointer { side } => Dispatch::Command(MatchCommand::AddPoint(*side)),
            InputEvent::PointerSubtract { side } => {
                Dispatch::Command(MatchCommand::SubtractPoint(*side))
            }
            InputEvent::Key(key) => self.dispatch_key(ctx, *key),
            InputEvent::Speech { transcript } => self.dispatch_speech(ctx, transcript),
        }
    }

    fn dispatch_key(&self, ctx: &DispatchContext<'_>, key: ArrowKey) -> Dispatch {
        let current = ctx.current;
        if current.completed {
            return Dispatch::Ignored("match already completed");
        }

        let side = visual_side(key, current.sides_swapped);
        if current.first_server.is_none() {
            return Dispatch::Command(MatchCommand::SetFirstServer(side));
        }

        if check_win_condition(current.score1, current.score2, ctx.points_to_win).is_some() {
            return Dispatch::Command(match key {
                ArrowKey::Left => MatchCommand::Undo,
                ArrowKey::Right => MatchCommand::Finalize,
            });
        }

        Dispatch::Command(MatchCommand::AddPoint(side))
    }

    fn dispatch_speech(&self, ctx: &DispatchContext<'_>, transcript: &str) -> Dispatch {
        if !ctx.voice_enabled {
            return Dispatch::Ignored("voice input disabled");
        }
        let text = transcript.trim().to_lowercase();
        if text.is_empty() {
            return Dispatch::Ignored("empty transcript");
        }

        let context = VoiceContext::for_match(ctx.current);
        let commands: &[CommandPhrase] = match context {
            VoiceContext::Setup => &self.voice.setup_commands,
            VoiceContext::Game => &self.voice.game_commands,
        };
        if let Some(hit) = commands
            .iter()
            .find(|command| contains_word(&text, &command.phrase))
        {
            debug!(phrase = %hit.phrase, command = ?hit.command, "voice command recognised");
            return Dispatch::Command(hit.command.into());
        }

        let keywords = KeywordTable::build(&ctx.competitors);
        match context {
            VoiceContext::Game => {
                let lookup = self
                    .voice
                    .point_prefixes
                    .iter()
                    .find_map(|prefix| text.strip_prefix(prefix.as_str()))
                    .map(str::trim)
                    .unwrap_or(&text);
                match keywords.find(lookup) {
                    Some((player_id, side)) => {
                        debug!(player_id, %side, "voice point recognised");
                        Dispatch::Command(MatchCommand::AddPoint(side))
                    }
                    None => {
                        debug!(transcript = %text, "no player matched transcript");
                        Dispatch::Ignored("no player matched")
                    }
                }
            }
            VoiceContext::Setup => match keywords.find(&text) {
                Some((player_id, side)) => {
                    debug!(player_id, %side, "voice first server recognised");
                    Dispatch::Command(MatchCommand::SetFirstServer(side))
                }
                None => Dispatch::Ignored("no player matched"),
            },
        }
    }
}

/// Logical side displayed on the half of the screen the key points to.
fn visual_side(key: ArrowKey, sides_swapped: bool) -> Side {
    let side = match key {
        ArrowKey::Left => Side::One,
        ArrowKey::Right => Side::Two,
    };
    if sides_swapped { side.other() } else { side }
}

/// Unambiguous spoken keywords of the match players, in insertion order.
#[derive(Debug, Default)]
struct KeywordTable {
    entries: IndexMap<String, (PlayerId, Side)>,
}

impl KeywordTable {
    fn build(competitors: &[(Side, &Player)]) -> Self {
        let mut candidates: IndexMap<String, Vec<(PlayerId, Side)>> = IndexMap::new();
        for (side, player) in competitors {
            for term in player_terms(player) {
                let owners = candidates.entry(term).or_default();
                if !owners.iter().any(|(id, _)| *id == player.id) {
                    owners.push((player.id, *side));
                }
            }
        }

        let mut entries = IndexMap::new();
        for (term, owners) in candidates {
            match owners.as_slice() {
                [single] => {
                    if let Entry::Vacant(slot) = entries.entry(term) {
                        slot.insert(*single);
                    }
                }
                _ => {
                    let ids: Vec<PlayerId> = owners.iter().map(|(id, _)| *id).collect();
                    debug!(keyword = %term, players = ?ids, "ambiguous voice keyword dropped");
                }
            }
        }
        Self { entries }
    }

    /// Exact keyword first, then the first keyword found as a whole word.
    fn find(&self, text: &str) -> Option<(PlayerId, Side)> {
        self.entries.get(text).copied().or_else(|| {
            self.entries
                .iter()
                .find(|(keyword, _)| contains_word(text, keyword))
                .map(|(_, hit)| *hit)
        })
    }
}

/// Lowercased name, nickname and significant name parts of a player.
fn player_terms(player: &Player) -> Vec<String> {
    let name = player.name.trim().to_lowercase();
    let mut terms = Vec::new();
    if !name.is_empty() {
        terms.push(name.clone());
    }
    if let Some(nickname) = &player.nickname {
        let nickname = nickname.trim().to_lowercase();
        if !nickname.is_empty() {
            terms.push(nickname);
        }
    }
    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() > 1 {
        terms.extend(
            parts
                .into_iter()
                .filter(|part| part.chars().count() >= MIN_NAME_PART_LEN)
                .map(str::to_owned),
        );
    }
    terms
}

/// True when `word` occurs in `text` delimited by non-alphanumeric characters or the ends.
pub fn contains_word(text: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    text.match_indices(word).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
