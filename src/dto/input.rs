//! DTO definitions for scoring input.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{matches::MatchView, validation::validate_transcript},
    services::input_dispatcher::{ArrowKey, InputEvent, MatchCommand},
    state::model::Side,
};

/// Raw input event sent by a scoring device, over HTTP or `/ws/input`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEventDto {
    /// Tap on a side's score.
    Pointer {
        #[schema(value_type = u8)]
        side: Side,
    },
    /// Correction gesture removing a point.
    PointerSubtract {
        #[schema(value_type = u8)]
        side: Side,
    },
    /// Arrow key (`left` or `right`).
    Key {
        #[schema(value_type = String)]
        key: ArrowKey,
    },
    /// Final speech recognition transcript.
    Speech { transcript: String },
}

impl Validate for InputEventDto {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let InputEventDto::Speech { transcript } = self
            && let Err(err) = validate_transcript(transcript)
        {
            errors.add("transcript", err);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<InputEventDto> for InputEvent {
    fn from(dto: InputEventDto) -> Self {
        match dto {
            InputEventDto::Pointer { side } => InputEvent::Pointer { side },
            InputEventDto::PointerSubtract { side } => InputEvent::PointerSubtract { side },
            InputEventDto::Key { key } => InputEvent::Key(key),
            InputEventDto::Speech { transcript } => InputEvent::Speech { transcript },
        }
    }
}

/// Outcome of one input event.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InputResponse {
    /// `applied` or `ignored`.
    pub outcome: String,
    /// Command the input was translated to.
    #[schema(value_type = Option<Object>)]
    pub command: Option<MatchCommand>,
    /// Why an input was ignored.
    pub reason: Option<String>,
    /// Match state after the command.
    #[serde(rename = "match")]
    pub current: Option<MatchView>,
}

impl InputResponse {
    pub fn applied(command: MatchCommand, current: Option<MatchView>) -> Self {
        Self {
            outcome: "applied".into(),
            command: Some(command),
            reason: None,
            current,
        }
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        Self {
            outcome: "ignored".into(),
            command: None,
            reason: Some(reason.into()),
            current: None,
        }
    }
}

/// Error reply sent over `/ws/input` when an event is rejected.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InputError {
    pub outcome: String,
    pub message: String,
}

impl InputError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            outcome: "error".into(),
            message: message.into(),
        }
    }
}
