//! Typed operation records handed over by the recording decoder.
//!
//! The decoder emits one JSON object per operation. Action payloads are
//! validated into [`Action`] as they are read, so the resolver only ever
//! sees strongly-typed fields.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{ObjectId, PlayerId};

/// Every action kind the pipeline knows about, by its recording name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Place a building foundation.
    Build,
    /// Train units at a building.
    Queue,
    /// Definitive Edition batch training.
    DeQueue,
    /// Research a technology or age.
    Research,
    /// Buy a lot at the market.
    Buy,
    /// Sell a lot at the market.
    Sell,
    /// Scenario-editor object creation.
    Create,
    /// Send resources to another player.
    Tribute,
    /// Order issued by an AI script.
    AiOrder,
    /// Attack a ground position.
    AttackGround,
    /// Release garrisoned villagers.
    BackToWork,
    /// Delete an own object.
    Delete,
    /// Attack-move command.
    DeAttackMove,
    /// Automatic scouting.
    DeAutoscout,
    /// Undocumented Definitive Edition command 196.
    DeUnknown196,
    /// Undocumented Definitive Edition command 39.
    DeUnknown39,
    /// Undocumented Definitive Edition command 41.
    DeUnknown41,
    /// Map flare.
    Flare,
    /// Change group formation.
    Formation,
    /// Game-level command such as speed or pause.
    Game,
    /// Lock or unlock a gate.
    Gate,
    /// Set a rally point.
    GatherPoint,
    /// Guard a unit.
    Guard,
    /// Move units.
    Move,
    /// Generic right-click order.
    Order,
    /// Patrol between points.
    Patrol,
    /// Repair a building or ship.
    Repair,
    /// Resign from the match.
    Resign,
    /// Unit special ability.
    Special,
    /// Change unit stance.
    Stance,
    /// Stop units.
    Stop,
    /// Ring the town bell.
    TownBell,
    /// Ungarrison units.
    Ungarrison,
    /// Place a line of wall.
    Wall,
    /// Assign villagers to a task.
    Work,
    /// Queue production without a batch.
    Make,
}

impl ActionKind {
    /// Every known kind.
    pub const ALL: [ActionKind; 36] = [
        ActionKind::Build,
        ActionKind::Queue,
        ActionKind::DeQueue,
        ActionKind::Research,
        ActionKind::Buy,
        ActionKind::Sell,
        ActionKind::Create,
        ActionKind::Tribute,
        ActionKind::AiOrder,
        ActionKind::AttackGround,
        ActionKind::BackToWork,
        ActionKind::Delete,
        ActionKind::DeAttackMove,
        ActionKind::DeAutoscout,
        ActionKind::DeUnknown196,
        ActionKind::DeUnknown39,
        ActionKind::DeUnknown41,
        ActionKind::Flare,
        ActionKind::Formation,
        ActionKind::Game,
        ActionKind::Gate,
        ActionKind::GatherPoint,
        ActionKind::Guard,
        ActionKind::Move,
        ActionKind::Order,
        ActionKind::Patrol,
        ActionKind::Repair,
        ActionKind::Resign,
        ActionKind::Special,
        ActionKind::Stance,
        ActionKind::Stop,
        ActionKind::TownBell,
        ActionKind::Ungarrison,
        ActionKind::Wall,
        ActionKind::Work,
        ActionKind::Make,
    ];

    /// Name used in recordings and the TSV cache.
    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Build => "BUILD",
            ActionKind::Queue => "QUEUE",
            ActionKind::DeQueue => "DE_QUEUE",
            ActionKind::Research => "RESEARCH",
            ActionKind::Buy => "BUY",
            ActionKind::Sell => "SELL",
            ActionKind::Create => "CREATE",
            ActionKind::Tribute => "TRIBUTE",
            ActionKind::AiOrder => "AI_ORDER",
            ActionKind::AttackGround => "ATTACK_GROUND",
            ActionKind::BackToWork => "BACK_TO_WORK",
            ActionKind::Delete => "DELETE",
            ActionKind::DeAttackMove => "DE_ATTACK_MOVE",
            ActionKind::DeAutoscout => "DE_AUTOSCOUT",
            ActionKind::DeUnknown196 => "DE_UNKNOWN_196",
            ActionKind::DeUnknown39 => "DE_UNKNOWN_39",
            ActionKind::DeUnknown41 => "DE_UNKNOWN_41",
            ActionKind::Flare => "FLARE",
            ActionKind::Formation => "FORMATION",
            ActionKind::Game => "GAME",
            ActionKind::Gate => "GATE",
            ActionKind::GatherPoint => "GATHER_POINT",
            ActionKind::Guard => "GUARD",
            ActionKind::Move => "MOVE",
            ActionKind::Order => "ORDER",
            ActionKind::Patrol => "PATROL",
            ActionKind::Repair => "REPAIR",
            ActionKind::Resign => "RESIGN",
            ActionKind::Special => "SPECIAL",
            ActionKind::Stance => "STANCE",
            ActionKind::Stop => "STOP",
            ActionKind::TownBell => "TOWN_BELL",
            ActionKind::Ungarrison => "UNGARRISON",
            ActionKind::Wall => "WALL",
            ActionKind::Work => "WORK",
            ActionKind::Make => "MAKE",
        }
    }

    /// Kind with recording name `name`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Kinds that never carry an expense and are dropped silently.
    pub fn is_ignored(self) -> bool {
        !matches!(
            self,
            ActionKind::Build
                | ActionKind::Queue
                | ActionKind::DeQueue
                | ActionKind::Research
                | ActionKind::Buy
                | ActionKind::Sell
                | ActionKind::Create
                | ActionKind::Tribute
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Market trade payload shared by buy and sell actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Trading player.
    pub player_id: PlayerId,
    /// Recording resource id (`0=wood, 1=food, 2=stone, 3=gold`).
    pub resource_id: u8,
    /// Lots traded; shift-click trades carry 5.
    #[serde(default)]
    pub amount: Option<u32>,
}

/// A decoded player action.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Building placement.
    Build {
        /// Building player.
        player_id: PlayerId,
        /// Catalog id of the building.
        building_id: ObjectId,
    },
    /// Unit training.
    Queue {
        /// Training player.
        player_id: PlayerId,
        /// Catalog id of the unit.
        unit_id: ObjectId,
        /// Units queued, one when absent.
        amount: Option<u32>,
    },
    /// Batch queue variant introduced by the Definitive Edition.
    DeQueue {
        /// Training player.
        player_id: PlayerId,
        /// Catalog id of the unit.
        unit_id: ObjectId,
        /// Units queued, one when absent.
        amount: Option<u32>,
    },
    /// Technology or age research.
    Research {
        /// Researching player.
        player_id: PlayerId,
        /// Catalog id of the technology.
        technology_id: ObjectId,
    },
    /// Market purchase.
    Buy(Trade),
    /// Market sale.
    Sell(Trade),
    /// Object creation, not supported.
    Create {
        /// Raw action fields.
        payload: Map<String, Value>,
    },
    /// Resource tribute, not supported.
    Tribute {
        /// Raw action fields.
        payload: Map<String, Value>,
    },
    /// Known kind without economic meaning.
    Ignored {
        /// Kind of the action.
        kind: ActionKind,
        /// Acting player, when the payload names one.
        player_id: Option<PlayerId>,
    },
    /// Kind this pipeline has never heard of.
    Unhandled {
        /// Recording name of the kind.
        kind: String,
        /// Raw action fields.
        payload: Map<String, Value>,
    },
}

impl Action {
    /// Known kind of the action, `None` for unhandled kinds.
    pub fn kind(&self) -> Option<ActionKind> {
        Some(match self {
            Action::Build { .. } => ActionKind::Build,
            Action::Queue { .. } => ActionKind::Queue,
            Action::DeQueue { .. } => ActionKind::DeQueue,
            Action::Research { .. } => ActionKind::Research,
            Action::Buy(_) => ActionKind::Buy,
            Action::Sell(_) => ActionKind::Sell,
            Action::Create { .. } => ActionKind::Create,
            Action::Tribute { .. } => ActionKind::Tribute,
            Action::Ignored { kind, .. } => *kind,
            Action::Unhandled { .. } => return None,
        })
    }

    /// Recording name of the action kind.
    pub fn kind_name(&self) -> &str {
        match self {
            Action::Unhandled { kind, .. } => kind,
            other => other.kind().map(ActionKind::name).unwrap_or_default(),
        }
    }

    /// Acting player, when known.
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Action::Build { player_id, .. }
            | Action::Queue { player_id, .. }
            | Action::DeQueue { player_id, .. }
            | Action::Research { player_id, .. } => Some(*player_id),
            Action::Buy(trade) | Action::Sell(trade) => Some(trade.player_id),
            Action::Ignored { player_id, .. } => *player_id,
            Action::Create { payload }
            | Action::Tribute { payload }
            | Action::Unhandled { payload, .. } => player_id_field(payload),
        }
    }
}

fn player_id_field(fields: &Map<String, Value>) -> Option<PlayerId> {
    fields
        .get("player_id")
        .and_then(Value::as_u64)
        .and_then(|value| PlayerId::try_from(value).ok())
}

/// Payload of an action whose kind name is known but whose fields are not
/// what that kind requires.
#[derive(Debug, thiserror::Error)]
#[error("invalid {kind} payload: {source}")]
pub struct PayloadError {
    kind: ActionKind,
    #[source]
    source: serde_json::Error,
}

#[derive(Debug, Deserialize)]
struct RawAction {
    kind: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct BuildPayload {
    player_id: PlayerId,
    building_id: ObjectId,
}

#[derive(Debug, Deserialize)]
struct QueuePayload {
    player_id: PlayerId,
    unit_id: ObjectId,
    #[serde(default)]
    amount: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResearchPayload {
    player_id: PlayerId,
    technology_id: ObjectId,
}

impl TryFrom<RawAction> for Action {
    type Error = PayloadError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        let RawAction { kind, fields } = raw;
        let Some(known) = ActionKind::from_name(&kind) else {
            return Ok(Action::Unhandled {
                kind,
                payload: fields,
            });
        };

        let parse_err = |source| PayloadError {
            kind: known,
            source,
        };
        let action = match known {
            ActionKind::Build => {
                let payload: BuildPayload =
                    serde_json::from_value(Value::Object(fields)).map_err(parse_err)?;
                Action::Build {
                    player_id: payload.player_id,
                    building_id: payload.building_id,
                }
            }
            ActionKind::Queue | ActionKind::DeQueue => {
                let payload: QueuePayload =
                    serde_json::from_value(Value::Object(fields)).map_err(parse_err)?;
                if known == ActionKind::Queue {
                    Action::Queue {
                        player_id: payload.player_id,
                        unit_id: payload.unit_id,
                        amount: payload.amount,
                    }
                } else {
                    Action::DeQueue {
                        player_id: payload.player_id,
                        unit_id: payload.unit_id,
                        amount: payload.amount,
                    }
                }
            }
            ActionKind::Research => {
                let payload: ResearchPayload =
                    serde_json::from_value(Value::Object(fields)).map_err(parse_err)?;
                Action::Research {
                    player_id: payload.player_id,
                    technology_id: payload.technology_id,
                }
            }
            ActionKind::Buy => {
                Action::Buy(serde_json::from_value(Value::Object(fields)).map_err(parse_err)?)
            }
            ActionKind::Sell => {
                Action::Sell(serde_json::from_value(Value::Object(fields)).map_err(parse_err)?)
            }
            ActionKind::Create => Action::Create { payload: fields },
            ActionKind::Tribute => Action::Tribute { payload: fields },
            ignored => Action::Ignored {
                kind: ignored,
                player_id: player_id_field(&fields),
            },
        };
        Ok(action)
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawAction::deserialize(deserializer)?;
        Action::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// One element of the decoded operation stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Advances the match clock.
    Sync {
        /// Milliseconds since the previous sync.
        elapsed_ms: u64,
        /// Decoder bookkeeping, unused.
        #[serde(default)]
        dropped: Value,
    },
    /// A player action.
    Action(Action),
    /// Chat, view locks, saves and anything else without economic meaning.
    #[serde(other)]
    Other,
}

impl Operation {
    /// Sync advancing the clock by `elapsed_ms`.
    pub fn sync(elapsed_ms: u64) -> Self {
        Operation::Sync {
            elapsed_ms,
            dropped: Value::Null,
        }
    }
}
