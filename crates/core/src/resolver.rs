//! Turns decoded actions into the resources they cost.

use std::{num::NonZeroU32, sync::Arc};

use serde_json::Value;

use crate::{
    catalog::{CatalogEntry, CatalogGroup, GameCatalog},
    diagnostics::{DiagnosticSink, Severity, TracingSink},
    error::ResolveError,
    market::{MarketState, TradeOp},
    models::{Commodity, Expense, ObjectId, PlayerId, Resource},
    operation::{Action, ActionKind, Trade},
};

/// Economic meaning of one action.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Catalog id of the built/trained/researched object, 0 for trades.
    pub object_id: ObjectId,
    /// Resources paid.
    pub expense: Expense,
    /// Catalog display name, or `buy <commodity>` / `sell <commodity>`.
    pub display_name: String,
}

/// Resolves actions against the catalog and owns the market of one run.
pub struct ActionResolver<S = TracingSink> {
    catalog: Arc<GameCatalog>,
    market: MarketState,
    sink: S,
}

impl<S: DiagnosticSink> ActionResolver<S> {
    /// Resolver over `catalog`, trading on `market` and reporting to `sink`.
    pub fn new(catalog: Arc<GameCatalog>, market: MarketState, sink: S) -> Self {
        Self {
            catalog,
            market,
            sink,
        }
    }

    /// Market as left by the actions resolved so far.
    pub fn market(&self) -> &MarketState {
        &self.market
    }

    /// Diagnostic sink of this run.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Resolve `action`, performed at `now` ms into the match.
    ///
    /// Returns `Ok(None)` for actions that cost nothing: ignored kinds and
    /// kinds this resolver does not know.
    pub fn resolve(
        &mut self,
        action: &Action,
        now: u64,
    ) -> Result<Option<Resolution>, ResolveError> {
        let resolution = match action {
            Action::Build {
                player_id,
                building_id,
            } => {
                let entry = lookup(
                    &self.catalog,
                    ActionKind::Build,
                    *player_id,
                    CatalogGroup::UnitsBuildings,
                    *building_id,
                )?;
                from_entry(*building_id, entry, 1)
            }
            Action::Queue {
                player_id,
                unit_id,
                amount,
            }
            | Action::DeQueue {
                player_id,
                unit_id,
                amount,
            } => {
                let kind = if matches!(action, Action::Queue { .. }) {
                    ActionKind::Queue
                } else {
                    ActionKind::DeQueue
                };
                let entry = lookup(
                    &self.catalog,
                    kind,
                    *player_id,
                    CatalogGroup::UnitsBuildings,
                    *unit_id,
                )?;
                from_entry(*unit_id, entry, amount.unwrap_or(1))
            }
            Action::Research {
                player_id,
                technology_id,
            } => {
                let entry = lookup(
                    &self.catalog,
                    ActionKind::Research,
                    *player_id,
                    CatalogGroup::Techs,
                    *technology_id,
                )?;
                let resolution = from_entry(*technology_id, entry, 1);
                if *technology_id == self.market.settings().guilds_technology_id {
                    self.market.apply_guilds(*player_id);
                    self.sink.emit(
                        Severity::Info,
                        format_args!(
                            "player {player_id} researched Guilds at {now} ms, fee set to {}",
                            self.market.fee(*player_id)
                        ),
                    );
                }
                resolution
            }
            Action::Buy(trade) => self.trade(TradeOp::Buy, ActionKind::Buy, trade)?,
            Action::Sell(trade) => self.trade(TradeOp::Sell, ActionKind::Sell, trade)?,
            Action::Create { payload } | Action::Tribute { payload } => {
                let kind = action.kind().unwrap_or(ActionKind::Create);
                return Err(ResolveError::Unsupported {
                    kind,
                    player_id: action.player_id(),
                    payload: Value::Object(payload.clone()),
                });
            }
            Action::Ignored { .. } => return Ok(None),
            Action::Unhandled { kind, payload } => {
                self.sink.emit(
                    Severity::Debug,
                    format_args!("unhandled action {kind} at {now} ms: {payload:?}"),
                );
                return Ok(None);
            }
        };
        Ok(Some(resolution))
    }

    fn trade(
        &mut self,
        op: TradeOp,
        kind: ActionKind,
        trade: &Trade,
    ) -> Result<Resolution, ResolveError> {
        let commodity = Resource::from_id(trade.resource_id)
            .and_then(|resource| Commodity::try_from(resource).ok())
            .ok_or(ResolveError::NonTradable {
                kind,
                player_id: trade.player_id,
                resource_id: trade.resource_id,
            })?;
        // A zero amount still clicks the button once.
        if trade.amount == Some(0) {
            self.sink.emit(
                Severity::Warn,
                format_args!(
                    "player {} traded a zero amount, counting it as one lot",
                    trade.player_id
                ),
            );
        }
        let units = trade
            .amount
            .and_then(NonZeroU32::new)
            .unwrap_or(NonZeroU32::MIN);
        if units.get() > 1 {
            self.sink.emit(
                Severity::Debug,
                format_args!("bulk ({units}) market operation by player {}", trade.player_id),
            );
        }

        let expense = self
            .market
            .quote_and_apply(op, commodity, units, trade.player_id);
        self.sink.emit(
            Severity::Debug,
            format_args!(
                "market op, player {:2} {op:4} {commodity:5} x{units}: {expense}",
                trade.player_id
            ),
        );

        Ok(Resolution {
            object_id: 0,
            expense,
            display_name: format!("{op} {commodity}"),
        })
    }
}

fn lookup<'a>(
    catalog: &'a GameCatalog,
    kind: ActionKind,
    player_id: PlayerId,
    group: CatalogGroup,
    id: ObjectId,
) -> Result<&'a CatalogEntry, ResolveError> {
    catalog
        .get(group, id)
        .map_err(|source| ResolveError::UnknownObject {
            kind,
            player_id,
            source,
        })
}

fn from_entry(object_id: ObjectId, entry: &CatalogEntry, amount: u32) -> Resolution {
    Resolution {
        object_id,
        expense: entry.cost.to_expense(amount),
        display_name: entry.display_name().to_string(),
    }
}
