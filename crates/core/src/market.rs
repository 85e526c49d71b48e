//! Simulated market shared by every player of a recording.
//!
//! Each commodity has an invisible "fair" price. A player pays the fair price
//! plus their trading fee when buying and receives the fair price minus the
//! fee when selling; every lot traded nudges the fair price by a fixed step.
//! Researching Guilds lowers a player's fee for the rest of the match.

use std::{collections::HashMap, fmt, num::NonZeroU32};

use serde::{Deserialize, Serialize};

use crate::models::{Commodity, Expense, MarketPrices, ObjectId, PlayerId, Resource};

/// Constants of the market heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    /// Fair price of wood when the match starts.
    pub starting_wood: f64,
    /// Fair price of food when the match starts.
    pub starting_food: f64,
    /// Fair price of stone when the match starts.
    pub starting_stone: f64,
    /// Fee applied until the player researches Guilds.
    pub default_fee: f64,
    /// Fee applied after Guilds.
    pub guilds_fee: f64,
    /// Fair price change per lot traded.
    pub step: f64,
    /// Lower bound for both fair and seen prices. The game rules say 20, the
    /// game itself enforces 25.
    pub floor: f64,
    /// Commodity units moved by one trade.
    pub lot_size: f64,
    /// Technology id of Guilds in the catalog.
    pub guilds_technology_id: ObjectId,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            starting_wood: 100.0,
            starting_food: 100.0,
            starting_stone: 130.0,
            default_fee: 0.3,
            guilds_fee: 0.15,
            step: 3.0,
            floor: 25.0,
            lot_size: 100.0,
            guilds_technology_id: 15,
        }
    }
}

/// Direction of a market trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOp {
    /// Pay gold for a lot of the commodity.
    Buy,
    /// Hand over a lot of the commodity for gold.
    Sell,
}

impl fmt::Display for TradeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            TradeOp::Buy => "buy",
            TradeOp::Sell => "sell",
        })
    }
}

/// Fair prices and per-player fees for one recording.
#[derive(Debug, Clone)]
pub struct MarketState {
    settings: MarketSettings,
    prices: MarketPrices,
    fees: HashMap<PlayerId, f64>,
}

impl Default for MarketState {
    fn default() -> Self {
        Self::new(MarketSettings::default())
    }
}

impl MarketState {
    /// Market at the starting prices, every player on the default fee.
    pub fn new(settings: MarketSettings) -> Self {
        let prices = MarketPrices {
            wood: settings.starting_wood,
            food: settings.starting_food,
            stone: settings.starting_stone,
        };
        Self {
            settings,
            prices,
            fees: HashMap::new(),
        }
    }

    /// Constants this market runs with.
    pub fn settings(&self) -> &MarketSettings {
        &self.settings
    }

    /// Current fair prices of all commodities.
    pub fn prices(&self) -> MarketPrices {
        self.prices
    }

    /// Current fair price of `commodity`.
    pub fn fair_price(&self, commodity: Commodity) -> f64 {
        self.prices.get(commodity)
    }

    /// Fee rate for `player`, falling back to the default without recording
    /// an entry for the player.
    pub fn fee(&self, player: PlayerId) -> f64 {
        self.fees
            .get(&player)
            .copied()
            .unwrap_or(self.settings.default_fee)
    }

    /// Override the fee rate of `player`.
    pub fn set_fee(&mut self, player: PlayerId, fee: f64) {
        self.fees.insert(player, fee);
    }

    /// Switch `player` to the post-Guilds fee.
    pub fn apply_guilds(&mut self, player: PlayerId) {
        let fee = self.settings.guilds_fee;
        self.set_fee(player, fee);
    }

    /// Execute `units` lots of a trade for `player` and return what the
    /// player paid.
    ///
    /// A batch behaves exactly like the same number of single trades: the
    /// price moves after every lot.
    pub fn quote_and_apply(
        &mut self,
        op: TradeOp,
        commodity: Commodity,
        units: NonZeroU32,
        player: PlayerId,
    ) -> Expense {
        (0..units.get())
            .map(|_| self.trade_lot(op, commodity, player))
            .sum()
    }

    fn trade_lot(&mut self, op: TradeOp, commodity: Commodity, player: PlayerId) -> Expense {
        let fee = self.fee(player);
        let step = self.settings.step;
        let floor = self.settings.floor;
        let fair = self.prices.get_mut(commodity);

        let seen_price = match op {
            TradeOp::Buy => {
                let seen = *fair * (1.0 + fee);
                *fair += step;
                seen
            }
            TradeOp::Sell => {
                let seen = *fair * (1.0 - fee);
                *fair -= step;
                seen
            }
        }
        .max(floor);
        *fair = fair.max(floor);

        match op {
            TradeOp::Buy => Expense::of(Resource::Gold, seen_price),
            TradeOp::Sell => Expense::of(commodity.resource(), self.settings.lot_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn units(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).expect("non-zero")
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn single_buy_charges_fee_and_raises_price() {
        let mut market = MarketState::default();
        let expense = market.quote_and_apply(TradeOp::Buy, Commodity::Wood, units(1), 1);

        assert_close(expense.gold, 130.0);
        assert_eq!(expense.wood, 0.0);
        assert_eq!(expense.food, 0.0);
        assert_eq!(expense.stone, 0.0);
        assert_close(market.fair_price(Commodity::Wood), 103.0);
    }

    #[test]
    fn batch_buy_accumulates_drift() {
        let mut market = MarketState::default();
        let expense = market.quote_and_apply(TradeOp::Buy, Commodity::Wood, units(5), 1);

        // Fair price 100, 103, 106, 109, 112, each plus the 30% fee.
        assert_close(expense.gold, 130.0 + 133.9 + 137.8 + 141.7 + 145.6);
        assert_close(expense.gold, 689.0);
        assert_close(market.fair_price(Commodity::Wood), 115.0);
    }

    #[test]
    fn each_lot_is_priced_after_the_previous_one() {
        let mut market = MarketState::default();
        let lots: Vec<f64> = (0..5)
            .map(|_| {
                market
                    .quote_and_apply(TradeOp::Buy, Commodity::Wood, units(1), 1)
                    .gold
            })
            .collect();
        for (lot, expected) in lots.iter().zip([130.0, 133.9, 137.8, 141.7, 145.6]) {
            assert_close(*lot, expected);
        }
    }

    #[test]
    fn batch_equals_sum_of_single_trades() {
        for op in [TradeOp::Buy, TradeOp::Sell] {
            let mut batched = MarketState::default();
            let mut single = MarketState::default();

            let batch = batched.quote_and_apply(op, Commodity::Stone, units(7), 3);
            let manual: Expense = (0..7)
                .map(|_| single.quote_and_apply(op, Commodity::Stone, units(1), 3))
                .sum();

            assert_close(batch.gold, manual.gold);
            assert_close(batch.stone, manual.stone);
            assert_eq!(batched.prices(), single.prices());
        }
    }

    #[test]
    fn sell_books_the_lot_not_the_gold() {
        let mut market = MarketState::default();
        let expense = market.quote_and_apply(TradeOp::Sell, Commodity::Food, units(2), 4);

        assert_eq!(expense, Expense::new(0.0, 200.0, 0.0, 0.0));
        assert_close(market.fair_price(Commodity::Food), 94.0);
        assert_close(market.fair_price(Commodity::Wood), 100.0);
    }

    #[test]
    fn prices_drift_independently_of_player() {
        let mut market = MarketState::default();
        market.apply_guilds(2);
        market.quote_and_apply(TradeOp::Buy, Commodity::Stone, units(1), 1);
        market.quote_and_apply(TradeOp::Buy, Commodity::Stone, units(1), 2);
        assert_close(market.fair_price(Commodity::Stone), 136.0);
        market.quote_and_apply(TradeOp::Sell, Commodity::Stone, units(1), 5);
        assert_close(market.fair_price(Commodity::Stone), 133.0);
    }

    #[test]
    fn fair_and_seen_prices_are_floored() {
        let mut market = MarketState::default();
        let expense = market.quote_and_apply(TradeOp::Sell, Commodity::Wood, units(40), 1);
        assert_close(market.fair_price(Commodity::Wood), 25.0);
        assert_close(expense.wood, 4000.0);

        // Fair price stays on the floor once there.
        market.quote_and_apply(TradeOp::Sell, Commodity::Wood, units(3), 1);
        assert_close(market.fair_price(Commodity::Wood), 25.0);

        let mut cheap = MarketState::new(MarketSettings {
            starting_food: 10.0,
            ..MarketSettings::default()
        });
        let expense = cheap.quote_and_apply(TradeOp::Buy, Commodity::Food, units(1), 1);
        assert_close(expense.gold, 25.0);
        assert_close(cheap.fair_price(Commodity::Food), 25.0);
    }

    #[test]
    fn guilds_fee_is_per_player() {
        let mut market = MarketState::default();
        assert_close(market.fee(2), 0.3);

        market.apply_guilds(2);
        assert_close(market.fee(2), 0.15);
        assert_close(market.fee(1), 0.3);

        let expense = market.quote_and_apply(TradeOp::Buy, Commodity::Stone, units(1), 2);
        assert_close(expense.gold, 149.5);
    }

    #[test]
    fn fee_lookup_does_not_register_players() {
        let market = MarketState::default();
        let _ = market.fee(7);
        assert!(market.fees.is_empty());
    }
}
