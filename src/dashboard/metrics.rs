//! Aggregate statistics over the current trade list.

use crate::backend::models::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedMetrics {
    /// Sum of realized P&L; open trades count as 0
    pub total_pnl: f64,
    pub trade_count: usize,
}

impl DerivedMetrics {
    pub fn from_trades(trades: &[Trade]) -> Self {
        Self {
            total_pnl: total_pnl(trades),
            trade_count: trade_count(trades),
        }
    }

    pub fn is_profitable(&self) -> bool {
        self.total_pnl >= 0.0
    }
}

pub fn total_pnl(trades: &[Trade]) -> f64 {
    trades.iter().map(|t| t.pnl.unwrap_or(0.0)).sum()
}

pub fn trade_count(trades: &[Trade]) -> usize {
    trades.len()
}
