//! Column auction: sealed bids on card columns, meeples climbing the winners'
//! columns, colour-match and rank scoring.

pub mod bids;
pub mod board;
pub mod cards;
pub mod driver;
pub mod plugin;
pub mod rules;
pub mod scenario;
pub mod scoring;
pub mod session;
pub mod strategy;
pub mod turn;
pub mod types;
