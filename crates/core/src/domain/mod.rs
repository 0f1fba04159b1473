pub mod audit;
pub mod contract;
pub mod etf;
pub mod news;
pub mod portfolio;
pub mod rebalancing;
pub mod recommendation;
