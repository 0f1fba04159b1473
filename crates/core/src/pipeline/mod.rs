//! The judge-driven workflows: scoring, candidate selection, recommendation, news collection and
//! analysis, rebalancing, notification, and the tutor. Catalog maintenance lives here too.

pub mod alert;
pub mod analyzer;
pub mod candidates;
pub mod catalog;
pub mod collector;
pub mod notify;
pub mod rebalancing;
pub mod recommend;
pub mod scoring;
pub mod tutor;

pub use alert::{AlertOutcome, AlertService, NotificationStatus};
pub use analyzer::NewsAnalyzer;
pub use catalog::CatalogManager;
pub use collector::NewsCollector;
pub use notify::NotificationDispatcher;
pub use rebalancing::{RebalancingOrchestrator, RebalancingOutcome};
pub use recommend::{RecommendationEngine, RecommendationPipeline};
pub use tutor::{Tutor, TutorAnswer, TutorTemplate};
