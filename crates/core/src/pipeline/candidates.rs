use crate::domain::etf::{CandidateWindow, Etf, ScorePair};
use crate::storage::EtfCatalog;
use crate::CoreError;

pub const CHANGE_RATE_WINDOW: i32 = 30;
pub const RISK_LEVEL_WINDOW: i32 = 3;
pub const MAX_CANDIDATES: usize = 10;

pub fn window_for(scores: &ScorePair) -> CandidateWindow {
    CandidateWindow {
        change_rate_min: scores.volatility_score.saturating_sub(CHANGE_RATE_WINDOW),
        change_rate_max: scores.volatility_score.saturating_add(CHANGE_RATE_WINDOW),
        risk_level_min: scores.risk_score.saturating_sub(RISK_LEVEL_WINDOW),
        risk_level_max: scores.risk_score.saturating_add(RISK_LEVEL_WINDOW),
    }
}

/// Up to [`MAX_CANDIDATES`] catalog entries near the scores. An empty result is not an error.
pub async fn select_candidates(
    catalog: &dyn EtfCatalog,
    scores: &ScorePair,
) -> Result<Vec<Etf>, CoreError> {
    let window = window_for(scores);
    let candidates = catalog.find_in_window(&window, MAX_CANDIDATES).await?;
    tracing::info!(
        count = candidates.len(),
        change_rate_min = window.change_rate_min,
        change_rate_max = window.change_rate_max,
        risk_level_min = window.risk_level_min,
        risk_level_max = window.risk_level_max,
        "candidates selected"
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{etf, InMemoryStore};

    #[tokio::test]
    async fn either_window_qualifies() {
        let store = InMemoryStore::with_etfs(vec![
            etf(1, "change-match", 70, 0),
            etf(2, "risk-match", -500, 7),
            etf(3, "neither", 200, 9),
        ]);
        let scores = ScorePair {
            volatility_score: 50,
            risk_score: 5,
        };

        let ids: Vec<i64> = select_candidates(&store, &scores)
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn bounds_are_inclusive_and_result_is_capped() {
        let etfs = (1..=15).map(|id| etf(id, &format!("ETF {id}"), 20, 9)).collect();
        let store = InMemoryStore::with_etfs(etfs);
        let scores = ScorePair {
            volatility_score: -10,
            risk_score: 0,
        };
        assert_eq!(select_candidates(&store, &scores).await.unwrap().len(), MAX_CANDIDATES);
    }

    #[tokio::test]
    async fn no_match_is_empty_not_error() {
        let store = InMemoryStore::with_etfs(vec![etf(1, "far", 900, 9)]);
        let scores = ScorePair {
            volatility_score: -9000,
            risk_score: 0,
        };
        assert!(select_candidates(&store, &scores).await.unwrap().is_empty());
    }

    #[test]
    fn window_saturates_at_extremes() {
        let w = window_for(&ScorePair {
            volatility_score: i32::MAX,
            risk_score: 0,
        });
        assert_eq!(w.change_rate_max, i32::MAX);
        assert_eq!(w.risk_level_min, -3);
    }
}
