use crate::domain::etf::{Etf, QaItem};
use crate::domain::recommendation::{RecommendationResult, PORTFOLIO_SIZE};
use crate::error::BoxError;
use crate::llm::json::parse_recommendation;
use crate::llm::TextJudge;
use crate::pipeline::candidates::select_candidates;
use crate::pipeline::scoring::{extract_scores, format_survey};
use crate::storage::EtfCatalog;
use crate::CoreError;
use serde_json::{json, Value};
use std::sync::Arc;

pub const MAX_ATTEMPTS: u32 = 10;

const SCHEMA: &str = r#"{
  "investmentProfile": "STRING",
  "etfRiskScore": 0,
  "dividendScore": 0,
  "expectedTotalReturn": 0,
  "portfolioWeights": [0,0,0,0,0],
  "etfs": [
    {"id":0,"name":"","fltRt":0,"riskLevel":0,"category":"","description":""}
  ],
  "reasonSummary": "LINE1\nLINE2\nLINE3"
}"#;

fn candidate_json(candidates: &[Etf]) -> String {
    let list: Vec<Value> = candidates
        .iter()
        .map(|e| {
            let holdings: Vec<&str> = e
                .top_constituents(5)
                .into_iter()
                .map(|c| c.name.as_str())
                .collect();
            json!({
                "id": e.id,
                "name": e.name,
                "fltRt": e.change_rate,
                "riskLevel": e.risk_level,
                "category": e.category,
                "description": e.description,
                "topHoldings": holdings,
            })
        })
        .collect();
    Value::Array(list).to_string()
}

pub fn recommendation_prompt(qa: &[QaItem], candidates: &[Etf]) -> String {
    format!(
        "You are an investment recommendation engine.\n\
Using the [survey answers] and the [candidate ETFs] below, recommend exactly 5 ETFs chosen only from the candidates.\n\n\
Output rules (critical):\n\
1) Output JSON only. No explanations, sentences, code blocks, markdown or text outside the JSON.\n\
2) Field names must be EXACTLY those of the schema below.\n\
3) Numeric fields are integers only (no decimals).\n\
4) etfs has exactly 5 entries, each copied from the candidate list (never invent one).\n\
5) portfolioWeights is a list of exactly 5 integers summing to exactly 100, in the same order as etfs.\n\
6) reasonSummary is exactly 3 lines (two line breaks).\n\n\
JSON schema (use this shape verbatim):\n{SCHEMA}\n\n\
Scoring guide:\n\
- etfRiskScore (0-100): higher for investors with more risk tolerance, lower for conservative ones.\n\
- dividendScore (0-100): higher the stronger the preference for dividends and cash flow.\n\
- expectedTotalReturn: an estimated total return as an integer (e.g. 8). Do not exaggerate.\n\n\
[survey answers]\n{}\n\
[candidate ETFs (JSON)]\n{}\n\n\
Additional constraints:\n\
- the 5 ETFs must be distinct.\n\
- diversify, but prioritise the themes and goals the investor chose.\n\
- ground the reasons in the candidates' descriptions; no promotional wording.\n",
        format_survey(qa),
        candidate_json(candidates)
    )
}

/// Wraps a previous malformed reply; the original question is not repeated.
pub fn repair_prompt(previous_output: &str) -> String {
    format!(
        "You are a JSON format repairer.\n\
Convert the input text below into the JSON schema given here.\n\
Output JSON only: no explanations, sentences, comments, code blocks or markdown.\n\n\
Schema:\n{SCHEMA}\n\n\
Rules:\n\
- integers only\n\
- portfolioWeights has exactly 5 entries summing to 100\n\
- etfs has exactly 5 distinct entries taken from the input\n\
- reasonSummary has exactly 3 lines\n\
- no fields outside the schema\n\n\
Input text:\n{previous_output}"
    )
}

/// Asks the judge for a five-ETF portfolio, repairing malformed replies a bounded number of times.
pub struct RecommendationEngine {
    judge: Arc<dyn TextJudge>,
    max_attempts: u32,
}

impl RecommendationEngine {
    pub fn new(judge: Arc<dyn TextJudge>) -> Self {
        Self {
            judge,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn recommend(
        &self,
        qa: &[QaItem],
        candidates: &[Etf],
    ) -> Result<RecommendationResult, CoreError> {
        if candidates.len() < PORTFOLIO_SIZE {
            return Err(CoreError::InsufficientCandidates {
                required: PORTFOLIO_SIZE,
                available: candidates.len(),
            });
        }

        let mut prompt = recommendation_prompt(qa, candidates);
        let mut last_error: Option<anyhow::Error> = None;
        let mut last_raw: Option<String> = None;

        for attempt in 1..=self.max_attempts {
            let raw = self.judge.submit(&prompt).await?;
            match parse_recommendation(&raw, candidates) {
                Ok(result) => {
                    tracing::info!(
                        attempt,
                        provider = ?self.judge.provider(),
                        model = self.judge.model(),
                        "recommendation accepted"
                    );
                    return Ok(result);
                }
                Err(err) => {
                    tracing::warn!(attempt, max_attempts = self.max_attempts, error = %err, "recommendation output rejected");
                    prompt = repair_prompt(&raw);
                    last_error = Some(err);
                    last_raw = Some(raw);
                }
            }
        }

        let source: BoxError = match last_error {
            Some(err) => err.into(),
            None => "no attempts were made".into(),
        };
        Err(CoreError::RecommendationFailed {
            attempts: self.max_attempts,
            raw_output: last_raw,
            source,
        })
    }
}

/// survey -> scores -> candidates -> recommendation.
pub struct RecommendationPipeline {
    scoring_judge: Arc<dyn TextJudge>,
    catalog: Arc<dyn EtfCatalog>,
    engine: RecommendationEngine,
}

impl RecommendationPipeline {
    pub fn new(judge: Arc<dyn TextJudge>, catalog: Arc<dyn EtfCatalog>) -> Self {
        Self {
            scoring_judge: judge.clone(),
            catalog,
            engine: RecommendationEngine::new(judge),
        }
    }

    pub async fn run(&self, qa: &[QaItem]) -> Result<RecommendationResult, CoreError> {
        let scores = extract_scores(self.scoring_judge.as_ref(), qa).await?;
        let candidates = select_candidates(self.catalog.as_ref(), &scores).await?;
        self.engine.recommend(qa, &candidates).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{catalog, recommendation_json, InMemoryStore, ScriptedJudge};

    const MALFORMED: &str = "Sure! I'd recommend KODEX 200 and some bonds.";

    fn engine(judge: &Arc<ScriptedJudge>) -> RecommendationEngine {
        RecommendationEngine::new(judge.clone())
    }

    #[tokio::test]
    async fn repairs_until_valid() {
        let valid = recommendation_json(&[1, 2, 3, 4, 5]);
        let judge = Arc::new(ScriptedJudge::replies(&[MALFORMED, "{\"etfs\": []}", &valid]));

        let result = engine(&judge).recommend(&[], &catalog()).await.unwrap();

        assert_eq!(result.etfs.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        let prompts = judge.prompts();
        assert_eq!(prompts.len(), 3);
        assert_ne!(prompts[1], prompts[0]);
        assert_ne!(prompts[2], prompts[0]);
        assert!(prompts[1].contains("JSON format repairer"));
        assert!(prompts[1].contains(MALFORMED));
        assert!(prompts[2].contains("{\"etfs\": []}"));
        assert!(!prompts[1].contains("[survey answers]"));
    }

    #[tokio::test]
    async fn gives_up_after_bounded_attempts() {
        let judge = Arc::new(ScriptedJudge::always(MALFORMED));
        let err = engine(&judge).recommend(&[], &catalog()).await.unwrap_err();

        match err {
            CoreError::RecommendationFailed {
                attempts,
                raw_output,
                ..
            } => {
                assert_eq!(attempts, MAX_ATTEMPTS);
                assert_eq!(raw_output.as_deref(), Some(MALFORMED));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(judge.calls(), MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn semantically_invalid_output_is_retried() {
        // Parses, but names an ETF outside the candidate set.
        let fabricated = recommendation_json(&[1, 2, 3, 4, 99]);
        let valid = recommendation_json(&[2, 3, 4, 5, 6]);
        let judge = Arc::new(ScriptedJudge::replies(&[&fabricated, &valid]));

        let result = engine(&judge).recommend(&[], &catalog()).await.unwrap();
        assert_eq!(result.etfs[0].id, 2);
        assert_eq!(judge.calls(), 2);
    }

    #[tokio::test]
    async fn too_few_candidates_fails_before_judging() {
        let judge = Arc::new(ScriptedJudge::always("{}"));
        let err = engine(&judge)
            .recommend(&[], &catalog()[..4])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientCandidates {
                required: 5,
                available: 4
            }
        ));
        assert_eq!(judge.calls(), 0);
    }

    #[tokio::test]
    async fn transport_failure_is_not_retried() {
        let judge = Arc::new(ScriptedJudge::failing());
        let err = engine(&judge).recommend(&[], &catalog()).await.unwrap_err();
        assert!(matches!(err, CoreError::Judge(_)));
        assert_eq!(judge.calls(), 1);
    }

    #[test]
    fn prompt_embeds_candidates_and_survey() {
        let qa = vec![QaItem {
            question: "목표".to_string(),
            answer: "배당".to_string(),
        }];
        let prompt = recommendation_prompt(&qa, &catalog());
        assert!(prompt.contains("\"fltRt\":3"));
        assert!(prompt.contains("삼성전자"));
        assert!(prompt.contains("Q: 목표 | A: 배당"));
    }

    #[tokio::test]
    async fn pipeline_runs_an_empty_survey() {
        // volatility 30, risk 4 puts all six catalog entries in the window.
        let judge = Arc::new(ScriptedJudge::replies(&[
            "30",
            "4",
            &recommendation_json(&[1, 2, 3, 4, 5]),
        ]));
        let store = Arc::new(InMemoryStore::with_etfs(catalog()));
        let pipeline = RecommendationPipeline::new(judge.clone(), store);

        let result = pipeline.run(&[]).await.unwrap();
        assert_eq!(result.weights, [30, 25, 20, 15, 10]);
        assert_eq!(judge.calls(), 3);
        assert!(judge.prompts().iter().all(|p| p.contains("(none)")));
    }
}
