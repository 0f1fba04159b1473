use crate::domain::etf::{QaItem, ScorePair};
use crate::extract::first_integer;
use crate::llm::TextJudge;
use crate::CoreError;
use std::fmt::Write;
use std::ops::RangeInclusive;

pub const VOLATILITY_RANGE: RangeInclusive<i32> = -10_000..=10_000;
pub const RISK_RANGE: RangeInclusive<i32> = 0..=9;

/// Numbered `Q: .. | A: ..` lines, or an explicit `(none)` marker for an empty survey.
pub fn format_survey(qa: &[QaItem]) -> String {
    if qa.is_empty() {
        return "  (none)\n".to_string();
    }

    let mut out = String::new();
    for (i, item) in qa.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}) Q: {} | A: {}",
            i + 1,
            one_line(&item.question),
            one_line(&item.answer)
        );
    }
    out
}

fn one_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ").trim().to_string()
}

pub fn volatility_prompt(qa: &[QaItem]) -> String {
    format!(
        "You are an investment-profile analyst.\n\
Rate the market volatility this investor can tolerate (volatility_tolerance) as a single integer.\n\n\
Scale:\n\
- an integer between -10000 and 10000\n\
- the more negative, the stronger the aversion to volatility\n\
- near 0 is neutral\n\
- the more positive, the more volatility is tolerated or sought\n\n\
Rules:\n\
- weigh investment horizon, reaction to losses, behaviour in a falling market and profit-taking habits together\n\
- sensitivity to short-term losses or fearful reactions push the score negative\n\
- buying the dip, long holding periods and tolerance for swings push it positive\n\
- no opinions or explanations, only the number\n\n\
Output format:\n\
- output exactly one integer\n\
- no words, symbols, spaces or line breaks\n\
- example output:\n\
3500\n\n\
Survey answers:\n{}",
        format_survey(qa)
    )
}

pub fn risk_prompt(qa: &[QaItem]) -> String {
    format!(
        "You are an investment-profile analyst.\n\
Rate the risk level (risk_level) this investor can bear as a single integer from 0 to 9.\n\n\
Definitions:\n\
0 = very stable (strong loss aversion, almost no volatility tolerated)\n\
2 = low-risk blended / index funds\n\
5 = ordinary equity funds, neutral risk tolerance\n\
7 = theme or sector concentration, volatility accepted\n\
9 = leveraged or speculative, very aggressive\n\n\
Criteria:\n\
- behaviour after a loss (sell immediately vs hold or add)\n\
- response to a falling market\n\
- profit-taking habits\n\
- investment horizon (short vs long)\n\
- appetite for concentrating on one theme or sector\n\n\
Guide:\n\
- loss aversion, short horizon, fearful reactions: 0-2\n\
- long holding, sticking to plan, neutral reactions: 3-5\n\
- buying the dip, theme concentration, aggressive reactions: 6-8\n\
- 9 only when a clear preference for leverage or extreme choices is shown\n\n\
Output format:\n\
- output exactly one integer\n\
- no words, symbols, spaces or line breaks\n\
- example output:\n\
3\n\n\
Survey answers:\n{}",
        format_survey(qa)
    )
}

/// Asks the judge for volatility, then risk. Any judge or extraction failure is returned as is.
pub async fn extract_scores(judge: &dyn TextJudge, qa: &[QaItem]) -> Result<ScorePair, CoreError> {
    let raw = judge.submit(&volatility_prompt(qa)).await?;
    let volatility = clamp_score("volatility", first_integer(&raw)?, VOLATILITY_RANGE);

    let raw = judge.submit(&risk_prompt(qa)).await?;
    let risk = clamp_score("risk", first_integer(&raw)?, RISK_RANGE);

    tracing::info!(volatility, risk, answers = qa.len(), "survey scored");
    Ok(ScorePair {
        volatility_score: volatility,
        risk_score: risk,
    })
}

fn clamp_score(kind: &'static str, value: i32, range: RangeInclusive<i32>) -> i32 {
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        tracing::warn!(kind, value, clamped, "judge score out of range; clamped");
    }
    clamped
}
