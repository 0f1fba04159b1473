//! HTML bodies and subjects for outbound notifications.

use crate::domain::etf::Etf;
use crate::domain::news::NewsItem;
use crate::domain::rebalancing::{ChangeDirection, RebalancingReport};
use chrono::{DateTime, Utc};
use std::fmt::Write;

const STYLE: &str = "body{font-family:'Malgun Gothic',sans-serif;line-height:1.6;color:#333}\
.container{max-width:700px;margin:0 auto;padding:20px}\
.header{background:#0066cc;color:#fff;padding:20px;text-align:center}\
.box{background:#fff3cd;padding:15px;margin:15px 0;border-radius:5px}\
.box.ok{background:#d4edda}\
.news{padding:12px;margin:10px 0;border:1px solid #e0e0e0;border-radius:5px}\
.meta{font-size:.9em;color:#666}\
table{width:100%;border-collapse:collapse}th,td{padding:8px;border-bottom:1px solid #dee2e6}\
.footer{text-align:center;color:#666;font-size:.9em;padding:20px}";

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn etf_alert_subject(etf: &Etf) -> String {
    format!("[ETF alert] Important news for {}", etf.name)
}

pub fn etf_alert_html(etf: &Etf, summary: &str, news: &[NewsItem], sent_at: DateTime<Utc>) -> String {
    let mut html = String::new();
    open_document(&mut html, "ETF alert");

    let _ = write!(
        html,
        "<h2>{}</h2><p><strong>Category:</strong> {}</p><p><strong>Risk level:</strong> {} / 9</p>\
         <p><strong>Change vs. last month:</strong> {}%</p>",
        escape_html(&etf.name),
        escape_html(etf.category_or_default()),
        etf.risk_level,
        etf.change_rate
    );
    let _ = write!(
        html,
        "<div class='box'><h3>Analysis</h3><p>{}</p></div><h3>Related news</h3>",
        escape_html(summary)
    );

    for item in news {
        let _ = write!(
            html,
            "<div class='news'><div><strong>{}</strong></div><div class='meta'>{} | {}</div>",
            escape_html(&item.title),
            escape_html(&item.source),
            item.published_at.format("%Y-%m-%d %H:%M")
        );
        if !item.content.trim().is_empty() {
            let _ = write!(html, "<p>{}</p>", escape_html(&item.content));
        }
        let _ = write!(
            html,
            "<p><a href='{}'>Read the full article</a></p></div>",
            escape_html(&item.url)
        );
    }

    close_document(&mut html, "Sent by the ETF news alert service", sent_at);
    html
}

pub fn rebalancing_subject(report: &RebalancingReport) -> String {
    let verdict = if report.rebalancing_required {
        "rebalancing recommended"
    } else {
        "analysis complete"
    };
    format!("[Portfolio alert] {} {verdict}", report.portfolio_name)
}

pub fn rebalancing_html(report: &RebalancingReport) -> String {
    let mut html = String::new();
    open_document(&mut html, "Portfolio rebalancing analysis");
    let _ = write!(html, "<h2>{}</h2>", escape_html(&report.portfolio_name));

    let (class, headline) = if report.rebalancing_required {
        ("box", "Rebalancing is recommended")
    } else {
        ("box ok", "Keeping the current portfolio is recommended")
    };
    let _ = write!(
        html,
        "<div class='{class}'><strong>{headline}</strong><br>{}</div>\
         <p>Market risk: <strong>{}</strong></p>",
        escape_html(&report.rebalancing_reason),
        report.risk_assessment.as_str()
    );

    if report.rebalancing_required && !report.recommended_portfolio.is_empty() {
        html.push_str(
            "<h3>Recommended adjustments</h3><table><thead><tr><th>ETF</th><th>Current</th>\
             <th>Recommended</th><th>Change</th></tr></thead><tbody>",
        );
        for change in &report.recommended_portfolio {
            let badge = match change.direction {
                ChangeDirection::Maintain => "keep".to_string(),
                ChangeDirection::Increase => format!("+{:.0}%", change.change_amount),
                ChangeDirection::Decrease => format!("{:.0}%", change.change_amount),
            };
            let _ = write!(
                html,
                "<tr><td><strong>{}</strong><br><span class='meta'>{}</span></td><td>{:.0}%</td>\
                 <td><strong>{:.0}%</strong></td><td>{badge}</td></tr>",
                escape_html(&change.etf_name),
                escape_html(&change.category),
                change.current_weight,
                change.recommended_weight
            );
        }
        html.push_str("</tbody></table>");
    } else {
        html.push_str("<h3>Current allocation</h3><table><tbody>");
        for view in &report.current_portfolio {
            let _ = write!(
                html,
                "<tr><td><strong>{}</strong> <span class='meta'>({})</span></td><td>{:.0}%</td></tr>",
                escape_html(&view.etf_name),
                escape_html(&view.category),
                view.current_weight
            );
        }
        html.push_str("</tbody></table>");
    }

    if !report.news_evidence.is_empty() {
        html.push_str("<h3>Key news</h3>");
        for ev in &report.news_evidence {
            let _ = write!(
                html,
                "<div class='news'><div><strong>{}</strong></div><div class='meta'>[{}] | {}</div>",
                escape_html(&ev.news_title),
                escape_html(&ev.etf_name),
                ev.published_at.format("%Y-%m-%d %H:%M")
            );
            if !ev.summary.trim().is_empty() {
                let _ = write!(html, "<p>{}</p>", escape_html(&ev.summary));
            }
            let _ = write!(
                html,
                "<a href='{}'>Read the full article</a></div>",
                escape_html(&ev.news_url)
            );
        }
    }

    let advice: Vec<&str> = report
        .recommendations
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !advice.is_empty() {
        html.push_str("<h3>Advice</h3><ul>");
        for line in advice {
            let _ = write!(html, "<li>{}</li>", escape_html(line));
        }
        html.push_str("</ul>");
    }

    close_document(
        &mut html,
        "Sent by the portfolio analysis service. For reference only; investment decisions remain yours.",
        report.analyzed_at,
    );
    html
}

fn open_document(html: &mut String, title: &str) {
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset='UTF-8'><style>{STYLE}</style></head><body>\
         <div class='container'><div class='header'><h1>{title}</h1></div>"
    );
}

fn close_document(html: &mut String, footer: &str, at: DateTime<Utc>) {
    let _ = write!(
        html,
        "<div class='footer'><p>{footer}</p><p>{}</p></div></div></body></html>",
        at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{etf, news_item};

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<b>\"AT&T\"</b>"),
            "&lt;b&gt;&quot;AT&amp;T&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn alert_body_lists_news_with_links() {
        let etf = etf(1, "KODEX 200", 3, 5);
        let news = vec![news_item(10, 1, "삼성전자 <급등>", "https://news.koscom.co.kr/news/N1")];
        let html = etf_alert_html(&etf, "summary text", &news, Utc::now());

        assert!(html.contains("KODEX 200"));
        assert!(html.contains("summary text"));
        assert!(html.contains("삼성전자 &lt;급등&gt;"));
        assert!(html.contains("https://news.koscom.co.kr/news/N1"));
        assert_eq!(etf_alert_subject(&etf), "[ETF alert] Important news for KODEX 200");
    }
}
