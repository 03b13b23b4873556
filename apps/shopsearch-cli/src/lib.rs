//! Terminal rendering for search results and comparison reports.

pub mod render {
    use shopsearch_core::{RankedResultSet, SearchHit};
    use shopsearch_hybrid::{ComparisonReport, StrategyOutcome};

    pub const CATEGORY_WIDTH: usize = 40;
    pub const NAME_WIDTH: usize = 40;

    /// First `max` characters of `s`, on a char boundary.
    pub fn truncate_chars(s: &str, max: usize) -> &str {
        match s.char_indices().nth(max) {
            Some((idx, _)) => &s[..idx],
            None => s,
        }
    }

    fn shorten(s: &str, max: usize) -> String {
        let head = truncate_chars(s, max);
        if head.len() < s.len() { format!("{head}...") } else { head.to_string() }
    }

    pub fn format_price(price: f64) -> String { format!("${price:.2}") }

    pub fn format_millis(d: std::time::Duration) -> String { format!("{:.0} ms", d.as_secs_f64() * 1000.0) }

    pub fn hit_lines(rank: usize, hit: &SearchHit) -> String {
        let category = hit.category.to_string();
        format!(
            "{rank:>3}. {name}\n     brand: {brand} | price: {price} | category: {category}\n     score: {score:.3}  id: {id}\n",
            name = hit.name,
            brand = hit.brand,
            price = format_price(hit.price),
            category = truncate_chars(&category, CATEGORY_WIDTH),
            score = hit.score,
            id = hit.id,
        )
    }

    pub fn result_set(query: &str, set: &RankedResultSet) -> String {
        let mut out = format!(
            "{} | \"{query}\" | {} results in {}\n\n",
            set.strategy.label(),
            set.len(),
            format_millis(set.latency)
        );
        if set.is_empty() {
            out.push_str("     no results\n");
        }
        for (i, hit) in set.hits.iter().enumerate() {
            out.push_str(&hit_lines(i + 1, hit));
        }
        out
    }

    fn outcome_block(outcome: &StrategyOutcome) -> String {
        let mut out = format!("== {} ({}) ==\n", outcome.strategy.label(), format_millis(outcome.latency));
        match &outcome.result {
            Ok(set) if set.is_empty() => out.push_str("     no results\n"),
            Ok(set) => {
                for (i, hit) in set.hits.iter().enumerate() {
                    out.push_str(&format!("{:>3}. {}  [{:.3}]\n", i + 1, shorten(&hit.name, NAME_WIDTH), hit.score));
                }
            }
            Err(e) => out.push_str(&format!("     FAILED ({}): {e}\n", e.kind())),
        }
        out
    }

    /// All strategies in fixed order, one block each.
    pub fn report(report: &ComparisonReport) -> String {
        let mut out = format!("Comparing strategies for \"{}\" (k={})\n\n", report.query, report.k);
        for outcome in &report.outcomes {
            out.push_str(&outcome_block(outcome));
            out.push('\n');
        }
        if let Some(partial) = report.partial_failure() {
            out.push_str(&format!("{partial}\n"));
        }
        out
    }

}
