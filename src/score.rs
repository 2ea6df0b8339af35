//! Table-driven scoring.
//!
//! Each search gathers a signals struct per container and runs it through a
//! static slice of [`Rule`]s. The result is a [`Breakdown`] recording what
//! every rule contributed, so a score can always be explained.

use std::fmt;

use ego_tree::NodeId;

/// One weighted signal: `score` returns this rule's contribution.
pub struct Rule<S> {
    pub label: &'static str,
    pub score: fn(&S) -> i32,
}

/// Per-rule contributions of one scored container. Zero contributions are
/// not recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breakdown {
    entries: Vec<(&'static str, i32)>,
}

impl Breakdown {
    /// Runs every rule in `rules` over `signals`.
    pub fn evaluate<S>(rules: &[Rule<S>], signals: &S) -> Self {
        let entries = rules
            .iter()
            .map(|rule| (rule.label, (rule.score)(signals)))
            .filter(|&(_, points)| points != 0)
            .collect();
        Self { entries }
    }

    pub fn total(&self) -> i32 {
        self.entries.iter().map(|&(_, points)| points).sum()
    }

    /// Contribution of the rule labelled `label`, zero if it did not fire.
    pub fn get(&self, label: &str) -> i32 {
        self.entries
            .iter()
            .find(|&&(l, _)| l == label)
            .map_or(0, |&(_, points)| points)
    }

    pub fn entries(&self) -> &[(&'static str, i32)] {
        &self.entries
    }
}

impl fmt::Display for Breakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, points)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{label}={points:+}")?;
        }
        Ok(())
    }
}

/// A scored container proposal from one search pass.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub node: NodeId,
    pub score: i32,
    /// Supporting item count: list items for the list search, structural
    /// blocks for the article search.
    pub items: usize,
    pub breakdown: Breakdown,
}

impl Candidate {
    pub fn new(node: NodeId, items: usize, breakdown: Breakdown) -> Self {
        Self {
            node,
            score: breakdown.total(),
            items,
            breakdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Signals {
        len: usize,
        bad: bool,
    }

    const RULES: &[Rule<Signals>] = &[
        Rule {
            label: "long",
            score: |s| if s.len > 10 { 15 } else { 0 },
        },
        Rule {
            label: "bad",
            score: |s| if s.bad { -20 } else { 0 },
        },
    ];

    #[test]
    fn test_breakdown_records_nonzero_rules() {
        let b = Breakdown::evaluate(RULES, &Signals { len: 20, bad: false });
        assert_eq!(b.entries(), &[("long", 15)]);
        assert_eq!(b.total(), 15);
        assert_eq!(b.get("bad"), 0);
    }

    #[test]
    fn test_breakdown_display() {
        let b = Breakdown::evaluate(RULES, &Signals { len: 20, bad: true });
        assert_eq!(b.to_string(), "long=+15 bad=-20");
        assert_eq!(b.total(), -5);
    }
}
