/// Outcome of a single commit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The daily goal was reached.
    Achieved { count: u64 },
    /// Short of the goal, and the caller asked to hear about it.
    BelowTarget { count: u64, deficit: u64 },
    /// Short of the goal, but the caller only wants good news.
    Suppressed,
    /// The commit count could not be determined.
    Unknown,
}

pub fn decide(count: u64, threshold: u64, immediate: bool) -> Decision {
    if count >= threshold {
        Decision::Achieved { count }
    } else if immediate {
        Decision::BelowTarget {
            count,
            deficit: threshold - count,
        }
    } else {
        Decision::Suppressed
    }
}

/// Render the message for a decision. `Suppressed` and `Unknown`
/// produce nothing to send.
pub fn render(decision: &Decision) -> Option<String> {
    match decision {
        Decision::Achieved { count } => Some(format!(
            "おめでとうございます！\n今日のコミット数: {count}\n目標を達成しました！"
        )),
        Decision::BelowTarget { count, deficit } => Some(format!(
            "今日のコミット数: {count}\n目標まであと{deficit}コミット必要です！\n頑張りましょう！"
        )),
        Decision::Suppressed | Decision::Unknown => None,
    }
}
