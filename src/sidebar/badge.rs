use serde_json::Value;

/// Unread marker of one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    /// Known number of unread messages.
    Count(u32),
    /// Unread state without a number (mentions, alerts).
    Dot,
}

impl Badge {
    /// Decode the argument of an `unread-changed` message.
    ///
    /// `null`, missing and empty strings clear the badge. Numbers and strings
    /// with a leading integer are counts; any other value is a dot.
    pub fn from_json(value: Option<&Value>) -> Option<Badge> {
        match value? {
            Value::Null => None,
            Value::Number(n) => Some(
                n.as_u64()
                    .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                    .map(|n| Badge::Count(u32::try_from(n).unwrap_or(u32::MAX)))
                    .unwrap_or(Badge::Dot),
            ),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                let digits: String = s.chars().take_while(char::is_ascii_digit).collect();
                Some(match digits.parse::<u64>() {
                    Ok(n) => Badge::Count(u32::try_from(n).unwrap_or(u32::MAX)),
                    Err(_) => Badge::Dot,
                })
            }
            _ => Some(Badge::Dot),
        }
    }

    /// Whether this badge asks for attention. A zero count does not.
    pub fn is_unread(&self) -> bool {
        !matches!(self, Badge::Count(0))
    }

    pub fn count(&self) -> u32 {
        match self {
            Badge::Count(n) => *n,
            Badge::Dot => 0,
        }
    }
}

/// Aggregate unread state across every host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalBadge {
    pub count: u32,
    /// Count as text, `•` for dot-only unread state, or empty.
    pub title: String,
    pub show_alert: bool,
}

pub const DOT: &str = "•";

impl GlobalBadge {
    pub fn aggregate<'a>(badges: impl IntoIterator<Item = &'a Badge>) -> Self {
        let mut count: u32 = 0;
        let mut attention = false;
        for badge in badges {
            count = count.saturating_add(badge.count());
            attention |= badge.is_unread();
        }

        let title = if count > 0 {
            count.to_string()
        } else if attention {
            DOT.to_string()
        } else {
            String::new()
        };

        Self {
            count,
            show_alert: !title.is_empty(),
            title,
        }
    }

    /// Short text for small icon overlays: `•`, `1`..`9` or `9+`.
    pub fn badge_text(&self) -> Option<String> {
        if self.title == DOT {
            Some(DOT.to_string())
        } else if self.count > 9 {
            Some("9+".to_string())
        } else if self.count > 0 {
            Some(self.count.to_string())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        assert_eq!(Badge::from_json(None), None);
        assert_eq!(Badge::from_json(Some(&json!(null))), None);
        assert_eq!(Badge::from_json(Some(&json!(""))), None);
        assert_eq!(Badge::from_json(Some(&json!(3))), Some(Badge::Count(3)));
        assert_eq!(Badge::from_json(Some(&json!("12"))), Some(Badge::Count(12)));
        assert_eq!(Badge::from_json(Some(&json!("5+"))), Some(Badge::Count(5)));
        assert_eq!(Badge::from_json(Some(&json!("•"))), Some(Badge::Dot));
        assert_eq!(Badge::from_json(Some(&json!(true))), Some(Badge::Dot));
    }

    #[test]
    fn test_aggregate_counts_and_dot() {
        let badges = [Badge::Count(3), Badge::Count(0), Badge::Dot];
        let global = GlobalBadge::aggregate(&badges);
        assert_eq!(
            global,
            GlobalBadge {
                count: 3,
                title: "3".to_string(),
                show_alert: true,
            }
        );
    }

    #[test]
    fn test_aggregate_zero_counts_need_no_attention() {
        let badges = [Badge::Count(0), Badge::Count(0)];
        let global = GlobalBadge::aggregate(&badges);
        assert_eq!(global.count, 0);
        assert_eq!(global.title, "");
        assert!(!global.show_alert);
        assert_eq!(global.badge_text(), None);
    }

    #[test]
    fn test_aggregate_dot_only() {
        let global = GlobalBadge::aggregate(&[Badge::Dot]);
        assert_eq!(global.title, DOT);
        assert!(global.show_alert);
        assert_eq!(global.badge_text().as_deref(), Some(DOT));
    }

    #[test]
    fn test_badge_text_caps_at_nine() {
        assert_eq!(
            GlobalBadge::aggregate(&[Badge::Count(7)]).badge_text().as_deref(),
            Some("7")
        );
        assert_eq!(
            GlobalBadge::aggregate(&[Badge::Count(7), Badge::Count(5)])
                .badge_text()
                .as_deref(),
            Some("9+")
        );
    }

    fn badge_strategy() -> impl Strategy<Value = Badge> {
        prop_oneof![(0u32..1000).prop_map(Badge::Count), Just(Badge::Dot)]
    }

    proptest! {
        #[test]
        fn prop_aggregate_invariants(badges in proptest::collection::vec(badge_strategy(), 0..12)) {
            let global = GlobalBadge::aggregate(&badges);
            let expected: u32 = badges.iter().map(Badge::count).sum();
            prop_assert_eq!(global.count, expected);

            let any_dot = badges.contains(&Badge::Dot);
            prop_assert_eq!(global.show_alert, expected > 0 || any_dot);

            if expected > 0 {
                prop_assert_eq!(global.title, expected.to_string());
            } else if any_dot {
                prop_assert_eq!(global.title.as_str(), DOT);
            } else {
                prop_assert!(global.title.is_empty());
            }
        }
    }
}
