//! Multiset comparisons shared by the query, header and form-body scores.

use crate::model::Multimap;

/// Strip a leading `https` or `http` so recorded and live URLs embedded in
/// values compare equal across scheme changes.
fn strip_protocol(value: &str) -> &str {
    value
        .strip_prefix("https")
        .or_else(|| value.strip_prefix("http"))
        .unwrap_or(value)
}

fn normalized<'a, I>(values: I) -> Vec<Option<&'a str>>
where
    I: Iterator<Item = Option<&'a str>>,
{
    let mut values: Vec<_> = values.map(|v| v.map(strip_protocol)).collect();
    values.sort_unstable();
    values
}

/// Whether two value lists are equal as multisets after protocol stripping.
pub fn same_values<'a, A, B>(left: A, right: B) -> bool
where
    A: Iterator<Item = Option<&'a str>>,
    B: Iterator<Item = Option<&'a str>>,
{
    normalized(left) == normalized(right)
}

/// Score parameter sameness.
///
/// Both sides empty earns a full `increment`. Otherwise each live name found
/// on the recorded side with equal values earns `increment`; each name
/// present on only one side costs `increment / 2`. The result is never negative.
pub fn params_sameness(
    recorded: &Multimap<Option<String>>,
    live: &Multimap<Option<String>>,
    increment: i64,
) -> i64 {
    if recorded.is_empty() && live.is_empty() {
        return increment;
    }
    let half = increment / 2;
    let mut score = 0i64;
    for name in live.keys() {
        if !recorded.contains_key(name) {
            score -= half;
        } else if same_values(
            recorded.get_all(name).map(Option::as_deref),
            live.get_all(name).map(Option::as_deref),
        ) {
            score += increment;
        }
    }
    for name in recorded.keys() {
        if !live.contains_key(name) {
            score -= half;
        }
    }
    score.max(0)
}

/// Score header sameness: `increment` per live header whose values match the
/// recorded header of the same name.
///
/// Headers present on only one side are not penalised.
pub fn headers_sameness(recorded: &Multimap<String>, live: &Multimap<String>, increment: i64) -> i64 {
    live.keys()
        .into_iter()
        .filter(|name| recorded.contains_key(name))
        .filter(|name| {
            same_values(
                recorded.get_all(name).map(|v| Some(v.as_str())),
                live.get_all(name).map(|v| Some(v.as_str())),
            )
        })
        .map(|_| increment)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_query_params;

    #[test]
    fn test_strip_protocol() {
        assert_eq!(strip_protocol("https://a"), "://a");
        assert_eq!(strip_protocol("http://a"), "://a");
        assert_eq!(strip_protocol("ftp://a"), "ftp://a");
    }

    #[test]
    fn test_same_values_is_order_insensitive() {
        assert!(same_values(
            vec![Some("a"), Some("b"), None].into_iter(),
            vec![None, Some("b"), Some("a")].into_iter()
        ));
        assert!(!same_values(
            vec![Some("a"), Some("a")].into_iter(),
            vec![Some("a")].into_iter()
        ));
        assert!(!same_values(vec![Some("")].into_iter(), vec![None].into_iter()));
    }

    #[test]
    fn test_params_sameness_scores() {
        let inc = 100;
        let exact = parse_query_params("a=1&b=2");
        assert_eq!(params_sameness(&exact, &exact, inc), 200);
        let empty: Multimap<Option<String>> = Multimap::new();
        assert_eq!(params_sameness(&empty, &empty, inc), 100);
        // live has extra name: +100 for a, -50 for c
        assert_eq!(
            params_sameness(&parse_query_params("a=1"), &parse_query_params("a=1&c=3"), inc),
            50
        );
        // recorded has extra name: +100 for a, -50 for b
        assert_eq!(
            params_sameness(&parse_query_params("a=1&b=2"), &parse_query_params("a=1"), inc),
            50
        );
        // disjoint clamps at zero
        assert_eq!(
            params_sameness(&parse_query_params("x=1"), &parse_query_params("y=1"), inc),
            0
        );
        // same name, different value
        assert_eq!(
            params_sameness(&parse_query_params("a=1"), &parse_query_params("a=2"), inc),
            0
        );
    }

    #[test]
    fn test_headers_sameness_ignores_missing() {
        let recorded: Multimap<String> = vec![
            ("Accept", "text/html".to_string()),
            ("X-Recorded-Only", "1".to_string()),
        ]
        .into_iter()
        .collect();
        let live: Multimap<String> = vec![
            ("accept", "text/html".to_string()),
            ("X-Live-Only", "1".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(headers_sameness(&recorded, &live, 100), 100);
    }

    #[test]
    fn test_headers_sameness_strips_protocol() {
        let recorded: Multimap<String> =
            vec![("Referer", "http://a.test/x".to_string())].into_iter().collect();
        let live: Multimap<String> =
            vec![("Referer", "https://a.test/x".to_string())].into_iter().collect();
        assert_eq!(headers_sameness(&recorded, &live, 100), 100);
    }
}
