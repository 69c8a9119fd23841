use crate::{ErrorCode, ShardgateError};

impl From<std::io::Error> for ShardgateError {
    fn from(err: std::io::Error) -> Self {
        ShardgateError::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<serde_json::Error> for ShardgateError {
    fn from(err: serde_json::Error) -> Self {
        ShardgateError::new(ErrorCode::SerializationFailed, err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for ShardgateError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ShardgateError::new(ErrorCode::ConnectionTimeout, err.to_string())
    }
}

/// Levenshtein-based suggestion used for "Did you mean ...?" hints.
pub fn find_closest_match(target: &str, options: &[String]) -> Option<String> {
    let mut best_match: Option<&str> = None;
    let mut min_distance = usize::MAX;

    for option in options {
        let distance = levenshtein(target, option);
        if distance < min_distance && distance <= 3 {
            min_distance = distance;
            best_match = Some(option.as_str());
        }
    }

    best_match.map(|s| s.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0; b.len() + 1]; a.len() + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate() {
        *val = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = std::cmp::min(
                std::cmp::min(dp[i - 1][j] + 1, dp[i][j - 1] + 1),
                dp[i - 1][j - 1] + cost,
            );
        }
    }

    dp[a.len()][b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("DBMS1", "DBMS2"), 1);
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_find_closest_match() {
        let options = vec![
            "DBMS1".to_string(),
            "DBMS2".to_string(),
            "DBMS1-STANDBY".to_string(),
        ];

        assert_eq!(
            find_closest_match("DBMS1", &options),
            Some("DBMS1".to_string())
        );
        // case differences count as edits
        assert_eq!(find_closest_match("dbms2", &options), None);
        assert_eq!(
            find_closest_match("DBMS-1", &options),
            Some("DBMS1".to_string())
        );
        assert_eq!(find_closest_match("completely_different", &options), None);
    }

    #[test]
    fn test_io_error_mapping() {
        let io_err = std::io::Error::other("File error");
        let err: ShardgateError = io_err.into();
        assert_eq!(err.code, ErrorCode::Unknown);
        assert!(err.message.contains("File error"));
    }

    #[tokio::test]
    async fn test_elapsed_maps_to_timeout() {
        let elapsed = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();
        let err: ShardgateError = elapsed.into();
        assert_eq!(err.code, ErrorCode::ConnectionTimeout);
    }
}
