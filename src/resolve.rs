// RecordGate - Identifier Resolver
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// A request may name its target record three ways: a path-embedded id,
// a query-string id, or a body id. Canonical routes and alias routes
// must behave identically once resolved. Precedence is fixed:
// path > query > body. Precedence is decided before parsing, so a
// present-but-malformed path id fails even when a well-formed query
// id exists.

use crate::error::GatewayError;

/// The up-to-three possible sources for "which record"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdCandidates {
    pub path: Option<String>,
    pub query: Option<String>,
    pub body: Option<String>,
}

impl IdCandidates {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_path(id: impl Into<String>) -> Self {
        Self {
            path: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn from_query(id: impl Into<String>) -> Self {
        Self {
            query: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn from_body(id: impl Into<String>) -> Self {
        Self {
            body: Some(id.into()),
            ..Self::default()
        }
    }

    /// Pick the winning candidate and parse it as an integer id.
    /// Blank candidates count as absent.
    pub fn resolve(&self) -> Result<u64, GatewayError> {
        let winner = [&self.path, &self.query, &self.body]
            .into_iter()
            .find_map(|c| c.as_deref().map(str::trim).filter(|s| !s.is_empty()));

        match winner {
            None => Err(GatewayError::MissingIdentifier),
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| GatewayError::MalformedIdentifier(raw.to_string())),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_wins_over_query_and_body() {
        let ids = IdCandidates {
            path: Some("1".to_string()),
            query: Some("2".to_string()),
            body: Some("3".to_string()),
        };
        assert_eq!(ids.resolve(), Ok(1));
    }

    #[test]
    fn query_wins_over_body() {
        let ids = IdCandidates {
            path: None,
            query: Some("2".to_string()),
            body: Some("3".to_string()),
        };
        assert_eq!(ids.resolve(), Ok(2));
    }

    #[test]
    fn body_is_the_last_resort() {
        assert_eq!(IdCandidates::from_body("3").resolve(), Ok(3));
    }

    #[test]
    fn blank_path_falls_through() {
        let ids = IdCandidates {
            path: Some("  ".to_string()),
            query: Some("7".to_string()),
            body: None,
        };
        assert_eq!(ids.resolve(), Ok(7));
    }

    #[test]
    fn all_absent_is_missing() {
        assert_eq!(IdCandidates::none().resolve(), Err(GatewayError::MissingIdentifier));
    }

    #[test]
    fn malformed_winner_fails_even_with_valid_fallback() {
        // Precedence first, parsing second
        let ids = IdCandidates {
            path: Some("abc".to_string()),
            query: Some("7".to_string()),
            body: None,
        };
        assert_eq!(
            ids.resolve(),
            Err(GatewayError::MalformedIdentifier("abc".to_string()))
        );
    }

    #[test]
    fn negative_id_is_malformed() {
        assert_eq!(
            IdCandidates::from_path("-4").resolve(),
            Err(GatewayError::MalformedIdentifier("-4".to_string()))
        );
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        assert_eq!(IdCandidates::from_query(" 12 ").resolve(), Ok(12));
    }
}
