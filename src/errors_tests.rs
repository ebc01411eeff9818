// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for engine error types.

#[cfg(test)]
mod tests {
    use crate::errors::Error;

    fn api_error(code: u16, reason: &str) -> Error {
        Error::Kube(kube::Error::Api(
            kube::core::Status::failure(&format!("{reason} test"), reason)
                .with_code(code)
                .boxed(),
        ))
    }

    #[test]
    fn test_not_found_predicate() {
        assert!(api_error(404, "NotFound").is_not_found());
        assert!(!api_error(500, "InternalError").is_not_found());
        assert!(!Error::Cancelled.is_not_found());
    }

    #[test]
    fn test_conflict_and_already_exists_are_distinct() {
        let conflict = api_error(409, "Conflict");
        assert!(conflict.is_conflict());
        assert!(!conflict.is_already_exists());

        let exists = api_error(409, "AlreadyExists");
        assert!(exists.is_already_exists());
        assert!(!exists.is_conflict());
    }

    #[test]
    fn test_missing_name_message() {
        let error = Error::MissingName {
            kind: "Deployment".to_string(),
        };
        assert_eq!(error.to_string(), "Deployment has no metadata.name");
    }

    #[test]
    fn test_certificate_message() {
        let error = Error::Certificate("secret netobserv/loki-ca not found".to_string());
        assert_eq!(
            error.to_string(),
            "Certificate error: secret netobserv/loki-ca not found"
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(api_error(409, "Conflict").category(), "conflict");
        assert_eq!(api_error(503, "ServiceUnavailable").category(), "api_error");
        assert_eq!(Error::Cancelled.category(), "cancelled");
        assert_eq!(
            Error::Configuration("bad".to_string()).category(),
            "configuration_error"
        );
    }
}
