#[cfg(test)]
mod tests {
    use crate::domain::error::ErrorKind;
    use crate::domain::session::SessionState;
    use crate::domain::settings::{EditBackend, RelayTuning};
    use crate::domain::types::{Command, UserId};

    #[test]
    fn test_error_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::ContentPolicyViolation).unwrap(),
            "\"E_CONTENT_POLICY\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorKind::QuotaExceeded).unwrap(),
            "\"E_QUOTA\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorKind::MalformedUpstreamResponse).unwrap(),
            "\"E_MALFORMED_RESPONSE\""
        );
    }

    #[test]
    fn test_error_kind_code_matches_serde() {
        for kind in [
            ErrorKind::ContentPolicyViolation,
            ErrorKind::QuotaExceeded,
            ErrorKind::UpstreamUnavailable,
            ErrorKind::MalformedUpstreamResponse,
            ErrorKind::PromptTooLong,
            ErrorKind::Unclassified,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.code());
        }
    }

    #[test]
    fn test_session_state_serialization() {
        assert_eq!(
            serde_json::to_string(&SessionState::Idle).unwrap(),
            "\"idle\""
        );
        assert_eq!(
            serde_json::to_string(&SessionState::AwaitingPrompt).unwrap(),
            "\"awaiting_prompt\""
        );
    }

    #[test]
    fn test_edit_backend_roundtrip() {
        assert_eq!(
            serde_json::to_string(&EditBackend::Describe).unwrap(),
            "\"describe\""
        );
        assert_eq!(
            serde_json::from_str::<EditBackend>("\"relay\"").unwrap(),
            EditBackend::Relay
        );
    }

    #[test]
    fn test_relay_tuning_field_names() {
        let json = serde_json::to_value(RelayTuning::default()).unwrap();
        assert_eq!(json["num_inference_steps"], 20);
        assert!(json.get("guidance_scale").is_some());
        assert!(json.get("id_weight").is_some());
    }

    #[test]
    fn test_user_id_is_transparent() {
        assert_eq!(serde_json::to_string(&UserId(42)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&Command::Reset).unwrap(), "\"reset\"");
    }
}
