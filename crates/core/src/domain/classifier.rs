//! 上流エラーメッセージのヒューリスティック分類。
//!
//! プロバイダは型付きのエラー契約を持たず、不透明なメッセージしか返さない。
//! ここでは小文字化したテキストに対してマーカー表を優先順に照合するだけで、
//! ネットワークコードには依存しない。

use super::error::ErrorKind;

/// 優先順位付きのルール表。先に一致したものが勝つ。
const RULES: &[(ErrorKind, &[&str])] = &[
    (
        ErrorKind::ContentPolicyViolation,
        &[
            "content policy",
            "content_policy",
            "safety system",
            "safety_violation",
            "moderation_blocked",
            "prohibited content",
            "blocked due to safety",
        ],
    ),
    (
        ErrorKind::QuotaExceeded,
        &[
            "quota",
            "billing",
            "insufficient_quota",
            "hard limit",
            "credit balance",
        ],
    ),
];

pub struct ErrorClassifier;

impl ErrorClassifier {
    /// メッセージのみから分類する。どのマーカーにも一致しなければ `Unclassified`。
    pub fn classify(raw: &str) -> ErrorKind {
        let lowered = raw.to_lowercase();
        RULES
            .iter()
            .find(|(_, markers)| markers.iter().any(|m| lowered.contains(m)))
            .map(|(kind, _)| *kind)
            .unwrap_or(ErrorKind::Unclassified)
    }

    /// テキストマーカーを優先し、一致しなければ構造的な種別（タイムアウト等）を使う
    pub fn classify_with_fallback(raw: &str, structural: ErrorKind) -> ErrorKind {
        match Self::classify(raw) {
            ErrorKind::Unclassified => structural,
            kind => kind,
        }
    }
}
