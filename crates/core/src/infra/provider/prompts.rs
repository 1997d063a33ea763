//! プロンプトテンプレート

/// プロンプト補正のシステム指示。`{language}` は対象言語に置換される。
const SYSTEM_ENHANCE: &str = "\
You are a prompt writer for an image generation model.
Rewrite the user's request following these rules:
- Translate it into {language} if it is written in another language
- Keep the subject and intent of the request unchanged
- Add concrete visual detail: composition, lighting, color palette, style, mood
- Do not add text, captions or watermarks to the scene
- Reply with the rewritten prompt only, without quotes or explanations";

/// 本人性保持の指示（参照写真付き編集の先頭に付与）
pub const IDENTITY_DIRECTIVE: &str = "\
Use the person in the attached reference photo as the subject.
Preserve their identity exactly: keep the same facial structure, the shape and \
position of the eyes, nose and mouth, the same skin tone, and overall \
recognizability. Do not beautify, age or change the face. Apply only the \
following change request:";

/// 参照写真から顔の特徴を抽出する指示
pub const DESCRIBE_FACE: &str = "\
Describe the face of the person in this photo for an artist who must paint \
them without seeing the photo. Use short labeled lines, in English:
Face shape:
Eye color and shape:
Nose:
Lips:
Eyebrows:
Hair color, length and texture:
Skin tone:
Distinctive marks:
Apparent age:
Apparent gender:
Do not describe the background or clothing.";

/// 対象言語を埋め込んだ補正用システム指示を返す
pub fn enhance_system_prompt(language: &str) -> String {
    SYSTEM_ENHANCE.replace("{language}", language)
}

/// 本人性保持指示でプロンプトを包む
pub fn wrap_identity(prompt: &str) -> String {
    format!("{IDENTITY_DIRECTIVE}\n{}", prompt.trim())
}

/// 顔の特徴記述を最終プロンプトに連結する
pub fn compose_with_description(prompt: &str, description: &str) -> String {
    format!(
        "{}\n\nThe person depicted must match this description exactly:\n{}",
        wrap_identity(prompt),
        description.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhance_system_prompt_language() {
        let prompt = enhance_system_prompt("English");
        assert!(prompt.contains("Translate it into English"));
        assert!(!prompt.contains("{language}"));
    }

    #[test]
    fn test_wrap_identity_keeps_request_last() {
        let wrapped = wrap_identity("  add a hat ");
        assert!(wrapped.starts_with(IDENTITY_DIRECTIVE));
        assert!(wrapped.ends_with("add a hat"));
    }

    #[test]
    fn test_compose_with_description() {
        let composed = compose_with_description("as an astronaut", "Face shape: oval\n");
        assert!(composed.contains("as an astronaut"));
        assert!(composed.contains("Face shape: oval"));
        assert!(composed.contains("skin tone"));
    }

    #[test]
    fn test_describe_face_covers_attributes() {
        for attr in ["Face shape", "Eye color", "Nose", "Lips", "Eyebrows", "Hair", "Skin tone", "Distinctive", "age", "gender"] {
            assert!(DESCRIBE_FACE.contains(attr), "missing {attr}");
        }
    }
}
