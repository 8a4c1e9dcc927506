use std::borrow::Cow;

use crate::SemanticError;

/// Language detection plus translation, used to bring queries into the
/// language an encoder was trained on.
pub trait Translator: Send + Sync {
    /// ISO 639-1 code of `text` (e.g. `"vi"`, `"en"`).
    fn detect_language(&self, text: &str) -> Result<String, SemanticError>;

    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, SemanticError>;
}

/// Returns `text` in `target` language, or `text` unchanged when it already
/// is, or when detection/translation fails (logged at `warn`).
pub fn localize_query<'a>(
    translator: &dyn Translator,
    text: &'a str,
    target: &str,
) -> Cow<'a, str> {
    let source = match translator.detect_language(text) {
        Ok(lang) => lang,
        Err(error) => {
            tracing::warn!(%error, "language detection failed, using query as-is");
            return Cow::Borrowed(text);
        }
    };
    if source.eq_ignore_ascii_case(target) {
        return Cow::Borrowed(text);
    }

    match translator.translate(text, &source, target) {
        Ok(translated) if !translated.trim().is_empty() => {
            tracing::debug!(source = %source, to = target, "query translated");
            Cow::Owned(translated)
        }
        Ok(_) => {
            tracing::warn!(source = %source, to = target, "translator returned empty text, using query as-is");
            Cow::Borrowed(text)
        }
        Err(error) => {
            tracing::warn!(%error, source = %source, to = target, "translation failed, using query as-is");
            Cow::Borrowed(text)
        }
    }
}

#[cfg(feature = "http")]
pub use self::remote::HttpTranslator;

#[cfg(feature = "http")]
mod remote {
    use serde_json::{json, Value};

    use super::Translator;
    use crate::config::TranslatorConfig;
    use crate::http::{build_client, post_json};
    use crate::SemanticError;

    /// Client for a LibreTranslate-compatible service (`/detect`, `/translate`).
    #[derive(Debug, Clone)]
    pub struct HttpTranslator {
        client: reqwest::blocking::Client,
        base: String,
        cfg: TranslatorConfig,
    }

    impl HttpTranslator {
        pub fn new(cfg: TranslatorConfig) -> Result<Self, SemanticError> {
            cfg.validate()?;
            Ok(Self {
                client: build_client(cfg.timeout_secs)?,
                base: cfg.endpoint.trim_end_matches('/').to_string(),
                cfg,
            })
        }

        pub fn target_language(&self) -> &str {
            &self.cfg.target_language
        }

        fn call(&self, path: &str, payload: Value) -> Result<Value, SemanticError> {
            let url = format!("{}/{path}", self.base);
            post_json(&self.client, &url, &payload, &self.cfg.retry)
                .map_err(|e| SemanticError::Translation(e.to_string()))
        }
    }

    impl Translator for HttpTranslator {
        fn detect_language(&self, text: &str) -> Result<String, SemanticError> {
            let body = self.call("detect", json!({ "q": text }))?;
            parse_detection(&body)
        }

        fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, SemanticError> {
            let body = self.call(
                "translate",
                json!({ "q": text, "source": source, "target": target, "format": "text" }),
            )?;
            parse_translation(&body)
        }
    }

    /// `[{"language": "vi", "confidence": 92.0}, ...]`, best candidate first.
    pub(super) fn parse_detection(body: &Value) -> Result<String, SemanticError> {
        body.as_array()
            .and_then(|candidates| candidates.first())
            .and_then(|best| best.get("language"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SemanticError::Translation("unexpected /detect response".into()))
    }

    /// `{"translatedText": "..."}`
    pub(super) fn parse_translation(body: &Value) -> Result<String, SemanticError> {
        body.get("translatedText")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SemanticError::Translation("unexpected /translate response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        detected: Result<&'static str, ()>,
        translated: Result<&'static str, ()>,
    }

    impl Translator for Fixed {
        fn detect_language(&self, _text: &str) -> Result<String, SemanticError> {
            self.detected
                .map(str::to_string)
                .map_err(|_| SemanticError::Translation("detect down".into()))
        }

        fn translate(&self, _text: &str, _s: &str, _t: &str) -> Result<String, SemanticError> {
            self.translated
                .map(str::to_string)
                .map_err(|_| SemanticError::Translation("translate down".into()))
        }
    }

    #[test]
    fn foreign_query_is_translated() {
        let t = Fixed {
            detected: Ok("vi"),
            translated: Ok("a man riding a motorbike"),
        };
        assert_eq!(
            localize_query(&t, "người đàn ông đi xe máy", "en"),
            "a man riding a motorbike"
        );
    }

    #[test]
    fn same_language_is_untouched() {
        let t = Fixed {
            detected: Ok("EN"),
            translated: Ok("should not be used"),
        };
        assert!(matches!(
            localize_query(&t, "a red car", "en"),
            Cow::Borrowed("a red car")
        ));
    }

    #[test]
    fn failures_fall_back_to_original() {
        let detect_down = Fixed {
            detected: Err(()),
            translated: Ok("x"),
        };
        assert_eq!(localize_query(&detect_down, "xin chào", "en"), "xin chào");

        let translate_down = Fixed {
            detected: Ok("vi"),
            translated: Err(()),
        };
        assert_eq!(localize_query(&translate_down, "xin chào", "en"), "xin chào");

        let blank = Fixed {
            detected: Ok("vi"),
            translated: Ok("  "),
        };
        assert_eq!(localize_query(&blank, "xin chào", "en"), "xin chào");
    }

    #[cfg(feature = "http")]
    #[test]
    fn parses_libretranslate_responses() {
        use serde_json::json;

        let detected = remote::parse_detection(&json!([{"language": "vi", "confidence": 90.0}]));
        assert_eq!(detected.unwrap(), "vi");
        assert!(remote::parse_detection(&json!([])).is_err());

        let translated = remote::parse_translation(&json!({"translatedText": "hello"}));
        assert_eq!(translated.unwrap(), "hello");
        assert!(matches!(
            remote::parse_translation(&json!({"error": "bad"})),
            Err(SemanticError::Translation(_))
        ));
    }
}
