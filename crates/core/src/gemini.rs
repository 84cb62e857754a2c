use crate::config::Config;
use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use gemini_rust::{Blob, Content, Gemini, Message, Part, Role};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// The user's stated gender, used to parameterize prompts and search links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(format!("unknown gender '{other}' (expected male or female)")),
        }
    }
}

/// The occasion the outfit should be styled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occasion {
    Party,
    Formal,
    Casual,
    Trending,
}

impl Occasion {
    pub const ALL: [Occasion; 4] = [
        Occasion::Party,
        Occasion::Formal,
        Occasion::Casual,
        Occasion::Trending,
    ];
}

impl fmt::Display for Occasion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occasion::Party => write!(f, "Party"),
            Occasion::Formal => write!(f, "Formal"),
            Occasion::Casual => write!(f, "Casual"),
            Occasion::Trending => write!(f, "Trending"),
        }
    }
}

impl FromStr for Occasion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "party" => Ok(Occasion::Party),
            "formal" => Ok(Occasion::Formal),
            "casual" => Ok(Occasion::Casual),
            "trending" => Ok(Occasion::Trending),
            other => Err(format!(
                "unknown occasion '{other}' (expected party, formal, casual or trending)"
            )),
        }
    }
}

/// One suggested fashion item from the analysis response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedItem {
    pub item_name: String,
    pub category: String,
    pub reason: String,
}

/// The complete analysis response: free-text style commentary plus an
/// ordered list of recommended items. The service contract says 3 to 5
/// recommendations; counts outside that range are logged but accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub style_analysis: String,
    pub recommendations: Vec<RecommendedItem>,
}

/// Client for the two Gemini operations this application uses:
/// clothing-style analysis and per-item product-image generation.
///
/// Stateless per call. Constructed from an explicit [`Config`] with a
/// validated API key, so a missing credential fails here rather than at
/// request time.
pub struct StyleClient {
    analysis: Gemini,
    imaging: Gemini,
}

impl StyleClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            analysis: build_model_client(&config.gemini_api_key, &config.analysis_model)?,
            imaging: build_model_client(&config.gemini_api_key, &config.image_model)?,
        })
    }

    /// Sends the captured JPEG still plus a gender/occasion-parameterized
    /// instruction to the analysis model and parses the strict-schema JSON
    /// response.
    pub async fn analyze(
        &self,
        jpeg: &[u8],
        gender: Gender,
        occasion: Occasion,
    ) -> Result<AnalysisResult> {
        let blob = Blob {
            mime_type: "image/jpeg".to_string(),
            data: BASE64.encode(jpeg),
        };

        let image_part = Part::InlineData { inline_data: blob };

        let text_part = Part::Text {
            text: analysis_prompt(gender, occasion),
            thought: None,
            thought_signature: None,
        };

        let content = Content {
            role: Some(Role::User),
            parts: Some(vec![image_part, text_part]),
        };

        let message = Message {
            role: Role::User,
            content,
        };

        let response = self
            .analysis
            .generate_content()
            .with_messages(vec![message])
            .execute()
            .await
            .map_err(|e| AppError::gemini(format!("Analysis request failed: {:?}", e)))?;

        if let Some(candidate) = response.candidates.first() {
            if let Some(parts) = &candidate.content.parts {
                for part in parts {
                    if let Part::Text { text, .. } = part {
                        return parse_analysis(text);
                    }
                }
            }
        }

        Err(AppError::gemini("No text response received from Gemini"))
    }

    /// Asks the image model for a single square studio product photo of the
    /// named item and returns the JPEG bytes of the first inline image in
    /// the response.
    pub async fn generate_item_image(&self, item_name: &str) -> Result<Vec<u8>> {
        let text_part = Part::Text {
            text: item_image_prompt(item_name),
            thought: None,
            thought_signature: None,
        };

        let content = Content {
            role: Some(Role::User),
            parts: Some(vec![text_part]),
        };

        let message = Message {
            role: Role::User,
            content,
        };

        let response = self
            .imaging
            .generate_content()
            .with_messages(vec![message])
            .execute()
            .await
            .map_err(|e| AppError::gemini(format!("Image request failed: {:?}", e)))?;

        if let Some(candidate) = response.candidates.first() {
            if let Some(parts) = &candidate.content.parts {
                for part in parts {
                    if let Part::InlineData { inline_data } = part {
                        return BASE64.decode(&inline_data.data).map_err(|e| {
                            AppError::gemini(format!("Invalid image payload: {}", e))
                        });
                    }
                }
            }
        }

        Err(AppError::NoImageGenerated(item_name.to_string()))
    }
}

// Initialize a client with the API key and model, explicitly setting the base
// URL to avoid BadScheme errors.
fn build_model_client(api_key: &str, model_name: &str) -> Result<Gemini> {
    let base_url = url::Url::parse("https://generativelanguage.googleapis.com/v1beta/")
        .map_err(|e| AppError::config(format!("Invalid base URL: {}", e)))?;

    let model_name = if model_name.starts_with("models/") {
        model_name.to_string()
    } else {
        format!("models/{}", model_name)
    };
    let model_url = format!(
        "https://generativelanguage.googleapis.com/v1beta/{}",
        model_name
    );

    Gemini::with_model_and_base_url(api_key, model_url, base_url)
        .map_err(|e| AppError::config(format!("Failed to create Gemini client: {}", e)))
}

fn analysis_prompt(gender: Gender, occasion: Occasion) -> String {
    format!(
        "Analyze the person in this image. They have identified as {gender}. \
         Their current clothing style is visible. Based on this, recommend 3 to 5 \
         complementary fashion items to complete their outfit for a \"{occasion}\" \
         occasion. Recommendations can include items like pants, shoes, watches, \
         or chains. If you recommend pants, please provide at least two different \
         pant options (e.g., 'dark wash slim-fit jeans' and 'khaki chino pants'). \
         For each item, provide its name, category, and a reason for the \
         recommendation. Respond with only a JSON object of this exact shape and \
         no other text: {{\"styleAnalysis\": string, \"recommendations\": \
         [{{\"itemName\": string, \"category\": string, \"reason\": string}}]}}"
    )
}

fn item_image_prompt(item_name: &str) -> String {
    format!(
        "A high-quality, professional e-commerce studio photograph of a single \
         \"{item_name}\" on a plain, light gray background. Square 1:1 aspect \
         ratio. The item should be centered and well-lit. Minimalist style. \
         No people or other objects. Generate exactly one image."
    )
}

/// Parses the analysis model's reply into an [`AnalysisResult`].
///
/// The model is instructed to return bare JSON, but replies are sometimes
/// wrapped in a markdown code fence; strip it before parsing. Anything that
/// does not match the schema is a fatal error for the call.
fn parse_analysis(text: &str) -> Result<AnalysisResult> {
    let body = strip_code_fence(text);

    let result: AnalysisResult = serde_json::from_str(body)
        .map_err(|e| AppError::MalformedResponse(format!("{} in `{}`", e, truncate(body, 120))))?;

    let count = result.recommendations.len();
    if !(3..=5).contains(&count) {
        warn!(count, "analysis returned an out-of-contract recommendation count");
    }

    Ok(result)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_BODY: &str = r#"{
        "styleAnalysis": "Great casual fit",
        "recommendations": [
            {"itemName": "white sneakers", "category": "Shoes", "reason": "clean base"},
            {"itemName": "denim jacket", "category": "Jacket", "reason": "adds texture"},
            {"itemName": "leather belt", "category": "Accessory", "reason": "ties it together"}
        ]
    }"#;

    #[test]
    fn parses_bare_json() {
        let result = parse_analysis(VALID_BODY).unwrap();
        assert_eq!(result.style_analysis, "Great casual fit");
        assert_eq!(result.recommendations.len(), 3);
        assert_eq!(result.recommendations[0].item_name, "white sneakers");
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{}\n```", VALID_BODY);
        let result = parse_analysis(&fenced).unwrap();
        assert_eq!(result.recommendations.len(), 3);
    }

    #[test]
    fn preserves_recommendation_order() {
        let result = parse_analysis(VALID_BODY).unwrap();
        let names: Vec<_> = result
            .recommendations
            .iter()
            .map(|r| r.item_name.as_str())
            .collect();
        assert_eq!(names, ["white sneakers", "denim jacket", "leather belt"]);
    }

    #[test]
    fn rejects_missing_fields() {
        let body = r#"{"styleAnalysis": "ok", "recommendations": [{"itemName": "belt"}]}"#;
        assert!(matches!(
            parse_analysis(body),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_analysis("Sure! Here are some ideas."),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn accepts_out_of_contract_count() {
        // Counts outside 3..=5 are logged but not rejected; an empty list
        // takes the zero-image path downstream.
        let body = r#"{"styleAnalysis": "ok", "recommendations": []}"#;
        let result = parse_analysis(body).unwrap();
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn prompt_mentions_gender_and_occasion() {
        let prompt = analysis_prompt(Gender::Female, Occasion::Formal);
        assert!(prompt.contains("Female"));
        assert!(prompt.contains("\"Formal\""));
        assert!(prompt.contains("3 to 5"));
        assert!(prompt.contains("at least two different pant options"));
    }

    #[test]
    fn image_prompt_names_the_item() {
        let prompt = item_image_prompt("a silver chain necklace");
        assert!(prompt.contains("a silver chain necklace"));
        assert!(prompt.contains("1:1"));
        assert!(prompt.contains("No people"));
    }

    #[test]
    fn strips_fence_without_language_tag() {
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {} "), "{}");
    }

    #[test]
    fn selection_enums_round_trip_from_str() {
        assert_eq!("male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("FEMALE".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("casual".parse::<Occasion>().unwrap(), Occasion::Casual);
        assert!("gala".parse::<Occasion>().is_err());
    }
}
