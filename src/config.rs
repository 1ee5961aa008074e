//! Runtime settings, built once from the process environment.

use secrecy::SecretString;

/// Default keyword catalog for the relevance filter.
const DEFAULT_KEYWORDS: &str = "btc,bitcoin,eth,ethereum,solana,crypto,defi";
/// Default hashtag catalog for the relevance filter.
const DEFAULT_HASHTAGS: &str = "#btc,#eth,#sol,#crypto,#defi";
/// Default chat model for drafting and evaluation.
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default X API v2 base URL.
const DEFAULT_X_API_BASE: &str = "https://api.x.com/2";

/// Immutable pipeline settings. Built once in `main` and passed down;
/// components never read the environment themselves.
#[derive(Debug, Clone)]
pub struct Settings {
    /// OpenAI-compatible API key. `None` selects the offline strategy.
    pub openai_api_key: Option<SecretString>,
    /// Chat model name for drafting, evaluation, and summaries.
    pub model: String,
    /// X API bearer token. `None` forces simulated collection.
    pub x_bearer_token: Option<SecretString>,
    /// X API v2 base URL.
    pub x_api_base: String,
    /// Path of the local libSQL database file.
    pub db_path: String,
    /// Directory for report artifacts.
    pub report_dir: String,
    /// When set, collection never touches the live API.
    pub simulation: bool,
    /// Lower-cased keyword catalog for the relevance filter.
    pub keywords: Vec<String>,
    /// Lower-cased hashtag catalog for the relevance filter.
    pub hashtags: Vec<String>,
}

impl Settings {
    /// Build settings from environment variables, with defaults for
    /// everything except the API credentials.
    pub fn from_env() -> Self {
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(SecretString::from);

        let model =
            std::env::var("XREPLY_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let x_bearer_token = std::env::var("X_BEARER_TOKEN")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(SecretString::from);

        let x_api_base =
            std::env::var("X_API_BASE_URL").unwrap_or_else(|_| DEFAULT_X_API_BASE.to_string());

        let db_path =
            std::env::var("XREPLY_DB_PATH").unwrap_or_else(|_| "./data/xreply.db".to_string());

        let report_dir =
            std::env::var("XREPLY_REPORT_DIR").unwrap_or_else(|_| "./reports".to_string());

        let simulation = std::env::var("XREPLY_SIMULATION")
            .map(|s| parse_bool(&s))
            .unwrap_or(true);

        let keywords = std::env::var("XREPLY_KEYWORDS")
            .map(|s| parse_term_list(&s))
            .unwrap_or_else(|_| parse_term_list(DEFAULT_KEYWORDS));

        let hashtags = std::env::var("XREPLY_HASHTAGS")
            .map(|s| parse_term_list(&s))
            .unwrap_or_else(|_| parse_term_list(DEFAULT_HASHTAGS));

        Self {
            openai_api_key,
            model,
            x_bearer_token,
            x_api_base,
            db_path,
            report_dir,
            simulation,
            keywords,
            hashtags,
        }
    }
}

/// Parse a comma-separated term list: trim, lower-case, drop empties.
pub fn parse_term_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_list_trims_lowercases_and_drops_empties() {
        let terms = parse_term_list(" BTC , eth,, #DeFi ,solana");
        assert_eq!(terms, vec!["btc", "eth", "#defi", "solana"]);
    }

    #[test]
    fn term_list_empty_input() {
        assert!(parse_term_list("").is_empty());
        assert!(parse_term_list(" , ,").is_empty());
    }

    #[test]
    fn bool_parsing_accepts_common_truthy_forms() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(parse_bool("yes"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("no"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn default_catalogs_parse() {
        let keywords = parse_term_list(DEFAULT_KEYWORDS);
        let hashtags = parse_term_list(DEFAULT_HASHTAGS);
        assert_eq!(keywords.len(), 7);
        assert_eq!(hashtags.len(), 5);
        assert!(keywords.contains(&"bitcoin".to_string()));
        assert!(hashtags.contains(&"#defi".to_string()));
    }
}
