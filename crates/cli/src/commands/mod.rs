//! Command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

/// Default catalog URL, matching the storefront's default.
const DEFAULT_DATABASE_URL: &str = "sqlite://data/items.db?mode=rwc";

/// Resolve the catalog URL: flag, then `CATALOG_DATABASE_URL`, then default.
pub fn database_url(flag: Option<String>) -> String {
    dotenvy::dotenv().ok();

    flag.or_else(|| std::env::var("CATALOG_DATABASE_URL").ok())
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins() {
        assert_eq!(database_url(Some("sqlite::memory:".to_owned())), "sqlite::memory:");
    }
}
