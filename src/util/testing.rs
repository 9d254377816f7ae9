// marksync/src/util/testing.rs

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use crate::domain::bookmark::Bookmark;
use crate::domain::category::Category;
use crate::domain::tag::Tag;

static TEST_ENV: OnceLock<()> = OnceLock::new();

/// Initializes logging for tests exactly once; subsequent calls do nothing.
pub fn init_test_env() {
    TEST_ENV.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(env_filter),
        );

        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    });
}

/// Canonical-looking record for tests; `age` staggers `created_at` so ordering
/// assertions have something to bite on.
pub fn sample_bookmark(owner: Uuid, title: &str, url: &str, age: Duration) -> Bookmark {
    let created: DateTime<Utc> = Utc::now() - age;
    Bookmark {
        id: Uuid::new_v4(),
        owner,
        title: title.to_string(),
        url: url.to_string(),
        category: Category::All,
        is_favorite: false,
        tags: Vec::new(),
        created_at: created,
        updated_at: created,
    }
}

/// Tags from raw names, panicking on invalid input (test-only convenience)
pub fn tags(names: &[&str]) -> Vec<Tag> {
    Tag::parse_list(names).expect("valid test tags")
}
