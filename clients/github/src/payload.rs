use lang_trends::api::LanguageBreakdown;
use serde::de::MapAccess;
use serde::de::Visitor;
use serde::Deserialize;
use serde::Deserializer;
use std::fmt;

#[derive(Deserialize, Debug)]
pub struct SearchRepos {
    pub items: Vec<Repo>,
}

#[derive(Deserialize, Debug)]
pub struct Repo {
    pub name: String,
    pub owner: RepoOwner,
}

#[derive(Deserialize, Debug)]
pub struct RepoOwner {
    pub login: String,
}

impl From<Repo> for crate::GithubRepo {
    fn from(repo: Repo) -> Self {
        crate::GithubRepo {
            name: repo.name,
            owner: repo.owner.login,
        }
    }
}

/// Body of the languages endpoint: a JSON object of byte counts keyed by
/// language name. Deserialized by hand to keep the document order, which
/// breaks ties later in the ranking.
#[derive(Debug)]
pub struct Languages(pub LanguageBreakdown);

impl<'de> Deserialize<'de> for Languages {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LanguagesVisitor;

        impl<'de> Visitor<'de> for LanguagesVisitor {
            type Value = Languages;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of language names to byte counts")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, u64>()? {
                    entries.push(entry);
                }
                Ok(Languages(entries))
            }
        }

        deserializer.deserialize_map(LanguagesVisitor)
    }
}

/// Tests

#[test]
fn languages_keep_document_order_test() {
    let body = r#"{ "Rust": 50, "C": 50, "Python": 100 }"#;
    let languages: Languages = serde_json::from_str(body).unwrap();
    assert_eq!(
        languages.0,
        vec![
            ("Rust".to_string(), 50),
            ("C".to_string(), 50),
            ("Python".to_string(), 100),
        ]
    );
}

#[test]
fn search_repos_test() {
    let body = r#"{
        "total_count": 1,
        "incomplete_results": false,
        "items": [{ "name": "repo", "owner": { "login": "owner" } }]
    }"#;
    let repos: SearchRepos = serde_json::from_str(body).unwrap();
    assert_eq!(repos.items.len(), 1);
    assert_eq!(repos.items[0].name, "repo");
    assert_eq!(repos.items[0].owner.login, "owner");
}
