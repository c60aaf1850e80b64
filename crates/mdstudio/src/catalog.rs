use std::path::PathBuf;

use anyhow::Result;
use directories::ProjectDirs;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::Language;

/// What a snippet carries: inline Markdown, or a reference to a file/URL
/// whose content is fetched on selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExampleBody {
    Text(String),
    File(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub id: u32,
    pub title: String,
    pub body: ExampleBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    pub items: Vec<Example>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<Category>,
}

/// Distinguishable outcomes of a random pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickError {
    CategoryNotFound(String),
    CategoryEmpty(String),
}

impl std::fmt::Display for PickError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickError::CategoryNotFound(fragment) => {
                write!(f, "Category not found: {}", fragment)
            }
            PickError::CategoryEmpty(name) => write!(f, "No examples in category: {}", name),
        }
    }
}

impl std::error::Error for PickError {}

impl Catalog {
    /// Next id: one past the current maximum, or 0 for an empty list.
    fn next_id(ids: impl Iterator<Item = u32>) -> u32 {
        ids.max().map(|max| max + 1).unwrap_or(0)
    }

    /// Add a category with a sanitized name. Returns the new id, or `None`
    /// when the name sanitizes to nothing.
    pub fn add_category(&mut self, name: &str) -> Option<u32> {
        let name = mdkit::sanitize::clean_inline(name);
        if name.is_empty() {
            return None;
        }
        let id = Self::next_id(self.categories.iter().map(|c| c.id));
        self.categories.push(Category {
            id,
            name,
            items: Vec::new(),
        });
        Some(id)
    }

    pub fn delete_category(&mut self, id: u32) -> bool {
        let before = self.categories.len();
        self.categories.retain(|c| c.id != id);
        self.categories.len() != before
    }

    /// Add an item to a category, sanitizing title and body. Returns the
    /// new item id, or `None` when the category does not exist or the
    /// title sanitizes to nothing.
    pub fn add_item(&mut self, category_id: u32, title: &str, body: ExampleBody) -> Option<u32> {
        let title = mdkit::sanitize::clean_inline(title);
        if title.is_empty() {
            return None;
        }
        let body = match body {
            ExampleBody::Text(text) => ExampleBody::Text(mdkit::sanitize::clean_markdown(&text)),
            ExampleBody::File(url) => ExampleBody::File(mdkit::sanitize::clean_inline(&url)),
        };
        let category = self.categories.iter_mut().find(|c| c.id == category_id)?;
        let id = Self::next_id(category.items.iter().map(|i| i.id));
        category.items.push(Example { id, title, body });
        Some(id)
    }

    pub fn delete_item(&mut self, category_id: u32, item_id: u32) -> bool {
        if let Some(category) = self.categories.iter_mut().find(|c| c.id == category_id) {
            let before = category.items.len();
            category.items.retain(|i| i.id != item_id);
            return category.items.len() != before;
        }
        false
    }

    pub fn find_category(&self, id: u32) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Pick an example at random: match categories by case-insensitive
    /// substring of the sanitized fragment, choose a matching category
    /// uniformly, then one of its items uniformly.
    pub fn pick_random(&self, fragment: &str) -> Result<(&Category, &Example), PickError> {
        self.pick_random_with(fragment, &mut rand::thread_rng())
    }

    pub fn pick_random_with<R: Rng>(
        &self,
        fragment: &str,
        rng: &mut R,
    ) -> Result<(&Category, &Example), PickError> {
        let needle = mdkit::sanitize::clean_inline(fragment).to_lowercase();

        let matching: Vec<&Category> = self
            .categories
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .collect();

        if matching.is_empty() {
            return Err(PickError::CategoryNotFound(needle));
        }

        let category = matching[rng.gen_range(0..matching.len())];
        if category.items.is_empty() {
            return Err(PickError::CategoryEmpty(category.name.clone()));
        }
        let item = &category.items[rng.gen_range(0..category.items.len())];
        Ok((category, item))
    }
}

/// Built-in, read-only snippet catalog for the given display language.
pub fn builtin_catalog(language: Language) -> Catalog {
    let (welcome, basics, tables, lists, code, quotes) = match language {
        Language::En => (
            "Welcome",
            "Basics",
            "Tables",
            "Lists",
            "Code",
            "Quotes",
        ),
        Language::Pt => (
            "Bem-vindo",
            "Fundamentos",
            "Tabelas",
            "Listas",
            "Código",
            "Citações",
        ),
        Language::Es => (
            "Bienvenido",
            "Fundamentos",
            "Tablas",
            "Listas",
            "Código",
            "Citas",
        ),
    };

    let category = |id: u32, name: &str, items: Vec<(&str, &str)>| Category {
        id,
        name: name.to_string(),
        items: items
            .into_iter()
            .enumerate()
            .map(|(i, (title, text))| Example {
                id: i as u32,
                title: title.to_string(),
                body: ExampleBody::Text(text.to_string()),
            })
            .collect(),
    };

    Catalog {
        categories: vec![
            category(
                0,
                welcome,
                vec![(
                    welcome,
                    "# Markdown Studio\n\nType in the editor pane and watch the preview \
                     follow along.\n\n- `u` undo, `Ctrl-r` redo\n- `:github <user>` imports \
                     a profile README\n- `:export html` and `:export pdf` produce portable \
                     documents\n\n> Everything you load here is sanitized first.\n",
                )],
            ),
            category(
                1,
                basics,
                vec![
                    (
                        "Emphasis",
                        "**bold**, *italic*, ~~strikethrough~~, and `inline code`.\n",
                    ),
                    (
                        "Headings",
                        "# H1\n\n## H2\n\n### H3\n\nParagraph under a heading.\n",
                    ),
                    (
                        "Links",
                        "[An inline link](https://example.com) and an autolink: \
                         https://example.com\n",
                    ),
                ],
            ),
            category(
                2,
                tables,
                vec![(
                    "Simple table",
                    "| Name | Role |\n|------|------|\n| Ada | Engineer |\n| Grace | Admiral |\n",
                )],
            ),
            category(
                3,
                lists,
                vec![
                    (
                        "Bullets",
                        "- first\n- second\n  - nested\n- third\n",
                    ),
                    (
                        "Tasks",
                        "- [x] write the draft\n- [ ] review it\n- [ ] publish\n",
                    ),
                ],
            ),
            category(
                4,
                code,
                vec![(
                    "Fenced block",
                    "```rust\nfn main() {\n    println!(\"hello\");\n}\n```\n",
                )],
            ),
            category(
                5,
                quotes,
                vec![(
                    "Block quote",
                    "> Simplicity is prerequisite for reliability.\n>\n> — Dijkstra\n",
                )],
            ),
        ],
    }
}

/// The language-dependent startup document: the first item of the first
/// category, when it carries inline text.
pub fn default_document(language: Language) -> String {
    let catalog = builtin_catalog(language);
    catalog
        .categories
        .first()
        .and_then(|c| c.items.first())
        .and_then(|item| match &item.body {
            ExampleBody::Text(text) => Some(text.clone()),
            ExampleBody::File(_) => None,
        })
        .unwrap_or_default()
}

/// Persistence for the user-editable custom catalog. Every mutation is
/// followed by a full rewrite of the JSON file.
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new() -> Result<Self> {
        let dir = Self::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            path: dir.join("examples.json"),
        })
    }

    fn data_dir() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("MDSTUDIO_CONFIG_DIR") {
            return Some(PathBuf::from(dir));
        }
        ProjectDirs::from("com", "mdstudio", "mdstudio")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Load the persisted custom catalog, if any. A broken file is treated
    /// as absent.
    pub fn load(&self) -> Option<Catalog> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(catalog) => Some(catalog),
            Err(e) => {
                log::warn!("Ignoring unreadable custom catalog: {}", e);
                None
            }
        }
    }

    pub fn save(&self, catalog: &Catalog) -> Result<()> {
        let json = serde_json::to_string_pretty(catalog)?;
        std::fs::write(&self.path, json)?;
        log::debug!("Custom catalog written to {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog_with(names: &[(&str, usize)]) -> Catalog {
        Catalog {
            categories: names
                .iter()
                .enumerate()
                .map(|(ci, (name, count))| Category {
                    id: ci as u32,
                    name: name.to_string(),
                    items: (0..*count)
                        .map(|i| Example {
                            id: i as u32,
                            title: format!("{} item {}", name, i),
                            body: ExampleBody::Text(format!("content {}", i)),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_add_category_id_assignment() {
        let mut catalog = Catalog::default();
        assert_eq!(catalog.add_category("First"), Some(0));

        // Gap in ids: next id is max + 1, not len.
        let mut gappy = catalog_with(&[("A", 0), ("B", 0)]);
        gappy.categories[1].id = 2;
        assert_eq!(gappy.add_category("Third"), Some(3));
    }

    #[test]
    fn test_add_category_rejects_empty_names() {
        let mut catalog = Catalog::default();
        assert_eq!(catalog.add_category("   "), None);
        assert_eq!(catalog.add_category("<b></b>"), None);
        assert!(catalog.categories.is_empty());
    }

    #[test]
    fn test_add_item_sanitizes_and_assigns_ids() {
        let mut catalog = Catalog::default();
        let cat = catalog.add_category("Snippets").unwrap();

        let id = catalog
            .add_item(cat, "<i>Title</i>", ExampleBody::Text("text".into()))
            .unwrap();
        assert_eq!(id, 0);
        let item = &catalog.find_category(cat).unwrap().items[0];
        assert_eq!(item.title, "Title");

        let id = catalog
            .add_item(cat, "Second", ExampleBody::Text("more".into()))
            .unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_add_item_to_missing_category() {
        let mut catalog = Catalog::default();
        assert_eq!(
            catalog.add_item(9, "Title", ExampleBody::Text("text".into())),
            None
        );
    }

    #[test]
    fn test_delete_category_and_item() {
        let mut catalog = catalog_with(&[("Tables", 2), ("Lists", 1)]);
        assert!(catalog.delete_item(0, 1));
        assert!(!catalog.delete_item(0, 1));
        assert!(catalog.delete_category(1));
        assert!(!catalog.delete_category(1));
        assert_eq!(catalog.categories.len(), 1);
    }

    #[test]
    fn test_pick_random_only_matching_category() {
        let catalog = catalog_with(&[("Tables", 3), ("Lists", 3)]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let (category, example) = catalog.pick_random_with("tab", &mut rng).unwrap();
            assert_eq!(category.name, "Tables");
            assert!(example.title.starts_with("Tables"));
        }
    }

    #[test]
    fn test_pick_random_not_found() {
        let catalog = catalog_with(&[("Tables", 3)]);
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            catalog.pick_random_with("nope", &mut rng),
            Err(PickError::CategoryNotFound(_))
        ));
    }

    #[test]
    fn test_pick_random_empty_category() {
        let catalog = catalog_with(&[("Empty", 0)]);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            catalog.pick_random_with("emp", &mut rng),
            Err(PickError::CategoryEmpty("Empty".into()))
        );
    }

    #[test]
    fn test_pick_random_empty_fragment_matches_all() {
        let catalog = catalog_with(&[("Tables", 1), ("Lists", 1)]);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(catalog.pick_random_with("", &mut rng).is_ok());
    }

    #[test]
    fn test_builtin_catalog_languages() {
        for language in [Language::En, Language::Pt, Language::Es] {
            let catalog = builtin_catalog(language);
            assert!(!catalog.categories.is_empty());
            assert!(!default_document(language).is_empty());
        }
        assert_ne!(
            builtin_catalog(Language::En).categories[0].name,
            builtin_catalog(Language::Pt).categories[0].name
        );
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore {
            path: dir.path().join("examples.json"),
        };

        assert!(store.load().is_none());

        let catalog = catalog_with(&[("Tables", 2)]);
        store.save(&catalog).unwrap();
        assert_eq!(store.load().unwrap(), catalog);

        store.clear().unwrap();
        assert!(store.load().is_none());
    }
}
