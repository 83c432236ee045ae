// src/extractors/category.rs
use serde::Serialize;
use std::fmt;

// --- Keyword Roots ---
// Roots are matched as plain substrings of the lowercased text so that any
// inflected form counts. Order inside each list does not matter; the order of
// the checks below does.

/// Investment / partnership / fund contracts are always filed as "other".
const INVESTMENT_ROOTS: &[&str] = &["инвестицион", "товарищест", "паев", "актив", "фонд"];

/// Purchase or sale...
const SALE_ROOTS: &[&str] = &["купл", "продаж"];
/// ...of real estate is filed as "other" as well.
const PROPERTY_ROOTS: &[&str] = &["недвижим", "складск", "помещен", "квартир", "дом", "здан"];

/// Category buckets in priority order. The first bucket with a hit wins.
const CATEGORY_ROOTS: &[(Category, &[&str])] = &[
    (
        Category::Labor,
        &["трудовой", "труда", "работник", "занят", "кадр", "работодатель"],
    ),
    (Category::Lease, &["аренд", "найм", "жил", "нежил"]),
    (Category::Supply, &["поставк", "товар", "розничн"]),
    (
        Category::Services,
        &["услуг", "подряд", "строительн", "перевоз", "организац"],
    ),
];

// --- Data Structures ---

/// Business category a contract is filed under. The label doubles as the
/// destination directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Lease,
    Supply,
    Services,
    Labor,
    Other,
}

impl Category {
    /// All categories, in the order their directories are created.
    pub const ALL: [Category; 5] = [
        Category::Lease,
        Category::Supply,
        Category::Services,
        Category::Labor,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Lease => "Аренда",
            Category::Supply => "Поставка",
            Category::Services => "Услуги",
            Category::Labor => "Трудовые",
            Category::Other => "Прочие",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Why a category was chosen. `Other` is reached both by explicit exclusion
/// and by finding nothing; this keeps the two apart in logs and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryReason {
    InvestmentExclusion { root: &'static str },
    RealEstateSale {
        deal_root: &'static str,
        property_root: &'static str,
    },
    Keyword { root: &'static str },
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub reason: CategoryReason,
}

// --- Classification ---

/// Picks the category for a document from its text and extracted type.
pub fn categorize(text: &str, contract_type: &str) -> Category {
    classify(text, contract_type).category
}

/// Same decision as [`categorize`], with the rule that produced it.
pub fn classify(text: &str, contract_type: &str) -> Classification {
    let analysis_text = format!("{} {}", contract_type, text).to_lowercase();

    if let Some(root) = first_root(&analysis_text, INVESTMENT_ROOTS) {
        return Classification {
            category: Category::Other,
            reason: CategoryReason::InvestmentExclusion { root },
        };
    }

    if let Some(deal_root) = first_root(&analysis_text, SALE_ROOTS) {
        if let Some(property_root) = first_root(&analysis_text, PROPERTY_ROOTS) {
            return Classification {
                category: Category::Other,
                reason: CategoryReason::RealEstateSale {
                    deal_root,
                    property_root,
                },
            };
        }
    }

    for (category, roots) in CATEGORY_ROOTS {
        if let Some(root) = first_root(&analysis_text, roots) {
            tracing::trace!("Matched root '{}' for category {}", root, category);
            return Classification {
                category: *category,
                reason: CategoryReason::Keyword { root },
            };
        }
    }

    Classification {
        category: Category::Other,
        reason: CategoryReason::NoMatch,
    }
}

fn first_root(haystack: &str, roots: &[&'static str]) -> Option<&'static str> {
    roots.iter().copied().find(|root| haystack.contains(root))
}
